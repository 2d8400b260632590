use serde::{Deserialize, Serialize};

// ===== Conversion Service Response Types =====

/// Reply of the document conversion service for PDF/DOC/DOCX uploads.
#[derive(Debug, Serialize, Deserialize)]
pub struct TextExtractionResponse {
    pub text: String,
    pub status: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceErrorResponse {
    pub error: String,
}
