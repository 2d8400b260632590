// src/intake/service_client.rs
//! HTTP client for the document conversion service (PDF and Word to text)

use crate::app_log;
use crate::error::ExtractionError;
use crate::types::response::{ServiceErrorResponse, TextExtractionResponse};
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use std::time::Duration;

const EXTRACT_TEXT_ENDPOINT: &str = "/extract-text";

pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    /// Create new service client with configuration
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sends a document, receives its plain text
    pub async fn extract_text(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> std::result::Result<String, ExtractionError> {
        let content_type = get_content_type(file_name)
            .ok_or_else(|| ExtractionError::invalid(format!("Unsupported file format: {}", file_name)))?;
        let url = format!("{}{}", self.base_url, EXTRACT_TEXT_ENDPOINT);

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ExtractionError::invalid(format!("Failed to create multipart: {}", e)))?;
        let form = Form::new().part("file", part);

        app_log!(info, "Calling conversion service: {}", url);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::network(format!("Conversion service unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExtractionError::network(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceErrorResponse>(&body)
                .map(|err| err.error)
                .unwrap_or_else(|_| format!("Service returned error status {}: {}", status, body));
            app_log!(error, "Conversion service error response: {}", message);

            return Err(if status.is_client_error() {
                ExtractionError::invalid(message)
            } else {
                ExtractionError::network(message)
            });
        }

        let extraction: TextExtractionResponse = serde_json::from_str(&body).map_err(|e| {
            ExtractionError::invalid(format!("Unexpected conversion service response: {}", e))
        })?;

        if extraction.status != "success" {
            return Err(ExtractionError::invalid(
                extraction
                    .message
                    .unwrap_or_else(|| format!("Text extraction failed: {}", extraction.status)),
            ));
        }

        Ok(extraction.text)
    }
}

/// Get content type for file
fn get_content_type(file_name: &str) -> Option<&'static str> {
    match crate::utils::get_file_extension(file_name)?.as_str() {
        "pdf" => Some("application/pdf"),
        "doc" => Some("application/msword"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        _ => None,
    }
}
