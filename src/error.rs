// src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a text extraction failed. Callers branch on the kind, never on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionErrorKind {
    /// The target site refuses automated requests; the user has to copy the text by hand.
    Blocked,
    /// Transport failure: DNS, connect, timeout, non-success status.
    Network,
    /// The input could not be turned into text (wrong format, empty page, bad encoding).
    Invalid,
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::Blocked,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::Invalid,
            message: message.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.kind == ExtractionErrorKind::Blocked
    }
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("job description is empty")]
    EmptyInput,

    #[error("could not find a job title or any requirements in the text")]
    Unrecognized,

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("unknown fallback strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid recovery config: {0}")]
    InvalidConfig(String),

    #[error("config serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RecoveryResult<T> = std::result::Result<T, RecoveryError>;
