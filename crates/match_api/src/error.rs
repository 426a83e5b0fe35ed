//! Error types for the match API client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level HTTP failure, including body decode errors.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl ApiError {
    /// HTTP status for API-level rejections, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
