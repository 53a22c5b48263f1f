//! Error types for the subedit-core library

use thiserror::Error;

/// Main error type for subtitle operations
#[derive(Error, Debug)]
pub enum SubtitleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(String),
}

/// Result type alias for subtitle operations
pub type Result<T> = std::result::Result<T, SubtitleError>;

impl From<reqwest::Error> for SubtitleError {
    fn from(err: reqwest::Error) -> Self {
        SubtitleError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for SubtitleError {
    fn from(err: serde_json::Error) -> Self {
        SubtitleError::Json(err.to_string())
    }
}

impl PartialEq for SubtitleError {
    fn eq(&self, other: &Self) -> bool {
        match self {
            SubtitleError::Io(err) => {
                matches!(other, SubtitleError::Io(e) if err.to_string() == e.to_string())
            }
            SubtitleError::Parse(msg) => {
                matches!(other, SubtitleError::Parse(o) if msg == o)
            }
            SubtitleError::Timestamp(msg) => {
                matches!(other, SubtitleError::Timestamp(o) if msg == o)
            }
            SubtitleError::InvalidEdit(msg) => {
                matches!(other, SubtitleError::InvalidEdit(o) if msg == o)
            }
            SubtitleError::Configuration(msg) => {
                matches!(other, SubtitleError::Configuration(o) if msg == o)
            }
            SubtitleError::Api(msg) => {
                matches!(other, SubtitleError::Api(o) if msg == o)
            }
            SubtitleError::Http(msg) => {
                matches!(other, SubtitleError::Http(o) if msg == o)
            }
            SubtitleError::Json(msg) => {
                matches!(other, SubtitleError::Json(o) if msg == o)
            }
        }
    }
}
