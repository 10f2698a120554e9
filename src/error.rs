//! Error types for Recap.

use crate::config::BackendKind;
use thiserror::Error;

/// Library-level error type for Recap operations.
#[derive(Error, Debug)]
pub enum RecapError {
    #[error("No active YouTube tab found. Open a video in your browser and try again.")]
    NoActiveVideoTab,

    #[error("Invalid YouTube video reference: {0}")]
    InvalidVideoReference(String),

    #[error("Failed to fetch video metadata: {0}")]
    MetadataFetch(String),

    #[error("Failed to fetch transcript: {0}")]
    TranscriptFetch(String),

    #[error("No transcript available for this video (tried: {0})")]
    NoTranscriptAvailable(String),

    #[error("{backend} backend error: {cause}")]
    SummaryBackend { backend: BackendKind, cause: String },

    #[error("Browser extension unavailable: {0}")]
    BrowserExtensionUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RecapError {
    /// Wrap any error as a backend failure for `backend`, leaving cancellation
    /// and existing backend errors untouched.
    pub fn for_backend(self, backend: BackendKind) -> Self {
        match self {
            RecapError::Cancelled | RecapError::SummaryBackend { .. } => self,
            other => RecapError::SummaryBackend {
                backend,
                cause: other.to_string(),
            },
        }
    }
}

/// Result type alias for Recap operations.
pub type Result<T> = std::result::Result<T, RecapError>;
