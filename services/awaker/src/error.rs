//! Error types for the awaker client core

/// Errors that can occur in the awaker client core
#[derive(Debug, thiserror::Error)]
pub enum AwakerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type alias for awaker operations
pub type Result<T> = std::result::Result<T, AwakerError>;
