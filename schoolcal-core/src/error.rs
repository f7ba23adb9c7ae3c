//! Error types for schoolcal.

use thiserror::Error;

/// Errors that can occur in store, feed and config operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed event document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not persist event document: {0}")]
    Persist(String),
}

/// Result type alias for schoolcal operations.
pub type StoreResult<T> = Result<T, StoreError>;
