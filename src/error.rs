//! Error types for the matching pipeline.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown profile session or job.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record exists but cannot serve the request in its current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed input caught at the boundary (filters, ratings, counts).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Vector index could not be reached or rejected the operation.
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Record store could not be reached or rejected the operation.
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// Embedding model failed to load or to encode text.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Configuration could not be parsed or written.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether a background task may retry the operation that produced this error.
    ///
    /// Only transport-level failures of the external collaborators qualify;
    /// validation and lookup failures will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::IndexUnavailable(_) | Error::StoreUnavailable(_) | Error::Embedding(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
