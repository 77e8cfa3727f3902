//! Error types for the schema store.

use thiserror::Error;

/// Result type for schema store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a schema store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stream has no schema yet.
    #[error("stream not found: {0}")]
    NotFound(String),

    /// The store could not be reached or refused the request.
    #[error("schema store unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its deadline.
    #[error("schema store call timed out")]
    Timeout,

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
