//! Error types for the ingestion engine.

use eventschema_store::StoreError;
use eventschema_types::{FieldType, TypeError};
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while building a record.
///
/// Every error is local to one event: nothing here leaves the shared schema
/// cache in a modified state.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The token stream does not follow the expected grammar.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A `properties` object appeared inside `properties`.
    #[error("nested properties are not supported")]
    NestedPropertiesNotSupported,

    /// A value cannot be stored in its field's type.
    #[error("unsupported value for field '{field}': cannot store {found} as {expected}")]
    UnsupportedValueShape {
        field: String,
        expected: FieldType,
        found: String,
    },

    /// The event used a reserved name as a property.
    #[error("property name '{0}' is reserved")]
    ReservedFieldName(String),

    /// The schema store could not be reached; safe to retry verbatim.
    #[error("schema store unavailable: {0}")]
    StoreUnavailable(String),

    /// A type-level accessor was used on the wrong type.
    #[error(transparent)]
    TypeMismatch(#[from] TypeError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        IngestError::MalformedInput(message.into())
    }

    /// Attaches a field name to a coercion failure.
    pub(crate) fn value_shape(field: &str, err: TypeError) -> Self {
        match err {
            TypeError::UnsupportedShape { expected, found } => IngestError::UnsupportedValueShape {
                field: field.to_string(),
                expected,
                found: found.to_string(),
            },
            other => IngestError::TypeMismatch(other),
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::StoreUnavailable(_))
    }

    /// Whether the event itself is at fault (as opposed to the server).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::MalformedInput(_)
                | IngestError::NestedPropertiesNotSupported
                | IngestError::UnsupportedValueShape { .. }
                | IngestError::ReservedFieldName(_)
        )
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        IngestError::StoreUnavailable(err.to_string())
    }
}
