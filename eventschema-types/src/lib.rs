//! Core type definitions for eventschema.
//!
//! This crate defines the vocabulary shared by the schema store and the
//! ingestion engine:
//! - [`FieldType`] — the recursive type tag (primitives plus array/map wrappers)
//! - [`SchemaField`] — a named, nullable column of a stream's schema
//! - [`StreamKey`] — the (project, collection) pair identifying one stream
//! - [`FieldValue`] — a typed value stored in a record, with coercion rules
//!
//! Nothing here performs I/O.

mod field_type;
mod schema_field;
mod value;

pub use field_type::FieldType;
pub use schema_field::{SchemaField, StreamKey};
pub use value::FieldValue;

/// Result type alias using the crate's error type.
pub type TypeResult<T> = std::result::Result<T, TypeError>;

/// Errors raised by type-level operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    /// An accessor that only makes sense on a compound type was called on
    /// something else (e.g. `element_type()` on `LONG`).
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: FieldType,
    },

    /// A value could not be coerced into the requested type.
    #[error("cannot store {found} value as {expected}")]
    UnsupportedShape {
        expected: FieldType,
        found: &'static str,
    },
}
