//! Authoritative schema store for eventschema.
//!
//! The ingestion engine never owns a stream's schema; it asks a
//! [`SchemaStore`] for the canonical field list and pushes newly discovered
//! fields back through [`SchemaStore::merge_fields`]. The store arbitrates
//! concurrent proposals from every ingestion instance:
//!
//! - merges are idempotent (re-proposing a known field is a no-op)
//! - the field list only grows; nothing is ever removed
//! - on a type conflict the type already stored wins
//!
//! [`InMemorySchemaStore`] is a reference implementation with exactly these
//! semantics, used by tests and single-process deployments.

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::InMemorySchemaStore;

use async_trait::async_trait;
use eventschema_types::{SchemaField, StreamKey};

/// The shared, authoritative schema store.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Loads the ordered field list of a stream.
    ///
    /// Fails with [`StoreError::NotFound`] when the stream has no schema yet;
    /// callers treat that as an empty schema.
    async fn load_schema(&self, stream: &StreamKey) -> StoreResult<Vec<SchemaField>>;

    /// Durably merges `proposed` into the stream's schema and returns the full
    /// canonical field list.
    ///
    /// Creates the stream when it does not exist.
    async fn merge_fields(
        &self,
        stream: &StreamKey,
        proposed: &[SchemaField],
    ) -> StoreResult<Vec<SchemaField>>;
}
