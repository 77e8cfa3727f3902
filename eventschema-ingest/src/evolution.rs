//! Reconciliation of newly discovered fields with the schema store.

use crate::cache::{SchemaCache, call_store};
use crate::error::IngestResult;
use crate::schema::CompiledSchema;
use eventschema_types::{SchemaField, StreamKey};
use std::sync::Arc;
use tracing::{info, warn};

/// Pushes proposed fields to the authoritative store and installs the
/// canonical result in the cache.
///
/// Holds no lock across the store round-trip. Concurrent proposals from any
/// number of ingestion instances are arbitrated by the store, whose field
/// list only grows, so repeating a reconciliation is always safe.
pub struct SchemaEvolutionCoordinator {
    cache: Arc<SchemaCache>,
}

impl SchemaEvolutionCoordinator {
    pub fn new(cache: Arc<SchemaCache>) -> Self {
        Self { cache }
    }

    /// Merges `proposed` into `stream`'s schema and returns the snapshot now
    /// cached for it.
    ///
    /// Proposals already present in `current` with the same type are dropped
    /// before the round-trip; when nothing is left `current` is returned as
    /// is. A proposal whose type conflicts with the store keeps the store's
    /// type. On failure nothing is installed.
    pub async fn reconcile(
        &self,
        stream: &StreamKey,
        current: &Arc<CompiledSchema>,
        proposed: Vec<SchemaField>,
    ) -> IngestResult<Arc<CompiledSchema>> {
        let proposed: Vec<SchemaField> = proposed
            .into_iter()
            .filter(|field| {
                current
                    .field(&field.name)
                    .is_none_or(|known| known.field_type.as_ref() != Some(&field.field_type))
            })
            .collect();
        if proposed.is_empty() {
            return Ok(Arc::clone(current));
        }

        let store = Arc::clone(self.cache.store());
        let canonical = call_store(
            self.cache.store_timeout(),
            store.merge_fields(stream, &proposed),
        )
        .await?;

        for field in &proposed {
            match canonical.iter().find(|f| f.name == field.name) {
                Some(stored) if stored.field_type != field.field_type => warn!(
                    stream = %stream,
                    field = %field.name,
                    proposed = %field.field_type,
                    stored = %stored.field_type,
                    "Store kept existing type for proposed field"
                ),
                Some(_) => {}
                None => warn!(
                    stream = %stream,
                    field = %field.name,
                    "Store did not accept proposed field"
                ),
            }
        }

        let installed = self.cache.install(stream, &canonical);
        info!(
            stream = %stream,
            proposed = proposed.len(),
            from_version = current.version(),
            to_version = installed.version(),
            fields = installed.persisted_len(),
            "Schema evolved"
        );
        Ok(installed)
    }
}
