//! In-memory reference schema store.

use crate::{SchemaStore, StoreError, StoreResult};
use async_trait::async_trait;
use eventschema_types::{SchemaField, StreamKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Schema store that keeps every stream's field list in process memory.
///
/// Cloning is cheap and clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaStore {
    streams: Arc<RwLock<HashMap<StreamKey, Vec<SchemaField>>>>,
}

impl InMemorySchemaStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given streams.
    pub fn from_streams(streams: impl IntoIterator<Item = (StreamKey, Vec<SchemaField>)>) -> Self {
        Self {
            streams: Arc::new(RwLock::new(streams.into_iter().collect())),
        }
    }

    /// Replaces a stream's field list wholesale.
    pub async fn seed(&self, stream: StreamKey, fields: Vec<SchemaField>) {
        self.streams.write().await.insert(stream, fields);
    }

    /// Drops a stream's schema entirely.
    pub async fn delete_stream(&self, stream: &StreamKey) -> bool {
        self.streams.write().await.remove(stream).is_some()
    }

    /// Number of streams with a schema.
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Serializes every stream's schema as JSON.
    pub async fn export_json(&self) -> StoreResult<String> {
        let streams = self.streams.read().await;
        let mut entries: Vec<(&StreamKey, &Vec<SchemaField>)> = streams.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Ok(serde_json::to_string(&entries)?)
    }

    /// Restores a store from the output of [`export_json`](Self::export_json).
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let entries: Vec<(StreamKey, Vec<SchemaField>)> = serde_json::from_str(json)?;
        Ok(Self::from_streams(entries))
    }
}

#[async_trait]
impl SchemaStore for InMemorySchemaStore {
    async fn load_schema(&self, stream: &StreamKey) -> StoreResult<Vec<SchemaField>> {
        self.streams
            .read()
            .await
            .get(stream)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(stream.to_string()))
    }

    async fn merge_fields(
        &self,
        stream: &StreamKey,
        proposed: &[SchemaField],
    ) -> StoreResult<Vec<SchemaField>> {
        // Deterministic append order regardless of proposal order.
        let mut by_name: BTreeMap<&str, &SchemaField> = BTreeMap::new();
        for field in proposed {
            by_name.entry(field.name.as_str()).or_insert(field);
        }

        let mut streams = self.streams.write().await;
        let fields = streams.entry(stream.clone()).or_default();

        let mut added = 0usize;
        for (name, field) in by_name {
            match fields.iter().find(|f| f.name == name) {
                Some(existing) if existing.field_type != field.field_type => {
                    warn!(
                        stream = %stream,
                        field = name,
                        stored = %existing.field_type,
                        proposed = %field.field_type,
                        "Type conflict, keeping stored type"
                    );
                }
                Some(_) => {}
                None => {
                    fields.push(field.clone());
                    added += 1;
                }
            }
        }

        debug!(stream = %stream, added, total = fields.len(), "Merged schema fields");
        Ok(fields.clone())
    }
}
