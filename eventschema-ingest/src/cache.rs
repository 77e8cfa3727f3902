//! Per-stream cache of compiled schemas.
//!
//! - `DashMap<StreamKey, Arc<CompiledSchema>>`: readers of different streams
//!   never contend, and no shard guard is held across an `.await`
//! - entries are immutable snapshots swapped whole, so a reader sees either
//!   the old or the new schema, never a mix
//! - no size or time eviction; entries leave only through invalidation

use crate::dependent::DependentFieldRegistry;
use crate::error::IngestResult;
use crate::schema::CompiledSchema;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use eventschema_store::{SchemaStore, StoreError, StoreResult};
use eventschema_types::{SchemaField, StreamKey};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Hit/miss counters of a [`SchemaCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Lazily populated map from stream to its current compiled schema.
pub struct SchemaCache {
    entries: DashMap<StreamKey, Arc<CompiledSchema>>,
    store: Arc<dyn SchemaStore>,
    registry: Arc<DependentFieldRegistry>,
    store_timeout: Duration,
    next_version: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SchemaCache {
    pub fn new(
        store: Arc<dyn SchemaStore>,
        registry: Arc<DependentFieldRegistry>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            store,
            registry,
            store_timeout,
            next_version: AtomicU64::new(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached snapshot for `stream`, loading it from the store on
    /// a miss.
    ///
    /// A stream unknown to the store compiles to an empty schema (plus
    /// placeholders). If the store is unreachable nothing is cached.
    pub async fn get(&self, stream: &StreamKey) -> IngestResult<Arc<CompiledSchema>> {
        let cached = self.entries.get(stream).map(|entry| Arc::clone(entry.value()));
        if let Some(schema) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(schema);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let fields = match call_store(self.store_timeout, self.store.load_schema(stream)).await {
            Ok(fields) => fields,
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let compiled = Arc::new(self.compile(stream, &fields));
        debug!(
            stream = %stream,
            fields = compiled.len(),
            version = compiled.version(),
            "Loaded schema"
        );

        // A snapshot installed while we were loading is at least as new.
        let entry = self.entries.entry(stream.clone()).or_insert(compiled);
        Ok(Arc::clone(entry.value()))
    }

    /// Returns the cached snapshot without touching the store.
    pub fn peek(&self, stream: &StreamKey) -> Option<Arc<CompiledSchema>> {
        self.entries.get(stream).map(|entry| Arc::clone(entry.value()))
    }

    /// Compiles `canonical` into a fresh snapshot with the next version number.
    pub fn compile(&self, stream: &StreamKey, canonical: &[SchemaField]) -> CompiledSchema {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        CompiledSchema::compile(stream.clone(), version, canonical, &self.registry)
    }

    /// Installs `schema` unconditionally, discarding the previous snapshot.
    pub fn replace(&self, stream: &StreamKey, schema: CompiledSchema) -> Arc<CompiledSchema> {
        let schema = Arc::new(schema);
        self.entries.insert(stream.clone(), Arc::clone(&schema));
        schema
    }

    /// Installs the canonical field list returned by the store.
    ///
    /// The store's field list only grows, so when two reconciliations race
    /// the one with more persisted fields is the newer; a shorter list never
    /// displaces it. Returns the snapshot that ends up cached.
    pub fn install(&self, stream: &StreamKey, canonical: &[SchemaField]) -> Arc<CompiledSchema> {
        match self.entries.entry(stream.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().persisted_len() >= canonical.len() {
                    return Arc::clone(entry.get());
                }
                let schema = Arc::new(self.compile(stream, canonical));
                entry.insert(Arc::clone(&schema));
                schema
            }
            Entry::Vacant(entry) => {
                let schema = Arc::new(self.compile(stream, canonical));
                entry.insert(Arc::clone(&schema));
                schema
            }
        }
    }

    /// Drops one stream's snapshot. Returns whether it was cached.
    pub fn invalidate(&self, stream: &StreamKey) -> bool {
        let removed = self.entries.remove(stream).is_some();
        debug!(stream = %stream, removed, "Invalidated schema");
        removed
    }

    /// Drops every cached snapshot.
    pub fn invalidate_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count, "Invalidated all schemas");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn SchemaStore> {
        &self.store
    }

    pub(crate) fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}

/// Runs one store call under a deadline.
pub(crate) async fn call_store<T>(
    timeout: Duration,
    call: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(StoreError::Timeout))
}
