//! Shared test helpers for ingestion tests.

#![allow(dead_code)]

use async_trait::async_trait;
use eventschema_ingest::{
    DependentFieldRegistry, IngestConfig, IngestError, IngestResult, JsonTokenizer, Record,
    RecordBuilder, Token, TokenStream,
};
use eventschema_store::{InMemorySchemaStore, SchemaStore, StoreError, StoreResult};
use eventschema_types::{FieldType, SchemaField, StreamKey};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Installs a fmt subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn key(project: &str, collection: &str) -> StreamKey {
    StreamKey::new(project, collection)
}

/// `ref` reserves `ref_domain` and `ref_path`.
pub fn ref_registry() -> DependentFieldRegistry {
    DependentFieldRegistry::builder()
        .add(
            "ref",
            [SchemaField::string("ref_domain"), SchemaField::string("ref_path")],
        )
        .build()
}

pub fn builder_with(store: Arc<dyn SchemaStore>, config: IngestConfig) -> RecordBuilder {
    init_tracing();
    RecordBuilder::new(store, config)
}

pub fn memory_builder() -> (InMemorySchemaStore, RecordBuilder) {
    let store = InMemorySchemaStore::new();
    let builder = builder_with(Arc::new(store.clone()), IngestConfig::default());
    (store, builder)
}

/// Builds a record for `p.c` from a JSON properties object.
pub async fn build(builder: &RecordBuilder, json: &str) -> IngestResult<Record> {
    let mut tokens = JsonTokenizer::new(json);
    builder.build_record("p", "c", &mut tokens).await
}

/// A token stream replaying a prepared list, bypassing the tokenizer's own
/// checks.
pub struct TokenList {
    tokens: std::vec::IntoIter<Token>,
    current: Option<Token>,
}

impl TokenList {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            current: None,
        }
    }

    /// `{"<name>": [[...[1]...]]}` with `depth` arrays.
    pub fn nested_arrays(name: &str, depth: usize) -> Self {
        let mut tokens = vec![Token::StartObject, Token::FieldName(name.to_string())];
        tokens.extend(std::iter::repeat_n(Token::StartArray, depth));
        tokens.push(Token::Int(1));
        tokens.extend(std::iter::repeat_n(Token::EndArray, depth));
        tokens.push(Token::EndObject);
        Self::new(tokens)
    }
}

impl TokenStream for TokenList {
    fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    fn next_token(&mut self) -> IngestResult<&Token> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| IngestError::MalformedInput("token list exhausted".into()))?;
        Ok(self.current.insert(token))
    }
}

/// Field names and types of a record's schema, in order.
pub fn layout(record: &Record) -> Vec<(String, Option<FieldType>)> {
    record
        .schema()
        .fields()
        .iter()
        .map(|f| (f.name.clone(), f.field_type.clone()))
        .collect()
}

/// Wraps a store, counting calls and failing on demand.
pub struct FlakyStore {
    inner: InMemorySchemaStore,
    pub loads: AtomicUsize,
    pub merges: AtomicUsize,
    pub failing: AtomicBool,
    pub delay: Option<Duration>,
}

impl FlakyStore {
    pub fn new(inner: InMemorySchemaStore) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            merges: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        }
    }

    /// A store whose every call takes `delay` before answering.
    pub fn slow(inner: InMemorySchemaStore, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(inner)
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn merge_count(&self) -> usize {
        self.merges.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> StoreResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaStore for FlakyStore {
    async fn load_schema(&self, stream: &StreamKey) -> StoreResult<Vec<SchemaField>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.load_schema(stream).await
    }

    async fn merge_fields(
        &self,
        stream: &StreamKey,
        proposed: &[SchemaField],
    ) -> StoreResult<Vec<SchemaField>> {
        self.merges.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.merge_fields(stream, proposed).await
    }
}
