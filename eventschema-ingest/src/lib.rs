//! Schema inference and evolution for semi-structured event streams.
//!
//! Turns JSON-like event properties into typed [`Record`]s against a schema
//! discovered per stream (project + collection) and evolved on the fly:
//! - [`TypeInferencer`] — infers a [`FieldType`](eventschema_types::FieldType)
//!   for an unseen field from its first value, on a forward-only stream
//! - [`DependentFieldRegistry`] — trigger fields and the companion columns
//!   they reserve
//! - [`SchemaCache`] — lazily loaded, snapshot-replaced compiled schemas
//! - [`SchemaEvolutionCoordinator`] — merges new fields through the shared
//!   [`SchemaStore`](eventschema_store::SchemaStore)
//! - [`RecordBuilder`] — walks a [`TokenStream`] and emits a record,
//!   reconciling new fields once per event
//! - [`EventDeserializer`] — decodes the surrounding event envelope
//!
//! ```no_run
//! use eventschema_ingest::{IngestConfig, JsonTokenizer, RecordBuilder};
//! use eventschema_store::InMemorySchemaStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> eventschema_ingest::IngestResult<()> {
//! let builder = RecordBuilder::new(Arc::new(InMemorySchemaStore::new()), IngestConfig::default());
//! let mut tokens = JsonTokenizer::new(r#"{"a": 5, "b": "x"}"#);
//! let record = builder.build_record("p", "c", &mut tokens).await?;
//! assert_eq!(record.schema().len(), 2);
//! # Ok(())
//! # }
//! ```

mod builder;
mod cache;
mod config;
mod dependent;
mod error;
mod event;
mod evolution;
mod infer;
mod record;
mod schema;
mod token;

pub use builder::{PROPERTIES_FIELD, RecordBuilder};
pub use cache::{CacheStats, SchemaCache};
pub use config::{DEFAULT_IDENTITY_FIELD, IngestConfig};
pub use dependent::{DependentFieldRegistry, DependentFieldRegistryBuilder};
pub use error::{IngestError, IngestResult};
pub use event::{Event, EventContext, EventDeserializer, Library};
pub use evolution::SchemaEvolutionCoordinator;
pub use infer::{Inference, Lookahead, Opened, TypeInferencer};
pub use record::Record;
pub use schema::{CompiledField, CompiledSchema};
pub use token::{DEFAULT_MAX_DEPTH, JsonTokenizer, Token, TokenStream, read_json, skip_value};
