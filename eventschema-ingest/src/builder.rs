//! Record construction from a token stream.
//!
//! A build runs in two phases. The walk is synchronous: it reads every
//! property against the cached snapshot, infers types for unseen names and
//! collects proposals. If anything was proposed, a single reconciliation
//! round-trip follows and the record is assembled against the snapshot it
//! produced, so one record never mixes positions of two versions.

use crate::cache::SchemaCache;
use crate::config::IngestConfig;
use crate::dependent::DependentFieldRegistry;
use crate::error::{IngestError, IngestResult};
use crate::evolution::SchemaEvolutionCoordinator;
use crate::infer::{Lookahead, Opened, TypeInferencer};
use crate::record::Record;
use crate::schema::{CompiledField, CompiledSchema};
use crate::token::{Token, TokenStream, enter_container, skip_value};
use eventschema_store::SchemaStore;
use eventschema_types::{FieldType, FieldValue, SchemaField, StreamKey};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Name of the envelope section holding event properties.
pub const PROPERTIES_FIELD: &str = "properties";

/// Builds typed records, evolving stream schemas as new fields appear.
pub struct RecordBuilder {
    cache: Arc<SchemaCache>,
    coordinator: SchemaEvolutionCoordinator,
    inferencer: TypeInferencer,
    registry: Arc<DependentFieldRegistry>,
    reserved: HashSet<String>,
    max_depth: usize,
}

/// Container nesting of the value being read.
#[derive(Debug, Clone, Copy)]
struct Depth {
    level: usize,
    max: usize,
}

impl Depth {
    fn top(max: usize) -> Self {
        Self { level: 0, max }
    }

    fn enter(self) -> IngestResult<Self> {
        Ok(Self {
            level: enter_container(self.level, self.max)?,
            ..self
        })
    }
}

/// A value read during the walk, with the type it was built against.
#[derive(Debug)]
struct ReadValue {
    name: String,
    built_as: FieldType,
    value: Option<FieldValue>,
}

#[derive(Debug, Default)]
struct Walk {
    values: Vec<ReadValue>,
    proposed: Vec<SchemaField>,
}

impl Walk {
    /// The first proposal for a name wins.
    fn propose(&mut self, field: SchemaField) {
        if !self.proposed.iter().any(|f| f.name == field.name) {
            self.proposed.push(field);
        }
    }
}

impl RecordBuilder {
    pub fn new(store: Arc<dyn SchemaStore>, config: IngestConfig) -> Self {
        let registry = Arc::new(config.dependent_fields.clone());
        let cache = Arc::new(SchemaCache::new(
            store,
            Arc::clone(&registry),
            config.store_timeout(),
        ));
        Self {
            coordinator: SchemaEvolutionCoordinator::new(Arc::clone(&cache)),
            cache,
            inferencer: TypeInferencer::new(config.identity_field)
                .with_max_depth(config.max_depth),
            registry,
            reserved: config
                .reserved_fields
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            max_depth: config.max_depth,
        }
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    pub fn inferencer(&self) -> &TypeInferencer {
        &self.inferencer
    }

    /// Reads one properties object from `stream` into a record for
    /// `project`/`collection`.
    ///
    /// The cursor must sit on the object's opening token, or before it on a
    /// fresh stream. On success it is left on the closing token.
    pub async fn build_record<S: TokenStream + Send + ?Sized>(
        &self,
        project: &str,
        collection: &str,
        stream: &mut S,
    ) -> IngestResult<Record> {
        let key = StreamKey::new(project, collection);
        let current = self.cache.get(&key).await?;
        let walk = self.walk(&current, stream)?;

        let schema = if walk.proposed.is_empty() {
            current
        } else {
            debug!(
                stream = %key,
                proposed = walk.proposed.len(),
                "Reconciling new fields"
            );
            self.coordinator
                .reconcile(&key, &current, walk.proposed)
                .await?
        };
        assemble(schema, walk.values)
    }

    /// Drops the cached schema of one stream.
    pub fn invalidate(&self, project: &str, collection: &str) -> bool {
        self.cache.invalidate(&StreamKey::new(project, collection))
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    fn walk<S: TokenStream + ?Sized>(
        &self,
        schema: &CompiledSchema,
        stream: &mut S,
    ) -> IngestResult<Walk> {
        if stream.current().is_none() {
            stream.next_token()?;
        }
        match stream.current() {
            Some(Token::StartObject) => {}
            Some(other) => {
                return Err(IngestError::malformed(format!(
                    "properties must be an object, found {}",
                    other.value_kind()
                )));
            }
            None => return Err(IngestError::malformed("properties must be an object")),
        }

        let mut walk = Walk::default();
        loop {
            let name = match stream.next_token()? {
                Token::EndObject => break,
                Token::FieldName(name) => name.clone(),
                other => {
                    return Err(IngestError::malformed(format!(
                        "expected field name, found {}",
                        other.value_kind()
                    )));
                }
            };
            let lower = name.to_lowercase();
            if self.reserved.contains(&lower) {
                return Err(IngestError::ReservedFieldName(name));
            }

            stream.next_token()?;
            if lower == PROPERTIES_FIELD && matches!(stream.current(), Some(Token::StartObject)) {
                return Err(IngestError::NestedPropertiesNotSupported);
            }

            match schema.resolve(&name) {
                Some(CompiledField {
                    name: resolved,
                    field_type: Some(field_type),
                }) => {
                    let value = read_value(
                        stream,
                        field_type,
                        &mut Lookahead::default(),
                        resolved,
                        Depth::top(self.max_depth),
                    )?;
                    walk.values.push(ReadValue {
                        name: resolved.clone(),
                        built_as: field_type.clone(),
                        value,
                    });
                }
                Some(placeholder) => {
                    for companion in self.registry.companions(&placeholder.name) {
                        if !schema.contains(&companion.name) {
                            walk.propose(companion.clone());
                        }
                    }
                    skip_value(stream)?;
                }
                None => {
                    let inference = self.inferencer.infer(stream)?;
                    let Some(inferred) = inference.field_type else {
                        continue;
                    };
                    let mut lookahead = inference.lookahead;
                    let value = read_value(
                        stream,
                        &inferred,
                        &mut lookahead,
                        &lower,
                        Depth::top(self.max_depth),
                    )?;
                    let column_type = self.inferencer.column_type(&lower, inferred.clone());
                    walk.propose(SchemaField::new(&lower, column_type));
                    walk.values.push(ReadValue {
                        name: lower,
                        built_as: inferred,
                        value,
                    });
                }
            }
        }
        Ok(walk)
    }
}

/// Places the read values at their positions in `schema`.
///
/// Values whose column the store typed differently are coerced to the
/// store's type; values without a typed column are dropped.
fn assemble(schema: Arc<CompiledSchema>, values: Vec<ReadValue>) -> IngestResult<Record> {
    let mut record = Record::new(Arc::clone(&schema));
    for read in values {
        let Some(pos) = schema.position(&read.name) else {
            continue;
        };
        let Some(canonical) = schema.fields()[pos].field_type.as_ref() else {
            continue;
        };
        let value = match read.value {
            Some(value) if *canonical != read.built_as => Some(
                value
                    .coerce(canonical)
                    .map_err(|e| IngestError::value_shape(&read.name, e))?,
            ),
            value => value,
        };
        record.set(pos, value);
    }
    Ok(record)
}

/// Reads the value under the cursor as `field_type`.
///
/// Openings recorded in `lookahead` are taken as already consumed: the
/// cursor then sits on the first element (or first value) of that level.
/// On return the cursor is on the value's last token.
fn read_value<S: TokenStream + ?Sized>(
    stream: &mut S,
    field_type: &FieldType,
    lookahead: &mut Lookahead,
    field: &str,
    depth: Depth,
) -> IngestResult<Option<FieldValue>> {
    if let Some(opened) = lookahead.pop() {
        return match (opened, field_type) {
            (Opened::Array, FieldType::Array(element)) => {
                read_array(stream, element, lookahead, field, depth.enter()?, true).map(Some)
            }
            (Opened::Map { first_key }, FieldType::Map(value_type)) => {
                read_map(stream, value_type, lookahead, field, depth.enter()?, Some(first_key))
                    .map(Some)
            }
            (_, other) => Err(IngestError::malformed(format!(
                "field '{field}': consumed opening does not match type {other}"
            ))),
        };
    }

    let token = stream
        .current()
        .ok_or_else(|| IngestError::malformed("expected a value, found nothing"))?;
    let value = match (token, field_type) {
        (Token::Null, _) => return Ok(None),
        (Token::StartArray, FieldType::Array(element)) => {
            return read_array(stream, element, lookahead, field, depth.enter()?, false).map(Some);
        }
        (Token::StartObject, FieldType::Map(value_type)) => {
            return read_map(stream, value_type, lookahead, field, depth.enter()?, None).map(Some);
        }
        (Token::String(s), _) => FieldValue::String(s.clone()),
        (Token::Int(v), _) => FieldValue::Long(*v),
        (Token::Float(v), _) => FieldValue::Double(*v),
        (Token::Bool(b), _) => FieldValue::Boolean(*b),
        (other, expected) => {
            return Err(IngestError::UnsupportedValueShape {
                field: field.to_string(),
                expected: expected.clone(),
                found: other.value_kind().to_string(),
            });
        }
    };
    value
        .coerce(field_type)
        .map(Some)
        .map_err(|e| IngestError::value_shape(field, e))
}

fn read_array<S: TokenStream + ?Sized>(
    stream: &mut S,
    element: &FieldType,
    lookahead: &mut Lookahead,
    field: &str,
    depth: Depth,
    pre_advanced: bool,
) -> IngestResult<FieldValue> {
    let mut items = Vec::new();
    if pre_advanced {
        items.push(read_value(stream, element, lookahead, field, depth)?);
    }
    while !matches!(stream.next_token()?, Token::EndArray) {
        items.push(read_value(stream, element, lookahead, field, depth)?);
    }
    Ok(FieldValue::Array(items))
}

fn read_map<S: TokenStream + ?Sized>(
    stream: &mut S,
    value_type: &FieldType,
    lookahead: &mut Lookahead,
    field: &str,
    depth: Depth,
    first_key: Option<String>,
) -> IngestResult<FieldValue> {
    let mut entries = BTreeMap::new();
    if let Some(key) = first_key {
        let value = read_value(stream, value_type, lookahead, field, depth)?;
        entries.insert(key, value);
    }
    loop {
        let key = match stream.next_token()? {
            Token::EndObject => break,
            Token::FieldName(key) => key.clone(),
            other => {
                return Err(IngestError::malformed(format!(
                    "expected map key, found {}",
                    other.value_kind()
                )));
            }
        };
        stream.next_token()?;
        let value = read_value(stream, value_type, lookahead, field, depth)?;
        entries.insert(key, value);
    }
    Ok(FieldValue::Map(entries))
}
