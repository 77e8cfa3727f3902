//! Compiled, immutable schema snapshots.

use crate::dependent::DependentFieldRegistry;
use eventschema_types::{FieldType, SchemaField, StreamKey};
use std::collections::HashMap;

/// One position of a compiled schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledField {
    pub name: String,
    /// `None` for a placeholder: a trigger field reserved locally that the
    /// store has never typed.
    pub field_type: Option<FieldType>,
}

impl CompiledField {
    pub fn is_placeholder(&self) -> bool {
        self.field_type.is_none()
    }
}

/// An ordered field list plus a positional index, for one stream.
///
/// Snapshots are never mutated; evolution compiles and installs a new one.
/// The store's fields come first, in store order, followed by placeholders
/// for every registered trigger field the store does not know.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    stream: StreamKey,
    version: u64,
    fields: Vec<CompiledField>,
    index: HashMap<String, usize>,
    persisted: usize,
}

impl CompiledSchema {
    pub fn compile(
        stream: StreamKey,
        version: u64,
        canonical: &[SchemaField],
        registry: &DependentFieldRegistry,
    ) -> Self {
        let mut fields = Vec::with_capacity(canonical.len() + registry.len());
        let mut index = HashMap::with_capacity(fields.capacity());

        for field in canonical {
            if index.contains_key(&field.name) {
                continue;
            }
            index.insert(field.name.clone(), fields.len());
            fields.push(CompiledField {
                name: field.name.clone(),
                field_type: Some(field.field_type.clone()),
            });
        }
        let persisted = fields.len();

        for trigger in registry.triggers() {
            if index.contains_key(trigger) {
                continue;
            }
            index.insert(trigger.to_string(), fields.len());
            fields.push(CompiledField {
                name: trigger.to_string(),
                field_type: None,
            });
        }

        Self {
            stream,
            version,
            fields,
            index,
            persisted,
        }
    }

    pub fn stream(&self) -> &StreamKey {
        &self.stream
    }

    /// Monotonic snapshot number, unique within one cache.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields backed by the store (placeholders excluded).
    pub fn persisted_len(&self) -> usize {
        self.persisted
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.position(name).map(|pos| &self.fields[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Looks `name` up as given, then lower-cased.
    pub fn resolve(&self, name: &str) -> Option<&CompiledField> {
        self.field(name).or_else(|| self.field(&name.to_lowercase()))
    }

    /// The store-backed fields as schema fields.
    pub fn schema_fields(&self) -> Vec<SchemaField> {
        self.fields[..self.persisted]
            .iter()
            .filter_map(|f| {
                f.field_type
                    .as_ref()
                    .map(|t| SchemaField::new(&f.name, t.clone()))
            })
            .collect()
    }
}
