//! Typed output records.

use crate::error::IngestResult;
use crate::schema::CompiledSchema;
use eventschema_types::FieldValue;
use std::sync::Arc;

/// Positional values typed by one schema snapshot.
///
/// The record keeps the snapshot it was built against, so positions are
/// never read through a different version.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<CompiledSchema>,
    values: Vec<Option<FieldValue>>,
}

impl Record {
    pub(crate) fn new(schema: Arc<CompiledSchema>) -> Self {
        let values = vec![None; schema.len()];
        Self { schema, values }
    }

    pub(crate) fn set(&mut self, pos: usize, value: Option<FieldValue>) {
        self.values[pos] = value;
    }

    pub fn schema(&self) -> &Arc<CompiledSchema> {
        &self.schema
    }

    /// Version of the snapshot the record was built against.
    pub fn version(&self) -> u64 {
        self.schema.version()
    }

    /// Value of `name`, looked up as given and then lower-cased.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let pos = self
            .schema
            .position(name)
            .or_else(|| self.schema.position(&name.to_lowercase()))?;
        self.get_at(pos)
    }

    pub fn get_at(&self, pos: usize) -> Option<&FieldValue> {
        self.values.get(pos).and_then(Option::as_ref)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// One slot per schema position, `None` where unset.
    pub fn values(&self) -> &[Option<FieldValue>] {
        &self.values
    }

    /// Set fields with their names, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .filter_map(|(field, value)| value.as_ref().map(|v| (field.name.as_str(), v)))
    }

    /// Renders the set fields as a JSON object.
    pub fn to_json(&self) -> IngestResult<serde_json::Value> {
        let mut map = serde_json::Map::with_capacity(self.values.len());
        for (name, value) in self.iter() {
            map.insert(name.to_string(), serde_json::to_value(value)?);
        }
        Ok(serde_json::Value::Object(map))
    }
}
