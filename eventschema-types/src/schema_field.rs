use crate::FieldType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A column of a stream's schema.
///
/// Names are case-folded to lower case on construction; every field is
/// nullable unless a store says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
}

fn nullable_by_default() -> bool {
    true
}

impl SchemaField {
    /// Creates a nullable field, lower-casing `name`.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_lowercase(),
            field_type,
            nullable: true,
        }
    }

    /// Shorthand for a STRING field.
    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Shorthand for a LONG field.
    pub fn long(name: &str) -> Self {
        Self::new(name, FieldType::Long)
    }

    /// Shorthand for a DOUBLE field.
    pub fn double(name: &str) -> Self {
        Self::new(name, FieldType::Double)
    }

    /// Shorthand for a BOOLEAN field.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Shorthand for a TIMESTAMP field.
    pub fn timestamp(name: &str) -> Self {
        Self::new(name, FieldType::Timestamp)
    }
}

/// Identity of one evolving schema: a (project, collection) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    pub project: String,
    pub collection: String,
}

impl StreamKey {
    pub fn new(project: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.collection)
    }
}
