use crate::{TypeError, TypeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The data type of a schema field.
///
/// Primitive leaves plus two self-referential compounds. A map's key is
/// always a string, so only its value type is carried.
///
/// Serialized form: primitives are plain strings (`"LONG"`), compounds wrap
/// their inner type (`{"ARRAY": "LONG"}`, `{"MAP": {"ARRAY": "STRING"}}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Long,
    Double,
    Decimal,
    Timestamp,
    Time,
    Date,
    Array(Box<FieldType>),
    Map(Box<FieldType>),
}

impl FieldType {
    /// Wraps `element` as an array type.
    pub fn array_of(element: FieldType) -> Self {
        FieldType::Array(Box::new(element))
    }

    /// Wraps `value` as a map type (string keys).
    pub fn map_of(value: FieldType) -> Self {
        FieldType::Map(Box::new(value))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Long | FieldType::Double | FieldType::Decimal
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, FieldType::Map(_))
    }

    /// True for array and map types.
    pub fn is_compound(&self) -> bool {
        self.is_array() || self.is_map()
    }

    /// Element type of an array.
    ///
    /// Fails with [`TypeError::TypeMismatch`] on anything but `ARRAY`.
    pub fn element_type(&self) -> TypeResult<&FieldType> {
        match self {
            FieldType::Array(element) => Ok(element),
            other => Err(TypeError::TypeMismatch {
                expected: "ARRAY",
                found: other.clone(),
            }),
        }
    }

    /// Value type of a map.
    ///
    /// Fails with [`TypeError::TypeMismatch`] on anything but `MAP`.
    pub fn value_type(&self) -> TypeResult<&FieldType> {
        match self {
            FieldType::Map(value) => Ok(value),
            other => Err(TypeError::TypeMismatch {
                expected: "MAP",
                found: other.clone(),
            }),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("STRING"),
            FieldType::Boolean => f.write_str("BOOLEAN"),
            FieldType::Integer => f.write_str("INTEGER"),
            FieldType::Long => f.write_str("LONG"),
            FieldType::Double => f.write_str("DOUBLE"),
            FieldType::Decimal => f.write_str("DECIMAL"),
            FieldType::Timestamp => f.write_str("TIMESTAMP"),
            FieldType::Time => f.write_str("TIME"),
            FieldType::Date => f.write_str("DATE"),
            FieldType::Array(element) => write!(f, "ARRAY({element})"),
            FieldType::Map(value) => write!(f, "MAP({value})"),
        }
    }
}
