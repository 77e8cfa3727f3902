use crate::{FieldType, TypeError, TypeResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A typed value held by one position of a record.
///
/// Absent values are modelled as `Option<FieldValue>` by the containers
/// (records, arrays, maps) rather than as a variant here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    Decimal(f64),
    Timestamp(DateTime<Utc>),
    Time(NaiveTime),
    Date(NaiveDate),
    Array(Vec<Option<FieldValue>>),
    Map(BTreeMap<String, Option<FieldValue>>),
}

impl FieldValue {
    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "string",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Long(_) => "long",
            FieldValue::Double(_) => "double",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Time(_) => "time",
            FieldValue::Date(_) => "date",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Long(v) => Some(*v),
            FieldValue::Integer(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Double(v) | FieldValue::Decimal(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts this value so it can be stored in a column of type `target`.
    ///
    /// Numbers convert freely among numeric types (fractions truncate toward
    /// zero for integral targets), scalars render as text for `STRING`, and
    /// temporal types parse from their canonical string forms. Compounds
    /// require the matching shape and coerce their members recursively.
    pub fn coerce(self, target: &FieldType) -> TypeResult<FieldValue> {
        let unsupported = |found: &'static str| TypeError::UnsupportedShape {
            expected: target.clone(),
            found,
        };

        match (target, self) {
            (FieldType::String, FieldValue::String(s)) => Ok(FieldValue::String(s)),
            (FieldType::String, FieldValue::Boolean(b)) => Ok(FieldValue::String(b.to_string())),
            (FieldType::String, FieldValue::Integer(v)) => Ok(FieldValue::String(v.to_string())),
            (FieldType::String, FieldValue::Long(v)) => Ok(FieldValue::String(v.to_string())),
            (FieldType::String, FieldValue::Double(v) | FieldValue::Decimal(v)) => {
                Ok(FieldValue::String(v.to_string()))
            }
            (FieldType::String, FieldValue::Timestamp(ts)) => {
                Ok(FieldValue::String(ts.to_rfc3339()))
            }
            (FieldType::String, FieldValue::Date(d)) => Ok(FieldValue::String(d.to_string())),
            (FieldType::String, FieldValue::Time(t)) => Ok(FieldValue::String(t.to_string())),

            (FieldType::Boolean, FieldValue::Boolean(b)) => Ok(FieldValue::Boolean(b)),

            (FieldType::Long, FieldValue::Long(v)) => Ok(FieldValue::Long(v)),
            (FieldType::Long, FieldValue::Integer(v)) => Ok(FieldValue::Long(i64::from(v))),
            (FieldType::Long, FieldValue::Double(v) | FieldValue::Decimal(v)) => {
                truncate_i64(v).map(FieldValue::Long).ok_or_else(|| unsupported("double"))
            }

            (FieldType::Integer, FieldValue::Integer(v)) => Ok(FieldValue::Integer(v)),
            (FieldType::Integer, FieldValue::Long(v)) => i32::try_from(v)
                .map(FieldValue::Integer)
                .map_err(|_| unsupported("long")),
            (FieldType::Integer, FieldValue::Double(v) | FieldValue::Decimal(v)) => {
                truncate_i64(v)
                    .and_then(|v| i32::try_from(v).ok())
                    .map(FieldValue::Integer)
                    .ok_or_else(|| unsupported("double"))
            }

            (FieldType::Double, value) => to_f64(&value)
                .map(FieldValue::Double)
                .ok_or_else(|| unsupported(value.kind())),
            (FieldType::Decimal, value) => to_f64(&value)
                .map(FieldValue::Decimal)
                .ok_or_else(|| unsupported(value.kind())),

            (FieldType::Timestamp, FieldValue::Timestamp(ts)) => Ok(FieldValue::Timestamp(ts)),
            (FieldType::Timestamp, FieldValue::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|_| unsupported("string")),
            (FieldType::Timestamp, FieldValue::Long(millis)) => {
                DateTime::from_timestamp_millis(millis)
                    .map(FieldValue::Timestamp)
                    .ok_or_else(|| unsupported("long"))
            }
            (FieldType::Timestamp, FieldValue::Integer(millis)) => {
                DateTime::from_timestamp_millis(i64::from(millis))
                    .map(FieldValue::Timestamp)
                    .ok_or_else(|| unsupported("integer"))
            }

            (FieldType::Date, FieldValue::Date(d)) => Ok(FieldValue::Date(d)),
            (FieldType::Date, FieldValue::Timestamp(ts)) => Ok(FieldValue::Date(ts.date_naive())),
            (FieldType::Date, FieldValue::String(s)) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| unsupported("string")),

            (FieldType::Time, FieldValue::Time(t)) => Ok(FieldValue::Time(t)),
            (FieldType::Time, FieldValue::String(s)) => NaiveTime::parse_from_str(&s, "%H:%M:%S%.f")
                .map(FieldValue::Time)
                .map_err(|_| unsupported("string")),

            (FieldType::Array(element), FieldValue::Array(items)) => items
                .into_iter()
                .map(|item| item.map(|v| v.coerce(element)).transpose())
                .collect::<TypeResult<Vec<_>>>()
                .map(FieldValue::Array),

            (FieldType::Map(value_type), FieldValue::Map(entries)) => entries
                .into_iter()
                .map(|(k, v)| -> TypeResult<(String, Option<FieldValue>)> {
                    Ok((k, v.map(|v| v.coerce(value_type)).transpose()?))
                })
                .collect::<TypeResult<BTreeMap<_, _>>>()
                .map(FieldValue::Map),

            (_, other) => Err(unsupported(other.kind())),
        }
    }
}

fn to_f64(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Integer(v) => Some(f64::from(*v)),
        FieldValue::Long(v) => Some(*v as f64),
        FieldValue::Double(v) | FieldValue::Decimal(v) => Some(*v),
        _ => None,
    }
}

fn truncate_i64(v: f64) -> Option<i64> {
    // i64::MAX is not representable as f64; the bound below is 2^63.
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}
