//! Type inference for values of unseen fields.
//!
//! The stream is forward-only, so finding the element type of `[1, 2]` or the
//! value type of `{"k": "v"}` means stepping past the opening token and the
//! first key. Those steps are recorded in a [`Lookahead`] that value
//! construction consumes instead of expecting the opening tokens again.

use crate::error::{IngestError, IngestResult};
use crate::token::{DEFAULT_MAX_DEPTH, Token, TokenStream, enter_container, skip_open};
use eventschema_types::FieldType;
use std::collections::VecDeque;

/// A structure opening consumed during inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    Array,
    Map { first_key: String },
}

/// Openings already consumed by inference, outermost first.
///
/// Each entry belongs to the first element (or first value) of the level
/// above it, so readers pop one entry per level while descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookahead {
    opened: VecDeque<Opened>,
}

impl Lookahead {
    /// True when the cursor already sits past a structure's opening token.
    pub fn is_pre_advanced(&self) -> bool {
        !self.opened.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.opened.len()
    }

    pub(crate) fn pop(&mut self) -> Option<Opened> {
        self.opened.pop_front()
    }
}

/// Result of inferring one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    /// `None` when the value does not determine a type (null, `[]`, `{}`).
    pub field_type: Option<FieldType>,
    pub lookahead: Lookahead,
}

/// Infers a [`FieldType`] from a single value.
#[derive(Debug, Clone)]
pub struct TypeInferencer {
    identity_field: String,
    max_depth: usize,
}

impl TypeInferencer {
    /// `identity_field` is always inferred as STRING. Field names are
    /// case-insensitive, so it is stored lower-cased.
    pub fn new(identity_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into().to_lowercase(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Values nested deeper than `max_depth` containers are rejected as
    /// malformed.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Infers the type of `field_name`'s value under the cursor.
    ///
    /// Same as [`infer`](Self::infer), except that a determined type for the
    /// identity field is replaced by STRING.
    pub fn infer_field<S: TokenStream + ?Sized>(
        &self,
        field_name: &str,
        stream: &mut S,
    ) -> IngestResult<Inference> {
        let mut inference = self.infer(stream)?;
        inference.field_type = inference
            .field_type
            .map(|inferred| self.column_type(field_name, inferred));
        Ok(inference)
    }

    /// Type of the column to create for `field_name` given the type its
    /// value was inferred as.
    pub fn column_type(&self, field_name: &str, inferred: FieldType) -> FieldType {
        if field_name == self.identity_field {
            FieldType::String
        } else {
            inferred
        }
    }

    /// Infers the type of the value under the cursor.
    ///
    /// With a determined type, the cursor is left on the innermost first
    /// scalar and the returned lookahead lists the openings passed on the
    /// way. With an undetermined type, every opened structure has been
    /// skipped to its end and the lookahead is empty.
    pub fn infer<S: TokenStream + ?Sized>(&self, stream: &mut S) -> IngestResult<Inference> {
        let mut opened = VecDeque::new();
        let field_type = infer_value(stream, &mut opened, self.max_depth)?;

        if field_type.is_none() && !opened.is_empty() {
            skip_open(stream, opened.len())?;
            opened.clear();
        }

        Ok(Inference {
            field_type,
            lookahead: Lookahead { opened },
        })
    }
}

fn infer_value<S: TokenStream + ?Sized>(
    stream: &mut S,
    opened: &mut VecDeque<Opened>,
    max_depth: usize,
) -> IngestResult<Option<FieldType>> {
    let field_type = match stream.current() {
        Some(Token::Null) => None,
        Some(Token::Bool(_)) => Some(FieldType::Boolean),
        Some(Token::Int(_)) => Some(FieldType::Long),
        Some(Token::Float(_)) => Some(FieldType::Double),
        Some(Token::String(_)) => Some(FieldType::String),
        Some(Token::StartArray) => {
            enter_container(opened.len(), max_depth)?;
            if matches!(stream.next_token()?, Token::EndArray) {
                return Ok(None);
            }
            opened.push_back(Opened::Array);
            infer_value(stream, opened, max_depth)?.map(FieldType::array_of)
        }
        Some(Token::StartObject) => {
            enter_container(opened.len(), max_depth)?;
            let first_key = match stream.next_token()? {
                Token::EndObject => return Ok(None),
                Token::FieldName(name) => name.clone(),
                other => {
                    return Err(IngestError::malformed(format!(
                        "expected field name, found {}",
                        other.value_kind()
                    )));
                }
            };
            stream.next_token()?;
            opened.push_back(Opened::Map { first_key });
            infer_value(stream, opened, max_depth)?.map(FieldType::map_of)
        }
        Some(other) => {
            return Err(IngestError::malformed(format!(
                "expected a value, found {}",
                other.value_kind()
            )));
        }
        None => return Err(IngestError::malformed("expected a value, found nothing")),
    };
    Ok(field_type)
}
