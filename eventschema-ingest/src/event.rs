//! Event envelopes.
//!
//! An event arrives as
//!
//! ```json
//! {"project": "p", "collection": "c", "api": {...}, "properties": {...}}
//! ```
//!
//! `project` and `collection` must precede `properties`, since the record
//! is built while the properties are streamed. Unknown keys are skipped.

use crate::builder::{PROPERTIES_FIELD, RecordBuilder};
use crate::error::{IngestError, IngestResult};
use crate::record::Record;
use crate::token::{Token, TokenStream, read_json, skip_value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Client library that produced an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    pub name: Option<String>,
    pub version: Option<String>,
}

/// Request metadata sent in the `api` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventContext {
    pub api_key: Option<String>,
    pub library: Option<Library>,
    pub api_version: Option<String>,
    /// Client upload time, epoch milliseconds.
    pub upload_time: Option<i64>,
    pub checksum: Option<String>,
}

/// A decoded event.
#[derive(Debug, Clone)]
pub struct Event {
    pub project: String,
    pub collection: String,
    pub context: Option<EventContext>,
    pub record: Record,
}

/// Decodes event envelopes, delegating properties to a [`RecordBuilder`].
#[derive(Clone)]
pub struct EventDeserializer {
    builder: Arc<RecordBuilder>,
}

impl EventDeserializer {
    pub fn new(builder: Arc<RecordBuilder>) -> Self {
        Self { builder }
    }

    pub fn builder(&self) -> &Arc<RecordBuilder> {
        &self.builder
    }

    /// Reads one event from `stream`.
    ///
    /// `project` is the project resolved by the caller (e.g. from an API
    /// key). When given, the payload may not name a project itself.
    pub async fn deserialize<S: TokenStream + Send + ?Sized>(
        &self,
        stream: &mut S,
        project: Option<&str>,
    ) -> IngestResult<Event> {
        if stream.current().is_none() {
            stream.next_token()?;
        }
        if !matches!(stream.current(), Some(Token::StartObject)) {
            return Err(IngestError::malformed("event must be an object"));
        }

        let resolved = project.is_some();
        let mut project = project.map(str::to_string);
        let mut collection: Option<String> = None;
        let mut context = None;
        let mut record = None;

        loop {
            let key = match stream.next_token()? {
                Token::EndObject => break,
                Token::FieldName(name) => name.clone(),
                other => {
                    return Err(IngestError::malformed(format!(
                        "expected field name, found {}",
                        other.value_kind()
                    )));
                }
            };
            stream.next_token()?;

            match key.as_str() {
                "project" => {
                    if let Some(value) = read_text(stream, "project")? {
                        if resolved {
                            return Err(IngestError::malformed("project is already set"));
                        }
                        project = Some(value);
                    }
                }
                "collection" => {
                    collection = read_text(stream, "collection")?.map(|c| c.to_lowercase());
                }
                "api" => {
                    context = match read_json(stream)? {
                        serde_json::Value::Null => None,
                        value => Some(serde_json::from_value(value).map_err(|e| {
                            IngestError::malformed(format!("invalid api section: {e}"))
                        })?),
                    };
                }
                PROPERTIES_FIELD => {
                    let (Some(project), Some(collection)) = (&project, &collection) else {
                        return Err(IngestError::malformed(
                            "project and collection must be set before properties",
                        ));
                    };
                    record = Some(
                        self.builder
                            .build_record(project, collection, stream)
                            .await?,
                    );
                }
                _ => skip_value(stream)?,
            }
        }

        let (Some(project), Some(collection), Some(record)) = (project, collection, record) else {
            return Err(IngestError::malformed("properties is missing"));
        };
        Ok(Event {
            project,
            collection,
            context,
            record,
        })
    }
}

/// Reads a string or null envelope value.
fn read_text<S: TokenStream + ?Sized>(stream: &mut S, key: &str) -> IngestResult<Option<String>> {
    match stream.current() {
        Some(Token::String(s)) => Ok(Some(s.clone())),
        Some(Token::Null) => Ok(None),
        Some(other) => Err(IngestError::malformed(format!(
            "{key} must be a string, found {}",
            other.value_kind()
        ))),
        None => Err(IngestError::malformed(format!("{key} is missing a value"))),
    }
}
