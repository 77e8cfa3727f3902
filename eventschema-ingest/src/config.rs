//! Engine configuration.

use crate::dependent::DependentFieldRegistry;
use crate::error::IngestResult;
use crate::token::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default name of the identity-like field forced to STRING.
pub const DEFAULT_IDENTITY_FIELD: &str = "_user";

/// Configuration for the ingestion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Field whose type is always STRING, whatever shape the value has.
    pub identity_field: String,
    /// Property names that reject the whole event.
    pub reserved_fields: Vec<String>,
    /// Upper bound for each schema store call (ms).
    pub store_timeout_ms: u64,
    /// Deepest container nesting accepted inside one property value.
    pub max_depth: usize,
    /// Trigger field → companion fields.
    pub dependent_fields: DependentFieldRegistry,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            reserved_fields: vec!["id".to_string()],
            store_timeout_ms: 30_000,
            max_depth: DEFAULT_MAX_DEPTH,
            dependent_fields: DependentFieldRegistry::default(),
        }
    }
}

impl IngestConfig {
    /// Parses a configuration document; missing keys take their defaults.
    pub fn from_json(json: &str) -> IngestResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
