//! Trigger fields and the companion fields they reserve.

use eventschema_types::SchemaField;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Static mapping from a trigger field name to the companion fields that must
/// exist whenever the trigger is used.
///
/// Companions are populated out-of-band by enrichment stages, so their
/// columns are reserved as soon as a trigger field carries a value, even
/// though the event itself never mentions them.
///
/// Deserialization goes through the builder, so trigger and companion names
/// read from a configuration file are lower-cased like any other field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependentFieldRegistry {
    dependents: BTreeMap<String, Vec<SchemaField>>,
}

impl DependentFieldRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DependentFieldRegistryBuilder {
        DependentFieldRegistryBuilder::default()
    }

    /// Companions of `trigger`, in declaration order. Empty for non-triggers.
    pub fn companions(&self, trigger: &str) -> &[SchemaField] {
        self.dependents.get(trigger).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_trigger(&self, name: &str) -> bool {
        self.dependents.contains_key(name)
    }

    /// Trigger names in a stable order.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.dependents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.dependents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }
}

impl<'de> Deserialize<'de> for DependentFieldRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<SchemaField>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .fold(Self::builder(), |builder, (trigger, companions)| {
                builder.add(&trigger, companions)
            })
            .build())
    }
}

/// Builder for [`DependentFieldRegistry`].
#[derive(Debug, Default)]
pub struct DependentFieldRegistryBuilder {
    dependents: BTreeMap<String, Vec<SchemaField>>,
}

impl DependentFieldRegistryBuilder {
    /// Registers companions for `trigger`. Repeated calls for the same
    /// trigger extend its list; a companion name is only kept once. Names
    /// are lower-cased.
    pub fn add(
        mut self,
        trigger: &str,
        companions: impl IntoIterator<Item = SchemaField>,
    ) -> Self {
        let list = self.dependents.entry(trigger.to_lowercase()).or_default();
        for mut companion in companions {
            companion.name = companion.name.to_lowercase();
            if !list.iter().any(|f| f.name == companion.name) {
                list.push(companion);
            }
        }
        self
    }

    pub fn build(self) -> DependentFieldRegistry {
        DependentFieldRegistry {
            dependents: self.dependents,
        }
    }
}
