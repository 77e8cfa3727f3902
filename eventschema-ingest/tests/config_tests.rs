use eventschema_ingest::{
    DEFAULT_IDENTITY_FIELD, DEFAULT_MAX_DEPTH, DependentFieldRegistry, IngestConfig, IngestError,
};
use eventschema_types::{FieldType, SchemaField};
use pretty_assertions::assert_eq;
use std::time::Duration;

// ── IngestConfig ────────────────────────────────────────────────

#[test]
fn defaults() {
    let config = IngestConfig::default();
    assert_eq!(config.identity_field, DEFAULT_IDENTITY_FIELD);
    assert_eq!(config.reserved_fields, vec!["id".to_string()]);
    assert_eq!(config.store_timeout(), Duration::from_secs(30));
    assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    assert_eq!(config.max_depth, 128);
    assert!(config.dependent_fields.is_empty());
}

#[test]
fn from_json_fills_missing_keys() {
    let config = IngestConfig::from_json(r#"{"store_timeout_ms": 250}"#).unwrap();
    assert_eq!(config.store_timeout(), Duration::from_millis(250));
    assert_eq!(config.identity_field, "_user");
    assert_eq!(config.reserved_fields, vec!["id".to_string()]);
    assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);

    let config = IngestConfig::from_json(r#"{"max_depth": 16}"#).unwrap();
    assert_eq!(config.max_depth, 16);
}

#[test]
fn from_json_reads_dependent_fields() {
    let config = IngestConfig::from_json(
        r#"{
            "identity_field": "uid",
            "dependent_fields": {
                "ref": [
                    {"name": "ref_domain", "type": "STRING"},
                    {"name": "ref_hits", "type": "LONG", "nullable": false}
                ]
            }
        }"#,
    )
    .unwrap();

    assert_eq!(config.identity_field, "uid");
    let companions = config.dependent_fields.companions("ref");
    assert_eq!(companions.len(), 2);
    assert_eq!(companions[0], SchemaField::string("ref_domain"));
    assert_eq!(companions[1].field_type, FieldType::Long);
    assert!(!companions[1].nullable);
}

#[test]
fn from_json_lower_cases_dependent_field_names() {
    let config = IngestConfig::from_json(
        r#"{
            "dependent_fields": {
                "Ref": [{"name": "Ref_Domain", "type": "STRING"}],
                "REF": [{"name": "ref_domain", "type": "STRING"}, {"name": "Ref_Path", "type": "STRING"}]
            }
        }"#,
    )
    .unwrap();

    let registry = &config.dependent_fields;
    assert_eq!(registry.len(), 1);
    assert!(registry.is_trigger("ref"));
    assert!(!registry.is_trigger("Ref"));
    assert_eq!(
        registry.companions("ref"),
        &[SchemaField::string("ref_domain"), SchemaField::string("ref_path")]
    );
}

#[test]
fn from_json_rejects_bad_documents() {
    let err = IngestConfig::from_json(r#"{"store_timeout_ms": "soon"}"#).unwrap_err();
    assert!(matches!(err, IngestError::Serialization(_)));
    assert!(!err.is_client_error());
}

#[test]
fn round_trips_through_json() {
    let config = IngestConfig {
        dependent_fields: DependentFieldRegistry::builder()
            .add("ref", [SchemaField::string("ref_path")])
            .build(),
        ..IngestConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back = IngestConfig::from_json(&json).unwrap();
    assert_eq!(back.dependent_fields, config.dependent_fields);
}

// ── DependentFieldRegistry ──────────────────────────────────────

#[test]
fn builder_lower_cases_triggers_and_dedupes() {
    let registry = DependentFieldRegistry::builder()
        .add("Ref", [SchemaField::string("ref_domain")])
        .add(
            "ref",
            [SchemaField::string("ref_domain"), SchemaField::string("ref_path")],
        )
        .add("campaign", [SchemaField::string("campaign_source")])
        .build();

    assert_eq!(registry.len(), 2);
    assert!(registry.is_trigger("ref"));
    assert!(!registry.is_trigger("Ref"));
    assert_eq!(
        registry.companions("ref"),
        &[SchemaField::string("ref_domain"), SchemaField::string("ref_path")]
    );
    assert_eq!(registry.triggers().collect::<Vec<_>>(), vec!["campaign", "ref"]);
}

#[test]
fn builder_lower_cases_companion_names() {
    let companion = SchemaField {
        name: "Ref_Domain".into(),
        ..SchemaField::string("x")
    };
    let registry = DependentFieldRegistry::builder().add("ref", [companion]).build();
    assert_eq!(registry.companions("ref"), &[SchemaField::string("ref_domain")]);
}

#[test]
fn unknown_trigger_has_no_companions() {
    let registry = DependentFieldRegistry::new();
    assert!(registry.companions("ref").is_empty());
    assert!(!registry.is_trigger("ref"));
}
