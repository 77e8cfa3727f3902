use eventschema_ingest::{
    DEFAULT_MAX_DEPTH, Inference, IngestError, JsonTokenizer, Token, TokenStream, TypeInferencer,
};
use eventschema_types::FieldType;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn inferencer() -> TypeInferencer {
    TypeInferencer::new("_user")
}

/// Infers `value` inside `{"v": <value>, "next": 0}`. Returns the inference,
/// the token the cursor was left on and the token after it.
fn infer_in_object(value: &str) -> (Inference, Option<Token>, Token) {
    let text = format!(r#"{{"v": {value}, "next": 0}}"#);
    let mut stream = JsonTokenizer::new(&text);
    stream.next_token().unwrap();
    stream.next_token().unwrap();
    stream.next_token().unwrap();
    let inference = inferencer().infer(&mut stream).unwrap();
    let current = stream.current().cloned();
    let next = stream.next_token().unwrap().clone();
    (inference, current, next)
}

fn infer_type(value: &str) -> Option<FieldType> {
    infer_in_object(value).0.field_type
}

// ── Scalars ─────────────────────────────────────────────────────

#[test]
fn scalar_types() {
    assert_eq!(infer_type("null"), None);
    assert_eq!(infer_type("true"), Some(FieldType::Boolean));
    assert_eq!(infer_type("false"), Some(FieldType::Boolean));
    assert_eq!(infer_type(r#""s""#), Some(FieldType::String));
    assert_eq!(infer_type("5"), Some(FieldType::Long));
    assert_eq!(infer_type("5.2"), Some(FieldType::Double));
}

#[test]
fn scalar_leaves_cursor_on_value() {
    let (inference, current, next) = infer_in_object("5");
    assert!(!inference.lookahead.is_pre_advanced());
    assert_eq!(current, Some(Token::Int(5)));
    assert_eq!(next, Token::FieldName("next".into()));
}

// ── Compounds ───────────────────────────────────────────────────

#[test]
fn empty_compounds_are_undetermined() {
    assert_eq!(infer_type("[]"), None);
    assert_eq!(infer_type("{}"), None);
}

#[test]
fn first_element_governs_array_type() {
    assert_eq!(infer_type("[1, 2, 3]"), Some(FieldType::array_of(FieldType::Long)));
    assert_eq!(
        infer_type(r#"["a", 1, true]"#),
        Some(FieldType::array_of(FieldType::String))
    );
}

#[test]
fn first_value_governs_map_type() {
    assert_eq!(
        infer_type(r#"{"k": "v"}"#),
        Some(FieldType::map_of(FieldType::String))
    );
    assert_eq!(
        infer_type(r#"{"k": 1.5, "j": "x"}"#),
        Some(FieldType::map_of(FieldType::Double))
    );
}

#[test]
fn nested_compounds() {
    assert_eq!(
        infer_type("[[1]]"),
        Some(FieldType::array_of(FieldType::array_of(FieldType::Long)))
    );
    assert_eq!(
        infer_type(r#"{"k": {"x": true}}"#),
        Some(FieldType::map_of(FieldType::map_of(FieldType::Boolean)))
    );
    assert_eq!(
        infer_type(r#"[{"k": "v"}]"#),
        Some(FieldType::array_of(FieldType::map_of(FieldType::String)))
    );
}

#[test]
fn determined_compound_records_lookahead() {
    let (inference, current, next) = infer_in_object(r#"[{"k": 7}, {}]"#);
    assert_eq!(inference.lookahead.depth(), 2);
    assert!(inference.lookahead.is_pre_advanced());
    assert_eq!(current, Some(Token::Int(7)));
    assert_eq!(next, Token::EndObject);
}

#[test]
fn map_lookahead_keeps_first_key() {
    let (first, ..) = infer_in_object(r#"{"first": 1}"#);
    let (same_key, ..) = infer_in_object(r#"{"first": 2}"#);
    let (other_key, ..) = infer_in_object(r#"{"other": 1}"#);
    assert_eq!(first.lookahead, same_key.lookahead);
    assert_ne!(first.lookahead, other_key.lookahead);
}

#[test]
fn undetermined_compounds_are_fully_consumed() {
    for value in ["[]", "{}", "[[]]", "[null, 1]", r#"{"k": null, "j": 1}"#, r#"[{}]"#] {
        let (inference, _, next) = infer_in_object(value);
        assert_eq!(inference.field_type, None, "{value}");
        assert!(!inference.lookahead.is_pre_advanced(), "{value}");
        assert_eq!(next, Token::FieldName("next".into()), "{value}");
    }
}

// ── Identity field ──────────────────────────────────────────────

#[test]
fn identity_field_is_forced_to_string() {
    let mut stream = JsonTokenizer::new(r#"{"_user": 42}"#);
    stream.next_token().unwrap();
    stream.next_token().unwrap();
    stream.next_token().unwrap();
    let inference = inferencer().infer_field("_user", &mut stream).unwrap();
    assert_eq!(inference.field_type, Some(FieldType::String));
}

#[test]
fn identity_field_null_stays_undetermined() {
    let mut stream = JsonTokenizer::new("null");
    stream.next_token().unwrap();
    let inference = inferencer().infer_field("_user", &mut stream).unwrap();
    assert_eq!(inference.field_type, None);
}

#[test]
fn other_fields_keep_inferred_type() {
    let mut stream = JsonTokenizer::new("42");
    stream.next_token().unwrap();
    let inference = inferencer().infer_field("user", &mut stream).unwrap();
    assert_eq!(inference.field_type, Some(FieldType::Long));
}

#[test]
fn custom_identity_field() {
    let inferencer = TypeInferencer::new("uid");
    assert_eq!(inferencer.identity_field(), "uid");
    assert_eq!(inferencer.column_type("uid", FieldType::Double), FieldType::String);
    assert_eq!(inferencer.column_type("_user", FieldType::Double), FieldType::Double);
}

#[test]
fn identity_field_is_matched_lower_cased() {
    let inferencer = TypeInferencer::new("_User");
    assert_eq!(inferencer.identity_field(), "_user");
    assert_eq!(inferencer.column_type("_user", FieldType::Long), FieldType::String);
}

// ── Nesting ─────────────────────────────────────────────────────

#[test]
fn default_depth_matches_tokenizer() {
    assert_eq!(inferencer().max_depth(), DEFAULT_MAX_DEPTH);
}

#[test]
fn nesting_beyond_limit_is_malformed() {
    let inferencer = inferencer().with_max_depth(2);

    let mut stream = JsonTokenizer::new("[[1]]");
    stream.next_token().unwrap();
    assert_eq!(
        inferencer.infer(&mut stream).unwrap().field_type,
        Some(FieldType::array_of(FieldType::array_of(FieldType::Long)))
    );

    for value in ["[[[1]]]", r#"{"a": {"b": {"c": 1}}}"#, "[{\"a\": []}]"] {
        let mut stream = JsonTokenizer::new(value);
        stream.next_token().unwrap();
        let err = inferencer.infer(&mut stream).unwrap_err();
        assert!(matches!(err, IngestError::MalformedInput(_)), "{value}");
    }
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn integers_infer_long(v in any::<i64>()) {
        prop_assert_eq!(infer_type(&v.to_string()), Some(FieldType::Long));
    }

    #[test]
    fn strings_infer_string(s in "[a-zA-Z0-9 ]{0,24}") {
        prop_assert_eq!(infer_type(&format!("\"{s}\"")), Some(FieldType::String));
    }

    #[test]
    fn identity_field_is_string_for_any_scalar(v in prop_oneof![
        any::<i64>().prop_map(|v| v.to_string()),
        any::<bool>().prop_map(|v| v.to_string()),
        (-1.0e6f64..1.0e6).prop_map(|v| format!("{v:.3}")),
    ]) {
        let mut stream = JsonTokenizer::new(&v);
        stream.next_token().unwrap();
        let inference = inferencer().infer_field("_user", &mut stream).unwrap();
        prop_assert_eq!(inference.field_type, Some(FieldType::String));
    }

    #[test]
    fn array_depth_matches_nesting(depth in 1usize..6) {
        let value = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        let mut expected = FieldType::Long;
        for _ in 0..depth {
            expected = FieldType::array_of(expected);
        }
        let (inference, ..) = infer_in_object(&value);
        prop_assert_eq!(inference.field_type, Some(expected));
        prop_assert_eq!(inference.lookahead.depth(), depth);
    }
}
