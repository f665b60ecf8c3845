// crates/phasebench-contract/tests/schema_validation.rs
// ============================================================================
// Module: Schema Validation Tests
// Description: Both validator backends against valid and mutated documents.
// ============================================================================
//! ## Overview
//! The manual backend must accept and reject exactly what the `jsonschema`
//! backend accepts and rejects for the published schemas.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use phasebench_contract::ContractBuilder;
use phasebench_contract::DocumentKind;
use phasebench_contract::SchemaBackend;
use phasebench_contract::SchemaError;
use phasebench_contract::SchemaValidator;
use phasebench_contract::build_validator;
use phasebench_contract::examples::extended_example;
use phasebench_contract::examples::metrics_example;
use phasebench_contract::load_validator;
use serde_json::Value;
use serde_json::json;

type TestResult = Result<(), String>;

fn validators(kind: DocumentKind) -> Vec<Box<dyn SchemaValidator>> {
    [SchemaBackend::JsonSchema, SchemaBackend::Manual]
        .into_iter()
        .map(|backend| build_validator(backend, &kind.builtin_schema()).unwrap())
        .collect()
}

fn metrics_value() -> Value {
    serde_json::to_value(metrics_example().unwrap()).unwrap()
}

/// Applies `mutate` to the example document and expects both backends to reject it.
fn assert_rejected_by_both(mutate: impl Fn(&mut Value)) -> TestResult {
    let mut instance = metrics_value();
    mutate(&mut instance);
    for validator in validators(DocumentKind::Metrics) {
        let errors = validator.validate(&instance);
        if errors.is_empty() {
            return Err(format!("{} backend accepted {instance}", validator.backend()));
        }
    }
    Ok(())
}

fn set(instance: &mut Value, pointer: &str, value: Value) {
    *instance.pointer_mut(pointer).unwrap() = value;
}

#[test]
fn examples_pass_both_backends() {
    let metrics = metrics_value();
    let extended = serde_json::to_value(extended_example().unwrap()).unwrap();
    for validator in validators(DocumentKind::Metrics) {
        assert_eq!(validator.validate(&metrics), Vec::<String>::new(), "{}", validator.backend());
    }
    for validator in validators(DocumentKind::Extended) {
        assert_eq!(validator.validate(&extended), Vec::<String>::new(), "{}", validator.backend());
    }
}

#[test]
fn null_latency_and_error_rate_are_accepted() {
    let mut instance = metrics_value();
    set(&mut instance, "/results/latency_ms/p75", Value::Null);
    set(&mut instance, "/results/error_rate", Value::Null);
    for validator in validators(DocumentKind::Metrics) {
        assert!(validator.is_valid(&instance), "{}", validator.backend());
    }
}

#[test]
fn missing_required_field_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| {
        doc.pointer_mut("/results").unwrap().as_object_mut().unwrap().remove("requests");
    })
}

#[test]
fn zero_latency_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/results/latency_ms/p50", json!(0)))
}

#[test]
fn negative_latency_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/results/latency_ms/p99", json!(-2.5)))
}

#[test]
fn error_rate_above_one_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/results/error_rate", json!(1.5)))
}

#[test]
fn fractional_request_count_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/results/requests", json!(10.5)))
}

#[test]
fn string_rate_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/results/rps", json!("fast")))
}

#[test]
fn wrong_version_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/version", json!("2.0")))
}

#[test]
fn unknown_member_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| {
        doc.as_object_mut().unwrap().insert(String::from("extra"), json!(true));
    })
}

#[test]
fn negative_status_count_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/errors/http_status/200", json!(-1)))
}

#[test]
fn unknown_outcome_is_rejected() -> TestResult {
    assert_rejected_by_both(|doc| set(doc, "/status/outcome", json!("maybe")))
}

#[test]
fn manual_backend_reports_every_violation() {
    let mut instance = metrics_value();
    set(&mut instance, "/results/latency_ms/p50", json!(0));
    set(&mut instance, "/results/error_rate", json!(2));
    let validator = build_validator(SchemaBackend::Manual, &DocumentKind::Metrics.builtin_schema())
        .unwrap();
    let errors = validator.validate(&instance);
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors.iter().any(|error| error.starts_with("/results/error_rate")), "{errors:?}");
    assert!(errors.iter().any(|error| error.starts_with("/results/latency_ms/p50")), "{errors:?}");
}

#[test]
fn manual_backend_refuses_unsupported_keywords() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "pattern": "^[a-z]+$" }
        }
    });
    match build_validator(SchemaBackend::Manual, &schema) {
        Err(SchemaError::UnsupportedKeyword {
            keyword,
            pointer,
        }) => {
            assert_eq!(keyword, "pattern");
            assert_eq!(pointer, "/properties/name");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("pattern keyword must be refused"),
    }
    assert!(build_validator(SchemaBackend::JsonSchema, &schema).is_ok());
}

#[test]
fn missing_schema_file_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_validator(SchemaBackend::JsonSchema, dir.path(), DocumentKind::Metrics) {
        Err(SchemaError::Missing(path)) => {
            assert!(path.ends_with("schemas/metrics-v3.0.schema.json"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("missing schema must fail"),
    }
}

#[test]
fn generated_schemas_load_with_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    ContractBuilder::new(dir.path().to_path_buf()).write().unwrap();
    let metrics = metrics_value();
    for backend in [SchemaBackend::JsonSchema, SchemaBackend::Manual] {
        let validator = load_validator(backend, dir.path(), DocumentKind::Metrics).unwrap();
        assert_eq!(validator.backend(), backend);
        assert!(validator.is_valid(&metrics));
        load_validator(backend, dir.path(), DocumentKind::Extended).unwrap();
    }
}

#[test]
fn backend_names_parse() {
    assert_eq!("manual".parse::<SchemaBackend>().unwrap(), SchemaBackend::Manual);
    assert_eq!("jsonschema".parse::<SchemaBackend>().unwrap(), SchemaBackend::JsonSchema);
    assert!("xml".parse::<SchemaBackend>().is_err());
}
