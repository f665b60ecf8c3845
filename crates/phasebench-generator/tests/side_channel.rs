// crates/phasebench-generator/tests/side_channel.rs
// ============================================================================
// Module: Side-Channel Tests
// Description: Validation and merge rules for per-phase metrics documents.
// ============================================================================
//! ## Overview
//! Covers acceptance rules, status-sum authority, and weighted merging.

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

use std::path::Path;
use std::path::PathBuf;

use phasebench_generator::SideChannelError;
use phasebench_generator::merge_side_channels;
use phasebench_generator::side_channel::validate_side_channel;
use serde_json::Value;
use serde_json::json;

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
    path
}

#[test]
fn boolean_request_count_is_rejected() {
    let err = validate_side_channel(&json!({"total_requests": true, "http_status": {"200": 1}}))
        .unwrap_err();
    assert!(err.contains("total_requests"), "{err}");
}

#[test]
fn non_positive_request_count_is_rejected() {
    for total in [json!(0), json!(2.5)] {
        let document = json!({"total_requests": total, "http_status": {"200": 1}});
        assert!(validate_side_channel(&document).is_err(), "{document}");
    }
}

#[test]
fn status_counts_must_be_non_negative_integers() {
    let statuses =
        [json!({"200": -1}), json!({"200": 1.5}), json!({"200": false}), json!({"ok": 3})];
    for status in statuses {
        let document = json!({"total_requests": 3, "http_status": status});
        assert!(validate_side_channel(&document).is_err(), "{document}");
    }
}

#[test]
fn empty_status_map_is_rejected() {
    let err = validate_side_channel(&json!({"total_requests": 3, "http_status": {"200": 0}}))
        .unwrap_err();
    assert_eq!(err, "http_status is empty");
}

#[test]
fn status_sum_is_authoritative_when_counts_disagree() {
    let document = validate_side_channel(&json!({
        "total_requests": 100.0,
        "http_status": {"200": 95, "409": 2},
        "latency": {"p50_ms": 1.5, "p99_ms": "n/a"},
        "retries": 4,
        "cache": {"hits": 30, "misses": 10}
    }))
    .unwrap();
    assert_eq!(document.total_requests, 97);
    assert_eq!(document.notes.len(), 1);
    assert_eq!(document.latency_ms("p50_ms"), Some(1.5));
    assert_eq!(document.latency_ms("p99_ms"), None);
    assert_eq!(document.retries, 4);
    assert_eq!(document.cache.unwrap().hits, 30);
}

#[test]
fn merge_weights_percentiles_by_requests() {
    let dir = tempfile::tempdir().unwrap();
    let first = write(
        dir.path(),
        "phase-0.metrics.json",
        &json!({
            "scenario": {"name": "items-put"},
            "execution": {"threads": 2},
            "total_requests": 100,
            "http_status": {"200": 90, "404": 10},
            "latency": {
                "min_ms": 0.0,
                "max_ms": 20.0,
                "mean_ms": 2.0,
                "p50_ms": 1.0,
                "p99_ms": 10.0
            }
        }),
    );
    let second = write(
        dir.path(),
        "phase-1.metrics.json",
        &json!({
            "scenario": {"name": "ignored"},
            "total_requests": 300,
            "http_status": {"200": 297, "503": 3},
            "latency": {
                "min_ms": 0.4,
                "max_ms": 50.0,
                "mean_ms": 4.0,
                "p50_ms": 3.0,
                "p99_ms": 30.0
            }
        }),
    );
    let report = merge_side_channels(&[first, second]).unwrap();
    let merged = report.merged;
    assert_eq!(merged.total_requests, 400);
    assert_eq!(merged.http_status.get("200"), Some(&387));
    assert!((merged.error_rate - 13.0 / 400.0).abs() < 1e-12);
    assert!((merged.latency["p50_ms"] - 2.5).abs() < 1e-12);
    assert!((merged.latency["p99_ms"] - 25.0).abs() < 1e-12);
    assert!((merged.latency["mean_ms"] - 3.5).abs() < 1e-12);
    assert!((merged.latency["min_ms"] - 0.4).abs() < 1e-12);
    assert!((merged.latency["max_ms"] - 50.0).abs() < 1e-12);
    assert!(!merged.latency.contains_key("p95_ms"));
    assert!((merged.status_distribution["404"] - 0.025).abs() < 1e-12);
    assert_eq!(merged.scenario, json!({"name": "items-put"}));
    assert_eq!(merged.execution, json!({"threads": 2}));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn invalid_inputs_are_skipped_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(dir.path(), "bad.json", &json!({"total_requests": -5, "http_status": {}}));
    let good =
        write(dir.path(), "good.json", &json!({"total_requests": 10, "http_status": {"200": 10}}));
    let missing = dir.path().join("missing.json");
    let report = merge_side_channels(&[bad, good.clone(), missing]).unwrap();
    assert_eq!(report.accepted, vec![good]);
    assert_eq!(report.warnings.len(), 2);
    assert_eq!(report.merged.total_requests, 10);
    assert_eq!(report.merged.scenario, json!({}));
}

#[test]
fn no_valid_inputs_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(dir.path(), "bad.json", &json!({"http_status": {"200": 1}}));
    assert!(matches!(merge_side_channels(&[bad]), Err(SideChannelError::NoValidInputs)));
}
