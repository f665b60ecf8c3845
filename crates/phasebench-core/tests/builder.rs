// crates/phasebench-core/tests/builder.rs
// ============================================================================
// Module: Metrics Builder Tests
// Description: Document construction, normalization, and run status.
// ============================================================================
//! ## Overview
//! Validates error-rate rules, latency normalization, percentile-driven run
//! failure, idempotence, and the JSON round-trip of the primary document.

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

mod common;

use common::document;
use common::environment;
use common::execution;
use common::phase;
use common::scenario;
use phasebench_core::BuildContext;
use phasebench_core::InvariantValidator;
use phasebench_core::METRICS_DOCUMENT_VERSION;
use phasebench_core::MetricsDocument;
use phasebench_core::RunOutcome;
use phasebench_core::ToleranceMode;
use phasebench_core::VerificationLog;
use phasebench_core::runtime::build_extended_document;
use phasebench_core::runtime::compute_error_rate;
use phasebench_core::runtime::evaluate_rate;
use phasebench_core::runtime::merge_phases;

type TestResult = Result<(), String>;

#[test]
fn error_rate_counts_4xx_5xx_and_socket_errors() {
    let mut steady = phase("steady", 100, 60, 1_000, 100.0, 40.0);
    steady.http_status = common::histogram(&[(200, 950), (404, 30), (503, 20)]);
    steady.socket_errors.timeout = 10;
    let doc = document("orders", &[steady]);
    assert_eq!(doc.errors.http_4xx, 30);
    assert_eq!(doc.errors.http_5xx, 20);
    assert_eq!(doc.errors.socket_errors_total, 10);
    let rate = doc.results.error_rate.unwrap();
    assert!((rate - 0.06).abs() < 1e-12);
}

#[test]
fn error_rate_is_zero_without_requests_and_clamped_above_one() {
    assert!(compute_error_rate(5, 0).abs() < f64::EPSILON);
    assert!((compute_error_rate(15, 10) - 1.0).abs() < f64::EPSILON);
}

#[test]
fn zero_p50_is_normalized_and_fails_the_run() {
    let mut steady = phase("steady", 100, 60, 1_000, 100.0, 40.0);
    steady.latency.p50 = Some(0.0);
    let doc = document("orders", &[steady]);
    assert_eq!(doc.results.latency_ms.p50, None);
    assert_eq!(doc.status.outcome, RunOutcome::Failed);
    assert!(doc.status.reasons[0].contains("p50"));
}

#[test]
fn run_without_requests_passes_with_empty_latency() {
    let mut idle = phase("steady", 100, 60, 0, 0.0, 40.0);
    idle.latency = phasebench_core::LatencyPercentiles::default();
    let doc = document("orders", &[idle]);
    assert_eq!(doc.status.outcome, RunOutcome::Passed);
    assert_eq!(doc.results.error_rate, Some(0.0));
}

#[test]
fn single_phase_documents_omit_phase_rows() {
    let doc = document("orders", &[phase("steady", 100, 60, 6_000, 100.0, 40.0)]);
    assert_eq!(doc.version, METRICS_DOCUMENT_VERSION);
    assert!(doc.phases.is_none());

    let multi = document(
        "orders",
        &[phase("step-1", 50, 30, 1_500, 50.0, 20.0), phase("step-2", 100, 30, 3_000, 100.0, 30.0)],
    );
    assert_eq!(multi.phases.as_ref().map(Vec::len), Some(2));
}

#[test]
fn construction_is_idempotent() {
    let phases = [
        phase("step-1", 50, 30, 1_500, 50.0, 20.0),
        phase("step-2", 100, 30, 3_000, 100.0, 30.0),
    ];
    assert_eq!(document("orders", &phases), document("orders", &phases));
}

#[test]
fn document_round_trips_and_passes_invariants() -> TestResult {
    let doc = document("orders", &[phase("steady", 100, 60, 6_000, 100.0, 40.0)]);
    let text = serde_json::to_string_pretty(&doc).map_err(|err| err.to_string())?;
    let parsed: MetricsDocument = serde_json::from_str(&text).map_err(|err| err.to_string())?;
    if parsed != doc {
        return Err(format!("round trip changed the document: {parsed:?}"));
    }
    let report = InvariantValidator::default().validate(&parsed);
    if !report.passed() {
        return Err(format!("invariants failed: {:?}", report.violations));
    }
    Ok(())
}

#[test]
fn extended_document_only_for_multi_phase_runs() {
    let scenario = scenario("orders");
    let execution = execution();
    let environment = environment();
    let context = BuildContext {
        scenario: &scenario,
        execution: &execution,
        environment: &environment,
    };
    let single = [phase("steady", 100, 60, 6_000, 100.0, 40.0)];
    let merged = merge_phases(&single).unwrap();
    let log = VerificationLog::new(ToleranceMode::Warn);
    assert!(build_extended_document(&context, &merged, &single, &log).is_none());

    let multi = [
        phase("burst-1", 300, 5, 1_500, 300.0, 90.0),
        phase("normal-1", 100, 15, 1_500, 100.0, 30.0),
    ];
    let merged = merge_phases(&multi).unwrap();
    let mut log = VerificationLog::new(ToleranceMode::Warn);
    log.append(evaluate_rate("burst-1", 300, Some(200.0))).unwrap();
    log.append(evaluate_rate("normal-1", 100, Some(100.0))).unwrap();
    let extended = build_extended_document(&context, &merged, &multi, &log).unwrap();
    assert_eq!(extended.version, "1.0");
    assert_eq!(extended.phases.len(), 2);
    assert_eq!(extended.rate_control.failed_phases, 1);
    assert_eq!(extended.aggregate.max_p99, Some(90.0));
    assert!((extended.aggregate.weighted_rps - 150.0).abs() < 1e-9);
}
