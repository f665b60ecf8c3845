// crates/phasebench-core/tests/compare.rs
// ============================================================================
// Module: Run Comparator Tests
// Description: Delta signs, threshold classification, and outcomes.
// ============================================================================
//! ## Overview
//! Validates cross-run deltas and the four terminal comparison outcomes.

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

use std::collections::BTreeMap;

use common::document;
use common::phase;
use phasebench_core::CompareOutcome;
use phasebench_core::FailureKind;
use phasebench_core::MetricStatus;
use phasebench_core::MetricThreshold;
use phasebench_core::MetricsDocument;
use phasebench_core::RunOutcome;
use phasebench_core::ThresholdSet;
use phasebench_core::runtime::Metric;
use phasebench_core::runtime::compare::classify;
use phasebench_core::runtime::compare::error_rate_delta;
use phasebench_core::runtime::compare::latency_delta;
use phasebench_core::runtime::compare::throughput_delta;
use phasebench_core::runtime::compare_runs;

fn run(name: &str, rps: f64, p99: f64) -> MetricsDocument {
    document(name, &[phase("steady", 1_000, 60, 60_000, rps, p99)])
}

fn tree(documents: Vec<MetricsDocument>) -> BTreeMap<String, MetricsDocument> {
    documents.into_iter().map(|doc| (doc.scenario.name.clone(), doc)).collect()
}

#[test]
fn latency_improvement_is_positive() {
    let delta = latency_delta(Some(100.0), Some(90.0)).unwrap();
    assert!((delta - 10.0).abs() < 1e-9);
}

#[test]
fn throughput_drop_is_negative() {
    let delta = throughput_delta(1_000.0, 900.0).unwrap();
    assert!((delta + 10.0).abs() < 1e-9);
}

#[test]
fn undefined_deltas_are_none() {
    assert_eq!(latency_delta(None, Some(5.0)), None);
    assert_eq!(latency_delta(Some(0.0), Some(5.0)), None);
    assert_eq!(throughput_delta(0.0, 10.0), None);
    assert_eq!(error_rate_delta(Some(0.01), None), None);
}

#[test]
fn error_rate_delta_is_in_percentage_points() {
    let delta = error_rate_delta(Some(0.01), Some(0.02)).unwrap();
    assert!((delta + 1.0).abs() < 1e-9);
}

#[test]
fn classification_uses_error_then_warning_bounds() {
    let threshold = Some(MetricThreshold {
        warning: 5.0,
        error: 10.0,
    });
    assert_eq!(classify(Some(-12.0), threshold), MetricStatus::Error);
    assert_eq!(classify(Some(-10.0), threshold), MetricStatus::Error);
    assert_eq!(classify(Some(-7.0), threshold), MetricStatus::Warning);
    assert_eq!(classify(Some(-1.0), threshold), MetricStatus::Ok);
    assert_eq!(classify(Some(25.0), threshold), MetricStatus::Ok);
    assert_eq!(classify(Some(-50.0), None), MetricStatus::Ok);
    assert_eq!(classify(None, threshold), MetricStatus::Ok);
}

#[test]
fn throughput_regression_sets_the_flag() {
    let thresholds = ThresholdSet {
        rps_degradation_percent: Some(MetricThreshold {
            warning: 5.0,
            error: 10.0,
        }),
        ..ThresholdSet::default()
    };
    let base = tree(vec![run("orders", 1_000.0, 100.0)]);
    let new = tree(vec![run("orders", 900.0, 90.0)]);
    let report = compare_runs(&base, &new, &thresholds);
    assert!(report.regression_detected);
    assert_eq!(report.outcome(), CompareOutcome::RegressionDetected);
    assert_eq!(report.outcome().failure_kind(), Some(FailureKind::Regression));

    let result = &report.results[0];
    let p99 = result.deltas.iter().find(|delta| delta.metric == Metric::P99).unwrap();
    assert!((p99.delta.unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(p99.status, MetricStatus::Ok);
    assert_eq!(result.worst_status(), MetricStatus::Error);
}

#[test]
fn unconfigured_metrics_never_regress() {
    let base = tree(vec![run("orders", 1_000.0, 100.0)]);
    let new = tree(vec![run("orders", 100.0, 900.0)]);
    let report = compare_runs(&base, &new, &ThresholdSet::default());
    assert!(!report.regression_detected);
    assert_eq!(report.outcome(), CompareOutcome::Success);
}

#[test]
fn one_sided_scenarios_are_listed_and_ignored() {
    let thresholds = ThresholdSet {
        p99: Some(MetricThreshold {
            warning: 10.0,
            error: 20.0,
        }),
        ..ThresholdSet::default()
    };
    let base = tree(vec![run("orders", 1_000.0, 100.0), run("legacy", 10.0, 9_000.0)]);
    let new = tree(vec![run("orders", 1_000.0, 105.0), run("search", 1.0, 9_000.0)]);
    let report = compare_runs(&base, &new, &thresholds);
    assert_eq!(report.only_in_base, vec!["legacy".to_string()]);
    assert_eq!(report.only_in_new, vec!["search".to_string()]);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.outcome(), CompareOutcome::Success);
}

#[test]
fn disjoint_trees_have_no_comparable_results() {
    let base = tree(vec![run("orders", 1_000.0, 100.0)]);
    let new = tree(vec![run("search", 1_000.0, 100.0)]);
    let report = compare_runs(&base, &new, &ThresholdSet::default());
    assert_eq!(report.outcome(), CompareOutcome::NoComparableResults);
    assert_eq!(report.outcome().failure_kind(), Some(FailureKind::ComparisonAmbiguity));
}

fn p99_gate() -> ThresholdSet {
    ThresholdSet {
        p99: Some(MetricThreshold {
            warning: 10.0,
            error: 20.0,
        }),
        ..ThresholdSet::default()
    }
}

#[test]
fn lost_percentile_is_a_regression() {
    let base = tree(vec![run("orders", 1_000.0, 100.0)]);
    let mut degraded = run("orders", 1_000.0, 100.0);
    degraded.results.latency_ms.p99 = None;
    let new = tree(vec![degraded]);
    let report = compare_runs(&base, &new, &p99_gate());
    let p99 = report.results[0].deltas.iter().find(|delta| delta.metric == Metric::P99).unwrap();
    assert_eq!(p99.delta, None);
    assert_eq!(p99.status, MetricStatus::Error);
    assert!(report.regression_detected);
    assert_eq!(report.outcome(), CompareOutcome::RegressionDetected);
}

#[test]
fn percentile_missing_on_both_sides_stays_ok() {
    let mut base_run = run("orders", 1_000.0, 100.0);
    base_run.results.latency_ms.p99 = None;
    let mut new_run = run("orders", 1_000.0, 100.0);
    new_run.results.latency_ms.p99 = None;
    let report = compare_runs(&tree(vec![base_run]), &tree(vec![new_run]), &p99_gate());
    assert!(!report.regression_detected);
    assert_eq!(report.outcome(), CompareOutcome::Success);
}

#[test]
fn failed_new_run_is_a_regression() {
    let base = tree(vec![run("orders", 1_000.0, 100.0)]);
    let mut failed = run("orders", 1_000.0, 100.0);
    failed.status.outcome = RunOutcome::Failed;
    failed.status.reasons = vec!["p99 missing".to_string()];
    let report = compare_runs(&base, &tree(vec![failed]), &ThresholdSet::default());
    let result = &report.results[0];
    assert!(result.new_run_failed);
    assert!(result.deltas.iter().all(|delta| delta.status == MetricStatus::Ok));
    assert_eq!(result.worst_status(), MetricStatus::Error);
    assert_eq!(report.outcome(), CompareOutcome::RegressionDetected);
}
