// crates/phasebench-core/src/runtime/compare.rs
// ============================================================================
// Module: Run Comparator
// Description: Cross-run metric deltas classified against thresholds.
// Purpose: Detect regressions between a base and a new set of documents.
// Dependencies: serde, crate::core::document
// ============================================================================

//! ## Overview
//! Deltas are signed so that positive always means improvement:
//! - latency: `(base - new) / base * 100`,
//! - throughput: `(new - base) / base * 100`,
//! - error rate: `(base - new) * 100`, in percentage points.
//!
//! A metric is classified only when a threshold is configured for it; the
//! regression magnitude is compared against the error bound first, then the
//! warning bound. The run-level regression flag is raised when any metric of
//! any shared scenario reaches its error bound. Scenarios present on one side
//! only are listed separately and never affect the flag.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::document::MetricsDocument;
use crate::core::failure::FailureKind;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// Warning and error bounds for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricThreshold {
    /// Regression magnitude that raises a warning.
    pub warning: f64,
    /// Regression magnitude that raises an error.
    pub error: f64,
}

/// Thresholds for every comparable metric; `None` leaves a metric unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSet {
    /// p90 latency increase in percent.
    pub p90: Option<MetricThreshold>,
    /// p99 latency increase in percent.
    pub p99: Option<MetricThreshold>,
    /// Error-rate increase in percentage points.
    pub error_rate: Option<MetricThreshold>,
    /// Throughput decrease in percent.
    pub rps_degradation_percent: Option<MetricThreshold>,
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Comparable metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// p90 latency.
    P90,
    /// p99 latency.
    P99,
    /// Achieved throughput.
    Rps,
    /// Error rate.
    ErrorRate,
}

impl Metric {
    /// Returns the stable metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::P90 => "p90",
            Self::P99 => "p99",
            Self::Rps => "rps",
            Self::ErrorRate => "error_rate",
        }
    }
}

/// Classification of one metric delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    /// Within thresholds or unchecked.
    Ok,
    /// Warning threshold reached.
    Warning,
    /// Error threshold reached.
    Error,
}

/// Values compared for one scenario side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// p90 latency in milliseconds.
    pub p90: Option<f64>,
    /// p99 latency in milliseconds.
    pub p99: Option<f64>,
    /// Achieved throughput.
    pub rps: f64,
    /// Error rate in `[0, 1]`.
    pub error_rate: Option<f64>,
}

impl MetricSnapshot {
    /// Extracts the compared values from a document.
    #[must_use]
    pub const fn from_document(document: &MetricsDocument) -> Self {
        Self {
            p90: document.results.latency_ms.p90,
            p99: document.results.latency_ms.p99,
            rps: document.results.rps,
            error_rate: document.results.error_rate,
        }
    }
}

/// Delta and classification for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricDelta {
    /// Metric compared.
    pub metric: Metric,
    /// Signed delta (positive is improvement); `None` when undefined.
    pub delta: Option<f64>,
    /// Classification against the configured threshold.
    pub status: MetricStatus,
}

/// Comparison of one scenario present on both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Scenario name.
    pub scenario: String,
    /// Base values.
    pub base: MetricSnapshot,
    /// New values.
    pub new: MetricSnapshot,
    /// Per-metric deltas in metric order.
    pub deltas: Vec<MetricDelta>,
    /// True when the new document's own status is failed.
    pub new_run_failed: bool,
}

impl ComparisonResult {
    /// Returns the worst status across metrics; a failed new run is an error.
    #[must_use]
    pub fn worst_status(&self) -> MetricStatus {
        if self.new_run_failed {
            return MetricStatus::Error;
        }
        self.deltas.iter().map(|delta| delta.status).max().unwrap_or(MetricStatus::Ok)
    }
}

/// Terminal comparison outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOutcome {
    /// Shared scenarios compared without regression.
    Success,
    /// An input side is missing.
    MissingInput,
    /// No scenario is present on both sides.
    NoComparableResults,
    /// At least one metric reached its error threshold.
    RegressionDetected,
}

impl CompareOutcome {
    /// Returns the failure kind for non-success outcomes.
    #[must_use]
    pub const fn failure_kind(self) -> Option<FailureKind> {
        match self {
            Self::Success => None,
            Self::MissingInput => Some(FailureKind::MissingInput),
            Self::NoComparableResults => Some(FailureKind::ComparisonAmbiguity),
            Self::RegressionDetected => Some(FailureKind::Regression),
        }
    }
}

/// Full comparison across two result sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Scenarios present on both sides, ordered by name.
    pub results: Vec<ComparisonResult>,
    /// Scenarios present only in the base set.
    pub only_in_base: Vec<String>,
    /// Scenarios present only in the new set.
    pub only_in_new: Vec<String>,
    /// True when any metric reached its error threshold.
    pub regression_detected: bool,
}

impl ComparisonReport {
    /// Returns the terminal outcome of the comparison.
    #[must_use]
    pub fn outcome(&self) -> CompareOutcome {
        if self.results.is_empty() {
            CompareOutcome::NoComparableResults
        } else if self.regression_detected {
            CompareOutcome::RegressionDetected
        } else {
            CompareOutcome::Success
        }
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares two result sets keyed by scenario name.
#[must_use]
pub fn compare_runs(
    base: &BTreeMap<String, MetricsDocument>,
    new: &BTreeMap<String, MetricsDocument>,
    thresholds: &ThresholdSet,
) -> ComparisonReport {
    let mut results = Vec::new();
    let mut only_in_base = Vec::new();
    for (scenario, base_document) in base {
        match new.get(scenario) {
            Some(new_document) => {
                results.push(compare_documents(scenario, base_document, new_document, thresholds));
            }
            None => only_in_base.push(scenario.clone()),
        }
    }
    let only_in_new =
        new.keys().filter(|scenario| !base.contains_key(*scenario)).cloned().collect();
    let regression_detected =
        results.iter().any(|result| result.worst_status() == MetricStatus::Error);
    ComparisonReport {
        results,
        only_in_base,
        only_in_new,
        regression_detected,
    }
}

/// Compares one scenario's base and new documents.
#[must_use]
pub fn compare_documents(
    scenario: &str,
    base_document: &MetricsDocument,
    new_document: &MetricsDocument,
    thresholds: &ThresholdSet,
) -> ComparisonResult {
    let base = MetricSnapshot::from_document(base_document);
    let new = MetricSnapshot::from_document(new_document);
    let p90 = latency_delta(base.p90, new.p90);
    let p99 = latency_delta(base.p99, new.p99);
    let rps = throughput_delta(base.rps, new.rps);
    let error_rate = error_rate_delta(base.error_rate, new.error_rate);
    let deltas = vec![
        classified(Metric::P90, p90, lost(positive(base.p90), positive(new.p90)), thresholds.p90),
        classified(Metric::P99, p99, lost(positive(base.p99), positive(new.p99)), thresholds.p99),
        classified(
            Metric::Rps,
            rps,
            lost(positive(Some(base.rps)), Some(new.rps).filter(|rate| rate.is_finite())),
            thresholds.rps_degradation_percent,
        ),
        classified(
            Metric::ErrorRate,
            error_rate,
            lost(finite(base.error_rate), finite(new.error_rate)),
            thresholds.error_rate,
        ),
    ];
    ComparisonResult {
        scenario: scenario.to_string(),
        base,
        new,
        deltas,
        new_run_failed: new_document.status.is_failed(),
    }
}

// ============================================================================
// SECTION: Deltas
// ============================================================================

/// Latency delta in percent; positive means the new run is faster.
#[must_use]
pub fn latency_delta(base: Option<f64>, new: Option<f64>) -> Option<f64> {
    let (base, new) = (positive(base)?, positive(new)?);
    Some((base - new) / base * 100.0)
}

/// Throughput delta in percent; positive means the new run is faster.
#[must_use]
pub fn throughput_delta(base: f64, new: f64) -> Option<f64> {
    let base = positive(Some(base))?;
    new.is_finite().then(|| (new - base) / base * 100.0)
}

/// Error-rate delta in percentage points; positive means fewer errors.
#[must_use]
pub fn error_rate_delta(base: Option<f64>, new: Option<f64>) -> Option<f64> {
    let base = base.filter(|value| value.is_finite())?;
    let new = new.filter(|value| value.is_finite())?;
    Some((base - new) * 100.0)
}

/// Classifies a delta: the regression magnitude is the negated delta, and an
/// unchanged or improved metric is always ok.
#[must_use]
pub fn classify(delta: Option<f64>, threshold: Option<MetricThreshold>) -> MetricStatus {
    let (Some(delta), Some(threshold)) = (delta, threshold) else {
        return MetricStatus::Ok;
    };
    let regression = -delta;
    if regression <= 0.0 {
        MetricStatus::Ok
    } else if regression >= threshold.error {
        MetricStatus::Error
    } else if regression >= threshold.warning {
        MetricStatus::Warning
    } else {
        MetricStatus::Ok
    }
}

/// Builds a classified delta. A checked metric the base measured but the new
/// run lost is an error regardless of the delta.
fn classified(
    metric: Metric,
    delta: Option<f64>,
    lost: bool,
    threshold: Option<MetricThreshold>,
) -> MetricDelta {
    let status = if lost && threshold.is_some() {
        MetricStatus::Error
    } else {
        classify(delta, threshold)
    };
    MetricDelta {
        metric,
        delta,
        status,
    }
}

/// True when the base side has a usable value and the new side does not.
const fn lost(base: Option<f64>, new: Option<f64>) -> bool {
    base.is_some() && new.is_none()
}

/// Keeps strictly positive finite values.
fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|inner| inner.is_finite() && *inner > 0.0)
}

/// Keeps finite values.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|inner| inner.is_finite())
}
