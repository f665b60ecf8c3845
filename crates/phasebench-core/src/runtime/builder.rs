// crates/phasebench-core/src/runtime/builder.rs
// ============================================================================
// Module: Metrics Builder
// Description: Renders an aggregate into the versioned metrics documents.
// Purpose: Produce canonical, idempotent run artifacts.
// Dependencies: crate::core, crate::runtime::{merger, verifier}
// ============================================================================

//! ## Overview
//! Construction is a pure function of its inputs: identical inputs always
//! yield an identical document. The builder
//! - computes the error rate as `(4xx + 5xx + socket errors) / requests`,
//!   clamped to `[0, 1]` and defined as `0` when no request completed,
//! - normalizes latencies that are zero, negative, or non-finite to `null`,
//! - marks the run failed when requests completed but p50 or p99 is missing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::document::AggregateSummary;
use crate::core::document::CacheMetrics;
use crate::core::document::EXTENDED_DOCUMENT_VERSION;
use crate::core::document::EnvironmentFingerprint;
use crate::core::document::ErrorBreakdown;
use crate::core::document::ExecutionInfo;
use crate::core::document::ExtendedDocument;
use crate::core::document::METRICS_DOCUMENT_VERSION;
use crate::core::document::MetricsDocument;
use crate::core::document::PhaseDetail;
use crate::core::document::PhaseSummary;
use crate::core::document::RateControl;
use crate::core::document::ResultsBlock;
use crate::core::document::RunOutcome;
use crate::core::document::RunStatus;
use crate::core::document::ScenarioInfo;
use crate::core::measurement::AggregateResult;
use crate::core::measurement::LatencyPercentiles;
use crate::core::measurement::PhaseResult;
use crate::core::measurement::count_as_f64;
use crate::runtime::merger::MergedRun;
use crate::runtime::verifier::VerificationLog;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Run context shared by both documents.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Scenario identity.
    pub scenario: &'a ScenarioInfo,
    /// Execution parameters.
    pub execution: &'a ExecutionInfo,
    /// Environment fingerprint.
    pub environment: &'a EnvironmentFingerprint,
}

// ============================================================================
// SECTION: Primary Document
// ============================================================================

/// Builds the primary metrics document.
#[must_use]
pub fn build_metrics_document(
    context: &BuildContext<'_>,
    aggregate: &AggregateResult,
    phases: &[PhaseResult],
) -> MetricsDocument {
    let latency = normalize_latency(&aggregate.latency);
    let http_4xx = aggregate.http_status.count_in(400 ..= 499);
    let http_5xx = aggregate.http_status.count_in(500 ..= 599);
    let socket_errors_total = aggregate.socket_errors.total();
    let error_rate = compute_error_rate(
        http_4xx.saturating_add(http_5xx).saturating_add(socket_errors_total),
        aggregate.total_requests,
    );
    let phase_rows = (phases.len() > 1).then(|| phases.iter().map(phase_summary).collect());
    MetricsDocument {
        version: METRICS_DOCUMENT_VERSION.to_string(),
        scenario: context.scenario.clone(),
        execution: context.execution.clone(),
        results: ResultsBlock {
            requests: aggregate.total_requests,
            duration_seconds: aggregate.total_duration,
            rps: finite_or_zero(aggregate.weighted_rps),
            latency_ms: latency,
            error_rate: Some(error_rate),
            retries: aggregate.retries,
        },
        errors: ErrorBreakdown {
            http_4xx,
            http_5xx,
            socket_errors: aggregate.socket_errors,
            socket_errors_total,
            http_status: aggregate.http_status.clone(),
        },
        cache: aggregate.cache.map(|counters| CacheMetrics {
            hits: counters.hits,
            misses: counters.misses,
            hit_rate: counters.hit_rate(),
        }),
        environment: context.environment.clone(),
        phases: phase_rows,
        status: run_status(aggregate.total_requests, &latency),
    }
}

// ============================================================================
// SECTION: Extended Document
// ============================================================================

/// Builds the extended document for multi-phase runs.
///
/// Returns `None` for single-phase runs.
#[must_use]
pub fn build_extended_document(
    context: &BuildContext<'_>,
    merged: &MergedRun,
    phases: &[PhaseResult],
    verification: &VerificationLog,
) -> Option<ExtendedDocument> {
    if phases.len() < 2 {
        return None;
    }
    Some(ExtendedDocument {
        version: EXTENDED_DOCUMENT_VERSION.to_string(),
        scenario: context.scenario.name.clone(),
        profile: context.scenario.profile,
        rate_control: RateControl {
            tolerance_mode: verification.mode(),
            verdicts: verification.entries().to_vec(),
            failed_phases: verification.failure_count(),
        },
        phases: phases.iter().map(phase_detail).collect(),
        aggregate: AggregateSummary {
            total_requests: merged.aggregate.total_requests,
            total_duration: merged.aggregate.total_duration,
            weighted_rps: finite_or_zero(merged.aggregate.weighted_rps),
            max_p99: normalize_value(merged.aggregate.max_p99()),
        },
        warnings: merged.warnings.clone(),
    })
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Computes the clamped error rate; zero requests yield zero.
#[must_use]
pub fn compute_error_rate(errors: u64, requests: u64) -> f64 {
    if requests == 0 {
        return 0.0;
    }
    (count_as_f64(errors) / count_as_f64(requests)).clamp(0.0, 1.0)
}

/// Normalizes a latency: zero, negative, and non-finite values become `None`.
#[must_use]
pub fn normalize_value(value: Option<f64>) -> Option<f64> {
    value.filter(|latency| latency.is_finite() && *latency > 0.0)
}

/// Normalizes every percentile of a latency set.
#[must_use]
pub fn normalize_latency(latency: &LatencyPercentiles) -> LatencyPercentiles {
    LatencyPercentiles {
        p50: normalize_value(latency.p50),
        p75: normalize_value(latency.p75),
        p90: normalize_value(latency.p90),
        p95: normalize_value(latency.p95),
        p99: normalize_value(latency.p99),
    }
}

/// Derives the run status from percentile completeness.
fn run_status(requests: u64, latency: &LatencyPercentiles) -> RunStatus {
    let mut reasons = Vec::new();
    if requests > 0 {
        if latency.p50.is_none() {
            reasons.push(format!("p50 latency unavailable for {requests} completed requests"));
        }
        if latency.p99.is_none() {
            reasons.push(format!("p99 latency unavailable for {requests} completed requests"));
        }
    }
    let outcome = if reasons.is_empty() { RunOutcome::Passed } else { RunOutcome::Failed };
    RunStatus {
        outcome,
        reasons,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a phase result into a compact summary row.
fn phase_summary(phase: &PhaseResult) -> PhaseSummary {
    PhaseSummary {
        label: phase.label.clone(),
        target_rate: phase.target_rate,
        actual_rate: finite_or_zero(phase.actual_rate),
        duration_seconds: phase.duration_seconds,
        requests: phase.request_count,
    }
}

/// Converts a phase result into a full detail row.
fn phase_detail(phase: &PhaseResult) -> PhaseDetail {
    PhaseDetail {
        label: phase.label.clone(),
        target_rate: phase.target_rate,
        actual_rate: finite_or_zero(phase.actual_rate),
        duration_seconds: phase.duration_seconds,
        requests: phase.request_count,
        latency_ms: normalize_latency(&phase.latency),
        socket_errors: phase.socket_errors,
        http_status: phase.http_status.clone(),
        retries: phase.retries,
    }
}

/// Replaces a non-finite value with zero.
const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
