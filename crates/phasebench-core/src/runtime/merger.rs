// crates/phasebench-core/src/runtime/merger.rs
// ============================================================================
// Module: Result Merger
// Description: Folds ordered per-phase results into one aggregate.
// Purpose: Combine heterogeneous phase samples into a single defensible result.
// Dependencies: crate::core::measurement, thiserror
// ============================================================================

//! ## Overview
//! [`merge_phases`] applies one rule per field:
//! - counts (requests, socket errors, retries, status codes) are summed,
//! - the achieved rate is weighted by phase duration so short transient
//!   phases do not dominate,
//! - p99 is the maximum across phases so one bad phase is never averaged away,
//! - p50 through p95 come from the last phase, the steady or peak state.
//!
//! Sums and the maximum are independent of phase order; the representative
//! percentiles are not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::measurement::AggregateResult;
use crate::core::measurement::CacheCounters;
use crate::core::measurement::LatencyPercentiles;
use crate::core::measurement::PhaseResult;
use crate::core::measurement::SocketErrors;
use crate::core::measurement::StatusHistogram;
use crate::core::measurement::count_as_f64;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Merge output with the warnings raised while merging.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRun {
    /// Aggregate measurement.
    pub aggregate: AggregateResult,
    /// Warnings raised while merging.
    pub warnings: Vec<String>,
}

/// Errors raised by the merger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// No phase results were supplied.
    #[error("cannot merge an empty phase sequence")]
    NoPhases,
}

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Merges ordered phase results into an aggregate.
///
/// # Errors
///
/// Returns [`MergeError::NoPhases`] when `phases` is empty.
pub fn merge_phases(phases: &[PhaseResult]) -> Result<MergedRun, MergeError> {
    let Some(last) = phases.last() else {
        return Err(MergeError::NoPhases);
    };
    let mut warnings = Vec::new();
    let mut total_requests = 0_u64;
    let mut total_duration = 0_u64;
    let mut weighted_sum = 0.0_f64;
    let mut target_rate = 0_u64;
    let mut max_p99: Option<f64> = None;
    let mut socket_errors = SocketErrors::default();
    let mut http_status = StatusHistogram::new();
    let mut retries = 0_u64;
    let mut cache: Option<CacheCounters> = None;

    for phase in phases {
        total_requests = total_requests.saturating_add(phase.request_count);
        total_duration = total_duration.saturating_add(phase.duration_seconds);
        weighted_sum += finite_rate(phase.actual_rate) * count_as_f64(phase.duration_seconds);
        target_rate = target_rate.max(phase.target_rate);
        match phase.latency.p99.filter(|value| value.is_finite()) {
            Some(p99) => {
                max_p99 = Some(max_p99.map_or(p99, |current| current.max(p99)));
            }
            None if phase.request_count > 0 => {
                warnings.push(format!(
                    "phase {} reported {} requests without a p99 latency",
                    phase.label, phase.request_count
                ));
            }
            None => {}
        }
        socket_errors = socket_errors.combined(&phase.socket_errors);
        http_status.absorb(&phase.http_status);
        retries = retries.saturating_add(phase.retries);
        if let Some(counters) = phase.cache {
            cache = Some(cache.map_or(counters, |current| current.combined(&counters)));
        }
    }

    let divisor = if total_duration == 0 {
        warnings.push(format!(
            "total duration across {} phases is zero; weighted rate uses a divisor of 1",
            phases.len()
        ));
        1
    } else {
        total_duration
    };

    let aggregate = AggregateResult {
        target_rate,
        weighted_rps: weighted_sum / count_as_f64(divisor),
        total_duration,
        total_requests,
        latency: LatencyPercentiles {
            p50: last.latency.p50,
            p75: last.latency.p75,
            p90: last.latency.p90,
            p95: last.latency.p95,
            p99: max_p99,
        },
        socket_errors,
        http_status,
        retries,
        cache,
        phase_count: phases.len(),
    };
    Ok(MergedRun {
        aggregate,
        warnings,
    })
}

/// Replaces a non-finite rate with zero.
const fn finite_rate(rate: f64) -> f64 {
    if rate.is_finite() { rate } else { 0.0 }
}
