// crates/phasebench-core/src/core/measurement.rs
// ============================================================================
// Module: Measurements
// Description: Per-phase and aggregate measurement records.
// Purpose: Carry typed generator measurements between runtime stages.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PhaseResult`] is created once per generator invocation and never
//! changed afterwards. The merger folds an ordered slice of them into an
//! [`AggregateResult`] with the same field layout, so single-phase and
//! multi-phase runs flow through the builder identically.
//! All latency values are milliseconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::Deserialize;
use serde::Serialize;

use crate::core::profile::Phase;

// ============================================================================
// SECTION: Latency Percentiles
// ============================================================================

/// Latency percentiles in milliseconds. `None` means the generator did not
/// report the percentile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatencyPercentiles {
    /// Median latency.
    pub p50: Option<f64>,
    /// 75th percentile latency.
    pub p75: Option<f64>,
    /// 90th percentile latency.
    pub p90: Option<f64>,
    /// 95th percentile latency.
    pub p95: Option<f64>,
    /// 99th percentile latency.
    pub p99: Option<f64>,
}

// ============================================================================
// SECTION: Socket Errors
// ============================================================================

/// Socket-level error counters reported by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocketErrors {
    /// Connection establishment failures.
    pub connect: u64,
    /// Read failures.
    pub read: u64,
    /// Write failures.
    pub write: u64,
    /// Request timeouts.
    pub timeout: u64,
}

impl SocketErrors {
    /// Returns the sum of all socket error counters.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.connect
            .saturating_add(self.read)
            .saturating_add(self.write)
            .saturating_add(self.timeout)
    }

    /// Returns the per-counter sum of two error sets.
    #[must_use]
    pub const fn combined(&self, other: &Self) -> Self {
        Self {
            connect: self.connect.saturating_add(other.connect),
            read: self.read.saturating_add(other.read),
            write: self.write.saturating_add(other.write),
            timeout: self.timeout.saturating_add(other.timeout),
        }
    }
}

// ============================================================================
// SECTION: Status Histogram
// ============================================================================

/// Response counts keyed by HTTP status code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusHistogram(BTreeMap<u16, u64>);

impl StatusHistogram {
    /// Creates an empty histogram.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds `count` responses for `status`.
    pub fn record(&mut self, status: u16, count: u64) {
        let entry = self.0.entry(status).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Adds every count from `other` into this histogram.
    pub fn absorb(&mut self, other: &Self) {
        for (status, count) in &other.0 {
            self.record(*status, *count);
        }
    }

    /// Returns the count recorded for `status`.
    #[must_use]
    pub fn count(&self, status: u16) -> u64 {
        self.0.get(&status).copied().unwrap_or(0)
    }

    /// Returns the total count across codes in `range`.
    #[must_use]
    pub fn count_in(&self, range: RangeInclusive<u16>) -> u64 {
        self.0.range(range).fold(0_u64, |acc, (_, count)| acc.saturating_add(*count))
    }

    /// Returns the total count across all codes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().fold(0_u64, |acc, count| acc.saturating_add(*count))
    }

    /// Returns true when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates status codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.0.iter().map(|(status, count)| (*status, *count))
    }
}

impl FromIterator<(u16, u64)> for StatusHistogram {
    fn from_iter<I: IntoIterator<Item = (u16, u64)>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for (status, count) in iter {
            histogram.record(status, count);
        }
        histogram
    }
}

// ============================================================================
// SECTION: Cache Counters
// ============================================================================

/// Cache hit/miss counters reported by the target through the side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheCounters {
    /// Cache hits.
    pub hits: u64,
    /// Cache misses.
    pub misses: u64,
}

impl CacheCounters {
    /// Returns the per-counter sum of two counter sets.
    #[must_use]
    pub const fn combined(&self, other: &Self) -> Self {
        Self {
            hits: self.hits.saturating_add(other.hits),
            misses: self.misses.saturating_add(other.misses),
        }
    }

    /// Returns the hit ratio, or `None` when no lookups were recorded.
    #[must_use]
    pub fn hit_rate(&self) -> Option<f64> {
        let lookups = self.hits.saturating_add(self.misses);
        if lookups == 0 {
            return None;
        }
        Some(count_as_f64(self.hits) / count_as_f64(lookups))
    }
}

// ============================================================================
// SECTION: Phase Result
// ============================================================================

/// Typed measurement for one executed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseResult {
    /// Phase label.
    pub label: String,
    /// Planned target rate.
    pub target_rate: u64,
    /// Achieved rate in requests per second.
    pub actual_rate: f64,
    /// Planned phase length in seconds.
    pub duration_seconds: u64,
    /// Completed requests.
    pub request_count: u64,
    /// Latency percentiles in milliseconds.
    pub latency: LatencyPercentiles,
    /// Socket error counters.
    pub socket_errors: SocketErrors,
    /// Responses by status code.
    pub http_status: StatusHistogram,
    /// Client-side retries.
    pub retries: u64,
    /// Cache counters when the target reported them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheCounters>,
}

impl PhaseResult {
    /// Creates an empty result for `phase` with no measurements.
    #[must_use]
    pub fn empty(phase: &Phase) -> Self {
        Self {
            label: phase.label.clone(),
            target_rate: phase.target_rate,
            actual_rate: 0.0,
            duration_seconds: phase.duration_seconds,
            request_count: 0,
            latency: LatencyPercentiles::default(),
            socket_errors: SocketErrors::default(),
            http_status: StatusHistogram::new(),
            retries: 0,
            cache: None,
        }
    }
}

// ============================================================================
// SECTION: Aggregate Result
// ============================================================================

/// Merged measurement for a whole run.
///
/// # Invariants
/// - `total_requests` is the sum of phase request counts.
/// - `latency.p99` is the maximum p99 across phases.
/// - `latency.p50..p95` are taken from the last phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateResult {
    /// Peak planned target rate across phases.
    pub target_rate: u64,
    /// Duration-weighted achieved rate.
    pub weighted_rps: f64,
    /// Sum of phase durations in seconds.
    pub total_duration: u64,
    /// Sum of phase request counts.
    pub total_requests: u64,
    /// Representative percentiles with the worst-case p99.
    pub latency: LatencyPercentiles,
    /// Summed socket error counters.
    pub socket_errors: SocketErrors,
    /// Per-code summed status histogram.
    pub http_status: StatusHistogram,
    /// Summed retries.
    pub retries: u64,
    /// Summed cache counters when any phase reported them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheCounters>,
    /// Number of merged phases.
    pub phase_count: usize,
}

impl AggregateResult {
    /// Returns the worst-case p99 across phases.
    #[must_use]
    pub const fn max_p99(&self) -> Option<f64> {
        self.latency.p99
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a counter into `f64` for ratio arithmetic.
#[allow(clippy::cast_precision_loss, reason = "Counters stay far below 2^53 in practice.")]
#[must_use]
pub fn count_as_f64(value: u64) -> f64 {
    value as f64
}
