// crates/phasebench-core/src/core/document.rs
// ============================================================================
// Module: Metrics Documents
// Description: Versioned metrics document and the companion extended document.
// Purpose: Define the persisted, schema-versioned artifacts for one run.
// Dependencies: serde, crate::core::{hashing, measurement}
// ============================================================================

//! ## Overview
//! [`MetricsDocument`] (version `3.0`) is the primary artifact of a run. It is
//! built once by the metrics builder, written once, and never mutated.
//! [`ExtendedDocument`] (version `1.0`) is written only for multi-phase runs
//! and carries the rate-verification log and per-phase detail.
//!
//! Both shapes are mirrored by the JSON schemas in `phasebench-contract`;
//! field changes here require a schema change there.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::measurement::LatencyPercentiles;
use crate::core::measurement::SocketErrors;
use crate::core::measurement::StatusHistogram;
use crate::core::profile::LoadProfile;
use crate::core::profile::ToleranceMode;

// ============================================================================
// SECTION: Versions
// ============================================================================

/// Version tag of the primary metrics document.
pub const METRICS_DOCUMENT_VERSION: &str = "3.0";
/// Version tag of the extended metrics document.
pub const EXTENDED_DOCUMENT_VERSION: &str = "1.0";

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Protocol-level contract a scenario promises to honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioContract {
    /// Idempotent PUT updates: the target must never answer 400.
    PutUpdate,
}

/// Scenario identity and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioInfo {
    /// Scenario name, unique within a results tree.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Endpoint or script identity under test.
    pub endpoint: String,
    /// Load profile used for the run.
    pub profile: LoadProfile,
    /// Optional protocol contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ScenarioContract>,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Execution parameters for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionInfo {
    /// Run start time as RFC 3339.
    pub started_at: String,
    /// Configured total duration in seconds.
    pub duration_seconds: u64,
    /// Configured target rate.
    pub target_rate: u64,
    /// Configured floor rate.
    pub min_rate: u64,
    /// Generator threads.
    pub threads: u32,
    /// Generator connections.
    pub connections: u32,
    /// Rate tolerance policy.
    pub tolerance_mode: ToleranceMode,
    /// Number of planned phases.
    pub phase_count: usize,
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Results block derived from the aggregate measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultsBlock {
    /// Completed requests.
    pub requests: u64,
    /// Measured duration in seconds.
    pub duration_seconds: u64,
    /// Duration-weighted achieved rate.
    pub rps: f64,
    /// Latency percentiles in milliseconds; `null` when unavailable.
    pub latency_ms: LatencyPercentiles,
    /// Error ratio in `[0, 1]`.
    pub error_rate: Option<f64>,
    /// Client-side retries.
    pub retries: u64,
}

/// Error breakdown for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorBreakdown {
    /// Responses with status 400-499.
    pub http_4xx: u64,
    /// Responses with status 500-599.
    pub http_5xx: u64,
    /// Socket error counters.
    pub socket_errors: SocketErrors,
    /// Sum of socket error counters.
    pub socket_errors_total: u64,
    /// Responses by status code.
    pub http_status: StatusHistogram,
}

/// Cache metrics block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheMetrics {
    /// Cache hits.
    pub hits: u64,
    /// Cache misses.
    pub misses: u64,
    /// Hit ratio in `[0, 1]`; `null` when no lookups were recorded.
    pub hit_rate: Option<f64>,
}

// ============================================================================
// SECTION: Environment Fingerprint
// ============================================================================

/// Identity of the machine and tools that produced a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentFingerprint {
    /// Operating system family.
    pub os: String,
    /// CPU architecture.
    pub arch: String,
    /// Logical CPU count.
    pub cpu_count: usize,
    /// Load generator identity.
    pub generator: String,
    /// Operator-supplied host label.
    pub host: String,
    /// Canonical digest over the other fields.
    pub digest: HashDigest,
}

/// Fields covered by the fingerprint digest.
#[derive(Serialize)]
struct FingerprintFields<'a> {
    /// Operating system family.
    os: &'a str,
    /// CPU architecture.
    arch: &'a str,
    /// Logical CPU count.
    cpu_count: usize,
    /// Load generator identity.
    generator: &'a str,
    /// Operator-supplied host label.
    host: &'a str,
}

impl EnvironmentFingerprint {
    /// Builds a fingerprint and computes its digest.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn new(
        os: impl Into<String>,
        arch: impl Into<String>,
        cpu_count: usize,
        generator: impl Into<String>,
        host: impl Into<String>,
    ) -> Result<Self, HashError> {
        let os = os.into();
        let arch = arch.into();
        let generator = generator.into();
        let host = host.into();
        let digest = hash_canonical_json(
            DEFAULT_HASH_ALGORITHM,
            &FingerprintFields {
                os: &os,
                arch: &arch,
                cpu_count,
                generator: &generator,
                host: &host,
            },
        )?;
        Ok(Self {
            os,
            arch,
            cpu_count,
            generator,
            host,
            digest,
        })
    }

    /// Captures the fingerprint of the current process environment.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonicalization fails.
    pub fn capture(generator: &str, host: &str) -> Result<Self, HashError> {
        let cpu_count = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self::new(std::env::consts::OS, std::env::consts::ARCH, cpu_count, generator, host)
    }
}

// ============================================================================
// SECTION: Phase Summary
// ============================================================================

/// Compact per-phase row embedded in the primary document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseSummary {
    /// Phase label.
    pub label: String,
    /// Planned target rate.
    pub target_rate: u64,
    /// Achieved rate.
    pub actual_rate: f64,
    /// Phase length in seconds.
    pub duration_seconds: u64,
    /// Completed requests.
    pub requests: u64,
}

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Terminal acceptance of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run produced complete measurements.
    Passed,
    /// The run is not acceptable.
    Failed,
}

impl RunOutcome {
    /// Returns the stable outcome label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

/// Run status with the reasons for a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunStatus {
    /// Terminal outcome.
    pub outcome: RunOutcome,
    /// Reasons for a failed outcome, empty when passed.
    pub reasons: Vec<String>,
}

impl RunStatus {
    /// Returns true when the run failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.outcome == RunOutcome::Failed
    }
}

// ============================================================================
// SECTION: Metrics Document
// ============================================================================

/// Primary metrics document (version `3.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsDocument {
    /// Document version tag.
    pub version: String,
    /// Scenario identity.
    pub scenario: ScenarioInfo,
    /// Execution parameters.
    pub execution: ExecutionInfo,
    /// Results block.
    pub results: ResultsBlock,
    /// Error breakdown.
    pub errors: ErrorBreakdown,
    /// Cache metrics when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheMetrics>,
    /// Environment fingerprint.
    pub environment: EnvironmentFingerprint,
    /// Per-phase rows for multi-phase runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<PhaseSummary>>,
    /// Run status.
    pub status: RunStatus,
}

// ============================================================================
// SECTION: Extended Document
// ============================================================================

/// Rate-verification section of the extended document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateControl {
    /// Tolerance policy in force.
    pub tolerance_mode: ToleranceMode,
    /// Verdicts in execution order.
    pub verdicts: Vec<crate::runtime::verifier::RateVerdict>,
    /// Number of failed verdicts.
    pub failed_phases: usize,
}

/// Full per-phase detail row of the extended document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseDetail {
    /// Phase label.
    pub label: String,
    /// Planned target rate.
    pub target_rate: u64,
    /// Achieved rate.
    pub actual_rate: f64,
    /// Phase length in seconds.
    pub duration_seconds: u64,
    /// Completed requests.
    pub requests: u64,
    /// Normalized latency percentiles.
    pub latency_ms: LatencyPercentiles,
    /// Socket error counters.
    pub socket_errors: SocketErrors,
    /// Responses by status code.
    pub http_status: StatusHistogram,
    /// Client-side retries.
    pub retries: u64,
}

/// Aggregate summary repeated in the extended document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateSummary {
    /// Sum of phase request counts.
    pub total_requests: u64,
    /// Sum of phase durations.
    pub total_duration: u64,
    /// Duration-weighted achieved rate.
    pub weighted_rps: f64,
    /// Worst-case p99 across phases.
    pub max_p99: Option<f64>,
}

/// Extended metrics document (version `1.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtendedDocument {
    /// Document version tag.
    pub version: String,
    /// Scenario name.
    pub scenario: String,
    /// Load profile.
    pub profile: LoadProfile,
    /// Rate-control diagnostics.
    pub rate_control: RateControl,
    /// Per-phase detail.
    pub phases: Vec<PhaseDetail>,
    /// Aggregate summary.
    pub aggregate: AggregateSummary,
    /// Warnings raised while merging.
    pub warnings: Vec<String>,
}
