// crates/phasebench-core/src/interfaces/mod.rs
// ============================================================================
// Module: Phasebench Interfaces
// Description: Contract surfaces for load generators, profilers, and event sinks.
// Purpose: Keep the runtime independent of subprocess and logging details.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The runtime drives external collaborators only through these traits. A
//! [`LoadGenerator`] executes one phase and returns a typed [`RawArtifact`];
//! a [`Profiler`] wraps one phase in a capture session; an [`EventSink`]
//! receives structured run events. Implementations live in other crates
//! (`phasebench-generator`) or in [`crate::runtime::sinks`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::measurement::CacheCounters;
use crate::core::measurement::LatencyPercentiles;
use crate::core::measurement::SocketErrors;
use crate::core::measurement::StatusHistogram;
use crate::core::profile::Phase;
use crate::core::settings::Concurrency;
use crate::core::settings::TargetSpec;

// ============================================================================
// SECTION: Load Generator
// ============================================================================

/// Inputs for one generator invocation.
#[derive(Debug, Clone, Copy)]
pub struct PhaseRequest<'a> {
    /// Zero-based phase index within the run.
    pub index: usize,
    /// Phase to execute.
    pub phase: &'a Phase,
    /// Target identity.
    pub target: &'a TargetSpec,
    /// Generator concurrency.
    pub concurrency: Concurrency,
}

/// Typed measurement returned by a generator for one phase.
///
/// Latency values are already converted to milliseconds. The raw generator
/// output is kept on disk (see `raw_output`) for audit only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawArtifact {
    /// Completed requests.
    pub requests_completed: u64,
    /// Achieved rate; `None` when the generator did not print a number.
    pub rps_achieved: Option<f64>,
    /// Latency percentiles in milliseconds.
    pub latency: LatencyPercentiles,
    /// Socket error counters.
    pub socket_errors: SocketErrors,
    /// Responses by status code.
    pub http_status: StatusHistogram,
    /// Client-side retries.
    pub retries: u64,
    /// Cache counters when reported by the target.
    pub cache: Option<CacheCounters>,
    /// Rate the generator was actually asked for, after floor substitution.
    pub applied_rate: u64,
    /// Location of the persisted raw output.
    pub raw_output: Option<PathBuf>,
    /// Non-fatal adapter warnings.
    pub warnings: Vec<String>,
}

/// Errors raised by load generators.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The generator process could not be started.
    #[error("failed to start generator `{binary}`: {message}")]
    Spawn {
        /// Generator binary.
        binary: String,
        /// Failure description.
        message: String,
    },
    /// The phase exceeded its deadline and the process was killed.
    #[error("phase {phase} exceeded its {seconds}s deadline")]
    Timeout {
        /// Phase label.
        phase: String,
        /// Deadline in seconds.
        seconds: u64,
    },
    /// The generator exited unsuccessfully.
    #[error("generator failed during phase {phase} (exit status {status}): {stderr}")]
    Exit {
        /// Phase label.
        phase: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The generator output could not be interpreted.
    #[error("unreadable generator output for phase {phase}: {message}")]
    Output {
        /// Phase label.
        phase: String,
        /// Failure description.
        message: String,
    },
    /// Raw artifact persistence failed.
    #[error("generator io error: {0}")]
    Io(String),
}

/// External load generator executing one rate-controlled phase at a time.
///
/// # Invariants
/// - `run_phase` blocks for the phase duration and owns the target's
///   connections while it runs; callers never invoke it concurrently.
pub trait LoadGenerator {
    /// Returns the generator identity recorded in environment fingerprints.
    fn identity(&self) -> String;

    /// Executes one phase.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError`] when the generator fails, times out, or
    /// produces unreadable output.
    fn run_phase(&mut self, request: &PhaseRequest<'_>) -> Result<RawArtifact, GeneratorError>;
}

// ============================================================================
// SECTION: Profiler
// ============================================================================

/// Errors raised by profilers.
#[derive(Debug, Error)]
pub enum ProfilerError {
    /// The profiler could not be started.
    #[error("failed to start profiler: {0}")]
    Start(String),
    /// The profiler could not be stopped cleanly.
    #[error("failed to stop profiler: {0}")]
    Stop(String),
}

/// Running profiler capture for one phase.
pub trait ProfileSession {
    /// Stops the capture. Calling `stop` more than once is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::Stop`] when the capture cannot be finalized.
    fn stop(&mut self) -> Result<(), ProfilerError>;
}

/// Profiler able to wrap one phase in a capture session.
pub trait Profiler {
    /// Starts a capture for `phase`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::Start`] when the capture cannot start.
    fn start(&mut self, phase: &Phase) -> Result<Box<dyn ProfileSession>, ProfilerError>;
}

// ============================================================================
// SECTION: Event Sink
// ============================================================================

/// Kinds of structured run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    /// A phase was planned.
    PhasePlanned,
    /// A phase is about to execute.
    PhaseStarted,
    /// A phase finished executing.
    PhaseCompleted,
    /// A rate verdict was recorded.
    RateVerdict,
    /// A non-fatal warning.
    Warning,
    /// The run stopped early.
    RunAborted,
    /// The run finished all phases.
    RunCompleted,
}

/// Structured run event emitted as one JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    /// Event kind.
    pub event: RunEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Scenario name.
    pub scenario: String,
    /// Phase label when the event concerns a phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured detail payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl RunEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event: RunEventKind, scenario: &str) -> Self {
        let timestamp_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis());
        Self {
            event,
            timestamp_ms,
            scenario: scenario.to_string(),
            phase: None,
            message: None,
            detail: None,
        }
    }

    /// Attaches a phase label.
    #[must_use]
    pub fn with_phase(mut self, phase: &str) -> Self {
        self.phase = Some(phase.to_string());
        self
    }

    /// Attaches a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a structured detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Sink for structured run events.
pub trait EventSink: Send + Sync {
    /// Records an event. Sinks never fail the run.
    fn record(&self, event: &RunEvent);
}
