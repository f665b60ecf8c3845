// crates/phasebench-core/src/runtime/runner.rs
// ============================================================================
// Module: Phased Runner
// Description: Sequential phase execution from plan to metrics documents.
// Purpose: Drive one benchmark run through every core stage in order.
// Dependencies: crate::{core, interfaces, runtime}, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! [`PhasedRunner`] executes a run strictly in order:
//! plan, then for each phase generate, verify, and accumulate, then merge
//! and build. Phases never overlap because the generator owns the target's
//! connections for the whole phase.
//!
//! A strict-mode rate failure aborts the remaining phases. An optional
//! profiler wraps exactly one phase; its session is stopped when the phase
//! ends, whether the generator succeeded or not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::document::EnvironmentFingerprint;
use crate::core::document::ExecutionInfo;
use crate::core::document::ExtendedDocument;
use crate::core::document::MetricsDocument;
use crate::core::failure::FailureKind;
use crate::core::hashing::HashError;
use crate::core::measurement::PhaseResult;
use crate::core::profile::Phase;
use crate::core::settings::ProfileTarget;
use crate::core::settings::RunSettings;
use crate::interfaces::EventSink;
use crate::interfaces::GeneratorError;
use crate::interfaces::LoadGenerator;
use crate::interfaces::PhaseRequest;
use crate::interfaces::ProfileSession;
use crate::interfaces::Profiler;
use crate::interfaces::RawArtifact;
use crate::interfaces::RunEvent;
use crate::interfaces::RunEventKind;
use crate::runtime::builder::BuildContext;
use crate::runtime::builder::build_extended_document;
use crate::runtime::builder::build_metrics_document;
use crate::runtime::merger::MergeError;
use crate::runtime::merger::MergedRun;
use crate::runtime::merger::merge_phases;
use crate::runtime::planner::PlanError;
use crate::runtime::planner::plan_phases;
use crate::runtime::planner::planned_duration;
use crate::runtime::verifier::RateViolation;
use crate::runtime::verifier::VerificationLog;
use crate::runtime::verifier::evaluate_rate;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Profile parameters were rejected before any phase ran.
    #[error("invalid load profile: {0}")]
    Plan(#[from] PlanError),
    /// The generator failed for a phase.
    #[error("phase {phase} failed: {source}")]
    Generator {
        /// Phase label.
        phase: String,
        /// Generator failure.
        source: GeneratorError,
    },
    /// A phase missed its rate under strict tolerance.
    #[error("strict rate check failed: {0}")]
    RateViolation(#[from] RateViolation),
    /// Phase results could not be merged.
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),
    /// The environment fingerprint could not be computed.
    #[error("environment fingerprint failed: {0}")]
    Fingerprint(#[from] HashError),
}

impl RunError {
    /// Returns the failure kind used for exit-code translation.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Plan(_) => FailureKind::Configuration,
            Self::Generator {
                ..
            } => FailureKind::Generator,
            Self::RateViolation(_) | Self::Merge(_) => FailureKind::Measurement,
            Self::Fingerprint(_) => FailureKind::Recording,
        }
    }
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// Everything produced by a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Planned phases.
    pub phases: Vec<Phase>,
    /// Per-phase results in execution order.
    pub results: Vec<PhaseResult>,
    /// Rate verdicts in execution order.
    pub verification: VerificationLog,
    /// Merge output.
    pub merged: MergedRun,
    /// Primary metrics document.
    pub document: MetricsDocument,
    /// Extended document for multi-phase runs.
    pub extended: Option<ExtendedDocument>,
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Sequential executor for one benchmark run.
pub struct PhasedRunner<'a> {
    /// Load generator invoked once per phase.
    generator: &'a mut dyn LoadGenerator,
    /// Optional profiler wrapping one phase.
    profiler: Option<&'a mut dyn Profiler>,
    /// Structured event sink.
    sink: &'a dyn EventSink,
}

impl<'a> PhasedRunner<'a> {
    /// Creates a runner without a profiler.
    #[must_use]
    pub fn new(generator: &'a mut dyn LoadGenerator, sink: &'a dyn EventSink) -> Self {
        Self {
            generator,
            profiler: None,
            sink,
        }
    }

    /// Attaches a profiler used for the phase selected in the run settings.
    #[must_use]
    pub fn with_profiler(mut self, profiler: &'a mut dyn Profiler) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// Executes a full run.
    ///
    /// `started_at` is recorded verbatim in the execution block; see
    /// [`rfc3339_now`].
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when planning fails, a generator invocation
    /// fails, a strict rate check fails, or the environment fingerprint
    /// cannot be computed. No document is produced in those cases.
    pub fn run(&mut self, settings: &RunSettings, started_at: &str) -> Result<RunRecord, RunError> {
        let scenario = settings.scenario.name.as_str();
        let phases = plan_phases(settings.profile, &settings.params)?;
        for (index, phase) in phases.iter().enumerate() {
            self.emit(
                RunEvent::new(RunEventKind::PhasePlanned, scenario)
                    .with_phase(&phase.label)
                    .with_detail(json!({
                        "index": index,
                        "target_rate": phase.target_rate,
                        "duration_seconds": phase.duration_seconds,
                    })),
            );
        }
        let profiled = profiled_phase(settings.profile_phase.as_ref(), &phases);
        if let (Some(ProfileTarget::Label(label)), None) =
            (settings.profile_phase.as_ref(), profiled)
        {
            self.warn(scenario, None, format!("profile phase {label} is not part of the plan"));
        }

        let mut verification = VerificationLog::new(settings.tolerance);
        let mut results = Vec::with_capacity(phases.len());
        for (index, phase) in phases.iter().enumerate() {
            let artifact = self.execute_phase(settings, index, phase, profiled == Some(index))?;
            let result = phase_result(phase, &artifact);
            self.emit(
                RunEvent::new(RunEventKind::PhaseCompleted, scenario)
                    .with_phase(&phase.label)
                    .with_detail(json!({
                        "requests": result.request_count,
                        "actual_rate": result.actual_rate,
                        "applied_rate": artifact.applied_rate,
                        "raw_output": artifact.raw_output,
                    })),
            );
            results.push(result);

            let verdict = evaluate_rate(&phase.label, phase.target_rate, artifact.rps_achieved);
            if verdict.normalized {
                self.warn(
                    scenario,
                    Some(&phase.label),
                    format!("achieved rate for phase {} was not numeric; using 0", phase.label),
                );
            }
            self.emit(
                RunEvent::new(RunEventKind::RateVerdict, scenario)
                    .with_phase(&phase.label)
                    .with_detail(serde_json::to_value(&verdict).unwrap_or(Value::Null)),
            );
            if let Err(violation) = verification.append(verdict) {
                self.emit(
                    RunEvent::new(RunEventKind::RunAborted, scenario)
                        .with_phase(&phase.label)
                        .with_message(violation.to_string()),
                );
                return Err(RunError::RateViolation(violation));
            }
        }

        let merged = merge_phases(&results)?;
        for warning in &merged.warnings {
            self.warn(scenario, None, warning.clone());
        }
        let environment =
            EnvironmentFingerprint::capture(&self.generator.identity(), &settings.host_label)?;
        let execution = ExecutionInfo {
            started_at: started_at.to_string(),
            duration_seconds: planned_duration(&phases),
            target_rate: settings.params.target_rate,
            min_rate: settings.params.min_rate,
            threads: settings.concurrency.threads,
            connections: settings.concurrency.connections,
            tolerance_mode: settings.tolerance,
            phase_count: phases.len(),
        };
        let context = BuildContext {
            scenario: &settings.scenario,
            execution: &execution,
            environment: &environment,
        };
        let document = build_metrics_document(&context, &merged.aggregate, &results);
        let extended = build_extended_document(&context, &merged, &results, &verification);
        self.emit(
            RunEvent::new(RunEventKind::RunCompleted, scenario)
                .with_message(format!("run {}", document.status.outcome.as_str()))
                .with_detail(json!({
                    "requests": document.results.requests,
                    "rps": document.results.rps,
                    "failed_phases": verification.failure_count(),
                })),
        );
        Ok(RunRecord {
            phases,
            results,
            verification,
            merged,
            document,
            extended,
        })
    }

    /// Runs the generator for one phase, wrapping it in a profiler session
    /// when requested.
    fn execute_phase(
        &mut self,
        settings: &RunSettings,
        index: usize,
        phase: &Phase,
        profile: bool,
    ) -> Result<RawArtifact, RunError> {
        let scenario = settings.scenario.name.as_str();
        self.emit(RunEvent::new(RunEventKind::PhaseStarted, scenario).with_phase(&phase.label));
        let session = if profile { self.start_profiler(scenario, phase) } else { None };
        let guard = SessionGuard {
            session,
            sink: self.sink,
            scenario,
            phase: &phase.label,
        };
        let request = PhaseRequest {
            index,
            phase,
            target: &settings.target,
            concurrency: settings.concurrency,
        };
        let outcome = self.generator.run_phase(&request);
        drop(guard);
        match outcome {
            Ok(artifact) => {
                for warning in &artifact.warnings {
                    self.warn(scenario, Some(&phase.label), warning.clone());
                }
                Ok(artifact)
            }
            Err(source) => {
                self.emit(
                    RunEvent::new(RunEventKind::RunAborted, scenario)
                        .with_phase(&phase.label)
                        .with_message(source.to_string()),
                );
                Err(RunError::Generator {
                    phase: phase.label.clone(),
                    source,
                })
            }
        }
    }

    /// Starts a profiler session; start failures are reported and ignored.
    fn start_profiler(&mut self, scenario: &str, phase: &Phase) -> Option<Box<dyn ProfileSession>> {
        let profiler = self.profiler.as_deref_mut()?;
        match profiler.start(phase) {
            Ok(session) => Some(session),
            Err(err) => {
                self.warn(scenario, Some(&phase.label), err.to_string());
                None
            }
        }
    }

    /// Emits a warning event.
    fn warn(&self, scenario: &str, phase: Option<&str>, message: String) {
        let event = RunEvent::new(RunEventKind::Warning, scenario).with_message(message);
        let event = match phase {
            Some(label) => event.with_phase(label),
            None => event,
        };
        self.emit(event);
    }

    /// Forwards an event to the sink.
    fn emit(&self, event: RunEvent) {
        self.sink.record(&event);
    }
}

// ============================================================================
// SECTION: Profiler Guard
// ============================================================================

/// Stops a profiler session when dropped.
struct SessionGuard<'s> {
    /// Active session, if one started.
    session: Option<Box<dyn ProfileSession>>,
    /// Sink receiving stop failures.
    sink: &'s dyn EventSink,
    /// Scenario name.
    scenario: &'s str,
    /// Phase label.
    phase: &'s str,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(err) = session.stop()
        {
            self.sink.record(
                &RunEvent::new(RunEventKind::Warning, self.scenario)
                    .with_phase(self.phase)
                    .with_message(err.to_string()),
            );
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current UTC time in RFC 3339 form.
#[must_use]
pub fn rfc3339_now() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::from("unknown"))
}

/// Converts a generator artifact into a typed phase result.
#[must_use]
pub fn phase_result(phase: &Phase, artifact: &RawArtifact) -> PhaseResult {
    PhaseResult {
        label: phase.label.clone(),
        target_rate: phase.target_rate,
        actual_rate: artifact.rps_achieved.filter(|rate| rate.is_finite()).unwrap_or(0.0),
        duration_seconds: phase.duration_seconds,
        request_count: artifact.requests_completed,
        latency: artifact.latency,
        socket_errors: artifact.socket_errors,
        http_status: artifact.http_status.clone(),
        retries: artifact.retries,
        cache: artifact.cache,
    }
}

/// Resolves the index of the phase to profile.
fn profiled_phase(target: Option<&ProfileTarget>, phases: &[Phase]) -> Option<usize> {
    match target? {
        ProfileTarget::LastPhase => phases.len().checked_sub(1),
        ProfileTarget::Label(label) => phases.iter().position(|phase| &phase.label == label),
    }
}
