// crates/phasebench-core/tests/runner.rs
// ============================================================================
// Module: Phased Runner Tests
// Description: End-to-end runs against scripted generators.
// ============================================================================
//! ## Overview
//! Validates sequential execution, strict-mode abort, generator failures,
//! profiler session lifetimes, and emitted run events.

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

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use phasebench_core::Concurrency;
use phasebench_core::FailureKind;
use phasebench_core::GeneratorError;
use phasebench_core::LoadGenerator;
use phasebench_core::LoadProfile;
use phasebench_core::Phase;
use phasebench_core::PhaseRequest;
use phasebench_core::PhasedRunner;
use phasebench_core::ProfileParams;
use phasebench_core::ProfileSession;
use phasebench_core::ProfileTarget;
use phasebench_core::Profiler;
use phasebench_core::ProfilerError;
use phasebench_core::RawArtifact;
use phasebench_core::RunError;
use phasebench_core::RunOutcome;
use phasebench_core::RunSettings;
use phasebench_core::TargetSpec;
use phasebench_core::ToleranceMode;
use phasebench_core::runtime::NoopEventSink;
use phasebench_core::runtime::RateOutcome;
use phasebench_core::runtime::WriterEventSink;
use serde_json::Value;

/// Generator that achieves `ratio` of each phase's target rate.
struct ScriptedGenerator {
    ratio: f64,
    fail_at: Option<usize>,
    calls: Vec<String>,
}

impl ScriptedGenerator {
    fn new(ratio: f64) -> Self {
        Self {
            ratio,
            fail_at: None,
            calls: Vec::new(),
        }
    }
}

impl LoadGenerator for ScriptedGenerator {
    fn identity(&self) -> String {
        "scripted 1.0".to_string()
    }

    fn run_phase(&mut self, request: &PhaseRequest<'_>) -> Result<RawArtifact, GeneratorError> {
        self.calls.push(request.phase.label.clone());
        if self.fail_at == Some(request.index) {
            return Err(GeneratorError::Exit {
                phase: request.phase.label.clone(),
                status: "exit status: 1".to_string(),
                stderr: "connection refused".to_string(),
            });
        }
        #[allow(clippy::cast_precision_loss, reason = "Test rates are small.")]
        let rps = request.phase.target_rate as f64 * self.ratio;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "Test request counts are small and non-negative."
        )]
        let requests = (rps * request.phase.duration_seconds as f64) as u64;
        Ok(RawArtifact {
            requests_completed: requests,
            rps_achieved: Some(rps),
            latency: common::latency(5.0, 20.0),
            http_status: [(200, requests)].into_iter().collect(),
            applied_rate: request.phase.target_rate,
            ..RawArtifact::default()
        })
    }
}

/// Profiler counting started and stopped sessions.
#[derive(Default)]
struct CountingProfiler {
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
    phases: Vec<String>,
}

struct CountingSession {
    stopped: Arc<AtomicUsize>,
    done: bool,
}

impl ProfileSession for CountingSession {
    fn stop(&mut self) -> Result<(), ProfilerError> {
        if !self.done {
            self.done = true;
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Profiler for CountingProfiler {
    fn start(&mut self, phase: &Phase) -> Result<Box<dyn ProfileSession>, ProfilerError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.phases.push(phase.label.clone());
        Ok(Box::new(CountingSession {
            stopped: Arc::clone(&self.stopped),
            done: false,
        }))
    }
}

fn settings(profile: LoadProfile, tolerance: ToleranceMode) -> RunSettings {
    let mut scenario = common::scenario("orders");
    scenario.profile = profile;
    RunSettings {
        scenario,
        profile,
        params: ProfileParams {
            target_rate: 100,
            min_rate: 20,
            total_duration: 40,
            step_count: 4,
            ..ProfileParams::default()
        },
        tolerance,
        target: TargetSpec {
            url: "http://127.0.0.1:8080/items".to_string(),
            script: None,
        },
        concurrency: Concurrency::default(),
        profile_phase: None,
        host_label: "bench-host".to_string(),
    }
}

#[test]
fn multi_phase_run_produces_both_documents() {
    let mut generator = ScriptedGenerator::new(1.0);
    let sink = NoopEventSink;
    let settings = settings(LoadProfile::StepUp, ToleranceMode::Strict);
    let record =
        PhasedRunner::new(&mut generator, &sink).run(&settings, "2026-01-01T00:00:00Z").unwrap();

    assert_eq!(generator.calls, vec!["step-1", "step-2", "step-3", "step-4"]);
    assert_eq!(record.results.len(), 4);
    assert_eq!(record.document.execution.phase_count, 4);
    assert_eq!(record.document.execution.duration_seconds, 40);
    assert_eq!(record.document.status.outcome, RunOutcome::Passed);
    assert_eq!(record.document.environment.generator, "scripted 1.0");
    let extended = record.extended.unwrap();
    assert_eq!(extended.rate_control.verdicts.len(), 4);
    assert_eq!(extended.rate_control.failed_phases, 0);
}

#[test]
fn strict_failure_aborts_remaining_phases() {
    let mut generator = ScriptedGenerator::new(0.5);
    let sink = NoopEventSink;
    let settings = settings(LoadProfile::StepUp, ToleranceMode::Strict);
    let err = PhasedRunner::new(&mut generator, &sink).run(&settings, "now").unwrap_err();

    assert_eq!(generator.calls, vec!["step-1"]);
    assert_eq!(err.kind(), FailureKind::Measurement);
    let RunError::RateViolation(violation) = err else {
        panic!("expected a rate violation");
    };
    assert_eq!(violation.verdict.phase, "step-1");
}

#[test]
fn warn_mode_runs_every_phase_and_records_failures() {
    let mut generator = ScriptedGenerator::new(0.5);
    let sink = NoopEventSink;
    let settings = settings(LoadProfile::StepUp, ToleranceMode::Warn);
    let record = PhasedRunner::new(&mut generator, &sink).run(&settings, "now").unwrap();

    assert_eq!(generator.calls.len(), 4);
    assert_eq!(record.verification.failure_count(), 4);
    assert!(record.verification.entries().iter().all(|entry| entry.outcome == RateOutcome::Fail));
}

#[test]
fn generator_failure_stops_the_run() {
    let mut generator = ScriptedGenerator::new(1.0);
    generator.fail_at = Some(1);
    let sink = NoopEventSink;
    let settings = settings(LoadProfile::StepUp, ToleranceMode::Warn);
    let err = PhasedRunner::new(&mut generator, &sink).run(&settings, "now").unwrap_err();

    assert_eq!(generator.calls, vec!["step-1", "step-2"]);
    assert_eq!(err.kind(), FailureKind::Generator);
    assert!(err.to_string().contains("step-2"));
}

#[test]
fn invalid_profile_fails_before_any_phase() {
    let mut generator = ScriptedGenerator::new(1.0);
    let sink = NoopEventSink;
    let mut settings = settings(LoadProfile::Burst, ToleranceMode::Warn);
    settings.params.burst_interval = 2;
    settings.params.burst_duration = 5;
    let err = PhasedRunner::new(&mut generator, &sink).run(&settings, "now").unwrap_err();

    assert!(generator.calls.is_empty());
    assert_eq!(err.kind(), FailureKind::Configuration);
}

#[test]
fn profiler_wraps_only_the_selected_phase() {
    let mut generator = ScriptedGenerator::new(1.0);
    generator.fail_at = Some(2);
    let mut profiler = CountingProfiler::default();
    let sink = NoopEventSink;
    let mut settings = settings(LoadProfile::StepUp, ToleranceMode::Warn);
    settings.profile_phase = Some(ProfileTarget::Label("step-3".to_string()));
    let result =
        PhasedRunner::new(&mut generator, &sink).with_profiler(&mut profiler).run(&settings, "now");

    assert!(result.is_err());
    assert_eq!(profiler.phases, vec!["step-3"]);
    assert_eq!(profiler.started.load(Ordering::SeqCst), 1);
    assert_eq!(profiler.stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn events_are_emitted_as_json_lines() {
    let mut generator = ScriptedGenerator::new(1.0);
    let sink = WriterEventSink::new(Vec::new());
    let settings = settings(LoadProfile::Steady, ToleranceMode::Warn);
    PhasedRunner::new(&mut generator, &sink).run(&settings, "now").unwrap();

    let bytes = sink.into_inner().unwrap();
    let events: Vec<Value> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|event| event["event"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec!["phase_planned", "phase_started", "phase_completed", "rate_verdict", "run_completed"]
    );
    assert_eq!(events[0]["phase"], "steady");
    assert_eq!(events[3]["detail"]["outcome"], "pass");
}
