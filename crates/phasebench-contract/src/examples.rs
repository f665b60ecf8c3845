// crates/phasebench-contract/src/examples.rs
// ============================================================================
// Module: Contract Examples
// Description: Canonical example metrics documents.
// Purpose: Deterministic samples that must always pass both schemas.
// Dependencies: phasebench-core
// ============================================================================

//! ## Overview
//! The examples are produced by the real merge and build pipeline from a
//! fixed two-phase step-up run, so they change whenever document
//! construction changes and `check` catches the drift.

// ============================================================================
// SECTION: Imports
// ============================================================================

use phasebench_core::BuildContext;
use phasebench_core::EnvironmentFingerprint;
use phasebench_core::ExecutionInfo;
use phasebench_core::ExtendedDocument;
use phasebench_core::LatencyPercentiles;
use phasebench_core::LoadProfile;
use phasebench_core::MetricsDocument;
use phasebench_core::PhaseResult;
use phasebench_core::ScenarioContract;
use phasebench_core::ScenarioInfo;
use phasebench_core::SocketErrors;
use phasebench_core::ToleranceMode;
use phasebench_core::VerificationLog;
use phasebench_core::runtime::build_extended_document;
use phasebench_core::runtime::build_metrics_document;
use phasebench_core::runtime::evaluate_rate;
use phasebench_core::runtime::merge_phases;

use crate::ContractError;

// ============================================================================
// SECTION: Example Run
// ============================================================================

/// Returns the example primary metrics document.
///
/// # Errors
///
/// Returns [`ContractError::Generation`] when the example cannot be built.
pub fn metrics_example() -> Result<MetricsDocument, ContractError> {
    let phases = example_phases();
    let merged = merge_phases(&phases).map_err(|err| ContractError::Generation(err.to_string()))?;
    let (scenario, execution, environment) = example_context()?;
    let context = BuildContext {
        scenario: &scenario,
        execution: &execution,
        environment: &environment,
    };
    Ok(build_metrics_document(&context, &merged.aggregate, &phases))
}

/// Returns the example extended document.
///
/// # Errors
///
/// Returns [`ContractError::Generation`] when the example cannot be built.
pub fn extended_example() -> Result<ExtendedDocument, ContractError> {
    let phases = example_phases();
    let merged = merge_phases(&phases).map_err(|err| ContractError::Generation(err.to_string()))?;
    let (scenario, execution, environment) = example_context()?;
    let context = BuildContext {
        scenario: &scenario,
        execution: &execution,
        environment: &environment,
    };
    let mut log = VerificationLog::new(execution.tolerance_mode);
    for phase in &phases {
        log.append(evaluate_rate(&phase.label, phase.target_rate, Some(phase.actual_rate)))
            .map_err(|err| ContractError::Generation(err.to_string()))?;
    }
    build_extended_document(&context, &merged, &phases, &log)
        .ok_or_else(|| ContractError::Generation(String::from("example run has one phase")))
}

/// Fixed two-phase measurements.
fn example_phases() -> Vec<PhaseResult> {
    vec![
        PhaseResult {
            label: String::from("step-1"),
            target_rate: 500,
            actual_rate: 498.7,
            duration_seconds: 60,
            request_count: 29_922,
            latency: LatencyPercentiles {
                p50: Some(1.42),
                p75: Some(1.97),
                p90: Some(2.61),
                p95: Some(3.12),
                p99: Some(5.84),
            },
            socket_errors: SocketErrors::default(),
            http_status: [(200, 29_910), (404, 12)].into_iter().collect(),
            retries: 0,
            cache: None,
        },
        PhaseResult {
            label: String::from("step-2"),
            target_rate: 1000,
            actual_rate: 996.1,
            duration_seconds: 60,
            request_count: 59_766,
            latency: LatencyPercentiles {
                p50: Some(1.88),
                p75: Some(2.54),
                p90: Some(3.47),
                p95: Some(4.20),
                p99: Some(8.93),
            },
            socket_errors: SocketErrors {
                connect: 0,
                read: 2,
                write: 0,
                timeout: 1,
            },
            http_status: [(200, 59_731), (404, 30), (503, 5)].into_iter().collect(),
            retries: 3,
            cache: None,
        },
    ]
}

/// Fixed scenario, execution, and environment blocks.
fn example_context()
-> Result<(ScenarioInfo, ExecutionInfo, EnvironmentFingerprint), ContractError> {
    let scenario = ScenarioInfo {
        name: String::from("items-put"),
        description: Some(String::from("Idempotent updates against the items API")),
        endpoint: String::from("PUT /items/{id}"),
        profile: LoadProfile::StepUp,
        contract: Some(ScenarioContract::PutUpdate),
    };
    let execution = ExecutionInfo {
        started_at: String::from("2026-01-15T09:30:00Z"),
        duration_seconds: 120,
        target_rate: 1000,
        min_rate: 100,
        threads: 4,
        connections: 64,
        tolerance_mode: ToleranceMode::Warn,
        phase_count: 2,
    };
    let environment = EnvironmentFingerprint::new("linux", "x86_64", 8, "wrk2 4.0.0", "bench-01")
        .map_err(|err| ContractError::Generation(err.to_string()))?;
    Ok((scenario, execution, environment))
}
