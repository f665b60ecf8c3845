// crates/phasebench-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Builders for phase results and metrics documents.
// ============================================================================

#![allow(dead_code, reason = "Shared fixtures are not used by every test binary.")]

use phasebench_core::BuildContext;
use phasebench_core::EnvironmentFingerprint;
use phasebench_core::ExecutionInfo;
use phasebench_core::LatencyPercentiles;
use phasebench_core::LoadProfile;
use phasebench_core::MetricsDocument;
use phasebench_core::PhaseResult;
use phasebench_core::ScenarioInfo;
use phasebench_core::SocketErrors;
use phasebench_core::StatusHistogram;
use phasebench_core::ToleranceMode;
use phasebench_core::runtime::build_metrics_document;
use phasebench_core::runtime::merge_phases;

/// Returns latency percentiles with every value set from `base`.
pub fn latency(base: f64, p99: f64) -> LatencyPercentiles {
    LatencyPercentiles {
        p50: Some(base),
        p75: Some(base * 1.5),
        p90: Some(base * 2.0),
        p95: Some(base * 2.5),
        p99: Some(p99),
    }
}

/// Builds a phase result whose histogram answers every request with 200.
pub fn phase(
    label: &str,
    target: u64,
    duration: u64,
    requests: u64,
    rps: f64,
    p99: f64,
) -> PhaseResult {
    PhaseResult {
        label: label.to_string(),
        target_rate: target,
        actual_rate: rps,
        duration_seconds: duration,
        request_count: requests,
        latency: latency(p99 / 4.0, p99),
        socket_errors: SocketErrors::default(),
        http_status: [(200, requests)].into_iter().collect(),
        retries: 0,
        cache: None,
    }
}

pub fn scenario(name: &str) -> ScenarioInfo {
    ScenarioInfo {
        name: name.to_string(),
        description: None,
        endpoint: "http://127.0.0.1:8080/items".to_string(),
        profile: LoadProfile::Steady,
        contract: None,
    }
}

pub fn execution() -> ExecutionInfo {
    ExecutionInfo {
        started_at: "2026-01-01T00:00:00Z".to_string(),
        duration_seconds: 60,
        target_rate: 100,
        min_rate: 10,
        threads: 2,
        connections: 10,
        tolerance_mode: ToleranceMode::Warn,
        phase_count: 1,
    }
}

pub fn environment() -> EnvironmentFingerprint {
    EnvironmentFingerprint::new("linux", "x86_64", 8, "wrk2 test", "bench-host").unwrap()
}

/// Merges `phases` and builds the primary document for scenario `name`.
pub fn document(name: &str, phases: &[PhaseResult]) -> MetricsDocument {
    let merged = merge_phases(phases).unwrap();
    let scenario = scenario(name);
    let execution = execution();
    let environment = environment();
    let context = BuildContext {
        scenario: &scenario,
        execution: &execution,
        environment: &environment,
    };
    build_metrics_document(&context, &merged.aggregate, phases)
}

/// Builds a histogram from `(status, count)` pairs.
pub fn histogram(pairs: &[(u16, u64)]) -> StatusHistogram {
    pairs.iter().copied().collect()
}
