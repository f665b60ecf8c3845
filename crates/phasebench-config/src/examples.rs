// crates/phasebench-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for contract artifacts and tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical examples for phasebench configuration. Outputs are deterministic
//! and must always pass validation.

/// Returns a canonical example `phasebench.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[scenario]
name = "items-put"
description = "Idempotent updates against the items API"
endpoint = "PUT /items/{id}"
contract = "put_update"

[target]
url = "http://127.0.0.1:8080"
script = "scripts/put_update.lua"

[load]
profile = "step_up"
target_rate = 1000
min_rate = 100
duration_seconds = 120
step_count = 4
threads = 4
connections = 64

[verification]
tolerance = "warn"

[generator]
binary = "wrk2"
grace_seconds = 30
floor_rate = 100
side_channel = true

[output]
dir = "results"
host_label = "bench-01"
# event_log = "results/events.jsonl"

[profiling]
enabled = false
# phase = "step-4"
binary = "perf"
frequency = 99
"#,
    )
}

/// Returns a canonical example threshold file (TOML).
#[must_use]
pub fn thresholds_toml_example() -> String {
    String::from(
        r"[p90]
warning = 10.0
error = 20.0

[p99]
warning = 10.0
error = 20.0

[error_rate]
warning = 0.5
error = 1.0

[rps_degradation_percent]
warning = 5.0
error = 10.0
",
    )
}
