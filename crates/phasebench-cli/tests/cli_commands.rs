// crates/phasebench-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Drives the phasebench binary end to end.
// Purpose: Pin command output and exit codes for every subcommand.
// Dependencies: phasebench-cli binary, phasebench-contract, tempfile
// ============================================================================

//! ## Overview
//! Each test writes its inputs into a temporary directory and runs the
//! compiled binary. Runs use a shell script in place of the load generator.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use phasebench_contract::examples::extended_example;
use phasebench_contract::examples::metrics_example;
use phasebench_core::MetricsDocument;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn phasebench_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_phasebench"))
}

fn phasebench(args: &[&str]) -> Output {
    Command::new(phasebench_bin()).args(args).env_remove("PHASEBENCH_LANG").output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_document(path: &Path, document: &MetricsDocument) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
}

fn document_named(name: &str) -> MetricsDocument {
    let mut document = metrics_example().unwrap();
    document.scenario.name = name.to_string();
    document
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn write_config(dir: &Path, binary: &str, target_rate: u64) -> PathBuf {
    let config = format!(
        r#"[scenario]
name = "items-get"
endpoint = "GET /items/{{id}}"

[target]
url = "http://127.0.0.1:8080"

[load]
profile = "steady"
target_rate = {target_rate}
duration_seconds = 1
threads = 2
connections = 10

[verification]
tolerance = "warn"

[generator]
binary = "{binary}"
grace_seconds = 5

[output]
dir = "{results}"
host_label = "ci"
"#,
        results = dir.join("results").display(),
    );
    let path = dir.join("phasebench.toml");
    fs::write(&path, config).unwrap();
    path
}

// ============================================================================
// SECTION: Top Level
// ============================================================================

#[test]
fn version_flag_prints_package_version() {
    let output = phasebench(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn catalan_output_carries_a_disclaimer() {
    let output = phasebench(&["--lang", "ca", "--version"]);
    assert!(output.status.success());
    assert!(!stderr(&output).is_empty());
}

// ============================================================================
// SECTION: Plan
// ============================================================================

#[test]
fn plan_lists_phases_without_running() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "/nonexistent/wrk2", 200);
    let output = phasebench(&["plan", "--config", path_str(&config)]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Scenario items-get"), "{text}");
    assert!(text.contains("200 req/s for 1s"), "{text}");
}

#[test]
fn plan_json_reflects_overrides() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "wrk2", 200);
    let output = phasebench(&[
        "plan",
        "--config",
        path_str(&config),
        "--quick",
        "--tolerance",
        "strict",
        "--json",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["scenario"], "items-get");
    assert_eq!(plan["tolerance"], "strict");
    assert_eq!(plan["total_duration_seconds"], 5);
    assert_eq!(plan["phases"].as_array().unwrap().len(), 1);
}

#[test]
fn plan_with_missing_config_exits_with_configuration_code() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let output = phasebench(&["plan", "--config", path_str(&missing)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load config"));
}

// ============================================================================
// SECTION: Validate
// ============================================================================

#[test]
fn validate_accepts_a_well_formed_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("items-put").join("metrics.json");
    write_document(&path, &metrics_example().unwrap());
    let output = phasebench(&["validate", path_str(&path)]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("1 passed, 0 failed"));
}

#[test]
fn validate_reports_invariant_violations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");
    let mut document = metrics_example().unwrap();
    document.results.requests += 1;
    write_document(&path, &document);
    let output = phasebench(&["validate", path_str(&path)]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("FAIL"), "{text}");
    assert!(text.contains("status_coverage"), "{text}");
}

#[test]
fn validate_with_no_documents_fails() {
    let dir = TempDir::new().unwrap();
    let output = phasebench(&["validate", "--all", path_str(dir.path())]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No metrics documents found"));
}

#[test]
fn validate_all_walks_the_tree_and_includes_extended_documents() {
    let dir = TempDir::new().unwrap();
    write_document(&dir.path().join("a").join("metrics.json"), &document_named("a"));
    write_document(&dir.path().join("b").join("metrics.json"), &document_named("b"));
    fs::write(
        dir.path().join("a").join("metrics-extended.json"),
        serde_json::to_vec(&extended_example().unwrap()).unwrap(),
    )
    .unwrap();
    fs::write(dir.path().join("b").join("phase-0-steady.metrics.json"), "{}").unwrap();
    let output = phasebench(&["validate", "--all", path_str(dir.path()), "--extended"]);
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("3 passed, 0 failed"));
}

#[test]
fn validate_with_manual_backend_flags_schema_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");
    fs::write(&path, r#"{"version": "1"}"#).unwrap();
    let output = phasebench(&["validate", path_str(&path), "--backend", "manual"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("FAIL"));
}

// ============================================================================
// SECTION: Compare
// ============================================================================

#[test]
fn compare_identical_results_succeeds() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    let new = dir.path().join("new");
    write_document(&base.join("items-put").join("metrics.json"), &metrics_example().unwrap());
    write_document(&new.join("items-put").join("metrics.json"), &metrics_example().unwrap());
    let output = phasebench(&["compare", path_str(&base), path_str(&new)]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("items-put: ok"), "{text}");
    assert!(text.contains("No regression detected."), "{text}");
}

#[test]
fn compare_flags_latency_regression() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.json");
    let new = dir.path().join("new.json");
    let baseline = metrics_example().unwrap();
    let mut slower = baseline.clone();
    slower.results.latency_ms.p99 = baseline.results.latency_ms.p99.map(|p99| p99 * 1.5);
    write_document(&base, &baseline);
    write_document(&new, &slower);
    let output = phasebench(&["compare", path_str(&base), path_str(&new)]);
    assert_eq!(output.status.code(), Some(3));
    let text = stdout(&output);
    assert!(text.contains("p99: +50.00% (error)"), "{text}");
    assert!(text.contains("Regression detected."), "{text}");
}

#[test]
fn compare_flags_a_lost_percentile() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.json");
    let new = dir.path().join("new.json");
    let baseline = metrics_example().unwrap();
    let mut degraded = baseline.clone();
    degraded.results.latency_ms.p99 = None;
    write_document(&base, &baseline);
    write_document(&new, &degraded);
    let output = phasebench(&["compare", path_str(&base), path_str(&new)]);
    assert_eq!(output.status.code(), Some(3));
    let text = stdout(&output);
    assert!(text.contains("p99: n/a (error)"), "{text}");
}

#[test]
fn compare_disjoint_results_is_ambiguous() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.json");
    let new = dir.path().join("new.json");
    write_document(&base, &document_named("alpha"));
    write_document(&new, &document_named("beta"));
    let output = phasebench(&["compare", path_str(&base), path_str(&new)]);
    assert_eq!(output.status.code(), Some(2));
    let text = stdout(&output);
    assert!(text.contains("Only in base: alpha"), "{text}");
    assert!(text.contains("Only in new: beta"), "{text}");
}

#[test]
fn compare_usage_errors_are_not_mistaken_for_ambiguity() {
    let missing_positional = phasebench(&["compare", "only-one-arg"]);
    assert_eq!(missing_positional.status.code(), Some(1));
    let unknown_flag = phasebench(&["compare", "a", "b", "--bogus-flag"]);
    assert_eq!(unknown_flag.status.code(), Some(1));
    assert!(stderr(&unknown_flag).contains("--bogus-flag"));
}

#[test]
fn help_exits_successfully() {
    let output = phasebench(&["compare", "--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("BASE"));
}

#[test]
fn compare_missing_input_exits_with_one() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.json");
    write_document(&base, &metrics_example().unwrap());
    let output = phasebench(&["compare", path_str(&base), path_str(&dir.path().join("absent"))]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("new"));
}

#[test]
fn compare_json_emits_outcome_and_deltas() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.json");
    let new = dir.path().join("new.json");
    write_document(&base, &metrics_example().unwrap());
    write_document(&new, &metrics_example().unwrap());
    let output = phasebench(&["compare", path_str(&base), path_str(&new), "--json"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outcome"], "success");
    assert_eq!(report["regression_detected"], false);
    assert_eq!(report["results"][0]["scenario"], "items-put");
}

#[test]
fn compare_honours_a_threshold_file() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.json");
    let new = dir.path().join("new.json");
    let baseline = metrics_example().unwrap();
    let mut slower = baseline.clone();
    slower.results.latency_ms.p99 = baseline.results.latency_ms.p99.map(|p99| p99 * 1.5);
    write_document(&base, &baseline);
    write_document(&new, &slower);
    let thresholds = dir.path().join("thresholds.toml");
    fs::write(&thresholds, "[p99]\nwarning = 60.0\nerror = 80.0\n").unwrap();
    let output = phasebench(&[
        "compare",
        path_str(&base),
        path_str(&new),
        "--threshold",
        path_str(&thresholds),
    ]);
    assert!(output.status.success(), "{}", stdout(&output));
}

// ============================================================================
// SECTION: Merge Metrics
// ============================================================================

#[test]
fn merge_metrics_writes_weighted_summary() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("one.json");
    let second = dir.path().join("two.json");
    fs::write(&first, r#"{"total_requests": 100, "http_status": {"200": 100}}"#).unwrap();
    fs::write(&second, r#"{"total_requests": 300, "http_status": {"200": 290, "500": 10}}"#)
        .unwrap();
    let broken = dir.path().join("broken.json");
    fs::write(&broken, "not json").unwrap();
    let merged = dir.path().join("out").join("merged.json");
    let output = phasebench(&[
        "merge-metrics",
        "--output",
        path_str(&merged),
        path_str(&first),
        path_str(&second),
        path_str(&broken),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Merged 2 of 3 documents"));
    assert!(stderr(&output).contains("Warning"));
    let document: Value = serde_json::from_slice(&fs::read(&merged).unwrap()).unwrap();
    assert_eq!(document["total_requests"], 400);
}

#[test]
fn merge_metrics_without_valid_inputs_fails() {
    let dir = TempDir::new().unwrap();
    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{}").unwrap();
    let merged = dir.path().join("merged.json");
    let output = phasebench(&["merge-metrics", "--output", path_str(&merged), path_str(&broken)]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!merged.exists());
}

// ============================================================================
// SECTION: Run
// ============================================================================

#[cfg(unix)]
mod run {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::path::PathBuf;

    use serde_json::Value;
    use tempfile::TempDir;

    use super::path_str;
    use super::phasebench;
    use super::stderr;
    use super::stdout;
    use super::write_config;

    const REPORT: &str = include_str!("fixtures/wrk2_step.txt");

    /// Writes a fake generator that prints the canned report and a
    /// side-channel document agreeing with it.
    fn fake_generator(dir: &Path) -> PathBuf {
        let report = dir.join("report.txt");
        fs::write(&report, REPORT).unwrap();
        let path = dir.join("fake-wrk");
        let script = format!(
            concat!(
                "#!/bin/sh\n",
                "cat \"{}\"\n",
                "printf '{{\"total_requests\": 2998, ",
                "\"http_status\": {{\"200\": 2984, \"404\": 14}}}}' ",
                "> \"$PHASEBENCH_METRICS_OUT\"\n",
            ),
            report.display()
        );
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn run_writes_a_valid_metrics_document() {
        let dir = TempDir::new().unwrap();
        let binary = fake_generator(dir.path());
        let config = write_config(dir.path(), path_str(&binary), 100);
        let output = phasebench(&["run", "--config", path_str(&config)]);
        assert!(
            output.status.success(),
            "stdout: {}\nstderr: {}",
            stdout(&output),
            stderr(&output)
        );

        let scenario_dir = dir.path().join("results").join("items-get");
        let document: Value =
            serde_json::from_slice(&fs::read(scenario_dir.join("metrics.json")).unwrap()).unwrap();
        assert_eq!(document["results"]["requests"], 2998);
        assert_eq!(document["status"]["outcome"], "passed");
        assert!(!scenario_dir.join("metrics-extended.json").exists());
        assert!(scenario_dir.join("raw").join("phase-0-steady.txt").exists());

        let validate = phasebench(&["validate", path_str(&scenario_dir.join("metrics.json"))]);
        assert!(validate.status.success(), "{}", stdout(&validate));
    }

    #[test]
    fn warn_mode_rate_miss_still_records_the_run() {
        let dir = TempDir::new().unwrap();
        let binary = fake_generator(dir.path());
        let config = write_config(dir.path(), path_str(&binary), 1000);
        let output = phasebench(&["run", "--config", path_str(&config)]);
        assert!(output.status.success(), "{}", stderr(&output));
        let metrics = dir.path().join("results").join("items-get").join("metrics.json");
        assert!(metrics.exists());
    }

    #[test]
    fn strict_run_aborts_on_the_first_rate_miss() {
        let dir = TempDir::new().unwrap();
        let binary = fake_generator(dir.path());
        let config = write_config(dir.path(), path_str(&binary), 1000);
        let output =
            phasebench(&["run", "--config", path_str(&config), "--tolerance", "strict"]);
        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("measurement"), "{}", stderr(&output));
    }

    #[test]
    fn missing_generator_exits_with_generator_code() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), path_str(&dir.path().join("absent")), 100);
        let output = phasebench(&["run", "--config", path_str(&config)]);
        assert_eq!(output.status.code(), Some(6), "{}", stderr(&output));
    }
}
