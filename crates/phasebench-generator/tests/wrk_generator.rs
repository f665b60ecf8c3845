// crates/phasebench-generator/tests/wrk_generator.rs
// ============================================================================
// Module: wrk2 Adapter Tests
// Description: Command construction and phase execution against a fake binary.
// ============================================================================
//! ## Overview
//! A shell script stands in for the generator: it prints a canned report and
//! optionally writes the side-channel document named by the environment.

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

use phasebench_core::Concurrency;
use phasebench_core::Phase;
use phasebench_core::PhaseRequest;
use phasebench_core::TargetSpec;
use phasebench_generator::wrk::command_args;
use phasebench_generator::wrk::fallback_histogram;

fn target(script: Option<&str>) -> TargetSpec {
    TargetSpec {
        url: "http://127.0.0.1:8080".to_string(),
        script: script.map(str::to_string),
    }
}

#[test]
fn command_line_carries_rate_duration_and_script() {
    let phase = Phase::new("step-2", 500, 15);
    let target = target(Some("scripts/put_update.lua"));
    let request = PhaseRequest {
        index: 1,
        phase: &phase,
        target: &target,
        concurrency: Concurrency {
            threads: 4,
            connections: 64,
        },
    };
    assert_eq!(
        command_args(&request, 500),
        vec![
            "-t4",
            "-c64",
            "-d15s",
            "-R500",
            "--latency",
            "-s",
            "scripts/put_update.lua",
            "http://127.0.0.1:8080"
        ]
    );
}

#[test]
fn fallback_histogram_attributes_successes_to_200() {
    let histogram = fallback_histogram(100, 7);
    assert_eq!(histogram.count(200), 93);
    assert_eq!(histogram.total(), 93);
    assert!(fallback_histogram(5, 5).is_empty());
}

#[cfg(unix)]
mod process {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::path::PathBuf;

    use phasebench_core::Concurrency;
    use phasebench_core::GeneratorError;
    use phasebench_core::LoadGenerator;
    use phasebench_core::Phase;
    use phasebench_core::PhaseRequest;
    use phasebench_generator::WrkGenerator;
    use phasebench_generator::WrkOptions;

    use super::target;

    const REPORT: &str = include_str!("fixtures/wrk2_step.txt");

    /// Writes an executable fake generator and returns its path.
    fn fake_binary(dir: &Path, body: &str) -> PathBuf {
        let report = dir.join("report.txt");
        fs::write(&report, REPORT).unwrap();
        let path = dir.join("fake-wrk");
        let script = format!("#!/bin/sh\necho \"$@\" > \"{}/args\"\n{body}\n", dir.display())
            .replace("@REPORT@", &report.display().to_string());
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn run(
        generator: &mut WrkGenerator,
        phase: &Phase,
    ) -> Result<phasebench_core::RawArtifact, GeneratorError> {
        let target = target(None);
        generator.run_phase(&PhaseRequest {
            index: 0,
            phase,
            target: &target,
            concurrency: Concurrency::default(),
        })
    }

    #[test]
    fn side_channel_counts_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(
            dir.path(),
            concat!(
                "cat \"@REPORT@\"\n",
                "printf '{\"total_requests\": 2998, ",
                "\"http_status\": {\"200\": 2984, \"404\": 14}, ",
                "\"latency\": {\"p99_ms\": 3.9}}' ",
                "> \"$PHASEBENCH_METRICS_OUT\"",
            ),
        );
        let mut generator = WrkGenerator::new(WrkOptions::new(&binary, dir.path().join("raw")));
        let artifact = run(&mut generator, &Phase::new("steady", 100, 1)).unwrap();
        assert_eq!(artifact.requests_completed, 2998);
        assert_eq!(artifact.http_status.count(404), 14);
        assert_eq!(artifact.latency.p99, Some(3.9));
        assert_eq!(artifact.latency.p50, Some(1.18));
        assert_eq!(artifact.rps_achieved, Some(99.93));
        assert_eq!(artifact.applied_rate, 100);
        assert!(artifact.warnings.is_empty(), "{:?}", artifact.warnings);
        let raw = artifact.raw_output.unwrap();
        assert_eq!(fs::read_to_string(raw).unwrap(), REPORT);
    }

    #[test]
    fn missing_side_channel_falls_back_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path(), "cat \"@REPORT@\"");
        let mut generator = WrkGenerator::new(WrkOptions::new(&binary, dir.path().join("raw")));
        let artifact = run(&mut generator, &Phase::new("steady", 100, 1)).unwrap();
        assert_eq!(artifact.http_status.count(200), 2984);
        assert_eq!(artifact.http_status.total(), 2984);
        assert_eq!(artifact.warnings.len(), 2, "{:?}", artifact.warnings);
    }

    #[test]
    fn zero_target_uses_the_floor_rate() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path(), "cat \"@REPORT@\"");
        let mut options = WrkOptions::new(&binary, dir.path().join("raw"));
        options.side_channel = false;
        let mut generator = WrkGenerator::new(options);
        let artifact = run(&mut generator, &Phase::new("steady", 0, 1)).unwrap();
        assert_eq!(artifact.applied_rate, 100);
        assert!(artifact.warnings[0].contains("floor rate 100"), "{:?}", artifact.warnings);
        let args = fs::read_to_string(dir.path().join("args")).unwrap();
        assert!(args.contains("-R100"), "{args}");
    }

    #[test]
    fn failing_generator_reports_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path(), "echo boom >&2\nexit 3");
        let mut generator = WrkGenerator::new(WrkOptions::new(&binary, dir.path().join("raw")));
        match run(&mut generator, &Phase::new("steady", 100, 1)) {
            Err(GeneratorError::Exit {
                phase,
                stderr,
                ..
            }) => {
                assert_eq!(phase, "steady");
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn overrunning_generator_is_killed_at_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_binary(dir.path(), "exec sleep 30");
        let mut options = WrkOptions::new(&binary, dir.path().join("raw"));
        options.grace_seconds = 0;
        let mut generator = WrkGenerator::new(options);
        match run(&mut generator, &Phase::new("steady", 100, 1)) {
            Err(GeneratorError::Timeout {
                seconds,
                ..
            }) => assert_eq!(seconds, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut generator =
            WrkGenerator::new(WrkOptions::new(dir.path().join("absent"), dir.path().join("raw")));
        assert!(matches!(
            run(&mut generator, &Phase::new("steady", 100, 1)),
            Err(GeneratorError::Spawn { .. })
        ));
    }
}
