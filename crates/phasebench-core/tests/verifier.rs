// crates/phasebench-core/tests/verifier.rs
// ============================================================================
// Module: Rate Verifier Tests
// Description: Tiered tolerance and tolerance-mode behavior.
// ============================================================================
//! ## Overview
//! Validates absolute and relative tolerance bands, skip handling, and the
//! append-then-fail behavior of the strict verification log.

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

use phasebench_core::ToleranceMode;
use phasebench_core::VerificationLog;
use phasebench_core::runtime::RateOutcome;
use phasebench_core::runtime::ToleranceRule;
use phasebench_core::runtime::evaluate_rate;

#[test]
fn low_targets_use_absolute_tolerance() {
    let pass = evaluate_rate("steady", 5, Some(9.0));
    assert_eq!(pass.outcome, RateOutcome::Pass);
    assert_eq!(pass.rule, ToleranceRule::Absolute);
    assert_eq!(pass.deviation_percent, None);

    let fail = evaluate_rate("steady", 5, Some(11.0));
    assert_eq!(fail.outcome, RateOutcome::Fail);
    assert!((fail.deviation - 6.0).abs() < f64::EPSILON);
}

#[test]
fn higher_targets_use_relative_tolerance() {
    let pass = evaluate_rate("steady", 100, Some(104.0));
    assert_eq!(pass.outcome, RateOutcome::Pass);
    assert_eq!(pass.rule, ToleranceRule::Relative);

    let fail = evaluate_rate("steady", 100, Some(110.0));
    assert_eq!(fail.outcome, RateOutcome::Fail);
    let percent = fail.deviation_percent.unwrap();
    assert!((percent - 10.0).abs() < 1e-9);
}

#[test]
fn threshold_boundary_is_relative() {
    let verdict = evaluate_rate("step-1", 10, Some(10.4));
    assert_eq!(verdict.rule, ToleranceRule::Relative);
    assert_eq!(verdict.outcome, RateOutcome::Pass);
}

#[test]
fn zero_target_is_skipped_regardless_of_achieved() {
    for achieved in [Some(0.0), Some(1_000.0), None] {
        let verdict = evaluate_rate("steady", 0, achieved);
        assert_eq!(verdict.outcome, RateOutcome::Skip);
        assert_eq!(verdict.rule, ToleranceRule::None);
    }
}

#[test]
fn non_numeric_rate_normalizes_to_zero() {
    let verdict = evaluate_rate("steady", 100, Some(f64::NAN));
    assert!(verdict.normalized);
    assert!(verdict.achieved_rate.abs() < f64::EPSILON);
    assert_eq!(verdict.outcome, RateOutcome::Fail);

    let missing = evaluate_rate("steady", 3, None);
    assert!(missing.normalized);
    assert_eq!(missing.outcome, RateOutcome::Pass);
}

#[test]
fn warn_mode_logs_failures_and_continues() {
    let mut log = VerificationLog::new(ToleranceMode::Warn);
    log.append(evaluate_rate("step-1", 100, Some(50.0))).unwrap();
    log.append(evaluate_rate("step-2", 200, Some(199.0))).unwrap();
    assert_eq!(log.entries().len(), 2);
    assert_eq!(log.failure_count(), 1);
}

#[test]
fn strict_mode_appends_before_failing() {
    let mut log = VerificationLog::new(ToleranceMode::Strict);
    log.append(evaluate_rate("step-1", 100, Some(100.0))).unwrap();
    let violation = log.append(evaluate_rate("step-2", 200, Some(20.0))).unwrap_err();
    assert_eq!(violation.verdict.phase, "step-2");
    assert!(violation.to_string().contains("step-2"));
    assert_eq!(log.entries().len(), 2);
    assert_eq!(log.entries()[1].outcome, RateOutcome::Fail);
}
