// crates/phasebench-core/src/runtime/verifier.rs
// ============================================================================
// Module: Rate Verifier
// Description: Tiered tolerance check of achieved versus target rate.
// Purpose: Detect phases where the generator could not hold its rate.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`evaluate_rate`] classifies one phase:
//! - target `0` is skipped,
//! - targets below [`LOW_RATE_THRESHOLD`] use an absolute tolerance of
//!   [`ABSOLUTE_TOLERANCE_RPS`],
//! - everything else uses a relative tolerance of [`RELATIVE_TOLERANCE`].
//!
//! [`VerificationLog`] is the append-only audit trail of verdicts. It applies
//! the [`ToleranceMode`]: under `strict` a failed verdict is returned as a
//! [`RateViolation`] after it has been appended. The log is diagnostic only
//! and never drives scheduling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::measurement::count_as_f64;
use crate::core::profile::ToleranceMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Targets below this rate use the absolute tolerance.
pub const LOW_RATE_THRESHOLD: u64 = 10;
/// Absolute tolerance in requests per second.
pub const ABSOLUTE_TOLERANCE_RPS: f64 = 5.0;
/// Relative tolerance as a fraction of the target.
pub const RELATIVE_TOLERANCE: f64 = 0.05;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOutcome {
    /// Achieved rate within tolerance.
    Pass,
    /// Achieved rate outside tolerance.
    Fail,
    /// No target configured; not checked.
    Skip,
}

/// Tolerance rule applied to a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceRule {
    /// No rule applied.
    None,
    /// Absolute deviation limit.
    Absolute,
    /// Relative deviation limit.
    Relative,
}

/// Verdict for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateVerdict {
    /// Phase label.
    pub phase: String,
    /// Planned target rate.
    pub target_rate: u64,
    /// Achieved rate after normalization.
    pub achieved_rate: f64,
    /// Absolute deviation from the target.
    pub deviation: f64,
    /// Relative deviation in percent when the relative rule applied.
    pub deviation_percent: Option<f64>,
    /// Rule used for the check.
    pub rule: ToleranceRule,
    /// Check outcome.
    pub outcome: RateOutcome,
    /// True when a non-numeric achieved rate was replaced with zero.
    pub normalized: bool,
}

/// Failed verdict raised under strict tolerance.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", describe_violation(.verdict))]
pub struct RateViolation {
    /// The failed verdict.
    pub verdict: RateVerdict,
}

/// Renders the violation message for a failed verdict.
fn describe_violation(verdict: &RateVerdict) -> String {
    format!(
        "phase {} missed its target rate: achieved {:.2} rps vs target {} rps",
        verdict.phase, verdict.achieved_rate, verdict.target_rate
    )
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates achieved versus target rate for one phase.
///
/// A missing or non-finite achieved rate is treated as zero and flagged via
/// [`RateVerdict::normalized`].
#[must_use]
pub fn evaluate_rate(phase: &str, target_rate: u64, achieved: Option<f64>) -> RateVerdict {
    let (achieved_rate, normalized) = match achieved {
        Some(value) if value.is_finite() => (value, false),
        _ => (0.0, true),
    };
    let target = count_as_f64(target_rate);
    let deviation = (achieved_rate - target).abs();
    let (rule, outcome, deviation_percent) = if target_rate == 0 {
        (ToleranceRule::None, RateOutcome::Skip, None)
    } else if target_rate < LOW_RATE_THRESHOLD {
        let outcome =
            if deviation <= ABSOLUTE_TOLERANCE_RPS { RateOutcome::Pass } else { RateOutcome::Fail };
        (ToleranceRule::Absolute, outcome, None)
    } else {
        let ratio = deviation / target;
        let outcome =
            if ratio <= RELATIVE_TOLERANCE { RateOutcome::Pass } else { RateOutcome::Fail };
        (ToleranceRule::Relative, outcome, Some(ratio * 100.0))
    };
    RateVerdict {
        phase: phase.to_string(),
        target_rate,
        achieved_rate,
        deviation,
        deviation_percent,
        rule,
        outcome,
        normalized,
    }
}

// ============================================================================
// SECTION: Verification Log
// ============================================================================

/// Append-only, ordered log of rate verdicts for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationLog {
    /// Tolerance policy applied on append.
    mode: ToleranceMode,
    /// Verdicts in execution order.
    entries: Vec<RateVerdict>,
}

impl VerificationLog {
    /// Creates an empty log for `mode`.
    #[must_use]
    pub const fn new(mode: ToleranceMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
        }
    }

    /// Appends a verdict.
    ///
    /// # Errors
    ///
    /// Returns [`RateViolation`] when the verdict failed and the mode is
    /// strict. The verdict is appended either way.
    pub fn append(&mut self, verdict: RateVerdict) -> Result<(), RateViolation> {
        let strict_failure =
            self.mode == ToleranceMode::Strict && verdict.outcome == RateOutcome::Fail;
        self.entries.push(verdict.clone());
        if strict_failure {
            return Err(RateViolation {
                verdict,
            });
        }
        Ok(())
    }

    /// Returns the tolerance mode.
    #[must_use]
    pub const fn mode(&self) -> ToleranceMode {
        self.mode
    }

    /// Returns the verdicts in execution order.
    #[must_use]
    pub fn entries(&self) -> &[RateVerdict] {
        &self.entries
    }

    /// Returns the number of failed verdicts.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.outcome == RateOutcome::Fail).count()
    }
}
