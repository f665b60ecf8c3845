// crates/phasebench-core/src/runtime/planner.rs
// ============================================================================
// Module: Phase Planner
// Description: Decomposes a load profile into an ordered phase sequence.
// Purpose: Produce phases whose durations sum exactly to the configured total.
// Dependencies: crate::core::profile, thiserror
// ============================================================================

//! ## Overview
//! [`plan_phases`] is a pure function from a [`LoadProfile`] and its
//! [`ProfileParams`] to an ordered list of [`Phase`] values.
//!
//! ## Invariants
//! - The sum of planned durations equals `total_duration` exactly.
//! - Zero-length phases are omitted, never emitted.
//! - Invalid parameters are rejected before any phase is produced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::profile::LoadProfile;
use crate::core::profile::Phase;
use crate::core::profile::ProfileParams;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors detected while planning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Total duration is zero.
    #[error("total_duration must be greater than zero")]
    ZeroDuration,
    /// Step-up profile configured with zero steps.
    #[error("step_up requires step_count >= 1")]
    ZeroSteps,
    /// Step-up floor rate exceeds its target rate.
    #[error("step_up requires min_rate ({min_rate}) <= target_rate ({target_rate})")]
    MinAboveTarget {
        /// Configured floor rate.
        min_rate: u64,
        /// Configured target rate.
        target_rate: u64,
    },
    /// Burst multiplier is not a finite value of at least one.
    #[error("burst_multiplier must be a finite value >= 1 (got {0})")]
    InvalidMultiplier(f64),
    /// Burst duration is zero.
    #[error("burst_duration must be greater than zero")]
    ZeroBurstDuration,
    /// Burst interval leaves no normal phase.
    #[error(
        "burst_interval ({interval}s) must exceed burst_duration ({duration}s) to leave a normal \
         phase"
    )]
    IntervalNotAfterBurst {
        /// Configured cycle length.
        interval: u64,
        /// Configured burst length.
        duration: u64,
    },
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Plans the ordered phases for `profile`.
///
/// # Errors
///
/// Returns [`PlanError`] when the parameters are invalid for the profile.
pub fn plan_phases(profile: LoadProfile, params: &ProfileParams) -> Result<Vec<Phase>, PlanError> {
    if params.total_duration == 0 {
        return Err(PlanError::ZeroDuration);
    }
    match profile {
        LoadProfile::Steady => {
            Ok(vec![Phase::new("steady", params.target_rate, params.total_duration)])
        }
        LoadProfile::StepUp => plan_step_up(params),
        LoadProfile::RampUpDown => Ok(plan_ramp_up_down(params)),
        LoadProfile::Burst => plan_burst(params),
    }
}

/// Returns the sum of phase durations.
#[must_use]
pub fn planned_duration(phases: &[Phase]) -> u64 {
    phases.iter().fold(0_u64, |acc, phase| acc.saturating_add(phase.duration_seconds))
}

// ============================================================================
// SECTION: Step Up
// ============================================================================

/// Plans `step_count` steps from `min_rate` toward `target_rate`.
fn plan_step_up(params: &ProfileParams) -> Result<Vec<Phase>, PlanError> {
    let steps = u64::from(params.step_count);
    if steps == 0 {
        return Err(PlanError::ZeroSteps);
    }
    if params.min_rate > params.target_rate {
        return Err(PlanError::MinAboveTarget {
            min_rate: params.min_rate,
            target_rate: params.target_rate,
        });
    }
    let span = params.target_rate - params.min_rate;
    let step_length = params.total_duration / steps;
    let remainder = params.total_duration % steps;
    let mut phases = Vec::new();
    for step in 1 ..= steps {
        let rate = if step == steps {
            params.target_rate
        } else {
            params.min_rate.saturating_add(scaled_round_half_up(span, step, steps))
        };
        let duration = if step == steps { step_length + remainder } else { step_length };
        push_phase(&mut phases, format!("step-{step}"), rate, duration);
    }
    Ok(phases)
}

// ============================================================================
// SECTION: Ramp Up / Down
// ============================================================================

/// Plans ramp-up, sustain, and ramp-down phases.
fn plan_ramp_up_down(params: &ProfileParams) -> Vec<Phase> {
    let total = params.total_duration;
    let requested = params.ramp_up_seconds.saturating_add(params.ramp_down_seconds);
    let (ramp_up, ramp_down) = if requested > total {
        let up = scaled_floor(params.ramp_up_seconds, total, requested);
        (up, total - up)
    } else {
        (params.ramp_up_seconds, params.ramp_down_seconds)
    };
    let sustain = total - ramp_up - ramp_down;
    let mut phases = Vec::new();
    push_phase(&mut phases, "ramp-up".to_string(), params.target_rate, ramp_up);
    push_phase(&mut phases, "sustain".to_string(), params.target_rate, sustain);
    push_phase(&mut phases, "ramp-down".to_string(), params.min_rate, ramp_down);
    phases
}

// ============================================================================
// SECTION: Burst
// ============================================================================

/// Plans alternating burst and normal phases.
fn plan_burst(params: &ProfileParams) -> Result<Vec<Phase>, PlanError> {
    let multiplier = params.burst_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(PlanError::InvalidMultiplier(multiplier));
    }
    if params.burst_duration == 0 {
        return Err(PlanError::ZeroBurstDuration);
    }
    if params.burst_interval <= params.burst_duration {
        return Err(PlanError::IntervalNotAfterBurst {
            interval: params.burst_interval,
            duration: params.burst_duration,
        });
    }
    let base_rate = params.min_rate.max(divide_rate(params.target_rate, multiplier));
    let total = params.total_duration;
    let full_cycles = total / params.burst_interval;
    let cycle = if full_cycles == 0 {
        let burst = scaled_floor(params.burst_duration, total, params.burst_interval);
        BurstCycle {
            count: 1,
            burst,
            normal: total - burst,
            leftover: 0,
        }
    } else {
        BurstCycle {
            count: full_cycles,
            burst: params.burst_duration,
            normal: params.burst_interval - params.burst_duration,
            leftover: total - full_cycles * params.burst_interval,
        }
    };
    Ok(burst_cycles(&cycle, params.target_rate, base_rate))
}

/// Shape of the burst cycles to emit.
struct BurstCycle {
    /// Number of burst+normal pairs.
    count: u64,
    /// Burst length per cycle.
    burst: u64,
    /// Normal length per cycle.
    normal: u64,
    /// Extra seconds appended to the final normal phase.
    leftover: u64,
}

/// Emits `cycle.count` burst+normal pairs.
fn burst_cycles(cycle: &BurstCycle, burst_rate: u64, base_rate: u64) -> Vec<Phase> {
    let mut phases = Vec::new();
    for index in 1 ..= cycle.count {
        let normal =
            if index == cycle.count { cycle.normal + cycle.leftover } else { cycle.normal };
        push_phase(&mut phases, format!("burst-{index}"), burst_rate, cycle.burst);
        push_phase(&mut phases, format!("normal-{index}"), base_rate, normal);
    }
    phases
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends a phase unless it has zero length.
fn push_phase(phases: &mut Vec<Phase>, label: String, rate: u64, duration: u64) {
    if duration > 0 {
        phases.push(Phase::new(label, rate, duration));
    }
}

/// Computes `round(value * numerator / denominator)` with halves rounded up.
fn scaled_round_half_up(value: u64, numerator: u64, denominator: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(numerator) * 2 + u128::from(denominator);
    let rounded = scaled / (u128::from(denominator) * 2);
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Computes `floor(value * numerator / denominator)` without overflow.
fn scaled_floor(value: u64, numerator: u64, denominator: u64) -> u64 {
    let scaled = u128::from(value) * u128::from(numerator) / u128::from(denominator.max(1));
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Computes `floor(rate / multiplier)` for a finite multiplier of at least one.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "The quotient is non-negative and bounded by the u64 input rate."
)]
fn divide_rate(rate: u64, multiplier: f64) -> u64 {
    (rate as f64 / multiplier).floor() as u64
}

// ============================================================================
// SECTION: Tests
// ============================================================================
