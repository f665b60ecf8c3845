// crates/phasebench-core/src/core/profile.rs
// ============================================================================
// Module: Load Profiles
// Description: Load profile selection, profile parameters, and planned phases.
// Purpose: Describe how a benchmark run is decomposed into rate-controlled phases.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`LoadProfile`] plus its [`ProfileParams`] is the only input to the phase
//! planner. Every planned [`Phase`] is an immutable value: the runner reads it,
//! the generator executes it, and nothing rewrites it afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Load Profile
// ============================================================================

/// Policy that decomposes a run into phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadProfile {
    /// One phase at the target rate.
    #[default]
    #[serde(alias = "constant")]
    Steady,
    /// Rates climbing from `min_rate` to `target_rate` in equal steps.
    StepUp,
    /// Ramp-up, sustain, then ramp-down.
    RampUpDown,
    /// Alternating burst and normal phases.
    Burst,
}

impl LoadProfile {
    /// Returns the stable snake-case label for the profile.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Steady => "steady",
            Self::StepUp => "step_up",
            Self::RampUpDown => "ramp_up_down",
            Self::Burst => "burst",
        }
    }
}

impl fmt::Display for LoadProfile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when a profile name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown load profile `{0}` (expected steady, step_up, ramp_up_down, or burst)")]
pub struct UnknownProfile(pub String);

impl FromStr for LoadProfile {
    type Err = UnknownProfile;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "steady" | "constant" | "flat" => Ok(Self::Steady),
            "step_up" | "stepup" | "stress" => Ok(Self::StepUp),
            "ramp_up_down" | "rampupdown" | "ramp" => Ok(Self::RampUpDown),
            "burst" | "spike" => Ok(Self::Burst),
            _ => Err(UnknownProfile(value.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Profile Parameters
// ============================================================================

/// Numeric parameters consumed by the phase planner.
///
/// Rates are requests per second, durations are whole seconds. Parameters that
/// a profile does not use are ignored by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileParams {
    /// Peak or steady target rate.
    pub target_rate: u64,
    /// Floor rate for step-up, ramp-down, and burst base phases.
    pub min_rate: u64,
    /// Total run duration in seconds.
    pub total_duration: u64,
    /// Number of step-up steps.
    pub step_count: u32,
    /// Ramp-up phase length in seconds.
    pub ramp_up_seconds: u64,
    /// Ramp-down phase length in seconds.
    pub ramp_down_seconds: u64,
    /// Length of one burst cycle (burst plus normal) in seconds.
    pub burst_interval: u64,
    /// Length of the burst part of a cycle in seconds.
    pub burst_duration: u64,
    /// Ratio between burst rate and base rate.
    pub burst_multiplier: f64,
}

impl ProfileParams {
    /// Returns parameters for a single steady phase.
    #[must_use]
    pub fn steady(target_rate: u64, total_duration: u64) -> Self {
        Self {
            target_rate,
            total_duration,
            ..Self::default()
        }
    }
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            target_rate: 0,
            min_rate: 10,
            total_duration: 60,
            step_count: 4,
            ramp_up_seconds: 10,
            ramp_down_seconds: 10,
            burst_interval: 20,
            burst_duration: 5,
            burst_multiplier: 3.0,
        }
    }
}

// ============================================================================
// SECTION: Phase
// ============================================================================

/// One contiguous generator execution at a fixed rate for a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Phase {
    /// Stable phase label (for example `step-2` or `burst-1`).
    pub label: String,
    /// Target rate in requests per second.
    pub target_rate: u64,
    /// Phase length in seconds.
    pub duration_seconds: u64,
}

impl Phase {
    /// Creates a new phase.
    #[must_use]
    pub fn new(label: impl Into<String>, target_rate: u64, duration_seconds: u64) -> Self {
        Self {
            label: label.into(),
            target_rate,
            duration_seconds,
        }
    }
}

// ============================================================================
// SECTION: Tolerance Mode
// ============================================================================

/// Policy applied when a phase misses its target rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    /// A failed verdict aborts the run.
    Strict,
    /// A failed verdict is logged and the run continues.
    #[default]
    Warn,
}

impl ToleranceMode {
    /// Returns the stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Warn => "warn",
        }
    }
}

impl FromStr for ToleranceMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "warn" => Ok(Self::Warn),
            other => Err(format!("unknown tolerance mode `{other}` (expected strict or warn)")),
        }
    }
}
