// crates/phasebench-core/src/core/settings.rs
// ============================================================================
// Module: Run Settings
// Description: Immutable run settings passed explicitly through the engine.
// Purpose: Replace ambient environment lookups with one validated value.
// Dependencies: serde, crate::core::{document, profile}
// ============================================================================

//! ## Overview
//! [`RunSettings`] is built once at the entry boundary (usually by
//! `phasebench-config`) and handed by reference to the planner, the
//! generator adapter, and the metrics builder. No engine component reads
//! process-global state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::document::ScenarioInfo;
use crate::core::profile::LoadProfile;
use crate::core::profile::ProfileParams;
use crate::core::profile::ToleranceMode;

// ============================================================================
// SECTION: Target
// ============================================================================

/// Target identity handed to the load generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Base URL of the system under test.
    pub url: String,
    /// Optional request script passed to the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// Generator concurrency parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Concurrency {
    /// Generator threads.
    pub threads: u32,
    /// Open connections.
    pub connections: u32,
}

impl Default for Concurrency {
    fn default() -> Self {
        Self {
            threads: 2,
            connections: 10,
        }
    }
}

// ============================================================================
// SECTION: Profiling
// ============================================================================

/// Which phase a profiler session should wrap.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTarget {
    /// The last planned phase (peak or steady state).
    #[default]
    LastPhase,
    /// The phase with the given label.
    Label(String),
}

// ============================================================================
// SECTION: Run Settings
// ============================================================================

/// Complete, validated settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    /// Scenario identity recorded in the document.
    pub scenario: ScenarioInfo,
    /// Load profile.
    pub profile: LoadProfile,
    /// Profile parameters.
    pub params: ProfileParams,
    /// Rate tolerance policy.
    pub tolerance: ToleranceMode,
    /// Target identity.
    pub target: TargetSpec,
    /// Generator concurrency.
    pub concurrency: Concurrency,
    /// Phase to profile, when profiling is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_phase: Option<ProfileTarget>,
    /// Host label recorded in the environment fingerprint.
    pub host_label: String,
}
