// crates/phasebench-config/src/lib.rs
// ============================================================================
// Module: Phasebench Config Library
// Description: Canonical run configuration, thresholds, and examples.
// Purpose: Single source of truth for phasebench.toml semantics.
// Dependencies: phasebench-core, serde, toml
// ============================================================================

//! ## Overview
//! `phasebench-config` defines the run configuration model and the regression
//! threshold model. Both load with strict, fail-closed validation and convert
//! into the immutable values consumed by `phasebench-core`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;
pub mod thresholds;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
pub use examples::thresholds_toml_example;
pub use thresholds::ThresholdConfig;
pub use thresholds::default_thresholds;
pub use thresholds::load_thresholds;
