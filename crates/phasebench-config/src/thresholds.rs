// crates/phasebench-config/src/thresholds.rs
// ============================================================================
// Module: Regression Thresholds
// Description: Threshold file loading with documented per-metric defaults.
// Purpose: Turn an optional TOML or JSON threshold file into a ThresholdSet.
// Dependencies: phasebench-core, serde, serde_json, toml
// ============================================================================

//! ## Overview
//! A threshold file names up to four metrics, each with a `warning` and an
//! `error` bound. A metric table that omits one bound takes the documented
//! default for that bound; a metric absent from the file stays unchecked.
//! The format is chosen by extension: `.json` is JSON, anything else TOML.
//!
//! | Metric | Warning | Error | Unit |
//! |---|---|---|---|
//! | `p90` | 10 | 20 | percent |
//! | `p99` | 10 | 20 | percent |
//! | `error_rate` | 0.5 | 1.0 | percentage points |
//! | `rps_degradation_percent` | 5 | 10 | percent |

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use phasebench_core::MetricThreshold;
use phasebench_core::ThresholdSet;
use serde::Deserialize;

use crate::config::ConfigError;
use crate::config::MAX_CONFIG_FILE_SIZE;
use crate::config::validate_path;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default p90 bounds.
const P90_DEFAULT: MetricThreshold = MetricThreshold {
    warning: 10.0,
    error: 20.0,
};
/// Default p99 bounds.
const P99_DEFAULT: MetricThreshold = MetricThreshold {
    warning: 10.0,
    error: 20.0,
};
/// Default error-rate bounds.
const ERROR_RATE_DEFAULT: MetricThreshold = MetricThreshold {
    warning: 0.5,
    error: 1.0,
};
/// Default throughput bounds.
const RPS_DEFAULT: MetricThreshold = MetricThreshold {
    warning: 5.0,
    error: 10.0,
};

/// Returns the documented defaults for every metric.
#[must_use]
pub const fn default_thresholds() -> ThresholdSet {
    ThresholdSet {
        p90: Some(P90_DEFAULT),
        p99: Some(P99_DEFAULT),
        error_rate: Some(ERROR_RATE_DEFAULT),
        rps_degradation_percent: Some(RPS_DEFAULT),
    }
}

// ============================================================================
// SECTION: File Model
// ============================================================================

/// Threshold file contents before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdConfig {
    /// p90 latency bounds.
    #[serde(default)]
    pub p90: Option<PartialThreshold>,
    /// p99 latency bounds.
    #[serde(default)]
    pub p99: Option<PartialThreshold>,
    /// Error-rate bounds.
    #[serde(default)]
    pub error_rate: Option<PartialThreshold>,
    /// Throughput bounds.
    #[serde(default)]
    pub rps_degradation_percent: Option<PartialThreshold>,
}

/// One metric table; missing bounds take the metric default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialThreshold {
    /// Warning bound.
    #[serde(default)]
    pub warning: Option<f64>,
    /// Error bound.
    #[serde(default)]
    pub error: Option<f64>,
}

impl ThresholdConfig {
    /// Parses threshold text as JSON or TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input.
    pub fn parse(content: &str, json: bool) -> Result<Self, ConfigError> {
        if json {
            serde_json::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
        } else {
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
        }
    }

    /// Applies defaults and validates every configured metric.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a bound is negative, not finite,
    /// or a warning bound exceeds its error bound.
    pub fn resolve(&self) -> Result<ThresholdSet, ConfigError> {
        Ok(ThresholdSet {
            p90: resolve_metric("p90", self.p90, P90_DEFAULT)?,
            p99: resolve_metric("p99", self.p99, P99_DEFAULT)?,
            error_rate: resolve_metric("error_rate", self.error_rate, ERROR_RATE_DEFAULT)?,
            rps_degradation_percent: resolve_metric(
                "rps_degradation_percent",
                self.rps_degradation_percent,
                RPS_DEFAULT,
            )?,
        })
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads a threshold file; a missing file is a configuration error.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is missing, unreadable, malformed,
/// or invalid.
pub fn load_thresholds(path: &Path) -> Result<ThresholdSet, ConfigError> {
    validate_path(path)?;
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("threshold file {}: {err}", path.display())))?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::Invalid("threshold file exceeds size limit".to_string()));
    }
    let content = std::str::from_utf8(&bytes)
        .map_err(|_| ConfigError::Invalid("threshold file must be utf-8".to_string()))?;
    let json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    ThresholdConfig::parse(content, json)?.resolve()
}

/// Fills missing bounds and checks ordering.
fn resolve_metric(
    name: &str,
    partial: Option<PartialThreshold>,
    default: MetricThreshold,
) -> Result<Option<MetricThreshold>, ConfigError> {
    let Some(partial) = partial else {
        return Ok(None);
    };
    let threshold = MetricThreshold {
        warning: partial.warning.unwrap_or(default.warning),
        error: partial.error.unwrap_or(default.error),
    };
    for (bound, value) in [("warning", threshold.warning), ("error", threshold.error)] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "{name}.{bound} must be a non-negative number (got {value})"
            )));
        }
    }
    if threshold.warning > threshold.error {
        return Err(ConfigError::Invalid(format!(
            "{name}.warning ({}) must not exceed {name}.error ({})",
            threshold.warning, threshold.error
        )));
    }
    Ok(Some(threshold))
}
