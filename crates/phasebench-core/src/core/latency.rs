// crates/phasebench-core/src/core/latency.rs
// ============================================================================
// Module: Latency Values
// Description: Typed latency parsed once from unit-suffixed generator text.
// Purpose: Give every downstream stage a single millisecond representation.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Load generators report latency as unit-suffixed text (`812.00us`,
//! `1.27ms`, `2.01s`). [`LatencyMs::parse`] converts that text exactly once at
//! the adapter boundary; the rest of the engine only sees milliseconds.
//! A bare number without a unit is read as milliseconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A measured latency in milliseconds.
///
/// # Invariants
/// - The value is finite and non-negative. Zero is representable because the
///   generator can print it; the metrics builder treats it as unavailable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LatencyMs(f64);

/// Errors raised while parsing latency text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatencyParseError {
    /// Input was empty.
    #[error("latency value is empty")]
    Empty,
    /// The numeric part could not be parsed.
    #[error("latency value `{0}` is not numeric")]
    NotNumeric(String),
    /// The unit suffix is unknown.
    #[error("latency value `{value}` has unknown unit `{unit}`")]
    UnknownUnit {
        /// Full input text.
        value: String,
        /// Unrecognized suffix.
        unit: String,
    },
    /// The value is negative, NaN, or infinite.
    #[error("latency value `{0}` is out of range")]
    OutOfRange(String),
}

// ============================================================================
// SECTION: Construction
// ============================================================================

impl LatencyMs {
    /// Creates a latency from milliseconds.
    ///
    /// Returns `None` for negative or non-finite values.
    #[must_use]
    pub fn from_millis(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 { Some(Self(value)) } else { None }
    }

    /// Returns the latency in milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> f64 {
        self.0
    }

    /// Parses unit-suffixed latency text into milliseconds.
    ///
    /// Accepted units: `us`, `ms`, `s`, `m`, `h`. No unit means milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`LatencyParseError`] when the text is empty, non-numeric,
    /// carries an unknown unit, or is out of range.
    pub fn parse(text: &str) -> Result<Self, LatencyParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LatencyParseError::Empty);
        }
        let split = trimmed
            .find(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+'))
            .unwrap_or(trimmed.len());
        let (number, unit) = trimmed.split_at(split);
        let value: f64 =
            number.parse().map_err(|_| LatencyParseError::NotNumeric(trimmed.to_string()))?;
        let millis = match unit.trim() {
            "" | "ms" => value,
            "us" | "µs" => value / 1_000.0,
            "s" => value * 1_000.0,
            "m" => value * 60_000.0,
            "h" => value * 3_600_000.0,
            other => {
                return Err(LatencyParseError::UnknownUnit {
                    value: trimmed.to_string(),
                    unit: other.to_string(),
                });
            }
        };
        Self::from_millis(millis)
            .ok_or_else(|| LatencyParseError::OutOfRange(trimmed.to_string()))
    }
}

impl FromStr for LatencyMs {
    type Err = LatencyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<f64> for LatencyMs {
    type Error = LatencyParseError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_millis(value).ok_or_else(|| LatencyParseError::OutOfRange(value.to_string()))
    }
}

impl From<LatencyMs> for f64 {
    fn from(value: LatencyMs) -> Self {
        value.0
    }
}

impl fmt::Display for LatencyMs {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.3}ms", self.0)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
