// crates/phasebench-core/src/core/failure.rs
// ============================================================================
// Module: Failure Taxonomy
// Description: Failure kinds shared by every Phasebench entry point.
// Purpose: Map each failure class to one stable process exit code.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Runtime errors carry a [`FailureKind`]. Only the binary entry point turns a
//! kind into a process exit code; library code never exits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Failure classes and their exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Invalid parameters, missing schema or threshold files. Raised before
    /// any phase executes.
    Configuration,
    /// A required input document or directory is absent or unreadable.
    MissingInput,
    /// Two result sets share no scenario.
    ComparisonAmbiguity,
    /// A metric crossed its error threshold.
    Regression,
    /// Strict-mode rate deviation or missing required percentiles.
    Measurement,
    /// Schema or invariant violations in a produced document.
    Recording,
    /// The external load generator failed or timed out.
    Generator,
}

impl FailureKind {
    /// Returns the process exit code for this failure kind.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Configuration | Self::MissingInput => 1,
            Self::ComparisonAmbiguity => 2,
            Self::Regression => 3,
            Self::Measurement => 4,
            Self::Recording => 5,
            Self::Generator => 6,
        }
    }

    /// Returns the stable label for the failure kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::MissingInput => "missing_input",
            Self::ComparisonAmbiguity => "comparison_ambiguity",
            Self::Regression => "regression",
            Self::Measurement => "measurement",
            Self::Recording => "recording",
            Self::Generator => "generator",
        }
    }
}
