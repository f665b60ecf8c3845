// crates/phasebench-contract/src/lib.rs
// ============================================================================
// Module: Phasebench Contract Library
// Description: Versioned schemas, schema validators, and contract artifacts.
// Purpose: Single source of truth for the persisted document shapes.
// Dependencies: phasebench-core, phasebench-config, jsonschema, thiserror
// ============================================================================

//! ## Overview
//! The contract library owns the JSON schemas for the primary metrics
//! document (`3.0`) and the extended document (`1.0`), the schema validator
//! backends that enforce them, and the generator that writes schemas,
//! examples, and a digest manifest to disk.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod contract;
pub mod examples;
pub mod schemas;
pub mod types;
pub mod validator;

// ============================================================================
// SECTION: Errors
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised when generating contract artifacts.
///
/// # Invariants
/// - Variants carry human-readable context for diagnostics.
/// - [`ContractError::OutputPath`] always includes the offending path.
#[derive(Debug, Error)]
pub enum ContractError {
    /// IO failure while writing artifacts.
    #[error("io error: {0}")]
    Io(String),
    /// Serialization failure while rendering artifacts.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Contract generation failed.
    #[error("contract generation error: {0}")]
    Generation(String),
    /// Output path invalid or inaccessible.
    #[error("invalid output path: {0}")]
    OutputPath(PathBuf),
}

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use contract::ContractBuilder;
pub use types::ContractArtifact;
pub use types::ContractBundle;
pub use types::ContractManifest;
pub use types::ManifestArtifact;
pub use validator::DocumentKind;
pub use validator::JsonSchemaValidator;
pub use validator::ManualSchemaValidator;
pub use validator::SchemaBackend;
pub use validator::SchemaError;
pub use validator::SchemaValidator;
pub use validator::build_validator;
pub use validator::load_validator;
