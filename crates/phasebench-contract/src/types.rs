// crates/phasebench-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Manifest and bundle shapes for contract artifacts.
// Purpose: Describe generated artifacts and their digests.
// Dependencies: phasebench-core, serde
// ============================================================================

//! ## Overview
//! The manifest written to `index.json` lists every generated artifact with
//! its content type and SHA-256 digest, ordered by path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use phasebench_core::HashAlgorithm;
use phasebench_core::HashDigest;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Manifest Types
// ============================================================================

/// Manifest describing the generated contract artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractManifest {
    /// Contract version identifier (matches the crate version).
    pub contract_version: String,
    /// Hash algorithm used for artifact digests.
    pub hash_algorithm: HashAlgorithm,
    /// Artifacts included in the bundle, ordered by path.
    pub artifacts: Vec<ManifestArtifact>,
}

/// Manifest entry describing a single artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestArtifact {
    /// Relative artifact path under the output directory.
    pub path: String,
    /// Artifact content type.
    pub content_type: String,
    /// Content digest for the artifact payload.
    pub digest: HashDigest,
}

// ============================================================================
// SECTION: Bundle Types
// ============================================================================

/// Generated contract bundle with artifacts and manifest metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractBundle {
    /// Manifest describing the artifacts.
    pub manifest: ContractManifest,
    /// Artifact payloads included in the bundle.
    pub artifacts: Vec<ContractArtifact>,
}

impl ContractBundle {
    /// Returns the artifact stored at `path`, if any.
    #[must_use]
    pub fn artifact(&self, path: &str) -> Option<&ContractArtifact> {
        self.artifacts.iter().find(|artifact| artifact.path == path)
    }
}

/// Artifact payload with content bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    /// Relative artifact path under the output directory.
    pub path: String,
    /// MIME content type for the artifact.
    pub content_type: String,
    /// Serialized artifact payload bytes.
    pub bytes: Vec<u8>,
}
