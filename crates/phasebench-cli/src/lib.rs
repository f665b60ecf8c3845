// crates/phasebench-cli/src/lib.rs
// ============================================================================
// Module: Phasebench CLI Library
// Description: Shared helpers for the phasebench binary.
// Purpose: Expose the message catalog and result-tree loading to tests.
// Dependencies: phasebench-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The `phasebench` binary lives in `main.rs`; this library carries the parts
//! that are useful on their own: the [`t!`] message catalog and discovery of
//! persisted metrics documents.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod documents;
pub mod i18n;
