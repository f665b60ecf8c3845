// crates/phasebench-core/src/lib.rs
// ============================================================================
// Module: Phasebench Core Library
// Description: Public API surface for the phasebench engine.
// Purpose: Expose core types, interfaces, and runtime stages.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Phasebench core plans phased load-test runs, verifies achieved rates,
//! merges per-phase measurements into one aggregate, renders versioned
//! metrics documents, validates their invariants, and compares runs. It
//! talks to the outside world only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::EventSink;
pub use interfaces::GeneratorError;
pub use interfaces::LoadGenerator;
pub use interfaces::PhaseRequest;
pub use interfaces::ProfileSession;
pub use interfaces::Profiler;
pub use interfaces::ProfilerError;
pub use interfaces::RawArtifact;
pub use interfaces::RunEvent;
pub use interfaces::RunEventKind;
pub use runtime::CompareOutcome;
pub use runtime::BuildContext;
pub use runtime::ComparisonReport;
pub use runtime::InvariantReport;
pub use runtime::InvariantValidator;
pub use runtime::MergedRun;
pub use runtime::MetricStatus;
pub use runtime::MetricThreshold;
pub use runtime::PhasedRunner;
pub use runtime::PlanError;
pub use runtime::RunError;
pub use runtime::RunRecord;
pub use runtime::ThresholdSet;
pub use runtime::TreeSummary;
pub use runtime::VerificationLog;
