// crates/phasebench-core/src/runtime/mod.rs
// ============================================================================
// Module: Phasebench Runtime
// Description: Planning, verification, merging, document building, and checks.
// Purpose: Execute phased benchmark runs and judge their results.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement every stage between a load profile and a
//! compared result: the planner, the phased runner, the rate verifier, the
//! merger, the metrics builder, the invariant validator, and the comparator.
//! Apart from the event sinks, every stage is a pure transform.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod builder;
pub mod compare;
pub mod invariants;
pub mod merger;
pub mod planner;
pub mod runner;
pub mod sinks;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builder::BuildContext;
pub use builder::build_extended_document;
pub use builder::build_metrics_document;
pub use builder::compute_error_rate;
pub use compare::CompareOutcome;
pub use compare::ComparisonReport;
pub use compare::ComparisonResult;
pub use compare::Metric;
pub use compare::MetricDelta;
pub use compare::MetricSnapshot;
pub use compare::MetricStatus;
pub use compare::MetricThreshold;
pub use compare::ThresholdSet;
pub use compare::compare_documents;
pub use compare::compare_runs;
pub use invariants::Invariant;
pub use invariants::InvariantReport;
pub use invariants::InvariantValidator;
pub use invariants::InvariantViolation;
pub use invariants::TreeSummary;
pub use invariants::ValidationStatus;
pub use merger::MergeError;
pub use merger::MergedRun;
pub use merger::merge_phases;
pub use planner::PlanError;
pub use planner::plan_phases;
pub use planner::planned_duration;
pub use runner::PhasedRunner;
pub use runner::RunError;
pub use runner::RunRecord;
pub use runner::rfc3339_now;
pub use sinks::FileEventSink;
pub use sinks::NoopEventSink;
pub use sinks::StderrEventSink;
pub use sinks::WriterEventSink;
pub use verifier::RateOutcome;
pub use verifier::RateVerdict;
pub use verifier::RateViolation;
pub use verifier::ToleranceRule;
pub use verifier::VerificationLog;
pub use verifier::evaluate_rate;
