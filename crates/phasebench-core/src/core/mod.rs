// crates/phasebench-core/src/core/mod.rs
// ============================================================================
// Module: Phasebench Core Types
// Description: Canonical profile, measurement, and document structures.
// Purpose: Provide stable, serializable types shared by every runtime stage.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types describe load profiles, planned phases, typed measurements, and
//! the versioned metrics documents. They carry no behavior beyond small
//! accessors; the runtime modules own all transformations.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod document;
pub mod failure;
pub mod hashing;
pub mod latency;
pub mod measurement;
pub mod profile;
pub mod settings;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::AggregateSummary;
pub use document::CacheMetrics;
pub use document::EXTENDED_DOCUMENT_VERSION;
pub use document::EnvironmentFingerprint;
pub use document::ErrorBreakdown;
pub use document::ExecutionInfo;
pub use document::ExtendedDocument;
pub use document::METRICS_DOCUMENT_VERSION;
pub use document::MetricsDocument;
pub use document::PhaseDetail;
pub use document::PhaseSummary;
pub use document::RateControl;
pub use document::ResultsBlock;
pub use document::RunOutcome;
pub use document::RunStatus;
pub use document::ScenarioContract;
pub use document::ScenarioInfo;
pub use failure::FailureKind;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use latency::LatencyMs;
pub use latency::LatencyParseError;
pub use measurement::AggregateResult;
pub use measurement::CacheCounters;
pub use measurement::LatencyPercentiles;
pub use measurement::PhaseResult;
pub use measurement::SocketErrors;
pub use measurement::StatusHistogram;
pub use profile::LoadProfile;
pub use profile::Phase;
pub use profile::ProfileParams;
pub use profile::ToleranceMode;
pub use profile::UnknownProfile;
pub use settings::Concurrency;
pub use settings::ProfileTarget;
pub use settings::RunSettings;
pub use settings::TargetSpec;
