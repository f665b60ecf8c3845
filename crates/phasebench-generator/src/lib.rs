// crates/phasebench-generator/src/lib.rs
// ============================================================================
// Module: Phasebench Generator Library
// Description: Load generator and profiler adapters for external tools.
// Purpose: Bridge the core runtime traits to wrk2 and perf subprocesses.
// Dependencies: phasebench-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate implements [`phasebench_core::LoadGenerator`] for the `wrk2`
//! binary and [`phasebench_core::Profiler`] for `perf record`. It also owns
//! the parsers for the generator's text report and for the structured
//! side-channel document written by the request script.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod perf;
pub mod process;
pub mod report;
pub mod side_channel;
pub mod wrk;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use perf::PerfOptions;
pub use perf::PerfProfiler;
pub use report::TextReport;
pub use report::parse_text_report;
pub use side_channel::MergeReport;
pub use side_channel::MergedSideChannel;
pub use side_channel::SIDE_CHANNEL_ENV_VAR;
pub use side_channel::SideChannelError;
pub use side_channel::SideChannelMetrics;
pub use side_channel::load_side_channel;
pub use side_channel::merge_side_channels;
pub use wrk::WrkGenerator;
pub use wrk::WrkOptions;
