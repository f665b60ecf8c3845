// crates/phasebench-generator/src/wrk.rs
// ============================================================================
// Module: wrk2 Load Generator
// Description: LoadGenerator implementation driving the wrk2 binary.
// Purpose: Execute one rate-controlled phase and return a typed artifact.
// Dependencies: phasebench-core, std
// ============================================================================

//! ## Overview
//! [`WrkGenerator`] builds the `wrk2` command line for a phase, runs it under
//! a `duration + grace` deadline, persists the raw text report, and turns it
//! into a [`RawArtifact`]. When the request script wrote a side-channel
//! document, its exact status counts and percentiles take precedence over
//! the text report; otherwise a fallback histogram attributes
//! `requests - non_2xx_3xx` to status 200.
//!
//! A phase with a zero target rate runs at the configured floor rate and the
//! substitution is reported as a warning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use phasebench_core::GeneratorError;
use phasebench_core::LatencyPercentiles;
use phasebench_core::LoadGenerator;
use phasebench_core::PhaseRequest;
use phasebench_core::RawArtifact;
use phasebench_core::StatusHistogram;

use crate::process::ProcessFailure;
use crate::process::run_with_deadline;
use crate::report::TextReport;
use crate::report::parse_text_report;
use crate::side_channel::SIDE_CHANNEL_ENV_VAR;
use crate::side_channel::SideChannelMetrics;
use crate::side_channel::load_side_channel;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Default floor rate applied when a phase has no target rate.
pub const DEFAULT_FLOOR_RATE: u64 = 100;

/// Default grace period added to each phase deadline, in seconds.
pub const DEFAULT_GRACE_SECONDS: u64 = 30;

/// Settings for the wrk2 adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrkOptions {
    /// Generator binary name or path.
    pub binary: PathBuf,
    /// Directory receiving raw reports and side-channel documents.
    pub raw_dir: PathBuf,
    /// Seconds added to the phase duration before the process is killed.
    pub grace_seconds: u64,
    /// Rate used when a phase target is zero.
    pub floor_rate: u64,
    /// Whether the request script writes a side-channel document.
    pub side_channel: bool,
}

impl WrkOptions {
    /// Creates options with default grace, floor rate, and side channel on.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            raw_dir: raw_dir.into(),
            grace_seconds: DEFAULT_GRACE_SECONDS,
            floor_rate: DEFAULT_FLOOR_RATE,
            side_channel: true,
        }
    }
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// wrk2-backed load generator.
#[derive(Debug, Clone)]
pub struct WrkGenerator {
    /// Adapter settings.
    options: WrkOptions,
}

impl WrkGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new(options: WrkOptions) -> Self {
        Self {
            options,
        }
    }

    /// Returns the adapter settings.
    #[must_use]
    pub const fn options(&self) -> &WrkOptions {
        &self.options
    }

    /// Returns the raw report path for a phase.
    #[must_use]
    pub fn raw_output_path(&self, index: usize, label: &str) -> PathBuf {
        self.options.raw_dir.join(format!("{}.txt", artifact_stem(index, label)))
    }

    /// Returns the side-channel document path for a phase.
    #[must_use]
    pub fn side_channel_path(&self, index: usize, label: &str) -> PathBuf {
        self.options.raw_dir.join(format!("{}.metrics.json", artifact_stem(index, label)))
    }
}

impl LoadGenerator for WrkGenerator {
    fn identity(&self) -> String {
        let name = self
            .options
            .binary
            .file_name()
            .map_or_else(
                || self.options.binary.display().to_string(),
                |name| name.to_string_lossy().into_owned(),
            );
        format!("{name} (rate-controlled)")
    }

    fn run_phase(&mut self, request: &PhaseRequest<'_>) -> Result<RawArtifact, GeneratorError> {
        let phase = request.phase;
        let mut warnings = Vec::new();
        let applied_rate = if phase.target_rate == 0 {
            warnings.push(format!(
                "phase {} has no target rate; using floor rate {}",
                phase.label, self.options.floor_rate
            ));
            self.options.floor_rate
        } else {
            phase.target_rate
        };

        fs::create_dir_all(&self.options.raw_dir)
            .map_err(|err| GeneratorError::Io(err.to_string()))?;
        let raw_path = self.raw_output_path(request.index, &phase.label);
        let side_path = self.side_channel_path(request.index, &phase.label);
        if side_path.exists() {
            fs::remove_file(&side_path).map_err(|err| GeneratorError::Io(err.to_string()))?;
        }

        let mut command = Command::new(&self.options.binary);
        command.args(command_args(request, applied_rate));
        if self.options.side_channel {
            command.env(SIDE_CHANNEL_ENV_VAR, &side_path);
        }
        let deadline_seconds = phase.duration_seconds.saturating_add(self.options.grace_seconds);
        let output = run_with_deadline(&mut command, Duration::from_secs(deadline_seconds))
            .map_err(|failure| match failure {
                ProcessFailure::Spawn(message) => GeneratorError::Spawn {
                    binary: self.options.binary.display().to_string(),
                    message,
                },
                ProcessFailure::TimedOut => GeneratorError::Timeout {
                    phase: phase.label.clone(),
                    seconds: deadline_seconds,
                },
                ProcessFailure::Io(message) => GeneratorError::Io(message),
            })?;

        fs::write(&raw_path, output.stdout.as_bytes())
            .map_err(|err| GeneratorError::Io(err.to_string()))?;
        if !output.status.success() {
            return Err(GeneratorError::Exit {
                phase: phase.label.clone(),
                status: output.status.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        let report = parse_text_report(&output.stdout).map_err(|message| GeneratorError::Output {
            phase: phase.label.clone(),
            message,
        })?;
        warnings.extend(
            report.warnings.iter().map(|warning| format!("phase {}: {warning}", phase.label)),
        );

        let side_channel = if self.options.side_channel {
            read_side_channel(&side_path, &phase.label, &mut warnings)
        } else {
            None
        };
        let mut artifact =
            build_artifact(&report, side_channel.as_ref(), &phase.label, &mut warnings);
        artifact.applied_rate = applied_rate;
        artifact.raw_output = Some(raw_path);
        artifact.warnings = warnings;
        Ok(artifact)
    }
}

// ============================================================================
// SECTION: Command Construction
// ============================================================================

/// Builds the generator argument list for a phase.
#[must_use]
pub fn command_args(request: &PhaseRequest<'_>, rate: u64) -> Vec<String> {
    let mut args = vec![
        format!("-t{}", request.concurrency.threads),
        format!("-c{}", request.concurrency.connections),
        format!("-d{}s", request.phase.duration_seconds),
        format!("-R{rate}"),
        String::from("--latency"),
    ];
    if let Some(script) = &request.target.script {
        args.push(String::from("-s"));
        args.push(script.clone());
    }
    args.push(request.target.url.clone());
    args
}

/// File stem shared by a phase's raw artifacts.
fn artifact_stem(index: usize, label: &str) -> String {
    let safe: String = label
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    format!("phase-{index}-{safe}")
}

// ============================================================================
// SECTION: Artifact Assembly
// ============================================================================

/// Loads the side channel, downgrading every failure to a warning.
fn read_side_channel(
    path: &Path,
    label: &str,
    warnings: &mut Vec<String>,
) -> Option<SideChannelMetrics> {
    if !path.exists() {
        warnings.push(format!("side channel missing for phase {label}; using text report"));
        return None;
    }
    match load_side_channel(path) {
        Ok(document) => {
            warnings.extend(document.notes.iter().map(|note| format!("phase {label}: {note}")));
            Some(document)
        }
        Err(err) => {
            warnings.push(format!("phase {label}: {err}; using text report"));
            None
        }
    }
}

/// Combines the text report with the optional side channel.
#[must_use]
pub fn build_artifact(
    report: &TextReport,
    side_channel: Option<&SideChannelMetrics>,
    label: &str,
    warnings: &mut Vec<String>,
) -> RawArtifact {
    let mut artifact = RawArtifact {
        requests_completed: report.requests,
        rps_achieved: report.rps,
        latency: report.latency,
        socket_errors: report.socket_errors,
        ..RawArtifact::default()
    };
    match side_channel {
        Some(document) => {
            artifact.requests_completed = document.total_requests;
            artifact.http_status = document.http_status.clone();
            artifact.latency = overlay_latency(&report.latency, document);
            artifact.retries = document.retries;
            artifact.cache = document.cache;
        }
        None => {
            artifact.http_status = fallback_histogram(report.requests, report.non_success);
            if report.non_success > 0 {
                warnings.push(format!(
                    "phase {label}: {} non-2xx/3xx responses have no known status code",
                    report.non_success
                ));
            }
        }
    }
    artifact
}

/// Attributes successful requests to status 200.
#[must_use]
pub fn fallback_histogram(requests: u64, non_success: u64) -> StatusHistogram {
    let successes = requests.saturating_sub(non_success);
    let mut histogram = StatusHistogram::new();
    if successes > 0 {
        histogram.record(200, successes);
    }
    histogram
}

/// Prefers side-channel percentiles, keeping text values where absent.
fn overlay_latency(text: &LatencyPercentiles, document: &SideChannelMetrics) -> LatencyPercentiles {
    LatencyPercentiles {
        p50: document.latency_ms("p50_ms").or(text.p50),
        p75: document.latency_ms("p75_ms").or(text.p75),
        p90: document.latency_ms("p90_ms").or(text.p90),
        p95: document.latency_ms("p95_ms").or(text.p95),
        p99: document.latency_ms("p99_ms").or(text.p99),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
