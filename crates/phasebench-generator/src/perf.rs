// crates/phasebench-generator/src/perf.rs
// ============================================================================
// Module: perf Profiler
// Description: Profiler implementation wrapping `perf record`.
// Purpose: Capture a CPU profile alongside exactly one phase.
// Dependencies: phasebench-core, std
// ============================================================================

//! ## Overview
//! A session runs `perf record -F <freq> -g -a -o <file> -- sleep <secs>`
//! where `secs` covers the phase plus a small margin, so perf finishes on its
//! own. Stopping waits briefly for that natural exit and kills the recorder
//! otherwise; the session also stops when dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use phasebench_core::Phase;
use phasebench_core::ProfileSession;
use phasebench_core::Profiler;
use phasebench_core::ProfilerError;

use crate::process::ChildGuard;
use crate::process::POLL_INTERVAL;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Seconds added to the phase duration for the recorder's own sleep.
const RECORD_MARGIN_SECONDS: u64 = 2;

/// How long `stop` waits for perf to flush before killing it.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Settings for the perf profiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfOptions {
    /// perf binary name or path.
    pub binary: PathBuf,
    /// Sampling frequency in Hz.
    pub frequency: u32,
    /// Directory receiving `perf-<label>.data` files.
    pub output_dir: PathBuf,
}

// ============================================================================
// SECTION: Profiler
// ============================================================================

/// `perf record` profiler.
#[derive(Debug, Clone)]
pub struct PerfProfiler {
    /// Profiler settings.
    options: PerfOptions,
}

impl PerfProfiler {
    /// Creates a profiler.
    #[must_use]
    pub const fn new(options: PerfOptions) -> Self {
        Self {
            options,
        }
    }

    /// Returns the capture path for a phase.
    #[must_use]
    pub fn capture_path(&self, phase: &Phase) -> PathBuf {
        self.options.output_dir.join(format!("perf-{}.data", phase.label))
    }

    /// Builds the `perf record` argument list for a phase.
    #[must_use]
    pub fn record_args(&self, phase: &Phase) -> Vec<String> {
        vec![
            String::from("record"),
            format!("-F{}", self.options.frequency),
            String::from("-g"),
            String::from("-a"),
            String::from("-o"),
            self.capture_path(phase).display().to_string(),
            String::from("--"),
            String::from("sleep"),
            phase.duration_seconds.saturating_add(RECORD_MARGIN_SECONDS).to_string(),
        ]
    }
}

impl Profiler for PerfProfiler {
    fn start(&mut self, phase: &Phase) -> Result<Box<dyn ProfileSession>, ProfilerError> {
        fs::create_dir_all(&self.options.output_dir)
            .map_err(|err| ProfilerError::Start(err.to_string()))?;
        let child = Command::new(&self.options.binary)
            .args(self.record_args(phase))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                ProfilerError::Start(format!("{}: {err}", self.options.binary.display()))
            })?;
        Ok(Box::new(PerfSession {
            guard: Some(ChildGuard::new(child)),
        }))
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Running perf capture.
struct PerfSession {
    /// Recorder process; `None` once stopped.
    guard: Option<ChildGuard>,
}

impl ProfileSession for PerfSession {
    fn stop(&mut self) -> Result<(), ProfilerError> {
        let Some(mut guard) = self.guard.take() else {
            return Ok(());
        };
        let started = Instant::now();
        while started.elapsed() < STOP_GRACE {
            match guard.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(ProfilerError::Stop(format!("perf exited with {status}")));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => return Err(ProfilerError::Stop(err.to_string())),
            }
        }
        guard.terminate();
        Err(ProfilerError::Stop(String::from("perf did not exit in time and was killed")))
    }
}
