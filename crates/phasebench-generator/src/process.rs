// crates/phasebench-generator/src/process.rs
// ============================================================================
// Module: Supervised Child Process
// Description: Runs an external command under a hard deadline.
// Purpose: Guarantee the generator never outlives its phase budget.
// Dependencies: std, thiserror
// ============================================================================

//! ## Overview
//! [`run_with_deadline`] spawns a command with captured output, drains both
//! pipes on helper threads so a chatty child cannot block on a full pipe,
//! and polls for exit. When the deadline passes the child is killed and
//! reaped before returning. A [`ChildGuard`] kills the child on every early
//! return path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Poll interval while waiting for the child to exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured result of a completed child process.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Failures of a supervised run.
#[derive(Debug, Error)]
pub enum ProcessFailure {
    /// The child could not be spawned.
    #[error("failed to spawn child process: {0}")]
    Spawn(String),
    /// The deadline elapsed and the child was killed.
    #[error("child process overran its deadline and was killed")]
    TimedOut,
    /// Waiting on the child or its pipes failed.
    #[error("child process i/o failed: {0}")]
    Io(String),
}

/// Kills the child when dropped unless it has already exited.
pub struct ChildGuard {
    /// Supervised child.
    child: Child,
}

impl ChildGuard {
    /// Wraps a spawned child.
    #[must_use]
    pub const fn new(child: Child) -> Self {
        Self {
            child,
        }
    }

    /// Polls for exit without blocking.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the child state is unavailable.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Kills and reaps the child.
    pub fn terminate(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        self.terminate();
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs `command` to completion or until `deadline` elapses.
///
/// # Errors
///
/// Returns [`ProcessFailure::Spawn`] when the command cannot start,
/// [`ProcessFailure::TimedOut`] when it overruns, and [`ProcessFailure::Io`]
/// when its state or output cannot be read.
pub fn run_with_deadline(
    command: &mut Command,
    deadline: Duration,
) -> Result<ProcessOutput, ProcessFailure> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|err| ProcessFailure::Spawn(err.to_string()))?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let mut guard = ChildGuard::new(child);

    let started = Instant::now();
    let status = loop {
        if let Some(status) = guard.try_wait().map_err(|err| ProcessFailure::Io(err.to_string()))? {
            break status;
        }
        if started.elapsed() >= deadline {
            guard.terminate();
            return Err(ProcessFailure::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(deadline.saturating_sub(started.elapsed())));
    };

    Ok(ProcessOutput {
        status,
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

/// Drains a pipe on a helper thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

/// Joins a drain thread and decodes its bytes.
fn collect(
    handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
) -> Result<String, ProcessFailure> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| ProcessFailure::Io(String::from("output reader panicked")))?
        .map_err(|err| ProcessFailure::Io(err.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
