// crates/phasebench-core/src/runtime/sinks.rs
// ============================================================================
// Module: Run Event Sinks
// Description: JSON-lines sinks for structured run events.
// Purpose: Emit run diagnostics without a hard logging dependency.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! Every sink serializes a [`RunEvent`] as one JSON object per line. A line
//! the primary writer rejects is retried on stderr; a failure there is
//! swallowed so diagnostics never change a run's outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::interfaces::EventSink;
use crate::interfaces::RunEvent;

// ============================================================================
// SECTION: Stderr Sink
// ============================================================================

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &RunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

// ============================================================================
// SECTION: File Sink
// ============================================================================

/// Event sink that appends JSON lines to a file.
///
/// Lines the file rejects are written to stderr instead.
pub struct FileEventSink {
    /// Append-only log writer with a stderr fallback.
    inner: WriterEventSink<File>,
}

impl FileEventSink {
    /// Opens the event log in append mode, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: WriterEventSink::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &RunEvent) {
        self.inner.record(event);
    }
}

// ============================================================================
// SECTION: Writer Sink
// ============================================================================

/// Event sink writing JSON lines into any writer.
///
/// Each line is flushed. When the write or flush fails the line goes to the
/// fallback writer, stderr unless [`WriterEventSink::with_fallback`] says
/// otherwise.
pub struct WriterEventSink<W: Write + Send, F: Write + Send = io::Stderr> {
    /// Output writer for event records.
    writer: Mutex<W>,
    /// Receives lines the primary writer rejected.
    fallback: Mutex<F>,
}

impl<W: Write + Send> WriterEventSink<W> {
    /// Wraps `writer` in a sink that falls back to stderr.
    pub fn new(writer: W) -> Self {
        Self::with_fallback(writer, io::stderr())
    }
}

impl<W: Write + Send, F: Write + Send> WriterEventSink<W, F> {
    /// Wraps `writer` in a sink that falls back to `fallback`.
    pub const fn with_fallback(writer: W, fallback: F) -> Self {
        Self {
            writer: Mutex::new(writer),
            fallback: Mutex::new(fallback),
        }
    }

    /// Returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error when the writer mutex is poisoned.
    pub fn into_inner(self) -> io::Result<W> {
        self.into_parts().map(|(writer, _)| writer)
    }

    /// Returns the inner writer and the fallback writer.
    ///
    /// # Errors
    ///
    /// Returns an error when either mutex is poisoned.
    pub fn into_parts(self) -> io::Result<(W, F)> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| io::Error::other("event writer mutex poisoned"))?;
        let fallback = self
            .fallback
            .into_inner()
            .map_err(|_| io::Error::other("fallback writer mutex poisoned"))?;
        Ok((writer, fallback))
    }
}

impl<W: Write + Send, F: Write + Send> EventSink for WriterEventSink<W, F> {
    fn record(&self, event: &RunEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        let written = self.writer.lock().is_ok_and(|mut writer| {
            writeln!(writer, "{payload}").and_then(|()| writer.flush()).is_ok()
        });
        if !written && let Ok(mut fallback) = self.fallback.lock() {
            let _ = writeln!(fallback, "{payload}");
        }
    }
}

// ============================================================================
// SECTION: Noop Sink
// ============================================================================

/// Event sink that drops every event.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &RunEvent) {}
}
