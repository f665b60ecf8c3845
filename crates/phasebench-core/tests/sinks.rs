// crates/phasebench-core/tests/sinks.rs
// ============================================================================
// Module: Event Sink Tests
// Description: JSON-lines output of the event sinks and their fallback.
// ============================================================================
//! ## Overview
//! Validates append-only file logging of run events and the fallback taken
//! when the primary writer fails.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io;
use std::io::Write;

use phasebench_core::EventSink;
use phasebench_core::RunEvent;
use phasebench_core::RunEventKind;
use phasebench_core::runtime::FileEventSink;
use phasebench_core::runtime::WriterEventSink;
use serde_json::Value;
use serde_json::json;

#[test]
fn file_sink_appends_one_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    {
        let sink = FileEventSink::new(&path).unwrap();
        sink.record(&RunEvent::new(RunEventKind::PhaseStarted, "orders").with_phase("steady"));
    }
    {
        let sink = FileEventSink::new(&path).unwrap();
        sink.record(
            &RunEvent::new(RunEventKind::Warning, "orders")
                .with_message("default floor rate applied")
                .with_detail(json!({"rate": 100})),
        );
    }

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = text.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["event"], "phase_started");
    assert_eq!(lines[0]["phase"], "steady");
    assert!(lines[0].get("message").is_none());
    assert_eq!(lines[1]["event"], "warning");
    assert_eq!(lines[1]["detail"]["rate"], 100);
}

/// Writer that rejects writes or flushes on demand.
struct BrokenWriter {
    fail_write: bool,
}

impl Write for BrokenWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_write {
            return Err(io::Error::other("disk full"));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("flush failed"))
    }
}

#[test]
fn rejected_writes_go_to_the_fallback() {
    let sink = WriterEventSink::with_fallback(
        BrokenWriter {
            fail_write: true,
        },
        Vec::new(),
    );
    sink.record(&RunEvent::new(RunEventKind::PhaseStarted, "orders").with_phase("steady"));
    let (_, fallback) = sink.into_parts().unwrap();
    let line: Value = serde_json::from_slice(&fallback).unwrap();
    assert_eq!(line["event"], "phase_started");
    assert_eq!(line["phase"], "steady");
}

#[test]
fn failed_flushes_go_to_the_fallback() {
    let sink = WriterEventSink::with_fallback(
        BrokenWriter {
            fail_write: false,
        },
        Vec::new(),
    );
    sink.record(&RunEvent::new(RunEventKind::Warning, "orders").with_message("slow"));
    let (_, fallback) = sink.into_parts().unwrap();
    assert_eq!(String::from_utf8(fallback).unwrap().lines().count(), 1);
}

#[test]
fn healthy_writers_leave_the_fallback_empty() {
    let sink = WriterEventSink::with_fallback(Vec::new(), Vec::new());
    sink.record(&RunEvent::new(RunEventKind::PhaseStarted, "orders"));
    let (primary, fallback) = sink.into_parts().unwrap();
    assert_eq!(String::from_utf8(primary).unwrap().lines().count(), 1);
    assert!(fallback.is_empty());
}
