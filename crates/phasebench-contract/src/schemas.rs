// crates/phasebench-contract/src/schemas.rs
// ============================================================================
// Module: Contract Schemas
// Description: JSON schema builders for phasebench metrics documents.
// Purpose: Provide the canonical versioned schemas both validator backends use.
// Dependencies: phasebench-core, serde_json
// ============================================================================

//! ## Overview
//! This module defines the JSON Schema payloads that mirror the primary
//! metrics document (version `3.0`) and the extended document (version
//! `1.0`). The schemas stick to a small keyword vocabulary (`type`,
//! `required`, `properties`, `additionalProperties`, `minimum`, `maximum`,
//! `exclusiveMinimum`, `enum`, `const`, `items`) so the manual fallback
//! validator can interpret them exactly. Nullable fields use type arrays.

// ============================================================================
// SECTION: Imports
// ============================================================================

use phasebench_core::EXTENDED_DOCUMENT_VERSION;
use phasebench_core::METRICS_DOCUMENT_VERSION;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Public Schema Entrypoints
// ============================================================================

/// Returns the JSON schema for the primary metrics document.
#[must_use]
pub fn metrics_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "phasebench://contract/schemas/metrics-v3.0.schema.json",
        "title": "Phasebench Metrics Document",
        "description": "Persisted result of one phased benchmark run.",
        "type": "object",
        "required": [
            "version",
            "scenario",
            "execution",
            "results",
            "errors",
            "environment",
            "status"
        ],
        "properties": {
            "version": { "const": METRICS_DOCUMENT_VERSION },
            "scenario": scenario_schema(),
            "execution": execution_schema(),
            "results": results_schema(),
            "errors": errors_schema(),
            "cache": cache_schema(),
            "environment": environment_schema(),
            "phases": {
                "type": "array",
                "items": phase_summary_schema()
            },
            "status": status_schema()
        },
        "additionalProperties": false
    })
}

/// Returns the JSON schema for the extended multi-phase document.
#[must_use]
pub fn extended_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "phasebench://contract/schemas/metrics-extended-v1.0.schema.json",
        "title": "Phasebench Extended Metrics Document",
        "description": "Rate-control diagnostics and per-phase detail for multi-phase runs.",
        "type": "object",
        "required": [
            "version",
            "scenario",
            "profile",
            "rate_control",
            "phases",
            "aggregate",
            "warnings"
        ],
        "properties": {
            "version": { "const": EXTENDED_DOCUMENT_VERSION },
            "scenario": schema_for_string("Scenario name."),
            "profile": profile_schema(),
            "rate_control": rate_control_schema(),
            "phases": {
                "type": "array",
                "items": phase_detail_schema()
            },
            "aggregate": {
                "type": "object",
                "required": ["total_requests", "total_duration", "weighted_rps"],
                "properties": {
                    "total_requests": schema_for_count("Total requests across phases."),
                    "total_duration": schema_for_count("Total duration in seconds."),
                    "weighted_rps": schema_for_rate("Duration-weighted achieved rate.")
                },
                "additionalProperties": false
            },
            "warnings": {
                "type": "array",
                "items": schema_for_string("Warning message.")
            }
        },
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Document Blocks
// ============================================================================

/// Scenario identity block.
fn scenario_schema() -> Value {
    json!({
        "type": "object",
        "required": ["name", "endpoint", "profile"],
        "properties": {
            "name": schema_for_string("Scenario name."),
            "description": schema_for_string("Free-form description."),
            "endpoint": schema_for_string("Endpoint under test."),
            "profile": profile_schema(),
            "contract": {
                "description": "Protocol contract the scenario honors.",
                "enum": ["put_update"]
            }
        },
        "additionalProperties": false
    })
}

/// Execution parameters block.
fn execution_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "started_at",
            "duration_seconds",
            "target_rate",
            "min_rate",
            "threads",
            "connections",
            "tolerance_mode",
            "phase_count"
        ],
        "properties": {
            "started_at": schema_for_string("RFC 3339 start timestamp."),
            "duration_seconds": schema_for_count("Planned duration in seconds."),
            "target_rate": schema_for_count("Configured target rate."),
            "min_rate": schema_for_count("Configured minimum rate."),
            "threads": schema_for_count("Generator threads."),
            "connections": schema_for_count("Open connections."),
            "tolerance_mode": tolerance_mode_schema(),
            "phase_count": schema_for_count("Executed phase count.")
        },
        "additionalProperties": false
    })
}

/// Results block derived from the aggregate.
fn results_schema() -> Value {
    json!({
        "type": "object",
        "required": ["requests", "duration_seconds", "rps", "latency_ms", "error_rate", "retries"],
        "properties": {
            "requests": schema_for_count("Completed requests."),
            "duration_seconds": schema_for_count("Measured duration in seconds."),
            "rps": schema_for_rate("Duration-weighted achieved rate."),
            "latency_ms": latency_schema(),
            "error_rate": schema_for_ratio("Error ratio in [0, 1]."),
            "retries": schema_for_count("Client retries.")
        },
        "additionalProperties": false
    })
}

/// Error breakdown block.
fn errors_schema() -> Value {
    json!({
        "type": "object",
        "required": ["http_4xx", "http_5xx", "socket_errors", "socket_errors_total", "http_status"],
        "properties": {
            "http_4xx": schema_for_count("Responses with status 400-499."),
            "http_5xx": schema_for_count("Responses with status 500-599."),
            "socket_errors": socket_errors_schema(),
            "socket_errors_total": schema_for_count("Sum of socket error counters."),
            "http_status": status_histogram_schema()
        },
        "additionalProperties": false
    })
}

/// Optional cache block.
fn cache_schema() -> Value {
    json!({
        "type": "object",
        "required": ["hits", "misses", "hit_rate"],
        "properties": {
            "hits": schema_for_count("Cache hits."),
            "misses": schema_for_count("Cache misses."),
            "hit_rate": schema_for_ratio("Hit ratio in [0, 1].")
        },
        "additionalProperties": false
    })
}

/// Environment fingerprint block.
fn environment_schema() -> Value {
    json!({
        "type": "object",
        "required": ["os", "arch", "cpu_count", "generator", "host", "digest"],
        "properties": {
            "os": schema_for_string("Operating system family."),
            "arch": schema_for_string("CPU architecture."),
            "cpu_count": schema_for_count("Logical CPU count."),
            "generator": schema_for_string("Load generator identity."),
            "host": schema_for_string("Host label."),
            "digest": {
                "type": "object",
                "required": ["algorithm", "value"],
                "properties": {
                    "algorithm": { "enum": ["sha256"] },
                    "value": schema_for_string("Lowercase hex digest.")
                },
                "additionalProperties": false
            }
        },
        "additionalProperties": false
    })
}

/// Run status block.
fn status_schema() -> Value {
    json!({
        "type": "object",
        "required": ["outcome", "reasons"],
        "properties": {
            "outcome": { "enum": ["passed", "failed"] },
            "reasons": {
                "type": "array",
                "items": schema_for_string("Failure reason.")
            }
        },
        "additionalProperties": false
    })
}

/// Compact per-phase row.
fn phase_summary_schema() -> Value {
    json!({
        "type": "object",
        "required": ["label", "target_rate", "actual_rate", "duration_seconds", "requests"],
        "properties": {
            "label": schema_for_string("Phase label."),
            "target_rate": schema_for_count("Phase target rate."),
            "actual_rate": schema_for_rate("Achieved rate."),
            "duration_seconds": schema_for_count("Phase duration in seconds."),
            "requests": schema_for_count("Completed requests.")
        },
        "additionalProperties": false
    })
}

/// Full per-phase detail in the extended document.
fn phase_detail_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "label",
            "target_rate",
            "actual_rate",
            "duration_seconds",
            "requests",
            "latency_ms",
            "socket_errors",
            "http_status",
            "retries"
        ],
        "properties": {
            "label": schema_for_string("Phase label."),
            "target_rate": schema_for_count("Phase target rate."),
            "actual_rate": schema_for_rate("Achieved rate."),
            "duration_seconds": schema_for_count("Phase duration in seconds."),
            "requests": schema_for_count("Completed requests."),
            "latency_ms": latency_schema(),
            "socket_errors": socket_errors_schema(),
            "http_status": status_histogram_schema(),
            "retries": schema_for_count("Client retries.")
        },
        "additionalProperties": false
    })
}

/// Rate-control diagnostics block.
fn rate_control_schema() -> Value {
    json!({
        "type": "object",
        "required": ["tolerance_mode", "verdicts", "failed_phases"],
        "properties": {
            "tolerance_mode": tolerance_mode_schema(),
            "verdicts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": [
                        "phase",
                        "target_rate",
                        "achieved_rate",
                        "deviation",
                        "deviation_percent",
                        "rule",
                        "outcome",
                        "normalized"
                    ],
                    "properties": {
                        "phase": schema_for_string("Phase label."),
                        "target_rate": schema_for_count("Phase target rate."),
                        "achieved_rate": schema_for_rate("Achieved rate."),
                        "deviation": { "type": "number" },
                        "deviation_percent": { "type": ["number", "null"] },
                        "rule": { "enum": ["none", "absolute", "relative"] },
                        "outcome": { "enum": ["pass", "fail", "skip"] },
                        "normalized": { "type": "boolean" }
                    },
                    "additionalProperties": false
                }
            },
            "failed_phases": schema_for_count("Phases with a failed verdict.")
        },
        "additionalProperties": false
    })
}

// ============================================================================
// SECTION: Shared Fragments
// ============================================================================

/// Latency percentile block; each entry is positive or null.
fn latency_schema() -> Value {
    json!({
        "type": "object",
        "required": ["p50", "p75", "p90", "p95", "p99"],
        "properties": {
            "p50": schema_for_latency("Median latency in milliseconds."),
            "p75": schema_for_latency("75th percentile latency in milliseconds."),
            "p90": schema_for_latency("90th percentile latency in milliseconds."),
            "p95": schema_for_latency("95th percentile latency in milliseconds."),
            "p99": schema_for_latency("99th percentile latency in milliseconds.")
        },
        "additionalProperties": false
    })
}

/// Socket error counters.
fn socket_errors_schema() -> Value {
    json!({
        "type": "object",
        "required": ["connect", "read", "write", "timeout"],
        "properties": {
            "connect": schema_for_count("Connect errors."),
            "read": schema_for_count("Read errors."),
            "write": schema_for_count("Write errors."),
            "timeout": schema_for_count("Timeouts.")
        },
        "additionalProperties": false
    })
}

/// Status histogram keyed by status code.
fn status_histogram_schema() -> Value {
    json!({
        "type": "object",
        "description": "Response counts keyed by HTTP status code.",
        "additionalProperties": schema_for_count("Responses with this status.")
    })
}

/// Load profile identifiers.
fn profile_schema() -> Value {
    json!({ "enum": ["steady", "step_up", "ramp_up_down", "burst"] })
}

/// Tolerance mode identifiers.
fn tolerance_mode_schema() -> Value {
    json!({ "enum": ["strict", "warn"] })
}

/// Non-negative integer counter.
fn schema_for_count(description: &str) -> Value {
    json!({
        "type": "integer",
        "minimum": 0,
        "description": description
    })
}

/// Non-negative rate.
fn schema_for_rate(description: &str) -> Value {
    json!({
        "type": "number",
        "minimum": 0,
        "description": description
    })
}

/// Ratio in `[0, 1]` or null.
fn schema_for_ratio(description: &str) -> Value {
    json!({
        "type": ["number", "null"],
        "minimum": 0,
        "maximum": 1,
        "description": description
    })
}

/// Strictly positive latency or null.
fn schema_for_latency(description: &str) -> Value {
    json!({
        "type": ["number", "null"],
        "exclusiveMinimum": 0,
        "description": description
    })
}

/// Plain string.
fn schema_for_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}
