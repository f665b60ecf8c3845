// crates/phasebench-generator/src/side_channel.rs
// ============================================================================
// Module: Side-Channel Metrics
// Description: Structured per-phase metrics written by the generator script.
// Purpose: Validate side-channel documents and merge them across phases.
// Dependencies: phasebench-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The request script writes one JSON document per phase with exact status
//! counts and latency percentiles. A document is accepted only when
//! `total_requests` is a positive integer (booleans rejected), every status
//! count is a non-negative integer, and the status counts sum to more than
//! zero. When the status sum differs from `total_requests`, the status sum is
//! authoritative and a note is recorded.
//!
//! Merging sums status counts, takes a request-weighted mean of every latency
//! percentile present, the minimum of positive minima, and the maximum of
//! maxima. Scenario and execution metadata come from the first input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use phasebench_core::CacheCounters;
use phasebench_core::StatusHistogram;
use phasebench_core::measurement::count_as_f64;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the side-channel output path for the script.
pub const SIDE_CHANNEL_ENV_VAR: &str = "PHASEBENCH_METRICS_OUT";

/// Maximum accepted side-channel document size in bytes.
const MAX_SIDE_CHANNEL_BYTES: u64 = 4 * 1024 * 1024;

/// Latency fields carried by side-channel documents, in output order.
const LATENCY_FIELDS: [&str; 7] =
    ["p50_ms", "p75_ms", "p90_ms", "p95_ms", "p99_ms", "p999_ms", "mean_ms"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while reading or merging side-channel documents.
#[derive(Debug, Error)]
pub enum SideChannelError {
    /// The file could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// Failure description.
        message: String,
    },
    /// The file is not valid JSON.
    #[error("invalid json in {path}: {message}")]
    Json {
        /// File path.
        path: String,
        /// Failure description.
        message: String,
    },
    /// The document violates a validation rule.
    #[error("invalid side-channel document {path}: {message}")]
    Invalid {
        /// File path.
        path: String,
        /// Violated rule.
        message: String,
    },
    /// No input passed validation.
    #[error("no valid side-channel documents to merge")]
    NoValidInputs,
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Validated side-channel document for one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct SideChannelMetrics {
    /// Authoritative request count (the status sum).
    pub total_requests: u64,
    /// Exact status counts.
    pub http_status: StatusHistogram,
    /// Latency fields in milliseconds keyed by field name (`p50_ms`, ...).
    pub latency: BTreeMap<String, f64>,
    /// Client-side retries.
    pub retries: u64,
    /// Cache counters when reported.
    pub cache: Option<CacheCounters>,
    /// Scenario metadata block, if present.
    pub scenario: Option<Value>,
    /// Execution metadata block, if present.
    pub execution: Option<Value>,
    /// Non-fatal observations made during validation.
    pub notes: Vec<String>,
}

impl SideChannelMetrics {
    /// Returns a latency field in milliseconds.
    #[must_use]
    pub fn latency_ms(&self, field: &str) -> Option<f64> {
        self.latency.get(field).copied()
    }
}

/// Merged side-channel document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSideChannel {
    /// Scenario metadata from the first input.
    pub scenario: Value,
    /// Execution metadata from the first input.
    pub execution: Value,
    /// Sum of validated request counts.
    pub total_requests: u64,
    /// 4xx+5xx responses over total requests.
    pub error_rate: f64,
    /// Per-code status sums.
    pub http_status: BTreeMap<String, u64>,
    /// Per-code share of total requests.
    pub status_distribution: BTreeMap<String, f64>,
    /// Merged latency fields.
    pub latency: BTreeMap<String, f64>,
}

/// Merge result with the warnings for skipped inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    /// Merged document.
    pub merged: MergedSideChannel,
    /// Inputs that were accepted.
    pub accepted: Vec<PathBuf>,
    /// Skipped inputs and validation notes.
    pub warnings: Vec<String>,
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

/// Reads and validates one side-channel document.
///
/// # Errors
///
/// Returns [`SideChannelError`] when the file is unreadable, not JSON, or
/// violates a validation rule.
pub fn load_side_channel(path: &Path) -> Result<SideChannelMetrics, SideChannelError> {
    let display = path.display().to_string();
    let metadata = fs::metadata(path).map_err(|err| SideChannelError::Io {
        path: display.clone(),
        message: err.to_string(),
    })?;
    if metadata.len() > MAX_SIDE_CHANNEL_BYTES {
        return Err(SideChannelError::Invalid {
            path: display,
            message: String::from("document exceeds size limit"),
        });
    }
    let bytes = fs::read(path).map_err(|err| SideChannelError::Io {
        path: display.clone(),
        message: err.to_string(),
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|err| SideChannelError::Json {
        path: display.clone(),
        message: err.to_string(),
    })?;
    validate_side_channel(&value).map_err(|message| SideChannelError::Invalid {
        path: display,
        message,
    })
}

/// Validates a parsed side-channel document.
///
/// # Errors
///
/// Returns the violated rule as a message.
pub fn validate_side_channel(value: &Value) -> Result<SideChannelMetrics, String> {
    let object = value.as_object().ok_or_else(|| String::from("document is not an object"))?;
    let declared = match object.get("total_requests") {
        Some(raw) => whole_number(raw)
            .ok_or_else(|| format!("total_requests must be an integer (got {raw})"))?,
        None => return Err(String::from("total_requests is missing")),
    };
    if declared <= 0 {
        return Err(format!("total_requests must be positive (got {declared})"));
    }
    let statuses = object
        .get("http_status")
        .and_then(Value::as_object)
        .ok_or_else(|| String::from("http_status is missing or not an object"))?;
    let http_status = validate_statuses(statuses)?;
    let status_sum = http_status.total();
    if status_sum == 0 {
        return Err(String::from("http_status is empty"));
    }

    let mut notes = Vec::new();
    if i128::from(status_sum) != i128::from(declared) {
        notes.push(format!(
            "http_status sum ({status_sum}) != total_requests ({declared}); using http_status sum"
        ));
    }

    let latency =
        object.get("latency").and_then(Value::as_object).map(read_latency).unwrap_or_default();
    let retries = object
        .get("retries")
        .and_then(whole_number)
        .and_then(|count| u64::try_from(count).ok())
        .unwrap_or(0);
    let cache = object.get("cache").and_then(Value::as_object).and_then(read_cache);

    Ok(SideChannelMetrics {
        total_requests: status_sum,
        http_status,
        latency,
        retries,
        cache,
        scenario: object.get("scenario").cloned(),
        execution: object.get("execution").cloned(),
        notes,
    })
}

/// Validates status counts and keys.
fn validate_statuses(statuses: &Map<String, Value>) -> Result<StatusHistogram, String> {
    let mut histogram = StatusHistogram::new();
    for (code, raw) in statuses {
        let count = whole_number(raw)
            .ok_or_else(|| format!("http_status count for {code} must be an integer (got {raw})"))?;
        let count = u64::try_from(count)
            .map_err(|_| format!("http_status count for {code} is negative ({count})"))?;
        let status = code
            .parse::<u16>()
            .ok()
            .filter(|status| (100 ..= 599).contains(status))
            .ok_or_else(|| format!("http_status key `{code}` is not a status code"))?;
        histogram.record(status, count);
    }
    Ok(histogram)
}

/// Reads numeric latency fields, ignoring non-numeric ones.
fn read_latency(latency: &Map<String, Value>) -> BTreeMap<String, f64> {
    latency
        .iter()
        .filter_map(|(field, raw)| {
            let value = raw.as_f64().filter(|value| value.is_finite())?;
            Some((field.clone(), value))
        })
        .collect()
}

/// Reads an optional cache block.
fn read_cache(cache: &Map<String, Value>) -> Option<CacheCounters> {
    let hits =
        cache.get("hits").and_then(whole_number).and_then(|count| u64::try_from(count).ok())?;
    let misses =
        cache.get("misses").and_then(whole_number).and_then(|count| u64::try_from(count).ok())?;
    Some(CacheCounters {
        hits,
        misses,
    })
}

/// Returns an integral JSON number; booleans and fractions are rejected.
fn whole_number(value: &Value) -> Option<i128> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                return Some(i128::from(unsigned));
            }
            if let Some(signed) = number.as_i64() {
                return Some(i128::from(signed));
            }
            number.as_f64().and_then(integral_float)
        }
        _ => None,
    }
}

/// Converts an integral float within the exact `f64` range.
#[allow(
    clippy::cast_possible_truncation,
    reason = "The value is integral and bounded by 2^53, so the cast is exact."
)]
fn integral_float(value: f64) -> Option<i128> {
    if value.fract() != 0.0 || value.abs() > 9_007_199_254_740_992.0 {
        return None;
    }
    Some(value as i128)
}

// ============================================================================
// SECTION: Merging
// ============================================================================

/// Merges side-channel documents, skipping invalid ones with a warning.
///
/// # Errors
///
/// Returns [`SideChannelError::NoValidInputs`] when no input is valid.
pub fn merge_side_channels(paths: &[PathBuf]) -> Result<MergeReport, SideChannelError> {
    let mut warnings = Vec::new();
    let mut accepted = Vec::new();
    let mut documents = Vec::new();
    for path in paths {
        match load_side_channel(path) {
            Ok(document) => {
                warnings.extend(
                    document.notes.iter().map(|note| format!("{}: {note}", path.display())),
                );
                accepted.push(path.clone());
                documents.push(document);
            }
            Err(err) => warnings.push(format!("skipping {err}")),
        }
    }
    if documents.is_empty() {
        return Err(SideChannelError::NoValidInputs);
    }
    // Metadata always comes from the first input, valid or not.
    let (scenario, execution) =
        paths.first().map_or((Value::Null, Value::Null), |path| first_metadata(path));
    Ok(MergeReport {
        merged: merge_documents(&documents, scenario, execution),
        accepted,
        warnings,
    })
}

/// Merges validated documents.
#[must_use]
pub fn merge_documents(
    documents: &[SideChannelMetrics],
    scenario: Value,
    execution: Value,
) -> MergedSideChannel {
    let mut histogram = StatusHistogram::new();
    let mut total_requests = 0_u64;
    for document in documents {
        histogram.absorb(&document.http_status);
        total_requests = total_requests.saturating_add(document.total_requests);
    }
    let errors = histogram.count_in(400 ..= 599);
    let total = count_as_f64(total_requests);
    let (error_rate, status_distribution) = if total_requests == 0 {
        (0.0, BTreeMap::new())
    } else {
        (
            count_as_f64(errors) / total,
            histogram
                .iter()
                .map(|(status, count)| (status.to_string(), count_as_f64(count) / total))
                .collect(),
        )
    };
    MergedSideChannel {
        scenario,
        execution,
        total_requests,
        error_rate,
        http_status: histogram.iter().map(|(status, count)| (status.to_string(), count)).collect(),
        status_distribution,
        latency: merge_latency(documents),
    }
}

/// Request-weighted latency merge.
fn merge_latency(documents: &[SideChannelMetrics]) -> BTreeMap<String, f64> {
    let total: f64 = documents.iter().map(|document| count_as_f64(document.total_requests)).sum();
    let mut merged = BTreeMap::new();
    if total <= 0.0 {
        return merged;
    }
    for field in LATENCY_FIELDS {
        let weighted: f64 = documents
            .iter()
            .filter_map(|document| {
                document
                    .latency_ms(field)
                    .map(|value| value * count_as_f64(document.total_requests))
            })
            .sum();
        if field == "mean_ms" || weighted > 0.0 {
            merged.insert(field.to_string(), weighted / total);
        }
    }
    let min = documents
        .iter()
        .filter_map(|document| document.latency_ms("min_ms"))
        .filter(|value| *value > 0.0)
        .reduce(f64::min)
        .unwrap_or(0.0);
    let max = documents
        .iter()
        .filter_map(|document| document.latency_ms("max_ms"))
        .fold(0.0, f64::max);
    merged.insert(String::from("min_ms"), min);
    merged.insert(String::from("max_ms"), max);
    merged
}

/// Reads scenario and execution blocks from a file without validating it.
fn first_metadata(path: &Path) -> (Value, Value) {
    let parsed = fs::read(path).ok().and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    let block = |name: &str| {
        parsed
            .as_ref()
            .and_then(|value| value.get(name))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    };
    (block("scenario"), block("execution"))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::whole_number;

    #[test]
    fn whole_numbers_reject_booleans_and_fractions() {
        assert_eq!(whole_number(&json!(12)), Some(12));
        assert_eq!(whole_number(&json!(-3)), Some(-3));
        assert_eq!(whole_number(&json!(12.0)), Some(12));
        assert_eq!(whole_number(&json!(12.5)), None);
        assert_eq!(whole_number(&json!(true)), None);
        assert_eq!(whole_number(&json!("12")), None);
    }
}
