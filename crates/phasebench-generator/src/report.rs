// crates/phasebench-generator/src/report.rs
// ============================================================================
// Module: Generator Report Parser
// Description: Extracts typed measurements from wrk/wrk2 text output.
// Purpose: Parse unit-suffixed generator text exactly once at the boundary.
// Dependencies: phasebench-core
// ============================================================================

//! ## Overview
//! The generator prints a human-readable summary. This parser pulls out the
//! request count, achieved rate, latency percentiles, socket errors, and the
//! non-2xx/3xx count. Latencies are converted to milliseconds through
//! [`LatencyMs`]; nothing downstream sees unit-suffixed strings.
//!
//! Two percentile layouts are understood: the short `Latency Distribution`
//! table (`50.000%  1.15ms` in wrk2, `50%  1.15ms` in wrk) and wrk2's
//! `Detailed Percentile spectrum`, whose values are already milliseconds.
//! The spectrum only fills percentiles the short table did not print.

// ============================================================================
// SECTION: Imports
// ============================================================================

use phasebench_core::LatencyMs;
use phasebench_core::LatencyPercentiles;
use phasebench_core::SocketErrors;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Typed view of one generator text report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextReport {
    /// Completed requests.
    pub requests: u64,
    /// Achieved rate; `None` when the printed value was not numeric.
    pub rps: Option<f64>,
    /// Latency percentiles in milliseconds.
    pub latency: LatencyPercentiles,
    /// Socket error counters.
    pub socket_errors: SocketErrors,
    /// Responses outside the 2xx/3xx range.
    pub non_success: u64,
    /// Lines that looked relevant but could not be parsed.
    pub warnings: Vec<String>,
}

/// Percentiles collected by the parser.
const TRACKED_PERCENTILES: [f64; 5] = [50.0, 75.0, 90.0, 95.0, 99.0];

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a generator text report.
///
/// # Errors
///
/// Returns a message when the summary line with the request count is absent.
pub fn parse_text_report(text: &str) -> Result<TextReport, String> {
    let mut report = TextReport::default();
    let mut requests = None;
    let mut spectrum: Vec<(f64, f64)> = Vec::new();
    let mut in_spectrum = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Detailed Percentile spectrum") {
            in_spectrum = true;
            continue;
        }
        if in_spectrum {
            if let Some(row) = parse_spectrum_row(trimmed) {
                spectrum.push(row);
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with("Value") || trimmed.is_empty() {
                continue;
            }
            in_spectrum = false;
        }
        if let Some(rest) = trimmed.strip_prefix("Requests/sec:") {
            report.rps = rest.trim().parse::<f64>().ok().filter(|rate| rate.is_finite());
            if report.rps.is_none() {
                report.warnings.push(format!("achieved rate `{}` is not numeric", rest.trim()));
            }
        } else if let Some(rest) = trimmed.strip_prefix("Socket errors:") {
            report.socket_errors = parse_socket_errors(rest, &mut report.warnings);
        } else if let Some(rest) = trimmed.strip_prefix("Non-2xx or 3xx responses:") {
            match rest.trim().parse::<u64>() {
                Ok(count) => report.non_success = count,
                Err(_) => {
                    report.warnings.push(format!("unreadable non-2xx count `{}`", rest.trim()));
                }
            }
        } else if trimmed.contains(" requests in ") {
            requests =
                trimmed.split_whitespace().next().and_then(|count| count.parse::<u64>().ok());
        } else if let Some((percentile, latency)) = parse_distribution_row(trimmed) {
            match latency {
                Ok(value) => set_percentile(&mut report.latency, percentile, value.as_millis()),
                Err(message) => report.warnings.push(message),
            }
        }
    }

    report.requests = requests.ok_or_else(|| String::from("request count line not found"))?;
    fill_from_spectrum(&mut report.latency, &spectrum);
    Ok(report)
}

/// Parses `connect 0, read 1, write 0, timeout 2`.
fn parse_socket_errors(rest: &str, warnings: &mut Vec<String>) -> SocketErrors {
    let mut errors = SocketErrors::default();
    for part in rest.split(',') {
        let mut tokens = part.split_whitespace();
        let (Some(name), Some(value)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        let Ok(count) = value.parse::<u64>() else {
            warnings.push(format!("unreadable socket error count `{}`", part.trim()));
            continue;
        };
        match name {
            "connect" => errors.connect = count,
            "read" => errors.read = count,
            "write" => errors.write = count,
            "timeout" => errors.timeout = count,
            _ => {}
        }
    }
    errors
}

/// Parses a `50.000%    1.15ms` distribution row.
fn parse_distribution_row(line: &str) -> Option<(f64, Result<LatencyMs, String>)> {
    let mut tokens = line.split_whitespace();
    let percent = tokens.next()?.strip_suffix('%')?;
    let value = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    let percentile: f64 = percent.parse().ok()?;
    let latency = LatencyMs::parse(value).map_err(|err| format!("latency at {percent}%: {err}"));
    Some((percentile, latency))
}

/// Parses a spectrum row: `value percentile total_count inverse`.
fn parse_spectrum_row(line: &str) -> Option<(f64, f64)> {
    let mut tokens = line.split_whitespace();
    let value: f64 = tokens.next()?.parse().ok()?;
    let fraction: f64 = tokens.next()?.parse().ok()?;
    tokens.next()?.parse::<u64>().ok()?;
    if !(0.0 ..= 1.0).contains(&fraction) {
        return None;
    }
    Some((value, fraction * 100.0))
}

/// Stores a tracked percentile.
fn set_percentile(latency: &mut LatencyPercentiles, percentile: f64, millis: f64) {
    let slot = match percentile_slot(percentile) {
        Some(0) => &mut latency.p50,
        Some(1) => &mut latency.p75,
        Some(2) => &mut latency.p90,
        Some(3) => &mut latency.p95,
        Some(4) => &mut latency.p99,
        _ => return,
    };
    *slot = Some(millis);
}

/// Maps a percentile to its tracked index.
fn percentile_slot(percentile: f64) -> Option<usize> {
    TRACKED_PERCENTILES.iter().position(|tracked| (tracked - percentile).abs() < 1e-6)
}

/// Fills unset percentiles from the detailed spectrum.
fn fill_from_spectrum(latency: &mut LatencyPercentiles, spectrum: &[(f64, f64)]) {
    if spectrum.is_empty() {
        return;
    }
    let current = [latency.p50, latency.p75, latency.p90, latency.p95, latency.p99];
    for (tracked, existing) in TRACKED_PERCENTILES.iter().zip(current) {
        if existing.is_some() {
            continue;
        }
        let found = spectrum
            .iter()
            .find(|(_, percentile)| *percentile + 1e-9 >= *tracked)
            .and_then(|(value, _)| LatencyMs::from_millis(*value));
        if let Some(value) = found {
            set_percentile(latency, *tracked, value.as_millis());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::parse_distribution_row;
    use super::parse_spectrum_row;
    use super::percentile_slot;

    #[test]
    fn distribution_rows_require_a_percent_sign() {
        assert!(parse_distribution_row("50.000%    1.15ms").is_some());
        assert!(parse_distribution_row("Latency  1.15ms").is_none());
        assert!(parse_distribution_row("75%  2ms  extra").is_none());
    }

    #[test]
    fn spectrum_rows_need_four_numeric_columns() {
        assert_eq!(parse_spectrum_row("2.100     0.950000   5700   20.00"), Some((2.1, 95.0)));
        assert_eq!(parse_spectrum_row("Value   Percentile   TotalCount 1/(1-Percentile)"), None);
    }

    #[test]
    fn only_tracked_percentiles_have_slots() {
        assert_eq!(percentile_slot(99.0), Some(4));
        assert_eq!(percentile_slot(99.9), None);
    }
}
