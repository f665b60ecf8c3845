// crates/phasebench-core/src/runtime/invariants.rs
// ============================================================================
// Module: Invariant Validator
// Description: Cross-field consistency rules over metrics documents.
// Purpose: Report every violated invariant of a document in one pass.
// Dependencies: serde, crate::core::document
// ============================================================================

//! ## Overview
//! Every [`Invariant`] is evaluated, even after an earlier one fails, so one
//! validation reports all problems at once. The built-in invariants only
//! apply when the document records at least one completed request.
//!
//! ## Invariants
//! - status coverage: the status histogram sums to the request count,
//! - error-rate consistency: the recorded error rate matches the breakdown
//!   within [`ERROR_RATE_EPSILON`],
//! - percentile completeness: p50 and p99 are present and positive,
//! - protocol contract: a `put_update` scenario records no 400 responses.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::document::MetricsDocument;
use crate::core::document::ScenarioContract;
use crate::core::measurement::count_as_f64;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum tolerated drift between the recorded and recomputed error rate.
pub const ERROR_RATE_EPSILON: f64 = 1e-6;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One violated invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Invariant name.
    pub invariant: &'static str,
    /// Violation description naming the offending values.
    pub message: String,
}

/// Pass/fail status of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// No violations.
    Pass,
    /// At least one violation.
    Fail,
}

/// Validation report for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    /// Overall status.
    pub status: ValidationStatus,
    /// Invariants evaluated, in order.
    pub checked: Vec<&'static str>,
    /// Violations in evaluation order.
    pub violations: Vec<InvariantViolation>,
}

impl InvariantReport {
    /// Returns true when no invariant was violated.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ValidationStatus::Pass
    }
}

/// Named predicate over a metrics document.
pub trait Invariant {
    /// Returns the invariant name.
    fn name(&self) -> &'static str;

    /// Checks the document, returning a violation message when it fails.
    fn check(&self, document: &MetricsDocument) -> Option<String>;
}

// ============================================================================
// SECTION: Built-in Invariants
// ============================================================================

/// The status histogram must sum to the request count.
pub struct StatusCoverage;

impl Invariant for StatusCoverage {
    fn name(&self) -> &'static str {
        "status_coverage"
    }

    fn check(&self, document: &MetricsDocument) -> Option<String> {
        let requests = document.results.requests;
        if requests == 0 {
            return None;
        }
        let covered = document.errors.http_status.total();
        (covered != requests).then(|| {
            format!("http_status covers {covered}/{requests} requests (sum must equal requests)")
        })
    }
}

/// The recorded error rate must match the error breakdown.
pub struct ErrorRateConsistency;

impl Invariant for ErrorRateConsistency {
    fn name(&self) -> &'static str {
        "error_rate_consistency"
    }

    fn check(&self, document: &MetricsDocument) -> Option<String> {
        let requests = document.results.requests;
        if requests == 0 {
            return None;
        }
        let errors = &document.errors;
        let counted = errors
            .http_4xx
            .saturating_add(errors.http_5xx)
            .saturating_add(errors.socket_errors_total);
        let expected = count_as_f64(counted) / count_as_f64(requests);
        match document.results.error_rate {
            None => Some(format!("error_rate is null with {requests} requests")),
            Some(recorded) if !recorded.is_finite() => {
                Some(format!("error_rate {recorded} is not a finite number"))
            }
            Some(recorded) if (recorded - expected).abs() > ERROR_RATE_EPSILON => Some(format!(
                "error_rate {recorded} differs from (4xx {} + 5xx {} + socket {})/{requests} = \
                 {expected}",
                errors.http_4xx, errors.http_5xx, errors.socket_errors_total
            )),
            Some(_) => None,
        }
    }
}

/// p50 and p99 must be present and positive.
pub struct PercentileCompleteness;

impl Invariant for PercentileCompleteness {
    fn name(&self) -> &'static str {
        "percentile_completeness"
    }

    fn check(&self, document: &MetricsDocument) -> Option<String> {
        let requests = document.results.requests;
        if requests == 0 {
            return None;
        }
        let latency = &document.results.latency_ms;
        let missing: Vec<&str> = [("p50", latency.p50), ("p99", latency.p99)]
            .into_iter()
            .filter(|(_, value)| !value.is_some_and(|ms| ms.is_finite() && ms > 0.0))
            .map(|(name, _)| name)
            .collect();
        (!missing.is_empty()).then(|| {
            format!("{} missing or non-positive with {requests} requests", missing.join(" and "))
        })
    }
}

/// Scenario protocol contracts must hold.
pub struct ProtocolContract;

impl Invariant for ProtocolContract {
    fn name(&self) -> &'static str {
        "protocol_contract"
    }

    fn check(&self, document: &MetricsDocument) -> Option<String> {
        if document.results.requests == 0 {
            return None;
        }
        match document.scenario.contract {
            Some(ScenarioContract::PutUpdate) => {
                let bad_requests = document.errors.http_status.count(400);
                (bad_requests > 0).then(|| {
                    format!("put_update scenario recorded {bad_requests} responses with status 400")
                })
            }
            None => None,
        }
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Evaluates a fixed set of invariants exhaustively.
pub struct InvariantValidator {
    /// Invariants in evaluation order.
    invariants: Vec<Box<dyn Invariant + Send + Sync>>,
}

impl InvariantValidator {
    /// Creates a validator with the given invariants.
    #[must_use]
    pub fn new(invariants: Vec<Box<dyn Invariant + Send + Sync>>) -> Self {
        Self {
            invariants,
        }
    }

    /// Evaluates every invariant against `document`.
    #[must_use]
    pub fn validate(&self, document: &MetricsDocument) -> InvariantReport {
        let mut checked = Vec::with_capacity(self.invariants.len());
        let mut violations = Vec::new();
        for invariant in &self.invariants {
            checked.push(invariant.name());
            if let Some(message) = invariant.check(document) {
                violations.push(InvariantViolation {
                    invariant: invariant.name(),
                    message,
                });
            }
        }
        let status =
            if violations.is_empty() { ValidationStatus::Pass } else { ValidationStatus::Fail };
        InvariantReport {
            status,
            checked,
            violations,
        }
    }
}

impl Default for InvariantValidator {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StatusCoverage),
            Box::new(ErrorRateConsistency),
            Box::new(PercentileCompleteness),
            Box::new(ProtocolContract),
        ])
    }
}

// ============================================================================
// SECTION: Tree Summary
// ============================================================================

/// Pass/fail counts across a tree of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TreeSummary {
    /// Documents that passed.
    pub passed: usize,
    /// Documents that failed.
    pub failed: usize,
}

impl TreeSummary {
    /// Records one document outcome.
    pub const fn record(&mut self, passed: bool) {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Returns the number of documents recorded.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// Returns true when at least one document was recorded and none failed.
    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0 && self.passed > 0
    }
}
