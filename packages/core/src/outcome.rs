//! Per-service outcomes and the aggregated query result.
//!
//! Every sub-query settles as exactly one [`ServiceOutcome`]; downstream
//! failures are captured here and never escalated to request-level errors.

use serde::{Deserialize, Serialize};

use crate::fingerprint::QueryFingerprint;

/// Classification of a single sub-query completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OutcomeStatus {
    /// The service answered within schema and reported a hit.
    Found {
        /// The service's own response body, passed through verbatim.
        payload: serde_json::Value,
    },
    /// The service answered within schema and reported no hit.
    NotFound,
    /// The service did not answer within its timeout, or was still pending
    /// at the overall deadline.
    Timeout,
    /// The connection could not be established.
    Unreachable,
    /// The service answered, but the body failed structural validation.
    MalformedResponse,
    /// Any other failure, with detail for operators.
    Error {
        detail: String,
    },
}

impl OutcomeStatus {
    /// Short label for logging and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Found { .. } => "found",
            OutcomeStatus::NotFound => "not_found",
            OutcomeStatus::Timeout => "timeout",
            OutcomeStatus::Unreachable => "unreachable",
            OutcomeStatus::MalformedResponse => "malformed",
            OutcomeStatus::Error { .. } => "error",
        }
    }
}

/// One settled sub-query, tagged with the service it came from so clients
/// can correlate out-of-order arrivals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOutcome {
    pub service_id: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// Summary counts across all outcomes of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
}

/// The aggregated answer for one query against one registry snapshot.
///
/// Outcomes are kept in dispatch (registration) order; callers must not
/// read any priority into the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub fingerprint: QueryFingerprint,
    pub registry_version: u64,
    pub outcomes: Vec<ServiceOutcome>,
    pub summary: ResultSummary,
}

impl AggregatedResult {
    /// Assembles a result from settled outcomes, computing the summary.
    #[must_use]
    pub fn new(
        fingerprint: QueryFingerprint,
        registry_version: u64,
        outcomes: Vec<ServiceOutcome>,
    ) -> Self {
        let mut summary = ResultSummary {
            total: outcomes.len(),
            ..ResultSummary::default()
        };
        for outcome in &outcomes {
            match outcome.status {
                OutcomeStatus::Found { .. } => summary.found += 1,
                OutcomeStatus::NotFound => summary.not_found += 1,
                _ => summary.errors += 1,
            }
        }
        Self {
            fingerprint,
            registry_version,
            outcomes,
            summary,
        }
    }
}
