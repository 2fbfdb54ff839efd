//! Wire message schemas for the streaming query session.
//!
//! Frames are JSON objects discriminated by a `type` field. A session is a
//! sequence of `outcome` frames (one per service, arrival order) terminated
//! by exactly one `complete` frame; nothing follows completion.

use serde::{Deserialize, Serialize};

use crate::outcome::{ResultSummary, ServiceOutcome};

/// One framed message on a streaming query session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamFrame {
    /// A single settled sub-query, forwarded as soon as it is classified.
    Outcome(ServiceOutcome),
    /// Terminal marker: every dispatched sub-query has settled or been
    /// abandoned at the deadline.
    Complete { summary: ResultSummary },
}

impl StreamFrame {
    /// Serializes the frame to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (only possible if a payload
    /// contains a non-string map key, which the gateway never produces).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
