//! Streaming session manager.
//!
//! A [`StreamSession`] runs the engine's fan-out on a spawned task and
//! forwards each outcome over a bounded channel as soon as it is classified,
//! followed by exactly one completion frame. Dropping the session aborts the
//! task, which is how client disconnects cancel still-pending sub-queries
//! (best-effort: in-flight network calls are abandoned, not remotely
//! stopped). Sessions never touch the result cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use beaconet_core::{AggregatedResult, QueryParams, RegistrySnapshot, StreamFrame};

use super::QueryEngine;

/// One open streaming query.
pub struct StreamSession {
    rx: mpsc::Receiver<StreamFrame>,
    task: JoinHandle<()>,
}

impl StreamSession {
    /// Opens a session: spawns the fan-out and starts delivering frames.
    ///
    /// The fan-out is identical to the synchronous path but uncached -- each
    /// open stream queries every service afresh.
    #[must_use]
    pub fn open(
        engine: Arc<QueryEngine>,
        query: QueryParams,
        snapshot: RegistrySnapshot,
        channel_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let task = tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + engine.config().query_deadline;
            let fingerprint = query.fingerprint();
            let outcomes = engine.fan_out(&query, &snapshot, deadline, Some(&tx)).await;
            let summary =
                AggregatedResult::new(fingerprint, snapshot.version, outcomes).summary;
            // Terminal marker; nothing is sent after this.
            let _ = tx.send(StreamFrame::Complete { summary }).await;
            debug!(%fingerprint, total = summary.total, "stream session complete");
        });
        Self { rx, task }
    }

    /// Next frame, or `None` once the session has delivered its completion
    /// frame (or was cancelled).
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        self.rx.recv().await
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Tracks open streaming sessions for health reporting.
///
/// Lock-free via `DashMap`; entries record when each session was opened.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<u64, Instant>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly opened session, returning its id.
    pub fn open(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(id, Instant::now());
        id
    }

    /// Removes a closed session. Unknown ids are a no-op.
    pub fn close(&self, id: u64) {
        self.sessions.remove(&id);
    }

    /// Number of currently open sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}
