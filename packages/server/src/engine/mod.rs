//! Query fan-out and aggregation engine.
//!
//! Given a query and a registry snapshot, the engine issues one sub-query
//! per service concurrently, classifies every completion into a
//! `ServiceOutcome`, and assembles the aggregated result. Per-service
//! isolation is the central robustness property: one slow or broken
//! downstream node never blocks or corrupts the result for the others, and
//! no downstream failure is ever escalated to a request-level error.

pub mod client;
pub mod session;

pub use client::HttpDownstreamClient;
pub use session::{SessionRegistry, StreamSession};

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use beaconet_core::{
    AggregatedResult, OutcomeStatus, QueryParams, RegistrySnapshot, ServiceOutcome, StreamFrame,
};

use crate::config::AggregatorConfig;
use crate::traits::{DownstreamClient, ResultCache};

/// Fan-out engine shared by the synchronous and streaming query paths.
pub struct QueryEngine {
    client: Arc<dyn DownstreamClient>,
    cache: Arc<dyn ResultCache>,
    config: Arc<AggregatorConfig>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(
        client: Arc<dyn DownstreamClient>,
        cache: Arc<dyn ResultCache>,
        config: Arc<AggregatorConfig>,
    ) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }

    /// Engine configuration (timeouts, concurrency cap).
    #[must_use]
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Runs one synchronous query: cache lookup, fan-out on miss, cache
    /// store, aggregated result.
    ///
    /// An empty snapshot yields a zero-outcome result, never an error.
    pub async fn execute(
        &self,
        query: &QueryParams,
        snapshot: &RegistrySnapshot,
        deadline: Instant,
    ) -> Arc<AggregatedResult> {
        let fingerprint = query.fingerprint();
        if let Some(cached) = self.cache.get(fingerprint, snapshot.version) {
            debug!(%fingerprint, version = snapshot.version, "returning cached aggregate");
            return cached;
        }

        let outcomes = self.fan_out(query, snapshot, deadline, None).await;
        let result = Arc::new(AggregatedResult::new(
            fingerprint,
            snapshot.version,
            outcomes,
        ));
        self.cache
            .put(fingerprint, snapshot.version, Arc::clone(&result));
        result
    }

    /// Dispatches one sub-query per service and collects classified
    /// outcomes, optionally forwarding each to a streaming session as it
    /// settles.
    ///
    /// Dispatch follows snapshot listing order; completion order is
    /// network-latency dependent. Sub-queries still pending at `deadline`
    /// are recorded as `Timeout` and abandoned -- their eventual results are
    /// discarded when the in-flight futures are dropped.
    ///
    /// Returns exactly one outcome per service, in snapshot order.
    pub(crate) async fn fan_out(
        &self,
        query: &QueryParams,
        snapshot: &RegistrySnapshot,
        deadline: Instant,
        tx: Option<&mpsc::Sender<StreamFrame>>,
    ) -> Vec<ServiceOutcome> {
        let mut settled: HashMap<String, OutcomeStatus> =
            HashMap::with_capacity(snapshot.services.len());

        {
            let per_service_timeout = self.config.per_service_timeout;
            let subqueries = snapshot.services.iter().cloned().map(|service| {
                let client = Arc::clone(&self.client);
                let query = query.clone();
                async move {
                    let status =
                        match tokio::time::timeout(per_service_timeout, client.query(&service, &query))
                            .await
                        {
                            Ok(status) => status,
                            Err(_elapsed) => OutcomeStatus::Timeout,
                        };
                    (service.id, status)
                }
            });
            let mut completions =
                futures_util::stream::iter(subqueries).buffer_unordered(self.config.max_concurrency);

            let drain = async {
                while let Some((service_id, status)) = completions.next().await {
                    counter!("beaconet_subqueries_total", "outcome" => status.label())
                        .increment(1);
                    if let Some(tx) = tx {
                        // A closed channel means the client went away; keep
                        // settling so the bookkeeping stays complete.
                        let _ = tx
                            .send(StreamFrame::Outcome(ServiceOutcome {
                                service_id: service_id.clone(),
                                status: status.clone(),
                            }))
                            .await;
                    }
                    settled.insert(service_id, status);
                }
            };

            if tokio::time::timeout_at(deadline, drain).await.is_err() {
                debug!(
                    settled = settled.len(),
                    total = snapshot.services.len(),
                    "overall deadline reached, abandoning pending sub-queries"
                );
            }
        }

        // Assemble in snapshot order; anything unsettled at the deadline is
        // a timeout and still owes the stream a frame.
        let mut outcomes = Vec::with_capacity(snapshot.services.len());
        for service in &snapshot.services {
            let status = match settled.remove(&service.id) {
                Some(status) => status,
                None => {
                    counter!("beaconet_subqueries_total", "outcome" => "timeout").increment(1);
                    if let Some(tx) = tx {
                        let _ = tx
                            .send(StreamFrame::Outcome(ServiceOutcome {
                                service_id: service.id.clone(),
                                status: OutcomeStatus::Timeout,
                            }))
                            .await;
                    }
                    OutcomeStatus::Timeout
                }
            };
            outcomes.push(ServiceOutcome {
                service_id: service.id.clone(),
                status,
            });
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use beaconet_core::{ServiceRecord, ServiceType};

    use super::*;
    use crate::cache::FingerprintCache;

    /// Programmable downstream fake: per-service delay and canned status.
    pub(crate) struct FakeClient {
        behaviors: HashMap<String, (Duration, OutcomeStatus)>,
        calls: AtomicUsize,
    }

    impl FakeClient {
        pub(crate) fn new(behaviors: &[(&str, Duration, OutcomeStatus)]) -> Self {
            Self {
                behaviors: behaviors
                    .iter()
                    .map(|(id, delay, status)| ((*id).to_string(), (*delay, status.clone())))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl DownstreamClient for FakeClient {
        async fn query(&self, service: &ServiceRecord, _params: &QueryParams) -> OutcomeStatus {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.behaviors.get(&service.id) {
                Some((delay, status)) => {
                    tokio::time::sleep(*delay).await;
                    status.clone()
                }
                None => OutcomeStatus::NotFound,
            }
        }
    }

    pub(crate) fn snapshot_of(ids: &[&str], version: u64) -> RegistrySnapshot {
        RegistrySnapshot {
            version,
            services: ids
                .iter()
                .map(|id| ServiceRecord {
                    id: (*id).to_string(),
                    name: (*id).to_string(),
                    service_type: ServiceType::GA4GHBeacon,
                    url: format!("https://{id}.example.org/"),
                    api_version: "1.0.0".to_string(),
                    owner_key_hash: "owner".to_string(),
                    registered_at: 0,
                    updated_at: 0,
                })
                .collect(),
        }
    }

    pub(crate) fn query() -> QueryParams {
        QueryParams::new([("referenceName", "1"), ("start", "3056601"), ("assemblyId", "GRCh38")])
    }

    fn found() -> OutcomeStatus {
        OutcomeStatus::Found {
            payload: serde_json::json!({"exists": true}),
        }
    }

    fn engine_with(client: Arc<FakeClient>, config: AggregatorConfig) -> QueryEngine {
        let config = Arc::new(config);
        QueryEngine::new(
            client,
            Arc::new(FingerprintCache::new(config.cache_capacity)),
            config,
        )
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test(start_paused = true)]
    async fn one_outcome_per_service_no_duplicates() {
        let client = Arc::new(FakeClient::new(&[
            ("a", Duration::from_millis(10), found()),
            ("b", Duration::from_millis(20), OutcomeStatus::NotFound),
            ("c", Duration::from_millis(5), OutcomeStatus::Unreachable),
        ]));
        let engine = engine_with(Arc::clone(&client), AggregatorConfig::default());
        let snapshot = snapshot_of(&["a", "b", "c"], 1);

        let result = engine.execute(&query(), &snapshot, far_deadline()).await;

        assert_eq!(result.outcomes.len(), 3);
        let mut ids: Vec<&str> = result.outcomes.iter().map(|o| o.service_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(result.summary.found, 1);
        assert_eq!(result.summary.not_found, 1);
        assert_eq!(result.summary.errors, 1);
    }

    #[tokio::test]
    async fn empty_snapshot_yields_empty_result() {
        let client = Arc::new(FakeClient::new(&[]));
        let engine = engine_with(Arc::clone(&client), AggregatorConfig::default());

        let result = engine
            .execute(&query(), &RegistrySnapshot::empty(), far_deadline())
            .await;

        assert!(result.outcomes.is_empty());
        assert_eq!(result.summary.total, 0);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_service_times_out_without_blocking_others() {
        let client = Arc::new(FakeClient::new(&[
            ("fast", Duration::from_millis(10), found()),
            ("hangs", Duration::from_secs(3600), found()),
        ]));
        let config = AggregatorConfig {
            per_service_timeout: Duration::from_millis(100),
            ..AggregatorConfig::default()
        };
        let engine = engine_with(client, config);
        let snapshot = snapshot_of(&["fast", "hangs"], 1);

        let result = engine.execute(&query(), &snapshot, far_deadline()).await;

        assert!(matches!(result.outcomes[0].status, OutcomeStatus::Found { .. }));
        assert_eq!(result.outcomes[1].status, OutcomeStatus::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_abandons_pending_subqueries() {
        let client = Arc::new(FakeClient::new(&[
            ("fast", Duration::from_millis(10), found()),
            ("slow", Duration::from_secs(20), found()),
        ]));
        let config = AggregatorConfig {
            per_service_timeout: Duration::from_secs(60),
            ..AggregatorConfig::default()
        };
        let engine = engine_with(client, config);
        let snapshot = snapshot_of(&["fast", "slow"], 1);

        let deadline = Instant::now() + Duration::from_millis(500);
        let result = engine.execute(&query(), &snapshot, deadline).await;

        assert_eq!(result.outcomes.len(), 2);
        assert!(matches!(result.outcomes[0].status, OutcomeStatus::Found { .. }));
        assert_eq!(result.outcomes[1].status, OutcomeStatus::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_query_same_version_is_served_from_cache() {
        let client = Arc::new(FakeClient::new(&[(
            "a",
            Duration::from_millis(1),
            found(),
        )]));
        let engine = engine_with(Arc::clone(&client), AggregatorConfig::default());
        let snapshot = snapshot_of(&["a"], 1);

        engine.execute(&query(), &snapshot, far_deadline()).await;
        assert_eq!(client.calls(), 1);

        engine.execute(&query(), &snapshot, far_deadline()).await;
        assert_eq!(client.calls(), 1, "second execute must hit the cache");
    }

    #[tokio::test(start_paused = true)]
    async fn registry_mutation_invalidates_prior_cache_entries() {
        let client = Arc::new(FakeClient::new(&[(
            "a",
            Duration::from_millis(1),
            found(),
        )]));
        let engine = engine_with(Arc::clone(&client), AggregatorConfig::default());

        engine
            .execute(&query(), &snapshot_of(&["a"], 1), far_deadline())
            .await;
        // Same membership, advanced version: the old entry is unreachable.
        let result = engine
            .execute(&query(), &snapshot_of(&["a"], 2), far_deadline())
            .await;

        assert_eq!(client.calls(), 2);
        assert_eq!(result.registry_version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_all_forces_a_fresh_fan_out() {
        let client = Arc::new(FakeClient::new(&[(
            "a",
            Duration::from_millis(1),
            found(),
        )]));
        let cache = Arc::new(FingerprintCache::new(16));
        let engine = QueryEngine::new(
            Arc::clone(&client) as Arc<dyn DownstreamClient>,
            Arc::clone(&cache) as Arc<dyn ResultCache>,
            Arc::new(AggregatorConfig::default()),
        );
        let snapshot = snapshot_of(&["a"], 1);

        engine.execute(&query(), &snapshot, far_deadline()).await;
        cache.invalidate_all();
        engine.execute(&query(), &snapshot, far_deadline()).await;

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_cap_still_settles_every_service() {
        let behaviors: Vec<(String, Duration, OutcomeStatus)> = (0..20)
            .map(|i| (format!("s{i}"), Duration::from_millis(5), OutcomeStatus::NotFound))
            .collect();
        let refs: Vec<(&str, Duration, OutcomeStatus)> = behaviors
            .iter()
            .map(|(id, d, s)| (id.as_str(), *d, s.clone()))
            .collect();
        let client = Arc::new(FakeClient::new(&refs));
        let config = AggregatorConfig {
            max_concurrency: 3,
            ..AggregatorConfig::default()
        };
        let engine = engine_with(Arc::clone(&client), config);
        let ids: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let result = engine
            .execute(&query(), &snapshot_of(&id_refs, 1), far_deadline())
            .await;

        assert_eq!(result.outcomes.len(), 20);
        assert_eq!(client.calls(), 20);
        assert_eq!(result.summary.not_found, 20);
    }
}
