//! HTTP and WebSocket handler definitions for the gateway.
//!
//! Defines [`AppState`] (the shared state carried through axum extractors)
//! and re-exports all handler functions for the router.

pub mod beacons;
pub mod health;
pub mod info;
pub mod query;
pub mod services;

pub use beacons::invalidate_cache_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use info::{index_handler, info_handler, service_types_handler};
pub use query::query_handler;
pub use services::{
    delete_all_services_handler, delete_service_handler, get_service_handler,
    list_services_handler, register_service_handler, update_service_handler,
};

use std::sync::Arc;
use std::time::Instant;

use crate::config::AggregatorConfig;
use crate::engine::{QueryEngine, SessionRegistry};
use crate::network::ShutdownController;
use crate::traits::{Registry, ResultCache, SecurityGate};

/// Shared application state passed to all axum handlers via `State`.
///
/// Every collaborator sits behind its seam trait so tests can substitute
/// in-memory fakes; cloning is cheap (`Arc`s all the way down).
#[derive(Clone)]
pub struct AppState {
    /// Dynamic membership registry consulted on every query.
    pub registry: Arc<dyn Registry>,
    /// Aggregated-result cache (also the target of `DELETE /beacons`).
    pub cache: Arc<dyn ResultCache>,
    /// Fan-out engine shared by the sync and streaming paths.
    pub engine: Arc<QueryEngine>,
    /// Security gate for registry-mutating calls.
    pub gate: Arc<dyn SecurityGate>,
    /// Open streaming sessions, for health reporting.
    pub sessions: Arc<SessionRegistry>,
    /// Graceful shutdown controller with in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Aggregator identity and fan-out limits.
    pub config: Arc<AggregatorConfig>,
    /// Server process start time, for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    /// Assembles the state, allocating a fresh shutdown controller and
    /// session registry.
    #[must_use]
    pub fn new(
        registry: Arc<dyn Registry>,
        cache: Arc<dyn ResultCache>,
        engine: Arc<QueryEngine>,
        gate: Arc<dyn SecurityGate>,
        config: Arc<AggregatorConfig>,
    ) -> Self {
        Self {
            registry,
            cache,
            engine,
            gate,
            sessions: Arc::new(SessionRegistry::new()),
            shutdown: Arc::new(ShutdownController::new()),
            config,
            start_time: Instant::now(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use beaconet_core::{OutcomeStatus, QueryParams, ServiceRecord};

    use super::AppState;
    use crate::cache::FingerprintCache;
    use crate::config::AggregatorConfig;
    use crate::engine::QueryEngine;
    use crate::registry::{InMemoryRegistry, NullRegistryStore};
    use crate::security::ApiKeyGate;
    use crate::traits::{DownstreamClient, ResultCache};

    /// Downstream fake: every service answers `exists: false` after a
    /// short delay.
    pub(crate) struct NotFoundClient;

    #[async_trait]
    impl DownstreamClient for NotFoundClient {
        async fn query(&self, _service: &ServiceRecord, _params: &QueryParams) -> OutcomeStatus {
            tokio::time::sleep(Duration::from_millis(1)).await;
            OutcomeStatus::NotFound
        }
    }

    /// Real registry/cache/gate wired to the fake downstream client.
    pub(crate) fn test_state() -> AppState {
        let config = Arc::new(AggregatorConfig {
            api_key: "test-api-key".to_string(),
            ..AggregatorConfig::default()
        });
        let registry = Arc::new(InMemoryRegistry::new(Arc::new(NullRegistryStore)));
        let cache: Arc<dyn ResultCache> = Arc::new(FingerprintCache::new(config.cache_capacity));
        let engine = Arc::new(QueryEngine::new(
            Arc::new(NotFoundClient),
            Arc::clone(&cache),
            Arc::clone(&config),
        ));
        AppState::new(
            registry,
            cache,
            engine,
            Arc::new(ApiKeyGate::new("test-api-key")),
            config,
        )
    }
}
