//! Greeting, host self-description, and service-type taxonomy endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::json;
use tracing::debug;

use beaconet_core::ServiceType;

use super::AppState;

/// `GET /` -- greeting.
pub async fn index_handler() -> &'static str {
    "Beaconet GA4GH Beacon Aggregator API"
}

/// `GET /info` -- GA4GH service-info style host self-description.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    debug!("GET /info received");
    let snapshot = state.registry.snapshot();
    Json(json!({
        "id": state.config.host_id,
        "name": state.config.name,
        "serviceType": ServiceType::GA4GHBeaconAggregator.as_str(),
        "apiVersion": state.config.api_version,
        "serviceCount": snapshot.services.len(),
        "registryVersion": snapshot.version,
    }))
}

/// `GET /servicetypes` -- the known service type taxonomy.
pub async fn service_types_handler() -> Json<Vec<&'static str>> {
    debug!("GET /servicetypes received");
    Json(ServiceType::ALL.iter().map(|ty| ty.as_str()).collect())
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_state;
    use super::*;

    #[tokio::test]
    async fn index_greets() {
        assert!(index_handler().await.contains("Beacon Aggregator"));
    }

    #[tokio::test]
    async fn info_reports_identity_and_registry_state() {
        let state = test_state();
        let body = info_handler(State(state)).await.0;
        assert_eq!(body["id"], "org.beaconet.aggregator");
        assert_eq!(body["serviceType"], "GA4GHBeaconAggregator");
        assert_eq!(body["serviceCount"], 0);
        assert_eq!(body["registryVersion"], 0);
    }

    #[tokio::test]
    async fn service_types_lists_full_taxonomy() {
        let types = service_types_handler().await.0;
        assert_eq!(
            types,
            vec!["GA4GHRegistry", "GA4GHBeacon", "GA4GHBeaconAggregator"]
        );
    }
}
