//! Health, liveness, and readiness endpoints.
//!
//! Orchestrators probe these; the detailed health body additionally reports
//! gateway-specific gauges (registry version, open streams, cached
//! aggregates) for operational monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::network::HealthState;

/// `GET /health` -- detailed health JSON.
///
/// Always 200; the `state` field distinguishes "up but draining" from
/// healthy.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": state.shutdown.health_state().as_str(),
        "inFlight": state.shutdown.in_flight_count(),
        "openStreams": state.sessions.count(),
        "registryVersion": state.registry.version(),
        "cachedResults": state.cache.len(),
        "uptimeSecs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe -- 200 whenever the process responds. Checks nothing
/// downstream, because a failed liveness probe triggers a restart.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe -- 200 when `Ready`, 503 during startup and drain.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
