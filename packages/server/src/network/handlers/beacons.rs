//! Wholesale cache invalidation endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use tracing::debug;

use super::AppState;

/// `DELETE /beacons` -- drops every cached aggregate, covering downstream
/// content changes that happen without a registry mutation.
pub async fn invalidate_cache_handler(State(state): State<AppState>) -> StatusCode {
    debug!("DELETE /beacons received");
    state.cache.invalidate_all();
    StatusCode::NO_CONTENT
}
