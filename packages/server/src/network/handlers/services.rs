//! Service registry CRUD: `/services` and `/services/{id}`.
//!
//! Registration is gated by the host API key (`Authorization` header); all
//! later mutations present the per-service key issued at registration in
//! the `Beacon-Service-Key` header.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use beaconet_core::{ServicePatch, ServiceRecord, ServiceType};

use super::AppState;
use crate::error::ApiError;
use crate::registry::NewService;
use crate::security::{digest_key, AuthScope};

/// Header carrying the per-service mutation key.
pub const SERVICE_KEY_HEADER: &str = "beacon-service-key";

/// Pulls a credential header as a UTF-8 string, tolerating a `Bearer `
/// prefix on the `Authorization` header.
fn header_credential<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub service_type: Option<ServiceType>,
}

/// `POST /services` -- registers a downstream service.
///
/// Issues a fresh per-service key and returns it once; only its digest is
/// retained as the record's owner binding.
///
/// # Errors
///
/// `Unauthorized` without the host API key, `Conflict` on a duplicate
/// `(url, serviceType)` pair, `Validation` on a malformed payload.
pub async fn register_service_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewService>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    state.gate.authorize(
        header_credential(&headers, "authorization"),
        AuthScope::RegisterService,
    )?;

    let service_key = uuid::Uuid::new_v4().to_string();
    let record = state
        .registry
        .register(new, &digest_key(&service_key))
        .await?;
    info!(id = %record.id, service_type = record.service_type.as_str(), "service registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "service registered",
            "id": record.id,
            "serviceKey": service_key,
        })),
    ))
}

/// `GET /services` -- lists records, optionally filtered by
/// `?serviceType=`.
pub async fn list_services_handler(
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Json<Vec<ServiceRecord>> {
    Json(state.registry.list(filter.service_type).await)
}

/// `GET /services/{id}` -- fetches one record.
///
/// # Errors
///
/// `NotFound` for unknown ids.
pub async fn get_service_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceRecord>, ApiError> {
    Ok(Json(state.registry.get(&id).await?))
}

/// `PUT /services/{id}` -- owner-scoped partial update.
///
/// # Errors
///
/// `Unauthorized` without a service key, `Forbidden` when the key does not
/// own the record, `NotFound` for unknown ids, `Validation` for an empty
/// patch or malformed url.
pub async fn update_service_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<ServicePatch>,
) -> Result<StatusCode, ApiError> {
    let owner = state.gate.authorize(
        header_credential(&headers, SERVICE_KEY_HEADER),
        AuthScope::MutateService,
    )?;
    if patch.is_empty() {
        return Err(ApiError::Validation("patch contains no fields".to_string()));
    }
    state.registry.update(&id, owner.as_str(), patch).await?;
    info!(%id, "service updated");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /services/{id}` -- owner-scoped single delete.
///
/// # Errors
///
/// As for [`update_service_handler`], minus `Validation`.
pub async fn delete_service_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let owner = state.gate.authorize(
        header_credential(&headers, SERVICE_KEY_HEADER),
        AuthScope::MutateService,
    )?;
    state.registry.delete(&id, owner.as_str()).await?;
    info!(%id, "service deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /services` -- removes every record owned by the presented key.
/// Removing zero records still answers 204.
///
/// # Errors
///
/// `Unauthorized` without a service key.
pub async fn delete_all_services_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let owner = state.gate.authorize(
        header_credential(&headers, SERVICE_KEY_HEADER),
        AuthScope::MutateService,
    )?;
    let removed = state.registry.delete_all(owner.as_str()).await?;
    info!(removed, "bulk service delete");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::super::tests::test_state;
    use super::*;

    fn payload(name: &str, url: &str) -> NewService {
        NewService {
            name: name.to_string(),
            service_type: ServiceType::GA4GHBeacon,
            url: url.to_string(),
            api_version: "1.0.0".to_string(),
        }
    }

    fn auth_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    fn key_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SERVICE_KEY_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn register(state: &AppState, name: &str, url: &str) -> (String, String) {
        let (status, Json(body)) = register_service_handler(
            State(state.clone()),
            auth_headers("test-api-key"),
            Json(payload(name, url)),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        (
            body["id"].as_str().unwrap().to_string(),
            body["serviceKey"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn register_returns_id_and_service_key_once() {
        let state = test_state();
        let (id, key) = register(&state, "b1", "https://b1.example.org").await;
        assert!(!id.is_empty());
        assert!(!key.is_empty());

        // The raw key is never stored, only its digest.
        let record = state.registry.get(&id).await.unwrap();
        assert_eq!(record.owner_key_hash, digest_key(&key));
        assert_ne!(record.owner_key_hash, key);
    }

    #[tokio::test]
    async fn register_without_api_key_is_unauthorized() {
        let state = test_state();
        let err = register_service_handler(
            State(state.clone()),
            HeaderMap::new(),
            Json(payload("b1", "https://b1.example.org")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = register_service_handler(
            State(state),
            auth_headers("wrong-key"),
            Json(payload("b1", "https://b1.example.org")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bearer_prefix_is_accepted() {
        let state = test_state();
        let result = register_service_handler(
            State(state),
            auth_headers("Bearer test-api-key"),
            Json(payload("b1", "https://b1.example.org")),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let state = test_state();
        register(&state, "b1", "https://b1.example.org").await;
        let err = register_service_handler(
            State(state),
            auth_headers("test-api-key"),
            Json(payload("other name", "https://b1.example.org")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn list_filters_by_service_type() {
        let state = test_state();
        register(&state, "b1", "https://b1.example.org").await;
        register(&state, "b2", "https://b2.example.org").await;

        let Json(all) = list_services_handler(
            State(state.clone()),
            Query(ListFilter { service_type: None }),
        )
        .await;
        assert_eq!(all.len(), 2);

        let Json(none) = list_services_handler(
            State(state),
            Query(ListFilter {
                service_type: Some(ServiceType::GA4GHRegistry),
            }),
        )
        .await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn get_unknown_id_is_404() {
        let state = test_state();
        let err = get_service_handler(State(state), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_requires_the_owning_service_key() {
        let state = test_state();
        let (id, key) = register(&state, "b1", "https://b1.example.org").await;

        let patch = ServicePatch {
            name: Some("renamed".to_string()),
            ..ServicePatch::default()
        };

        let err = update_service_handler(
            State(state.clone()),
            Path(id.clone()),
            key_headers("not-the-key"),
            Json(patch.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let status = update_service_handler(
            State(state.clone()),
            Path(id.clone()),
            key_headers(&key),
            Json(patch),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(state.registry.get(&id).await.unwrap().name, "renamed");
    }

    #[tokio::test]
    async fn empty_patch_is_a_validation_error() {
        let state = test_state();
        let (id, key) = register(&state, "b1", "https://b1.example.org").await;
        let err = update_service_handler(
            State(state),
            Path(id),
            key_headers(&key),
            Json(ServicePatch::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_is_owner_scoped() {
        let state = test_state();
        let (id, key) = register(&state, "b1", "https://b1.example.org").await;

        let err = delete_service_handler(
            State(state.clone()),
            Path(id.clone()),
            key_headers("not-the-key"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let status = delete_service_handler(State(state.clone()), Path(id.clone()), key_headers(&key))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.registry.get(&id).await.is_err());
    }

    #[tokio::test]
    async fn bulk_delete_removes_only_owned_records() {
        let state = test_state();
        let (_id1, key1) = register(&state, "b1", "https://b1.example.org").await;
        let (id2, _key2) = register(&state, "b2", "https://b2.example.org").await;

        let status = delete_all_services_handler(State(state.clone()), key_headers(&key1))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let remaining = state.registry.list(None).await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, id2);
    }
}
