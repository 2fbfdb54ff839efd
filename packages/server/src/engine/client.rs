//! HTTP downstream client with outcome classification.
//!
//! Issues Beacon v1 style `GET {service.url}query?...` requests and
//! classifies every completion: a JSON body carrying a boolean `exists`
//! field is in-schema (`Found`/`NotFound`); anything else the service says
//! is `MalformedResponse`; transport failures map to `Timeout` or
//! `Unreachable`. Classification never fails -- the caller always receives
//! exactly one status.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use beaconet_core::{OutcomeStatus, QueryParams, ServiceRecord};

use crate::traits::DownstreamClient;

/// Production [`DownstreamClient`] backed by a shared `reqwest` client.
pub struct HttpDownstreamClient {
    http: reqwest::Client,
}

impl HttpDownstreamClient {
    /// Builds a client whose requests are individually bounded by
    /// `request_timeout`. The fan-out applies its own per-service timeout on
    /// top; this one guards against responses that trickle forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(request_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Query endpoint for a service: its base URL with `query` appended.
    fn query_url(service: &ServiceRecord) -> String {
        let base = service.url.trim_end_matches('/');
        format!("{base}/query")
    }
}

#[async_trait]
impl DownstreamClient for HttpDownstreamClient {
    async fn query(&self, service: &ServiceRecord, params: &QueryParams) -> OutcomeStatus {
        let url = Self::query_url(service);
        let response = match self.http.get(&url).query(params.params()).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                debug!(service = %service.id, "sub-query timed out");
                return OutcomeStatus::Timeout;
            }
            Err(err) if err.is_connect() => {
                debug!(service = %service.id, "sub-query could not connect");
                return OutcomeStatus::Unreachable;
            }
            Err(err) => {
                return OutcomeStatus::Error {
                    detail: err.to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return OutcomeStatus::Error {
                detail: format!("unexpected http status {status}"),
            };
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => match body.get("exists").and_then(serde_json::Value::as_bool) {
                Some(true) => OutcomeStatus::Found { payload: body },
                Some(false) => OutcomeStatus::NotFound,
                // In-schema responses carry a boolean `exists`.
                None => OutcomeStatus::MalformedResponse,
            },
            Err(_) => OutcomeStatus::MalformedResponse,
        }
    }
}
