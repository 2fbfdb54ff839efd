//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` takes the assembled
//! application state, `start()` binds the TCP listener, and `serve()`
//! starts accepting connections. The split lets callers learn the bound
//! port (ephemeral ports in tests) before any request is accepted.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::routing::{delete, get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    delete_all_services_handler, delete_service_handler, get_service_handler, health_handler,
    index_handler, info_handler, invalidate_cache_handler, list_services_handler,
    liveness_handler, query_handler, readiness_handler, register_service_handler,
    service_types_handler, update_service_handler, AppState,
};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

/// Manages the full HTTP/WebSocket server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- takes the configuration and shared application state
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- accepts connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, state: AppState) -> Self {
        Self {
            config,
            state,
            listener: None,
        }
    }

    /// Shared reference to the shutdown controller, for signal wiring.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /` -- greeting
    /// - `GET /query` -- fan-out query (WebSocket upgrade for streaming)
    /// - `DELETE /beacons` -- invalidate the result cache
    /// - `GET /info` -- aggregator self-description
    /// - `GET /servicetypes` -- service type taxonomy
    /// - `POST|GET|DELETE /services`, `GET|PUT|DELETE /services/{id}` --
    ///   registry CRUD
    /// - `GET /health[/live|/ready]` -- health and probe endpoints
    pub fn build_router(&self) -> Router {
        let layers = build_http_layers(&self.config);

        Router::new()
            .route("/", get(index_handler))
            .route(
                "/query",
                // `WebSocketUpgrade` has no `OptionalFromRequestParts` impl in
                // axum 0.8, so the optional upgrade is extracted as a
                // `Result` here and narrowed to the handler's `Option`.
                get(
                    |state: State<AppState>,
                     query: Query<Vec<(String, String)>>,
                     ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>| {
                        query_handler(state, query, ws.ok())
                    },
                ),
            )
            .route("/beacons", delete(invalidate_cache_handler))
            .route("/info", get(info_handler))
            .route("/servicetypes", get(service_types_handler))
            .route(
                "/services",
                post(register_service_handler)
                    .get(list_services_handler)
                    .delete(delete_all_services_handler),
            )
            .route(
                "/services/{id}",
                get(get_service_handler)
                    .put(update_service_handler)
                    .delete(delete_service_handler),
            )
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .layer(layers)
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown future completes.
    ///
    /// After the shutdown signal, the health state transitions to Draining
    /// and the server waits up to 30 seconds for in-flight requests and
    /// open streams to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let shutdown_ctrl = Arc::clone(&self.state.shutdown);
        let listener = self
            .listener
            .expect("start() must be called before serve()");

        // Transition to Ready so readiness probes pass.
        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = self.config.tls {
            serve_tls(listener, router, tls_config, shutdown_ctrl, shutdown).await
        } else {
            serve_plain(listener, router, shutdown_ctrl, shutdown).await
        }
    }
}

/// Serves plain HTTP/WS connections using axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving plain HTTP/WS connections");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls, reusing the
/// pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &super::config::TlsConfig,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// Transitions to Draining and waits for in-flight requests and streams.
async fn drain(shutdown_ctrl: &ShutdownController) {
    shutdown_ctrl.trigger_shutdown();

    let drained = shutdown_ctrl.wait_for_drain(Duration::from_secs(30)).await;
    if drained {
        info!("All requests drained");
    } else {
        warn!("Drain timeout expired with in-flight requests remaining");
    }
}
