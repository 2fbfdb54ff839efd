//! Beaconet aggregator server binary.
//!
//! Wires the registry, cache, engine, and security gate together and serves
//! the HTTP/WebSocket surface until SIGINT.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beaconet_server::cache::FingerprintCache;
use beaconet_server::config::AggregatorConfig;
use beaconet_server::engine::{HttpDownstreamClient, QueryEngine};
use beaconet_server::network::{AppState, NetworkConfig, NetworkModule, TlsConfig};
use beaconet_server::registry::{InMemoryRegistry, NullRegistryStore};
use beaconet_server::security::ApiKeyGate;
use beaconet_server::traits::ResultCache;

#[derive(Parser, Debug)]
#[command(name = "beaconet-server")]
#[command(about = "GA4GH beacon aggregator gateway")]
#[command(version)]
struct Cli {
    /// Bind address
    #[arg(long, env = "APP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port (0 = OS-assigned)
    #[arg(long, env = "APP_PORT", default_value_t = 5054)]
    port: u16,

    /// Host API key required to register services
    #[arg(long, env = "POST_API_KEY")]
    api_key: String,

    /// GA4GH-style host identifier reported by GET /info
    #[arg(long, env = "HOST_ID", default_value = "org.beaconet.aggregator")]
    host_id: String,

    /// Per-service sub-query timeout, in seconds
    #[arg(long, default_value_t = 5)]
    service_timeout_secs: u64,

    /// Overall per-query deadline, in seconds
    #[arg(long, default_value_t = 30)]
    query_deadline_secs: u64,

    /// Maximum simultaneously outstanding sub-queries per fan-out
    #[arg(long, default_value_t = 64)]
    max_concurrency: usize,

    /// Maximum number of cached aggregated results
    #[arg(long, default_value_t = 1024)]
    cache_capacity: usize,

    /// TLS certificate path (enables TLS together with --tls-key)
    #[arg(long, env = "TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    /// TLS private key path
    #[arg(long, env = "TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Allowed CORS origins (comma-separated; "*" allows any)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = Arc::new(AggregatorConfig {
        host_id: cli.host_id,
        api_key: cli.api_key,
        per_service_timeout: Duration::from_secs(cli.service_timeout_secs),
        query_deadline: Duration::from_secs(cli.query_deadline_secs),
        max_concurrency: cli.max_concurrency,
        cache_capacity: cli.cache_capacity,
        ..AggregatorConfig::default()
    });

    let registry = Arc::new(InMemoryRegistry::new(Arc::new(NullRegistryStore)));
    registry
        .load()
        .await
        .context("failed to initialize the service registry")?;

    let cache: Arc<dyn ResultCache> = Arc::new(FingerprintCache::new(config.cache_capacity));
    let client = Arc::new(
        HttpDownstreamClient::new(config.per_service_timeout)
            .context("failed to build the downstream HTTP client")?,
    );
    let engine = Arc::new(QueryEngine::new(
        client,
        Arc::clone(&cache),
        Arc::clone(&config),
    ));
    let gate = Arc::new(ApiKeyGate::new(config.api_key.clone()));

    let state = AppState::new(registry, cache, engine, gate, Arc::clone(&config));

    let network_config = NetworkConfig {
        host: cli.host,
        port: cli.port,
        tls: cli.tls_cert.zip(cli.tls_key).map(|(cert_path, key_path)| TlsConfig {
            cert_path,
            key_path,
        }),
        cors_origins: cli.cors_origins,
        ..NetworkConfig::default()
    };

    let mut module = NetworkModule::new(network_config, state);
    let port = module.start().await.context("failed to bind listener")?;
    info!(port, host_id = %config.host_id, "beaconet aggregator starting");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
}
