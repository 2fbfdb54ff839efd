//! Aggregator-level configuration: identity, credentials, and fan-out limits.

use std::time::Duration;

/// Configuration for the query engine and registry surface.
///
/// Network-level settings (bind address, TLS, CORS) live in
/// [`crate::network::NetworkConfig`].
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// GA4GH-style identifier of this host, reported by `GET /info`.
    pub host_id: String,
    /// Human-readable name of this host.
    pub name: String,
    /// API version advertised by this host.
    pub api_version: String,
    /// Host API key required to register services.
    pub api_key: String,
    /// Timeout applied to each sub-query independently.
    pub per_service_timeout: Duration,
    /// Overall deadline for one fan-out; sub-queries still pending at the
    /// deadline are recorded as timeouts and abandoned.
    pub query_deadline: Duration,
    /// Maximum number of simultaneously outstanding sub-queries.
    pub max_concurrency: usize,
    /// Maximum number of cached aggregated results.
    pub cache_capacity: usize,
    /// Bounded channel capacity per streaming session.
    pub stream_channel_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            host_id: "org.beaconet.aggregator".to_string(),
            name: "Beaconet Aggregator".to_string(),
            api_version: "1.0.0".to_string(),
            api_key: String::new(),
            per_service_timeout: Duration::from_secs(5),
            query_deadline: Duration::from_secs(30),
            max_concurrency: 64,
            cache_capacity: 1024,
            stream_channel_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregator_config_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.host_id, "org.beaconet.aggregator");
        assert_eq!(config.per_service_timeout, Duration::from_secs(5));
        assert_eq!(config.query_deadline, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 64);
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.stream_channel_capacity, 64);
    }
}
