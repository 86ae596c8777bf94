use crate::cache::HolderCache;
use crate::scanner::{HolderScanner, RpcScanner};
use holdwatch_config::ProxyConfig;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state, passed to all route handlers via `axum::extract::State`.
pub struct AppState {
    pub config: ProxyConfig,
    pub cache:  HolderCache,
    /// Client for the health passthrough.
    pub http:   reqwest::Client,
}

impl AppState {
    /// Wire an [`RpcScanner`] for the configured mint.
    pub fn new(config: ProxyConfig) -> Arc<Self> {
        let http = reqwest::Client::new();
        let scanner = RpcScanner::new(
            http.clone(),
            config.rpc_url.clone(),
            config.token_program.clone(),
            config.mint.clone(),
            Duration::from_millis(config.rate_limit_retry_ms),
        );
        Self::with_scanner(config, Arc::new(scanner), http)
    }

    /// Build state around any scanner.
    pub fn with_scanner(
        config: ProxyConfig,
        scanner: Arc<dyn HolderScanner>,
        http: reqwest::Client,
    ) -> Arc<Self> {
        let cache = HolderCache::new(scanner, Duration::from_secs(config.cache_ttl_secs));
        Arc::new(Self { config, cache, http })
    }
}
