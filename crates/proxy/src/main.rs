//! holdwatch-proxy: cached holder-count endpoint in front of a Solana RPC node.
//!
//! Run with:  `RUST_LOG=info holdwatch-proxy`

use anyhow::{Context, Result};
use holdwatch_proxy::{router, AppState};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = holdwatch_config::load(holdwatch_config::default_path())?.proxy;
    if config.mint.trim().is_empty() {
        tracing::warn!("No mint configured; /api/holders will fail until [proxy].mint is set");
    }

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .context("invalid bind address")?;

    let state = AppState::new(config);
    tracing::info!("Holder counts cached for {}s", state.cache.ttl().as_secs());
    let app = router(state);

    tracing::info!("holdwatch-proxy v{} listening on http://{addr}", env!("CARGO_PKG_VERSION"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
