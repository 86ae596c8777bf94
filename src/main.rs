//! holdwatch: polls a token's holder count, keeps a rolling history, and
//! publishes chart and summary data for the dashboard.
//!
//! Run with:  `RUST_LOG=info holdwatch`

use anyhow::{Context, Result};
use holdwatch_config::{ConfigWatcher, DashboardConfig, DisplayConfig};
use holdwatch_core::{KeyValueStore, PollEvent};
use holdwatch_dashboard::DashboardFeed;
use holdwatch_poller::{FileStore, Poller, PollerSettings};
use holdwatch_source::{FallbackChain, FallbackSource, HolderSource, PrimarySource};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging; RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("holdwatch v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = holdwatch_config::default_path();
    let config = holdwatch_config::load(&config_path)?;

    let client = reqwest::Client::new();
    let source = FallbackChain::new(
        PrimarySource::new(client.clone(), &config.poll.backend_url),
        FallbackSource::new(client, config.poll.fallback_url.clone(), config.poll.mint.clone()),
    );
    let store = FileStore::open(&config.storage.path);
    tracing::info!("State file: {}", store.path().display());

    let settings = PollerSettings {
        series_key:  config.storage.series_key.clone(),
        peak_key:    config.storage.peak_key.clone(),
        history_cap: config.poll.history_cap,
    };
    let poller = Arc::new(Poller::new(source, store, settings));

    run(poller, config, &config_path).await
}

async fn run<S, K>(poller: Arc<Poller<S, K>>, mut config: DashboardConfig, config_path: &Path) -> Result<()>
where
    S: HolderSource + 'static,
    K: KeyValueStore + 'static,
{
    let (handle, mut events) = holdwatch_poller::spawn(Arc::clone(&poller), config.poll.interval.duration());
    let (_watcher, mut reloads) = ConfigWatcher::spawn(config_path);

    publish(&poller, &config.display);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match &event {
                    PollEvent::Recorded { .. } => {}
                    PollEvent::Ignored { origin } => {
                        tracing::debug!("Ignored non-positive reading from {origin:?} source");
                    }
                    PollEvent::Failed { error, consecutive } => {
                        tracing::warn!("Poll failed ({consecutive} in a row): {error}");
                    }
                    PollEvent::IntervalChanged { interval_ms } => {
                        tracing::info!("Polling every {interval_ms}ms");
                    }
                }
                if event.ends_cycle() {
                    publish(&poller, &config.display);
                }
            }
            Some(next) = reloads.recv() => {
                tracing::info!("Config reloaded");
                let interval = next.poll.interval.duration();
                if interval != handle.interval() {
                    tracing::info!("Switching poll interval to {}s", interval.as_secs());
                    handle.set_interval(interval);
                }
                if next.display != config.display {
                    publish(&poller, &next.display);
                }
                if next.poll.backend_url != config.poll.backend_url
                    || next.storage != config.storage
                {
                    tracing::warn!("Source and storage changes take effect after a restart");
                }
                config = next;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    handle.shutdown().await;
    tracing::info!("holdwatch stopped");
    Ok(())
}

/// Log the headline and, when configured, write the feed document.
fn publish<S, K>(poller: &Poller<S, K>, display: &DisplayConfig)
where
    S: HolderSource,
    K: KeyValueStore,
{
    let feed = DashboardFeed::build(&poller.series(), poller.peak(), poller.last_origin(), display);
    tracing::info!("{}", feed.summary.headline());

    if let Some(path) = &display.export_path {
        if let Err(e) = export(&feed, path) {
            tracing::warn!("Cannot write dashboard feed to '{}': {e:#}", path.display());
        }
    }
}

fn export(feed: &DashboardFeed, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let raw = serde_json::to_string_pretty(feed)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path).context("rename feed into place")?;
    Ok(())
}
