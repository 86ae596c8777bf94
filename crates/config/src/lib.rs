pub mod schema;
pub mod watcher;

pub use schema::{
    ChartKind, DashboardConfig, DisplayConfig, MovingAverageConfig, MovingAverageKind,
    PollConfig, PollInterval, ProxyConfig, StorageConfig, TimeRange,
};
pub use watcher::ConfigWatcher;

use holdwatch_core::{HoldError, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `DashboardConfig::default()`
/// if the file doesn't exist so the daemon always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<DashboardConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(DashboardConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| HoldError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse a TOML document into a config.
pub fn parse(raw: &str) -> Result<DashboardConfig> {
    toml::from_str(raw).map_err(|e| HoldError::Config(format!("TOML parse error: {e}")))
}

/// Return the default config path.
///
/// `$HOLDWATCH_CONFIG` wins; otherwise `$XDG_CONFIG_HOME/holdwatch/holdwatch.toml`.
pub fn default_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("HOLDWATCH_CONFIG") {
        if !explicit.trim().is_empty() {
            return PathBuf::from(explicit);
        }
    }
    xdg_dir("XDG_CONFIG_HOME", ".config")
        .join("holdwatch")
        .join("holdwatch.toml")
}

/// Default location of the persisted key-value file.
pub fn default_state_path() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
        .join("holdwatch")
        .join("state.json")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(home_relative)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load("/definitely/not/here/holdwatch.toml").unwrap();
        assert_eq!(cfg.poll.interval, PollInterval::Ten);
        assert_eq!(cfg.poll.history_cap, 1000);
    }

    #[test]
    fn parse_error_is_config_error() {
        let err = parse("[poll\ninterval_secs = ").unwrap_err();
        assert!(matches!(err, HoldError::Config(_)));
    }
}
