use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure parsed from `holdwatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Poll loop settings.
    pub poll: PollConfig,
    /// Where the series and peak are persisted.
    pub storage: StorageConfig,
    /// In-memory display settings; never written back.
    pub display: DisplayConfig,
    /// Holder-count proxy service settings.
    pub proxy: ProxyConfig,
}

/// Poll loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between cycle starts.
    #[serde(rename = "interval_secs")]
    pub interval: PollInterval,
    /// Base URL of the primary backend; `/api/holders` is appended.
    pub backend_url: String,
    /// Token-metadata endpoint used when the primary fails.  Empty disables it.
    pub fallback_url: String,
    /// Mint address the fallback lookup is keyed by.
    pub mint: String,
    /// Maximum number of retained samples.
    pub history_cap: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval:     PollInterval::default(),
            backend_url:  "http://localhost:3001".to_string(),
            fallback_url: String::new(),
            mint:         String::new(),
            history_cap:  1000,
        }
    }
}

/// Allowed poll intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum PollInterval {
    Five,
    #[default]
    Ten,
    Fifteen,
    Thirty,
    Sixty,
}

impl PollInterval {
    pub fn secs(self) -> u64 {
        match self {
            Self::Five    => 5,
            Self::Ten     => 10,
            Self::Fifteen => 15,
            Self::Thirty  => 30,
            Self::Sixty   => 60,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::from_secs(self.secs())
    }
}

impl TryFrom<u64> for PollInterval {
    type Error = String;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        match secs {
            5  => Ok(Self::Five),
            10 => Ok(Self::Ten),
            15 => Ok(Self::Fifteen),
            30 => Ok(Self::Thirty),
            60 => Ok(Self::Sixty),
            other => Err(format!(
                "unsupported poll interval {other}s (expected 5, 10, 15, 30 or 60)"
            )),
        }
    }
}

impl From<PollInterval> for u64 {
    fn from(interval: PollInterval) -> Self {
        interval.secs()
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON key-value file.
    pub path: PathBuf,
    pub series_key: String,
    pub peak_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path:       crate::default_state_path(),
            series_key: "holderHistory".to_string(),
            peak_key:   "peakHolders".to_string(),
        }
    }
}

/// Chart rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub chart: ChartKind,
    /// Visible range; doubles as the aggregation bucket width.
    pub range: TimeRange,
    pub moving_average: MovingAverageConfig,
    pub show_trend: bool,
    /// Chart-data JSON is written here after every cycle when set.
    pub export_path: Option<PathBuf>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            chart:          ChartKind::Line,
            range:          TimeRange::FiveMinutes,
            moving_average: MovingAverageConfig::default(),
            show_trend:     true,
            export_path:    None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Area,
}

/// Display range / bucket width options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
}

impl TimeRange {
    /// The same token used in the config file, e.g. `"15m"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw            => "raw",
            Self::OneMinute      => "1m",
            Self::FiveMinutes    => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes  => "30m",
            Self::OneHour        => "1h",
            Self::SixHours       => "6h",
            Self::OneDay         => "24h",
            Self::SevenDays      => "7d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverageConfig {
    pub kind: MovingAverageKind,
    /// Window length in (aggregated) points.
    pub period: usize,
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        Self {
            kind:   MovingAverageKind::Sma,
            period: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverageKind {
    None,
    #[default]
    Sma,
    Ema,
}

/// Holder-count proxy service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub bind: String,
    pub port: u16,
    /// Solana JSON-RPC endpoint scanned for token accounts.
    pub rpc_url: String,
    pub mint: String,
    pub token_program: String,
    /// How long a computed holder count is served from memory.
    pub cache_ttl_secs: u64,
    /// Fixed delay before the single retry after an HTTP 429.
    pub rate_limit_retry_ms: u64,
    /// Backend whose `/health` is echoed by `/api/health`.
    pub backend_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind:                "127.0.0.1".to_string(),
            port:                3000,
            rpc_url:             "https://api.mainnet-beta.solana.com".to_string(),
            mint:                String::new(),
            token_program:       "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA".to_string(),
            cache_ttl_secs:      10,
            rate_limit_retry_ms: 2_000,
            backend_url:         "http://localhost:3001".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let cfg: DashboardConfig = toml::from_str(
            r#"
            [poll]
            interval_secs = 30
            backend_url = "http://backend:8080"
            mint = "Mint111"

            [display]
            chart = "area"
            range = "6h"
            show_trend = false

            [display.moving_average]
            kind = "ema"
            period = 12

            [proxy]
            port = 8088
            cache_ttl_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.poll.interval, PollInterval::Thirty);
        assert_eq!(cfg.poll.backend_url, "http://backend:8080");
        assert_eq!(cfg.poll.history_cap, 1000);
        assert_eq!(cfg.display.chart, ChartKind::Area);
        assert_eq!(cfg.display.range, TimeRange::SixHours);
        assert_eq!(cfg.display.moving_average.kind, MovingAverageKind::Ema);
        assert_eq!(cfg.display.moving_average.period, 12);
        assert!(!cfg.display.show_trend);
        assert_eq!(cfg.proxy.port, 8088);
        assert_eq!(cfg.proxy.cache_ttl_secs, 5);
        assert_eq!(cfg.proxy.rate_limit_retry_ms, 2_000);
    }

    #[test]
    fn rejects_unsupported_interval() {
        let err = toml::from_str::<DashboardConfig>("[poll]\ninterval_secs = 7\n").unwrap_err();
        assert!(err.to_string().contains("unsupported poll interval"));
    }

    #[test]
    fn time_range_tokens_round_trip_through_as_str() {
        let cfg: DisplayConfig = toml::from_str("range = \"24h\"").unwrap();
        assert_eq!(cfg.range, TimeRange::OneDay);
        assert_eq!(cfg.range.as_str(), "24h");
    }
}
