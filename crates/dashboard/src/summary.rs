use crate::format::{format_count, format_delta, format_rate};
use chrono::{DateTime, Utc};
use holdwatch_analytics::{change_rate_per_hour, last_change, summarize, Change};
use holdwatch_core::{Origin, Sample};
use serde::Serialize;

/// Headline numbers shown above the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCards {
    /// Newest count; `None` before the first sample.
    pub current:              Option<u64>,
    /// Persisted all-time maximum.
    pub peak:                 u64,
    /// Most recent non-zero change.
    pub last_change:          Option<Change>,
    pub change_rate_per_hour: Option<f64>,
    pub increases:            usize,
    pub decreases:            usize,
    pub unchanged:            usize,
    /// Stops advancing while every fetch fails.
    pub last_updated:         Option<DateTime<Utc>>,
    /// The newest sample came from the fallback source.
    pub from_fallback:        bool,
}

impl SummaryCards {
    pub fn build(series: &[Sample], peak: u64, last_origin: Option<Origin>) -> Self {
        let stats = summarize(series);
        Self {
            current: series.last().map(|s| s.holders),
            peak: peak.max(stats.peak),
            last_change: last_change(series),
            change_rate_per_hour: change_rate_per_hour(series),
            increases: stats.increases,
            decreases: stats.decreases,
            unchanged: stats.unchanged,
            last_updated: series.last().map(|s| s.timestamp),
            from_fallback: last_origin == Some(Origin::Fallback),
        }
    }

    /// One-line text rendering, e.g.
    /// `holders 12,345 | peak 12,400 | last +12 | +3.5/h`.
    pub fn headline(&self) -> String {
        let Some(current) = self.current else {
            return "holders: no data yet".to_string();
        };

        let mut line = format!(
            "holders {} | peak {}",
            format_count(current),
            format_count(self.peak)
        );
        if let Some(change) = &self.last_change {
            line.push_str(&format!(" | last {}", format_delta(change.delta())));
        }
        if let Some(rate) = self.change_rate_per_hour {
            line.push_str(&format!(" | {}", format_rate(rate)));
        }
        if self.from_fallback {
            line.push_str(" | fallback");
        }
        line
    }
}
