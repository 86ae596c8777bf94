//! Everything a renderer needs to draw the holder dashboard, recomputed from
//! the current series and display settings on every call.

pub mod chart;
pub mod format;
pub mod summary;

pub use chart::{ChartData, Overlay};
pub use format::{format_count, format_delta, format_rate};
pub use summary::SummaryCards;

use holdwatch_config::DisplayConfig;
use holdwatch_core::{Origin, Sample};
use serde::Serialize;

/// The document written to `display.export_path`.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardFeed {
    pub chart:   ChartData,
    pub summary: SummaryCards,
}

impl DashboardFeed {
    pub fn build(
        series: &[Sample],
        peak: u64,
        last_origin: Option<Origin>,
        display: &DisplayConfig,
    ) -> Self {
        Self {
            chart:   ChartData::build(series, display),
            summary: SummaryCards::build(series, peak, last_origin),
        }
    }
}
