use holdwatch_core::Sample;
use serde::Serialize;

/// Whole-series counters shown on the summary cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeriesStats {
    /// Highest count present in the series.
    pub peak: u64,
    /// Adjacent pairs where the count went up.
    pub increases: usize,
    /// Adjacent pairs where the count went down.
    pub decreases: usize,
    /// Adjacent pairs with no change.
    pub unchanged: usize,
}

pub fn summarize(series: &[Sample]) -> SeriesStats {
    let mut stats = SeriesStats {
        peak: series.iter().map(|s| s.holders).max().unwrap_or_default(),
        ..SeriesStats::default()
    };
    for pair in series.windows(2) {
        match pair[1].holders.cmp(&pair[0].holders) {
            std::cmp::Ordering::Greater => stats.increases += 1,
            std::cmp::Ordering::Less    => stats.decreases += 1,
            std::cmp::Ordering::Equal   => stats.unchanged += 1,
        }
    }
    stats
}

/// An adjacent pair of samples whose counts differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    pub previous: Sample,
    pub current:  Sample,
}

impl Change {
    /// Signed difference `current - previous`.
    pub fn delta(&self) -> i64 {
        self.current.holders as i64 - self.previous.holders as i64
    }
}

/// The most recent adjacent pair with differing counts, scanning back from
/// the newest sample.  `None` when the series never changed.
pub fn last_change(series: &[Sample]) -> Option<Change> {
    series
        .windows(2)
        .rev()
        .find(|pair| pair[0].holders != pair[1].holders)
        .map(|pair| Change {
            previous: pair[0],
            current:  pair[1],
        })
}

/// Net change per hour between the first and last sample.
pub fn change_rate_per_hour(series: &[Sample]) -> Option<f64> {
    let (first, last) = (series.first()?, series.last()?);
    let span_ms = last.millis() - first.millis();
    if span_ms <= 0 {
        return None;
    }
    let delta = last.holders as f64 - first.holders as f64;
    Some(delta / (span_ms as f64 / 3_600_000.0))
}
