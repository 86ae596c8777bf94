use holdwatch_core::Sample;
use serde::Serialize;

/// Axis unit suggested for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

/// Axis granularity: tick every `step_size` `unit`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeScale {
    pub unit: TimeUnit,
    pub step_size: u32,
}

impl TimeScale {
    const fn new(unit: TimeUnit, step_size: u32) -> Self {
        Self { unit, step_size }
    }
}

/// Upper span bound in minutes → scale.  First match wins.
const THRESHOLDS: [(f64, TimeScale); 6] = [
    (5.0,    TimeScale::new(TimeUnit::Second, 15)),
    (15.0,   TimeScale::new(TimeUnit::Second, 30)),
    (60.0,   TimeScale::new(TimeUnit::Minute, 1)),
    (180.0,  TimeScale::new(TimeUnit::Minute, 5)),
    (360.0,  TimeScale::new(TimeUnit::Minute, 15)),
    (1440.0, TimeScale::new(TimeUnit::Hour, 1)),
];

/// Pick an axis granularity from the span between the first and last sample.
/// Advisory only; the data is untouched.
pub fn select_time_unit(series: &[Sample]) -> TimeScale {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return TimeScale::new(TimeUnit::Second, 1);
    };
    if series.len() < 2 {
        return TimeScale::new(TimeUnit::Second, 1);
    }

    let minutes = (last.millis() - first.millis()) as f64 / 60_000.0;
    THRESHOLDS
        .iter()
        .find(|(max, _)| minutes <= *max)
        .map(|(_, scale)| *scale)
        .unwrap_or(TimeScale::new(TimeUnit::Hour, 4))
}
