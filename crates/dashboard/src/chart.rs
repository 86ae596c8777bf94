use holdwatch_analytics::{
    aggregate, select_time_unit, trend_line, IntervalSpec, MovingAverage, MovingAverageKind,
    TimeScale, TrendLine,
};
use holdwatch_config::{ChartKind, DisplayConfig, MovingAverageKind as ConfiguredKind, TimeRange};
use holdwatch_core::Sample;
use serde::Serialize;

/// Moving-average series drawn over the chart, aligned 1:1 with `points`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub kind:   MovingAverageKind,
    pub period: usize,
    /// `None` where the window is not yet full.
    pub values: Vec<Option<f64>>,
}

/// Chart input for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub kind:           ChartKind,
    pub range:          TimeRange,
    /// Bucketed series (raw when the range is `raw`).
    pub points:         Vec<Sample>,
    pub moving_average: Option<Overlay>,
    pub trend:          Option<TrendLine>,
    pub time_scale:     TimeScale,
}

impl ChartData {
    pub fn build(series: &[Sample], display: &DisplayConfig) -> Self {
        let points = aggregate(series, IntervalSpec::parse(display.range.as_str()));
        let values: Vec<f64> = points.iter().map(|p| p.holders as f64).collect();

        let moving_average = overlay_for(display).map(|ma| Overlay {
            kind:   ma.kind,
            period: ma.period,
            values: ma.apply(&values),
        });
        let trend = if display.show_trend {
            trend_line(&values)
        } else {
            None
        };

        Self {
            kind: display.chart,
            range: display.range,
            time_scale: select_time_unit(&points),
            points,
            moving_average,
            trend,
        }
    }
}

fn overlay_for(display: &DisplayConfig) -> Option<MovingAverage> {
    let kind = match display.moving_average.kind {
        ConfiguredKind::None => return None,
        ConfiguredKind::Sma  => MovingAverageKind::Sma,
        ConfiguredKind::Ema  => MovingAverageKind::Ema,
    };
    Some(MovingAverage {
        kind,
        period: display.moving_average.period,
    })
}
