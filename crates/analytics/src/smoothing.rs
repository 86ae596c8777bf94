use serde::Serialize;

/// Simple moving average, aligned 1:1 with `values`.
///
/// Positions before `period - 1` have no full window and are `None`.
/// A zero period yields all `None`.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    // Running sum; the value that leaves the window is subtracted.
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= period {
                *sum -= values[i - period];
            }
            let out = if i + 1 >= period {
                Some(*sum / period as f64)
            } else {
                None
            };
            Some(out)
        })
        .collect()
}

/// Exponential moving average with multiplier `2 / (period + 1)`, seeded
/// with the first value.  Defined at every position.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };
    let multiplier = 2.0 / (period.max(1) as f64 + 1.0);

    values
        .iter()
        .scan(first, move |prev, &v| {
            let next = (v - *prev) * multiplier + *prev;
            *prev = next;
            Some(next)
        })
        .collect()
}

/// Least-squares line through `(index, value)` pairs, reduced to its two
/// endpoints for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    /// Fitted value at index 0.
    pub start: f64,
    /// Fitted value at index `n - 1`.
    pub end: f64,
    pub slope: f64,
    pub intercept: f64,
}

/// Ordinary least squares of `values` against their index `0..n`.
///
/// Wall-clock spacing is ignored, so unevenly spaced raw samples weigh the
/// same as bucketed ones.  `None` for fewer than two points.
pub fn trend_line(values: &[f64]) -> Option<TrendLine> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let n_f = n as f64;

    let (sum_x, sum_y, sum_xy, sum_xx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0, 0.0, 0.0), |(sx, sy, sxy, sxx), (i, &y)| {
            let x = i as f64;
            (sx + x, sy + y, sxy + x * y, sxx + x * x)
        });

    let denom = n_f * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }

    let slope = (n_f * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n_f;

    Some(TrendLine {
        start: intercept,
        end: slope * (n_f - 1.0) + intercept,
        slope,
        intercept,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverageKind {
    Sma,
    Ema,
}

/// A moving-average overlay selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverage {
    pub kind:   MovingAverageKind,
    pub period: usize,
}

impl MovingAverage {
    /// Compute the overlay, aligned 1:1 with `values`.
    pub fn apply(&self, values: &[f64]) -> Vec<Option<f64>> {
        match self.kind {
            MovingAverageKind::Sma => sma(values, self.period),
            MovingAverageKind::Ema => ema(values, self.period).into_iter().map(Some).collect(),
        }
    }
}
