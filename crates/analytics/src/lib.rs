//! Pure recomputations over a holder-count series.
//!
//! Nothing in this crate holds state: every function takes the current
//! samples (and display settings) and returns a fresh derived value.

pub mod aggregate;
pub mod smoothing;
pub mod stats;
pub mod timescale;

pub use aggregate::{aggregate, IntervalSpec, IntervalUnit, MAX_BUCKETS};
pub use smoothing::{ema, sma, trend_line, MovingAverage, MovingAverageKind, TrendLine};
pub use stats::{change_rate_per_hour, last_change, summarize, Change, SeriesStats};
pub use timescale::{select_time_unit, TimeScale, TimeUnit};
