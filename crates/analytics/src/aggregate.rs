use chrono::{DateTime, Utc};
use holdwatch_core::Sample;
use std::collections::BTreeMap;
use tracing::warn;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Upper bound on emitted boundaries; wider spans are returned unbucketed.
pub const MAX_BUCKETS: i64 = 100_000;

/// Bucket width for [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntervalSpec {
    /// No bucketing; the series is returned as-is.
    #[default]
    Raw,
    Every { amount: u32, unit: IntervalUnit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Hours,
    Days,
}

impl IntervalSpec {
    pub fn minutes(amount: u32) -> Self {
        Self::Every { amount, unit: IntervalUnit::Minutes }
    }

    pub fn hours(amount: u32) -> Self {
        Self::Every { amount, unit: IntervalUnit::Hours }
    }

    pub fn days(amount: u32) -> Self {
        Self::Every { amount, unit: IntervalUnit::Days }
    }

    /// Parse tokens such as `"raw"`, `"5m"`, `"1h"`, `"24h"`, `"7d"`.
    ///
    /// Unrecognised units, missing amounts and zero amounts all resolve to
    /// [`IntervalSpec::Raw`].
    pub fn parse(token: &str) -> Self {
        let token = token.trim().to_ascii_lowercase();
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let (digits, unit) = token.split_at(split);

        let Ok(amount) = digits.parse::<u32>() else {
            return Self::Raw;
        };
        let unit = match unit.trim() {
            "m" | "min" | "mins" | "minute" | "minutes" => IntervalUnit::Minutes,
            "h" | "hr" | "hrs" | "hour" | "hours" => IntervalUnit::Hours,
            "d" | "day" | "days" => IntervalUnit::Days,
            _ => return Self::Raw,
        };
        if amount == 0 {
            return Self::Raw;
        }
        Self::Every { amount, unit }
    }

    /// Bucket width in milliseconds; `0` for [`IntervalSpec::Raw`].
    pub fn as_millis(self) -> i64 {
        match self {
            Self::Raw => 0,
            Self::Every { amount, unit } => {
                let per = match unit {
                    IntervalUnit::Minutes => MINUTE_MS,
                    IntervalUnit::Hours   => HOUR_MS,
                    IntervalUnit::Days    => DAY_MS,
                };
                i64::from(amount) * per
            }
        }
    }
}

/// Running sum and count for one bucket.
#[derive(Debug, Default, Clone, Copy)]
struct Acc {
    sum:   u128,
    count: u64,
}

impl Acc {
    fn mean_rounded(self) -> u64 {
        (self.sum as f64 / self.count as f64).round() as u64
    }
}

/// Bucket `series` into fixed-width intervals.
///
/// Every boundary from `floor(first / w) * w` to `ceil(last / w) * w` is
/// emitted, inclusive, in ascending order.  A bucket's value is the rounded
/// mean of its samples; an empty bucket carries the previous bucket's value
/// forward (the first sample's value before any bucket has resolved).
///
/// A span needing more than [`MAX_BUCKETS`] boundaries is returned as-is.
pub fn aggregate(series: &[Sample], spec: IntervalSpec) -> Vec<Sample> {
    let width = spec.as_millis();
    if series.is_empty() || width <= 0 {
        return series.to_vec();
    }

    // Bounds come from the extreme timestamps, which are the first and last
    // samples for an append-only series.
    let (first_ms, last_ms) = series
        .iter()
        .fold((i64::MAX, i64::MIN), |(lo, hi), s| (lo.min(s.millis()), hi.max(s.millis())));
    let start_time = first_ms.div_euclid(width) * width;
    let end_time = ceil_div(last_ms, width) * width;

    let count = (end_time - start_time) / width + 1;
    if count > MAX_BUCKETS {
        warn!("{count} buckets of {width}ms exceed the limit of {MAX_BUCKETS}; returning raw samples");
        return series.to_vec();
    }

    let mut buckets: BTreeMap<i64, Acc> = BTreeMap::new();
    for sample in series {
        let start = sample.millis().div_euclid(width) * width;
        let acc = buckets.entry(start).or_default();
        acc.sum += u128::from(sample.holders);
        acc.count += 1;
    }

    let seed = series
        .iter()
        .min_by_key(|s| s.timestamp)
        .map(|s| s.holders)
        .unwrap_or_default();

    let mut out = Vec::with_capacity(count as usize);
    let mut carry = seed;
    let mut boundary = start_time;
    while boundary <= end_time {
        if let Some(acc) = buckets.get(&boundary) {
            carry = acc.mean_rounded();
        }
        if let Some(timestamp) = DateTime::<Utc>::from_timestamp_millis(boundary) {
            out.push(Sample::new(timestamp, carry));
        }
        boundary += width;
    }

    out
}

fn ceil_div(value: i64, width: i64) -> i64 {
    let q = value.div_euclid(width);
    if value.rem_euclid(width) == 0 { q } else { q + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, holders: u64) -> Sample {
        Sample::new(Utc.timestamp_opt(secs, 0).unwrap(), holders)
    }

    fn holders(series: &[Sample]) -> Vec<u64> {
        series.iter().map(|s| s.holders).collect()
    }

    #[test]
    fn parse_tokens() {
        assert_eq!(IntervalSpec::parse("raw"), IntervalSpec::Raw);
        assert_eq!(IntervalSpec::parse("5m"), IntervalSpec::minutes(5));
        assert_eq!(IntervalSpec::parse("15min"), IntervalSpec::minutes(15));
        assert_eq!(IntervalSpec::parse("24h"), IntervalSpec::hours(24));
        assert_eq!(IntervalSpec::parse("7d"), IntervalSpec::days(7));
        assert_eq!(IntervalSpec::parse("2 hours"), IntervalSpec::hours(2));
        assert_eq!(IntervalSpec::parse("3w"), IntervalSpec::Raw);
        assert_eq!(IntervalSpec::parse("0m"), IntervalSpec::Raw);
        assert_eq!(IntervalSpec::parse("m"), IntervalSpec::Raw);
    }

    #[test]
    fn raw_is_identity() {
        let series = vec![at(10, 5), at(3, 9), at(70, 1)];
        assert_eq!(aggregate(&series, IntervalSpec::Raw), series);
    }

    #[test]
    fn empty_is_identity() {
        assert!(aggregate(&[], IntervalSpec::minutes(1)).is_empty());
    }

    #[test]
    fn zero_width_behaves_as_raw() {
        let series = vec![at(10, 5), at(20, 6)];
        let spec = IntervalSpec::Every { amount: 0, unit: IntervalUnit::Hours };
        assert_eq!(aggregate(&series, spec), series);
    }

    #[test]
    fn averages_within_bucket_and_rounds() {
        // All inside [0, 60s); end boundary 60s is an empty trailing bucket.
        let series = vec![at(5, 10), at(15, 11), at(25, 11)];
        let out = aggregate(&series, IntervalSpec::minutes(1));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].millis(), 0);
        assert_eq!(out[0].holders, 11); // 32 / 3 = 10.67
        assert_eq!(out[1].millis(), 60_000);
        assert_eq!(out[1].holders, 11);
    }

    #[test]
    fn every_boundary_present_once_in_order() {
        let series = vec![at(30, 100), at(400, 200)];
        let out = aggregate(&series, IntervalSpec::minutes(1));
        let starts: Vec<i64> = out.iter().map(Sample::millis).collect();
        // floor(30s) = 0, ceil(400s) = 420s.
        assert_eq!(starts, (0..=7).map(|m| m * 60_000).collect::<Vec<_>>());
    }

    #[test]
    fn empty_buckets_forward_fill() {
        let series = vec![at(0, 100), at(10, 110), at(185, 300)];
        let out = aggregate(&series, IntervalSpec::minutes(1));
        // Buckets 0, 60, 120, 180, 240.
        assert_eq!(holders(&out), vec![105, 105, 105, 300, 300]);
    }

    #[test]
    fn boundary_aligned_last_sample_gets_no_extra_bucket() {
        let series = vec![at(0, 1), at(120, 3)];
        let out = aggregate(&series, IntervalSpec::minutes(1));
        assert_eq!(holders(&out), vec![1, 1, 3]);
    }

    #[test]
    fn unsorted_input_still_sorted_output() {
        let series = vec![at(130, 7), at(10, 3)];
        let out = aggregate(&series, IntervalSpec::minutes(1));
        let starts: Vec<i64> = out.iter().map(Sample::millis).collect();
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(holders(&out), vec![3, 3, 7, 7]);
    }

    #[test]
    fn far_apart_timestamps_fall_back_to_raw() {
        let series = vec![
            Sample::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), 10),
            Sample::new(Utc.with_ymd_and_hms(9999, 1, 1, 0, 0, 0).unwrap(), 20),
        ];
        assert_eq!(aggregate(&series, IntervalSpec::minutes(1)), series);
    }

    #[test]
    fn span_at_the_limit_is_still_bucketed() {
        // Boundaries 0..=99_999 minutes.
        let series = vec![at(0, 1), at((MAX_BUCKETS - 1) * 60, 2)];
        let out = aggregate(&series, IntervalSpec::minutes(1));
        assert_eq!(out.len() as i64, MAX_BUCKETS);
        assert_eq!(out.last().map(|s| s.holders), Some(2));
    }

    #[test]
    fn hour_buckets() {
        let series = vec![at(0, 10), at(1_800, 20), at(3_700, 40)];
        let out = aggregate(&series, IntervalSpec::hours(1));
        assert_eq!(holders(&out), vec![15, 40, 40]);
    }
}
