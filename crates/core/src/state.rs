use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of samples retained in the rolling history.
pub const DEFAULT_HISTORY_CAP: usize = 1000;

/// One holder-count observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Serialised as an RFC 3339 string.
    pub timestamp: DateTime<Utc>,
    pub holders: u64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, holders: u64) -> Self {
        Self { timestamp, holders }
    }

    /// Timestamp in milliseconds since the Unix epoch.
    #[must_use]
    pub fn millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Which source produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Primary,
    Fallback,
}

/// A raw holder count as returned by a source, before it becomes a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Raw count; may be fractional or non-positive when the upstream misbehaves.
    pub holders: f64,
    pub timestamp: DateTime<Utc>,
    pub origin: Origin,
}

impl Reading {
    /// Convert into a sample, flooring the count.  `None` when the count is
    /// not strictly positive.
    #[must_use]
    pub fn to_sample(&self) -> Option<Sample> {
        if !self.holders.is_finite() || self.holders <= 0.0 {
            return None;
        }
        Some(Sample::new(self.timestamp, self.holders.floor() as u64))
    }
}

/// Rolling history of samples, oldest first, capped at `capacity`.
#[derive(Debug, Clone)]
pub struct Series {
    samples:  VecDeque<Sample>,
    capacity: usize,
}

impl Series {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build from previously stored samples, keeping only the newest
    /// `capacity` of them.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>, capacity: usize) -> Self {
        let mut series = Self::new(capacity);
        for sample in samples {
            series.push(sample);
        }
        series
    }

    /// Push a new sample, evicting the oldest if at capacity.
    pub fn push(&mut self, sample: Sample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Contiguous copy for the pure analytics functions.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

impl Default for Series {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
