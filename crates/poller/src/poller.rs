use chrono::{DateTime, Utc};
use holdwatch_analytics::{last_change, summarize, Change, SeriesStats};
use holdwatch_core::{KeyValueStore, Origin, PollEvent, Sample, Series};
use holdwatch_source::HolderSource;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Storage keys and retention for a [`Poller`].
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub series_key:  String,
    pub peak_key:    String,
    pub history_cap: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            series_key:  "holderHistory".to_string(),
            peak_key:    "peakHolders".to_string(),
            history_cap: holdwatch_core::state::DEFAULT_HISTORY_CAP,
        }
    }
}

/// Where the poll loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Fetching,
    Scheduled,
}

impl PollPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Fetching,
            2 => Self::Scheduled,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle      => 0,
            Self::Fetching  => 1,
            Self::Scheduled => 2,
        }
    }
}

/// Result of one [`Poller::run_cycle`].
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Another cycle was in flight; nothing was fetched.
    AlreadyRunning,
    /// A sample was appended and persisted.
    Recorded {
        sample:      Sample,
        origin:      Origin,
        peak:        u64,
        stats:       SeriesStats,
        last_change: Option<Change>,
    },
    /// The source answered without a positive count.
    Ignored { origin: Origin },
    /// Every source failed.
    Failed { error: String, consecutive: u32 },
}

impl CycleOutcome {
    /// The event forwarded to listeners; `None` for a vetoed cycle.
    pub fn to_event(&self) -> Option<PollEvent> {
        match self {
            Self::AlreadyRunning => None,
            Self::Recorded { sample, origin, peak, .. } => Some(PollEvent::Recorded {
                sample: *sample,
                origin: *origin,
                peak:   *peak,
            }),
            Self::Ignored { origin } => Some(PollEvent::Ignored { origin: *origin }),
            Self::Failed { error, consecutive } => Some(PollEvent::Failed {
                error:       error.clone(),
                consecutive: *consecutive,
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    series:               Series,
    peak:                 u64,
    consecutive_failures: u32,
    last_origin:          Option<Origin>,
    last_updated:         Option<DateTime<Utc>>,
}

/// Owns the rolling series and drives single fetch cycles against a source.
///
/// Only one cycle runs at a time: a second [`run_cycle`](Self::run_cycle)
/// while one is fetching returns [`CycleOutcome::AlreadyRunning`] without
/// touching the source.
pub struct Poller<S, K> {
    source:    S,
    store:     K,
    settings:  PollerSettings,
    in_flight: AtomicBool,
    phase:     AtomicU8,
    inner:     Mutex<Inner>,
}

impl<S: HolderSource, K: KeyValueStore> Poller<S, K> {
    /// Build a poller, rehydrating the series and peak from `store` once.
    pub fn new(source: S, store: K, settings: PollerSettings) -> Self {
        let series = load_series(&store, &settings);
        let stored_peak = load_peak(&store, &settings);
        let series_peak = series.iter().map(|s| s.holders).max().unwrap_or_default();
        let last_updated = series.latest().map(|s| s.timestamp);

        info!(
            "Rehydrated {} of at most {} samples (peak {})",
            series.len(),
            series.capacity(),
            stored_peak.max(series_peak)
        );

        Self {
            source,
            store,
            settings,
            in_flight: AtomicBool::new(false),
            phase: AtomicU8::new(PollPhase::Idle.as_u8()),
            inner: Mutex::new(Inner {
                series,
                peak: stored_peak.max(series_peak),
                consecutive_failures: 0,
                last_origin: None,
                last_updated,
            }),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn phase(&self) -> PollPhase {
        PollPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub(crate) fn set_phase(&self, phase: PollPhase) {
        self.phase.store(phase.as_u8(), Ordering::SeqCst);
    }

    /// Copy of the current series, oldest first.
    pub fn series(&self) -> Vec<Sample> {
        self.lock().series.snapshot()
    }

    /// Highest count ever recorded.
    pub fn peak(&self) -> u64 {
        self.lock().peak
    }

    /// Origin of the most recent recorded sample this session.
    pub fn last_origin(&self) -> Option<Origin> {
        self.lock().last_origin
    }

    /// Timestamp of the newest sample.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.lock().last_updated
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Run one fetch cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Fetch already in flight; skipping trigger");
            return CycleOutcome::AlreadyRunning;
        }
        let _guard = FlightGuard { poller: self };
        self.set_phase(PollPhase::Fetching);

        match self.source.fetch().await {
            Ok(reading) => match reading.to_sample() {
                Some(sample) => self.record(sample, reading.origin),
                None => {
                    warn!(
                        "Source returned {} holders ({:?}); skipping this cycle",
                        reading.holders, reading.origin
                    );
                    CycleOutcome::Ignored { origin: reading.origin }
                }
            },
            Err(e) => {
                let mut inner = self.lock();
                inner.consecutive_failures += 1;
                warn!(
                    "Holder fetch failed ({} in a row): {e}",
                    inner.consecutive_failures
                );
                CycleOutcome::Failed {
                    error:       e.to_string(),
                    consecutive: inner.consecutive_failures,
                }
            }
        }
    }

    fn record(&self, sample: Sample, origin: Origin) -> CycleOutcome {
        let (snapshot, peak, raised) = {
            let mut inner = self.lock();
            inner.series.push(sample);
            inner.consecutive_failures = 0;
            inner.last_origin = Some(origin);
            inner.last_updated = Some(sample.timestamp);

            let raised = sample.holders > inner.peak;
            if raised {
                inner.peak = sample.holders;
            }
            (inner.series.snapshot(), inner.peak, raised)
        };

        // Store writes happen outside the lock; single flight keeps them ordered.
        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(e) = self.store.set(&self.settings.series_key, &raw) {
                    warn!("Failed to persist series: {e}");
                }
            }
            Err(e) => warn!("Failed to encode series: {e}"),
        }
        if raised {
            if let Err(e) = self.store.set(&self.settings.peak_key, &peak.to_string()) {
                warn!("Failed to persist peak: {e}");
            }
        }

        let stats = summarize(&snapshot);
        let last_change = last_change(&snapshot);
        debug!(
            "Recorded {} holders from {origin:?} ({} samples, peak {peak})",
            sample.holders,
            snapshot.len(),
        );

        CycleOutcome::Recorded {
            sample,
            origin,
            peak,
            stats,
            last_change,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag when a cycle ends, including on cancellation.
struct FlightGuard<'a, S, K> {
    poller: &'a Poller<S, K>,
}

impl<S, K> Drop for FlightGuard<'_, S, K> {
    fn drop(&mut self) {
        self.poller.phase.store(PollPhase::Idle.as_u8(), Ordering::SeqCst);
        self.poller.in_flight.store(false, Ordering::SeqCst);
    }
}

fn load_series<K: KeyValueStore>(store: &K, settings: &PollerSettings) -> Series {
    let raw = match store.get(&settings.series_key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Series::new(settings.history_cap),
        Err(e) => {
            warn!("Cannot read stored series: {e}");
            return Series::new(settings.history_cap);
        }
    };

    match serde_json::from_str::<Vec<Sample>>(&raw) {
        Ok(mut samples) => {
            samples.sort_by_key(|s| s.timestamp);
            Series::from_samples(samples, settings.history_cap)
        }
        Err(e) => {
            warn!("Ignoring corrupt stored series: {e}");
            Series::new(settings.history_cap)
        }
    }
}

fn load_peak<K: KeyValueStore>(store: &K, settings: &PollerSettings) -> u64 {
    match store.get(&settings.peak_key) {
        Ok(Some(raw)) => {
            let raw = raw.trim();
            raw.parse::<u64>()
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && *v >= 0.0)
                        .map(|v| v.floor() as u64)
                })
                .unwrap_or_else(|| {
                    warn!("Ignoring corrupt stored peak '{raw}'");
                    0
                })
        }
        Ok(None) => 0,
        Err(e) => {
            warn!("Cannot read stored peak: {e}");
            0
        }
    }
}
