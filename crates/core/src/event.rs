use crate::state::{Origin, Sample};

/// Messages emitted by the poll loop to whoever renders the dashboard.
///
/// Sources:
/// - Poll loop cycle completion → `Recorded`, `Ignored`, `Failed`
/// - Interval reconfiguration   → `IntervalChanged`
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A new sample was appended and persisted.
    Recorded {
        sample: Sample,
        origin: Origin,
        /// Running maximum after this sample.
        peak: u64,
    },
    /// A source answered with a non-positive or missing count; nothing appended.
    Ignored { origin: Origin },
    /// Both sources failed.  The display keeps its previous state.
    Failed {
        error: String,
        /// Failures in a row, reset by the next `Recorded`.
        consecutive: u32,
    },
    /// The cycle interval was changed.  While scheduled the loop restarts at
    /// once; during a fetch only the next delay is affected.
    IntervalChanged { interval_ms: u64 },
}

impl PollEvent {
    /// True for the events that close a fetch cycle.
    pub fn ends_cycle(&self) -> bool {
        !matches!(self, Self::IntervalChanged { .. })
    }
}
