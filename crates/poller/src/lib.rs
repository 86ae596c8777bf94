pub mod poller;
pub mod store;

pub use poller::{CycleOutcome, PollPhase, Poller, PollerSettings};
pub use store::{FileStore, MemoryStore};

use holdwatch_core::{KeyValueStore, PollEvent};
use holdwatch_source::HolderSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

/// Control handle for a running poll loop.
///
/// Dropping the handle stops the loop at its next scheduling point.
pub struct PollHandle {
    interval_tx: watch::Sender<Duration>,
    task:        JoinHandle<()>,
}

impl PollHandle {
    /// Change the cycle interval.  A pending timer is cancelled and the next
    /// cycle starts immediately.  Setting the current value is a no-op.
    pub fn set_interval(&self, interval: Duration) {
        self.interval_tx.send_if_modified(|current| {
            if *current == interval {
                return false;
            }
            *current = interval;
            true
        });
    }

    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    /// Cancel any pending timer or in-flight fetch and wait for the loop to end.
    pub async fn shutdown(self) {
        drop(self.interval_tx);
        self.task.abort();
        let _ = self.task.await;
    }
}

/// Spawn the self-rescheduling poll loop on the Tokio runtime.
///
/// Each cycle starts `interval` after the previous one started; a cycle that
/// overruns the interval is followed immediately by the next.  A failed
/// cycle waits the same nominal delay, with no backoff.  The loop stops when
/// the returned receiver is dropped or the handle is shut down.
pub fn spawn<S, K>(poller: Arc<Poller<S, K>>, interval: Duration) -> (PollHandle, mpsc::Receiver<PollEvent>)
where
    S: HolderSource + 'static,
    K: KeyValueStore + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let (interval_tx, interval_rx) = watch::channel(interval);

    let task = tokio::spawn(poll_loop(poller, interval_rx, tx));

    (PollHandle { interval_tx, task }, rx)
}

async fn poll_loop<S, K>(
    poller: Arc<Poller<S, K>>,
    mut interval_rx: watch::Receiver<Duration>,
    tx: mpsc::Sender<PollEvent>,
) where
    S: HolderSource + 'static,
    K: KeyValueStore + 'static,
{
    let mut interval = *interval_rx.borrow_and_update();
    info!("Poll loop started ({}ms interval)", interval.as_millis());

    loop {
        let started = Instant::now();
        let outcome = poller.run_cycle().await;
        if let Some(event) = outcome.to_event() {
            if tx.send(event).await.is_err() {
                break; // all receivers dropped
            }
        }

        // A change made mid-fetch only reschedules the next cycle.
        if interval_rx.has_changed().unwrap_or(false) {
            interval = *interval_rx.borrow_and_update();
            info!("Poll interval changed to {}ms during fetch", interval.as_millis());
            let event = PollEvent::IntervalChanged {
                interval_ms: interval.as_millis() as u64,
            };
            if tx.send(event).await.is_err() {
                break;
            }
        }

        let delay = interval.saturating_sub(started.elapsed());
        poller.set_phase(PollPhase::Scheduled);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break; // handle dropped
                }
                interval = *interval_rx.borrow_and_update();
                info!("Poll interval changed to {}ms; restarting cycle", interval.as_millis());
                let event = PollEvent::IntervalChanged {
                    interval_ms: interval.as_millis() as u64,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        }

        poller.set_phase(PollPhase::Idle);
    }

    poller.set_phase(PollPhase::Idle);
    info!("Poll loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::tests::Scripted;
    use holdwatch_core::Origin;
    use std::sync::atomic::Ordering;
    use tokio::time::timeout;

    const LONG: Duration = Duration::from_secs(3_600);
    const WAIT: Duration = Duration::from_secs(2);

    fn poller(values: &[f64]) -> Arc<Poller<Scripted, MemoryStore>> {
        Arc::new(Poller::new(
            Scripted::counts(values),
            MemoryStore::new(),
            PollerSettings::default(),
        ))
    }

    #[tokio::test]
    async fn first_cycle_runs_immediately() {
        let (handle, mut rx) = spawn(poller(&[42.0]), LONG);
        let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(
            event,
            PollEvent::Recorded { origin: Origin::Primary, peak: 42, .. }
        ));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn interval_change_restarts_cycle() {
        let p = poller(&[1.0, 2.0]);
        let (handle, mut rx) = spawn(Arc::clone(&p), LONG);
        timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(p.phase(), PollPhase::Scheduled);

        handle.set_interval(LONG * 2);
        let changed = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(changed, PollEvent::IntervalChanged { interval_ms: 7_200_000 }));

        let next = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert!(matches!(next, PollEvent::Recorded { peak: 2, .. }));
        assert_eq!(p.source_calls(), 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn same_interval_is_not_a_restart() {
        let p = poller(&[1.0, 2.0]);
        let (handle, mut rx) = spawn(Arc::clone(&p), LONG);
        timeout(WAIT, rx.recv()).await.unwrap().unwrap();

        handle.set_interval(LONG);
        assert_eq!(handle.interval(), LONG);
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
        assert_eq!(p.source_calls(), 1);
        handle.shutdown().await;
    }

    fn slow_poller(values: &[f64], delay: Duration) -> Arc<Poller<Scripted, MemoryStore>> {
        Arc::new(Poller::new(
            Scripted::counts(values).with_delay(delay),
            MemoryStore::new(),
            PollerSettings::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn next_cycle_is_timed_from_fetch_start() {
        let p = slow_poller(&[1.0, 2.0], Duration::from_secs(3));
        let start = Instant::now();
        let (handle, mut rx) = spawn(Arc::clone(&p), Duration::from_secs(10));

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, PollEvent::Recorded { peak: 1, .. }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4), "{elapsed:?}");

        // Second fetch starts at t=10 and takes 3s.
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, PollEvent::Recorded { peak: 2, .. }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(13) && elapsed < Duration::from_secs(14), "{elapsed:?}");
        assert_eq!(p.source_calls(), 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_during_fetch_does_not_refetch() {
        let p = slow_poller(&[1.0, 2.0], Duration::from_secs(5));
        let start = Instant::now();
        let (handle, mut rx) = spawn(Arc::clone(&p), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(p.phase(), PollPhase::Fetching);
        handle.set_interval(Duration::from_secs(30));
        assert_eq!(handle.interval(), Duration::from_secs(30));

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, PollEvent::Recorded { peak: 1, .. }));
        let changed = rx.recv().await.unwrap();
        assert!(matches!(changed, PollEvent::IntervalChanged { interval_ms: 30_000 }));
        assert_eq!(p.source_calls(), 1);
        assert_eq!(p.phase(), PollPhase::Scheduled);

        // Next fetch starts at t=30, not when the first one ended at t=5.
        let next = rx.recv().await.unwrap();
        assert!(matches!(next, PollEvent::Recorded { peak: 2, .. }));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(35) && elapsed < Duration::from_secs(36), "{elapsed:?}");
        assert_eq!(p.source_calls(), 2);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn short_interval_keeps_polling_after_failures() {
        let p = poller(&[]);
        let (handle, mut rx) = spawn(Arc::clone(&p), Duration::from_millis(10));
        for expected in 1..=3 {
            let event = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
            assert!(matches!(event, PollEvent::Failed { consecutive, .. } if consecutive == expected));
        }
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_event_stream() {
        let (handle, mut rx) = spawn(poller(&[5.0]), LONG);
        timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        handle.shutdown().await;
        assert!(timeout(WAIT, rx.recv()).await.unwrap().is_none());
    }

    impl Poller<Scripted, MemoryStore> {
        fn source_calls(&self) -> usize {
            self.source().calls.load(Ordering::SeqCst)
        }
    }
}
