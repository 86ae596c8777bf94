use crate::error::ProxyError;
use crate::scanner::{HolderScanner, HolderTally};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

type ScanResult = Result<HolderTally, ProxyError>;
type SharedScan = Shared<BoxFuture<'static, ScanResult>>;

/// A holder count together with when it was computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedCount {
    pub tally:      HolderTally,
    pub fetched_at: DateTime<Utc>,
    refreshed:      Instant,
}

/// Answer from [`HolderCache::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup {
    pub count:  CachedCount,
    /// Served from memory rather than a scan made for this request.
    pub cached: bool,
    /// The latest scan failed and an older value was served instead.
    pub stale:  bool,
}

#[derive(Default)]
struct CacheState {
    last_good: Option<CachedCount>,
    in_flight: Option<SharedScan>,
}

/// TTL cache in front of a [`HolderScanner`].
///
/// Requests arriving while a scan is running await that same scan instead
/// of starting another.  Each instance owns its own state.
pub struct HolderCache {
    ttl:     Duration,
    scanner: Arc<dyn HolderScanner>,
    state:   Mutex<CacheState>,
}

impl HolderCache {
    pub fn new(scanner: Arc<dyn HolderScanner>, ttl: Duration) -> Self {
        Self {
            ttl,
            scanner,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The last successfully computed count, regardless of age.
    pub fn last_good(&self) -> Option<CachedCount> {
        self.lock().last_good
    }

    /// Return a fresh cached count, or join/start a scan.
    ///
    /// When the scan fails, the last good count is returned marked stale; the
    /// error only propagates when nothing has ever been cached.
    pub async fn get(&self) -> Result<Lookup, ProxyError> {
        let scan = {
            let mut state = self.lock();
            if let Some(count) = state.last_good {
                if count.refreshed.elapsed() < self.ttl {
                    return Ok(Lookup { count, cached: true, stale: false });
                }
            }
            match &state.in_flight {
                Some(scan) => {
                    debug!("Joining in-flight holder scan");
                    scan.clone()
                }
                None => {
                    let scanner = Arc::clone(&self.scanner);
                    let scan = async move { scanner.scan().await }.boxed().shared();
                    state.in_flight = Some(scan.clone());
                    scan
                }
            }
        };

        let result = scan.clone().await;

        let mut state = self.lock();
        let owner = state
            .in_flight
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&scan));
        if owner {
            state.in_flight = None;
        }

        match result {
            Ok(tally) => {
                let count = CachedCount {
                    tally,
                    fetched_at: Utc::now(),
                    refreshed: Instant::now(),
                };
                if owner {
                    state.last_good = Some(count);
                }
                Ok(Lookup { count, cached: false, stale: false })
            }
            Err(e) => match state.last_good {
                Some(count) => {
                    warn!("Holder scan failed, serving last good value: {e}");
                    Ok(Lookup { count, cached: true, stale: true })
                }
                None => {
                    warn!("Holder scan failed with nothing cached: {e}");
                    Err(e)
                }
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scanner replaying scripted results after an optional delay.
    pub(crate) struct StubScanner {
        script: Mutex<VecDeque<ScanResult>>,
        pub(crate) calls: AtomicUsize,
        delay:  Duration,
    }

    impl StubScanner {
        pub(crate) fn new(script: impl IntoIterator<Item = ScanResult>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls:  AtomicUsize::new(0),
                delay:  Duration::ZERO,
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl HolderScanner for StubScanner {
        fn scan(&self) -> BoxFuture<'_, ScanResult> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                let next = self.script.lock().unwrap().pop_front();
                next.unwrap_or_else(|| Err(ProxyError::Upstream("script exhausted".into())))
            }
            .boxed()
        }
    }

    pub(crate) fn tally(holders: u64) -> ScanResult {
        Ok(HolderTally { holders, accounts: holders as usize, skipped: 0 })
    }

    fn cache(stub: StubScanner, ttl: Duration) -> (HolderCache, Arc<StubScanner>) {
        let stub = Arc::new(stub);
        (HolderCache::new(Arc::clone(&stub) as Arc<dyn HolderScanner>, ttl), stub)
    }

    #[tokio::test]
    async fn fresh_value_served_from_memory() {
        let (cache, stub) = cache(StubScanner::new([tally(10), tally(20)]), Duration::from_secs(10));
        assert_eq!(cache.ttl(), Duration::from_secs(10));

        let first = cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert_eq!(first.count.tally.holders, 10);
        assert!(!first.cached);
        assert_eq!(second.count.tally.holders, 10);
        assert!(second.cached);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_value_triggers_rescan() {
        let (cache, stub) = cache(StubScanner::new([tally(10), tally(20)]), Duration::ZERO);

        cache.get().await.unwrap();
        let second = cache.get().await.unwrap();

        assert_eq!(second.count.tally.holders, 20);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_scan() {
        let (cache, stub) = cache(
            StubScanner::new([tally(42), tally(99)]).with_delay(Duration::from_millis(50)),
            Duration::from_secs(10),
        );

        let (a, b, c) = tokio::join!(cache.get(), cache.get(), cache.get());

        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        for lookup in [a, b, c] {
            assert_eq!(lookup.unwrap().count.tally.holders, 42);
        }
        assert_eq!(cache.last_good().map(|c| c.tally.holders), Some(42));
    }

    #[tokio::test]
    async fn failure_serves_last_good_as_stale() {
        let (cache, _stub) = cache(
            StubScanner::new([tally(10), Err(ProxyError::RateLimited)]),
            Duration::ZERO,
        );

        cache.get().await.unwrap();
        let lookup = cache.get().await.unwrap();

        assert!(lookup.stale);
        assert!(lookup.cached);
        assert_eq!(lookup.count.tally.holders, 10);
    }

    #[tokio::test]
    async fn failure_without_cache_propagates() {
        let (cache, _stub) = cache(
            StubScanner::new([Err(ProxyError::Upstream("down".into()))]),
            Duration::from_secs(10),
        );
        assert!(matches!(cache.get().await, Err(ProxyError::Upstream(_))));
        assert!(cache.last_good().is_none());
    }

    #[tokio::test]
    async fn independent_instances_do_not_share_state() {
        let (a, _) = cache(StubScanner::new([tally(1)]), Duration::from_secs(10));
        let (b, _) = cache(StubScanner::new([tally(2)]), Duration::from_secs(10));
        assert_eq!(a.get().await.unwrap().count.tally.holders, 1);
        assert_eq!(b.get().await.unwrap().count.tally.holders, 2);
    }
}
