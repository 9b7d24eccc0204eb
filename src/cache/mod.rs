//! Single-entry TTL cache.
//!
//! Each cached rate operation owns one [`CacheSlot`]. A slot remembers the
//! last successful response together with the key it was fetched for; it
//! is not a multi-key store. Lookups with a different key, or after the TTL
//! has elapsed, go to the upstream and replace the entry on success.
//!
//! Failures are never cached and never answered from stale data: the error
//! propagates and the previous entry stays in place, unused, until a later
//! fetch succeeds.
//!
//! Concurrent misses for the same key are coalesced. The first caller
//! starts the fetch and registers it as in flight; callers arriving while it
//! runs attach to it and all resolve together with the same result, success
//! or error. Misses for other keys run independently and are never queued
//! behind an in-flight fetch.

pub mod key;
pub mod ttl;

pub use key::CacheKey;
pub use ttl::{DEFAULT_TTL_SECS, MAX_TTL, MIN_TTL, jitter, jittered_ttl};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::debug;

use crate::Result;
use crate::telemetry;

/// Last successful response of an operation.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Usable iff the key matches and the entry is younger than `ttl`.
    pub fn is_fresh_for(&self, key: &CacheKey, ttl: Duration, now: Instant) -> bool {
        self.key == *key && now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// A fetch every concurrent caller for its key awaits.
type InFlight<V> = Shared<BoxFuture<'static, Result<V>>>;

struct SlotState<V> {
    entry: Option<CacheEntry<V>>,
    in_flight: HashMap<CacheKey, InFlight<V>>,
}

/// One-entry, key-qualified cache with a fixed TTL.
pub struct CacheSlot<V> {
    operation: &'static str,
    ttl: Duration,
    state: Mutex<SlotState<V>>,
}

impl<V> CacheSlot<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty slot. `operation` labels cache metrics and logs.
    pub fn new(operation: &'static str, ttl: Duration) -> Self {
        Self {
            operation,
            ttl,
            state: Mutex::new(SlotState {
                entry: None,
                in_flight: HashMap::new(),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn state(&self) -> MutexGuard<'_, SlotState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh value for `key`, if any. Does not touch the upstream.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        fresh_value(&self.state(), key, self.ttl)
    }

    /// Snapshot of the stored entry, fresh or not.
    pub fn entry(&self) -> Option<CacheEntry<V>> {
        self.state().entry.clone()
    }

    /// Replace the stored entry wholesale.
    pub fn store(&self, key: CacheKey, value: V) {
        self.state().entry = Some(CacheEntry {
            key,
            value,
            fetched_at: Instant::now(),
        });
    }

    /// Return the cached value for `key` or run `fetch` and cache its result.
    ///
    /// If a fetch for `key` is already in flight, `fetch` is not called and
    /// the in-flight result is returned instead. On failure the stored entry
    /// is left untouched and every attached caller receives the error.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let pending = {
            let mut state = self.state();
            if let Some(value) = fresh_value(&state, &key, self.ttl) {
                telemetry::record_cache_lookup(self.operation, true);
                debug!(operation = self.operation, "cache hit");
                return Ok(value);
            }

            telemetry::record_cache_lookup(self.operation, false);
            match state.in_flight.get(&key) {
                Some(pending) => {
                    debug!(operation = self.operation, key = %key, "cache miss, joining in-flight fetch");
                    pending.clone()
                }
                None => {
                    debug!(operation = self.operation, key = %key, "cache miss, fetching");
                    let pending = fetch().boxed().shared();
                    state.in_flight.insert(key.clone(), pending.clone());
                    pending
                }
            }
        };

        let result = pending.clone().await;

        // The first caller to observe completion retires the fetch.
        let mut state = self.state();
        if state
            .in_flight
            .get(&key)
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            state.in_flight.remove(&key);
            if let Ok(value) = &result {
                state.entry = Some(CacheEntry {
                    key,
                    value: value.clone(),
                    fetched_at: Instant::now(),
                });
            }
        }
        result
    }
}

fn fresh_value<V: Clone>(state: &SlotState<V>, key: &CacheKey, ttl: Duration) -> Option<V> {
    state
        .entry
        .as_ref()
        .filter(|e| e.is_fresh_for(key, ttl, Instant::now()))
        .map(|e| e.value.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::CambioError;

    fn key(s: &str) -> CacheKey {
        CacheKey::from_params(&serde_json::json!({ "currency": s })).unwrap()
    }

    /// Fetch that counts invocations, waits `latency`, then yields `result`.
    fn counted<V: Send + 'static>(
        calls: &Arc<AtomicU32>,
        latency: Duration,
        result: Result<V>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<V>> + use<V> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(latency).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_skips_fetch() {
        let slot = CacheSlot::new("test", Duration::from_secs(60));
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let v = slot
                .get_or_fetch(key("usd"), counted(&calls, Duration::ZERO, Ok(1)))
                .await
                .unwrap();
            assert_eq!(v, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_forces_refetch() {
        let slot = CacheSlot::new("test", Duration::from_secs(10));
        slot.store(key("usd"), 1);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(slot.peek(&key("usd")), Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(slot.peek(&key("usd")), None);

        let v = slot
            .get_or_fetch(key("usd"), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn key_mismatch_is_a_miss() {
        let slot = CacheSlot::new("test", Duration::from_secs(60));
        slot.store(key("usd"), 1);

        assert_eq!(slot.peek(&key("eur")), None);
        let v = slot
            .get_or_fetch(key("eur"), || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
        // Single entry: the eur fetch replaced the usd one.
        assert_eq!(slot.peek(&key("usd")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_leaves_stale_entry_untouched() {
        let slot = CacheSlot::new("test", Duration::from_secs(10));
        slot.store(key("usd"), 1u32);
        let stored_at = slot.entry().unwrap().fetched_at;

        tokio::time::advance(Duration::from_secs(30)).await;
        let err = slot
            .get_or_fetch(key("usd"), || async {
                Err(CambioError::from_status(503, "down"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CambioError::Api { status: 503, .. }));

        let entry = slot.entry().unwrap();
        assert_eq!(entry.value, 1);
        assert_eq!(entry.fetched_at, stored_at);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_not_cached() {
        let slot = CacheSlot::<u32>::new("test", Duration::from_secs(60));
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let fetch = counted(
                &calls,
                Duration::ZERO,
                Err(CambioError::from_status(404, "missing")),
            );
            assert!(slot.get_or_fetch(key("usd"), fetch).await.is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(slot.entry().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_fetch() {
        let slot = Arc::new(CacheSlot::new("test", Duration::from_secs(60)));
        let calls = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let slot = slot.clone();
                let fetch = counted(&calls, Duration::from_millis(20), Ok(7));
                tokio::spawn(async move { slot.get_or_fetch(key("usd"), fetch).await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slot.peek(&key("usd")), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_failing_misses_resolve_together() {
        let slot = Arc::new(CacheSlot::<u32>::new("test", Duration::from_secs(60)));
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let slot = slot.clone();
                let fetch = counted(
                    &calls,
                    Duration::from_secs(10),
                    Err(CambioError::from_status(503, "down")),
                );
                tokio::spawn(async move {
                    let result = slot.get_or_fetch(key("usd"), fetch).await;
                    (result, start.elapsed())
                })
            })
            .collect();

        for task in tasks {
            let (result, elapsed) = task.await.unwrap();
            assert!(matches!(result, Err(CambioError::Api { status: 503, .. })));
            assert!(elapsed < Duration::from_secs(11), "resolved after {elapsed:?}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(slot.entry().is_none());

        // The failed fetch is retired; the next miss fetches again.
        let v = slot
            .get_or_fetch(key("usd"), counted(&calls, Duration::ZERO, Ok(3)))
            .await
            .unwrap();
        assert_eq!(v, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_keys_are_not_blocked_by_an_in_flight_fetch() {
        let slot = Arc::new(CacheSlot::new("test", Duration::from_secs(60)));
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let slow = {
            let slot = slot.clone();
            let fetch = counted(&calls, Duration::from_secs(30), Ok("slow"));
            tokio::spawn(async move { slot.get_or_fetch(key("usd"), fetch).await })
        };
        // Let the slow fetch register itself first.
        tokio::task::yield_now().await;

        let fast = slot
            .get_or_fetch(
                key("eur"),
                counted(&calls, Duration::from_millis(10), Ok("fast")),
            )
            .await
            .unwrap();
        assert_eq!(fast, "fast");
        assert!(start.elapsed() < Duration::from_secs(1));

        assert_eq!(slow.await.unwrap().unwrap(), "slow");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
