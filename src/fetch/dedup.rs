//! Single-flight fetch coalescing
//!
//! At most one request is in flight per [`CacheKey`]. The first caller spawns
//! the fetch; later callers subscribe to the same broadcast and receive the
//! identical settled value.
//!
//! The fetch runs in its own task, so it completes and runs its settle step
//! (the cache write) even when every caller has gone away. Callers that are
//! cancelled simply stop listening.
//!
//! Order on completion:
//!
//! ```text
//! fetch (bounded by timeout) → settle(&result) → [lock] remove pending → broadcast
//! ```
//!
//! Anyone woken by the broadcast already sees the cache populated. A caller
//! that missed the cache before the settle and takes the lock after the
//! removal gets its `lookup` run under the lock, so it is served from the
//! cache instead of issuing a second fetch. Failures are broadcast but never
//! kept: the next call retries.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::CacheKey;
use crate::language::LanguageToken;
use crate::types::{ContentError, Result};

/// Default bound on a single fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// What every waiter of one fetch receives
pub type Shared<T> = std::result::Result<Arc<T>, ContentError>;

struct InFlight<T> {
    sender: broadcast::Sender<Shared<T>>,
    token: LanguageToken,
    started_at: Instant,
}

type InFlightMap<T> = Arc<Mutex<HashMap<CacheKey, InFlight<T>>>>;

fn lock<T>(map: &InFlightMap<T>) -> MutexGuard<'_, HashMap<CacheKey, InFlight<T>>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Snapshot of one pending request
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequest {
    pub key: CacheKey,
    pub token: LanguageToken,
    pub waiting: usize,
    pub age_ms: u128,
}

/// Dedup counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupStats {
    /// Fetches actually issued
    pub fetches: u64,
    /// Callers that joined an existing fetch
    pub joins: u64,
    /// Callers served by `lookup` under the lock after missing the cache
    pub late_hits: u64,
    pub failures: u64,
    pub timeouts: u64,
}

#[derive(Default)]
struct Counters {
    fetches: AtomicU64,
    joins: AtomicU64,
    late_hits: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

/// Removes the pending entry when the fetch task ends, even by panic, so
/// waiters are released instead of hanging on a sender nobody will use.
struct Completion<T> {
    map: InFlightMap<T>,
    key: CacheKey,
    sender: Option<broadcast::Sender<Shared<T>>>,
}

impl<T> Completion<T> {
    fn complete(mut self, result: Shared<T>) {
        let mut in_flight = lock(&self.map);
        in_flight.remove(&self.key);
        if let Some(sender) = self.sender.take() {
            let waiting = sender.receiver_count();
            debug!(key = %self.key, waiting = waiting, ok = result.is_ok(), "Fetch settled");
            // receivers may all have dropped
            let _ = sender.send(result);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            lock(&self.map).remove(&self.key);
        }
    }
}

pub struct FetchDeduplicator<T> {
    in_flight: InFlightMap<T>,
    timeout: Duration,
    counters: Arc<Counters>,
}

impl<T: Send + Sync + 'static> FetchDeduplicator<T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            timeout,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Issue `fetch` for `key`, or join the fetch already in flight for it.
    ///
    /// `lookup` runs under the in-flight lock when nothing is pending for
    /// `key`; a value it returns is handed back without fetching.
    ///
    /// `settle` runs exactly once per issued fetch, before any waiter wakes,
    /// and runs even if the caller that issued the fetch is gone by then.
    pub async fn fetch_once<L, F, Fut, S>(
        &self,
        key: CacheKey,
        token: LanguageToken,
        lookup: L,
        fetch: F,
        settle: S,
    ) -> Shared<T>
    where
        L: FnOnce() -> Option<Arc<T>>,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        S: FnOnce(&Shared<T>) + Send + 'static,
    {
        let mut receiver = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(pending) = in_flight.get(&key) {
                self.counters.joins.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, token = %pending.token, "Joining in-flight fetch");
                pending.sender.subscribe()
            } else if let Some(value) = lookup() {
                self.counters.late_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Settled while waiting for the lock, served from cache");
                return Ok(value);
            } else {
                let (sender, receiver) = broadcast::channel(1);
                in_flight.insert(
                    key.clone(),
                    InFlight {
                        sender: sender.clone(),
                        token,
                        started_at: Instant::now(),
                    },
                );
                self.counters.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, token = %token, "Issuing fetch");

                let completion = Completion {
                    map: Arc::clone(&self.in_flight),
                    key: key.clone(),
                    sender: Some(sender),
                };
                let counters = Arc::clone(&self.counters);
                let timeout = self.timeout;

                tokio::spawn(async move {
                    let result = match tokio::time::timeout(timeout, fetch()).await {
                        Ok(Ok(value)) => Ok(Arc::new(value)),
                        Ok(Err(e)) => Err(e),
                        Err(_) => {
                            counters.timeouts.fetch_add(1, Ordering::Relaxed);
                            Err(ContentError::Timeout(timeout))
                        }
                    };
                    if let Err(ref e) = result {
                        counters.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(key = %completion.key, kind = e.kind(), error = %e, "Fetch failed");
                    }
                    settle(&result);
                    completion.complete(result);
                });
                receiver
            }
        };

        match receiver.recv().await {
            Ok(result) => result,
            Err(_) => Err(ContentError::Cancelled),
        }
    }

    /// Whether a fetch for `key` is currently in flight
    pub fn is_pending(&self, key: &CacheKey) -> bool {
        lock(&self.in_flight).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Snapshot of every pending request
    pub fn pending(&self) -> Vec<PendingRequest> {
        lock(&self.in_flight)
            .iter()
            .map(|(key, req)| PendingRequest {
                key: key.clone(),
                token: req.token,
                waiting: req.sender.receiver_count(),
                age_ms: req.started_at.elapsed().as_millis(),
            })
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            joins: self.counters.joins.load(Ordering::Relaxed),
            late_hits: self.counters.late_hits.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.fetches.store(0, Ordering::Relaxed);
        self.counters.joins.store(0, Ordering::Relaxed);
        self.counters.late_hits.store(0, Ordering::Relaxed);
        self.counters.failures.store(0, Ordering::Relaxed);
        self.counters.timeouts.store(0, Ordering::Relaxed);
    }
}
