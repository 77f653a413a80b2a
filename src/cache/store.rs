//! Concurrent bundle store
//!
//! Holds settled bundles keyed by [`CacheKey`]. Entries live for the session
//! unless a TTL is configured; they are dropped by `clear()`, by
//! `invalidate_screen()`, or by TTL expiry on read.
//!
//! `clear()` bumps a generation counter. A fetch that started before the
//! clear captures the old generation and its settle step is rejected by
//! [`BundleStore::insert_if_generation`], so a reset never gets repopulated
//! by stragglers.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::bundle::{BundleStatus, Timestamped};
use super::keys::{CacheKey, ContentKind};
use crate::fetch::DedupStats;

// =============================================================================
// Statistics
// =============================================================================

/// Counters for one store.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    /// Settles discarded because the store was cleared while they were in flight
    pub rejected: u64,
}

/// Counters reported by the content and dropdown services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStatsSnapshot,
    pub dedup: DedupStats,
    /// Results that settled under an outdated language token
    pub stale_deliveries: u64,
    pub pending: usize,
}

// =============================================================================
// Bundle Store
// =============================================================================

pub struct BundleStore<T> {
    entries: DashMap<CacheKey, Arc<T>>,
    ttl: Option<Duration>,
    generation: AtomicU64,
    stats: CacheStats,
}

impl<T: Timestamped> BundleStore<T> {
    /// Store whose entries live for the session
    pub fn new() -> Self {
        Self::with_ttl(None)
    }

    /// Store whose ready entries expire after `ttl`
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            generation: AtomicU64::new(0),
            stats: CacheStats::default(),
        }
    }

    /// Current generation; capture it before starting a fetch
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Look up a bundle, counting a hit or a miss. Expired entries are evicted.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        match self.peek(key) {
            Some(bundle) => {
                self.stats.record_hit();
                Some(bundle)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Like [`get`](Self::get), but only a `Ready` bundle counts as a hit.
    /// Error bundles are left for the caller to retry.
    pub fn get_ready(&self, key: &CacheKey) -> Option<Arc<T>> {
        match self.peek(key) {
            Some(bundle) if bundle.status() == BundleStatus::Ready => {
                self.stats.record_hit();
                Some(bundle)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// A `Ready` bundle without touching the hit/miss counters
    pub fn peek_ready(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.peek(key)
            .filter(|bundle| bundle.status() == BundleStatus::Ready)
    }

    /// Look up a bundle without touching the hit/miss counters
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<T>> {
        let bundle = self.entries.get(key).map(|entry| Arc::clone(entry.value()))?;
        if self.is_expired(bundle.as_ref()) {
            self.entries.remove(key);
            self.stats.record_eviction();
            debug!(key = %key, "Cache entry expired");
            return None;
        }
        Some(bundle)
    }

    fn is_expired(&self, bundle: &T) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        if bundle.status() != BundleStatus::Ready {
            return false;
        }
        let age = chrono::Utc::now().signed_duration_since(bundle.fetched_at());
        age.to_std().map(|age| age >= ttl).unwrap_or(false)
    }

    pub fn insert(&self, key: CacheKey, bundle: impl Into<Arc<T>>) -> Arc<T> {
        let bundle = bundle.into();
        self.entries.insert(key, Arc::clone(&bundle));
        self.stats.record_insert();
        bundle
    }

    /// Insert only if no `clear()` happened since `generation` was captured.
    pub fn insert_if_generation(&self, generation: u64, key: CacheKey, bundle: impl Into<Arc<T>>) -> bool {
        if self.generation() != generation {
            self.stats.record_rejected();
            debug!(key = %key, "Discarding settle from before cache reset");
            return false;
        }
        self.insert(key, bundle);
        true
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.entries.remove(key).map(|(_, bundle)| bundle)
    }

    /// Drop every key of one screen in one language
    pub fn invalidate_screen(&self, kind: ContentKind, screen_location: &str, language: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| {
            !(key.kind == kind && key.screen_location == screen_location && key.language == language)
        });
        before - self.entries.len()
    }

    /// Drop everything and start a new generation
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        self.stats.reset();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

impl<T: Timestamped> Default for BundleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
