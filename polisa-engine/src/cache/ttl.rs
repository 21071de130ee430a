//! Keyed store with lazy time-to-live expiry.

use polisa_core::{Clock, SystemClock, Timestamp};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Configuration for [`TtlCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum age at which an entry is still served.
    pub entry_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Timestamp,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
}

/// String-keyed cache whose entries expire `entry_ttl` after they were stored.
///
/// Expiry is checked on read: a `get` that finds an entry older than the TTL
/// removes it and reports a miss. There is no background sweep. Lookup and
/// eviction happen under one lock, so a stale value is never returned.
///
/// Methods take `&self`; share one instance with `Arc`.
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::default(),
            }),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Store `value`, replacing any entry under the same key.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let stored_at = self.clock.now();
        self.lock().entries.insert(key.into(), CacheEntry { value, stored_at });
    }

    /// Value stored under `key` if its age does not exceed the TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let Some(stored_at) = inner.entries.get(key).map(|entry| entry.stored_at) else {
            inner.stats.misses += 1;
            return None;
        };
        if !self.is_fresh(stored_at, now) {
            inner.entries.remove(key);
            inner.stats.expired += 1;
            inner.stats.misses += 1;
            tracing::trace!(key, "cache entry expired");
            return None;
        }
        inner.stats.hits += 1;
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Drop the entry under `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, including ones that expired but were not read yet.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    fn is_fresh(&self, stored_at: Timestamp, now: Timestamp) -> bool {
        // A clock that went backwards yields a negative age; treat it as new.
        let age = (now - stored_at).to_std().unwrap_or(Duration::ZERO);
        age <= self.config.entry_ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
