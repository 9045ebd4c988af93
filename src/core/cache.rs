//! Process-local response cache with per-entry expiry.
//!
//! Expiry is lazy: a stale entry is dropped by the lookup that finds it. An optional
//! capacity limit and [`ResponseCache::purge_expired`] bound growth when the key space
//! is open-ended (query strings chosen by callers).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
struct CacheStore<V> {
    map: RwLock<HashMap<String, CacheEntry<V>>>,
    max_entries: Option<usize>,
}

/// Shared key to value map with per-entry TTL.
///
/// Clones share the same underlying store. Entries are replaced whole under the write
/// lock, so a concurrent reader sees either the old or the new value.
#[derive(Debug)]
pub struct ResponseCache<V> {
    store: Arc<CacheStore<V>>,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ResponseCache<V> {
    /// An empty, unbounded cache.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// An empty cache holding at most `max_entries` entries.
    ///
    /// When full, expired entries are purged first; if that frees nothing, the entry
    /// closest to expiry is evicted.
    pub fn with_capacity_limit(max_entries: usize) -> Self {
        Self::build(Some(max_entries.max(1)))
    }

    fn build(max_entries: Option<usize>) -> Self {
        Self {
            store: Arc::new(CacheStore {
                map: RwLock::new(HashMap::new()),
                max_entries,
            }),
        }
    }

    /// Returns the value for `key` unless it is missing or expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let guard = self.store.map.read().await;
            match guard.get(key) {
                None => return None,
                Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict unless a concurrent `set` refreshed it in the meantime.
        let mut guard = self.store.map.write().await;
        if let Some(entry) = guard.get(key) {
            if entry.is_fresh(Instant::now()) {
                return Some(entry.value.clone());
            }
            guard.remove(key);
            tracing::trace!(key, "evicted expired cache entry");
        }
        None
    }

    /// Stores `value` under `key`, replacing any previous entry, expiring after `ttl`.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE),
        };

        let mut guard = self.store.map.write().await;
        if let Some(max) = self.store.max_entries
            && guard.len() >= max
            && !guard.contains_key(&key)
        {
            guard.retain(|_, e| e.is_fresh(now));
            if guard.len() >= max
                && let Some(victim) = guard
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone())
            {
                guard.remove(&victim);
            }
        }
        guard.insert(key, entry);
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.store.map.write().await.clear();
    }

    /// Drops expired entries and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.store.map.write().await;
        let before = guard.len();
        guard.retain(|_, e| e.is_fresh(now));
        before - guard.len()
    }

    /// Number of stored entries, expired ones not yet evicted included.
    pub async fn len(&self) -> usize {
        self.store.map.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
