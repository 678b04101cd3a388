// TTL cache - per-entry expiry on top of a bounded LRU map
// Author: kelexine (https://github.com/kelexine)

use crate::cache::models::{CacheEntry, CacheStats};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct Inner<V> {
    entries: LruCache<String, CacheEntry<V>>,
    stats: CacheStats,
}

/// In-memory cache where every entry carries its own TTL.
///
/// Expired entries are evicted lazily when read and in bulk by
/// [`TtlCache::sweep`]. The map is bounded; when full, the least recently
/// used entry makes room for the new one.
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    /// Look up a live entry. An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.clone()));

        match lookup {
            Some(Some(entry)) => {
                inner.stats.hits += 1;
                Some(entry)
            }
            Some(None) => {
                inner.entries.pop(key);
                inner.stats.expired += 1;
                inner.stats.misses += 1;
                debug!("Cache entry expired: {}", key);
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any previous value.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) -> CacheEntry<V> {
        let key = key.into();
        let stored_at = chrono::Utc::now();
        let entry = CacheEntry {
            value,
            stored_at,
            expires_at: stored_at
                + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero()),
            deadline: Instant::now() + ttl,
        };

        let mut inner = self.inner.lock();
        inner.stats.inserts += 1;
        if let Some((evicted_key, _)) = inner.entries.push(key.clone(), entry.clone()) {
            if evicted_key != key {
                inner.stats.evicted += 1;
                debug!("Cache full, evicted least recently used key: {}", evicted_key);
            }
        }
        entry
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.pop(key);
        }
        inner.stats.expired += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Swept {} expired cache entries", expired.len());
        }
        expired.len()
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.inner.lock().entries.pop(key).map(|entry| entry.value)
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        debug!("Cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hit_before_expiry() {
        let cache = TtlCache::new(10);
        cache.insert("news_flash:m1", "payload".to_string(), Duration::from_secs(900));

        tokio::time::advance(Duration::from_secs(899)).await;
        let entry = cache.get("news_flash:m1").expect("entry should still be live");
        assert_eq!(entry.value, "payload");
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_evicted_on_read() {
        let cache = TtlCache::new(10);
        cache.insert("news_flash:m1", 1u32, Duration::from_secs(900));

        tokio::time::advance(Duration::from_secs(900)).await;
        assert!(cache.get("news_flash:m1").is_none());
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_only_expired() {
        let cache = TtlCache::new(10);
        cache.insert("short", 1u32, Duration::from_secs(60));
        cache.insert("long", 2u32, Duration::from_secs(3600));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long").map(|e| e.value), Some(2));
    }

    #[test]
    fn test_capacity_bound_evicts_least_recent() {
        let cache = TtlCache::new(2);
        cache.insert("a", 1u32, Duration::from_secs(60));
        cache.insert("b", 2u32, Duration::from_secs(60));
        // Touch "a" so "b" becomes least recently used.
        assert!(cache.get("a").is_some());
        cache.insert("c", 3u32, Duration::from_secs(60));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert_eq!(cache.stats().evicted, 1);
    }

    #[test]
    fn test_replacing_a_key_is_not_an_eviction() {
        let cache = TtlCache::new(1);
        cache.insert("a", 1u32, Duration::from_secs(60));
        cache.insert("a", 2u32, Duration::from_secs(60));

        assert_eq!(cache.get("a").map(|e| e.value), Some(2));
        assert_eq!(cache.stats().evicted, 0);
    }

    #[test]
    fn test_expiry_timestamp_matches_ttl() {
        let cache = TtlCache::new(4);
        let entry = cache.insert("k", (), Duration::from_secs(3600));
        assert_eq!((entry.expires_at - entry.stored_at).num_seconds(), 3600);
    }
}
