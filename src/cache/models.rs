//! Cache entry and statistics models.

// Author: kelexine (https://github.com/kelexine)

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// A stored value together with its wall-clock and monotonic lifetimes.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// When the value was stored.
    pub stored_at: DateTime<Utc>,
    /// When the value stops being served.
    pub expires_at: DateTime<Utc>,
    /// Monotonic deadline used for the actual expiry decision.
    pub(crate) deadline: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Statistics for cache operations.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of reads served from the cache.
    pub hits: u64,
    /// Number of reads that found nothing usable.
    pub misses: u64,
    /// Number of values stored.
    pub inserts: u64,
    /// Entries dropped because their TTL ran out.
    pub expired: u64,
    /// Live entries dropped to respect the capacity bound.
    pub evicted: u64,
}
