//! TTL cache of endpoint classifications
//!
//! A read never returns an entry whose age has reached the TTL. The periodic
//! [`StatusCache::purge_expired`] sweep only reclaims memory: it drops entries
//! older than twice the TTL and has no bearing on what reads return.
//!
//! # Example
//!
//! ```rust
//! use niward::cache::StatusCache;
//! use niward::models::{Classification, EndpointAddress, ServerState};
//! use std::time::Duration;
//!
//! let mut cache = StatusCache::new(Duration::from_secs(30));
//! let key = EndpointAddress::new("play.test.com", 25565).key();
//!
//! cache.put(key.clone(), Classification::bare(ServerState::Offline));
//! assert!(cache.get(&key).is_some());
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::{Classification, EndpointKey};

/// Default time-to-live for a classification
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// A cached classification and when it was captured
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: Classification,
    pub captured: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses, stale reads included
    pub misses: u64,
    /// Entries dropped by the sweep
    pub purged: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-memory classification cache keyed by endpoint
#[derive(Debug)]
pub struct StatusCache {
    entries: HashMap<EndpointKey, CacheEntry>,
    ttl: Duration,
    stats: CacheStats,
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            stats: CacheStats::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached classification, if still fresh
    pub fn get(&mut self, key: &EndpointKey) -> Option<Classification> {
        self.get_at(key, Instant::now())
    }

    /// Same as [`get`](Self::get), evaluated against an explicit clock
    pub fn get_at(&mut self, key: &EndpointKey, now: Instant) -> Option<Classification> {
        let fresh = self
            .entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.captured) < self.ttl)
            .map(|entry| entry.result.clone());

        if fresh.is_some() {
            self.stats.hits += 1;
            tracing::debug!(endpoint = %key, "Status cache hit");
        } else {
            self.stats.misses += 1;
            tracing::debug!(endpoint = %key, "Status cache miss");
        }

        fresh
    }

    /// Store a classification captured now
    pub fn put(&mut self, key: EndpointKey, result: Classification) {
        self.put_at(key, result, Instant::now());
    }

    pub fn put_at(&mut self, key: EndpointKey, result: Classification, captured: Instant) {
        self.entries.insert(key, CacheEntry { result, captured });
    }

    /// Forget one endpoint, e.g. after its maintenance flag flips
    pub fn invalidate(&mut self, key: &EndpointKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop entries older than twice the TTL
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&mut self, now: Instant) -> usize {
        let horizon = self.ttl.saturating_mul(2);
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.captured) < horizon);

        let purged = before - self.entries.len();
        self.stats.purged += purged as u64;
        if purged > 0 {
            tracing::debug!(count = purged, "Purged stale status cache entries");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EndpointAddress, ServerState};

    fn key(host: &str) -> EndpointKey {
        EndpointAddress::new(host, 25565).key()
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let mut cache = StatusCache::new(Duration::from_secs(30));
        let t0 = Instant::now();
        let result = Classification::bare(ServerState::Online);

        cache.put_at(key("a.test"), result.clone(), t0);
        let hit = cache.get_at(&key("a.test"), t0 + Duration::from_secs(29));

        assert_eq!(hit, Some(result));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_entry_at_ttl_is_a_miss() {
        let mut cache = StatusCache::new(Duration::from_secs(30));
        let t0 = Instant::now();

        cache.put_at(key("a.test"), Classification::bare(ServerState::Online), t0);

        assert!(cache.get_at(&key("a.test"), t0 + Duration::from_secs(30)).is_none());
        assert_eq!(cache.stats().misses, 1);
        // Stale entries stay until the sweep; reads still refuse them.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let mut cache = StatusCache::new(Duration::ZERO);
        let t0 = Instant::now();
        cache.put_at(key("a.test"), Classification::bare(ServerState::Online), t0);
        assert!(cache.get_at(&key("a.test"), t0).is_none());
    }

    #[test]
    fn test_purge_keeps_entries_younger_than_twice_ttl() {
        let mut cache = StatusCache::new(Duration::from_secs(30));
        let t0 = Instant::now();

        cache.put_at(key("old.test"), Classification::bare(ServerState::Offline), t0);
        cache.put_at(
            key("young.test"),
            Classification::bare(ServerState::Online),
            t0 + Duration::from_secs(40),
        );

        let purged = cache.purge_expired_at(t0 + Duration::from_secs(60));

        assert_eq!(purged, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().purged, 1);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = StatusCache::default();
        cache.put(key("a.test"), Classification::bare(ServerState::Online));
        assert!(cache.invalidate(&key("a.test")));
        assert!(!cache.invalidate(&key("a.test")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.hits = 75;
        stats.misses = 25;
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
    }
}
