//! Fast in-process cache tier.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cache entry with its insertion time.
struct LocalEntry {
    value: Value,
    stored_at: Instant,
}

impl LocalEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Counters for monitoring, surfaced through the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalCacheStats {
    /// Fresh hits served.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries dropped because their TTL had elapsed.
    pub expirations: u64,
    /// Total writes.
    pub inserts: u64,
    /// Entries currently stored (including not-yet-collected expired ones).
    pub len: usize,
}

/// In-process key/value store with per-lookup TTL enforcement.
///
/// The TTL is supplied by the caller on each lookup because it depends on
/// the resource kind behind the key, not on the store itself.
#[derive(Default)]
pub struct LocalCache {
    entries: RwLock<HashMap<String, LocalEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    inserts: AtomicU64,
}

impl LocalCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key` if present and younger than `ttl`.
    ///
    /// An expired entry is removed and counted, then reported as a miss.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        let mut entries = self.entries.write();

        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(ttl) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        entries.remove(key);
        self.expirations.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: &str, value: Value) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
        self.entries.write().insert(
            key.to_string(),
            LocalEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes the entry for `key`, if any.
    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Current counters.
    pub fn stats(&self) -> LocalCacheStats {
        LocalCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            len: self.entries.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_fresh_entry() {
        let cache = LocalCache::new();
        cache.put("user:login=46108", json!({"name": "demo"}));

        let hit = cache.get("user:login=46108", Duration::from_secs(60));
        assert_eq!(hit, Some(json!({"name": "demo"})));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.inserts, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = LocalCache::new();
        cache.put("k", json!(1));

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k", Duration::from_millis(10)), None);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.len, 0, "expired entry removed");
    }

    #[test]
    fn test_same_key_different_ttl() {
        // TTL is per lookup: a short-TTL read can expire what a long-TTL
        // read would still accept, so freshness checks happen before drop.
        let cache = LocalCache::new();
        cache.put("k", json!(1));

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("k", Duration::from_secs(60)).is_some());
        assert_eq!(cache.get("k", Duration::from_millis(1)), None);
    }

    #[test]
    fn test_remove() {
        let cache = LocalCache::new();
        cache.put("k", json!(1));
        cache.remove("k");
        assert_eq!(cache.get("k", Duration::from_secs(60)), None);
    }

    #[test]
    fn test_put_overwrites() {
        let cache = LocalCache::new();
        cache.put("k", json!(1));
        cache.put("k", json!(2));
        assert_eq!(cache.get("k", Duration::from_secs(60)), Some(json!(2)));
        assert_eq!(cache.stats().len, 1);
    }
}
