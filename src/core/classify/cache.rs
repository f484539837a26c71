//! Content-addressed cache for classification results.
//!
//! Keys are fingerprints (hex SHA-256 of the request bytes). The cache is a plain
//! value owned by whoever needs it; callers that share it wrap it in a mutex and
//! never hold the lock across an `.await`.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

/// Default number of entries kept before eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 200;

/// What happens when the cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Drop the least recently used entry to make room.
    Lru,
    /// Once more than `capacity` entries are held, clear everything before the next insert.
    ClearAll,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

/// Bounded fingerprint → value map with optional expiry.
#[derive(Debug)]
pub struct FingerprintCache<V> {
    entries: HashMap<String, Entry<V>>,
    capacity: usize,
    policy: EvictionPolicy,
    ttl: Option<Duration>,
    clock: u64,
}

impl<V: Clone> FingerprintCache<V> {
    /// Creates an empty cache. A `capacity` of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize, policy: EvictionPolicy, ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            policy,
            ttl,
            clock: 0,
        }
    }

    /// Returns the value stored under `key`, unless it is missing or expired.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.clock += 1;
        let expired = match (self.entries.get(key), self.ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => entry.inserted_at.elapsed() >= ttl,
            (Some(_), None) => false,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }

        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = clock;
            entry.value.clone()
        })
    }

    /// Stores `value` under `key`, evicting according to the policy first.
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        self.clock += 1;

        if !self.entries.contains_key(&key) {
            match self.policy {
                EvictionPolicy::ClearAll if self.entries.len() > self.capacity => {
                    self.entries.clear();
                }
                EvictionPolicy::Lru if self.entries.len() >= self.capacity => {
                    self.evict_least_recent();
                }
                _ => {}
            }
        }

        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                last_used: self.clock,
            },
        );
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    /// Number of entries currently held (expired entries included until touched).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_put() {
        let mut cache = FingerprintCache::new(DEFAULT_CAPACITY, EvictionPolicy::Lru, None);
        cache.put("abc", 7);
        assert_eq!(cache.get("abc"), Some(7));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_clear_all_resets_after_capacity_exceeded() {
        let mut cache = FingerprintCache::new(DEFAULT_CAPACITY, EvictionPolicy::ClearAll, None);
        cache.put("first", 0);
        for i in 1..=DEFAULT_CAPACITY {
            cache.put(format!("key-{i}"), i);
        }
        // 201 entries held: over capacity but nothing cleared yet
        assert_eq!(cache.len(), DEFAULT_CAPACITY + 1);
        assert_eq!(cache.get("first"), Some(0));

        cache.put("unrelated", 999);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("unrelated"), Some(999));
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut cache = FingerprintCache::new(2, EvictionPolicy::Lru, None);
        cache.put("a", 1);
        cache.put("b", 2);
        // Touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = FingerprintCache::new(2, EvictionPolicy::Lru, None);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.put("a", 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_ttl_expiry() {
        let mut expired = FingerprintCache::new(10, EvictionPolicy::Lru, Some(Duration::ZERO));
        expired.put("a", 1);
        assert_eq!(expired.get("a"), None);
        assert!(expired.is_empty());

        let mut fresh =
            FingerprintCache::new(10, EvictionPolicy::Lru, Some(Duration::from_secs(3600)));
        fresh.put("a", 1);
        assert_eq!(fresh.get("a"), Some(1));
    }
}
