//! Explicitly constructed TTL cache.
//!
//! Callers own their cache instance and pass it where it is needed; there is
//! no process-wide cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default time-to-live for cached entries
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Map whose entries expire `ttl` after insertion
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`; an expired entry is evicted and reads as a miss
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Insert or replace `key`, restarting its TTL
    pub fn set(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Drop every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_fresh_values() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set("snippets:popular", vec![1, 2, 3]);
        assert_eq!(cache.get(&"snippets:popular"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get(&"missing"), None);
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.set("k", 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn set_replaces_existing_value() {
        let cache = TtlCache::default();
        cache.set("k", "old");
        cache.set("k", "new");
        assert_eq!(cache.get(&"k"), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_and_remove() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set(1, "a");
        cache.set(2, "b");
        assert_eq!(cache.remove(&1), Some("a"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn purge_expired_counts_removed_entries() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.set(1, ());
        cache.set(2, ());
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }
}
