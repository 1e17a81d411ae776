//! Bounded LRU cache of reconstructed pages.
//!
//! Readers reconstruct a node page from several stored versions. The result
//! is immutable for the reader's lifetime, so it is kept here and handed out
//! as a shared handle.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Hit/miss counters of a [`PageCache`].
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    /// Records a cache hit.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an eviction.
    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns cache hits.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns cache misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Returns evictions.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Returns the hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

struct Inner<K, V> {
    entries: HashMap<K, (Arc<V>, u64)>,
    recency: BTreeMap<u64, K>,
    tick: u64,
}

/// Thread-safe LRU cache handing out `Arc<V>`.
///
/// # Example
///
/// ```
/// use revdb_storage::cache::PageCache;
///
/// let cache: PageCache<u64, &str> = PageCache::new(1);
/// cache.insert(1u64, "one");
/// cache.insert(2u64, "two");
/// assert!(cache.get(&1).is_none());
/// assert_eq!(*cache.get(&2).unwrap(), "two");
/// ```
pub struct PageCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V> PageCache<K, V> {
    /// Creates a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(capacity),
                recency: BTreeMap::new(),
                tick: 0,
            }),
            stats: CacheStats::default(),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key`, marking it as most recently used.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;

        let Some((value, last_used)) = inner.entries.get_mut(key) else {
            self.stats.record_miss();
            return None;
        };
        let previous = std::mem::replace(last_used, tick);
        let value = Arc::clone(value);
        inner.recency.remove(&previous);
        inner.recency.insert(tick, key.clone());
        self.stats.record_hit();
        Some(value)
    }

    /// Inserts `value`, evicting the least recently used entry when full.
    pub fn insert(&self, key: K, value: impl Into<Arc<V>>) -> Arc<V> {
        let value = value.into();
        let mut inner = self.inner.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if let Some((_, previous)) = inner.entries.remove(&key) {
            inner.recency.remove(&previous);
        } else if inner.entries.len() >= self.capacity {
            if let Some((_, oldest)) = inner.recency.pop_first() {
                inner.entries.remove(&oldest);
                self.stats.record_eviction();
            }
        }

        inner.entries.insert(key.clone(), (Arc::clone(&value), tick));
        inner.recency.insert(tick, key);
        value
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }

    /// Cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_eviction_order() {
        let cache = PageCache::new(2);
        cache.insert(1u64, 10u32);
        cache.insert(2u64, 20u32);
        assert_eq!(*cache.get(&1).unwrap(), 10);

        cache.insert(3u64, 30u32);
        assert!(cache.get(&2).is_none());
        assert!(cache.get(&1).is_some());
        assert!(cache.get(&3).is_some());
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_reinsert_replaces_value() {
        let cache = PageCache::new(2);
        cache.insert("a", 1);
        cache.insert("a", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.get(&"a").unwrap(), 2);
    }

    #[test]
    fn test_stats() {
        let cache = PageCache::new(4);
        cache.insert(1u8, ());
        cache.get(&1);
        cache.get(&2);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert!((cache.stats().hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = PageCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = PageCache::new(4);
        cache.insert(1, 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
