//! Thread-safe TTL/LRU cache.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};

use super::CacheEntry;

/// Store-wide settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of entries. `None` = unbounded.
    pub max_size: Option<usize>,
    /// TTL applied to entries stored without their own TTL.
    pub default_ttl: Option<Duration>,
}

impl CacheOptions {
    pub const fn bounded(max_size: usize) -> Self {
        Self {
            max_size: Some(max_size),
            default_ttl: None,
        }
    }

    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }
}

/// Per-item settings for [`CacheManager::set`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub priority: u8,
}

impl SetOptions {
    pub const fn ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            priority: 0,
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub evicted: u64,
}

impl CacheStats {
    /// Hit rate in `0.0..=1.0` (0 when no lookups happened).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner<T> {
    entries: FxHashMap<String, CacheEntry<T>>,
    options: CacheOptions,
    stats: CacheStats,
    seq: u64,
}

impl<T> Inner<T> {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Remove the lowest-ranked entry. Returns `false` if the store is empty.
    fn evict_one(&mut self) -> bool {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.eviction_rank())
            .map(|(key, _)| key.clone());

        match victim {
            Some(key) => {
                self.entries.remove(&key);
                self.stats.evicted += 1;
                crate::debug!("cache"; "evicted {}", key);
                true
            }
            None => false,
        }
    }

    fn over_capacity(&self, len: usize) -> bool {
        self.options.max_size.is_some_and(|max| len > max)
    }
}

/// Generic in-memory store with TTL expiry and least-recently-accessed eviction.
pub struct CacheManager<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> CacheManager<T> {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: FxHashMap::default(),
                options,
                stats: CacheStats::default(),
                seq: 0,
            }),
        }
    }

    /// Look up a live entry, counting hits, misses and discovered expiries.
    pub fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            None => {
                inner.stats.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.expired += 1;
            inner.stats.misses += 1;
            return None;
        }

        let seq = inner.next_seq();
        inner.stats.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.touch(seq);
        Some(entry.value.clone())
    }

    /// Insert or replace a value.
    ///
    /// Inserting a new key into a full store evicts exactly one entry first.
    pub fn set(&self, key: impl Into<String>, value: T, options: SetOptions) {
        let key = key.into();
        let mut inner = self.inner.lock();

        let is_new = !inner.entries.contains_key(&key);
        if is_new && inner.over_capacity(inner.entries.len() + 1) {
            inner.evict_one();
            // max_size = 0 holds nothing
            if inner.over_capacity(inner.entries.len() + 1) {
                crate::debug!("cache"; "zero capacity, dropping {}", key);
                return;
            }
        }

        let ttl = options.ttl.or(inner.options.default_ttl);
        let seq = inner.next_seq();
        inner
            .entries
            .insert(key, CacheEntry::new(value, ttl, options.priority, seq));
    }

    /// Whether a live entry exists. Expired entries found here are removed.
    pub fn has(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.entries.get(key) else {
            return false;
        };
        if entry.is_expired() {
            inner.entries.remove(key);
            inner.stats.expired += 1;
            return false;
        }
        true
    }

    /// Remove an entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Remove every entry. Counters are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Keys of all live entries (unordered).
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let now = Instant::now();
        inner
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Sweep expired entries and return how many were removed.
    pub fn prune(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - inner.entries.len();
        inner.stats.expired += removed as u64;
        removed
    }

    /// Replace store-wide options. Shrinking `max_size` evicts down to the new bound.
    pub fn configure(&self, options: CacheOptions) {
        let mut inner = self.inner.lock();
        inner.options = options;
        while inner.over_capacity(inner.entries.len()) {
            if !inner.evict_one() {
                break;
            }
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.inner.lock().options
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.entries.len(),
            ..inner.stats
        }
    }
}

impl<T: Clone> Default for CacheManager<T> {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_then_get() {
        let cache = CacheManager::default();
        cache.set("k", 42, SetOptions::default());
        assert_eq!(cache.get("k"), Some(42));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_missing_key_counts_miss() {
        let cache = CacheManager::<u32>::default();
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_item_ttl_expires() {
        let cache = CacheManager::default();
        cache.set("k", "v", SetOptions::ttl(Duration::from_millis(20)));
        thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get("k"), None);
        let stats = cache.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_default_ttl_applies() {
        let options = CacheOptions::default().with_default_ttl(Duration::from_millis(20));
        let cache = CacheManager::new(options);
        cache.set("k", 1, SetOptions::default());
        thread::sleep(Duration::from_millis(40));
        assert!(!cache.has("k"));
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn test_item_ttl_overrides_default() {
        let options = CacheOptions::default().with_default_ttl(Duration::from_millis(10));
        let cache = CacheManager::new(options);
        cache.set("k", 1, SetOptions::ttl(Duration::from_secs(60)));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_bounded_eviction_removes_exactly_one() {
        let cache = CacheManager::new(CacheOptions::bounded(3));
        for i in 0..4 {
            cache.set(format!("k{i}"), i, SetOptions::default());
        }

        let stats = cache.stats();
        assert_eq!(stats.size, 3);
        assert_eq!(stats.evicted, 1);
        assert!(!cache.has("k0"));
    }

    #[test]
    fn test_eviction_picks_least_recently_accessed() {
        let cache = CacheManager::new(CacheOptions::bounded(2));
        cache.set("a", 1, SetOptions::default());
        cache.set("b", 2, SetOptions::default());
        // touch `a` so `b` becomes the oldest
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3, SetOptions::default());

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn test_replacing_key_does_not_evict() {
        let cache = CacheManager::new(CacheOptions::bounded(2));
        cache.set("a", 1, SetOptions::default());
        cache.set("b", 2, SetOptions::default());
        cache.set("a", 10, SetOptions::default());

        assert_eq!(cache.stats().evicted, 0);
        assert_eq!(cache.get("a"), Some(10));
    }

    #[test]
    fn test_priority_does_not_protect_stale_entry() {
        let cache = CacheManager::new(CacheOptions::bounded(2));
        cache.set(
            "old",
            1,
            SetOptions {
                ttl: None,
                priority: 5,
            },
        );
        cache.set("recent", 2, SetOptions::default());
        assert_eq!(cache.get("recent"), Some(2));
        cache.set("third", 3, SetOptions::default());

        assert!(!cache.has("old"));
        assert!(cache.has("recent"));
        assert!(cache.has("third"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = CacheManager::new(CacheOptions::bounded(0));
        cache.set("k", 1, SetOptions::default());

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.evicted, 0);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_prune_removes_expired_only() {
        let cache = CacheManager::default();
        cache.set("short", 1, SetOptions::ttl(Duration::from_millis(10)));
        cache.set("long", 2, SetOptions::default());
        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
        assert_eq!(cache.stats().evicted, 0);
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = CacheManager::default();
        cache.set("a", 1, SetOptions::default());
        cache.set("b", 2, SetOptions::default());

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_configure_shrinks() {
        let cache = CacheManager::new(CacheOptions::bounded(4));
        for i in 0..4 {
            cache.set(format!("k{i}"), i, SetOptions::default());
        }
        cache.configure(CacheOptions::bounded(2));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evicted, 2);
        assert_eq!(cache.options().max_size, Some(2));
    }

    #[test]
    fn test_hit_rate() {
        let cache = CacheManager::default();
        cache.set("a", 1, SetOptions::default());
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("b");
        assert!((cache.stats().hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(CacheManager::new(CacheOptions::bounded(64)));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("{t}-{i}");
                        cache.set(key.clone(), i, SetOptions::default());
                        cache.get(&key);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 64);
        assert_eq!(cache.stats().evicted, 800 - 64);
    }
}
