use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::entry::CacheEntry;

/// Thread-safe bounded map from cache key to [`CacheEntry`], with LRU
/// eviction and lazy TTL expiry.
///
/// A single [`Mutex`] guards both the map and the recency list, rather than a
/// reader/writer lock: every `get` may mutate (expiry removal or promotion to
/// most-recently-used), so the read path already needs write access in the
/// common case. Critical sections never perform I/O and never await.
pub struct Store {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl Store {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { inner: Mutex::new(LruCache::new(capacity)) }
    }

    /// Look up `key`. An expired entry is evicted and reported as a miss.
    /// A present, unexpired entry is promoted to most-recently-used.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut cache = self.inner.lock().expect("cache mutex poisoned");
        match cache.peek(key) {
            None => None,
            Some(entry) if entry.is_expired() => {
                cache.pop(key);
                None
            }
            Some(_) => cache.get(key).cloned(),
        }
    }

    /// Insert or replace `key`. Replacing an existing key moves it to
    /// most-recently-used without counting against capacity; inserting a new
    /// key may evict the current least-recently-used entry.
    pub fn set(&self, key: String, entry: CacheEntry) {
        let mut cache = self.inner.lock().expect("cache mutex poisoned");
        cache.put(key, entry);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").len()
    }
}
