//! Parse result memoization.
//!
//! The cache is an injectable interface keyed by the normalizer's content
//! hash, which already covers trial id, text and normalization version.
//! Callers that vary [`ExtractConfig`](crate::ExtractConfig) between calls
//! should keep one cache per configuration.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::record::CriteriaRecord;

pub trait ParseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Arc<CriteriaRecord>>;
    fn put(&self, key: &str, record: Arc<CriteriaRecord>);

    /// Return the cached record for `key`, or compute, store and return it.
    /// The flag is `true` on a cache hit.
    fn get_or_compute(
        &self,
        key: &str,
        compute: &mut dyn FnMut() -> CriteriaRecord,
    ) -> (Arc<CriteriaRecord>, bool) {
        if let Some(record) = self.get(key) {
            return (record, true);
        }
        let record = Arc::new(compute());
        self.put(key, Arc::clone(&record));
        (record, false)
    }
}

/// Never stores anything; every lookup recomputes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ParseCache for NoopCache {
    fn get(&self, _key: &str) -> Option<Arc<CriteriaRecord>> {
        None
    }

    fn put(&self, _key: &str, _record: Arc<CriteriaRecord>) {}
}

/// Bounded in-process LRU cache.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Arc<CriteriaRecord>>>,
}

impl MemoryCache {
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // Entries are immutable Arcs; a poisoned lock still holds valid ones.
    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<CriteriaRecord>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl ParseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Arc<CriteriaRecord>> {
        self.lock().get(key).cloned()
    }

    fn put(&self, key: &str, record: Arc<CriteriaRecord>) {
        self.lock().put(key.to_string(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> CriteriaRecord {
        CriteriaRecord::new(id)
    }

    #[test]
    fn noop_cache_always_computes() {
        let cache = NoopCache;
        let mut calls = 0;
        for _ in 0..3 {
            let (_, hit) = cache.get_or_compute("k", &mut || {
                calls += 1;
                record("NCT1")
            });
            assert!(!hit);
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn memory_cache_computes_once() {
        let cache = MemoryCache::new(4);
        let mut calls = 0;
        let (first, hit) = cache.get_or_compute("k", &mut || {
            calls += 1;
            record("NCT1")
        });
        assert!(!hit);
        let (second, hit) = cache.get_or_compute("k", &mut || {
            calls += 1;
            record("NCT1")
        });
        assert!(hit);
        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = MemoryCache::new(2);
        cache.put("a", Arc::new(record("A")));
        cache.put("b", Arc::new(record("B")));
        assert!(cache.get("a").is_some());
        cache.put("c", Arc::new(record("C")));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_still_caches() {
        let cache = MemoryCache::new(0);
        cache.put("a", Arc::new(record("A")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(MemoryCache::default());
        std::thread::scope(|scope| {
            for i in 0..8 {
                let cache = Arc::clone(&cache);
                scope.spawn(move || {
                    let key = format!("k{}", i % 2);
                    let (cached, _) = cache.get_or_compute(&key, &mut || record(&key));
                    assert_eq!(cached.trial_id, key);
                });
            }
        });
        assert_eq!(cache.len(), 2);
    }
}
