//! Bounded result cache keyed by (query fingerprint, registry version).
//!
//! Version-keying makes every entry written under an older registry version
//! unreachable the moment the registry mutates; `invalidate_all` additionally
//! covers the case where a downstream node's content changed without any
//! registry mutation. Wholesale invalidation swaps in a fresh cache behind an
//! `ArcSwap`, so readers never block on it.

use std::sync::Arc;

use arc_swap::ArcSwap;
use metrics::counter;
use quick_cache::sync::Cache;
use tracing::info;

use beaconet_core::{AggregatedResult, QueryFingerprint};

use crate::traits::ResultCache;

type CacheKey = (QueryFingerprint, u64);

/// Bounded, internally-synchronized [`ResultCache`] implementation.
///
/// Eviction is `quick_cache`'s CLOCK-style approximation of LRU, bounding
/// memory under high query diversity.
pub struct FingerprintCache {
    inner: ArcSwap<Cache<CacheKey, Arc<AggregatedResult>>>,
    capacity: usize,
}

impl FingerprintCache {
    /// Creates a cache holding at most `capacity` aggregated results.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArcSwap::from_pointee(Cache::new(capacity)),
            capacity,
        }
    }
}

impl ResultCache for FingerprintCache {
    fn get(&self, fingerprint: QueryFingerprint, version: u64) -> Option<Arc<AggregatedResult>> {
        let hit = self.inner.load().get(&(fingerprint, version));
        if hit.is_some() {
            counter!("beaconet_cache_hits_total").increment(1);
        } else {
            counter!("beaconet_cache_misses_total").increment(1);
        }
        hit
    }

    fn put(&self, fingerprint: QueryFingerprint, version: u64, result: Arc<AggregatedResult>) {
        self.inner.load().insert((fingerprint, version), result);
    }

    fn invalidate_all(&self) {
        self.inner.store(Arc::new(Cache::new(self.capacity)));
        counter!("beaconet_cache_invalidations_total").increment(1);
        info!("result cache invalidated");
    }

    fn len(&self) -> usize {
        self.inner.load().len()
    }
}

#[cfg(test)]
mod tests {
    use beaconet_core::ServiceOutcome;

    use super::*;

    fn result(fingerprint: QueryFingerprint, version: u64) -> Arc<AggregatedResult> {
        Arc::new(AggregatedResult::new(
            fingerprint,
            version,
            Vec::<ServiceOutcome>::new(),
        ))
    }

    #[test]
    fn get_after_put_hits_for_same_key_pair() {
        let cache = FingerprintCache::new(16);
        let fp = QueryFingerprint(42);
        cache.put(fp, 3, result(fp, 3));

        assert!(cache.get(fp, 3).is_some());
        assert!(cache.get(fp, 4).is_none(), "other version must miss");
        assert!(cache.get(QueryFingerprint(43), 3).is_none());
    }

    #[test]
    fn version_keying_makes_stale_entries_unreachable() {
        let cache = FingerprintCache::new(16);
        let fp = QueryFingerprint(1);
        cache.put(fp, 1, result(fp, 1));

        // A registry mutation moves readers to version 2; the old entry is
        // never returned for it.
        assert!(cache.get(fp, 2).is_none());
        assert!(cache.get(fp, 1).is_some());
    }

    #[test]
    fn invalidate_all_drops_every_entry() {
        let cache = FingerprintCache::new(16);
        for i in 0..8 {
            let fp = QueryFingerprint(i);
            cache.put(fp, 1, result(fp, 1));
        }
        assert!(!cache.is_empty());

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(cache.get(QueryFingerprint(0), 1).is_none());
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = FingerprintCache::new(4);
        for i in 0..64 {
            let fp = QueryFingerprint(i);
            cache.put(fp, 1, result(fp, 1));
        }
        assert!(cache.len() <= 4, "eviction must bound the entry count");
    }
}
