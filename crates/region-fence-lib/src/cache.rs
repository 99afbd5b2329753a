//! Result cache with LRU eviction.
//!
//! Memoizes the ordered fence list of resolved coordinates. Keys are the exact bit
//! patterns of the (lat, lng) pair as given by the caller, so a cached answer is
//! always identical to a freshly computed one.

use crate::FenceIndex;
use geo::Coord;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache key: bit patterns of (lat, lng)
type CoordKey = (u64, u64);

#[inline]
fn key_for(coord: Coord<f64>) -> CoordKey {
    (coord.y.to_bits(), coord.x.to_bits())
}

/// Cache statistics for monitoring and debugging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub capacity: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded LRU cache of resolved coordinates.
///
/// All operations lock an internal mutex. The `lru` crate evicts inside `put`, so
/// the entry count never exceeds the capacity, even with concurrent writers.
pub struct ResultCache {
    inner: Mutex<LruCache<CoordKey, Arc<[FenceIndex]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// Returns `None` for a capacity of 0, which disables caching entirely.
    pub fn new(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CoordKey, Arc<[FenceIndex]>>> {
        // Entries are plain values, a panic elsewhere cannot leave them half-written
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Result cache mutex poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Get the cached result for a coordinate, marking it most recently used.
    pub fn get(&self, coord: Coord<f64>) -> Option<Arc<[FenceIndex]>> {
        let found = self.lock().get(&key_for(coord)).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Insert or refresh the result for a coordinate.
    ///
    /// If the cache is at capacity, the least recently used entry is evicted.
    pub fn put(&self, coord: Coord<f64>, result: Arc<[FenceIndex]>) {
        self.lock().put(key_for(coord), result);
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        let cache = self.lock();
        CacheStats {
            capacity: cache.cap().get(),
            entries: cache.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("stats", &self.stats())
            .finish()
    }
}
