//! Kernel value cache implementation
//!
//! Provides an LRU cache for pairwise kernel values. Normalization scales by
//! the lhs vector only, so K(i,j) and K(j,i) differ and are cached separately.

use crate::core::MAX_CACHE_SIZE_MB;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Approximate bytes held per cached value (two usize keys, value, overhead)
const ENTRY_BYTES: usize = 32;

/// Entry limit matching the largest configurable cache size
pub const MAX_CACHE_ENTRIES: usize = MAX_CACHE_SIZE_MB * 1024 * 1024 / ENTRY_BYTES;

/// Cache key for kernel values: (lhs index, rhs index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    lhs: usize,
    rhs: usize,
}

/// LRU cache for kernel matrix values
pub struct KernelCache {
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a new kernel cache with specified capacity in number of entries.
    ///
    /// The LRU map reserves its capacity up front, so it is clamped to
    /// `MAX_CACHE_ENTRIES`.
    pub fn new(capacity: usize) -> Self {
        let capacity =
            NonZeroUsize::new(capacity.min(MAX_CACHE_ENTRIES)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a kernel cache with capacity based on memory size in bytes
    /// Assumes 8 bytes per f64 value + overhead
    pub fn with_memory_limit(memory_bytes: usize) -> Self {
        Self::new(memory_bytes / ENTRY_BYTES)
    }

    /// Get a kernel value from cache
    pub fn get(&mut self, lhs: usize, rhs: usize) -> Option<f64> {
        if let Some(&value) = self.cache.get(&CacheKey { lhs, rhs }) {
            self.hits += 1;
            Some(value)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Put a kernel value into cache
    pub fn put(&mut self, lhs: usize, rhs: usize, value: f64) {
        self.cache.put(CacheKey { lhs, rhs }, value);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
