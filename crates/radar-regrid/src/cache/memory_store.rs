//! Bounded in-memory index matrix store.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use lru::LruCache;

use super::{CacheError, CacheStats, IndexMatrixStore};
use crate::index_matrix::{IndexMatrix, Signature};

/// LRU store holding at most `capacity` matrices.
pub struct MemoryCacheStore {
    cache: Mutex<LruCache<Signature, IndexMatrix>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCacheStore {
    /// Create a store for `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Number of entries, 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl IndexMatrixStore for MemoryCacheStore {
    fn load(&self, signature: &Signature) -> Result<Option<IndexMatrix>, CacheError> {
        let mut cache = self.cache.lock().map_err(|_| CacheError::Poisoned)?;
        match cache.get(signature) {
            Some(matrix) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(matrix.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    fn store(&self, signature: &Signature, matrix: &IndexMatrix) -> Result<(), CacheError> {
        let mut cache = self.cache.lock().map_err(|_| CacheError::Poisoned)?;
        if let Some((evicted, _)) = cache.push(signature.clone(), matrix.clone()) {
            // push returns the old entry on replace, too
            if &evicted != signature {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}
