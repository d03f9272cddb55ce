//! Index matrix stores.
//!
//! The cache is a pure performance optimization: every store may lose or
//! refuse entries, and the builder treats any failure as a miss.

mod file_store;
mod memory_store;

pub use file_store::FileCacheStore;
pub use memory_store::MemoryCacheStore;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::index_matrix::{IndexMatrix, Signature};

/// Cache medium failures. Always recovered by the caller.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("cache lock poisoned")]
    Poisoned,
}

impl CacheError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Persistent medium for index matrices keyed by signature.
pub trait IndexMatrixStore {
    /// Stored matrix for `signature`, or `None` on a miss.
    fn load(&self, signature: &Signature) -> Result<Option<IndexMatrix>, CacheError>;

    /// Persist `matrix`, replacing any entry with the same signature.
    fn store(&self, signature: &Signature, matrix: &IndexMatrix) -> Result<(), CacheError>;
}

impl<S: IndexMatrixStore + ?Sized> IndexMatrixStore for Box<S> {
    fn load(&self, signature: &Signature) -> Result<Option<IndexMatrix>, CacheError> {
        (**self).load(signature)
    }

    fn store(&self, signature: &Signature, matrix: &IndexMatrix) -> Result<(), CacheError> {
        (**self).store(signature, matrix)
    }
}

impl<S: IndexMatrixStore + ?Sized> IndexMatrixStore for Arc<S> {
    fn load(&self, signature: &Signature) -> Result<Option<IndexMatrix>, CacheError> {
        (**self).load(signature)
    }

    fn store(&self, signature: &Signature, matrix: &IndexMatrix) -> Result<(), CacheError> {
        (**self).store(signature, matrix)
    }
}

/// Store that never holds anything. Every lookup is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheStore;

impl IndexMatrixStore for NoopCacheStore {
    fn load(&self, _signature: &Signature) -> Result<Option<IndexMatrix>, CacheError> {
        Ok(None)
    }

    fn store(&self, _signature: &Signature, _matrix: &IndexMatrix) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Two stores checked in order: a fast front (memory) and a durable back
/// (file). Back-tier hits are copied to the front; stores go to both.
pub struct TieredCacheStore<F, B> {
    front: F,
    back: B,
}

impl<F: IndexMatrixStore, B: IndexMatrixStore> TieredCacheStore<F, B> {
    pub fn new(front: F, back: B) -> Self {
        Self { front, back }
    }

    pub fn front(&self) -> &F {
        &self.front
    }

    pub fn back(&self) -> &B {
        &self.back
    }
}

impl<F: IndexMatrixStore, B: IndexMatrixStore> IndexMatrixStore for TieredCacheStore<F, B> {
    fn load(&self, signature: &Signature) -> Result<Option<IndexMatrix>, CacheError> {
        // A broken front tier must not hide a good back tier
        match self.front.load(signature) {
            Ok(Some(matrix)) => return Ok(Some(matrix)),
            Ok(None) => {}
            Err(e) => debug!(signature = %signature, error = %e, "Front cache tier failed"),
        }

        let matrix = self.back.load(signature)?;
        if let Some(ref m) = matrix {
            if let Err(e) = self.front.store(signature, m) {
                debug!(signature = %signature, error = %e, "Failed to promote to front cache tier");
            }
        }
        Ok(matrix)
    }

    fn store(&self, signature: &Signature, matrix: &IndexMatrix) -> Result<(), CacheError> {
        let front = self.front.store(signature, matrix);
        self.back.store(signature, matrix)?;
        front
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub evictions: u64,
}
