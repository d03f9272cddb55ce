//! One file per signature in a cache directory.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::{CacheError, IndexMatrixStore};
use crate::index_matrix::{IndexMatrix, Signature};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores each matrix as `index_matrix_<signature>.imx` under `dir`.
///
/// Writes go to a temporary sibling and are renamed into place, so readers
/// never see a partially written entry.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Use `dir`, creating it on first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry for `signature`.
    pub fn path_for(&self, signature: &Signature) -> PathBuf {
        self.dir.join(signature.file_name())
    }

    /// Remove the entry for `signature`. Returns whether it existed.
    pub fn remove(&self, signature: &Signature) -> Result<bool, CacheError> {
        match fs::remove_file(self.path_for(signature)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path_for(&self, signature: &Signature) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{}.{}.{}.partial", signature.file_name(), process::id(), n))
    }
}

impl IndexMatrixStore for FileCacheStore {
    fn load(&self, signature: &Signature) -> Result<Option<IndexMatrix>, CacheError> {
        let path = self.path_for(signature);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let matrix = IndexMatrix::read_from(BufReader::new(file))?;
        debug!(path = %path.display(), "Loaded index matrix");
        Ok(Some(matrix))
    }

    fn store(&self, signature: &Signature, matrix: &IndexMatrix) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;

        let temp = self.temp_path_for(signature);
        let path = self.path_for(signature);

        let written = File::create(&temp)
            .map_err(CacheError::from)
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                matrix.write_to(&mut writer)?;
                writer
                    .into_inner()
                    .map_err(|e| CacheError::Io(e.into_error()))?
                    .sync_all()?;
                Ok(())
            })
            .and_then(|()| fs::rename(&temp, &path).map_err(CacheError::from));

        if written.is_err() {
            let _ = fs::remove_file(&temp);
        } else {
            debug!(path = %path.display(), "Stored index matrix");
        }
        written
    }
}
