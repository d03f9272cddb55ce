//! Temporary directory helpers for cache tests.

use std::path::Path;

use tempfile::TempDir;

/// Creates an empty temporary directory for a file-backed cache.
///
/// The directory is removed when the returned guard is dropped.
pub fn temp_cache_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("index-matrix-cache-")
        .tempdir()
        .expect("Failed to create temporary cache directory")
}

/// Lists file names in `dir`, sorted.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_cache_dir_is_empty() {
        let dir = temp_cache_dir();
        assert!(dir.path().is_dir());
        assert!(list_files(dir.path()).is_empty());
    }

    #[test]
    fn test_list_files_sorted() {
        let dir = temp_cache_dir();
        std::fs::write(dir.path().join("b.dat"), b"1").unwrap();
        std::fs::write(dir.path().join("a.dat"), b"2").unwrap();
        assert_eq!(list_files(dir.path()), vec!["a.dat", "b.dat"]);
    }
}
