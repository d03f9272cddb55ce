//! Sample sources: where polar scans come from.
//!
//! The transform core only sees [`PolarScan`] records; each input format
//! implements [`SampleSource`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RegridError, Result};
use crate::scan::PolarScan;

/// Produces one polar scan per call.
pub trait SampleSource {
    /// Read and validate the scan.
    fn read_scan(&self) -> Result<PolarScan>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_scan(&self) -> Result<PolarScan> {
        (**self).read_scan()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// A scan stored as a JSON [`PolarScan`] document. No-data values are `null`.
#[derive(Debug, Clone)]
pub struct JsonScanSource {
    path: PathBuf,
}

impl JsonScanSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for JsonScanSource {
    fn read_scan(&self) -> Result<PolarScan> {
        let file = File::open(&self.path).map_err(|e| {
            RegridError::source_failed(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        let scan: PolarScan = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            RegridError::source_failed(format!("cannot parse {}: {}", self.path.display(), e))
        })?;
        scan.validate()?;

        debug!(
            path = %self.path.display(),
            radar = %scan.radar,
            n_azimuth = scan.geometry.n_azimuth,
            n_range = scan.geometry.n_range,
            "Read scan"
        );
        Ok(scan)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// A scan already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    scan: PolarScan,
}

impl MemorySource {
    pub fn new(scan: PolarScan) -> Self {
        Self { scan }
    }
}

impl SampleSource for MemorySource {
    fn read_scan(&self) -> Result<PolarScan> {
        self.scan.validate()?;
        Ok(self.scan.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.scan.radar)
    }
}

/// Pick a source for a file by its extension.
pub fn source_for_path(path: &Path) -> Result<Box<dyn SampleSource>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Box::new(JsonScanSource::new(path))),
        other => Err(RegridError::source_failed(format!(
            "unsupported scan format {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanGeometry;
    use test_utils::{create_scan_values, temp_cache_dir};

    fn scan() -> PolarScan {
        let geometry = ScanGeometry {
            azimuth_start: 0.0,
            azimuth_step: 90.0,
            range_start: 500.0,
            range_step: 500.0,
            elevation: 1.0,
            n_azimuth: 4,
            n_range: 3,
        };
        let mut values = create_scan_values(4, 3);
        values[5] = f32::NAN;
        PolarScan::new("boo", (10.0469, 54.0044), geometry, values)
    }

    #[test]
    fn test_json_roundtrip_through_file() {
        let dir = temp_cache_dir();
        let path = dir.path().join("boo.json");
        std::fs::write(&path, serde_json::to_string(&scan()).unwrap()).unwrap();

        let source = source_for_path(&path).unwrap();
        let read = source.read_scan().unwrap();

        assert_eq!(read.radar, "boo");
        assert_eq!(read.geometry, scan().geometry);
        assert!(read.values[5].is_nan());
        assert_eq!(read.values[4], 1001.0);
        assert!(source.describe().starts_with("json:"));
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let source = JsonScanSource::new("/nonexistent/scan.json");
        assert!(matches!(source.read_scan(), Err(RegridError::Source(_))));
    }

    #[test]
    fn test_invalid_scan_rejected() {
        let dir = temp_cache_dir();
        let path = dir.path().join("short.json");
        let mut bad = scan();
        bad.values.truncate(5);
        std::fs::write(&path, serde_json::to_string(&bad).unwrap()).unwrap();

        assert!(matches!(
            JsonScanSource::new(&path).read_scan(),
            Err(RegridError::SampleCountMismatch { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(source_for_path(Path::new("scan.nc")).is_err());
    }

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new(scan());
        assert_eq!(source.read_scan().unwrap().values.len(), 12);
        assert_eq!(source.describe(), "memory:boo");
    }
}
