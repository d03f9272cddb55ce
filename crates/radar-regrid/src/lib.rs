//! Polar Radar Resampling onto Rotated-Pole Grids
//!
//! This crate puts irregularly spaced polar weather-radar samples onto a
//! regular longitude/latitude lattice in a rotated-pole frame, for plotting
//! and for comparing radars against each other. It provides:
//!
//! - **Densification**: azimuth rows repeated `k` times so coarse beams do
//!   not leave empty cells near the radar
//! - **Geolocation**: beam-model geolocation followed by a rotated-pole
//!   re-projection (see the `projection` crate)
//! - **Cached binning**: the cell-to-sample index matrix depends only on
//!   geometry, so it is built once per signature and reused
//! - **Aggregation**: per-cell arithmetic mean with a NaN no-data value
//!
//! # Architecture
//!
//! ```text
//! SampleSource::read_scan()
//!      │
//!      ▼
//! PolarScan ──► densify(k) ──► SourceSampleSet
//!                                  │
//!                                  ├─► CoordinateTransformPipeline
//!                                  │     pixel centers ─► geodesic ─► rotated pole
//!                                  │
//!                                  ├─► GridSpec::resolve (sentinel bounds)
//!                                  │
//!                                  ├─► IndexMatrixBuilder::get_or_build(signature)
//!                                  │         │
//!                                  │         ├─► Store hit: reuse matrix
//!                                  │         │
//!                                  │         └─► Miss / failed load: build, store
//!                                  │
//!                                  └─► GridAggregator::aggregate
//!                                            │
//!                                            ▼
//!                                      GriddedField
//! ```
//!
//! # Example
//!
//! ```ignore
//! use radar_regrid::{GridSpec, RegridConfig, Regridder, JsonScanSource, SampleSource};
//!
//! let regridder = Regridder::from_config(&RegridConfig::from_env())?;
//! let scan = JsonScanSource::new("scans/pattern.json").read_scan()?;
//! let grid = GridSpec::fixed((-0.2, 0.2), (-0.2, 0.2), 250.0, 0.00225)?;
//!
//! let output = regridder.regrid(&scan, &grid)?;
//! println!("{} of {} cells have data", output.field.valid_count(), output.field.data.len());
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod grid;
pub mod index_matrix;
pub mod nodata;
pub mod postprocess;
pub mod regridder;
pub mod scan;
pub mod source;
pub mod transform;

// Re-export commonly used types at crate root
pub use aggregate::{is_no_data, GridAggregator, GriddedField, NO_DATA};
pub use cache::{
    CacheError, CacheStats, FileCacheStore, IndexMatrixStore, MemoryCacheStore, NoopCacheStore,
    TieredCacheStore,
};
pub use config::{PoleConfig, RegridConfig};
pub use error::{RegridError, Result, TransformStage};
pub use grid::{Bound, BoundValue, Extent, GridConfig, GridSpec, ResolvedGrid};
pub use index_matrix::{CacheOutcome, IndexMatrix, IndexMatrixBuilder, Signature};
pub use postprocess::{difference, floor_values, mask_beyond_range};
pub use regridder::{BoxedStore, RegridOutput, Regridder, ScanInput};
pub use scan::{PolarScan, RadarIdentity, ScanGeometry};
pub use source::{source_for_path, JsonScanSource, MemorySource, SampleSource};
pub use transform::{circular_mean_deg, densify, CoordinateTransformPipeline, PixelCenters, SourceSampleSet};
