//! Common test fixtures for radar-regrid tests.
//!
//! This module provides pre-defined radar sites, scan geometries and grid
//! extents that represent common scenarios in radar resampling.

/// Radar site positions as (lon, lat) in degrees.
pub mod site {
    /// PATTERN X-band radar at the Hamburg University meteorological mast
    pub const HAMBURG: (f64, f64) = (9.9734, 53.5566);

    /// DWD C-band radar Boostedt
    pub const BOOSTEDT: (f64, f64) = (10.0469, 54.0044);
}

/// Polar acquisition geometry of a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanShape {
    pub n_azimuth: usize,
    pub n_range: usize,
    pub azimuth_start: f64,
    pub azimuth_step: f64,
    pub range_start: f64,
    pub range_step: f64,
    pub elevation: f64,
}

/// Common scan geometries.
pub mod scan {
    use super::ScanShape;

    /// X-band local area radar: 1 deg beams, 60 m bins out to 20 km
    pub const PATTERN: ScanShape = ScanShape {
        n_azimuth: 360,
        n_range: 333,
        azimuth_start: 0.5,
        azimuth_step: 1.0,
        range_start: 60.0,
        range_step: 60.0,
        elevation: 1.5,
    };

    /// Tiny scan for fast unit tests: 10 deg beams, 1 km bins
    pub const TINY: ScanShape = ScanShape {
        n_azimuth: 36,
        n_range: 10,
        azimuth_start: 0.0,
        azimuth_step: 10.0,
        range_start: 1000.0,
        range_step: 1000.0,
        elevation: 0.5,
    };
}

/// Grid extents in rotated coordinates as (lon_start, lon_end, lat_start, lat_end).
pub mod extent {
    /// 2 x 2 cells at 1 degree resolution from the origin
    pub const UNIT_2X2: (f64, f64, f64, f64) = (0.0, 2.0, 0.0, 2.0);

    /// About 40 km around a site placed at the rotated origin
    pub const LOCAL_AREA: (f64, f64, f64, f64) = (-0.2, 0.2, -0.2, 0.2);

    /// Inverted (end before start)
    pub const INVERTED: (f64, f64, f64, f64) = (1.0, 0.0, 1.0, 0.0);
}
