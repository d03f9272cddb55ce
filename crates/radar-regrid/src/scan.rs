//! Polar scan records as produced by sample sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RegridError, Result};

/// Acquisition geometry of a polar scan.
///
/// Azimuths are the near edge of each beam (degrees clockwise from north);
/// ranges are the far edge of each bin (meters), both looking outward from
/// the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanGeometry {
    /// Azimuth of the first row (degrees, [0, 360))
    pub azimuth_start: f64,
    /// Angular width of one row (degrees)
    pub azimuth_step: f64,
    /// Range of the first bin (meters)
    pub range_start: f64,
    /// Length of one range bin (meters)
    pub range_step: f64,
    /// Beam elevation angle (degrees)
    pub elevation: f64,
    /// Number of azimuth rows
    pub n_azimuth: usize,
    /// Number of range bins per row
    pub n_range: usize,
}

impl ScanGeometry {
    /// Derive start and step values from coordinate vectors as stored in
    /// radar files.
    ///
    /// `azimuth_offset` rotates the whole scan, for radars whose azimuth
    /// reference is not north. Steps are taken from the first two entries.
    pub fn from_coordinate_vectors(
        azimuths: &[f64],
        ranges: &[f64],
        elevation: f64,
        azimuth_offset: f64,
    ) -> Result<Self> {
        if azimuths.len() < 2 {
            return Err(RegridError::source_failed(format!(
                "need at least two azimuths to derive the step, got {}",
                azimuths.len()
            )));
        }
        if ranges.len() < 2 {
            return Err(RegridError::source_failed(format!(
                "need at least two ranges to derive the step, got {}",
                ranges.len()
            )));
        }

        let geometry = Self {
            azimuth_start: (azimuths[0] + azimuth_offset + 360.0).rem_euclid(360.0),
            azimuth_step: (azimuths[1] - azimuths[0] + 360.0).rem_euclid(360.0),
            range_start: ranges[0],
            range_step: ranges[1] - ranges[0],
            elevation,
            n_azimuth: azimuths.len(),
            n_range: ranges.len(),
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Total number of samples.
    pub fn sample_count(&self) -> usize {
        self.n_azimuth * self.n_range
    }

    /// Check that the geometry describes a usable scan.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("azimuth_start", self.azimuth_start),
            ("azimuth_step", self.azimuth_step),
            ("range_start", self.range_start),
            ("range_step", self.range_step),
            ("elevation", self.elevation),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(RegridError::source_failed(format!(
                    "scan geometry `{name}` is not finite: {value}"
                )));
            }
        }

        if self.n_azimuth == 0 || self.n_range == 0 {
            return Err(RegridError::source_failed(format!(
                "empty scan: {} azimuth rows x {} range bins",
                self.n_azimuth, self.n_range
            )));
        }
        if self.azimuth_step <= 0.0 || self.azimuth_step > 360.0 {
            return Err(RegridError::source_failed(format!(
                "azimuth_step must be in (0, 360], got {}",
                self.azimuth_step
            )));
        }
        if self.range_step <= 0.0 {
            return Err(RegridError::source_failed(format!(
                "range_step must be > 0, got {}",
                self.range_step
            )));
        }
        if self.range_start < 0.0 {
            return Err(RegridError::source_failed(format!(
                "range_start must be >= 0, got {}",
                self.range_start
            )));
        }
        Ok(())
    }
}

/// A single polar scan: geometry, site and measured values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolarScan {
    /// Radar name (e.g., "PATTERN", "boo")
    pub radar: String,
    /// Site longitude (degrees)
    pub site_lon: f64,
    /// Site latitude (degrees)
    pub site_lat: f64,
    /// Antenna altitude (meters). Carried through; beam heights are not
    /// used for placement, so it plays no part in the identity.
    #[serde(default)]
    pub site_altitude: f64,
    /// Acquisition geometry
    pub geometry: ScanGeometry,
    /// Measured values, row-major (azimuth row, range bin). NaN is no-data.
    #[serde(with = "crate::nodata::nullable")]
    pub values: Vec<f32>,
    /// Scan start time
    #[serde(default)]
    pub time_start: Option<DateTime<Utc>>,
    /// Scan end time
    #[serde(default)]
    pub time_end: Option<DateTime<Utc>>,
}

impl PolarScan {
    /// Create a scan without timing information.
    pub fn new(
        radar: impl Into<String>,
        (site_lon, site_lat): (f64, f64),
        geometry: ScanGeometry,
        values: Vec<f32>,
    ) -> Self {
        Self {
            radar: radar.into(),
            site_lon,
            site_lat,
            site_altitude: 0.0,
            geometry,
            values,
            time_start: None,
            time_end: None,
        }
    }

    /// Check geometry, site and value array consistency.
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;

        if !self.site_lon.is_finite() || !self.site_lat.is_finite() {
            return Err(RegridError::source_failed(format!(
                "site position is not finite: ({}, {})",
                self.site_lon, self.site_lat
            )));
        }

        let expected = self.geometry.sample_count();
        if self.values.len() != expected {
            return Err(RegridError::SampleCountMismatch {
                expected,
                actual: self.values.len(),
            });
        }
        Ok(())
    }

    /// Value at (azimuth row, range bin).
    pub fn value(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.geometry.n_azimuth || col >= self.geometry.n_range {
            return None;
        }
        self.values.get(row * self.geometry.n_range + col).copied()
    }

    /// Identity of the radar and its acquisition geometry.
    pub fn identity(&self) -> RadarIdentity {
        RadarIdentity {
            name: self.radar.clone(),
            site_lon: self.site_lon,
            site_lat: self.site_lat,
            geometry: self.geometry.clone(),
        }
    }
}

/// Everything about a radar that determines where its samples land.
///
/// Two scans with the same identity produce the same sample positions, so
/// they can share an index matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarIdentity {
    pub name: String,
    pub site_lon: f64,
    pub site_lat: f64,
    pub geometry: ScanGeometry,
}

impl RadarIdentity {
    /// Radar name reduced to characters that are safe in file names.
    pub fn file_safe_name(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        if name.is_empty() {
            "radar".to_string()
        } else {
            name
        }
    }

    /// Exact textual form of the geometry. Floats are written as their bit
    /// patterns so equal identities always give equal strings.
    pub fn canonical(&self) -> String {
        let g = &self.geometry;
        format!(
            "{}|{:016x}|{:016x}|{:016x}|{:016x}|{:016x}|{:016x}|{:016x}|{}|{}",
            self.name,
            canonical_bits(self.site_lon),
            canonical_bits(self.site_lat),
            canonical_bits(g.azimuth_start),
            canonical_bits(g.azimuth_step),
            canonical_bits(g.range_start),
            canonical_bits(g.range_step),
            canonical_bits(g.elevation),
            g.n_azimuth,
            g.n_range,
        )
    }
}

/// Bit pattern of a float with -0.0 folded onto 0.0.
pub(crate) fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}
