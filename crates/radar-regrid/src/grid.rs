//! Destination grid specification.
//!
//! A [`GridSpec`] is validated once from a [`GridConfig`]. Extent bounds may be
//! left to the data ("min"/"max" sentinels); they are resolved exactly once
//! against a transformed sample set, producing an immutable [`ResolvedGrid`]
//! with fixed bounds and cell counts.

use serde::{Deserialize, Serialize};

use crate::error::{RegridError, Result};
use crate::transform::SourceSampleSet;

/// Sentinel keyword for start bounds.
pub const MIN_SENTINEL: &str = "min";

/// Sentinel keyword for end bounds.
pub const MAX_SENTINEL: &str = "max";

/// Largest grid accepted, in cells. Bounds the index matrix allocation.
pub const MAX_CELLS: usize = 1 << 28;

/// One extent bound as written in configuration: a number or a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundValue {
    Number(f64),
    Keyword(String),
}

impl From<f64> for BoundValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for BoundValue {
    fn from(s: &str) -> Self {
        Self::Keyword(s.to_string())
    }
}

/// A validated extent bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Fixed coordinate in the rotated frame (degrees)
    Fixed(f64),
    /// Smallest observed coordinate of the data
    DataMin,
    /// Largest observed coordinate of the data
    DataMax,
}

impl Bound {
    fn fixed(&self) -> Option<f64> {
        match self {
            Self::Fixed(v) => Some(*v),
            _ => None,
        }
    }
}

/// Raw grid configuration, e.g. from YAML.
///
/// ```yaml
/// lon_start: min
/// lon_end: 0.25
/// lat_start: -0.25
/// lat_end: max
/// res_m: 250.0
/// res_deg: 0.00225
/// center: [0.0, 0.0]
/// max_range: 20000.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub lon_start: BoundValue,
    pub lon_end: BoundValue,
    pub lat_start: BoundValue,
    pub lat_end: BoundValue,
    /// Cell size in meters
    pub res_m: f64,
    /// Cell size in degrees of the rotated frame
    pub res_deg: f64,
    /// Grid center in the rotated frame
    #[serde(default)]
    pub center: (f64, f64),
    /// Radial cutoff from `center` in meters (0 disables)
    #[serde(default)]
    pub max_range: f64,
}

/// Validated grid specification. Extent bounds may still be sentinels.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub lon_start: Bound,
    pub lon_end: Bound,
    pub lat_start: Bound,
    pub lat_end: Bound,
    pub res_m: f64,
    pub res_deg: f64,
    pub center: (f64, f64),
    pub max_range: f64,
}

impl GridSpec {
    /// Validate a raw configuration.
    pub fn from_config(config: &GridConfig) -> Result<Self> {
        let spec = Self {
            lon_start: parse_bound("lon_start", &config.lon_start, MIN_SENTINEL)?,
            lon_end: parse_bound("lon_end", &config.lon_end, MAX_SENTINEL)?,
            lat_start: parse_bound("lat_start", &config.lat_start, MIN_SENTINEL)?,
            lat_end: parse_bound("lat_end", &config.lat_end, MAX_SENTINEL)?,
            res_m: config.res_m,
            res_deg: config.res_deg,
            center: config.center,
            max_range: config.max_range,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Grid with fixed extent and no range cutoff.
    pub fn fixed(
        (lon_start, lon_end): (f64, f64),
        (lat_start, lat_end): (f64, f64),
        res_m: f64,
        res_deg: f64,
    ) -> Result<Self> {
        let spec = Self {
            lon_start: Bound::Fixed(lon_start),
            lon_end: Bound::Fixed(lon_end),
            lat_start: Bound::Fixed(lat_start),
            lat_end: Bound::Fixed(lat_end),
            res_m,
            res_deg,
            center: (0.0, 0.0),
            max_range: 0.0,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Set the grid center and radial cutoff.
    pub fn with_range(mut self, center: (f64, f64), max_range: f64) -> Result<Self> {
        self.center = center;
        self.max_range = max_range;
        self.validate()?;
        Ok(self)
    }

    /// Whether any bound must be taken from the data.
    pub fn needs_data_extent(&self) -> bool {
        [self.lon_start, self.lon_end, self.lat_start, self.lat_end]
            .iter()
            .any(|b| b.fixed().is_none())
    }

    /// Check field domains and sentinel placement.
    pub fn validate(&self) -> Result<()> {
        check_bound_kind("lon_start", self.lon_start, Bound::DataMin)?;
        check_bound_kind("lat_start", self.lat_start, Bound::DataMin)?;
        check_bound_kind("lon_end", self.lon_end, Bound::DataMax)?;
        check_bound_kind("lat_end", self.lat_end, Bound::DataMax)?;

        if !(self.res_deg.is_finite() && self.res_deg > 0.0) {
            return Err(RegridError::config(
                "res_deg",
                format!("resolution must be a positive number, got {}", self.res_deg),
            ));
        }
        if !(self.res_m.is_finite() && self.res_m > 0.0) {
            return Err(RegridError::config(
                "res_m",
                format!("resolution must be a positive number, got {}", self.res_m),
            ));
        }
        if !(self.max_range.is_finite() && self.max_range >= 0.0) {
            return Err(RegridError::config(
                "max_range",
                format!("must be a non-negative number, got {}", self.max_range),
            ));
        }
        if !(self.center.0.is_finite() && self.center.1.is_finite()) {
            return Err(RegridError::config(
                "center",
                format!("must be finite, got {:?}", self.center),
            ));
        }

        // Inverted fixed extents can be rejected before any data is seen
        if let (Some(start), Some(end)) = (self.lon_start.fixed(), self.lon_end.fixed()) {
            check_extent("lon", start, end)?;
        }
        if let (Some(start), Some(end)) = (self.lat_start.fixed(), self.lat_end.fixed()) {
            check_extent("lat", start, end)?;
        }
        Ok(())
    }

    /// Replace sentinels with the observed extent of a transformed sample set.
    pub fn resolve(&self, samples: &SourceSampleSet) -> Result<ResolvedGrid> {
        self.resolve_with_extent(samples.extent())
    }

    /// Replace sentinels with the given data extent.
    ///
    /// `extent` is `None` when no transformed positions are available; this is
    /// only an error if a sentinel actually needs resolving.
    pub fn resolve_with_extent(&self, extent: Option<Extent>) -> Result<ResolvedGrid> {
        let pick = |field: &str, bound: Bound| -> Result<f64> {
            match (bound, extent) {
                (Bound::Fixed(v), _) => Ok(v),
                (Bound::DataMin, Some(e)) if field.starts_with("lon") => Ok(e.min_lon),
                (Bound::DataMin, Some(e)) => Ok(e.min_lat),
                (Bound::DataMax, Some(e)) if field.starts_with("lon") => Ok(e.max_lon),
                (Bound::DataMax, Some(e)) => Ok(e.max_lat),
                (_, None) => Err(RegridError::config(
                    field,
                    "cannot resolve from data: the sample set has no transformed positions",
                )),
            }
        };

        let lon_start = pick("lon_start", self.lon_start)?;
        let lon_end = pick("lon_end", self.lon_end)?;
        let lat_start = pick("lat_start", self.lat_start)?;
        let lat_end = pick("lat_end", self.lat_end)?;

        check_extent("lon", lon_start, lon_end)?;
        check_extent("lat", lat_start, lat_end)?;

        let lon_dim = cells_along("lon", lon_start, lon_end, self.res_deg)?;
        let lat_dim = cells_along("lat", lat_start, lat_end, self.res_deg)?;
        match lat_dim.checked_mul(lon_dim) {
            Some(n) if n <= MAX_CELLS => {}
            _ => {
                return Err(RegridError::config(
                    "res_deg",
                    format!("grid of {lat_dim}x{lon_dim} cells exceeds {MAX_CELLS} cells"),
                ))
            }
        }

        Ok(ResolvedGrid {
            lon_start,
            lon_end,
            lat_start,
            lat_end,
            res_m: self.res_m,
            res_deg: self.res_deg,
            lon_dim,
            lat_dim,
            center: self.center,
            max_range: self.max_range,
        })
    }
}

fn parse_bound(field: &str, value: &BoundValue, sentinel: &str) -> Result<Bound> {
    match value {
        BoundValue::Number(v) if v.is_finite() => Ok(Bound::Fixed(*v)),
        BoundValue::Number(v) => Err(RegridError::config(
            field,
            format!("expected a finite number or \"{sentinel}\", got {v}"),
        )),
        BoundValue::Keyword(k) if k == sentinel => Ok(if sentinel == MIN_SENTINEL {
            Bound::DataMin
        } else {
            Bound::DataMax
        }),
        BoundValue::Keyword(k) => Err(RegridError::config(
            field,
            format!("expected a number or \"{sentinel}\", got \"{k}\""),
        )),
    }
}

fn check_bound_kind(field: &str, bound: Bound, allowed_sentinel: Bound) -> Result<()> {
    match bound {
        Bound::Fixed(v) if !v.is_finite() => Err(RegridError::config(
            field,
            format!("must be finite, got {v}"),
        )),
        Bound::Fixed(_) => Ok(()),
        b if b == allowed_sentinel => Ok(()),
        b => Err(RegridError::config(
            field,
            format!("sentinel {b:?} is not allowed here"),
        )),
    }
}

fn check_extent(axis: &str, start: f64, end: f64) -> Result<()> {
    if end <= start {
        return Err(RegridError::config(
            format!("{axis}_end"),
            format!("{axis}_end ({end}) must be greater than {axis}_start ({start})"),
        ));
    }
    Ok(())
}

/// Number of cells needed to cover `[start, end)`: `ceil((end - start) / res)`.
///
/// Deviates from a literal ceiling on purpose: a span within a relative
/// 1e-9 of a whole number of cells is snapped to that number, so `0.3 / 0.1`
/// gives 3 cells rather than 4.
///
/// Fails when the count is not finite or exceeds [`MAX_CELLS`].
pub fn cells_along(axis: &str, start: f64, end: f64, res: f64) -> Result<usize> {
    let span = (end - start) / res;
    let nearest = span.round();
    let cells = if (span - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        nearest
    } else {
        span.ceil()
    };
    if !cells.is_finite() || cells > MAX_CELLS as f64 {
        return Err(RegridError::config(
            "res_deg",
            format!("{axis} span {start}..{end} at {res} degrees needs more than {MAX_CELLS} cells"),
        ));
    }
    Ok((cells as usize).max(1))
}

/// Observed bounding box of sample positions in the rotated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Extent {
    /// Bounding box of a set of (lon, lat) positions; `None` when empty.
    pub fn of_positions<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a (f64, f64)>,
    {
        positions.into_iter().fold(None, |acc, &(lon, lat)| {
            Some(match acc {
                None => Self {
                    min_lon: lon,
                    max_lon: lon,
                    min_lat: lat,
                    max_lat: lat,
                },
                Some(e) => Self {
                    min_lon: e.min_lon.min(lon),
                    max_lon: e.max_lon.max(lon),
                    min_lat: e.min_lat.min(lat),
                    max_lat: e.max_lat.max(lat),
                },
            })
        })
    }
}

/// Grid with all bounds fixed and cell counts derived.
///
/// Row `r` covers latitudes `[lat_start + r*res_deg, lat_start + (r+1)*res_deg)`,
/// column `c` likewise in longitude. Row 0 is the southernmost row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGrid {
    pub lon_start: f64,
    pub lon_end: f64,
    pub lat_start: f64,
    pub lat_end: f64,
    pub res_m: f64,
    pub res_deg: f64,
    pub lon_dim: usize,
    pub lat_dim: usize,
    pub center: (f64, f64),
    pub max_range: f64,
}

impl ResolvedGrid {
    /// Cell counts as `(lat_dim, lon_dim)`.
    pub fn cell_dims(&self) -> (usize, usize) {
        (self.lat_dim, self.lon_dim)
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.lat_dim * self.lon_dim
    }

    /// Cell containing a rotated-frame position, using floor division.
    ///
    /// A position exactly on a cell edge belongs to the cell above it.
    /// Returns `None` outside the lattice or for non-finite input.
    pub fn cell_of(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let row = ((lat - self.lat_start) / self.res_deg).floor();
        let col = ((lon - self.lon_start) / self.res_deg).floor();
        if row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.lat_dim && col < self.lon_dim).then_some((row, col))
    }

    /// Row-major flat index of a cell.
    #[inline]
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.lon_dim + col
    }

    /// Western edge of each column.
    pub fn lon_axis(&self) -> Vec<f64> {
        (0..self.lon_dim)
            .map(|c| self.lon_start + c as f64 * self.res_deg)
            .collect()
    }

    /// Southern edge of each row.
    pub fn lat_axis(&self) -> Vec<f64> {
        (0..self.lat_dim)
            .map(|r| self.lat_start + r as f64 * self.res_deg)
            .collect()
    }

    /// Center of a cell as (lon, lat).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.lon_start + (col as f64 + 0.5) * self.res_deg,
            self.lat_start + (row as f64 + 0.5) * self.res_deg,
        )
    }

    /// Meters per degree implied by the two resolutions.
    pub fn meters_per_degree(&self) -> f64 {
        self.res_m / self.res_deg
    }
}
