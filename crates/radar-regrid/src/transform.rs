//! Polar sample positions to rotated-frame coordinates.
//!
//! Stages, in order:
//! 1. [`densify`]: repeat every azimuth row `k` times, narrowing each row to
//!    `step / k` degrees
//! 2. [`PixelCenters`]: representative point of each (row, bin) box
//! 3. geodesic forward projection to geographic lon/lat
//! 4. rotated-pole re-projection
//!
//! Stages 3 and 4 are delegated to [`GeodesicForward`] and [`PoleRotation`]
//! implementations. Any failure aborts the whole run.

use std::time::Instant;

use projection::{EffectiveEarthBeam, GeodesicForward, PoleRotation, ProjectionError, RotatedPole};
use tracing::debug;

use crate::error::{RegridError, Result, TransformStage};
use crate::grid::Extent;
use crate::scan::{PolarScan, RadarIdentity};

/// Densified polar samples, optionally enriched with rotated-frame positions.
///
/// Sample `i` sits at densified azimuth row `i / n_range` and range bin
/// `i % n_range`. Stages attach data but never reorder or drop samples.
#[derive(Debug, Clone)]
pub struct SourceSampleSet {
    identity: RadarIdentity,
    /// Densification factor that produced this set
    pub factor: usize,
    /// Densified azimuth row count (`k * original rows`)
    pub n_azimuth: usize,
    /// Range bins per row
    pub n_range: usize,
    /// Near-edge azimuth of densified row 0 (degrees)
    pub azimuth_start: f64,
    /// Angular width of one densified row (degrees)
    pub azimuth_width: f64,
    /// Far edge of the first range bin (meters)
    pub range_start: f64,
    pub range_step: f64,
    pub elevation: f64,
    pub site_lon: f64,
    pub site_lat: f64,
    values: Vec<f32>,
    positions: Option<Vec<(f64, f64)>>,
}

impl SourceSampleSet {
    pub fn identity(&self) -> &RadarIdentity {
        &self.identity
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Densified values, aligned with sample indices.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Rotated-frame (lon, lat) per sample; `None` until transformed.
    pub fn positions(&self) -> Option<&[(f64, f64)]> {
        self.positions.as_deref()
    }

    pub fn is_transformed(&self) -> bool {
        self.positions.is_some()
    }

    /// Bounding box of the transformed positions.
    pub fn extent(&self) -> Option<Extent> {
        self.positions.as_ref().and_then(|p| Extent::of_positions(p))
    }

    /// (densified azimuth row, range bin) of a sample index.
    pub fn address(&self, index: usize) -> (usize, usize) {
        (index / self.n_range, index % self.n_range)
    }

    /// Replace the values with another acquisition of the same radar,
    /// densified with this set's factor.
    ///
    /// Positions are kept, so a transformed set can be reused for later scans.
    pub fn replace_values(&mut self, scan: &PolarScan) -> Result<()> {
        scan.validate()?;
        if scan.identity() != self.identity {
            return Err(RegridError::source_failed(format!(
                "scan of radar `{}` does not match the geometry of this sample set",
                scan.radar
            )));
        }
        self.values = densified_values(scan, self.factor);
        Ok(())
    }
}

/// Stage 1: repeat each azimuth row `factor` times.
///
/// Densified row `r * factor + i` covers
/// `[start + (r + i/factor) * step, start + (r + (i+1)/factor) * step)`.
/// A factor of 1 leaves the geometry unchanged.
pub fn densify(scan: &PolarScan, factor: usize) -> Result<SourceSampleSet> {
    if factor == 0 {
        return Err(RegridError::config(
            "azimuth_factor",
            "densification factor must be at least 1",
        ));
    }
    scan.validate()?;

    let g = &scan.geometry;
    Ok(SourceSampleSet {
        identity: scan.identity(),
        factor,
        n_azimuth: g.n_azimuth * factor,
        n_range: g.n_range,
        azimuth_start: g.azimuth_start,
        azimuth_width: g.azimuth_step / factor as f64,
        range_start: g.range_start,
        range_step: g.range_step,
        elevation: g.elevation,
        site_lon: scan.site_lon,
        site_lat: scan.site_lat,
        values: densified_values(scan, factor),
        positions: None,
    })
}

fn densified_values(scan: &PolarScan, factor: usize) -> Vec<f32> {
    let n_range = scan.geometry.n_range;
    let mut values = Vec::with_capacity(scan.values.len() * factor);
    for row in scan.values.chunks(n_range) {
        for _ in 0..factor {
            values.extend_from_slice(row);
        }
    }
    values
}

/// Stage 2: pixel centers of a densified sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelCenters {
    /// Center range of each bin (meters)
    pub ranges: Vec<f64>,
    /// Center azimuth of each densified row (degrees, [0, 360))
    pub azimuths: Vec<f64>,
}

impl PixelCenters {
    /// Ranges are given at the far edge and azimuths at the near edge of
    /// each box; centers are the midpoints of the bounding edges.
    pub fn of(set: &SourceSampleSet) -> Self {
        let ranges = (0..set.n_range)
            .map(|col| {
                let far = set.range_start + col as f64 * set.range_step;
                let near = (far - set.range_step).max(0.0);
                0.5 * (near + far)
            })
            .collect();

        let azimuths = (0..set.n_azimuth)
            .map(|row| {
                let near = set.azimuth_start + row as f64 * set.azimuth_width;
                circular_mean_deg(near, near + set.azimuth_width)
            })
            .collect();

        Self { ranges, azimuths }
    }
}

/// Mean of two angles on the circle, in [0, 360).
///
/// For opposite angles the mean is undefined; the midpoint of the arc
/// going clockwise from `a` to `b` is returned.
pub fn circular_mean_deg(a: f64, b: f64) -> f64 {
    let (sin_a, cos_a) = a.to_radians().sin_cos();
    let (sin_b, cos_b) = b.to_radians().sin_cos();
    let (s, c) = (sin_a + sin_b, cos_a + cos_b);

    let mean = if s.hypot(c) < 1e-12 {
        a + (b - a).rem_euclid(360.0) / 2.0
    } else {
        s.atan2(c).to_degrees()
    };
    let wrapped = mean.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Applies stages 2 to 4 to a sample set.
#[derive(Debug, Clone)]
pub struct CoordinateTransformPipeline<G, R> {
    geodesic: G,
    rotation: R,
}

impl CoordinateTransformPipeline<EffectiveEarthBeam, RotatedPole> {
    /// 4/3 effective-earth beam model followed by the given rotated pole.
    pub fn standard(pole: RotatedPole) -> Self {
        Self::new(EffectiveEarthBeam::new(), pole)
    }
}

impl<G: GeodesicForward, R: PoleRotation> CoordinateTransformPipeline<G, R> {
    pub fn new(geodesic: G, rotation: R) -> Self {
        Self { geodesic, rotation }
    }

    /// Densify and transform a scan.
    pub fn run(&self, scan: &PolarScan, factor: usize) -> Result<SourceSampleSet> {
        let mut set = densify(scan, factor)?;
        self.apply(&mut set)?;
        Ok(set)
    }

    /// Attach rotated-frame positions to every sample of the set.
    ///
    /// Heights returned by the collaborators are discarded. On error the set
    /// is left untransformed.
    pub fn apply(&self, set: &mut SourceSampleSet) -> Result<()> {
        let start = Instant::now();
        let centers = PixelCenters::of(set);
        let mut positions = Vec::with_capacity(set.len());

        for (row, &azimuth) in centers.azimuths.iter().enumerate() {
            for (col, &range) in centers.ranges.iter().enumerate() {
                let index = row * set.n_range + col;
                let fail = |stage, source| RegridError::Transform {
                    index,
                    row,
                    col,
                    stage,
                    source,
                };

                let geo = self
                    .geodesic
                    .forward(range, azimuth, set.elevation, set.site_lon, set.site_lat)
                    .and_then(|p| finite_pair(p.lon, p.lat))
                    .map_err(|e| fail(TransformStage::Geographic, e))?;

                let rotated = self
                    .rotation
                    .rotate(geo.0, geo.1)
                    .and_then(|p| finite_pair(p.lon, p.lat))
                    .map_err(|e| fail(TransformStage::RotatedPole, e))?;

                positions.push(rotated);
            }
        }

        debug!(
            radar = %set.identity.name,
            samples = positions.len(),
            factor = set.factor,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Transformed sample positions"
        );
        set.positions = Some(positions);
        Ok(())
    }
}

fn finite_pair(lon: f64, lat: f64) -> projection::Result<(f64, f64)> {
    if !lon.is_finite() {
        return Err(ProjectionError::NonFinite {
            what: "longitude",
            value: lon,
        });
    }
    if !lat.is_finite() {
        return Err(ProjectionError::NonFinite {
            what: "latitude",
            value: lat,
        });
    }
    Ok((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanGeometry;
    use projection::{GeoPoint, RotatedPoint};
    use test_utils::{assert_approx_eq, create_scan_values, fixtures::scan as shapes};

    fn tiny_scan() -> PolarScan {
        let s = shapes::TINY;
        let geometry = ScanGeometry {
            azimuth_start: s.azimuth_start,
            azimuth_step: s.azimuth_step,
            range_start: s.range_start,
            range_step: s.range_step,
            elevation: s.elevation,
            n_azimuth: s.n_azimuth,
            n_range: s.n_range,
        };
        PolarScan::new("tiny", (10.0, 54.0), geometry, create_scan_values(s.n_azimuth, s.n_range))
    }

    fn flat_geodesic(r: f64, az: f64, _el: f64, lon: f64, lat: f64) -> projection::Result<GeoPoint> {
        // Planar: 1 degree per 100 km
        let (sin, cos) = az.to_radians().sin_cos();
        Ok(GeoPoint {
            lon: lon + r * sin / 100_000.0,
            lat: lat + r * cos / 100_000.0,
            height: 42.0,
        })
    }

    fn no_rotation(lon: f64, lat: f64) -> projection::Result<RotatedPoint> {
        Ok(RotatedPoint {
            lon,
            lat,
            height: 0.0,
        })
    }

    #[test]
    fn test_densify_factor_one_is_noop() {
        let scan = tiny_scan();
        let set = densify(&scan, 1).unwrap();

        assert_eq!(set.n_azimuth, 36);
        assert_eq!(set.azimuth_width, 10.0);
        assert_eq!(set.values(), scan.values.as_slice());
    }

    #[test]
    fn test_densify_repeats_rows() {
        let scan = tiny_scan();
        let set = densify(&scan, 3).unwrap();

        assert_eq!(set.n_azimuth, 36 * 3);
        assert_eq!(set.len(), 36 * 3 * 10);
        assert_approx_eq!(set.azimuth_width, 10.0 / 3.0, 1e-12);
        // Densified rows 3, 4, 5 all carry original row 1
        for row in 3..6 {
            assert_eq!(set.values()[row * 10 + 7], 1007.0);
        }
        assert_eq!(set.values()[6 * 10], 2000.0);
    }

    #[test]
    fn test_densify_zero_factor_is_config_error() {
        let err = densify(&tiny_scan(), 0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_pixel_centers() {
        let set = densify(&tiny_scan(), 2).unwrap();
        let centers = PixelCenters::of(&set);

        // Far edges 1000, 2000, ... with near edges one step before
        assert_eq!(centers.ranges[0], 500.0);
        assert_eq!(centers.ranges[1], 1500.0);
        // Rows are 5 degrees wide after densification
        assert_approx_eq!(centers.azimuths[0], 2.5, 1e-9);
        assert_approx_eq!(centers.azimuths[1], 7.5, 1e-9);
        assert_approx_eq!(centers.azimuths[71], 357.5, 1e-9);
    }

    #[test]
    fn test_near_range_edge_clamped_at_site() {
        let mut scan = tiny_scan();
        scan.geometry.range_start = 400.0;
        let centers = PixelCenters::of(&densify(&scan, 1).unwrap());
        assert_eq!(centers.ranges[0], 200.0);
    }

    #[test]
    fn test_circular_mean_wraps_north() {
        for (a, b) in [(359.0, 1.0), (350.0, 370.0)] {
            let m = circular_mean_deg(a, b);
            assert!((0.0..360.0).contains(&m));
            assert!(m < 1e-9 || m > 360.0 - 1e-9, "mean = {m}");
        }
        assert_approx_eq!(circular_mean_deg(10.0, 20.0), 15.0, 1e-9);
        // Opposite angles: midpoint of the clockwise arc
        assert_approx_eq!(circular_mean_deg(0.0, 180.0), 90.0, 1e-9);
    }

    #[test]
    fn test_pipeline_enriches_without_reordering() {
        let scan = tiny_scan();
        let pipeline = CoordinateTransformPipeline::new(flat_geodesic, no_rotation);
        let set = pipeline.run(&scan, 2).unwrap();

        let positions = set.positions().unwrap();
        assert_eq!(positions.len(), set.len());
        // Row 0 points roughly north, bin 0 at 500 m
        let (lon, lat) = positions[0];
        assert!(lon > 10.0 && lat > 54.0);
        assert_approx_eq!(lat - 54.0, 0.005 * 2.5_f64.to_radians().cos(), 1e-9);
        // Range grows along a row
        assert!(positions[9].1 > positions[0].1);
    }

    #[test]
    fn test_pipeline_error_names_sample() {
        let scan = tiny_scan();
        let fails_far_east = |r: f64, az: f64, el: f64, lon: f64, lat: f64| {
            if az > 80.0 && az < 90.0 && r > 5000.0 {
                Err(ProjectionError::invalid_input("boom"))
            } else {
                flat_geodesic(r, az, el, lon, lat)
            }
        };
        let pipeline = CoordinateTransformPipeline::new(fails_far_east, no_rotation);
        let mut set = densify(&scan, 1).unwrap();

        let err = pipeline.apply(&mut set).unwrap_err();
        match err {
            RegridError::Transform {
                index,
                row,
                col,
                stage,
                ..
            } => {
                assert_eq!((row, col), (8, 5));
                assert_eq!(index, 8 * 10 + 5);
                assert_eq!(stage, TransformStage::Geographic);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!set.is_transformed());
    }

    #[test]
    fn test_non_finite_rotation_is_transform_error() {
        let nan_rotation = |_lon: f64, _lat: f64| -> projection::Result<RotatedPoint> {
            Ok(RotatedPoint {
                lon: f64::NAN,
                lat: 0.0,
                height: 0.0,
            })
        };
        let pipeline = CoordinateTransformPipeline::new(flat_geodesic, nan_rotation);
        let err = pipeline.run(&tiny_scan(), 1).unwrap_err();

        assert!(matches!(
            err,
            RegridError::Transform {
                index: 0,
                stage: TransformStage::RotatedPole,
                ..
            }
        ));
    }

    #[test]
    fn test_standard_pipeline_centers_site() {
        let scan = tiny_scan();
        let pole = RotatedPole::centered_on(scan.site_lon, scan.site_lat).unwrap();
        let set = CoordinateTransformPipeline::standard(pole).run(&scan, 1).unwrap();

        let extent = set.extent().unwrap();
        // 10 km scan around the rotated origin: roughly +-0.09 degrees
        assert!(extent.min_lon < 0.0 && extent.max_lon > 0.0);
        assert!(extent.min_lat < 0.0 && extent.max_lat > 0.0);
        assert!(extent.max_lat < 0.1 && extent.min_lat > -0.1);
    }

    #[test]
    fn test_replace_values_keeps_positions() {
        let scan = tiny_scan();
        let pipeline = CoordinateTransformPipeline::new(flat_geodesic, no_rotation);
        let mut set = pipeline.run(&scan, 2).unwrap();

        let mut later = scan.clone();
        later.values.iter_mut().for_each(|v| *v += 1.0);
        set.replace_values(&later).unwrap();

        assert!(set.is_transformed());
        assert_eq!(set.values()[0], 1.0);
        assert_eq!(set.len(), 720);

        let mut other = scan;
        other.geometry.range_step = 500.0;
        assert!(set.replace_values(&other).is_err());
    }
}
