//! Radar beam geolocation.
//!
//! Maps a polar radar sample (slant range, azimuth, elevation) measured from a
//! site to geographic coordinates. The beam path is modelled with the
//! effective-earth-radius approximation: refraction in a standard atmosphere
//! bends the beam so that it behaves like a straight line over an earth whose
//! radius is scaled by `k_factor` (4/3 by default).
//!
//! The ground distance along the beam is then carried over the sphere from the
//! site along the azimuth (great-circle destination), which is the spherical
//! azimuthal equidistant projection centered on the site.

use crate::error::{ensure_finite, ProjectionError, Result};

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;

/// WGS84 semi-minor axis (meters)
pub const WGS84_SEMI_MINOR: f64 = 6_356_752.314_245;

/// Standard-atmosphere effective earth radius factor.
pub const STANDARD_K_FACTOR: f64 = 4.0 / 3.0;

/// A geographic position with height above the site's reference sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees
    pub lon: f64,
    /// Latitude in degrees
    pub lat: f64,
    /// Beam height in meters
    pub height: f64,
}

/// Geodesic forward projection: polar sample position to geographic.
///
/// Implemented by [`EffectiveEarthBeam`] and by any closure with the
/// matching signature, so callers can inject their own geodesy.
pub trait GeodesicForward {
    /// Project a sample at `range_m` along `azimuth_deg` (clockwise from north)
    /// and `elevation_deg` from the site at (`site_lon`, `site_lat`).
    fn forward(
        &self,
        range_m: f64,
        azimuth_deg: f64,
        elevation_deg: f64,
        site_lon: f64,
        site_lat: f64,
    ) -> Result<GeoPoint>;
}

impl<F> GeodesicForward for F
where
    F: Fn(f64, f64, f64, f64, f64) -> Result<GeoPoint>,
{
    fn forward(
        &self,
        range_m: f64,
        azimuth_deg: f64,
        elevation_deg: f64,
        site_lon: f64,
        site_lat: f64,
    ) -> Result<GeoPoint> {
        self(range_m, azimuth_deg, elevation_deg, site_lon, site_lat)
    }
}

/// Effective-earth-radius beam propagation model.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveEarthBeam {
    /// Refraction factor applied to the earth radius
    pub k_factor: f64,
    /// Fixed earth radius in meters. `None` uses the WGS84 geocentric
    /// radius at the site latitude.
    pub earth_radius: Option<f64>,
}

impl Default for EffectiveEarthBeam {
    fn default() -> Self {
        Self {
            k_factor: STANDARD_K_FACTOR,
            earth_radius: None,
        }
    }
}

impl EffectiveEarthBeam {
    /// Standard-atmosphere model over the WGS84 ellipsoid radius.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a constant earth radius instead of the latitude-dependent one.
    pub fn with_earth_radius(mut self, radius_m: f64) -> Self {
        self.earth_radius = Some(radius_m);
        self
    }

    /// Earth radius used for a site at `lat_deg`.
    pub fn radius_at(&self, lat_deg: f64) -> f64 {
        self.earth_radius
            .unwrap_or_else(|| wgs84_geocentric_radius(lat_deg))
    }

    /// Beam height above the site and ground (arc) distance for a slant range.
    ///
    /// Returns `(height_m, ground_distance_m)`.
    pub fn height_and_distance(
        &self,
        range_m: f64,
        elevation_deg: f64,
        earth_radius: f64,
    ) -> (f64, f64) {
        let re = self.k_factor * earth_radius;
        let elev = elevation_deg.to_radians();

        let height = (range_m * range_m + re * re + 2.0 * range_m * re * elev.sin()).sqrt() - re;
        let arc = re * (range_m * elev.cos() / (re + height)).asin();

        (height, arc)
    }
}

impl GeodesicForward for EffectiveEarthBeam {
    fn forward(
        &self,
        range_m: f64,
        azimuth_deg: f64,
        elevation_deg: f64,
        site_lon: f64,
        site_lat: f64,
    ) -> Result<GeoPoint> {
        ensure_finite("range", range_m)?;
        ensure_finite("azimuth", azimuth_deg)?;
        ensure_finite("elevation", elevation_deg)?;
        ensure_finite("site longitude", site_lon)?;
        ensure_finite("site latitude", site_lat)?;

        if range_m < 0.0 {
            return Err(ProjectionError::invalid_input(format!(
                "negative range {range_m} m"
            )));
        }
        if !(-90.0..=90.0).contains(&site_lat) {
            return Err(ProjectionError::invalid_input(format!(
                "site latitude {site_lat} outside [-90, 90]"
            )));
        }
        if !(-90.0..=90.0).contains(&elevation_deg) {
            return Err(ProjectionError::invalid_input(format!(
                "elevation {elevation_deg} outside [-90, 90]"
            )));
        }

        let radius = self.radius_at(site_lat);
        let (height, arc) = self.height_and_distance(range_m, elevation_deg, radius);
        let (lon, lat) = destination(site_lon, site_lat, azimuth_deg, arc / radius);

        Ok(GeoPoint {
            lon: ensure_finite("longitude", lon)?,
            lat: ensure_finite("latitude", lat)?,
            height: ensure_finite("height", height)?,
        })
    }
}

/// Great-circle destination from (`lon`, `lat`) along `bearing_deg` over the
/// central angle `delta` (radians). Longitude is normalized to [-180, 180).
pub fn destination(lon_deg: f64, lat_deg: f64, bearing_deg: f64, delta: f64) -> (f64, f64) {
    let phi1 = lat_deg.to_radians();
    let lambda1 = lon_deg.to_radians();
    let theta = bearing_deg.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    (normalize_lon(lambda2.to_degrees()), phi2.to_degrees())
}

/// Geocentric radius of the WGS84 ellipsoid at a geodetic latitude.
pub fn wgs84_geocentric_radius(lat_deg: f64) -> f64 {
    let a = WGS84_SEMI_MAJOR;
    let b = WGS84_SEMI_MINOR;
    let (sin, cos) = lat_deg.to_radians().sin_cos();

    let num = (a * a * cos).powi(2) + (b * b * sin).powi(2);
    let den = (a * cos).powi(2) + (b * sin).powi(2);
    (num / den).sqrt()
}

/// Wrap a longitude into [-180, 180).
#[inline]
pub fn normalize_lon(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_zero_range_is_site() {
        let beam = EffectiveEarthBeam::new();
        let p = beam.forward(0.0, 123.0, 0.5, 9.97, 53.56).unwrap();

        assert_approx_eq!(p.lon, 9.97, 1e-12);
        assert_approx_eq!(p.lat, 53.56, 1e-12);
        assert_approx_eq!(p.height, 0.0, 1e-6);
    }

    #[test]
    fn test_due_north_moves_latitude_only() {
        let beam = EffectiveEarthBeam::new().with_earth_radius(6_371_000.0);
        let p = beam.forward(10_000.0, 0.0, 0.0, 10.0, 50.0).unwrap();

        assert_approx_eq!(p.lon, 10.0, 1e-9);
        // ~10 km north, slightly less due to beam curvature
        let dlat_m = (p.lat - 50.0).to_radians() * 6_371_000.0;
        assert!(dlat_m > 9_990.0 && dlat_m < 10_000.0, "dlat_m = {}", dlat_m);
    }

    #[test]
    fn test_due_east_increases_longitude() {
        let beam = EffectiveEarthBeam::new();
        let p = beam.forward(20_000.0, 90.0, 0.0, 10.0, 50.0).unwrap();

        assert!(p.lon > 10.0);
        assert!((p.lat - 50.0).abs() < 0.01);
    }

    #[test]
    fn test_beam_height_grows_with_range() {
        let beam = EffectiveEarthBeam::new();
        let near = beam.forward(5_000.0, 0.0, 0.0, 0.0, 0.0).unwrap();
        let far = beam.forward(50_000.0, 0.0, 0.0, 0.0, 0.0).unwrap();

        assert!(near.height > 0.0);
        assert!(far.height > near.height);
        // 50 km at 0 deg elevation: r^2 / (2 * k * R) ~ 147 m
        assert!(far.height > 140.0 && far.height < 155.0, "{}", far.height);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let beam = EffectiveEarthBeam::new();

        assert!(matches!(
            beam.forward(f64::NAN, 0.0, 0.0, 0.0, 0.0),
            Err(ProjectionError::NonFinite { what: "range", .. })
        ));
        assert!(matches!(
            beam.forward(-1.0, 0.0, 0.0, 0.0, 0.0),
            Err(ProjectionError::InvalidInput(_))
        ));
        assert!(beam.forward(1.0, 0.0, 0.0, 0.0, 91.0).is_err());
    }

    #[test]
    fn test_closure_implements_forward() {
        let flat = |r: f64, _az: f64, _el: f64, lon: f64, lat: f64| -> Result<GeoPoint> {
            Ok(GeoPoint {
                lon: lon + r,
                lat,
                height: 0.0,
            })
        };
        let p = flat.forward(2.0, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(p.lon, 3.0);
    }

    #[test]
    fn test_normalize_lon() {
        assert_approx_eq!(normalize_lon(190.0), -170.0, 1e-12);
        assert_approx_eq!(normalize_lon(-180.0), -180.0, 1e-12);
        assert_approx_eq!(normalize_lon(540.0), -180.0, 1e-12);
    }

    #[test]
    fn test_wgs84_radius_bounds() {
        assert_approx_eq!(wgs84_geocentric_radius(0.0), WGS84_SEMI_MAJOR, 1e-6);
        assert_approx_eq!(wgs84_geocentric_radius(90.0), WGS84_SEMI_MINOR, 1e-6);
    }
}
