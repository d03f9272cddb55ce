//! Rotated-pole coordinate system.
//!
//! A rotated latitude/longitude frame whose north pole sits at
//! (`pole_lon`, `pole_lat`) in geographic coordinates. Choosing the pole so
//! that the area of interest lies on the rotated equator keeps meridian
//! convergence small there, which makes an axis-aligned degree lattice nearly
//! square in meters.
//!
//! Conventions follow CF `rotated_latitude_longitude`
//! (`grid_north_pole_longitude`, `grid_north_pole_latitude`): a pole at
//! (180, 90) is the identity transform.

use nalgebra::{Matrix3, Vector3};

use crate::beam::normalize_lon;
use crate::error::{ensure_finite, ProjectionError, Result};

/// Position in the rotated frame. Height is carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedPoint {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
}

/// Transform from geographic coordinates into a rotated frame.
///
/// Implemented by [`RotatedPole`] and by closures `Fn(lon, lat) -> Result<RotatedPoint>`.
pub trait PoleRotation {
    fn rotate(&self, lon: f64, lat: f64) -> Result<RotatedPoint>;
}

impl<F> PoleRotation for F
where
    F: Fn(f64, f64) -> Result<RotatedPoint>,
{
    fn rotate(&self, lon: f64, lat: f64) -> Result<RotatedPoint> {
        self(lon, lat)
    }
}

/// Rotated pole defined by the geographic position of its north pole.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedPole {
    /// Geographic longitude of the rotated north pole (degrees)
    pub pole_lon: f64,
    /// Geographic latitude of the rotated north pole (degrees)
    pub pole_lat: f64,
    /// Geographic-to-rotated rotation matrix
    forward: Matrix3<f64>,
}

impl RotatedPole {
    /// Create a rotated frame from its north pole position.
    pub fn new(pole_lon: f64, pole_lat: f64) -> Result<Self> {
        ensure_finite("pole longitude", pole_lon)?;
        ensure_finite("pole latitude", pole_lat)?;
        if !(-90.0..=90.0).contains(&pole_lat) {
            return Err(ProjectionError::invalid_input(format!(
                "pole latitude {pole_lat} outside [-90, 90]"
            )));
        }

        // Rotate about z so the pole meridian lands on 180, then tilt about y.
        let (sin_phi, cos_phi) = (pole_lon - 180.0).to_radians().sin_cos();
        let (sin_theta, cos_theta) = (90.0 - pole_lat).to_radians().sin_cos();

        #[rustfmt::skip]
        let about_z = Matrix3::new(
            cos_phi, sin_phi, 0.0,
            -sin_phi, cos_phi, 0.0,
            0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let about_y = Matrix3::new(
            cos_theta, 0.0, sin_theta,
            0.0, 1.0, 0.0,
            -sin_theta, 0.0, cos_theta,
        );

        Ok(Self {
            pole_lon,
            pole_lat,
            forward: about_y * about_z,
        })
    }

    /// Frame in which the geographic point (`lon`, `lat`) maps to rotated (0, 0).
    pub fn centered_on(lon: f64, lat: f64) -> Result<Self> {
        Self::new(normalize_lon(lon + 180.0), 90.0 - lat)
    }

    /// Unrotated frame.
    pub fn identity() -> Self {
        Self {
            pole_lon: 180.0,
            pole_lat: 90.0,
            forward: Matrix3::identity(),
        }
    }

    /// Geographic to rotated coordinates.
    pub fn to_rotated(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        ensure_finite("longitude", lon)?;
        ensure_finite("latitude", lat)?;
        Ok(from_unit(&(self.forward * to_unit(lon, lat))))
    }

    /// Rotated to geographic coordinates.
    pub fn to_geographic(&self, rlon: f64, rlat: f64) -> Result<(f64, f64)> {
        ensure_finite("rotated longitude", rlon)?;
        ensure_finite("rotated latitude", rlat)?;
        Ok(from_unit(&(self.forward.transpose() * to_unit(rlon, rlat))))
    }
}

impl PoleRotation for RotatedPole {
    fn rotate(&self, lon: f64, lat: f64) -> Result<RotatedPoint> {
        let (rlon, rlat) = self.to_rotated(lon, lat)?;
        Ok(RotatedPoint {
            lon: rlon,
            lat: rlat,
            height: 0.0,
        })
    }
}

fn to_unit(lon: f64, lat: f64) -> Vector3<f64> {
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

fn from_unit(v: &Vector3<f64>) -> (f64, f64) {
    let lon = v.y.atan2(v.x).to_degrees();
    let lat = v.z.clamp(-1.0, 1.0).asin().to_degrees();
    (lon, lat)
}
