//! Coordinate transforms for weather radar resampling.
//!
//! Implements the two geometric steps that take a polar radar sample into the
//! frame used for gridding, from scratch without external geodesy libraries:
//!
//! - [`beam`]: slant range / azimuth / elevation from a site to geographic
//!   lon/lat using the effective-earth-radius beam model.
//! - [`rotated_pole`]: geographic lon/lat into a rotated-pole frame.
//!
//! Both steps are exposed as traits ([`GeodesicForward`], [`PoleRotation`])
//! so callers can substitute their own implementation.

pub mod beam;
pub mod error;
pub mod rotated_pole;

pub use beam::{EffectiveEarthBeam, GeoPoint, GeodesicForward};
pub use error::{ProjectionError, Result};
pub use rotated_pole::{PoleRotation, RotatedPoint, RotatedPole};
