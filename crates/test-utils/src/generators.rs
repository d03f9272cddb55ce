//! Test data generators for creating synthetic radar-like data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite. Random inputs come from a
//! seeded [`StdRng`], so every run sees the same data.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Creates scan values with a predictable pattern.
///
/// Each sample value is calculated as: `row * 1000 + col`
/// where `row` is the azimuth row and `col` the range bin.
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (azimuth row 0 first).
///
/// # Example
///
/// ```
/// use test_utils::create_scan_values;
///
/// let values = create_scan_values(4, 3);
/// assert_eq!(values.len(), 12);
/// assert_eq!(values[0], 0.0);    // row=0, col=0
/// assert_eq!(values[1], 1.0);    // row=0, col=1
/// assert_eq!(values[3], 1000.0); // row=1, col=0
/// ```
pub fn create_scan_values(n_azimuth: usize, n_range: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(n_azimuth * n_range);
    for row in 0..n_azimuth {
        for col in 0..n_range {
            data.push((row * 1000 + col) as f32);
        }
    }
    data
}

/// Creates reflectivity values (dBZ) with a single rain cell.
///
/// The cell peaks at `peak_dbz` around azimuth row `n_azimuth / 4` and the
/// middle range bin, falling off to 0 dBZ.
pub fn create_rain_cell_values(n_azimuth: usize, n_range: usize, peak_dbz: f32) -> Vec<f32> {
    let center_row = (n_azimuth / 4) as f32;
    let center_col = (n_range / 2) as f32;
    let radius = (n_range as f32 / 4.0).max(1.0);

    let mut data = Vec::with_capacity(n_azimuth * n_range);
    for row in 0..n_azimuth {
        for col in 0..n_range {
            let dr = (row as f32 - center_row) / radius;
            let dc = (col as f32 - center_col) / radius;
            let falloff = (1.0 - (dr * dr + dc * dc).sqrt()).max(0.0);
            data.push(peak_dbz * falloff);
        }
    }
    data
}

/// Scatter `count` points uniformly over `[min_lon, max_lon) x [min_lat, max_lat)`.
pub fn scatter_positions(
    count: usize,
    (min_lon, min_lat, max_lon, max_lat): (f64, f64, f64, f64),
    seed: u64,
) -> Vec<(f64, f64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.gen_range(min_lon..max_lon), rng.gen_range(min_lat..max_lat)))
        .collect()
}

/// A seeded permutation of `0..n`.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_scan_values_pattern() {
        let values = create_scan_values(3, 5);
        for row in 0..3 {
            for col in 0..5 {
                assert_eq!(values[row * 5 + col], (row * 1000 + col) as f32);
            }
        }
    }

    #[test]
    fn test_rain_cell_peak() {
        let values = create_rain_cell_values(360, 100, 55.0);
        let max = values.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(max, 55.0);
        assert_eq!(values[100 * 359], 0.0);
    }

    #[test]
    fn test_scatter_positions_in_bounds() {
        let points = scatter_positions(500, (-1.0, 2.0, 3.0, 4.0), 7);
        assert_eq!(points.len(), 500);
        for (lon, lat) in points {
            assert!((-1.0..3.0).contains(&lon));
            assert!((2.0..4.0).contains(&lat));
        }
    }

    #[test]
    fn test_shuffled_indices_is_permutation() {
        let mut indices = shuffled_indices(100, 42);
        assert_ne!(indices, (0..100).collect::<Vec<_>>());
        indices.sort_unstable();
        assert_eq!(indices, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_generators_are_deterministic() {
        assert_eq!(shuffled_indices(50, 3), shuffled_indices(50, 3));
        assert_eq!(
            scatter_positions(10, (0.0, 0.0, 1.0, 1.0), 9),
            scatter_positions(10, (0.0, 0.0, 1.0, 1.0), 9)
        );
    }
}
