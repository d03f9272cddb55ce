//! Per-cell mean of sample values.

use serde::{Deserialize, Serialize};

use crate::error::{RegridError, Result};
use crate::index_matrix::IndexMatrix;

/// Value of a cell without samples. Never a valid measurement.
pub const NO_DATA: f32 = f32::NAN;

/// 2D field congruent to a resolved grid, row-major with row 0 southernmost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GriddedField {
    pub lat_dim: usize,
    pub lon_dim: usize,
    #[serde(with = "crate::nodata::nullable")]
    pub data: Vec<f32>,
}

impl GriddedField {
    /// Field with every cell set to no-data.
    pub fn no_data(lat_dim: usize, lon_dim: usize) -> Self {
        Self {
            lat_dim,
            lon_dim,
            data: vec![NO_DATA; lat_dim * lon_dim],
        }
    }

    /// `(lat_dim, lon_dim)`
    pub fn dims(&self) -> (usize, usize) {
        (self.lat_dim, self.lon_dim)
    }

    /// Value of a cell; `None` outside the field or for no-data.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.lat_dim || col >= self.lon_dim {
            return None;
        }
        let v = self.data[row * self.lon_dim + col];
        (!is_no_data(v)).then_some(v)
    }

    /// Number of cells holding a value.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !is_no_data(**v)).count()
    }

    /// Bitwise equality, treating every no-data cell as equal.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.dims() == other.dims()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits() || (is_no_data(*a) && is_no_data(*b)))
    }

    /// Smallest and largest valid value.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| !is_no_data(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Whether a value is the no-data sentinel.
#[inline]
pub fn is_no_data(v: f32) -> bool {
    v.is_nan()
}

/// Computes gridded fields from an index matrix and sample values.
pub struct GridAggregator;

impl GridAggregator {
    /// Mean of the values assigned to each cell.
    ///
    /// Sums are accumulated in `f64` in ascending index order, so the result
    /// is bit-identical for equal inputs. A no-data value among a cell's
    /// samples makes the cell no-data. Fails if the matrix refers to a
    /// sample beyond `values`.
    pub fn aggregate(matrix: &IndexMatrix, values: &[f32]) -> Result<GriddedField> {
        if let Some(max) = matrix.max_index() {
            if max >= values.len() {
                return Err(RegridError::SampleCountMismatch {
                    expected: max + 1,
                    actual: values.len(),
                });
            }
        }

        let (lat_dim, lon_dim) = matrix.dims();
        let data = matrix
            .cells()
            .map(|cell| {
                if cell.is_empty() {
                    return NO_DATA;
                }
                let sum: f64 = cell.iter().map(|&i| values[i] as f64).sum();
                (sum / cell.len() as f64) as f32
            })
            .collect();

        Ok(GriddedField {
            lat_dim,
            lon_dim,
            data,
        })
    }
}
