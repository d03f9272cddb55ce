//! Caller-side operations on gridded fields.

use crate::aggregate::{is_no_data, GriddedField, NO_DATA};
use crate::error::{RegridError, Result};
use crate::grid::ResolvedGrid;

/// Raise valid cells below `floor` to `floor`. No-data stays no-data.
pub fn floor_values(field: &mut GriddedField, floor: f32) {
    for v in field.data.iter_mut().filter(|v| !is_no_data(**v)) {
        if *v < floor {
            *v = floor;
        }
    }
}

/// Cell-wise `b - a`. No-data in either input gives no-data.
pub fn difference(a: &GriddedField, b: &GriddedField) -> Result<GriddedField> {
    if a.dims() != b.dims() {
        return Err(RegridError::config(
            "grid",
            format!(
                "cannot difference fields of shape {:?} and {:?}",
                a.dims(),
                b.dims()
            ),
        ));
    }

    let data = a
        .data
        .iter()
        .zip(&b.data)
        .map(|(&a, &b)| {
            if is_no_data(a) || is_no_data(b) {
                NO_DATA
            } else {
                b - a
            }
        })
        .collect();

    Ok(GriddedField {
        lat_dim: a.lat_dim,
        lon_dim: a.lon_dim,
        data,
    })
}

/// Blank cells whose center is farther than `grid.max_range` meters from
/// `grid.center`. Distances in the rotated frame are converted with
/// `res_m / res_deg`. A `max_range` of 0 leaves the field unchanged.
///
/// Returns the number of cells blanked.
pub fn mask_beyond_range(field: &mut GriddedField, grid: &ResolvedGrid) -> Result<usize> {
    if field.dims() != grid.cell_dims() {
        return Err(RegridError::config(
            "grid",
            format!(
                "field shape {:?} does not match grid {:?}",
                field.dims(),
                grid.cell_dims()
            ),
        ));
    }
    if grid.max_range <= 0.0 {
        return Ok(0);
    }

    let meters_per_degree = grid.meters_per_degree();
    let (center_lon, center_lat) = grid.center;
    let mut masked = 0;

    for row in 0..grid.lat_dim {
        for col in 0..grid.lon_dim {
            let (lon, lat) = grid.cell_center(row, col);
            let distance = (lon - center_lon).hypot(lat - center_lat) * meters_per_degree;
            let v = &mut field.data[grid.flat_index(row, col)];
            if distance > grid.max_range && !is_no_data(*v) {
                *v = NO_DATA;
                masked += 1;
            }
        }
    }
    Ok(masked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSpec;

    fn field(data: Vec<f32>) -> GriddedField {
        GriddedField {
            lat_dim: 1,
            lon_dim: data.len(),
            data,
        }
    }

    #[test]
    fn test_floor_values() {
        let mut f = field(vec![-10.0, 4.9, 5.0, 30.0, f32::NAN]);
        floor_values(&mut f, 5.0);
        assert_eq!(&f.data[..4], &[5.0, 5.0, 5.0, 30.0]);
        assert!(f.data[4].is_nan());
    }

    #[test]
    fn test_difference_is_b_minus_a() {
        let a = field(vec![10.0, 20.0, f32::NAN, 1.0]);
        let b = field(vec![15.0, 5.0, 3.0, f32::NAN]);
        let d = difference(&a, &b).unwrap();

        assert_eq!(d.get(0, 0), Some(5.0));
        assert_eq!(d.get(0, 1), Some(-15.0));
        assert_eq!(d.get(0, 2), None);
        assert_eq!(d.get(0, 3), None);
    }

    #[test]
    fn test_difference_shape_mismatch() {
        let err = difference(&field(vec![1.0]), &field(vec![1.0, 2.0])).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_mask_beyond_range() {
        // 4x4 cells of 1 km around the origin
        let grid = GridSpec::fixed((-2.0, 2.0), (-2.0, 2.0), 1000.0, 1.0)
            .unwrap()
            .with_range((0.0, 0.0), 1500.0)
            .unwrap()
            .resolve_with_extent(None)
            .unwrap();
        let mut f = GriddedField {
            lat_dim: 4,
            lon_dim: 4,
            data: vec![1.0; 16],
        };

        let masked = mask_beyond_range(&mut f, &grid).unwrap();

        // Inner cells have centers at ~707 m, corners at ~2121 m, edges ~1581 m
        assert_eq!(masked, 12);
        assert_eq!(f.get(1, 1), Some(1.0));
        assert_eq!(f.get(2, 2), Some(1.0));
        assert_eq!(f.get(0, 0), None);
    }

    #[test]
    fn test_zero_range_disables_mask() {
        let grid = GridSpec::fixed((0.0, 2.0), (0.0, 2.0), 1000.0, 1.0)
            .unwrap()
            .resolve_with_extent(None)
            .unwrap();
        let mut f = GriddedField::no_data(2, 2);
        f.data[0] = 3.0;
        assert_eq!(mask_beyond_range(&mut f, &grid).unwrap(), 0);
        assert_eq!(f.get(0, 0), Some(3.0));
    }
}
