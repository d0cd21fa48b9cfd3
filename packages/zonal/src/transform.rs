//! Affine mapping between grid (column, row) and planar (x, y) coordinates.
//!
//! Uses the GDAL geotransform layout:
//!
//! ```text
//! x = gt[0] + col * gt[1] + row * gt[2]
//! y = gt[3] + col * gt[4] + row * gt[5]
//! ```
//!
//! where (`col`, `row`) address cell corners, so the centre of cell
//! (c, r) is at (c + 0.5, r + 0.5).

use ward_cover_geometry::Coord;

use crate::ZonalError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    gt: [f64; 6],
    determinant: f64,
}

impl GridTransform {
    /// Builds a transform from a GDAL geotransform array.
    ///
    /// # Errors
    ///
    /// * [`ZonalError::NonFiniteTransform`] if any coefficient is NaN or infinite
    /// * [`ZonalError::SingularTransform`] if the mapping cannot be inverted
    pub fn from_gdal(gt: [f64; 6]) -> Result<Self, ZonalError> {
        if gt.iter().any(|v| !v.is_finite()) {
            return Err(ZonalError::NonFiniteTransform);
        }

        let determinant = gt[1].mul_add(gt[5], -(gt[2] * gt[4]));
        if determinant == 0.0 {
            return Err(ZonalError::SingularTransform { determinant });
        }

        Ok(Self { gt, determinant })
    }

    /// North-up grid whose top-left corner is at (`origin_x`, `origin_y`),
    /// with rows advancing southwards.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError`] if a cell dimension is zero or non-finite.
    pub fn north_up(
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
    ) -> Result<Self, ZonalError> {
        Self::from_gdal([origin_x, cell_width, 0.0, origin_y, 0.0, -cell_height])
    }

    /// Fractional grid coordinate (col, row) of a planar point.
    #[must_use]
    pub fn to_grid(&self, point: Coord<f64>) -> (f64, f64) {
        let gt = &self.gt;
        let dx = point.x - gt[0];
        let dy = point.y - gt[3];

        let col = gt[5].mul_add(dx, -(gt[2] * dy)) / self.determinant;
        let row = gt[1].mul_add(dy, -(gt[4] * dx)) / self.determinant;

        (col, row)
    }

    /// Planar area of one cell.
    #[must_use]
    pub const fn cell_area(&self) -> f64 {
        self.determinant.abs()
    }
}
