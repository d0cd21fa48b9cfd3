#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Zonal statistics over a classified raster.
//!
//! The raster path trades geometric exactness for speed: instead of
//! clipping feature polygons, each region is rasterized onto the category
//! grid (cell-centre rule, see [`mask`]) and masked-in cells are counted per
//! category. Coverage area is `count × cell_area`.

pub mod mask;
pub mod transform;

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use ward_cover_geometry::ValidGeometry;

pub use mask::{CellSpan, mask_spans};
pub use transform::GridTransform;

/// Errors raised while building a grid or its transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZonalError {
    /// The cell buffer does not match the declared dimensions.
    #[error("grid is {width}x{height} but has {cells} cells")]
    ShapeMismatch {
        /// Declared column count.
        width: usize,
        /// Declared row count.
        height: usize,
        /// Length of the cell buffer.
        cells: usize,
    },

    /// The geotransform has a NaN or infinite coefficient.
    #[error("geotransform has non-finite coefficients")]
    NonFiniteTransform,

    /// The geotransform collapses the grid and cannot be inverted.
    #[error("geotransform is singular (determinant {determinant})")]
    SingularTransform {
        /// Determinant of the linear part.
        determinant: f64,
    },
}

/// Category code of a raster cell.
pub type Category = i32;

/// A row-major grid of category codes, row 0 first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGrid {
    width: usize,
    height: usize,
    cells: Vec<Category>,
}

impl CategoryGrid {
    /// # Errors
    ///
    /// Returns [`ZonalError::ShapeMismatch`] if `cells.len() != width * height`.
    pub fn new(width: usize, height: usize, cells: Vec<Category>) -> Result<Self, ZonalError> {
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(ZonalError::ShapeMismatch {
                width,
                height,
                cells: cells.len(),
            });
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// The category at (`col`, `row`), or `None` outside the grid.
    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> Option<Category> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(row * self.width + col).copied()
    }

    fn row(&self, row: usize) -> &[Category] {
        let start = row * self.width;
        &self.cells[start..start + self.width]
    }
}

/// Per-category cell counts inside one region.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalCounts {
    counts: BTreeMap<Category, u64>,
    cell_area: f64,
}

impl ZonalCounts {
    #[must_use]
    pub const fn empty(cell_area: f64) -> Self {
        Self {
            counts: BTreeMap::new(),
            cell_area,
        }
    }

    /// Cells of `category`; zero when the category never occurred.
    #[must_use]
    pub fn count(&self, category: Category) -> u64 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn counts(&self) -> &BTreeMap<Category, u64> {
        &self.counts
    }

    #[must_use]
    pub fn total_cells(&self) -> u64 {
        self.counts.values().sum()
    }

    #[must_use]
    pub const fn cell_area(&self) -> f64 {
        self.cell_area
    }

    /// Planar area of `category` inside the region.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn area(&self, category: Category) -> f64 {
        self.count(category) as f64 * self.cell_area
    }

    /// Area of the selected categories, or of every counted category when
    /// `categories` is `None`.
    ///
    /// Counts are summed as integers before scaling, so the result has a
    /// single rounding step.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn covered_area(&self, categories: Option<&BTreeSet<Category>>) -> f64 {
        let cells: u64 = match categories {
            Some(selected) => selected.iter().map(|c| self.count(*c)).sum(),
            None => self.total_cells(),
        };
        cells as f64 * self.cell_area
    }
}

/// Counts the categories of every cell whose centre lies inside `region`.
///
/// Cells equal to `nodata` are skipped. A region that misses the grid
/// entirely yields empty counts rather than an error.
#[must_use]
pub fn zonal_count(
    region: &ValidGeometry,
    grid: &CategoryGrid,
    transform: &GridTransform,
    nodata: Option<Category>,
) -> ZonalCounts {
    let mut counts = ZonalCounts::empty(transform.cell_area());

    for span in mask_spans(region, grid.width, grid.height, transform) {
        for &category in &grid.row(span.row)[span.start..span.end] {
            if Some(category) == nodata {
                continue;
            }
            *counts.counts.entry(category).or_insert(0) += 1;
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use ward_cover_geometry::{LineString, Polygon};

    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> ValidGeometry {
        ValidGeometry::new(Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]),
            vec![],
        ))
        .unwrap()
    }

    /// 4×4 grid of 10 m cells with its top-left corner at (0, 40).
    fn sample() -> (CategoryGrid, GridTransform) {
        #[rustfmt::skip]
        let cells = vec![
            1, 1, 2, 2,
            1, 0, 2, 2,
            3, 3, 1, 1,
            3, 3, 1, 0,
        ];
        (
            CategoryGrid::new(4, 4, cells).unwrap(),
            GridTransform::north_up(0.0, 40.0, 10.0, 10.0).unwrap(),
        )
    }

    #[test]
    fn shape_mismatch_rejected() {
        assert_eq!(
            CategoryGrid::new(3, 2, vec![0; 5]),
            Err(ZonalError::ShapeMismatch {
                width: 3,
                height: 2,
                cells: 5
            })
        );
    }

    #[test]
    fn counts_whole_grid() {
        let (grid, transform) = sample();
        let counts = zonal_count(&rect(0.0, 0.0, 40.0, 40.0), &grid, &transform, Some(0));
        assert_eq!(counts.count(1), 6);
        assert_eq!(counts.count(2), 4);
        assert_eq!(counts.count(3), 4);
        assert_eq!(counts.count(0), 0);
        assert_eq!(counts.total_cells(), 14);
        assert!((counts.area(2) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn nodata_none_counts_everything() {
        let (grid, transform) = sample();
        let counts = zonal_count(&rect(0.0, 0.0, 40.0, 40.0), &grid, &transform, None);
        assert_eq!(counts.count(0), 2);
        assert_eq!(counts.total_cells(), 16);
    }

    #[test]
    fn counts_lower_left_quadrant() {
        let (grid, transform) = sample();
        let counts = zonal_count(&rect(0.0, 0.0, 20.0, 20.0), &grid, &transform, Some(0));
        assert_eq!(counts.counts().len(), 1);
        assert_eq!(counts.count(3), 4);
    }

    #[test]
    fn region_outside_grid_has_zero_counts() {
        let (grid, transform) = sample();
        let counts = zonal_count(
            &rect(1000.0, 1000.0, 1010.0, 1010.0),
            &grid,
            &transform,
            Some(0),
        );
        assert_eq!(counts.total_cells(), 0);
        assert!(counts.covered_area(None).abs() < f64::EPSILON);
    }

    #[test]
    fn covered_area_of_selected_categories() {
        let (grid, transform) = sample();
        let counts = zonal_count(&rect(0.0, 0.0, 40.0, 40.0), &grid, &transform, Some(0));
        let selected: BTreeSet<Category> = [1, 3].into_iter().collect();
        assert!((counts.covered_area(Some(&selected)) - 1000.0).abs() < 1e-9);
        assert!((counts.covered_area(None) - 1400.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_bounds_get() {
        let (grid, _) = sample();
        assert_eq!(grid.get(3, 3), Some(0));
        assert_eq!(grid.get(4, 0), None);
    }
}
