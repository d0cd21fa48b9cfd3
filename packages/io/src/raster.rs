//! Classified raster grids stored as JSON.
//!
//! ```json
//! {
//!   "width": 4,
//!   "height": 2,
//!   "geo_transform": [500000.0, 10.0, 0.0, 180000.0, 0.0, -10.0],
//!   "nodata": 0,
//!   "crs": "EPSG:27700",
//!   "cells": [1, 1, 2, 0, 3, 3, 1, 1]
//! }
//! ```
//!
//! `geo_transform` uses the GDAL layout and `cells` are row-major, top row
//! first.

use serde::Deserialize;
use ward_cover_geometry::CrsTag;
use ward_cover_zonal::{Category, CategoryGrid, GridTransform};

use crate::IoError;

#[derive(Debug, Deserialize)]
struct RasterFile {
    width: usize,
    height: usize,
    geo_transform: [f64; 6],
    #[serde(default)]
    nodata: Option<Category>,
    #[serde(default)]
    crs: Option<String>,
    cells: Vec<Category>,
}

/// A parsed raster and the CRS it declares, if any.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    pub grid: CategoryGrid,
    pub transform: GridTransform,
    pub nodata: Option<Category>,
    pub crs: Option<CrsTag>,
}

/// Parses a JSON raster grid.
///
/// # Errors
///
/// * [`IoError::Json`] if `text` does not match the grid layout
/// * [`IoError::Zonal`] if the cells do not fill the grid or the transform
///   cannot be inverted
pub fn parse_raster(text: &str) -> Result<RasterGrid, IoError> {
    let file: RasterFile = serde_json::from_str(text)?;

    let grid = CategoryGrid::new(file.width, file.height, file.cells)?;
    let transform = GridTransform::from_gdal(file.geo_transform)?;

    log::debug!(
        "Parsed {}x{} raster, cell area {}",
        grid.width(),
        grid.height(),
        transform.cell_area()
    );

    Ok(RasterGrid {
        grid,
        transform,
        nodata: file.nodata,
        crs: file.crs.as_deref().map(CrsTag::new),
    })
}

#[cfg(test)]
mod tests {
    use ward_cover_zonal::ZonalError;

    use super::*;

    #[test]
    fn parses_grid() {
        let text = r#"{
            "width": 2,
            "height": 2,
            "geo_transform": [0.0, 10.0, 0.0, 20.0, 0.0, -10.0],
            "nodata": 0,
            "crs": "epsg:27700",
            "cells": [1, 0, 2, 1]
        }"#;
        let raster = parse_raster(text).unwrap();

        assert_eq!(raster.grid.get(1, 1), Some(1));
        assert_eq!(raster.nodata, Some(0));
        assert_eq!(raster.crs, Some(CrsTag::epsg(27700)));
        assert!((raster.transform.cell_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn short_cell_buffer_is_rejected() {
        let text = r#"{
            "width": 2,
            "height": 2,
            "geo_transform": [0.0, 10.0, 0.0, 20.0, 0.0, -10.0],
            "cells": [1, 0, 2]
        }"#;
        assert!(matches!(
            parse_raster(text),
            Err(IoError::Zonal(ZonalError::ShapeMismatch { cells: 3, .. }))
        ));
    }

    #[test]
    fn singular_transform_is_rejected() {
        let text = r#"{
            "width": 1,
            "height": 1,
            "geo_transform": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "cells": [1]
        }"#;
        assert!(matches!(
            parse_raster(text),
            Err(IoError::Zonal(ZonalError::SingularTransform { .. }))
        ));
    }
}
