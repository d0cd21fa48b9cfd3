//! TOML run configuration.
//!
//! ```toml
//! crs = "EPSG:27700"
//!
//! [regions]
//! path = "wards.geojson"
//! id_field = "GSS_CODE"
//! name_field = "NAME"
//! declared_area_field = "HECTARES"
//! declared_area_unit = "hectares"
//!
//! [coverage]
//! kind = "vector"
//!
//! [[coverage.snapshots]]
//! label = "2011"
//! path = "greenspace_2011.geojson"
//!
//! [[coverage.snapshots]]
//! label = "2018"
//! path = "greenspace_2018.geojson"
//! id_field = "fid"
//!
//! [output]
//! path = "coverage.csv"
//! format = "csv"
//! unit = "hectares"
//! ```
//!
//! Snapshots are listed oldest first. Relative paths are resolved against
//! the directory holding the config file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use ward_cover_engine::{
    CoverageRequest, CoverageSource, FeatureLayer, RasterLayer, RasterSource, RegionLayer,
};
use ward_cover_geometry::CrsTag;
use ward_cover_models::Snapshot;
use ward_cover_zonal::Category;

use crate::{
    AreaUnit, IoError, OutputFormat,
    raster::parse_raster,
    vector::{FeatureFields, RegionFields, parse_features, parse_regions},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Default CRS for layers that neither declare one nor set `crs`.
    #[serde(default)]
    pub crs: Option<String>,
    pub regions: RegionsConfig,
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionsConfig {
    pub path: PathBuf,
    pub id_field: String,
    pub name_field: String,
    #[serde(default)]
    pub crs: Option<String>,
    #[serde(default)]
    pub declared_area_field: Option<String>,
    #[serde(default)]
    pub declared_area_unit: AreaUnit,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoverageConfig {
    Vector {
        snapshots: Vec<VectorSnapshot>,
    },
    Raster {
        /// Codes counted as coverage; every non-nodata code when absent.
        #[serde(default)]
        categories: Option<BTreeSet<Category>>,
        snapshots: Vec<RasterSnapshot>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorSnapshot {
    pub label: String,
    pub path: PathBuf,
    #[serde(default)]
    pub id_field: Option<String>,
    #[serde(default)]
    pub crs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterSnapshot {
    pub label: String,
    pub path: PathBuf,
    #[serde(default)]
    pub crs: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub unit: AreaUnit,
}

/// Parses a [`RunConfig`] from a TOML string. Paths are left as written.
///
/// # Errors
///
/// Returns [`IoError::Toml`] if the TOML is malformed or missing required
/// fields.
pub fn parse_config(text: &str) -> Result<RunConfig, IoError> {
    Ok(toml::de::from_str(text)?)
}

/// Reads a [`RunConfig`] and resolves its paths against the file's
/// directory.
///
/// # Errors
///
/// Returns [`IoError`] if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<RunConfig, IoError> {
    let text = read(path)?;
    let mut config = parse_config(&text).map_err(|e| e.in_file(path))?;
    config.resolve_paths(path.parent().unwrap_or_else(|| Path::new("")));
    Ok(config)
}

impl RunConfig {
    /// Joins every relative path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        resolve(&mut self.regions.path);
        match &mut self.coverage {
            CoverageConfig::Vector { snapshots } => {
                snapshots.iter_mut().for_each(|s| resolve(&mut s.path));
            }
            CoverageConfig::Raster { snapshots, .. } => {
                snapshots.iter_mut().for_each(|s| resolve(&mut s.path));
            }
        }
        if let Some(path) = &mut self.output.path {
            resolve(path);
        }
    }

    /// Reads every layer named by the config into a [`CoverageRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`IoError`] if a layer cannot be read or parsed, or if a
    /// layer's CRS cannot be determined.
    pub fn build_request(&self) -> Result<CoverageRequest, IoError> {
        let default_crs = self.crs.as_deref().map(CrsTag::new);

        let fields = RegionFields {
            id_field: self.regions.id_field.clone(),
            name_field: self.regions.name_field.clone(),
            declared_area: self
                .regions
                .declared_area_field
                .clone()
                .map(|field| (field, self.regions.declared_area_unit)),
        };
        let path = &self.regions.path;
        let layer = parse_regions(&read(path)?, &fields).map_err(|e| e.in_file(path))?;
        let regions = RegionLayer {
            crs: resolve_crs(
                "regions",
                self.regions.crs.as_deref(),
                layer.crs,
                default_crs.as_ref(),
            )?,
            regions: layer.items,
        };

        let source = match &self.coverage {
            CoverageConfig::Vector { snapshots } => CoverageSource::Vector(
                snapshots
                    .iter()
                    .map(|snapshot| load_vector(snapshot, default_crs.as_ref()))
                    .collect::<Result<_, _>>()?,
            ),
            CoverageConfig::Raster {
                categories,
                snapshots,
            } => CoverageSource::Raster(RasterSource {
                categories: categories.clone(),
                layers: snapshots
                    .iter()
                    .map(|snapshot| load_raster(snapshot, default_crs.as_ref()))
                    .collect::<Result<_, _>>()?,
            }),
        };

        Ok(CoverageRequest { regions, source })
    }
}

fn load_vector(snapshot: &VectorSnapshot, default_crs: Option<&CrsTag>) -> Result<FeatureLayer, IoError> {
    let fields = FeatureFields {
        id_field: snapshot.id_field.clone(),
    };
    let path = &snapshot.path;
    let layer = parse_features(&read(path)?, &fields).map_err(|e| e.in_file(path))?;

    log::info!(
        "Loaded snapshot {} from {} ({} features)",
        snapshot.label,
        path.display(),
        layer.items.len()
    );

    Ok(FeatureLayer {
        crs: resolve_crs(&snapshot.label, snapshot.crs.as_deref(), layer.crs, default_crs)?,
        snapshot: Snapshot::from(snapshot.label.as_str()),
        features: layer.items,
    })
}

fn load_raster(snapshot: &RasterSnapshot, default_crs: Option<&CrsTag>) -> Result<RasterLayer, IoError> {
    let path = &snapshot.path;
    let raster = parse_raster(&read(path)?).map_err(|e| e.in_file(path))?;

    log::info!(
        "Loaded snapshot {} from {} ({}x{} cells)",
        snapshot.label,
        path.display(),
        raster.grid.width(),
        raster.grid.height()
    );

    Ok(RasterLayer {
        crs: resolve_crs(&snapshot.label, snapshot.crs.as_deref(), raster.crs, default_crs)?,
        snapshot: Snapshot::from(snapshot.label.as_str()),
        grid: raster.grid,
        transform: raster.transform,
        nodata: raster.nodata,
    })
}

/// Picks a layer's CRS: the config entry, then the file's own declaration,
/// then the config-wide default.
fn resolve_crs(
    layer: &str,
    configured: Option<&str>,
    declared: Option<CrsTag>,
    default: Option<&CrsTag>,
) -> Result<CrsTag, IoError> {
    if let Some(configured) = configured {
        let configured = CrsTag::new(configured);
        if let Some(declared) = declared.filter(|d| d != &configured) {
            log::warn!("Layer {layer} declares {declared}; using configured {configured}");
        }
        return Ok(configured);
    }

    declared
        .or_else(|| default.cloned())
        .ok_or_else(|| IoError::MissingCrs {
            layer: layer.to_string(),
        })
}

fn read(path: &Path) -> Result<String, IoError> {
    std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTOR: &str = r#"
crs = "EPSG:27700"

[regions]
path = "wards.geojson"
id_field = "GSS_CODE"
name_field = "NAME"
declared_area_field = "HECTARES"
declared_area_unit = "hectares"

[coverage]
kind = "vector"

[[coverage.snapshots]]
label = "2011"
path = "/data/greenspace_2011.geojson"

[[coverage.snapshots]]
label = "2018"
path = "greenspace_2018.geojson"
id_field = "fid"

[output]
format = "json"
unit = "square_kilometres"
"#;

    #[test]
    fn parses_vector_config() {
        let config = parse_config(VECTOR).unwrap();

        assert_eq!(config.crs.as_deref(), Some("EPSG:27700"));
        assert_eq!(config.regions.declared_area_unit, AreaUnit::Hectares);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.unit, AreaUnit::SquareKilometres);
        let CoverageConfig::Vector { snapshots } = &config.coverage else {
            panic!("expected vector coverage");
        };
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].id_field.as_deref(), Some("fid"));
    }

    #[test]
    fn vector_snapshots_take_no_category_field() {
        let text = VECTOR.replace(r#"id_field = "fid""#, r#"category_field = "function""#);
        assert!(matches!(parse_config(&text), Err(IoError::Toml(_))));
    }

    #[test]
    fn parses_raster_config_with_defaults() {
        let text = r#"
[regions]
path = "wards.geojson"
id_field = "code"
name_field = "name"
crs = "EPSG:32630"

[coverage]
kind = "raster"
categories = [1, 2]

[[coverage.snapshots]]
label = "2015"
path = "landcover_2015.json"
"#;
        let config = parse_config(text).unwrap();

        assert_eq!(config.output, OutputConfig::default());
        let CoverageConfig::Raster {
            categories,
            snapshots,
        } = &config.coverage
        else {
            panic!("expected raster coverage");
        };
        assert_eq!(categories.as_ref().map(BTreeSet::len), Some(2));
        assert_eq!(snapshots[0].label, "2015");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let text = VECTOR.replace("kind = \"vector\"", "kind = \"lidar\"");
        assert!(matches!(parse_config(&text), Err(IoError::Toml(_))));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let mut config = parse_config(VECTOR).unwrap();
        config.resolve_paths(Path::new("/studies/london"));

        assert_eq!(
            config.regions.path,
            PathBuf::from("/studies/london/wards.geojson")
        );
        let CoverageConfig::Vector { snapshots } = &config.coverage else {
            panic!("expected vector coverage");
        };
        assert_eq!(
            snapshots[0].path,
            PathBuf::from("/data/greenspace_2011.geojson")
        );
        assert_eq!(
            snapshots[1].path,
            PathBuf::from("/studies/london/greenspace_2018.geojson")
        );
    }

    #[test]
    fn crs_precedence() {
        let default = CrsTag::epsg(27700);
        assert_eq!(
            resolve_crs("a", Some("epsg:4326"), Some(CrsTag::epsg(3857)), Some(&default)).unwrap(),
            CrsTag::epsg(4326)
        );
        assert_eq!(
            resolve_crs("a", None, Some(CrsTag::epsg(3857)), Some(&default)).unwrap(),
            CrsTag::epsg(3857)
        );
        assert_eq!(
            resolve_crs("a", None, None, Some(&default)).unwrap(),
            default
        );
        assert!(matches!(
            resolve_crs("a", None, None, None),
            Err(IoError::MissingCrs { .. })
        ));
    }

    #[test]
    fn builds_request_from_files() {
        let dir = std::env::temp_dir().join(format!("ward_cover_io_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(
            dir.join("wards.geojson"),
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"code": "W1", "name": "One"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[20,0],[20,20],[0,20],[0,0]]]}}
            ]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("grid.json"),
            r#"{"width": 2, "height": 2, "geo_transform": [0, 10, 0, 20, 0, -10],
                "nodata": 0, "cells": [1, 0, 2, 1]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("run.toml"),
            r#"
crs = "EPSG:27700"

[regions]
path = "wards.geojson"
id_field = "code"
name_field = "name"

[coverage]
kind = "raster"

[[coverage.snapshots]]
label = "2015"
path = "grid.json"
"#,
        )
        .unwrap();

        let config = load_config(&dir.join("run.toml")).unwrap();
        let request = config.build_request().unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(request.regions.crs, CrsTag::epsg(27700));
        assert_eq!(request.regions.regions[0].id.as_str(), "W1");
        let CoverageSource::Raster(raster) = request.source else {
            panic!("expected raster source");
        };
        assert_eq!(raster.layers[0].snapshot.as_str(), "2015");
        assert_eq!(raster.layers[0].crs, CrsTag::epsg(27700));
        assert_eq!(raster.categories, None);
    }

    #[test]
    fn missing_layer_file_names_the_path() {
        let mut config = parse_config(VECTOR).unwrap();
        config.resolve_paths(Path::new("/nonexistent/ward_cover"));
        match config.build_request() {
            Err(IoError::Read { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/ward_cover/wards.geojson"));
            }
            other => panic!("expected read error, got {other:?}"),
        }
    }
}
