#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Loading and export for coverage runs.
//!
//! Reads a TOML [`RunConfig`], the `GeoJSON` region and land-cover layers
//! or JSON raster grids it names, and turns them into a
//! [`CoverageRequest`](ward_cover_engine::CoverageRequest). Reports are
//! written back out as CSV or JSON in the requested [`AreaUnit`].

pub mod config;
pub mod export;
pub mod raster;
pub mod vector;

use std::path::{Path, PathBuf};

use thiserror::Error;
use ward_cover_zonal::ZonalError;

pub use config::{RunConfig, load_config, parse_config};
pub use export::{AreaUnit, OutputFormat, write_csv, write_json, write_report};

/// Errors that can occur while loading inputs or writing reports.
#[derive(Debug, Error)]
pub enum IoError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing the report failed.
    #[error("failed to write report: {0}")]
    Write(#[from] std::io::Error),

    /// A parse error, with the file it came from.
    #[error("{}: {source}", .path.display())]
    InFile {
        /// The file being parsed.
        path: PathBuf,
        /// What went wrong.
        source: Box<Self>,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The `GeoJSON` document is not a `FeatureCollection`.
    #[error("expected a FeatureCollection, found a {found}")]
    NotFeatureCollection {
        /// The top-level `GeoJSON` type found instead.
        found: &'static str,
    },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run configuration is malformed.
    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A raster grid is malformed.
    #[error("raster error: {0}")]
    Zonal(#[from] ZonalError),

    /// No CRS is configured, declared or defaulted for a layer.
    #[error("no CRS known for layer {layer}; set `crs` in the config")]
    MissingCrs {
        /// Snapshot label, or `regions`.
        layer: String,
    },
}

impl IoError {
    /// Attaches the file being parsed to this error.
    #[must_use]
    pub fn in_file(self, path: &Path) -> Self {
        Self::InFile {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}
