#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region coverage runs.
//!
//! A [`CoverageRequest`] pairs a region layer with either vector feature
//! layers or raster layers, one per snapshot. [`run`] validates the inputs
//! ([`prepare`]), computes coverage for every region in parallel, and
//! derives per-region [`ResultRow`]s plus a [`StudySummary`]. The engine
//! performs no I/O and never reprojects: every layer must carry the same
//! [`CrsTag`] as the regions.

pub mod coverage;
pub mod prepare;
pub mod progress;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;
use ward_cover_analytics::{RatioError, SnapshotPlan, build_rows, summarize};
use ward_cover_geometry::CrsTag;
use ward_cover_models::{
    FeatureInput, RegionInput, RejectedRegion, ResultRow, Snapshot, StudySummary,
};
use ward_cover_zonal::{Category, CategoryGrid, GridTransform};

pub use prepare::{PreparedLayer, PreparedRun, PreparedSource, prepare};
pub use progress::{ProgressCallback, null_progress};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A coverage layer is tagged with a different CRS than the regions.
    #[error("layer {layer} is in {found} but regions are in {expected}")]
    CoordinateMismatch {
        /// Snapshot label of the offending layer.
        layer: String,
        /// CRS of the region layer.
        expected: CrsTag,
        /// CRS of the offending layer.
        found: CrsTag,
    },

    /// The request has no coverage layers.
    #[error("no coverage snapshots were supplied")]
    NoSnapshots,

    /// Two coverage layers share a snapshot label.
    #[error("snapshot {snapshot} is supplied more than once")]
    DuplicateSnapshot {
        /// The repeated label.
        snapshot: Snapshot,
    },

    /// A percentage could not be derived.
    #[error(transparent)]
    Ratio(#[from] RatioError),
}

/// The administrative regions of a run.
#[derive(Debug, Clone)]
pub struct RegionLayer {
    pub crs: CrsTag,
    pub regions: Vec<RegionInput>,
}

/// Land-cover polygons of one snapshot.
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    pub crs: CrsTag,
    pub snapshot: Snapshot,
    pub features: Vec<FeatureInput>,
}

/// A classified raster of one snapshot.
#[derive(Debug, Clone)]
pub struct RasterLayer {
    pub crs: CrsTag,
    pub snapshot: Snapshot,
    pub grid: CategoryGrid,
    pub transform: GridTransform,
    /// Cells with this code are never counted.
    pub nodata: Option<Category>,
}

/// Raster layers plus the category codes that count as coverage.
#[derive(Debug, Clone)]
pub struct RasterSource {
    /// `None` counts every code except nodata.
    pub categories: Option<BTreeSet<Category>>,
    pub layers: Vec<RasterLayer>,
}

/// Coverage input. Snapshots are in chronological order.
#[derive(Debug, Clone)]
pub enum CoverageSource {
    Vector(Vec<FeatureLayer>),
    Raster(RasterSource),
}

#[derive(Debug, Clone)]
pub struct CoverageRequest {
    pub regions: RegionLayer,
    pub source: CoverageSource,
}

/// Outcome of a run.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub current: Snapshot,
    pub prior: Option<Snapshot>,
    /// One row per accepted region, sorted by region id.
    pub rows: Vec<ResultRow>,
    pub summary: StudySummary,
    pub rejected_regions: Vec<RejectedRegion>,
    pub skipped_features: BTreeMap<Snapshot, usize>,
}

/// Validates `request` and computes coverage for every region.
///
/// # Errors
///
/// * Any error from [`prepare`]
/// * [`EngineError::Ratio`] if a percentage cannot be derived
pub fn run(
    request: CoverageRequest,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CoverageReport, EngineError> {
    compute(prepare(request)?, progress)
}

/// Computes coverage for an already validated run.
///
/// # Errors
///
/// * [`EngineError::NoSnapshots`] if `prepared` has no snapshots
/// * [`EngineError::Ratio`] if a percentage cannot be derived
pub fn compute(
    prepared: PreparedRun,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<CoverageReport, EngineError> {
    let plan = SnapshotPlan::from_ordered(&prepared.snapshots).ok_or(EngineError::NoSnapshots)?;

    let work = prepared.regions.len() * prepared.snapshots.len();
    progress.set_total(u64::try_from(work).unwrap_or(u64::MAX));
    progress.set_message(format!("Computing coverage for {} regions", prepared.regions.len()));

    let coverage = match &prepared.source {
        PreparedSource::Vector(layers) => {
            coverage::vector_coverage(&prepared.regions, layers, progress)
        }
        PreparedSource::Raster { categories, layers } => coverage::raster_coverage(
            &prepared.regions,
            layers,
            categories.as_ref(),
            progress,
        ),
    };

    let rows = build_rows(&prepared.regions, &coverage, &plan)?;
    let summary = summarize(&rows, &coverage, &plan);

    progress.finish(format!("Computed coverage for {} regions", rows.len()));
    log::info!(
        "Snapshot {}: {} regions, {} incomplete",
        plan.current,
        summary.regions,
        summary.incomplete_regions
    );

    Ok(CoverageReport {
        current: plan.current,
        prior: plan.prior,
        rows,
        summary,
        rejected_regions: prepared.rejected_regions,
        skipped_features: prepared.skipped_features,
    })
}
