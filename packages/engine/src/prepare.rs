//! Input validation ahead of a coverage run.
//!
//! Every region and feature is validated exactly once here. Invalid,
//! zero-area and duplicate-id regions are set aside as
//! [`RejectedRegion`]s; invalid features are skipped with a warning. CRS
//! tags are compared against the region layer and any mismatch aborts the
//! run, since the engine never reprojects.

use std::collections::{BTreeMap, BTreeSet};

use ward_cover_geometry::{CrsTag, MultiPolygon};
use ward_cover_models::{Feature, Region, RegionId, RejectedRegion, Snapshot};
use ward_cover_overlay::coverage_geometry;
use ward_cover_spatial::FeatureIndex;
use ward_cover_zonal::Category;

use crate::{CoverageRequest, CoverageSource, EngineError, FeatureLayer, RasterLayer, RegionLayer};

/// Validated features of one snapshot.
#[derive(Debug, Clone)]
pub struct PreparedLayer {
    pub snapshot: Snapshot,
    pub features: Vec<Feature>,
}

/// Coverage input after validation.
#[derive(Debug, Clone)]
pub enum PreparedSource {
    Vector(Vec<PreparedLayer>),
    Raster {
        categories: Option<BTreeSet<Category>>,
        layers: Vec<RasterLayer>,
    },
}

/// A validated run, ready for [`crate::compute`].
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub crs: CrsTag,
    pub regions: Vec<Region>,
    pub rejected_regions: Vec<RejectedRegion>,
    pub source: PreparedSource,
    /// Snapshot labels in the order the layers were supplied.
    pub snapshots: Vec<Snapshot>,
    /// Number of invalid features dropped per snapshot.
    pub skipped_features: BTreeMap<Snapshot, usize>,
}

impl PreparedRun {
    /// The de-duplicated coverage polygon of one region in one vector
    /// snapshot. `None` for raster runs or unknown ids and snapshots.
    #[must_use]
    pub fn coverage_geometry(
        &self,
        region_id: &RegionId,
        snapshot: &Snapshot,
    ) -> Option<MultiPolygon<f64>> {
        let PreparedSource::Vector(layers) = &self.source else {
            return None;
        };

        let region = self.regions.iter().find(|r| &r.id == region_id)?;
        let layer = layers.iter().find(|l| &l.snapshot == snapshot)?;

        let index = FeatureIndex::new(&layer.features);
        let candidates: Vec<_> = index
            .candidates(&region.envelope())
            .into_iter()
            .map(|f| &f.geometry)
            .collect();

        Some(coverage_geometry(&region.boundary, &candidates))
    }
}

/// Validates `request` without computing any coverage.
///
/// # Errors
///
/// * [`EngineError::NoSnapshots`] if no coverage layer was supplied
/// * [`EngineError::DuplicateSnapshot`] if two layers share a label
/// * [`EngineError::CoordinateMismatch`] if a layer's CRS tag differs from
///   the region layer's
pub fn prepare(request: CoverageRequest) -> Result<PreparedRun, EngineError> {
    let CoverageRequest { regions, source } = request;
    let crs = regions.crs.clone();

    let snapshots = snapshot_labels(&source)?;
    check_crs(&crs, &source)?;

    let (regions, rejected_regions) = validate_regions(regions);

    let mut skipped_features = BTreeMap::new();
    let source = match source {
        CoverageSource::Vector(layers) => PreparedSource::Vector(
            layers
                .into_iter()
                .map(|layer| {
                    let (prepared, skipped) = validate_features(layer);
                    skipped_features.insert(prepared.snapshot.clone(), skipped);
                    prepared
                })
                .collect(),
        ),
        CoverageSource::Raster(raster) => {
            for layer in &raster.layers {
                skipped_features.insert(layer.snapshot.clone(), 0);
                log::info!(
                    "Snapshot {}: {}x{} grid, cell area {}",
                    layer.snapshot,
                    layer.grid.width(),
                    layer.grid.height(),
                    layer.transform.cell_area()
                );
            }
            PreparedSource::Raster {
                categories: raster.categories,
                layers: raster.layers,
            }
        }
    };

    log::info!(
        "Validated {} regions ({} rejected)",
        regions.len(),
        rejected_regions.len()
    );

    Ok(PreparedRun {
        crs,
        regions,
        rejected_regions,
        source,
        snapshots,
        skipped_features,
    })
}

fn snapshot_labels(source: &CoverageSource) -> Result<Vec<Snapshot>, EngineError> {
    let labels: Vec<Snapshot> = match source {
        CoverageSource::Vector(layers) => layers.iter().map(|l| l.snapshot.clone()).collect(),
        CoverageSource::Raster(raster) => {
            raster.layers.iter().map(|l| l.snapshot.clone()).collect()
        }
    };

    if labels.is_empty() {
        return Err(EngineError::NoSnapshots);
    }

    let mut seen = BTreeSet::new();
    for label in &labels {
        if !seen.insert(label) {
            return Err(EngineError::DuplicateSnapshot {
                snapshot: label.clone(),
            });
        }
    }

    Ok(labels)
}

fn check_crs(expected: &CrsTag, source: &CoverageSource) -> Result<(), EngineError> {
    let layers: Vec<(&Snapshot, &CrsTag)> = match source {
        CoverageSource::Vector(layers) => layers.iter().map(|l| (&l.snapshot, &l.crs)).collect(),
        CoverageSource::Raster(raster) => {
            raster.layers.iter().map(|l| (&l.snapshot, &l.crs)).collect()
        }
    };

    for (snapshot, found) in layers {
        if found != expected {
            return Err(EngineError::CoordinateMismatch {
                layer: snapshot.to_string(),
                expected: expected.clone(),
                found: found.clone(),
            });
        }
    }

    Ok(())
}

fn validate_regions(layer: RegionLayer) -> (Vec<Region>, Vec<RejectedRegion>) {
    let mut seen: BTreeSet<RegionId> = BTreeSet::new();
    let mut regions = Vec::with_capacity(layer.regions.len());
    let mut rejected = Vec::new();

    for input in layer.regions {
        if seen.contains(&input.id) {
            log::warn!("Rejecting region {} ({}): duplicate id", input.id, input.name);
            rejected.push(RejectedRegion {
                id: input.id,
                name: input.name,
                reason: "duplicate region id".to_string(),
            });
            continue;
        }
        seen.insert(input.id.clone());

        let id = input.id.clone();
        let name = input.name.clone();
        match Region::try_from(input) {
            Ok(region) => {
                log::debug!("Region {} base area {}", region.id, region.base_area);
                regions.push(region);
            }
            Err(e) => {
                log::warn!("Rejecting region {id} ({name}): {e}");
                rejected.push(RejectedRegion {
                    id,
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    (regions, rejected)
}

fn validate_features(layer: FeatureLayer) -> (PreparedLayer, usize) {
    let total = layer.features.len();
    let mut features = Vec::with_capacity(total);
    let mut skipped = 0;

    for input in layer.features {
        let id = input.id.clone();
        match Feature::try_from(input) {
            Ok(feature) => features.push(feature),
            Err(e) => {
                log::warn!("Skipping feature {id} in snapshot {}: {e}", layer.snapshot);
                skipped += 1;
            }
        }
    }

    log::info!(
        "Snapshot {}: {} features ({skipped} skipped)",
        layer.snapshot,
        features.len()
    );

    (
        PreparedLayer {
            snapshot: layer.snapshot,
            features,
        },
        skipped,
    )
}
