//! Parallel per-region coverage for both input paths.
//!
//! Regions are independent, so each rayon worker folds the regions it
//! picks up into its own [`Aggregator`] and the partials are merged at the
//! end. Feature indexes and raster grids are shared read-only.

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;
use ward_cover_analytics::{AggregatedCoverage, Aggregator};
use ward_cover_geometry::ValidGeometry;
use ward_cover_models::{CoverageRecord, Region};
use ward_cover_overlay::clip;
use ward_cover_spatial::FeatureIndex;
use ward_cover_zonal::{Category, zonal_count};

use crate::{RasterLayer, prepare::PreparedLayer, progress::ProgressCallback};

/// Clips every region against every vector snapshot.
pub fn vector_coverage(
    regions: &[Region],
    layers: &[PreparedLayer],
    progress: &Arc<dyn ProgressCallback>,
) -> AggregatedCoverage {
    let indexes: Vec<_> = layers
        .iter()
        .map(|layer| (&layer.snapshot, FeatureIndex::new(&layer.features)))
        .collect();

    regions
        .par_iter()
        .fold(Aggregator::new, |mut aggregator, region| {
            for (snapshot, index) in &indexes {
                let candidates: Vec<&ValidGeometry> = index
                    .candidates(&region.envelope())
                    .into_iter()
                    .map(|feature| &feature.geometry)
                    .collect();

                let area = clip(&region.boundary, &candidates);
                log::debug!(
                    "Region {} snapshot {snapshot}: {} candidates, coverage {area}",
                    region.id,
                    candidates.len()
                );

                aggregator.push(CoverageRecord::new(
                    region.id.clone(),
                    (*snapshot).clone(),
                    area,
                ));
                progress.inc(1);
            }
            aggregator
        })
        .reduce(Aggregator::new, Aggregator::merge)
        .finish()
}

/// Counts selected raster categories under every region.
pub fn raster_coverage(
    regions: &[Region],
    layers: &[RasterLayer],
    categories: Option<&BTreeSet<Category>>,
    progress: &Arc<dyn ProgressCallback>,
) -> AggregatedCoverage {
    regions
        .par_iter()
        .fold(Aggregator::new, |mut aggregator, region| {
            for layer in layers {
                let counts = zonal_count(&region.boundary, &layer.grid, &layer.transform, layer.nodata);
                let area = counts.covered_area(categories);
                log::debug!(
                    "Region {} snapshot {}: {} cells, coverage {area}",
                    region.id,
                    layer.snapshot,
                    counts.total_cells()
                );

                aggregator.push(CoverageRecord::new(
                    region.id.clone(),
                    layer.snapshot.clone(),
                    area,
                ));
                progress.inc(1);
            }
            aggregator
        })
        .reduce(Aggregator::new, Aggregator::merge)
        .finish()
}
