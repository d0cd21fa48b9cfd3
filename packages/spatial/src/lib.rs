#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for region/feature overlay.
//!
//! Bulk-loads the envelopes of a feature layer into an R-tree once per run
//! and answers "which features could touch this region" queries. The index
//! only narrows candidates: it never misses a feature whose envelope meets
//! the query box, and the overlay's exact intersection discards the false
//! positives.

use rstar::{AABB, RTree, RTreeObject};
use ward_cover_geometry::Rect;
use ward_cover_models::{Feature, FeatureId};

/// A feature's envelope stored in the R-tree, pointing back into the
/// feature slice by position.
struct FeatureEntry {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree over one feature layer.
///
/// Borrows the feature slice immutably, so a single index can be shared by
/// every worker in the parallel region pass.
pub struct FeatureIndex<'a> {
    features: &'a [Feature],
    tree: RTree<FeatureEntry>,
}

impl<'a> FeatureIndex<'a> {
    /// Bulk-loads the envelopes of `features`.
    ///
    /// An empty slice yields an empty index whose queries return nothing.
    #[must_use]
    pub fn new(features: &'a [Feature]) -> Self {
        let entries = features
            .iter()
            .enumerate()
            .map(|(slot, feature)| FeatureEntry {
                slot,
                envelope: to_aabb(&feature.geometry.envelope()),
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Indexed {} features", tree.size());

        Self { features, tree }
    }

    /// Features whose envelopes intersect `query` (touching counts), in
    /// the order they appear in the layer.
    #[must_use]
    pub fn candidates(&self, query: &Rect<f64>) -> Vec<&'a Feature> {
        let mut slots: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(query))
            .map(|entry| entry.slot)
            .collect();
        slots.sort_unstable();

        slots.into_iter().map(|slot| &self.features[slot]).collect()
    }

    /// Identifiers of the features [`Self::candidates`] would return.
    #[must_use]
    pub fn candidate_ids(&self, query: &Rect<f64>) -> Vec<&'a FeatureId> {
        self.candidates(query)
            .into_iter()
            .map(|feature| &feature.id)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// Converts a `geo` rectangle into an R-tree envelope.
fn to_aabb(rect: &Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

#[cfg(test)]
mod tests {
    use ward_cover_geometry::{Coord, LineString, Polygon};

    use super::*;

    fn square_feature(id: &str, x0: f64, y0: f64, size: f64) -> Feature {
        let ring = LineString::from(vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ]);
        Feature::new(id, Polygon::new(ring, vec![])).unwrap()
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    fn grid_layer() -> Vec<Feature> {
        let mut features = Vec::new();
        for row in 0..10 {
            for col in 0..10 {
                let id = format!("f-{row}-{col}");
                features.push(square_feature(
                    &id,
                    f64::from(col) * 2.0,
                    f64::from(row) * 2.0,
                    1.0,
                ));
            }
        }
        features
    }

    #[test]
    fn empty_layer_has_no_candidates() {
        let index = FeatureIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index.candidates(&rect(0.0, 0.0, 100.0, 100.0)).is_empty());
    }

    #[test]
    fn returns_only_nearby_features() {
        let layer = grid_layer();
        let index = FeatureIndex::new(&layer);
        assert_eq!(index.len(), 100);

        let ids: Vec<&str> = index
            .candidate_ids(&rect(0.5, 0.5, 2.5, 0.9))
            .into_iter()
            .map(FeatureId::as_str)
            .collect();
        assert_eq!(ids, vec!["f-0-0", "f-0-1"]);
    }

    #[test]
    fn touching_envelopes_are_candidates() {
        let layer = vec![square_feature("a", 1.0, 0.0, 1.0)];
        let index = FeatureIndex::new(&layer);
        assert_eq!(index.candidates(&rect(0.0, 0.0, 1.0, 1.0)).len(), 1);
    }

    #[test]
    fn no_false_negatives_against_linear_scan() {
        let layer = grid_layer();
        let index = FeatureIndex::new(&layer);
        let query = rect(3.3, 4.1, 11.7, 9.0);

        let expected: Vec<&str> = layer
            .iter()
            .filter(|f| ward_cover_geometry::envelopes_intersect(&f.geometry.envelope(), &query))
            .map(|f| f.id.as_str())
            .collect();
        let found: Vec<&str> = index
            .candidate_ids(&query)
            .into_iter()
            .map(FeatureId::as_str)
            .collect();

        assert_eq!(found, expected);
    }
}
