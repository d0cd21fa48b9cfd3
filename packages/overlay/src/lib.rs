#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exact polygon overlay between a region and its candidate features.
//!
//! Each candidate is intersected with the region, then the pieces are
//! unioned before measuring. Survey layers routinely contain overlapping or
//! duplicated polygons, and summing the clipped areas independently would
//! count the shared part once per polygon.
//!
//! Inputs are [`ValidGeometry`], so nothing here re-validates or repairs.

use geo::BooleanOps;
use ward_cover_geometry::{MultiPolygon, ValidGeometry, envelopes_intersect, multi_polygon_area};

/// Relative tolerance under which a single clipped piece is treated as
/// covering the whole region.
const FULL_COVER_TOLERANCE: f64 = 1e-12;

/// Intersections of one region with its candidates.
enum Pieces {
    /// Some candidate covers the whole region.
    Full,
    /// Non-empty intersections in candidate order.
    Partial(Vec<MultiPolygon<f64>>),
}

/// Area of the union of `region ∩ candidate` over all candidates.
///
/// The result lies in `[0, region.area()]`. Candidates that only touch the
/// region, or miss it entirely, contribute nothing.
#[must_use]
pub fn clip(region: &ValidGeometry, candidates: &[&ValidGeometry]) -> f64 {
    match intersect_all(region, candidates) {
        Pieces::Full => region.area(),
        Pieces::Partial(pieces) if pieces.is_empty() => 0.0,
        Pieces::Partial(pieces) => multi_polygon_area(&union_all(pieces)).clamp(0.0, region.area()),
    }
}

/// The de-duplicated coverage geometry inside `region`.
///
/// Returns an empty multi-polygon when nothing overlaps.
#[must_use]
pub fn coverage_geometry(region: &ValidGeometry, candidates: &[&ValidGeometry]) -> MultiPolygon<f64> {
    match intersect_all(region, candidates) {
        Pieces::Full => region.as_multi_polygon().clone(),
        Pieces::Partial(pieces) => union_all(pieces),
    }
}

fn intersect_all(region: &ValidGeometry, candidates: &[&ValidGeometry]) -> Pieces {
    let region_envelope = region.envelope();
    let full = region.area() * (1.0 - FULL_COVER_TOLERANCE);
    let mut pieces = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if !envelopes_intersect(&region_envelope, &candidate.envelope()) {
            continue;
        }

        let piece = region
            .as_multi_polygon()
            .intersection(candidate.as_multi_polygon());
        let area = multi_polygon_area(&piece);

        if area <= 0.0 {
            continue;
        }
        if area >= full {
            return Pieces::Full;
        }

        pieces.push(piece);
    }

    Pieces::Partial(pieces)
}

/// Unions pieces pairwise in a balanced tree.
///
/// Pairing neighbours keeps each union small and makes the result depend
/// only on the input order, which callers fix by sorting candidates.
fn union_all(mut layer: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len().div_ceil(2));
        let mut pieces = layer.into_iter();

        while let Some(a) = pieces.next() {
            next.push(match pieces.next() {
                Some(b) => a.union(&b),
                None => a,
            });
        }

        layer = next;
    }

    layer.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
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

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn quarter_overlap() {
        let region = rect(0.0, 0.0, 1.0, 1.0);
        let feature = rect(0.5, 0.5, 1.5, 1.5);
        assert_close(clip(&region, &[&feature]), 0.25);
    }

    #[test]
    fn no_candidates_means_no_coverage() {
        let region = rect(0.0, 0.0, 1.0, 1.0);
        assert_close(clip(&region, &[]), 0.0);
        assert!(coverage_geometry(&region, &[]).0.is_empty());
    }

    #[test]
    fn disjoint_and_touching_features_contribute_nothing() {
        let region = rect(0.0, 0.0, 1.0, 1.0);
        let far = rect(5.0, 5.0, 6.0, 6.0);
        let touching = rect(1.0, 0.0, 2.0, 1.0);
        assert_close(clip(&region, &[&far, &touching]), 0.0);
    }

    #[test]
    fn containing_feature_covers_whole_region() {
        let region = rect(2.0, 2.0, 3.0, 5.0);
        let feature = rect(0.0, 0.0, 10.0, 10.0);
        assert_close(clip(&region, &[&feature]), 3.0);
    }

    #[test]
    fn duplicate_features_are_not_double_counted() {
        let region = rect(0.0, 0.0, 5.0, 2.0);
        let a = rect(1.0, 0.5, 2.0, 1.5);
        let b = rect(1.0, 0.5, 2.0, 1.5);
        assert_close(region.area(), 10.0);
        assert_close(clip(&region, &[&a, &b]), 1.0);
    }

    #[test]
    fn partially_overlapping_features_use_union() {
        let region = rect(0.0, 0.0, 10.0, 10.0);
        let a = rect(1.0, 1.0, 3.0, 3.0);
        let b = rect(2.0, 2.0, 4.0, 4.0);
        // 4 + 4 - 1 shared.
        assert_close(clip(&region, &[&a, &b]), 7.0);
    }

    #[test]
    fn coverage_never_exceeds_region() {
        let region = rect(0.0, 0.0, 2.0, 2.0);
        let features: Vec<ValidGeometry> = (0..8)
            .map(|i| {
                let offset = f64::from(i) * 0.25;
                rect(offset - 1.0, -1.0, offset + 1.0, 3.0)
            })
            .collect();
        let refs: Vec<&ValidGeometry> = features.iter().collect();
        let area = clip(&region, &refs);
        assert!(area <= region.area());
        assert_close(area, 4.0);
    }

    #[test]
    fn adding_features_never_decreases_coverage() {
        let region = rect(0.0, 0.0, 4.0, 4.0);
        let features = [
            rect(0.5, 0.5, 1.5, 1.5),
            rect(1.0, 1.0, 2.0, 2.0),
            rect(3.0, -1.0, 5.0, 1.0),
            rect(0.5, 0.5, 1.5, 1.5),
            rect(-2.0, 2.0, 1.0, 6.0),
        ];

        let mut previous = 0.0;
        for n in 1..=features.len() {
            let refs: Vec<&ValidGeometry> = features[..n].iter().collect();
            let area = clip(&region, &refs);
            assert!(area + 1e-9 >= previous, "coverage dropped at {n}");
            previous = area;
        }
    }

    #[test]
    fn holes_in_region_are_respected() {
        let outer = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let region = ValidGeometry::new(Polygon::new(outer, vec![hole])).unwrap();
        let feature = rect(0.0, 0.0, 4.0, 2.0);
        // Lower half is 8, minus the hole's lower half (2).
        assert_close(clip(&region, &[&feature]), 6.0);
    }

    #[test]
    fn holes_in_features_are_respected() {
        let region = rect(0.0, 0.0, 4.0, 4.0);
        let outer = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let feature = ValidGeometry::new(Polygon::new(outer, vec![hole])).unwrap();
        assert_close(clip(&region, &[&feature]), 12.0);
    }

    #[test]
    fn multi_part_feature_counts_each_part() {
        let region = rect(0.0, 0.0, 10.0, 10.0);
        let parts = MultiPolygon::new(vec![
            rect(1.0, 1.0, 2.0, 2.0).into_inner().0.remove(0),
            rect(5.0, 5.0, 7.0, 7.0).into_inner().0.remove(0),
        ]);
        let feature = ValidGeometry::new(parts).unwrap();
        assert_close(clip(&region, &[&feature]), 5.0);
    }

    #[test]
    fn coverage_geometry_matches_area() {
        let region = rect(0.0, 0.0, 2.0, 2.0);
        let a = rect(-1.0, -1.0, 1.0, 1.0);
        let b = rect(0.5, 0.5, 1.5, 1.5);
        let shape = coverage_geometry(&region, &[&a, &b]);
        assert_close(multi_polygon_area(&shape), clip(&region, &[&a, &b]));
        assert_close(multi_polygon_area(&shape), 1.75);
    }

    #[test]
    fn result_does_not_depend_on_candidate_order() {
        let region = rect(0.0, 0.0, 3.0, 3.0);
        let a = rect(0.0, 0.0, 2.0, 2.0);
        let b = rect(1.0, 1.0, 3.0, 3.0);
        let c = rect(2.5, 0.0, 4.0, 1.0);
        let forward = clip(&region, &[&a, &b, &c]);
        let backward = clip(&region, &[&c, &b, &a]);
        assert!((forward - backward).abs() < 1e-9);
        assert_close(forward, 7.5);
    }
}
