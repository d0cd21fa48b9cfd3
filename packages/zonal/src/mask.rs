//! Scanline rasterization of region polygons onto a grid.
//!
//! A cell is inside when its centre is inside the polygon. Rings are
//! mapped into grid space through the inverse transform (an affine map
//! keeps polygons polygonal), then each row's centre line is intersected
//! with every edge. Crossings are half-open in both axes, so a centre that
//! lies exactly on a boundary shared by two adjacent regions is assigned
//! to one of them, never both.

use ward_cover_geometry::{Polygon, ValidGeometry};

use crate::transform::GridTransform;

/// A run of masked-in cells on one grid row: columns `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    pub row: usize,
    pub start: usize,
    pub end: usize,
}

impl CellSpan {
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Rasterizes `region` onto a `width` × `height` grid.
///
/// Spans are returned row by row with non-overlapping, ascending columns.
/// Parts of a multi-polygon are rasterized separately and their spans
/// merged, so overlapping parts never count a cell twice.
#[must_use]
pub fn mask_spans(
    region: &ValidGeometry,
    width: usize,
    height: usize,
    transform: &GridTransform,
) -> Vec<CellSpan> {
    let parts: Vec<Vec<Vec<(f64, f64)>>> = region
        .as_multi_polygon()
        .0
        .iter()
        .map(|polygon| grid_rings(polygon, transform))
        .collect();

    let Some((min_row, max_row)) = row_extent(&parts) else {
        return Vec::new();
    };

    // Rows whose centre (r + 0.5) falls within the polygon's row extent.
    let first = clamp_index((min_row - 0.5).ceil(), height);
    let last = clamp_index((max_row - 0.5).floor() + 1.0, height);

    let mut spans = Vec::new();
    let mut row_spans: Vec<(usize, usize)> = Vec::new();
    let mut crossings: Vec<f64> = Vec::new();

    for row in first..last {
        #[allow(clippy::cast_precision_loss)]
        let centre = row as f64 + 0.5;
        row_spans.clear();

        for rings in &parts {
            crossings.clear();
            collect_crossings(rings, centre, &mut crossings);
            crossings.sort_by(f64::total_cmp);

            for pair in crossings.chunks_exact(2) {
                let start = clamp_index((pair[0] - 0.5).ceil(), width);
                let end = clamp_index((pair[1] - 0.5).ceil(), width);
                if start < end {
                    row_spans.push((start, end));
                }
            }
        }

        merge_into(&mut row_spans, row, &mut spans);
    }

    spans
}

/// Rings of `polygon` in grid coordinates, exterior first.
fn grid_rings(polygon: &Polygon<f64>, transform: &GridTransform) -> Vec<Vec<(f64, f64)>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.0.iter().map(|c| transform.to_grid(*c)).collect())
        .collect()
}

fn row_extent(parts: &[Vec<Vec<(f64, f64)>>]) -> Option<(f64, f64)> {
    parts
        .iter()
        .flatten()
        .flatten()
        .map(|&(_, row)| row)
        .fold(None, |extent, row| match extent {
            None => Some((row, row)),
            Some((lo, hi)) => Some((f64::min(lo, row), f64::max(hi, row))),
        })
}

/// Pushes the column of every edge crossing of the horizontal line `y`.
///
/// An edge counts when exactly one endpoint is at or below `y`, which
/// skips horizontal edges and counts each vertex once.
fn collect_crossings(rings: &[Vec<(f64, f64)>], y: f64, out: &mut Vec<f64>) {
    for ring in rings {
        for edge in ring.windows(2) {
            let (x0, y0) = edge[0];
            let (x1, y1) = edge[1];

            if (y0 <= y) != (y1 <= y) {
                out.push((y - y0).mul_add((x1 - x0) / (y1 - y0), x0));
            }
        }
    }
}

/// Sorts and merges one row's spans, appending the result to `out`.
fn merge_into(row_spans: &mut [(usize, usize)], row: usize, out: &mut Vec<CellSpan>) {
    row_spans.sort_unstable();

    let mut current: Option<(usize, usize)> = None;
    for &(start, end) in row_spans.iter() {
        current = match current {
            Some((s, e)) if start <= e => Some((s, e.max(end))),
            Some((s, e)) => {
                out.push(CellSpan { row, start: s, end: e });
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }

    if let Some((start, end)) = current {
        out.push(CellSpan { row, start, end });
    }
}

/// Clamps a floating grid index into `0..=max`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn clamp_index(value: f64, max: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= max as f64 {
        max
    } else {
        value as usize
    }
}

#[cfg(test)]
mod tests {
    use ward_cover_geometry::LineString;

    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> ValidGeometry {
        ValidGeometry::new(Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]),
            vec![],
        ))
        .unwrap()
    }

    fn cell_count(spans: &[CellSpan]) -> usize {
        spans.iter().map(CellSpan::len).sum()
    }

    /// 4×4 unit grid covering [0, 4] × [0, 4], row 0 at the top.
    fn unit_grid() -> GridTransform {
        GridTransform::north_up(0.0, 4.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn lower_left_quarter() {
        let spans = mask_spans(&rect(0.0, 0.0, 2.0, 2.0), 4, 4, &unit_grid());
        assert_eq!(
            spans,
            vec![
                CellSpan {
                    row: 2,
                    start: 0,
                    end: 2
                },
                CellSpan {
                    row: 3,
                    start: 0,
                    end: 2
                },
            ]
        );
    }

    #[test]
    fn adjacent_regions_split_centres_once() {
        // Boundary at x = 1.5 passes through the centres of column 1.
        let left = mask_spans(&rect(0.0, 0.0, 1.5, 4.0), 4, 4, &unit_grid());
        let right = mask_spans(&rect(1.5, 0.0, 4.0, 4.0), 4, 4, &unit_grid());
        assert_eq!(cell_count(&left), 4);
        assert_eq!(cell_count(&right), 12);
    }

    #[test]
    fn region_outside_grid_is_empty() {
        assert!(mask_spans(&rect(10.0, 10.0, 12.0, 12.0), 4, 4, &unit_grid()).is_empty());
    }

    #[test]
    fn region_larger_than_grid_is_clamped() {
        let spans = mask_spans(&rect(-100.0, -100.0, 100.0, 100.0), 4, 4, &unit_grid());
        assert_eq!(cell_count(&spans), 16);
    }

    #[test]
    fn hole_is_excluded() {
        let outer = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (3.0, 1.0), (3.0, 3.0), (1.0, 3.0)]);
        let region = ValidGeometry::new(Polygon::new(outer, vec![hole])).unwrap();
        let spans = mask_spans(&region, 4, 4, &unit_grid());
        assert_eq!(cell_count(&spans), 12);
    }

    #[test]
    fn overlapping_parts_are_merged() {
        let a = rect(0.0, 0.0, 3.0, 1.0).into_inner().0.remove(0);
        let b = rect(1.0, 0.0, 4.0, 1.0).into_inner().0.remove(0);
        let region = ValidGeometry::new(ward_cover_geometry::MultiPolygon::new(vec![a, b])).unwrap();
        let spans = mask_spans(&region, 4, 4, &unit_grid());
        assert_eq!(
            spans,
            vec![CellSpan {
                row: 3,
                start: 0,
                end: 4
            }]
        );
    }

    #[test]
    fn triangle_uses_cell_centres() {
        // Right triangle below the diagonal y = x. Centres lying on the
        // hypotenuse open each row's span, so they count: 1 + 2 + 3 + 4.
        let region = ValidGeometry::new(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]),
            vec![],
        ))
        .unwrap();
        assert_eq!(cell_count(&mask_spans(&region, 4, 4, &unit_grid())), 10);
    }
}
