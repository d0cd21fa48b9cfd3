//! Minimal validation policy applied before geometry enters the overlay.
//!
//! Accepted: every coordinate finite, every ring with at least three
//! distinct vertices and non-zero area, no ring crossing or doubling back
//! over itself, positive area once holes are subtracted. Rings that merely
//! touch themselves at a point (repeated vertices, pinched rings) are
//! accepted.
//!
//! Not checked: whether holes lie inside their shell, and whether the
//! parts of a multi-polygon overlap each other. Nothing is repaired.

use std::f64::consts::TAU;

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Intersects, Line, LineString, MultiPolygon};

use crate::{GeometryError, ring_area};

/// Validates `shape` and returns its area.
///
/// # Errors
///
/// Returns the first [`GeometryError`] found, scanning polygons and rings
/// in order.
pub fn check(shape: &MultiPolygon<f64>) -> Result<f64, GeometryError> {
    if shape.0.is_empty() {
        return Err(GeometryError::Empty);
    }

    let mut total = 0.0;

    for (polygon_idx, polygon) in shape.0.iter().enumerate() {
        let mut area = check_ring(polygon.exterior(), polygon_idx, 0)?;

        for (hole_idx, hole) in polygon.interiors().iter().enumerate() {
            area -= check_ring(hole, polygon_idx, hole_idx + 1)?;
        }

        if area <= 0.0 {
            return Err(GeometryError::NonPositiveArea {
                polygon: polygon_idx,
                area,
            });
        }

        total += area;
    }

    Ok(total)
}

/// Checks a single ring and returns its absolute area.
fn check_ring(ring: &LineString<f64>, polygon: usize, index: usize) -> Result<f64, GeometryError> {
    if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate {
            polygon,
            ring: index,
        });
    }

    let distinct = distinct_vertices(ring);
    if distinct < 3 {
        return Err(GeometryError::TooFewVertices {
            polygon,
            ring: index,
            distinct,
        });
    }

    let area = ring_area(ring).abs();
    let extent = ring_extent(ring);
    if area <= f64::EPSILON * extent * extent {
        return Err(GeometryError::DegenerateRing {
            polygon,
            ring: index,
        });
    }

    if let Some(at) = find_self_intersection(ring) {
        return Err(GeometryError::SelfIntersection {
            polygon,
            ring: index,
            x: at.x,
            y: at.y,
        });
    }

    Ok(area)
}

fn distinct_vertices(ring: &LineString<f64>) -> usize {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    coords.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    coords.dedup();
    coords.len()
}

fn ring_extent(ring: &LineString<f64>) -> f64 {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

    for c in &ring.0 {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }

    (max_x - min_x).max(max_y - min_y)
}

/// Sweep-and-prune over the ring's segments sorted by minimum x.
///
/// Returns a point where two segments cross at a point interior to both,
/// or where two segments overlap along a stretch of positive length.
/// Points where non-adjacent segments only meet at an endpoint are
/// collected and handed to [`crosses_at`], since the ring may still pass
/// through itself there. Zero-length segments (repeated vertices) are
/// dropped first.
fn find_self_intersection(ring: &LineString<f64>) -> Option<Coord<f64>> {
    let segments: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = segments.len();
    let mut touches: Vec<Coord<f64>> = Vec::new();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| min_x(&segments[a]).total_cmp(&min_x(&segments[b])));

    for (pos, &i) in order.iter().enumerate() {
        let a = segments[i];
        let a_max_x = a.start.x.max(a.end.x);

        for &j in &order[pos + 1..] {
            let b = segments[j];
            if min_x(&b) > a_max_x {
                break;
            }
            if !y_ranges_overlap(&a, &b) {
                continue;
            }

            let adjacent = i.abs_diff(j) == 1 || i.abs_diff(j) == n - 1;

            match line_intersection(a, b) {
                Some(LineIntersection::SinglePoint {
                    intersection,
                    is_proper,
                }) if !adjacent => {
                    if is_proper {
                        return Some(intersection);
                    }
                    if !touches.contains(&intersection) {
                        touches.push(intersection);
                    }
                }
                Some(LineIntersection::Collinear { intersection })
                    if intersection.start != intersection.end =>
                {
                    return Some(intersection.start);
                }
                _ => {}
            }
        }
    }

    touches
        .into_iter()
        .find(|&point| crosses_at(&segments, point))
}

/// Whether the ring passes through itself at `point` rather than just
/// touching it.
///
/// Each visit of the ring to `point` is a pass with an incoming and an
/// outgoing direction. Two passes cross when their directions alternate
/// in angular order around the point.
fn crosses_at(segments: &[Line<f64>], point: Coord<f64>) -> bool {
    let n = segments.len();
    let mut passes: Vec<(f64, f64)> = Vec::new();

    for (k, segment) in segments.iter().enumerate() {
        if segment.end == point {
            let next = segments[(k + 1) % n];
            passes.push((bearing(point, segment.start), bearing(point, next.end)));
        } else if segment.start != point && segment.intersects(&point) {
            passes.push((bearing(point, segment.start), bearing(point, segment.end)));
        }
    }

    passes
        .iter()
        .enumerate()
        .any(|(i, &a)| passes[i + 1..].iter().any(|&b| interleaved(a, b)))
}

fn bearing(from: Coord<f64>, to: Coord<f64>) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Whether exactly one of `b`'s directions lies strictly inside the
/// counter-clockwise arc from `a.0` to `a.1`. Shared directions count as
/// touching.
fn interleaved(a: (f64, f64), b: (f64, f64)) -> bool {
    let offset = |angle: f64| (angle - a.0).rem_euclid(TAU);
    let arc = offset(a.1);
    let inside = |t: f64| t > 0.0 && t < arc;
    let outside = |t: f64| t > arc;
    let (b0, b1) = (offset(b.0), offset(b.1));

    (inside(b0) && outside(b1)) || (outside(b0) && inside(b1))
}

fn min_x(line: &Line<f64>) -> f64 {
    line.start.x.min(line.end.x)
}

fn y_ranges_overlap(a: &Line<f64>, b: &Line<f64>) -> bool {
    let (a_lo, a_hi) = (a.start.y.min(a.end.y), a.start.y.max(a.end.y));
    let (b_lo, b_hi) = (b.start.y.min(b.end.y), b.start.y.max(b.end.y));
    a_lo <= b_hi && b_lo <= a_hi
}
