#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry model for coverage analysis.
//!
//! Wraps `geo` polygons in [`ValidGeometry`], a value type that can only be
//! constructed from input that passed the validation policy in
//! [`validate`]. Everything downstream (spatial index, overlay, zonal
//! masks) takes `ValidGeometry`, so invalid input is rejected once at the
//! edge instead of being re-checked or silently repaired per region.
//!
//! All coordinates are planar and already projected; no unit conversion
//! happens here.

pub mod crs;
pub mod validate;

pub use crs::CrsTag;
pub use geo::{Coord, LineString, MultiPolygon, Polygon, Rect};

use geo::BoundingRect;
use thiserror::Error;

/// Reasons a polygon is rejected before entering the overlay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The geometry contains no polygons.
    #[error("geometry contains no polygons")]
    Empty,

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate in polygon {polygon}, ring {ring}")]
    NonFiniteCoordinate {
        /// Index of the polygon within the multi-polygon.
        polygon: usize,
        /// Ring index (0 is the exterior, holes follow).
        ring: usize,
    },

    /// A ring has fewer than three distinct vertices.
    #[error("ring {ring} of polygon {polygon} has {distinct} distinct vertices (need at least 3)")]
    TooFewVertices {
        /// Index of the polygon within the multi-polygon.
        polygon: usize,
        /// Ring index (0 is the exterior, holes follow).
        ring: usize,
        /// Number of distinct vertices found.
        distinct: usize,
    },

    /// A ring encloses no area (all vertices collinear).
    #[error("ring {ring} of polygon {polygon} encloses no area")]
    DegenerateRing {
        /// Index of the polygon within the multi-polygon.
        polygon: usize,
        /// Ring index (0 is the exterior, holes follow).
        ring: usize,
    },

    /// A ring crosses or doubles back over itself.
    #[error("ring {ring} of polygon {polygon} intersects itself near ({x}, {y})")]
    SelfIntersection {
        /// Index of the polygon within the multi-polygon.
        polygon: usize,
        /// Ring index (0 is the exterior, holes follow).
        ring: usize,
        /// X coordinate of the offending intersection.
        x: f64,
        /// Y coordinate of the offending intersection.
        y: f64,
    },

    /// Holes cancel out the exterior, leaving no positive area.
    #[error("polygon {polygon} has non-positive area {area}")]
    NonPositiveArea {
        /// Index of the polygon within the multi-polygon.
        polygon: usize,
        /// Exterior area minus hole area.
        area: f64,
    },
}

/// A polygon or multi-polygon that passed [`validate::check`].
///
/// Area and envelope are computed once at construction and cached, since
/// both are read for every region/feature pair the index returns.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidGeometry {
    shape: MultiPolygon<f64>,
    area: f64,
    envelope: Rect<f64>,
}

impl ValidGeometry {
    /// Validates `geometry` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] describing the first violation found.
    pub fn new(geometry: impl Into<MultiPolygon<f64>>) -> Result<Self, GeometryError> {
        let shape = geometry.into();
        let area = validate::check(&shape)?;
        let envelope = shape.bounding_rect().ok_or(GeometryError::Empty)?;

        Ok(Self {
            shape,
            area,
            envelope,
        })
    }

    /// Planar area (exteriors minus holes) in squared input units.
    #[must_use]
    pub const fn area(&self) -> f64 {
        self.area
    }

    /// Axis-aligned bounding box.
    #[must_use]
    pub const fn envelope(&self) -> Rect<f64> {
        self.envelope
    }

    #[must_use]
    pub const fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.shape
    }

    #[must_use]
    pub fn into_inner(self) -> MultiPolygon<f64> {
        self.shape
    }
}

/// Signed shoelace area of a closed ring.
///
/// Coordinates are shifted to the first vertex before multiplying, which
/// keeps precision for projected coordinates in the hundreds of thousands.
/// Counter-clockwise rings are positive.
#[must_use]
pub fn ring_area(ring: &LineString<f64>) -> f64 {
    let coords = &ring.0;
    let Some(origin) = coords.first() else {
        return 0.0;
    };

    let twice_area: f64 = coords
        .windows(2)
        .map(|pair| {
            let a = pair[0] - *origin;
            let b = pair[1] - *origin;
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();

    twice_area / 2.0
}

/// Area of a polygon: absolute exterior area minus absolute hole areas.
#[must_use]
pub fn polygon_area(polygon: &Polygon<f64>) -> f64 {
    polygon
        .interiors()
        .iter()
        .fold(ring_area(polygon.exterior()).abs(), |area, hole| {
            area - ring_area(hole).abs()
        })
}

/// Area of every polygon in `shape`, summed.
#[must_use]
pub fn multi_polygon_area(shape: &MultiPolygon<f64>) -> f64 {
    shape.0.iter().map(polygon_area).sum()
}

/// Returns `true` when two envelopes share at least one point.
#[must_use]
pub fn envelopes_intersect(a: &Rect<f64>, b: &Rect<f64>) -> bool {
    a.min().x <= b.max().x && b.min().x <= a.max().x && a.min().y <= b.max().y && b.min().y <= a.max().y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + size, y0),
                (x0 + size, y0 + size),
                (x0, y0 + size),
                (x0, y0),
            ]),
            vec![],
        )
    }

    #[test]
    fn unit_square_area() {
        let geometry = ValidGeometry::new(square(0.0, 0.0, 1.0)).unwrap();
        assert!((geometry.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ring_orientation_sign() {
        let ccw = square(0.0, 0.0, 2.0);
        assert!((ring_area(ccw.exterior()) - 4.0).abs() < 1e-12);

        let mut cw: Vec<_> = ccw.exterior().0.clone();
        cw.reverse();
        assert!((ring_area(&LineString::from(cw)) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn hole_is_subtracted() {
        let outer = square(0.0, 0.0, 10.0).exterior().clone();
        let hole = square(2.0, 2.0, 2.0).exterior().clone();
        let geometry = ValidGeometry::new(Polygon::new(outer, vec![hole])).unwrap();
        assert!((geometry.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn projected_coordinates_keep_precision() {
        let geometry = ValidGeometry::new(square(530_000.0, 180_000.0, 0.5)).unwrap();
        assert!((geometry.area() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn multi_polygon_sums_parts() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 2.0)]);
        let geometry = ValidGeometry::new(mp).unwrap();
        assert!((geometry.area() - 5.0).abs() < 1e-12);
        assert!((geometry.envelope().max().x - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn envelope_overlap() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 });
        let b = Rect::new(Coord { x: 1.0, y: 0.5 }, Coord { x: 2.0, y: 2.0 });
        let c = Rect::new(Coord { x: 1.5, y: 0.0 }, Coord { x: 2.0, y: 1.0 });
        assert!(envelopes_intersect(&a, &b));
        assert!(!envelopes_intersect(&a, &c));
    }
}
