//! Coordinate reference system consistency tags.
//!
//! The core never reprojects. Each layer carries a [`CrsTag`] so the
//! engine can refuse to overlay layers expressed in different systems.
//! Tags are normalized on construction so `EPSG:27700`, `epsg:27700` and
//! the `GeoJSON` legacy URN `urn:ogc:def:crs:EPSG::27700` compare equal.

use std::fmt;

/// Normalized identifier of a planar coordinate system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrsTag(String);

impl CrsTag {
    /// Normalizes a raw CRS identifier.
    ///
    /// Anything naming an EPSG code becomes `EPSG:<code>`; the OGC `CRS84`
    /// aliases become `OGC:CRS84`; any other string is trimmed and
    /// upper-cased.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();

        if let Some(code) = epsg_code_in(&upper) {
            return Self(format!("EPSG:{code}"));
        }
        if upper.ends_with("CRS84") {
            return Self("OGC:CRS84".to_string());
        }

        Self(upper)
    }

    #[must_use]
    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{code}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The EPSG code, if this tag names one.
    #[must_use]
    pub fn epsg_code(&self) -> Option<u32> {
        self.0.strip_prefix("EPSG:")?.parse().ok()
    }
}

impl fmt::Display for CrsTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finds the numeric code following an `EPSG` authority marker, skipping
/// URN/URL version segments (`EPSG:6.6:27700`, `EPSG/0/27700`).
fn epsg_code_in(upper: &str) -> Option<u32> {
    let (_, rest) = upper.split_once("EPSG")?;
    rest.split([':', '/'])
        .rfind(|segment| !segment.is_empty())?
        .parse()
        .ok()
}
