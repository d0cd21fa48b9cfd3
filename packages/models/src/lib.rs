#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region, feature and result types shared by the coverage pipeline.
//!
//! Inputs arrive as [`RegionInput`] / [`FeatureInput`] (raw geometry from
//! the loader) and become [`Region`] / [`Feature`] once their geometry has
//! been validated. Regions are keyed by a stable [`RegionId`]; the display
//! name is carried along but never used for grouping, since two wards can
//! share a name.

use std::fmt;

use serde::{Deserialize, Serialize};
use ward_cover_geometry::{GeometryError, MultiPolygon, Rect, ValidGeometry};

macro_rules! label_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

label_type!(
    /// Stable, unique identifier of a region (e.g. a ward's GSS code).
    RegionId
);

label_type!(
    /// Identifier of a land-cover feature within its snapshot.
    FeatureId
);

label_type!(
    /// Label of a time snapshot (e.g. `"2011"`), attached at ingestion.
    Snapshot
);

/// A region as handed over by the loader, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionInput {
    pub id: RegionId,
    pub name: String,
    pub boundary: MultiPolygon<f64>,
}

/// A validated region with its authoritative base area.
///
/// The base area is always computed from the boundary. Area attributes
/// shipped with the source data are not trusted.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub boundary: ValidGeometry,
    pub base_area: f64,
}

impl Region {
    /// Validates the boundary and computes the base area.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the boundary is invalid or encloses no
    /// area.
    pub fn new(
        id: impl Into<RegionId>,
        name: impl Into<String>,
        boundary: impl Into<MultiPolygon<f64>>,
    ) -> Result<Self, GeometryError> {
        let boundary = ValidGeometry::new(boundary)?;
        let base_area = boundary.area();

        Ok(Self {
            id: id.into(),
            name: name.into(),
            boundary,
            base_area,
        })
    }

    #[must_use]
    pub const fn envelope(&self) -> Rect<f64> {
        self.boundary.envelope()
    }
}

impl TryFrom<RegionInput> for Region {
    type Error = GeometryError;

    fn try_from(input: RegionInput) -> Result<Self, Self::Error> {
        Self::new(input.id, input.name, input.boundary)
    }
}

/// A land-cover feature as handed over by the loader, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    pub id: FeatureId,
    pub geometry: MultiPolygon<f64>,
}

/// A validated land-cover feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: ValidGeometry,
}

impl Feature {
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the geometry is invalid.
    pub fn new(
        id: impl Into<FeatureId>,
        geometry: impl Into<MultiPolygon<f64>>,
    ) -> Result<Self, GeometryError> {
        Ok(Self {
            id: id.into(),
            geometry: ValidGeometry::new(geometry)?,
        })
    }
}

impl TryFrom<FeatureInput> for Feature {
    type Error = GeometryError;

    fn try_from(input: FeatureInput) -> Result<Self, Self::Error> {
        Ok(Self {
            id: input.id,
            geometry: ValidGeometry::new(input.geometry)?,
        })
    }
}

/// Coverage of one region in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRecord {
    pub region_id: RegionId,
    pub snapshot: Snapshot,
    /// Covered area in squared input units (pixel count × cell area on the
    /// raster path).
    pub coverage_area: f64,
}

impl CoverageRecord {
    #[must_use]
    pub fn new(region_id: RegionId, snapshot: Snapshot, coverage_area: f64) -> Self {
        Self {
            region_id,
            snapshot,
            coverage_area,
        }
    }
}

/// Whether a row carries a change value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeStatus {
    /// Only one snapshot was requested; no change is defined.
    Single,
    /// Both snapshots were present and the change was computed.
    Complete,
    /// A requested snapshot had no coverage record for this region.
    Incomplete {
        /// The snapshot that was missing.
        missing: Snapshot,
    },
}

impl ChangeStatus {
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }

    /// Short label used in tabular exports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Complete => "complete",
            Self::Incomplete { .. } => "incomplete",
        }
    }
}

/// Final per-region output consumed by reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub region_id: RegionId,
    pub region_name: String,
    pub base_area: f64,
    /// Coverage in the current snapshot. Zero when that snapshot is
    /// missing, in which case `status` is [`ChangeStatus::Incomplete`].
    pub coverage_area: f64,
    /// Coverage as a percentage of `base_area`, in `[0, 100]`.
    pub coverage_percent: f64,
    pub prior_percent: Option<f64>,
    /// `coverage_percent - prior_percent` when both snapshots exist.
    pub change: Option<f64>,
    pub status: ChangeStatus,
}

/// Totals over every complete row of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySummary {
    /// Number of rows that contributed.
    pub regions: usize,
    /// Rows left out because a snapshot was missing.
    pub incomplete_regions: usize,
    pub base_area: f64,
    pub coverage_area: f64,
    /// Overall percentage; `None` when no region contributed.
    pub coverage_percent: Option<f64>,
    pub prior_percent: Option<f64>,
    pub change: Option<f64>,
}

/// A region left out of the run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRegion {
    pub id: RegionId,
    pub name: String,
    pub reason: String,
}
