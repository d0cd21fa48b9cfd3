#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation and ratio derivation for region coverage.
//!
//! Takes per-region [`CoverageRecord`](ward_cover_models::CoverageRecord)s
//! from either coverage path, sums them per (region id, snapshot), and
//! turns the totals into percentages, snapshot-to-snapshot change and a
//! study-wide summary. Grouping is always by region id; display names are
//! not unique and never used as keys.

pub mod aggregate;
pub mod ratio;
pub mod rows;
pub mod sum;

pub use aggregate::{AggregatedCoverage, Aggregator, aggregate};
pub use ratio::{change, change_between, percentage};
pub use rows::{SnapshotPlan, build_rows, summarize};

use thiserror::Error;
use ward_cover_models::{RegionId, Snapshot};

/// Errors that can occur while deriving ratios.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RatioError {
    /// The denominator of a percentage is zero, negative or not finite.
    #[error("cannot compute a percentage of base area {base_area}")]
    DivisionDegenerate {
        /// The offending base area.
        base_area: f64,
    },

    /// The coverage area is NaN or infinite.
    #[error("coverage area {coverage_area} is not finite")]
    NonFiniteCoverage {
        /// The offending coverage area.
        coverage_area: f64,
    },

    /// Change was requested but a snapshot has no coverage for the region.
    #[error("region {region_id} has no coverage for snapshot {snapshot}")]
    IncompleteSnapshot {
        /// Region missing the snapshot.
        region_id: RegionId,
        /// The missing snapshot.
        snapshot: Snapshot,
    },
}
