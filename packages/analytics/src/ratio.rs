//! Percentage and change derivation.

use ward_cover_models::{RegionId, Snapshot};

use crate::RatioError;

/// Share of `base_area` covered by `coverage_area`, in percent.
///
/// The result is clamped to `[0, 100]`; overlay never produces more
/// coverage than the base, so the clamp only absorbs rounding.
///
/// # Errors
///
/// * [`RatioError::DivisionDegenerate`] if `base_area` is not a positive
///   finite number
/// * [`RatioError::NonFiniteCoverage`] if `coverage_area` is NaN or infinite
pub fn percentage(base_area: f64, coverage_area: f64) -> Result<f64, RatioError> {
    if !base_area.is_finite() || base_area <= 0.0 {
        return Err(RatioError::DivisionDegenerate { base_area });
    }
    if !coverage_area.is_finite() {
        return Err(RatioError::NonFiniteCoverage { coverage_area });
    }

    Ok((coverage_area / base_area * 100.0).clamp(0.0, 100.0))
}

/// Percentage-point change from `prior` to `current`.
#[must_use]
pub fn change(prior: f64, current: f64) -> f64 {
    current - prior
}

/// Percentage-point change for one region, requiring both snapshots.
///
/// Each side pairs the snapshot label with the region's percentage for it,
/// `None` when the region had no coverage record for that snapshot.
///
/// # Errors
///
/// Returns [`RatioError::IncompleteSnapshot`] naming the first missing
/// snapshot.
pub fn change_between(
    region_id: &RegionId,
    prior: (&Snapshot, Option<f64>),
    current: (&Snapshot, Option<f64>),
) -> Result<f64, RatioError> {
    let missing = |snapshot: &Snapshot| RatioError::IncompleteSnapshot {
        region_id: region_id.clone(),
        snapshot: snapshot.clone(),
    };

    let prior_percent = prior.1.ok_or_else(|| missing(prior.0))?;
    let current_percent = current.1.ok_or_else(|| missing(current.0))?;

    Ok(change(prior_percent, current_percent))
}
