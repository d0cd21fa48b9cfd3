//! Per-region result rows and the study-wide summary.

use ward_cover_models::{ChangeStatus, Region, ResultRow, Snapshot, StudySummary};

use crate::{
    RatioError,
    aggregate::AggregatedCoverage,
    ratio::{change, change_between, percentage},
    sum::stable_sum,
};

/// Which snapshots a run reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlan {
    pub current: Snapshot,
    pub prior: Option<Snapshot>,
}

impl SnapshotPlan {
    /// Report a single snapshot without change.
    #[must_use]
    pub const fn single(current: Snapshot) -> Self {
        Self {
            current,
            prior: None,
        }
    }

    /// Report `current` and its change since `prior`.
    #[must_use]
    pub const fn compare(prior: Snapshot, current: Snapshot) -> Self {
        Self {
            current,
            prior: Some(prior),
        }
    }

    /// Plan for chronologically ordered snapshots: the last is current, the
    /// one before it (if any) is prior. `None` when `snapshots` is empty.
    #[must_use]
    pub fn from_ordered(snapshots: &[Snapshot]) -> Option<Self> {
        match snapshots {
            [] => None,
            [current] => Some(Self::single(current.clone())),
            [.., prior, current] => Some(Self::compare(prior.clone(), current.clone())),
        }
    }
}

/// Builds one row per region, sorted by region id.
///
/// A region with no coverage record for a requested snapshot still gets a
/// row, marked [`ChangeStatus::Incomplete`] and without a change value. A
/// missing current snapshot reports zero coverage alongside that marker.
///
/// # Errors
///
/// Returns [`RatioError`] if a region's base area or coverage cannot be
/// turned into a percentage.
pub fn build_rows(
    regions: &[Region],
    coverage: &AggregatedCoverage,
    plan: &SnapshotPlan,
) -> Result<Vec<ResultRow>, RatioError> {
    let mut rows = regions
        .iter()
        .map(|region| build_row(region, coverage, plan))
        .collect::<Result<Vec<_>, _>>()?;

    rows.sort_by(|a, b| a.region_id.cmp(&b.region_id));

    Ok(rows)
}

fn build_row(
    region: &Region,
    coverage: &AggregatedCoverage,
    plan: &SnapshotPlan,
) -> Result<ResultRow, RatioError> {
    let current_area = coverage.get(&region.id, &plan.current);
    let current_percent = current_area
        .map(|area| percentage(region.base_area, area))
        .transpose()?;

    let (prior_percent, change, status) = match &plan.prior {
        None => {
            let status = if current_area.is_some() {
                ChangeStatus::Single
            } else {
                ChangeStatus::Incomplete {
                    missing: plan.current.clone(),
                }
            };
            (None, None, status)
        }
        Some(prior) => {
            let prior_percent = coverage
                .get(&region.id, prior)
                .map(|area| percentage(region.base_area, area))
                .transpose()?;

            match change_between(
                &region.id,
                (prior, prior_percent),
                (&plan.current, current_percent),
            ) {
                Ok(delta) => (prior_percent, Some(delta), ChangeStatus::Complete),
                Err(RatioError::IncompleteSnapshot { snapshot, .. }) => {
                    log::debug!("Region {} has no coverage for {snapshot}", region.id);
                    (
                        prior_percent,
                        None,
                        ChangeStatus::Incomplete { missing: snapshot },
                    )
                }
                Err(e) => return Err(e),
            }
        }
    };

    Ok(ResultRow {
        region_id: region.id.clone(),
        region_name: region.name.clone(),
        base_area: region.base_area,
        coverage_area: current_area.unwrap_or(0.0),
        coverage_percent: current_percent.unwrap_or(0.0),
        prior_percent,
        change,
        status,
    })
}

/// Study-wide totals over every row that is not incomplete.
///
/// Overall percentages are ratios of summed areas, not averages of the
/// per-region percentages.
#[must_use]
pub fn summarize(
    rows: &[ResultRow],
    coverage: &AggregatedCoverage,
    plan: &SnapshotPlan,
) -> StudySummary {
    let complete: Vec<&ResultRow> = rows.iter().filter(|r| !r.status.is_incomplete()).collect();

    let mut bases: Vec<f64> = complete.iter().map(|r| r.base_area).collect();
    let mut covered: Vec<f64> = complete.iter().map(|r| r.coverage_area).collect();
    let base_area = stable_sum(&mut bases);
    let coverage_area = stable_sum(&mut covered);

    let coverage_percent = percentage(base_area, coverage_area).ok();

    let prior_percent = plan.prior.as_ref().and_then(|prior| {
        let mut prior_areas: Vec<f64> = complete
            .iter()
            .filter_map(|r| coverage.get(&r.region_id, prior))
            .collect();
        percentage(base_area, stable_sum(&mut prior_areas)).ok()
    });

    let change = match (prior_percent, coverage_percent) {
        (Some(prior), Some(current)) => Some(change(prior, current)),
        _ => None,
    };

    StudySummary {
        regions: complete.len(),
        incomplete_regions: rows.len() - complete.len(),
        base_area,
        coverage_area,
        coverage_percent,
        prior_percent,
        change,
    }
}
