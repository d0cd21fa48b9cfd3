//! Grouping of coverage records by (region id, snapshot).
//!
//! [`Aggregator`] keeps every contribution until [`Aggregator::finish`],
//! which sums each group with [`stable_sum`]. Partial aggregators built by
//! independent workers can be [merged](Aggregator::merge) in any order and
//! still finish to the same totals.

use std::collections::{BTreeMap, BTreeSet};

use ward_cover_models::{CoverageRecord, RegionId, Snapshot};

use crate::sum::stable_sum;

/// Collects coverage contributions before summation.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    contributions: BTreeMap<RegionId, BTreeMap<Snapshot, Vec<f64>>>,
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record. Non-finite coverage is dropped with a warning.
    pub fn push(&mut self, record: CoverageRecord) {
        if !record.coverage_area.is_finite() {
            log::warn!(
                "Dropping non-finite coverage {} for region {} ({})",
                record.coverage_area,
                record.region_id,
                record.snapshot
            );
            return;
        }

        self.contributions
            .entry(record.region_id)
            .or_default()
            .entry(record.snapshot)
            .or_default()
            .push(record.coverage_area);
    }

    /// By-value variant of [`Self::push`] for use as a fold step.
    #[must_use]
    pub fn with(mut self, record: CoverageRecord) -> Self {
        self.push(record);
        self
    }

    /// Combines two partial aggregators.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        for (region_id, snapshots) in other.contributions {
            let target = self.contributions.entry(region_id).or_default();
            for (snapshot, mut values) in snapshots {
                target.entry(snapshot).or_default().append(&mut values);
            }
        }
        self
    }

    /// Sums every group.
    #[must_use]
    pub fn finish(self) -> AggregatedCoverage {
        let totals = self
            .contributions
            .into_iter()
            .map(|(region_id, snapshots)| {
                let sums = snapshots
                    .into_iter()
                    .map(|(snapshot, mut values)| (snapshot, stable_sum(&mut values)))
                    .collect();
                (region_id, sums)
            })
            .collect();

        AggregatedCoverage { totals }
    }
}

impl Extend<CoverageRecord> for Aggregator {
    fn extend<I: IntoIterator<Item = CoverageRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}

/// Summed coverage per (region id, snapshot).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedCoverage {
    totals: BTreeMap<RegionId, BTreeMap<Snapshot, f64>>,
}

impl AggregatedCoverage {
    /// Summed coverage, or `None` when no record was seen for the pair.
    #[must_use]
    pub fn get(&self, region_id: &RegionId, snapshot: &Snapshot) -> Option<f64> {
        self.totals.get(region_id)?.get(snapshot).copied()
    }

    /// Every snapshot that occurs in at least one group.
    #[must_use]
    pub fn snapshots(&self) -> BTreeSet<&Snapshot> {
        self.totals.values().flat_map(BTreeMap::keys).collect()
    }

    /// One record per group, ordered by region id then snapshot.
    #[must_use]
    pub fn records(&self) -> Vec<CoverageRecord> {
        self.totals
            .iter()
            .flat_map(|(region_id, snapshots)| {
                snapshots.iter().map(|(snapshot, total)| {
                    CoverageRecord::new(region_id.clone(), snapshot.clone(), *total)
                })
            })
            .collect()
    }

    /// Number of (region, snapshot) groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Groups and sums `records` in one step.
#[must_use]
pub fn aggregate(records: impl IntoIterator<Item = CoverageRecord>) -> AggregatedCoverage {
    let mut aggregator = Aggregator::new();
    aggregator.extend(records);
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, snapshot: &str, area: f64) -> CoverageRecord {
        CoverageRecord::new(RegionId::from(region), Snapshot::from(snapshot), area)
    }

    #[test]
    fn groups_by_region_and_snapshot() {
        let totals = aggregate(vec![
            record("E1", "2011", 10.0),
            record("E1", "2011", 5.0),
            record("E1", "2018", 7.0),
            record("E2", "2011", 1.0),
        ]);

        assert_eq!(totals.len(), 3);
        assert!((totals.get(&"E1".into(), &"2011".into()).unwrap() - 15.0).abs() < 1e-12);
        assert!((totals.get(&"E1".into(), &"2018".into()).unwrap() - 7.0).abs() < 1e-12);
        assert_eq!(totals.get(&"E2".into(), &"2018".into()), None);
    }

    #[test]
    fn shared_names_do_not_merge_distinct_ids() {
        // Two wards both called "Abbey" arrive with different ids; grouping
        // by id keeps them apart.
        let totals = aggregate(vec![
            record("E05000026", "2018", 3.0),
            record("E05009288", "2018", 4.0),
        ]);
        assert_eq!(totals.len(), 2);
    }

    #[test]
    fn order_does_not_matter() {
        let records: Vec<CoverageRecord> = (1..=200)
            .map(|i| record("E1", "2018", 1.0 / f64::from(i)))
            .collect();
        let forward = aggregate(records.clone());
        let backward = aggregate(records.into_iter().rev());
        assert_eq!(forward, backward);
    }

    #[test]
    fn merged_partials_equal_single_pass() {
        let records: Vec<CoverageRecord> = (0..100)
            .map(|i| record(&format!("E{}", i % 7), "2018", f64::from(i) * 0.37))
            .collect();

        let whole = aggregate(records.clone());

        let (left, right) = records.split_at(41);
        let mut a = Aggregator::new();
        a.extend(left.iter().cloned());
        let mut b = Aggregator::new();
        b.extend(right.iter().cloned());

        assert_eq!(b.merge(a).finish(), whole);
    }

    #[test]
    fn non_finite_records_are_dropped() {
        let totals = aggregate(vec![record("E1", "2018", f64::NAN), record("E1", "2018", 2.0)]);
        assert!((totals.get(&"E1".into(), &"2018".into()).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn records_are_ordered() {
        let totals = aggregate(vec![
            record("E2", "2018", 1.0),
            record("E1", "2018", 2.0),
            record("E1", "2011", 3.0),
        ]);
        let keys: Vec<(String, String)> = totals
            .records()
            .into_iter()
            .map(|r| (r.region_id.to_string(), r.snapshot.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("E1".to_string(), "2011".to_string()),
                ("E1".to_string(), "2018".to_string()),
                ("E2".to_string(), "2018".to_string()),
            ]
        );
        assert_eq!(totals.snapshots().len(), 2);
    }
}
