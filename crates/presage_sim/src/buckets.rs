//! Calm-count aggregation.
//!
//! Sequences group by their count of calm trials. Every member of a bucket
//! shares one Bernoulli class probability, so the bucket records it as a
//! byproduct of membership rather than recomputing it. Second-level
//! aggregates are derived once, after all sequences are folded in.
//!
//! Two weighting conventions coexist and are NOT interchangeable: some
//! aggregates weight by class probability × occupancy count, others by
//! class probability alone. Both are preserved distinctly.

use crate::stats::SequenceStats;
use presage_core::{ByType, Stat, TrialType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One bucket of per-sequence results sharing a calm count.
///
/// The per-type lists grow in lockstep (one push appends to all four), so a
/// single occupancy count is derived from one list length instead of being
/// asserted equal across types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalmCountBucket {
    pub calm_count: usize,
    /// Class probability, identical for every member sequence.
    pub probability: f64,
    /// Per-sequence averages in fold order, per type.
    pub avgs: ByType<Vec<Stat>>,
    /// Per-sequence sampled sums in fold order, per type.
    pub sums: ByType<Vec<f64>>,
}

impl CalmCountBucket {
    fn new(calm_count: usize, probability: f64) -> Self {
        Self {
            calm_count,
            probability,
            avgs: ByType::default(),
            sums: ByType::default(),
        }
    }

    fn push(&mut self, stats: &SequenceStats) {
        for t in TrialType::BOTH {
            self.avgs.get_mut(t).push(*stats.avgs.get(t));
            self.sums.get_mut(t).push(*stats.sums.get(t));
        }
    }

    /// Number of sequences folded into this bucket.
    pub fn occupancy(&self) -> usize {
        self.avgs.calm.len()
    }

    fn merge(&mut self, other: &CalmCountBucket) {
        for t in TrialType::BOTH {
            self.avgs.get_mut(t).extend_from_slice(other.avgs.get(t));
            self.sums.get_mut(t).extend_from_slice(other.sums.get(t));
        }
    }

    fn aggregates_for(&self, t: TrialType) -> TypeAggregates {
        let occupancy = self.occupancy();
        let weight = self.probability * occupancy as f64;

        let defined: Vec<f64> = self.avgs.get(t).iter().filter_map(|s| s.value()).collect();
        let sum_avgs: f64 = defined.iter().sum();
        let avg_avgs = Stat::from_ratio(sum_avgs, defined.len());

        let sum_sums: f64 = self.sums.get(t).iter().sum();
        // Quirk preserved from the reference behavior: the average of sums
        // is reported n/a whenever the type has no defined averages here,
        // even though the sums themselves always exist.
        let avg_sums = if defined.is_empty() {
            Stat::NotApplicable
        } else {
            Stat::from_ratio(sum_sums, occupancy)
        };

        TypeAggregates {
            avg_avgs,
            weighted_avg_avgs: avg_avgs.scale(weight),
            sum_avgs,
            weighted_sum_avgs: sum_avgs * weight,
            avg_sums,
            weighted_avg_sums: avg_sums.scale(weight),
            sum_sums,
            weighted_sum_sums: sum_sums * weight,
        }
    }
}

/// Derived second-level aggregates for one trial type within one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeAggregates {
    /// Average of per-sequence averages, ignoring NotApplicable entries.
    pub avg_avgs: Stat,
    /// `avg_avgs × class probability × occupancy`.
    pub weighted_avg_avgs: Stat,
    /// Sum of defined per-sequence averages.
    pub sum_avgs: f64,
    /// `sum_avgs × class probability × occupancy`.
    pub weighted_sum_avgs: f64,
    /// Average of per-sequence sums (n/a quirk: see `CalmCountBucket`).
    pub avg_sums: Stat,
    /// `avg_sums × class probability × occupancy`.
    pub weighted_avg_sums: Stat,
    /// Sum of per-sequence sums.
    pub sum_sums: f64,
    /// `sum_sums × class probability × occupancy`.
    pub weighted_sum_sums: f64,
}

/// One bucket's derived view, as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketReport {
    pub calm_count: usize,
    pub emotional_count: usize,
    pub occupancy: usize,
    pub probability: f64,
    /// Class probability weighted by occupancy.
    pub occupancy_probability: f64,
    pub aggregates: ByType<TypeAggregates>,
}

/// Running totals of one trial type's aggregates across all buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTotals {
    pub sum_avg_avgs: f64,
    pub count_avg_avgs: usize,
    pub sum_weighted_avg_avgs: f64,
    pub count_weighted_avg_avgs: usize,
    pub sum_sum_avgs: f64,
    pub sum_weighted_sum_avgs: f64,
    pub sum_avg_sums: f64,
    pub count_avg_sums: usize,
    pub sum_weighted_avg_sums: f64,
    pub count_weighted_avg_sums: usize,
    pub sum_sum_sums: f64,
    pub sum_weighted_sum_sums: f64,
}

impl TypeTotals {
    fn absorb(&mut self, agg: &TypeAggregates) {
        if let Some(v) = agg.avg_avgs.value() {
            self.sum_avg_avgs += v;
            self.count_avg_avgs += 1;
        }
        if let Some(v) = agg.weighted_avg_avgs.value() {
            self.sum_weighted_avg_avgs += v;
            self.count_weighted_avg_avgs += 1;
        }
        self.sum_sum_avgs += agg.sum_avgs;
        self.sum_weighted_sum_avgs += agg.weighted_sum_avgs;
        if let Some(v) = agg.avg_sums.value() {
            self.sum_avg_sums += v;
            self.count_avg_sums += 1;
        }
        if let Some(v) = agg.weighted_avg_sums.value() {
            self.sum_weighted_avg_sums += v;
            self.count_weighted_avg_sums += 1;
        }
        self.sum_sum_sums += agg.sum_sums;
        self.sum_weighted_sum_sums += agg.weighted_sum_sums;
    }
}

/// Totals of bucket aggregates across all calm counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketTotals {
    pub by_type: ByType<TypeTotals>,
    pub bucket_count: usize,
    pub sum_probability: f64,
    pub sum_occupancy: usize,
    pub sum_occupancy_probability: f64,
}

/// The calm-count aggregator: a fold target living for one pipeline pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalmCountAggregator {
    buckets: BTreeMap<usize, CalmCountBucket>,
}

impl CalmCountAggregator {
    pub fn fold(&mut self, stats: &SequenceStats) {
        self.buckets
            .entry(stats.calm_count)
            .or_insert_with(|| CalmCountBucket::new(stats.calm_count, stats.probability))
            .push(stats);
    }

    /// Combine two partial aggregations (parallel reduce).
    pub fn merge(&mut self, other: &CalmCountAggregator) {
        for (&calm_count, bucket) in &other.buckets {
            self.buckets
                .entry(calm_count)
                .and_modify(|b| b.merge(bucket))
                .or_insert_with(|| bucket.clone());
        }
    }

    pub fn buckets(&self) -> &BTreeMap<usize, CalmCountBucket> {
        &self.buckets
    }

    /// Derive the second-level view: one report per bucket in calm-count
    /// order, plus totals across buckets.
    pub fn summarize(&self, total_trials: usize) -> (Vec<BucketReport>, BucketTotals) {
        let mut reports = Vec::with_capacity(self.buckets.len());
        let mut totals = BucketTotals::default();

        for bucket in self.buckets.values() {
            let aggregates = ByType::from_fn(|t| bucket.aggregates_for(t));
            for t in TrialType::BOTH {
                totals.by_type.get_mut(t).absorb(aggregates.get(t));
            }
            let occupancy = bucket.occupancy();
            totals.bucket_count += 1;
            totals.sum_probability += bucket.probability;
            totals.sum_occupancy += occupancy;
            totals.sum_occupancy_probability += bucket.probability * occupancy as f64;

            reports.push(BucketReport {
                calm_count: bucket.calm_count,
                emotional_count: total_trials - bucket.calm_count,
                occupancy,
                probability: bucket.probability,
                occupancy_probability: bucket.probability * occupancy as f64,
                aggregates,
            });
        }

        (reports, totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presage_core::{Sequence, SimConfig, TrialType};

    fn stats_for(label: &str, cfg: &SimConfig) -> SequenceStats {
        let seq = Sequence::new(
            label
                .chars()
                .map(|c| {
                    if c == 'E' {
                        TrialType::Emotional
                    } else {
                        TrialType::Calm
                    }
                })
                .collect(),
        );
        SequenceStats::compute(&seq, cfg)
    }

    fn cfg2() -> SimConfig {
        SimConfig {
            trials_per_subsequence: 2,
            ..SimConfig::default()
        }
    }

    fn fold_all(labels: &[&str], cfg: &SimConfig) -> CalmCountAggregator {
        let mut agg = CalmCountAggregator::default();
        for label in labels {
            agg.fold(&stats_for(label, cfg));
        }
        agg
    }

    #[test]
    fn test_bucket_keying_and_occupancy() {
        let cfg = cfg2();
        let agg = fold_all(&["CC", "CE", "EC", "EE"], &cfg);
        let buckets = agg.buckets();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[&2].occupancy(), 1); // CC
        assert_eq!(buckets[&1].occupancy(), 2); // CE, EC
        assert_eq!(buckets[&0].occupancy(), 1); // EE
        // Shared class probability at p=0.5, n=2
        assert!((buckets[&1].probability - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_bucket_aggregates_two_trial_space() {
        let cfg = cfg2();
        let agg = fold_all(&["CC", "CE", "EC", "EE"], &cfg);
        let (reports, _) = agg.summarize(2);

        // Bucket with one calm trial holds CE (avg_C=0, avg_E=1) and EC
        // (avg_C=0, avg_E=0).
        let one_calm = reports.iter().find(|r| r.calm_count == 1).unwrap();
        assert_eq!(one_calm.occupancy, 2);
        assert_eq!(one_calm.aggregates.calm.avg_avgs, Stat::Defined(0.0));
        assert_eq!(one_calm.aggregates.emotional.avg_avgs, Stat::Defined(0.5));
        // weighted_avg_avgs = avg × prob × occupancy = 0.5 × 0.25 × 2
        assert_eq!(
            one_calm.aggregates.emotional.weighted_avg_avgs,
            Stat::Defined(0.25)
        );
        assert_eq!(one_calm.aggregates.emotional.sum_avgs, 1.0);

        // All-emotional bucket has no calm averages at all.
        let zero_calm = reports.iter().find(|r| r.calm_count == 0).unwrap();
        assert_eq!(zero_calm.aggregates.calm.avg_avgs, Stat::NotApplicable);
        assert_eq!(zero_calm.aggregates.calm.avg_sums, Stat::NotApplicable);
        assert_eq!(zero_calm.aggregates.emotional.avg_avgs, Stat::Defined(0.0));
    }

    #[test]
    fn test_weighting_conventions_differ() {
        // prob × occupancy weighting vs prob-only bucket probability must
        // stay distinguishable in the report.
        let cfg = cfg2();
        let agg = fold_all(&["CE", "EC"], &cfg);
        let (reports, _) = agg.summarize(2);
        let r = &reports[0];
        assert_eq!(r.occupancy, 2);
        assert!((r.probability - 0.25).abs() < 1e-12);
        assert!((r.occupancy_probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_merge_equals_sequential_fold() {
        let cfg = cfg2();
        let all = fold_all(&["CC", "CE", "EC", "EE"], &cfg);

        let mut left = fold_all(&["CC", "CE"], &cfg);
        let right = fold_all(&["EC", "EE"], &cfg);
        left.merge(&right);

        let (a, ta) = all.summarize(2);
        let (b, tb) = left.summarize(2);
        assert_eq!(a, b);
        assert_eq!(ta, tb);
    }

    #[test]
    fn test_totals_absorb_defined_only() {
        let cfg = cfg2();
        let agg = fold_all(&["CC", "CE", "EC", "EE"], &cfg);
        let (_, totals) = agg.summarize(2);
        // Calm avg_avgs defined in buckets 2 (CC) and 1 (CE,EC), not 0 (EE).
        assert_eq!(totals.by_type.calm.count_avg_avgs, 2);
        assert_eq!(totals.by_type.emotional.count_avg_avgs, 2);
        assert_eq!(totals.bucket_count, 3);
        assert_eq!(totals.sum_occupancy, 4);
        assert!((totals.sum_occupancy_probability - 1.0).abs() < 1e-12);
    }
}
