//! Global accumulation and top-level bias estimators.
//!
//! The accumulator is the reduce side of the pipeline's map-reduce: a
//! commutative, associative fold over per-sequence statistics, keeping
//! weighted (by occurrence probability) and unweighted sums distinctly.
//! Restricted sums ("where the diff is defined", "where the overall
//! average is defined") carry their own probability-mass denominators so
//! nothing downstream assumes the mass is 1 — dropping degenerate
//! sequences or sampling makes it less.

use crate::buckets::BucketTotals;
use crate::stats::SequenceStats;
use presage_core::{ByType, Stat, TrialType};
use serde::{Deserialize, Serialize};

/// Running sums and counts across all processed sequences of one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalAccumulator {
    /// Sequences folded in (after any degenerate dropping).
    pub total_count: usize,
    /// Degenerate sequences excluded before the fold.
    pub dropped_count: usize,
    /// Probability mass of dropped sequences.
    pub dropped_probability: f64,
    /// Probability mass of folded sequences.
    pub sum_prob: f64,

    // Per-type averages, restricted to sequences where that type's average
    // is defined.
    pub sum_avgs: ByType<f64>,
    pub count_avgs: ByType<usize>,
    pub sum_avgs_prob: ByType<f64>,
    pub sum_prob_avg_defined: ByType<f64>,

    // Per-type sampled sums (always defined).
    pub sum_sums: ByType<f64>,
    pub sum_sums_prob: ByType<f64>,

    // Emotional − Calm difference of averages, restricted to defined.
    pub sum_diff_avgs: f64,
    pub count_diff_avgs: usize,
    pub sum_diff_avgs_prob: f64,
    pub sum_prob_diff_defined: f64,

    // Overall (both-type) average, restricted to defined-diff sequences —
    // the reference the percent bias is taken against.
    pub sum_overall_diff_defined: f64,
    pub sum_overall_prob_diff_defined: f64,

    // Overall average wherever it is defined at all.
    pub sum_overall: f64,
    pub count_overall: usize,
    pub sum_overall_prob: f64,
    pub sum_prob_overall_defined: f64,

    // Emotional − Calm difference of sums (always defined).
    pub sum_diff_sums: f64,
    pub sum_diff_sums_prob: f64,
}

impl GlobalAccumulator {
    pub fn fold(&mut self, stats: &SequenceStats) {
        let p = stats.probability;
        self.total_count += 1;
        self.sum_prob += p;

        for t in TrialType::BOTH {
            if let Some(avg) = stats.avgs.get(t).value() {
                *self.sum_avgs.get_mut(t) += avg;
                *self.count_avgs.get_mut(t) += 1;
                *self.sum_avgs_prob.get_mut(t) += avg * p;
                *self.sum_prob_avg_defined.get_mut(t) += p;
            }
            *self.sum_sums.get_mut(t) += stats.sums.get(t);
            *self.sum_sums_prob.get_mut(t) += stats.sums.get(t) * p;
        }

        if let Some(diff) = stats.diff_avg.value() {
            self.sum_diff_avgs += diff;
            self.count_diff_avgs += 1;
            self.sum_diff_avgs_prob += diff * p;
            self.sum_prob_diff_defined += p;
            // diff defined ⟹ both types sampled ⟹ overall defined
            if let Some(overall) = stats.avg_overall.value() {
                self.sum_overall_diff_defined += overall;
                self.sum_overall_prob_diff_defined += overall * p;
            }
        }

        if let Some(overall) = stats.avg_overall.value() {
            self.sum_overall += overall;
            self.count_overall += 1;
            self.sum_overall_prob += overall * p;
            self.sum_prob_overall_defined += p;
        }

        self.sum_diff_sums += stats.diff_sum;
        self.sum_diff_sums_prob += stats.diff_sum * p;
    }

    pub fn note_dropped(&mut self, probability: f64) {
        self.dropped_count += 1;
        self.dropped_probability += probability;
    }

    /// Combine two partial accumulations (parallel reduce).
    pub fn merge(&mut self, other: &GlobalAccumulator) {
        self.total_count += other.total_count;
        self.dropped_count += other.dropped_count;
        self.dropped_probability += other.dropped_probability;
        self.sum_prob += other.sum_prob;
        for t in TrialType::BOTH {
            *self.sum_avgs.get_mut(t) += other.sum_avgs.get(t);
            *self.count_avgs.get_mut(t) += other.count_avgs.get(t);
            *self.sum_avgs_prob.get_mut(t) += other.sum_avgs_prob.get(t);
            *self.sum_prob_avg_defined.get_mut(t) += other.sum_prob_avg_defined.get(t);
            *self.sum_sums.get_mut(t) += other.sum_sums.get(t);
            *self.sum_sums_prob.get_mut(t) += other.sum_sums_prob.get(t);
        }
        self.sum_diff_avgs += other.sum_diff_avgs;
        self.count_diff_avgs += other.count_diff_avgs;
        self.sum_diff_avgs_prob += other.sum_diff_avgs_prob;
        self.sum_prob_diff_defined += other.sum_prob_diff_defined;
        self.sum_overall_diff_defined += other.sum_overall_diff_defined;
        self.sum_overall_prob_diff_defined += other.sum_overall_prob_diff_defined;
        self.sum_overall += other.sum_overall;
        self.count_overall += other.count_overall;
        self.sum_overall_prob += other.sum_overall_prob;
        self.sum_prob_overall_defined += other.sum_prob_overall_defined;
        self.sum_diff_sums += other.sum_diff_sums;
        self.sum_diff_sums_prob += other.sum_diff_sums_prob;
    }

    /// Probability-weighted average arousal for a trial type, over the
    /// sequences where that type's average is defined.
    pub fn weighted_avg(&self, t: TrialType) -> Stat {
        ratio(*self.sum_avgs_prob.get(t), *self.sum_prob_avg_defined.get(t))
    }

    /// Unweighted (raw) counterpart of [`weighted_avg`].
    pub fn raw_avg(&self, t: TrialType) -> Stat {
        Stat::from_ratio(*self.sum_avgs.get(t), *self.count_avgs.get(t))
    }

    /// Weighted overall (both-type) average, wherever it is defined.
    pub fn weighted_overall_avg(&self) -> Stat {
        ratio(self.sum_overall_prob, self.sum_prob_overall_defined)
    }
}

/// One top-level bias estimate. `bias_percentage` is the raw difference as
/// a percent of the reference average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasEstimate {
    pub label: String,
    pub raw_difference: Stat,
    pub reference_average: Stat,
    pub bias_percentage: Stat,
}

impl BiasEstimate {
    fn new(label: &str, raw_difference: Stat, reference_average: Stat) -> Self {
        Self {
            label: label.to_string(),
            raw_difference,
            reference_average,
            bias_percentage: raw_difference.div(reference_average).scale(100.0),
        }
    }
}

fn ratio(num: f64, den: f64) -> Stat {
    if den != 0.0 {
        Stat::Defined(num / den)
    } else {
        Stat::NotApplicable
    }
}

/// The independent estimators derived from one pass's accumulators. The
/// closed-form estimator is appended separately by the pipeline when its
/// preconditions hold.
pub fn bias_estimates(global: &GlobalAccumulator, totals: &BucketTotals) -> Vec<BiasEstimate> {
    let mut estimates = Vec::with_capacity(5);

    // Method 1: average of per-sequence differences, excluding n/a.
    let diff = ratio(global.sum_diff_avgs_prob, global.sum_prob_diff_defined);
    let reference = ratio(
        global.sum_overall_prob_diff_defined,
        global.sum_prob_diff_defined,
    );
    estimates.push(BiasEstimate::new(
        "Average of per-sequence differences (excluding n/a)",
        diff,
        reference,
    ));

    // Method 2: n/a treated as zero. Numerator and denominator both scale
    // by the defined fraction, so the percentage is identical to method 1
    // while the absolute figures differ.
    let defined_fraction = ratio(global.count_diff_avgs as f64, global.total_count as f64);
    let diff_zeroed = match defined_fraction {
        Stat::Defined(f) => diff.scale(f),
        Stat::NotApplicable => Stat::NotApplicable,
    };
    let reference_zeroed = match defined_fraction {
        Stat::Defined(f) => reference.scale(f),
        Stat::NotApplicable => Stat::NotApplicable,
    };
    estimates.push(BiasEstimate::new(
        "Average of per-sequence differences (treating n/a as zero)",
        diff_zeroed,
        reference_zeroed,
    ));

    // Method 3: difference of independently weighted per-type averages.
    // Differs from method 1 whenever some sequences define only one type.
    let diff_of_avgs = global
        .weighted_avg(TrialType::Emotional)
        .sub(global.weighted_avg(TrialType::Calm));
    estimates.push(BiasEstimate::new(
        "Difference of per-sequence averages",
        diff_of_avgs,
        global.weighted_overall_avg(),
    ));

    // Method 4: bucket-weighted averages. The reference here is the
    // calm-only average, as the label says.
    let calm = &totals.by_type.calm;
    let emotional = &totals.by_type.emotional;
    let bucket_diff = if calm.count_weighted_avg_avgs == 0 && emotional.count_weighted_avg_avgs == 0
    {
        Stat::NotApplicable
    } else {
        Stat::Defined(emotional.sum_weighted_avg_avgs - calm.sum_weighted_avg_avgs)
    };
    let bucket_reference = if calm.count_weighted_avg_avgs == 0 {
        Stat::NotApplicable
    } else {
        Stat::Defined(calm.sum_weighted_avg_avgs)
    };
    estimates.push(BiasEstimate::new(
        "Weighted calm-count averages (relative to calm-only average)",
        bucket_diff,
        bucket_reference,
    ));

    estimates
}
