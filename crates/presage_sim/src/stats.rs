//! Per-sequence statistics.
//!
//! The occurrence probability weights over the *full* trial counts of the
//! sequence; per-type averages and sums use only sampled trials. A type
//! with zero sampled trials has a NotApplicable average (its sum stays a
//! plain zero, as the reference behavior keeps sums raw).

use crate::sampling::SampleFilter;
use crate::trajectory::arousal_trace;
use presage_core::{ByType, Sequence, SimConfig, Stat};
use serde::{Deserialize, Serialize};

/// Sampled-arousal summary of one sequence. Transient: created and folded
/// per sequence unless the caller asked for detail records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStats {
    /// Bernoulli occurrence probability under `prob_emotional`, over the
    /// full (unfiltered) trial counts.
    pub probability: f64,
    /// Count of calm trials in the full sequence — the bucket key.
    pub calm_count: usize,
    /// Sampled trials per type.
    pub sampled_counts: ByType<usize>,
    /// Sum of pre-trial arousal over sampled trials, per type.
    pub sums: ByType<f64>,
    /// Average pre-trial arousal over sampled trials, per type.
    pub avgs: ByType<Stat>,
    /// Average over sampled trials of both types combined.
    pub avg_overall: Stat,
    /// Emotional − Calm average difference; defined iff both sides are.
    pub diff_avg: Stat,
    /// Emotional − Calm sum difference; sums are always defined.
    pub diff_sum: f64,
}

impl SequenceStats {
    pub fn compute(sequence: &Sequence, config: &SimConfig) -> Self {
        let trace = arousal_trace(sequence, config);
        let filter = SampleFilter::from_config(config);

        let mut sampled_counts = ByType::<usize>::default();
        let mut sums = ByType::<f64>::default();
        for (i, (&trial, &arousal)) in sequence.trials().iter().zip(trace.iter()).enumerate() {
            if filter.includes(i + 1) {
                *sampled_counts.get_mut(trial) += 1;
                *sums.get_mut(trial) += arousal;
            }
        }

        let avgs = ByType::from_fn(|t| Stat::from_ratio(*sums.get(t), *sampled_counts.get(t)));
        let avg_overall = Stat::from_ratio(
            sums.calm + sums.emotional,
            sampled_counts.calm + sampled_counts.emotional,
        );
        let diff_avg = avgs.emotional.sub(avgs.calm);

        Self {
            probability: sequence.probability(config.prob_emotional),
            calm_count: sequence.calm_count(),
            sampled_counts,
            avgs,
            avg_overall,
            diff_avg,
            diff_sum: sums.emotional - sums.calm,
            sums,
        }
    }
}

/// A per-sequence record retained when detail output was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub label: String,
    pub stats: SequenceStats,
}
