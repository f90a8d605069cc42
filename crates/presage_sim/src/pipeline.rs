//! The full simulation pipeline: generate → simulate → fold → estimate.
//!
//! Per-sequence computation is a pure function of (sequence, config), and
//! aggregation is a commutative, associative fold, so the exhaustive space
//! also folds in parallel via [`run_parallel`]. Both paths stream: the 2^n
//! space is never materialized, and per-sequence records are retained only
//! when `collect_details` asks for them.

use crate::accumulator::{bias_estimates, BiasEstimate, GlobalAccumulator};
use crate::buckets::{BucketReport, BucketTotals, CalmCountAggregator};
use crate::source::{sequence_at, ExhaustiveSequences, SampledSequences};
use crate::stats::{SequenceRecord, SequenceStats};
use crate::wackermann::closed_form_bias;
use presage_core::{Sequence, SimConfig, SimError, SourceMode, Stat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Everything one pipeline pass produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// The normalized configuration the pass actually ran with.
    pub config: SimConfig,
    /// Per-sequence records, only when `collect_details` was set.
    pub details: Option<Vec<SequenceRecord>>,
    /// Calm-count buckets in ascending calm-count order.
    pub buckets: Vec<BucketReport>,
    pub bucket_totals: BucketTotals,
    pub global: GlobalAccumulator,
    /// The independent bias estimators, closed-form last when applicable.
    pub estimates: Vec<BiasEstimate>,
}

/// Fold state for one pass (or one rayon split of it).
struct PassState {
    global: GlobalAccumulator,
    buckets: CalmCountAggregator,
    details: Option<Vec<SequenceRecord>>,
}

impl PassState {
    fn new(collect_details: bool) -> Self {
        Self {
            global: GlobalAccumulator::default(),
            buckets: CalmCountAggregator::default(),
            details: collect_details.then(Vec::new),
        }
    }

    fn absorb(&mut self, sequence: Sequence, config: &SimConfig) {
        if config.drop_degenerate_sequences && sequence.is_degenerate() {
            self.global
                .note_dropped(sequence.probability(config.prob_emotional));
            return;
        }
        let stats = SequenceStats::compute(&sequence, config);
        self.buckets.fold(&stats);
        if let Some(details) = &mut self.details {
            details.push(SequenceRecord {
                label: sequence.label(),
                stats: stats.clone(),
            });
        }
        self.global.fold(&stats);
    }

    fn merge(mut self, other: PassState) -> Self {
        self.global.merge(&other.global);
        self.buckets.merge(&other.buckets);
        self
    }
}

/// Run one full pass. The sampled source is seeded from `config.seed`
/// (entropy when unset); use [`run_with_rng`] to inject a generator.
pub fn run(config: &SimConfig) -> Result<RunOutput, SimError> {
    let config = config.clone().normalized();
    match config.source_mode {
        SourceMode::Exhaustive => run_exhaustive(config),
        SourceMode::Sampled { count } => {
            let mut rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            run_sampled(config, count, &mut rng)
        }
    }
}

/// Run one full pass with an injected random source. Exhaustive mode is
/// deterministic and ignores the generator.
pub fn run_with_rng<R: Rng>(config: &SimConfig, rng: &mut R) -> Result<RunOutput, SimError> {
    let config = config.clone().normalized();
    match config.source_mode {
        SourceMode::Exhaustive => run_exhaustive(config),
        SourceMode::Sampled { count } => run_sampled(config, count, rng),
    }
}

/// Parallel fold over the exhaustive index space. Sampled mode falls back
/// to the sequential path: splitting a seeded stream would change which
/// sequences a given seed produces.
pub fn run_parallel(config: &SimConfig) -> Result<RunOutput, SimError> {
    let config = config.clone().normalized();
    if !matches!(config.source_mode, SourceMode::Exhaustive) {
        tracing::debug!("parallel run in sampled mode runs sequentially to keep seeded determinism");
        return run(&config);
    }
    if config.collect_details {
        // Detail order is part of the output contract; keep it sequential.
        return run_exhaustive(config);
    }
    let trials = guarded_total_trials(&config)?;

    let state = (0..1u64 << trials)
        .into_par_iter()
        .fold(
            || PassState::new(false),
            |mut state, index| {
                state.absorb(sequence_at(index as u128, trials), &config);
                state
            },
        )
        .reduce(|| PassState::new(false), PassState::merge);

    Ok(finalize(config, state))
}

fn run_exhaustive(config: SimConfig) -> Result<RunOutput, SimError> {
    let trials = guarded_total_trials(&config)?;
    let mut state = PassState::new(config.collect_details);
    for sequence in ExhaustiveSequences::new(trials) {
        state.absorb(sequence, &config);
    }
    Ok(finalize(config, state))
}

fn run_sampled<R: Rng>(
    config: SimConfig,
    count: usize,
    rng: &mut R,
) -> Result<RunOutput, SimError> {
    if config.prob_emotional != 0.5 {
        // Preserved inconsistency of the reference behavior: trials are
        // drawn 50/50 while weighting uses prob_emotional.
        tracing::warn!(
            prob_emotional = config.prob_emotional,
            "sampled source draws trials at 50/50 regardless of prob_emotional; \
             downstream weighting still uses prob_emotional"
        );
    }
    let mut state = PassState::new(config.collect_details);
    for sequence in SampledSequences::new(config.total_trials(), count, rng) {
        state.absorb(sequence, &config);
    }
    Ok(finalize(config, state))
}

fn guarded_total_trials(config: &SimConfig) -> Result<usize, SimError> {
    let trials = config.total_trials();
    if trials > config.max_exhaustive_trials {
        return Err(SimError::SequenceSpaceTooLarge {
            trials,
            max: config.max_exhaustive_trials,
        });
    }
    if trials > 20 {
        tracing::warn!(trials, "exhaustive enumeration of 2^{trials} sequences will be slow");
    }
    Ok(trials)
}

fn finalize(config: SimConfig, state: PassState) -> RunOutput {
    let (buckets, bucket_totals) = state.buckets.summarize(config.total_trials());
    let mut estimates = bias_estimates(&state.global, &bucket_totals);

    if config.closed_form_applicable() {
        estimates.push(closed_form_estimate(&config, &state.global));
    }

    tracing::debug!(
        sequences = state.global.total_count,
        dropped = state.global.dropped_count,
        estimators = estimates.len(),
        "pipeline pass complete"
    );

    RunOutput {
        details: state.details,
        buckets,
        bucket_totals,
        global: state.global,
        estimates,
        config,
    }
}

/// The closed-form row. The formula assumes every trial is sampled; under
/// a non-default filter it is reported as a reference value only, with no
/// percentage against the brute-force reference.
fn closed_form_estimate(config: &SimConfig, global: &GlobalAccumulator) -> BiasEstimate {
    let cf = closed_form_bias(
        config.trials_per_subsequence,
        config.prob_emotional,
        config.arousal_increment,
        config.precision_digits,
    );

    let mut label = String::from("Wackermann's formula");
    match (config.arousal_increment != 1.0, !config.sampling_is_default()) {
        (true, true) => label.push_str(" (scaled, without within-sequence sampling)"),
        (true, false) => label.push_str(" (scaled)"),
        (false, true) => label.push_str(" (without within-sequence sampling)"),
        (false, false) => {}
    }

    let raw_difference = Stat::Defined(cf.value);
    let reference_average = if config.sampling_is_default() && global.count_diff_avgs > 0 {
        // Unnormalized weighted reference, the quantity the series itself
        // is an expectation against.
        Stat::Defined(global.sum_overall_prob_diff_defined)
    } else {
        Stat::NotApplicable
    };

    BiasEstimate {
        bias_percentage: raw_difference.div(reference_average).scale(100.0),
        label,
        raw_difference,
        reference_average,
    }
}
