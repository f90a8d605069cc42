//! Simulation engine for expectation-bias studies of binary trial
//! sequences.
//!
//! A pass enumerates (or samples) sequences of Calm/Emotional trials,
//! simulates the pre-trial arousal trace of each, and folds per-sequence
//! statistics into probability-weighted accumulators, from which several
//! independent bias estimators are derived. Where Wackermann's closed
//! form applies, it is evaluated exactly and reported alongside the
//! brute-force estimators.
//!
//! Entry points are [`run`], [`run_parallel`], [`run_with_rng`],
//! [`repeat`], and [`closed_form_bias`].

pub mod accumulator;
pub mod buckets;
pub mod pipeline;
pub mod repetition;
pub mod sampling;
pub mod source;
pub mod stats;
pub mod trajectory;
pub mod wackermann;

pub use accumulator::{bias_estimates, BiasEstimate, GlobalAccumulator};
pub use buckets::{BucketReport, BucketTotals, CalmCountAggregator, TypeAggregates, TypeTotals};
pub use pipeline::{run, run_parallel, run_with_rng, RunOutput};
pub use repetition::{repeat, MetricSeries, RepetitionSummary};
pub use sampling::SampleFilter;
pub use source::{sequence_at, ExhaustiveSequences, SampledSequences};
pub use stats::{SequenceRecord, SequenceStats};
pub use trajectory::arousal_trace;
pub use wackermann::{closed_form_bias, ClosedFormBias};
