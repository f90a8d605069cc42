//! Typed errors for the simulation core.
//!
//! The taxonomy is deliberately small: out-of-range configuration is
//! clamped rather than signalled (see `config`), and empty denominators
//! become `Stat::NotApplicable` rather than failures. What remains are the
//! cases a caller genuinely must handle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Exhaustive enumeration over 2^n sequences is computationally
    /// infeasible beyond a few dozen trials. The caller must either lower
    /// the trial count, raise the guard, or switch to sampled mode — the
    /// core never switches silently.
    #[error(
        "exhaustive enumeration of 2^{trials} sequences exceeds the configured \
         limit of {max} total trials; use sampled mode or raise max_exhaustive_trials"
    )]
    SequenceSpaceTooLarge { trials: usize, max: usize },

    /// The repetition driver needs at least one run.
    #[error("num_repetitions must be at least 1")]
    NoRepetitions,
}
