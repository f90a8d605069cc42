//! Arousal trajectory simulation.
//!
//! The trajectory is the deterministic core of the model: arousal starts at
//! the reset level, and the value recorded for each trial is the level
//! *preceding* that trial. After recording, the state updates:
//!
//! - Emotional trial, or a sub-sequence boundary in pooled mode → reset.
//! - Otherwise, linear model: `arousal += increment`;
//!   binary model: `arousal := increment` (fixed elevated level).
//!
//! Boundaries reset regardless of trial type: the end of a sub-sequence is
//! a property of position, not of what happened there.

use presage_core::{ArousalModel, Sequence, SimConfig, TrialType};

/// Pre-trial arousal levels, one per trial, as a pure function of the
/// sequence and configuration.
pub fn arousal_trace(sequence: &Sequence, config: &SimConfig) -> Vec<f64> {
    let mut trace = Vec::with_capacity(sequence.len());
    let mut arousal = config.reset_arousal;
    for (i, &trial) in sequence.trials().iter().enumerate() {
        trace.push(arousal);
        let position = i + 1;
        let at_boundary = position % config.trials_per_subsequence == 0;
        if trial == TrialType::Emotional || at_boundary {
            arousal = config.reset_arousal;
        } else {
            match config.arousal_model {
                ArousalModel::Linear => arousal += config.arousal_increment,
                ArousalModel::Binary => arousal = config.arousal_increment,
            }
        }
    }
    trace
}
