//! presage_bench — end-to-end scenario tests for the simulation pipeline.
//!
//! Validates hand-verifiable studies against the full pipeline:
//! - the four-sequence study and its known estimator values
//! - degenerate dropping leaving the defined-diff estimator unchanged
//! - within-sequence sampling filters
//! - repeated sampled studies and their cross-run moments
//! - closed-form agreement with brute-force enumeration

use presage_core::SimConfig;

/// The minimal hand-verifiable configuration: `trials` trials, one
/// sub-sequence, unit increments, even odds, every position sampled.
pub fn base_config(trials: usize) -> SimConfig {
    SimConfig {
        trials_per_subsequence: trials,
        ..SimConfig::default()
    }
}
