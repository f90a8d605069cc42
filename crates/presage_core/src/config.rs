//! Simulation configuration.
//!
//! Bounds are enforced by clamping at configuration-build time via
//! [`SimConfig::normalized`], never mid-run. That matches the permissive
//! philosophy of the analyzed phenomenon's reference behavior: an
//! out-of-range value is pulled to the nearest valid boundary (and logged),
//! not rejected.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How arousal evolves on a calm trial that is not a sub-sequence boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArousalModel {
    /// Arousal accumulates: `arousal += increment`.
    #[default]
    Linear,
    /// Arousal sits at a fixed elevated level: `arousal := increment`.
    Binary,
}

/// Where sequences come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// All 2^n binary sequences, streamed in depth-first order.
    Exhaustive,
    /// `count` sequences, each trial drawn independently.
    Sampled { count: usize },
}

impl Default for SourceMode {
    fn default() -> Self {
        SourceMode::Exhaustive
    }
}

/// Full configuration for one pipeline pass. Fixed for the duration of a
/// run; the repetition driver reuses one normalized config across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Trials per sub-sequence (n of the closed-form formula). ≥ 1.
    pub trials_per_subsequence: usize,
    /// Sub-sequences pooled into one experiment; the total sequence length
    /// is `trials_per_subsequence × subsequences_per_experiment`. ≥ 1.
    pub subsequences_per_experiment: usize,
    /// Arousal level after a reset and before the first trial.
    pub reset_arousal: f64,
    /// Per-calm-trial increment (linear model) or the fixed elevated level
    /// (binary model).
    pub arousal_increment: f64,
    /// Probability of an emotional trial, in [0, 1]. Used for sequence
    /// weighting; note that the sampled source draws at 50/50 regardless.
    pub prob_emotional: f64,
    pub arousal_model: ArousalModel,
    /// First 1-based trial position included in statistics. ≥ 1.
    pub sample_start: usize,
    /// Stride between included positions. ≥ 1.
    pub sample_stride: usize,
    /// Exclude sequences consisting entirely of one trial type. Retained
    /// probability mass then sums below 1 and is tracked, not assumed.
    pub drop_degenerate_sequences: bool,
    pub source_mode: SourceMode,
    /// Decimal places the closed-form estimator is quantized to.
    pub precision_digits: u32,
    /// Decimal places for display. Carried for the presentation layer; the
    /// core never rounds.
    pub display_rounding: u32,
    /// Base seed for the sampled source. `None` seeds from entropy; a fixed
    /// value makes runs reproducible.
    pub seed: Option<u64>,
    /// Exhaustive enumeration is rejected above this many total trials
    /// rather than silently switching modes: 2^n sequences are infeasible
    /// in time well before memory becomes a concern. Capped at 63 so the
    /// index space always fits a `u64`.
    pub max_exhaustive_trials: usize,
    /// Retain every per-sequence record in the run output. Off by default;
    /// exhaustive spaces are consumed streaming.
    pub collect_details: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trials_per_subsequence: 7,
            subsequences_per_experiment: 1,
            reset_arousal: 0.0,
            arousal_increment: 1.0,
            prob_emotional: 0.5,
            arousal_model: ArousalModel::Linear,
            sample_start: 1,
            sample_stride: 1,
            drop_degenerate_sequences: false,
            source_mode: SourceMode::Exhaustive,
            precision_digits: 30,
            display_rounding: 6,
            seed: None,
            max_exhaustive_trials: 25,
            collect_details: false,
        }
    }
}

impl SimConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields, then clamp.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let config: SimConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        Ok(config.normalized())
    }

    /// Try to load from path; if the file is missing or invalid, return
    /// normalized defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                Self::default().normalized()
            }
        }
    }

    /// Clamp every field to its valid range. This is the single place
    /// bounds are applied; every adjustment is logged.
    pub fn normalized(mut self) -> Self {
        if self.trials_per_subsequence < 1 {
            tracing::warn!("trials_per_subsequence clamped from 0 to 1");
            self.trials_per_subsequence = 1;
        }
        if self.subsequences_per_experiment < 1 {
            tracing::warn!("subsequences_per_experiment clamped from 0 to 1");
            self.subsequences_per_experiment = 1;
        }
        if !(0.0..=1.0).contains(&self.prob_emotional) || self.prob_emotional.is_nan() {
            let clamped = if self.prob_emotional.is_nan() {
                0.5
            } else {
                self.prob_emotional.clamp(0.0, 1.0)
            };
            tracing::warn!(
                "prob_emotional clamped from {} to {}",
                self.prob_emotional,
                clamped
            );
            self.prob_emotional = clamped;
        }
        if self.sample_start < 1 {
            tracing::warn!("sample_start clamped from 0 to 1");
            self.sample_start = 1;
        }
        if self.sample_stride < 1 {
            tracing::warn!("sample_stride clamped from 0 to 1");
            self.sample_stride = 1;
        }
        if self.max_exhaustive_trials > 63 {
            tracing::warn!(
                "max_exhaustive_trials clamped from {} to 63",
                self.max_exhaustive_trials
            );
            self.max_exhaustive_trials = 63;
        }
        if let SourceMode::Sampled { count: 0 } = self.source_mode {
            tracing::warn!("sampled count clamped from 0 to 1");
            self.source_mode = SourceMode::Sampled { count: 1 };
        }
        self
    }

    /// Total trials per pooled experiment sequence.
    pub fn total_trials(&self) -> usize {
        self.trials_per_subsequence * self.subsequences_per_experiment
    }

    /// True when every trial position is included in statistics.
    pub fn sampling_is_default(&self) -> bool {
        self.sample_start == 1 && self.sample_stride == 1
    }

    /// The closed-form estimator assumes a single un-pooled sub-sequence
    /// under the linear model.
    pub fn closed_form_applicable(&self) -> bool {
        self.subsequences_per_experiment == 1 && self.arousal_model == ArousalModel::Linear
    }
}
