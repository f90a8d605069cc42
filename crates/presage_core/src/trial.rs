//! Trial-level vocabulary for the expectation-bias model.
//!
//! A sequence is an ordered run of Calm/Emotional trials. All statistics
//! downstream are either plain `f64` sums or `Stat` values, where `Stat`
//! makes "not applicable" (no sampled trials of a type) an explicit variant
//! instead of a sentinel.

use serde::{Deserialize, Serialize};

/// The two trial types. Emotional trials reset arousal; calm trials let it
/// build according to the configured arousal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialType {
    Calm,
    Emotional,
}

impl TrialType {
    pub const BOTH: [TrialType; 2] = [TrialType::Calm, TrialType::Emotional];

    pub fn other(self) -> Self {
        match self {
            TrialType::Calm => TrialType::Emotional,
            TrialType::Emotional => TrialType::Calm,
        }
    }

    /// Single-letter label used in sequence strings ("C"/"E").
    pub fn symbol(self) -> char {
        match self {
            TrialType::Calm => 'C',
            TrialType::Emotional => 'E',
        }
    }
}

impl std::fmt::Display for TrialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A fixed pair of per-type values, indexed by `TrialType`.
///
/// Replaces the dynamic `"C_" . $suffix` / `"E_" . $suffix` field-name
/// construction of ad hoc aggregate tables with one closed record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ByType<T> {
    pub calm: T,
    pub emotional: T,
}

impl<T> ByType<T> {
    pub fn new(calm: T, emotional: T) -> Self {
        Self { calm, emotional }
    }

    /// Build both slots from the trial type.
    pub fn from_fn(mut f: impl FnMut(TrialType) -> T) -> Self {
        Self {
            calm: f(TrialType::Calm),
            emotional: f(TrialType::Emotional),
        }
    }

    pub fn get(&self, t: TrialType) -> &T {
        match t {
            TrialType::Calm => &self.calm,
            TrialType::Emotional => &self.emotional,
        }
    }

    pub fn get_mut(&mut self, t: TrialType) -> &mut T {
        match t {
            TrialType::Calm => &mut self.calm,
            TrialType::Emotional => &mut self.emotional,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ByType<U> {
        ByType {
            calm: f(self.calm),
            emotional: f(self.emotional),
        }
    }
}

/// A statistic that may be undefined because no sampled trials of the
/// relevant type exist. Arithmetic over `Stat` propagates `NotApplicable`
/// explicitly; nothing downstream ever divides by zero or emits NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Defined(f64),
    NotApplicable,
}

impl Stat {
    /// Average of `sum` over `count` observations; NotApplicable when there
    /// are none.
    pub fn from_ratio(sum: f64, count: usize) -> Self {
        if count == 0 {
            Stat::NotApplicable
        } else {
            Stat::Defined(sum / count as f64)
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Stat::Defined(_))
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Stat::Defined(v) => Some(v),
            Stat::NotApplicable => None,
        }
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Stat::Defined(v) => Stat::Defined(f(v)),
            Stat::NotApplicable => Stat::NotApplicable,
        }
    }

    /// `self − other`, defined only when both sides are.
    pub fn sub(self, other: Stat) -> Stat {
        match (self, other) {
            (Stat::Defined(a), Stat::Defined(b)) => Stat::Defined(a - b),
            _ => Stat::NotApplicable,
        }
    }

    pub fn scale(self, factor: f64) -> Stat {
        self.map(|v| v * factor)
    }

    /// `self / denom`, NotApplicable when the denominator is undefined or
    /// zero. This is the only division the estimators perform.
    pub fn div(self, denom: Stat) -> Stat {
        match (self, denom) {
            (Stat::Defined(a), Stat::Defined(b)) if b != 0.0 => Stat::Defined(a / b),
            _ => Stat::NotApplicable,
        }
    }
}

impl From<Option<f64>> for Stat {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) => Stat::Defined(v),
            None => Stat::NotApplicable,
        }
    }
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stat::Defined(v) => write!(f, "{v}"),
            Stat::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// An immutable ordered run of trials representing one (possibly pooled)
/// experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence(Vec<TrialType>);

impl Sequence {
    pub fn new(trials: Vec<TrialType>) -> Self {
        Self(trials)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn trials(&self) -> &[TrialType] {
        &self.0
    }

    /// Full (unfiltered) per-type trial counts.
    pub fn counts(&self) -> ByType<usize> {
        let mut counts = ByType::default();
        for &t in &self.0 {
            *counts.get_mut(t) += 1;
        }
        counts
    }

    pub fn calm_count(&self) -> usize {
        self.0.iter().filter(|&&t| t == TrialType::Calm).count()
    }

    /// A degenerate sequence consists entirely of one trial type.
    pub fn is_degenerate(&self) -> bool {
        match self.0.first() {
            Some(&first) => self.0.iter().all(|&t| t == first),
            None => true,
        }
    }

    /// Bernoulli occurrence probability of this exact sequence:
    /// `p^#E × (1−p)^#C` over the full trial counts.
    pub fn probability(&self, prob_emotional: f64) -> f64 {
        let counts = self.counts();
        prob_emotional.powi(counts.emotional as i32)
            * (1.0 - prob_emotional).powi(counts.calm as i32)
    }

    /// "CECC…" label, mainly for detail output and test diagnostics.
    pub fn label(&self) -> String {
        self.0.iter().map(|t| t.symbol()).collect()
    }
}
