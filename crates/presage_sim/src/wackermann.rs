//! Closed-form expectation-bias estimator (Wackermann, 2002).
//!
//! For n trials per sequence, emotional probability p and q = 1 − p, the
//! expected Emotional − Calm difference of average pre-trial arousal is
//!
//! ```text
//! bias_diff(n, p) = Σ_{k=1}^{n−1}  C(n+1, k+1) · q^(n−k) · p^k / (k+2)
//! ```
//!
//! The series is evaluated in exact rational arithmetic, so nothing is
//! lost during summation; `precision_digits` only controls the final
//! decimal quantization. A non-degenerate input that quantizes to exactly
//! zero is a precision shortfall, not a result — it is logged so the
//! caller knows to raise the precision, matching how the brute-force side
//! treats empty denominators as explicit non-values rather than zeros.
//!
//! Valid only for a single un-pooled sub-sequence under the linear model;
//! the pipeline checks those preconditions. Because the dynamics are
//! linear in the increment, an increment other than 1 scales the result.

use num_bigint::BigInt;
use num_integer::binomial;
use num_rational::BigRational;
use num_traits::{One, Pow, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/// Result of one closed-form evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedFormBias {
    pub trials: usize,
    pub prob_emotional: f64,
    pub increment: f64,
    pub precision_digits: u32,
    /// The quantized value as an f64, for comparison against the
    /// brute-force accumulators.
    pub value: f64,
    /// The quantized value rendered exactly, e.g. `"0.403646"`.
    pub decimal: String,
    /// True when non-degenerate inputs quantized to exactly zero — the
    /// signal to raise `precision_digits`.
    pub underflowed: bool,
}

/// Evaluate the closed-form bias difference for `trials` per sequence at
/// `prob_emotional`, scaled by `increment`, quantized to
/// `precision_digits` decimal places.
pub fn closed_form_bias(
    trials: usize,
    prob_emotional: f64,
    increment: f64,
    precision_digits: u32,
) -> ClosedFormBias {
    let mut exact = series(trials, prob_emotional);
    if increment != 1.0 {
        exact *= rational_from(increment);
    }

    let scale = BigInt::from(10u32).pow(precision_digits);
    let scaled_int = (&exact * BigRational::from_integer(scale.clone()))
        .round()
        .to_integer();
    let quantized = BigRational::new(scaled_int.clone(), scale);
    let value = quantized.to_f64().unwrap_or(0.0);

    let degenerate =
        trials < 2 || prob_emotional <= 0.0 || prob_emotional >= 1.0 || increment == 0.0;
    let underflowed = scaled_int.is_zero() && !degenerate;
    if underflowed {
        tracing::warn!(
            trials,
            prob_emotional,
            precision_digits,
            "closed-form bias quantized to exactly zero; raise precision_digits"
        );
    }

    ClosedFormBias {
        trials,
        prob_emotional,
        increment,
        precision_digits,
        value,
        decimal: decimal_string(&scaled_int, precision_digits),
        underflowed,
    }
}

/// The combinatorial series, exact. Empty (zero) for `trials < 2`.
fn series(trials: usize, prob_emotional: f64) -> BigRational {
    let p = rational_from(prob_emotional);
    let q = BigRational::one() - &p;
    let mut sum = BigRational::zero();
    for k in 1..trials {
        let comb = binomial(BigInt::from(trials as u64 + 1), BigInt::from(k as u64 + 1));
        let term = BigRational::from_integer(comb)
            * Pow::pow(&q, (trials - k) as i32)
            * Pow::pow(&p, k as i32)
            / BigRational::from_integer(BigInt::from(k as u64 + 2));
        sum += term;
    }
    sum
}

fn rational_from(value: f64) -> BigRational {
    match BigRational::from_float(value) {
        Some(r) => r,
        None => {
            tracing::warn!("non-finite value {value} in closed-form inputs, treating as zero");
            BigRational::zero()
        }
    }
}

/// Render `scaled_int / 10^digits` as a plain decimal string.
fn decimal_string(scaled_int: &BigInt, digits: u32) -> String {
    let mut magnitude = scaled_int.magnitude().to_string();
    let digits = digits as usize;
    if magnitude.len() <= digits {
        magnitude = format!("{:0>width$}", magnitude, width = digits + 1);
    }
    let split = magnitude.len() - digits;
    let sign = if scaled_int.is_negative() { "-" } else { "" };
    if digits == 0 {
        format!("{sign}{magnitude}")
    } else {
        format!("{sign}{}.{}", &magnitude[..split], &magnitude[split..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_trials_half_probability() {
        // k=1 only: C(3,2) · 0.5 · 0.5 / 3 = 0.25
        let cf = closed_form_bias(2, 0.5, 1.0, 12);
        assert!((cf.value - 0.25).abs() < 1e-12);
        assert!(!cf.underflowed);
    }

    #[test]
    fn test_two_trials_skewed_probability() {
        // C(3,2) · 0.7 · 0.3 / 3 = 0.21
        let cf = closed_form_bias(2, 0.3, 1.0, 12);
        assert!((cf.value - 0.21).abs() < 1e-12);
    }

    #[test]
    fn test_seven_trials_half_probability() {
        // Σ C(8,k+1)/(k+2) over k=1..6, all over 2^7 = 155/384.
        let cf = closed_form_bias(7, 0.5, 1.0, 20);
        assert!((cf.value - 155.0 / 384.0).abs() < 1e-12);
    }

    #[test]
    fn test_increment_scales_linearly() {
        let unit = closed_form_bias(5, 0.5, 1.0, 15);
        let scaled = closed_form_bias(5, 0.5, 2.5, 15);
        assert!((scaled.value - unit.value * 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_single_trial_series_is_empty() {
        let cf = closed_form_bias(1, 0.5, 1.0, 6);
        assert_eq!(cf.value, 0.0);
        assert!(!cf.underflowed, "an empty series is degenerate, not underflow");
    }

    #[test]
    fn test_degenerate_probability_is_zero_without_underflow() {
        let cf = closed_form_bias(5, 0.0, 1.0, 6);
        assert_eq!(cf.value, 0.0);
        assert!(!cf.underflowed);
    }

    #[test]
    fn test_underflow_detected_at_low_precision() {
        // A genuinely tiny but non-zero bias rounds to zero at 6 digits.
        let cf = closed_form_bias(2, 1e-30, 1.0, 6);
        assert_eq!(cf.value, 0.0);
        assert!(cf.underflowed);

        // More digits resolve it.
        let precise = closed_form_bias(2, 1e-30, 1.0, 40);
        assert!(!precise.underflowed);
        assert!(precise.value > 0.0);
    }

    #[test]
    fn test_decimal_rendering() {
        let cf = closed_form_bias(2, 0.5, 1.0, 6);
        assert_eq!(cf.decimal, "0.250000");
        let wide = closed_form_bias(7, 0.5, 1.0, 4);
        // 155/384 = 0.403645833… rounds to 0.4036
        assert_eq!(wide.decimal, "0.4036");
        let zero_digits = closed_form_bias(2, 0.5, 1.0, 0);
        assert_eq!(zero_digits.decimal, "0");
    }
}
