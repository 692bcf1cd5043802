//! Slot landing probabilities
//!
//! The base distribution is binomial(rows, 0.5), the landing distribution of
//! an unbiased random walk through the pegs. Win-rate targeting reshapes it
//! with a one-parameter exponential tilt toward high (or low) multipliers and
//! bisects the tilt until the win chance matches the target.

use crate::clamp01;
use crate::consts::{WINRATE_BIAS_RANGE, WINRATE_SEARCH_ITERATIONS};

fn factorial(n: u32) -> f64 {
    (2..=n).fold(1.0, |acc, i| acc * i as f64)
}

/// Binomial(rows, 0.5) probabilities, `rows + 1` entries
pub fn generate_binomial_probabilities(rows: u32) -> Vec<f64> {
    let total = 2f64.powi(rows as i32);
    let n_fact = factorial(rows);
    (0..=rows)
        .map(|k| n_fact / (factorial(k) * factorial(rows - k)) / total)
        .collect()
}

/// Scale to sum 1. Degenerate input (sum <= 0 or non-finite) is returned as-is.
pub fn normalize_probabilities(probabilities: &[f64]) -> Vec<f64> {
    let sum: f64 = probabilities.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return probabilities.to_vec();
    }
    probabilities.iter().map(|p| p / sum).collect()
}

/// Normalize a configured win rate: percentages (> 1) are divided by 100.
pub fn normalize_win_rate(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let normalized = if value > 1.0 { value / 100.0 } else { value };
    Some(clamp01(normalized))
}

/// Iterate `(probability, multiplier)` pairs, skipping invalid entries
fn valid_pairs<'a>(
    probabilities: &'a [f64],
    values: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    probabilities
        .iter()
        .zip(values)
        .map(|(&p, &v)| (p, v))
        .filter(|(p, v)| p.is_finite() && *p >= 0.0 && v.is_finite())
}

/// Probability mass on slots paying at least `min_multiplier`.
///
/// `None` when no valid probability mass exists.
pub fn win_chance(probabilities: &[f64], values: &[f64], min_multiplier: f64) -> Option<f64> {
    let threshold = if min_multiplier.is_finite() {
        min_multiplier
    } else {
        1.0
    };
    let (total, wins) = valid_pairs(probabilities, values).fold((0.0, 0.0), |(total, wins), (p, v)| {
        (total + p, if v >= threshold { wins + p } else { wins })
    });
    (total > 0.0).then(|| wins / total)
}

/// Expected multiplier (return to player). `None` without valid mass.
pub fn rtp_estimate(probabilities: &[f64], values: &[f64]) -> Option<f64> {
    let (total, weighted) = valid_pairs(probabilities, values)
        .fold((0.0, 0.0), |(total, weighted), (p, v)| (total + p, weighted + p * v));
    (total > 0.0).then(|| weighted / total)
}

/// Exponentially tilt `base` by each slot's rescaled multiplier:
/// `w[i] = base[i] * exp(bias * (score[i] - 0.5))`, `score` in [0, 1].
pub fn weighted_probabilities(base: &[f64], values: &[f64], bias: f64) -> Vec<f64> {
    let count = base.len().min(values.len());
    if count == 0 {
        return Vec::new();
    }

    let (min, max) = values[..count]
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() || max == min {
        return normalize_probabilities(&base[..count]);
    }

    let range = max - min;
    let weights: Vec<f64> = base[..count]
        .iter()
        .zip(&values[..count])
        .map(|(&p, &v)| {
            if !p.is_finite() || p < 0.0 {
                return 0.0;
            }
            let score = (v - min) / range;
            p * (bias * (score - 0.5)).exp()
        })
        .collect();
    normalize_probabilities(&weights)
}

/// Reshape `base` so the win chance at `min_multiplier` approaches `target`.
///
/// Targets outside what the bias range can reach return the extreme
/// distribution. A `None` target returns `base` unchanged.
pub fn build_win_rate_probabilities(
    base: &[f64],
    values: &[f64],
    target: Option<f64>,
    min_multiplier: f64,
) -> Vec<f64> {
    let Some(target) = target.filter(|t| t.is_finite()) else {
        return base.to_vec();
    };
    let target = clamp01(target);
    let count = base.len().min(values.len());
    if count == 0 {
        return base.to_vec();
    }
    let base = &base[..count];
    let values = &values[..count];

    let mut low_bias = -WINRATE_BIAS_RANGE;
    let mut high_bias = WINRATE_BIAS_RANGE;
    let mut low_probs = weighted_probabilities(base, values, low_bias);
    let mut high_probs = weighted_probabilities(base, values, high_bias);

    let (Some(mut low_chance), Some(mut high_chance)) = (
        win_chance(&low_probs, values, min_multiplier),
        win_chance(&high_probs, values, min_multiplier),
    ) else {
        return normalize_probabilities(base);
    };

    if low_chance > high_chance {
        std::mem::swap(&mut low_bias, &mut high_bias);
        std::mem::swap(&mut low_chance, &mut high_chance);
        std::mem::swap(&mut low_probs, &mut high_probs);
    }

    if target <= low_chance {
        return low_probs;
    }
    if target >= high_chance {
        return high_probs;
    }

    for _ in 0..WINRATE_SEARCH_ITERATIONS {
        let mid_bias = (low_bias + high_bias) / 2.0;
        let mid_probs = weighted_probabilities(base, values, mid_bias);
        let Some(mid_chance) = win_chance(&mid_probs, values, min_multiplier) else {
            break;
        };
        if mid_chance < target {
            low_bias = mid_bias;
        } else {
            high_bias = mid_bias;
        }
    }

    weighted_probabilities(base, values, high_bias)
}
