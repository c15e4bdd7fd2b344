//! # Scorer
//!
//! Turns one reviewer's metrics and a weight vector into a reliability score
//! in `[0.0, 1.0]`.
//!
//! Missing-data policy (quality / accuracy / vote validation only):
//! 1. If the reviewer has data for the signal, use the raw value.
//! 2. Otherwise, if a default substitute is configured, use it.
//! 3. Otherwise the key is "missing": its weight is zeroed and the freed mass
//!    is split equally over the active keys (any key still weighted, plus the
//!    baseline set timeliness / experience / penalty score).
//!
//! Score = dot(values, weights), clamped. Never panics, never NaN.

use crate::reviewer::{DefaultValues, FormulaWeights, ReviewerMetrics, WeightKey};
use serde::Serialize;

/// Per-component contribution, for UI explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentContribution {
    pub component: WeightKey,
    pub raw_value: f64,
    /// Effective weight after missing-data redistribution.
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub breakdown: Vec<ComponentContribution>,
}

/// Values and weights actually used for one reviewer.
#[derive(Debug, Clone, Copy)]
struct Resolved {
    values: [f64; 9],
    weights: FormulaWeights,
}

fn resolve(
    metrics: &ReviewerMetrics,
    weights: &FormulaWeights,
    defaults: Option<&DefaultValues>,
) -> Resolved {
    let mut values = WeightKey::ALL.map(|k| metrics.value(k));
    let mut effective = *weights;
    let mut to_redistribute = 0.0;

    for key in WeightKey::OPTIONAL {
        if metrics.has_data_for(key) || weights.get(key) <= 0.0 {
            continue;
        }
        match defaults.and_then(|d| d.get(key)) {
            Some(substitute) => values[key as usize] = substitute,
            None => {
                to_redistribute += effective.get(key);
                effective.set(key, 0.0);
            }
        }
    }

    if to_redistribute > 0.0 {
        let active: Vec<WeightKey> = WeightKey::ALL
            .into_iter()
            .filter(|k| effective.get(*k) > 0.0 || WeightKey::BASELINE_ACTIVE.contains(k))
            .collect();
        // Unreachable with a non-empty baseline set; kept so the freed mass is
        // simply dropped instead of dividing by zero.
        if !active.is_empty() {
            let share = to_redistribute / active.len() as f64;
            for k in active {
                effective.set(k, effective.get(k) + share);
            }
        }
    }

    Resolved {
        values,
        weights: effective,
    }
}

fn finish(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Reliability score in `[0.0, 1.0]`.
pub fn calculate_score(
    metrics: &ReviewerMetrics,
    weights: &FormulaWeights,
    defaults: Option<&DefaultValues>,
) -> f64 {
    let r = resolve(metrics, weights, defaults);
    let raw: f64 = WeightKey::ALL
        .into_iter()
        .map(|k| r.values[k as usize] * r.weights.get(k))
        .sum();
    finish(raw)
}

/// Same computation as [`calculate_score`], plus the per-component split.
/// The total always equals `calculate_score` for the same inputs.
pub fn calculate_score_with_breakdown(
    metrics: &ReviewerMetrics,
    weights: &FormulaWeights,
    defaults: Option<&DefaultValues>,
) -> ScoreBreakdown {
    let r = resolve(metrics, weights, defaults);
    let breakdown: Vec<ComponentContribution> = WeightKey::ALL
        .into_iter()
        .map(|k| {
            let raw_value = r.values[k as usize];
            let weight = r.weights.get(k);
            ComponentContribution {
                component: k,
                raw_value,
                weight,
                contribution: raw_value * weight,
            }
        })
        .collect();
    let raw: f64 = breakdown.iter().map(|c| c.contribution).sum();
    ScoreBreakdown {
        score: finish(raw),
        breakdown,
    }
}

/// Scores for a whole population, in input order.
pub fn score_all(
    reviewers: &[ReviewerMetrics],
    weights: &FormulaWeights,
    defaults: Option<&DefaultValues>,
) -> Vec<f64> {
    reviewers
        .iter()
        .map(|m| calculate_score(m, weights, defaults))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::LEGACY_BASELINE;

    fn cold_start() -> ReviewerMetrics {
        ReviewerMetrics {
            id: "new".into(),
            total_reviews: 0,
            timeliness: 0.5,
            quality: 0.5,
            accuracy: 0.5,
            vote_validation: 0.5,
            experience: 0.0,
            missed_penalty: 1.0,
            penalty_score: 1.0,
            review_variance: 0.75,
            late_percentage: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn cold_start_legacy_with_quality_default() {
        let s = calculate_score(
            &cold_start(),
            &LEGACY_BASELINE.weights,
            Some(&LEGACY_BASELINE.default_values),
        );
        // 0.3 * 0.5 + 0.7 * 0.625
        assert!((s - 0.5875).abs() < 1e-12, "got {s}");
    }

    #[test]
    fn cold_start_legacy_without_defaults_redistributes() {
        let s = calculate_score(&cold_start(), &LEGACY_BASELINE.weights, None);
        // (0.3 + 0.7/3) * 0.5 + (0.7/3) * 0.0 + (0.7/3) * 1.0
        assert!((s - 0.5).abs() < 1e-12, "got {s}");
    }

    #[test]
    fn missing_quality_spreads_equally_over_baseline_set() {
        let w = LEGACY_BASELINE.weights;
        let b = calculate_score_with_breakdown(&cold_start(), &w, None);
        let weight_of = |k: WeightKey| {
            b.breakdown
                .iter()
                .find(|c| c.component == k)
                .map(|c| c.weight)
                .unwrap()
        };
        let share = 0.7 / 3.0;
        assert_eq!(weight_of(WeightKey::Quality), 0.0);
        assert!((weight_of(WeightKey::Timeliness) - (0.3 + share)).abs() < 1e-12);
        assert!((weight_of(WeightKey::Experience) - share).abs() < 1e-12);
        assert!((weight_of(WeightKey::PenaltyScore) - share).abs() < 1e-12);
        assert_eq!(weight_of(WeightKey::MissedPenalty), 0.0);
        let total: f64 = b.breakdown.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn present_data_is_not_substituted() {
        let mut m = cold_start();
        m.total_reviews = 8;
        m.avg_quality_rating = 4.0;
        m.quality = 0.8;
        m.timeliness = 1.0;
        let s = calculate_score(
            &m,
            &LEGACY_BASELINE.weights,
            Some(&LEGACY_BASELINE.default_values),
        );
        assert!((s - (0.3 + 0.56)).abs() < 1e-12, "got {s}");
    }

    #[test]
    fn zero_weight_missing_key_is_ignored() {
        let w = FormulaWeights {
            timeliness: 1.0,
            ..Default::default()
        };
        let s = calculate_score(&cold_start(), &w, None);
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_weights_score_zero() {
        let s = calculate_score(&cold_start(), &FormulaWeights::default(), None);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn clamps_oversized_weights() {
        let mut m = cold_start();
        m.timeliness = 1.0;
        let w = FormulaWeights {
            timeliness: 3.0,
            ..Default::default()
        };
        assert_eq!(calculate_score(&m, &w, None), 1.0);
    }

    #[test]
    fn nan_input_falls_back_to_zero() {
        let mut m = cold_start();
        m.timeliness = f64::NAN;
        let w = FormulaWeights {
            timeliness: 1.0,
            ..Default::default()
        };
        assert_eq!(calculate_score(&m, &w, None), 0.0);
    }
}
