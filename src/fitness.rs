//! # Fitness Evaluation
//!
//! Scores a candidate weight vector against a reviewer population on four axes:
//! - discrimination: spread of the resulting scores (`stdDev / 0.2`, capped at 1)
//! - bad-reviewer accuracy: share of labelled-bad reviewers in the bottom N scores
//! - fairness: new reviewers should land near a neutral 0.5
//! - stability: correlation with the baseline formula's scores
//!
//! plus a small bonus for keeping `force_include` keys weighted.

use crate::classifier::{identify_bad, identify_good};
use crate::presets::NEUTRAL;
use crate::reviewer::{FormulaWeights, ReviewerMetrics, WeightKey};
use crate::scorer::score_all;
use crate::stats::{calculate_correlation, calculate_stats, k_means_1d};
use serde::{Deserialize, Serialize};

pub const DISCRIMINATION_STD_SCALE: f64 = 0.2;
pub const NEW_REVIEWER_MAX_REVIEWS: u32 = 5;
pub const FAIRNESS_TARGET: f64 = 0.5;
pub const FAIRNESS_TOLERANCE: f64 = 0.25;
pub const CLUSTER_MIN_SEPARATION: f64 = 0.1;

pub const BLEND_DISCRIMINATION: f64 = 0.35;
pub const BLEND_BAD_ACCURACY: f64 = 0.35;
pub const BLEND_FAIRNESS: f64 = 0.20;
pub const BLEND_STABILITY: f64 = 0.10;

pub const FORCE_BONUS_STRONG_ABOVE: f64 = 0.1;
pub const FORCE_BONUS_STRONG: f64 = 0.05;
pub const FORCE_BONUS_WEAK_ABOVE: f64 = 0.01;
pub const FORCE_BONUS_WEAK: f64 = 0.01;

/// Where the bad-reviewer labels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Rule-based classifier found at least one bad reviewer.
    Rules,
    /// Lower k-means cluster of neutral-preset scores.
    Clusters,
    /// Nobody labelled bad; bad-accuracy is not scored.
    None,
}

/// Per-reviewer labels, aligned with the reviewer slice they were built from.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    pub bad: Vec<bool>,
    pub good: Vec<bool>,
    pub source: LabelSource,
}

impl GroundTruth {
    /// Rule labels first; if nobody is bad, fall back to a 2-means split of
    /// neutral-preset scores when the centroids are more than 0.1 apart.
    /// If nobody is good, everyone not bad becomes good.
    pub fn bootstrap(reviewers: &[ReviewerMetrics]) -> Self {
        let mut bad: Vec<bool> = reviewers.iter().map(|r| identify_bad(r).is_bad).collect();
        let mut source = LabelSource::Rules;

        if !bad.iter().any(|b| *b) {
            let scores = score_all(reviewers, &NEUTRAL.weights, None);
            let km = k_means_1d(&scores, 2);
            match km.lowest_cluster() {
                Some(low) if km.separation() > CLUSTER_MIN_SEPARATION => {
                    bad = km.assignments.iter().map(|a| *a == low).collect();
                    source = LabelSource::Clusters;
                }
                _ => source = LabelSource::None,
            }
        }

        let mut good: Vec<bool> = reviewers
            .iter()
            .zip(&bad)
            .map(|(r, is_bad)| !is_bad && identify_good(r).is_good)
            .collect();
        if !good.iter().any(|g| *g) {
            good = bad.iter().map(|b| !b).collect();
        }

        Self { bad, good, source }
    }

    pub fn bad_count(&self) -> usize {
        self.bad.iter().filter(|b| **b).count()
    }

    pub fn good_count(&self) -> usize {
        self.good.iter().filter(|g| **g).count()
    }
}

/// Everything a single fitness evaluation needs besides the candidate.
#[derive(Debug, Clone)]
pub struct FitnessContext<'a> {
    pub reviewers: &'a [ReviewerMetrics],
    pub truth: &'a GroundTruth,
    /// Baseline formula scores, aligned with `reviewers`.
    pub baseline_scores: Option<&'a [f64]>,
    pub force_include: &'a [WeightKey],
}

/// Axis values plus the combined fitness.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessBreakdown {
    pub discrimination: f64,
    /// `None` when there are no bad labels.
    pub bad_reviewer_accuracy: Option<f64>,
    pub fairness: f64,
    /// `None` when no baseline scores were supplied.
    pub stability: Option<f64>,
    pub force_include_bonus: f64,
    /// Blend of the axes plus the bonus; may exceed 1.0.
    pub fitness: f64,
}

pub fn evaluate_formula_weights(ctx: &FitnessContext<'_>, weights: &FormulaWeights) -> FitnessBreakdown {
    if ctx.reviewers.is_empty() {
        return FitnessBreakdown::default();
    }
    let scores = score_all(ctx.reviewers, weights, None);
    let stats = calculate_stats(&scores);

    let discrimination = discrimination(stats.std_dev);
    let bad_reviewer_accuracy = bottom_n_accuracy(&scores, &ctx.truth.bad);
    let fairness = fairness(ctx.reviewers, &scores);
    let stability = ctx
        .baseline_scores
        .map(|base| calculate_correlation(&scores, base).max(0.0));

    let mut parts = vec![
        (BLEND_DISCRIMINATION, discrimination),
        (BLEND_FAIRNESS, fairness),
    ];
    if let Some(a) = bad_reviewer_accuracy {
        parts.push((BLEND_BAD_ACCURACY, a));
    }
    if let Some(s) = stability {
        parts.push((BLEND_STABILITY, s));
    }
    let total_weight: f64 = parts.iter().map(|(w, _)| w).sum();
    let blended = parts.iter().map(|(w, v)| w * v).sum::<f64>() / total_weight;

    let force_include_bonus = force_include_bonus(weights, ctx.force_include);

    FitnessBreakdown {
        discrimination,
        bad_reviewer_accuracy,
        fairness,
        stability,
        force_include_bonus,
        fitness: blended + force_include_bonus,
    }
}

/// Scalar fitness used by the optimizer's inner loop.
pub fn calculate_fitness(ctx: &FitnessContext<'_>, weights: &FormulaWeights) -> f64 {
    evaluate_formula_weights(ctx, weights).fitness
}

pub(crate) fn discrimination(std_dev: f64) -> f64 {
    (std_dev / DISCRIMINATION_STD_SCALE).min(1.0)
}

/// Share of bad-labelled reviewers among the N lowest scores, N = bad count.
/// Ties break by input order.
fn bottom_n_accuracy(scores: &[f64], bad: &[bool]) -> Option<f64> {
    let n = bad.iter().filter(|b| **b).count();
    if n == 0 {
        return None;
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let hits = order
        .iter()
        .take(n)
        .filter(|&&i| bad.get(i).copied().unwrap_or(false))
        .count();
    Some(hits as f64 / n as f64)
}

/// `max(0, 1 - |avg new-reviewer score - 0.5| / 0.25)`; 1.0 when nobody is new.
pub(crate) fn fairness(reviewers: &[ReviewerMetrics], scores: &[f64]) -> f64 {
    let new_scores: Vec<f64> = reviewers
        .iter()
        .zip(scores)
        .filter(|(r, _)| r.total_reviews < NEW_REVIEWER_MAX_REVIEWS)
        .map(|(_, s)| *s)
        .collect();
    if new_scores.is_empty() {
        return 1.0;
    }
    let avg = new_scores.iter().sum::<f64>() / new_scores.len() as f64;
    (1.0 - (avg - FAIRNESS_TARGET).abs() / FAIRNESS_TOLERANCE).max(0.0)
}

fn force_include_bonus(weights: &FormulaWeights, keys: &[WeightKey]) -> f64 {
    keys.iter()
        .map(|k| {
            let w = weights.get(*k);
            if w > FORCE_BONUS_STRONG_ABOVE {
                FORCE_BONUS_STRONG
            } else if w > FORCE_BONUS_WEAK_ABOVE {
                FORCE_BONUS_WEAK
            } else {
                0.0
            }
        })
        .sum()
}

/// Old vs new score for one reviewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDelta {
    pub id: String,
    pub username: String,
    pub baseline: f64,
    pub candidate: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineComparison {
    pub correlation: f64,
    pub mean_abs_delta: f64,
    pub deltas: Vec<ScoreDelta>,
}

/// Compare a candidate formula against a baseline preset, reviewer by reviewer.
pub fn compare_to_baseline(
    reviewers: &[ReviewerMetrics],
    candidate: &FormulaWeights,
    baseline: &crate::presets::FormulaDefinition,
) -> BaselineComparison {
    let new_scores = score_all(reviewers, candidate, None);
    let old_scores = score_all(reviewers, &baseline.weights, Some(&baseline.default_values));
    let deltas: Vec<ScoreDelta> = reviewers
        .iter()
        .zip(old_scores.iter().zip(&new_scores))
        .map(|(r, (old, new))| ScoreDelta {
            id: r.id.clone(),
            username: r.username.clone(),
            baseline: *old,
            candidate: *new,
            delta: new - old,
        })
        .collect();
    let mean_abs_delta = if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().map(|d| d.delta.abs()).sum::<f64>() / deltas.len() as f64
    };
    BaselineComparison {
        correlation: calculate_correlation(&old_scores, &new_scores),
        mean_abs_delta,
        deltas,
    }
}
