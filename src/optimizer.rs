//! # Weight Optimizer
//!
//! Genetic search over the 9-key weight space.
//!
//! Flow: bootstrap labels → seed a random population → evolve (elitism,
//! crossover from the top tiers, sparse mutation) until the best fitness
//! plateaus or `max_iterations` is reached → report the winner with
//! diagnostics.
//!
//! Every candidate passes through [`normalize_and_cap`], which gates keys
//! with too little data coverage, floors at zero, caps each weight at 0.4 and
//! renormalises to a unit sum.
//!
//! Reproducible: all randomness comes from one [`SeededRng`] owned by the call.

use crate::fitness::{
    calculate_fitness, discrimination, fairness, FitnessContext, GroundTruth, LabelSource,
};
use crate::presets::LEGACY_BASELINE;
use crate::reviewer::{FormulaWeights, ReviewerMetrics, WeightKey};
use crate::rng::SeededRng;
use crate::scorer::score_all;
use crate::stats::calculate_stats;
use crate::telemetry;
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

// --- evolution constants ---
pub const MUTATION_PROBABILITY: f64 = 0.1;
pub const MUTATION_MAGNITUDE: f64 = 0.2;
pub const PARENT1_POOL: usize = 10;
pub const PARENT2_POOL: usize = 20;
pub const CONVERGENCE_MIN_GENERATION: usize = 20;
pub const CONVERGENCE_WINDOW: usize = 10;
pub const CONVERGENCE_EPSILON: f64 = 0.001;

// --- normalization constants ---
pub const MAX_WEIGHT: f64 = 0.4;
pub const FLEXIBLE_MIN_WEIGHT: f64 = 0.01;
pub const MIN_DATA_COVERAGE: f64 = 0.1;
pub const MIN_VOTE_DATA_COVERAGE: f64 = 0.05;
pub const CAP_PASSES: usize = 10;
pub const CAP_OVERAGE_EPSILON: f64 = 1e-6;

// --- final metrics ---
pub const SPREAD_SCALE: f64 = 0.5;

/// Optimizer settings. Every field has a default, so a partial JSON object is
/// a valid config. JSON uses camelCase like the result; the TOML file keeps
/// snake_case keys (see [`crate::config`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationConfig {
    pub max_iterations: usize,
    pub population_size: usize,
    /// Informational; per-gene mutation uses [`MUTATION_PROBABILITY`].
    pub mutation_rate: f64,
    pub elite_count: usize,
    /// Semantic target only, reported but not enforced.
    pub target_bad_reviewer_accuracy: f64,
    pub seed: u32,
    /// Keys exempt from the coverage gate and rewarded for staying weighted.
    pub force_include: Vec<WeightKey>,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            population_size: 50,
            mutation_rate: 0.15,
            elite_count: 5,
            target_bad_reviewer_accuracy: 0.7,
            seed: 42,
            force_include: Vec::new(),
        }
    }
}

/// Quality of the winning weights on the full population.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationMetrics {
    pub discrimination: f64,
    /// Measured against the bootstrapped labels: rule-classified bad
    /// reviewers, or the low k-means cluster when nobody fails the rules
    /// (`OptimizationResult::label_source` says which). 0 with no labels.
    pub bad_reviewer_accuracy: f64,
    pub fairness: f64,
    pub spread: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub weights: FormulaWeights,
    /// Best fitness, clamped to 1.0.
    pub score: f64,
    pub iterations: usize,
    /// Best raw fitness per generation; may exceed 1.0 with force-include bonuses.
    pub convergence_history: Vec<f64>,
    pub metrics: OptimizationMetrics,
    pub label_source: LabelSource,
    pub bad_reviewer_count: usize,
    /// Good labels after bootstrapping (everyone not bad when no rule-good reviewer exists).
    pub good_reviewer_count: usize,
    pub early_stopped: bool,
}

/// Share of reviewers with real data, per key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataCoverage {
    fractions: [f64; 9],
}

impl DataCoverage {
    pub fn from_reviewers(reviewers: &[ReviewerMetrics]) -> Self {
        let n = reviewers.len();
        let fractions = WeightKey::ALL.map(|k| {
            if !WeightKey::OPTIONAL.contains(&k) {
                1.0
            } else if n == 0 {
                0.0
            } else {
                reviewers.iter().filter(|r| r.has_data_for(k)).count() as f64 / n as f64
            }
        });
        Self { fractions }
    }

    pub fn fraction(&self, key: WeightKey) -> f64 {
        self.fractions[key as usize]
    }

    fn is_available(&self, key: WeightKey) -> bool {
        let min = if key == WeightKey::VoteValidation {
            MIN_VOTE_DATA_COVERAGE
        } else {
            MIN_DATA_COVERAGE
        };
        self.fraction(key) >= min
    }
}

/// Turn a raw weight draft into a valid weight vector.
///
/// 1. Zero keys below the coverage threshold unless force-included.
/// 2. Floor at zero.
/// 3. Up to [`CAP_PASSES`]: normalise, cap at [`MAX_WEIGHT`], hand the overage
///    to flexible keys (strictly between 0.01 and the cap). With no flexible
///    key left the overage goes to any eligible key under the cap.
/// 4. Renormalise once more.
///
/// An all-zero draft stays all-zero (every reviewer then scores 0).
pub fn normalize_and_cap(
    raw: &FormulaWeights,
    coverage: &DataCoverage,
    force_include: &[WeightKey],
) -> FormulaWeights {
    let mut w = [0.0f64; 9];
    let mut eligible = [false; 9];
    for k in WeightKey::ALL {
        let i = k as usize;
        eligible[i] = force_include.contains(&k) || coverage.is_available(k);
        let v = raw.get(k);
        w[i] = if eligible[i] && v.is_finite() { v.max(0.0) } else { 0.0 };
    }

    for _ in 0..CAP_PASSES {
        let sum: f64 = w.iter().sum();
        if sum <= 0.0 {
            break;
        }
        for v in w.iter_mut() {
            *v /= sum;
        }

        let mut overage = 0.0;
        for v in w.iter_mut() {
            if *v > MAX_WEIGHT {
                overage += *v - MAX_WEIGHT;
                *v = MAX_WEIGHT;
            }
        }
        if overage <= CAP_OVERAGE_EPSILON {
            break;
        }

        let mut absorbers: Vec<usize> = (0..9)
            .filter(|&i| w[i] > FLEXIBLE_MIN_WEIGHT && w[i] < MAX_WEIGHT)
            .collect();
        if absorbers.is_empty() {
            absorbers = (0..9).filter(|&i| eligible[i] && w[i] < MAX_WEIGHT).collect();
        }
        if absorbers.is_empty() {
            break;
        }
        let share = overage / absorbers.len() as f64;
        for i in absorbers {
            w[i] += share;
        }
    }

    let sum: f64 = w.iter().sum();
    let divisor = if sum > 0.0 { sum } else { 1.0 };
    let mut w = w.map(|v| v / divisor);
    settle_at_cap(&mut w, &eligible);
    FormulaWeights::from_array(w)
}

/// A sub-epsilon overage left by the loop gets inflated by the final
/// renormalisation. Trim such keys back to the cap and hand the excess to the
/// eligible keys in proportion to their headroom, so none of them crosses it.
fn settle_at_cap(w: &mut [f64; 9], eligible: &[bool; 9]) {
    let excess: f64 = w.iter().map(|v| (v - MAX_WEIGHT).max(0.0)).sum();
    if excess <= 0.0 {
        return;
    }
    let headroom: f64 = (0..9)
        .filter(|&i| eligible[i] && w[i] < MAX_WEIGHT)
        .map(|i| MAX_WEIGHT - w[i])
        .sum();
    if headroom <= excess {
        return;
    }
    let scale = excess / headroom;
    for i in 0..9 {
        if w[i] > MAX_WEIGHT {
            w[i] = MAX_WEIGHT;
        } else if eligible[i] && w[i] < MAX_WEIGHT {
            w[i] += (MAX_WEIGHT - w[i]) * scale;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Individual {
    weights: FormulaWeights,
    fitness: f64,
}

/// Everything fixed for the duration of one run.
struct Evolution<'a> {
    ctx: FitnessContext<'a>,
    coverage: DataCoverage,
    evaluations: u64,
}

impl Evolution<'_> {
    fn individual(&mut self, raw: &FormulaWeights) -> Individual {
        let weights = normalize_and_cap(raw, &self.coverage, self.ctx.force_include);
        self.evaluations += 1;
        Individual {
            weights,
            fitness: calculate_fitness(&self.ctx, &weights),
        }
    }

    fn random(&mut self, rng: &mut SeededRng) -> Individual {
        let raw = FormulaWeights::from_array(WeightKey::ALL.map(|_| rng.next_f64()));
        self.individual(&raw)
    }

    fn child(&mut self, rng: &mut SeededRng, p1: &FormulaWeights, p2: &FormulaWeights) -> Individual {
        let mut raw = FormulaWeights::default();
        for k in WeightKey::ALL {
            let blend = rng.next_f64();
            let mut v = p1.get(k) * blend + p2.get(k) * (1.0 - blend);
            if rng.next_f64() < MUTATION_PROBABILITY {
                v += (rng.next_f64() - 0.5) * MUTATION_MAGNITUDE;
            }
            raw.set(k, v);
        }
        self.individual(&raw)
    }
}

fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

/// Run the genetic search. Pure: same reviewers + same config ⇒ same result.
pub fn optimize_weights(reviewers: &[ReviewerMetrics], config: &OptimizationConfig) -> OptimizationResult {
    telemetry::ensure_metrics_described();
    let started = Instant::now();

    if reviewers.is_empty() {
        warn!(target: "optimizer", "empty reviewer population; fitness will be 0 for every candidate");
    }

    let truth = GroundTruth::bootstrap(reviewers);
    let baseline = score_all(reviewers, &LEGACY_BASELINE.weights, Some(&LEGACY_BASELINE.default_values));
    debug!(
        target: "optimizer",
        bad = truth.bad_count(),
        good = truth.good_count(),
        source = ?truth.source,
        "labels bootstrapped"
    );

    let population_size = config.population_size.max(1);
    let elite_count = config.elite_count.min(population_size);
    let mut rng = SeededRng::new(config.seed);
    let mut evo = Evolution {
        ctx: FitnessContext {
            reviewers,
            truth: &truth,
            baseline_scores: Some(baseline.as_slice()),
            force_include: &config.force_include,
        },
        coverage: DataCoverage::from_reviewers(reviewers),
        evaluations: 0,
    };

    let mut population: Vec<Individual> = (0..population_size).map(|_| evo.random(&mut rng)).collect();
    let mut history: Vec<f64> = Vec::with_capacity(config.max_iterations);
    let mut early_stopped = false;

    for generation in 0..config.max_iterations {
        sort_by_fitness(&mut population);
        history.push(population[0].fitness);
        debug!(target: "optimizer", generation, best = population[0].fitness, "generation evaluated");

        if generation >= CONVERGENCE_MIN_GENERATION
            && history[generation] - history[generation - CONVERGENCE_WINDOW] < CONVERGENCE_EPSILON
        {
            early_stopped = true;
            break;
        }

        let mut next: Vec<Individual> = population[..elite_count].to_vec();
        let pool1 = population.len().min(PARENT1_POOL);
        let pool2 = population.len().min(PARENT2_POOL);
        while next.len() < population_size {
            let p1 = population[rng.next_index(pool1)].weights;
            let p2 = population[rng.next_index(pool2)].weights;
            next.push(evo.child(&mut rng, &p1, &p2));
        }
        population = next;
    }

    sort_by_fitness(&mut population);
    let best = population[0];
    let metrics = final_metrics(reviewers, &truth, &best.weights);

    if best.weights.sum() <= 0.0 {
        warn!(target: "optimizer", "best weight vector is all zero; every reviewer scores 0");
    }

    let iterations = history.len();
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    counter!(telemetry::RUNS_TOTAL).increment(1);
    counter!(telemetry::GENERATIONS_TOTAL).increment(iterations as u64);
    counter!(telemetry::FITNESS_EVALUATIONS_TOTAL).increment(evo.evaluations);
    if early_stopped {
        counter!(telemetry::EARLY_STOPS_TOTAL).increment(1);
    }
    gauge!(telemetry::BEST_FITNESS).set(best.fitness);
    histogram!(telemetry::RUN_MS).record(elapsed_ms);

    info!(
        target: "optimizer",
        reviewers = reviewers.len(),
        iterations,
        early_stopped,
        fitness = best.fitness,
        bad_accuracy = metrics.bad_reviewer_accuracy,
        target_bad_accuracy = config.target_bad_reviewer_accuracy,
        elapsed_ms,
        "optimization finished"
    );

    OptimizationResult {
        weights: best.weights,
        score: best.fitness.min(1.0),
        iterations,
        convergence_history: history,
        metrics,
        label_source: truth.source,
        bad_reviewer_count: truth.bad_count(),
        good_reviewer_count: truth.good_count(),
        early_stopped,
    }
}

/// Diagnostics for the winner: bad reviewers at or below the bottom-N
/// threshold, spread, fairness.
fn final_metrics(reviewers: &[ReviewerMetrics], truth: &GroundTruth, weights: &FormulaWeights) -> OptimizationMetrics {
    let scores = score_all(reviewers, weights, None);
    let stats = calculate_stats(&scores);

    let n_bad = truth.bad_count();
    let bad_reviewer_accuracy = if n_bad == 0 || scores.is_empty() {
        0.0
    } else {
        let mut sorted = scores.clone();
        sorted.sort_by(f64::total_cmp);
        let threshold = sorted[(n_bad - 1).min(sorted.len() - 1)];
        let caught = scores
            .iter()
            .zip(&truth.bad)
            .filter(|(s, bad)| **bad && **s <= threshold)
            .count();
        (caught as f64 / n_bad as f64).min(1.0)
    };

    OptimizationMetrics {
        discrimination: discrimination(stats.std_dev),
        bad_reviewer_accuracy,
        fairness: if scores.is_empty() { 0.0 } else { fairness(reviewers, &scores) },
        spread: (stats.max - stats.min) / SPREAD_SCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_coverage() -> DataCoverage {
        DataCoverage {
            fractions: [1.0; 9],
        }
    }

    fn assert_valid(w: &FormulaWeights) {
        assert!((w.sum() - 1.0).abs() < 1e-9, "sum {} in {w:?}", w.sum());
        for (k, v) in w.iter() {
            assert!(v >= 0.0, "{k} negative");
            assert!(v <= MAX_WEIGHT + 1e-9, "{k} = {v} over cap");
        }
    }

    #[test]
    fn normalize_plain_draft() {
        let raw = FormulaWeights::uniform(3.0);
        let w = normalize_and_cap(&raw, &full_coverage(), &[]);
        assert_valid(&w);
        assert!((w.timeliness - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn single_dominant_weight_is_capped() {
        let raw = FormulaWeights {
            quality: 1.0,
            ..Default::default()
        };
        let w = normalize_and_cap(&raw, &full_coverage(), &[]);
        assert_valid(&w);
        assert!((w.quality - MAX_WEIGHT).abs() < 1e-9);
        // overage spread over the eight zero keys
        assert!((w.timeliness - 0.6 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn overage_prefers_flexible_keys() {
        let raw = FormulaWeights {
            quality: 0.9,
            accuracy: 0.1,
            timeliness: 0.1,
            ..Default::default()
        };
        let w = normalize_and_cap(&raw, &full_coverage(), &[]);
        assert_valid(&w);
        assert!((w.quality - 0.4).abs() < 1e-9);
        assert!((w.accuracy - 0.3).abs() < 1e-9);
        assert!((w.timeliness - 0.3).abs() < 1e-9);
        assert_eq!(w.experience, 0.0);
    }

    #[test]
    fn negative_and_nan_are_floored() {
        let raw = FormulaWeights {
            timeliness: -1.0,
            quality: f64::NAN,
            accuracy: 0.3,
            experience: 0.3,
            penalty_score: 0.3,
            ..Default::default()
        };
        let w = normalize_and_cap(&raw, &full_coverage(), &[]);
        assert_valid(&w);
        assert_eq!(w.timeliness, 0.0);
        assert_eq!(w.quality, 0.0);
    }

    #[test]
    fn residual_overage_is_settled_under_the_cap() {
        let mut w = [0.4 + 3e-7, 0.4, 0.05, 0.05, 0.05, 0.05 - 3e-7, 0.0, 0.0, 0.0];
        let eligible = [true, true, true, true, true, true, true, true, false];
        settle_at_cap(&mut w, &eligible);
        assert_eq!(w[0], MAX_WEIGHT);
        assert_eq!(w[1], MAX_WEIGHT);
        assert_eq!(w[8], 0.0);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|v| *v <= MAX_WEIGHT));
    }

    #[test]
    fn low_coverage_keys_are_gated_unless_forced() {
        let reviewers: Vec<ReviewerMetrics> = (0..20)
            .map(|i| ReviewerMetrics {
                id: format!("r{i}"),
                total_reviews: 10,
                accuracy: 0.5,
                // one reviewer in twenty has votes: 5% coverage
                votes_validated: u32::from(i == 0),
                ..Default::default()
            })
            .collect();
        let cov = DataCoverage::from_reviewers(&reviewers);
        assert_eq!(cov.fraction(WeightKey::Quality), 0.0);
        assert!((cov.fraction(WeightKey::VoteValidation) - 0.05).abs() < 1e-12);

        let raw = FormulaWeights::uniform(1.0);
        let w = normalize_and_cap(&raw, &cov, &[]);
        assert_valid(&w);
        assert_eq!(w.quality, 0.0);
        assert_eq!(w.accuracy, 0.0);
        assert!(w.vote_validation > 0.0, "5% meets the vote threshold");

        let forced = normalize_and_cap(&raw, &cov, &[WeightKey::Quality]);
        assert!(forced.quality > 0.0);
        assert_valid(&forced);
    }

    #[test]
    fn all_zero_draft_stays_zero() {
        let w = normalize_and_cap(&FormulaWeights::default(), &full_coverage(), &[]);
        assert_eq!(w, FormulaWeights::default());
        // Documented behaviour: such a vector scores everyone 0.
        let m = ReviewerMetrics {
            timeliness: 1.0,
            experience: 1.0,
            penalty_score: 1.0,
            ..Default::default()
        };
        assert_eq!(crate::scorer::calculate_score(&m, &w, None), 0.0);
    }

    #[test]
    fn default_config_matches_documented_values() {
        let c = OptimizationConfig::default();
        assert_eq!(c.max_iterations, 100);
        assert_eq!(c.population_size, 50);
        assert_eq!(c.elite_count, 5);
        assert_eq!(c.seed, 42);
        assert!((c.mutation_rate - 0.15).abs() < 1e-12);
        assert!((c.target_bad_reviewer_accuracy - 0.7).abs() < 1e-12);
    }

    #[test]
    fn partial_config_from_json() {
        let c: OptimizationConfig =
            serde_json::from_str(r#"{"seed": 7, "forceInclude": ["voteValidation"], "maxIterations": 12}"#).unwrap();
        assert_eq!(c.seed, 7);
        assert_eq!(c.force_include, vec![WeightKey::VoteValidation]);
        assert_eq!(c.max_iterations, 12);
        assert_eq!(c.population_size, 50);
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["populationSize"], serde_json::json!(50));
    }

    fn on_time(timeliness: f64, total_reviews: u32) -> ReviewerMetrics {
        ReviewerMetrics {
            timeliness,
            total_reviews,
            ..Default::default()
        }
    }

    #[test]
    fn final_metrics_counts_ties_at_the_threshold() {
        // timeliness-only weights: score == timeliness
        let weights = FormulaWeights {
            timeliness: 1.0,
            ..Default::default()
        };
        let rs = vec![on_time(0.1, 10), on_time(0.3, 10), on_time(0.3, 2), on_time(0.9, 10)];
        let truth = GroundTruth {
            bad: vec![true, false, true, true],
            good: vec![false, true, false, false],
            source: LabelSource::Rules,
        };
        let m = final_metrics(&rs, &truth, &weights);

        // threshold = 3rd lowest = 0.3; both 0.1 and the tied 0.3 count, 0.9 does not
        assert!((m.bad_reviewer_accuracy - 2.0 / 3.0).abs() < 1e-12);
        // std 0.3 / 0.2 = 1.5, capped
        assert_eq!(m.discrimination, 1.0);
        assert!((m.spread - 1.6).abs() < 1e-12);
        // the only new reviewer scores 0.3: 1 - 0.2 / 0.25
        assert!((m.fairness - 0.2).abs() < 1e-12);
    }

    #[test]
    fn final_metrics_without_labels_or_newcomers() {
        let weights = FormulaWeights {
            timeliness: 1.0,
            ..Default::default()
        };
        let rs = vec![on_time(0.45, 10), on_time(0.55, 10)];
        let truth = GroundTruth {
            bad: vec![false, false],
            good: vec![true, true],
            source: LabelSource::None,
        };
        let m = final_metrics(&rs, &truth, &weights);
        assert_eq!(m.bad_reviewer_accuracy, 0.0);
        assert!((m.discrimination - 0.25).abs() < 1e-12);
        assert!((m.spread - 0.2).abs() < 1e-12);
        assert_eq!(m.fairness, 1.0);
    }

    #[test]
    fn final_accuracy_uses_cluster_labels_when_rules_find_nobody() {
        let profile = |id: &str, low: f64, timeliness: f64| ReviewerMetrics {
            id: id.into(),
            total_reviews: 3,
            avg_quality_rating: 3.0,
            votes_validated: 1,
            timeliness,
            late_percentage: timeliness,
            quality: low,
            accuracy: low,
            vote_validation: low,
            experience: low,
            review_variance: low,
            missed_penalty: 1.0,
            penalty_score: 1.0,
            ..Default::default()
        };
        let rs = vec![
            profile("weak1", 0.2, 0.75),
            profile("strong1", 0.9, 0.9),
            profile("weak2", 0.2, 0.75),
            profile("strong2", 0.9, 0.9),
        ];
        let truth = GroundTruth::bootstrap(&rs);
        assert_eq!(truth.source, LabelSource::Clusters);
        assert_eq!(truth.bad, vec![true, false, true, false]);

        let m = final_metrics(&rs, &truth, &crate::presets::NEUTRAL.weights);
        assert_eq!(m.bad_reviewer_accuracy, 1.0);
    }

    #[test]
    fn empty_population_still_returns_valid_shape() {
        let cfg = OptimizationConfig {
            max_iterations: 30,
            population_size: 8,
            ..Default::default()
        };
        let r = optimize_weights(&[], &cfg);
        assert!(r.iterations >= 1);
        assert!(r.convergence_history.iter().all(|f| *f == 0.0));
        assert_eq!(r.label_source, LabelSource::None);
        assert_eq!(r.metrics, OptimizationMetrics::default());
        assert!(r.early_stopped, "flat history plateaus after generation 20");
    }
}
