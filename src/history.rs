//! # Review History → Metrics
//!
//! In-memory metrics provider. Takes one reviewer's already-loaded review and
//! vote history and derives the normalized [`ReviewerMetrics`] view.
//!
//! Derivation (defaults in [`MetricsParams`]):
//! - timeliness     = 1 - late / total
//! - quality        = avg rating / scale max, or a neutral value when unrated
//! - accuracy       = 1 - avg |xp - consensus| / deviation scale, or 0.5 with no consensus data
//! - voteValidation = baseline + bonus·validated - penalty·invalidated
//! - experience     = total / cap
//! - missedPenalty  = 1 - 0.25·missed
//! - penaltyScore   = 1 - penalty XP / 100
//! - reviewVariance = 1 - stddev(xp) / max stddev
//!
//! Everything is clamped to `[0, 1]`. Zero reviews yields the cold-start vector.

use crate::reviewer::{ReviewerMetrics, ACCURACY_NO_DATA};
use serde::{Deserialize, Serialize};

/// One submitted review.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewRecord {
    /// XP the reviewer proposed.
    pub xp_score: f64,
    pub late: bool,
    /// Rating of the review itself, on the `1..=scale` range.
    pub quality_rating: Option<f64>,
    /// Final consensus XP of the submission, once settled.
    pub consensus_xp: Option<f64>,
}

/// Raw per-reviewer history, as handed over by the storage layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewerHistory {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub reviews: Vec<ReviewRecord>,
    pub missed_reviews: u32,
    pub streak_weeks: u32,
    pub votes_validated: u32,
    pub votes_invalidated: u32,
    /// Total XP deducted by admins.
    pub penalty_xp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsParams {
    pub experience_cap: u32,
    pub quality_scale_max: f64,
    pub neutral_quality: f64,
    pub accuracy_deviation_scale: f64,
    pub extreme_miss_threshold: f64,
    pub vote_baseline: f64,
    pub vote_bonus: f64,
    pub vote_penalty: f64,
    pub max_xp_std_dev: f64,
    pub missed_review_step: f64,
    pub penalty_xp_scale: f64,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            experience_cap: 20,
            quality_scale_max: 5.0,
            neutral_quality: 0.5,
            accuracy_deviation_scale: 50.0,
            extreme_miss_threshold: 30.0,
            vote_baseline: 0.5,
            vote_bonus: 0.05,
            vote_penalty: 0.1,
            max_xp_std_dev: 25.0,
            missed_review_step: 0.25,
            penalty_xp_scale: 100.0,
        }
    }
}

// cold-start vector
const COLD_NEUTRAL: f64 = 0.5;
const COLD_REVIEW_VARIANCE: f64 = 0.75;

fn clamp01(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

/// Derive metrics for one reviewer.
pub fn build_metrics(h: &ReviewerHistory, p: &MetricsParams) -> ReviewerMetrics {
    let total = h.reviews.len() as u32;
    let late = h.reviews.iter().filter(|r| r.late).count() as u32;

    let missed_penalty = clamp01(1.0 - p.missed_review_step * f64::from(h.missed_reviews));
    let penalty_score = clamp01(1.0 - h.penalty_xp / p.penalty_xp_scale.max(f64::EPSILON));

    let mut m = ReviewerMetrics {
        id: h.id.clone(),
        username: h.username.clone(),
        email: h.email.clone(),
        total_reviews: total,
        late_reviews: late,
        missed_reviews: h.missed_reviews,
        streak_weeks: h.streak_weeks,
        votes_validated: h.votes_validated,
        votes_invalidated: h.votes_invalidated,
        missed_penalty,
        penalty_score,
        ..Default::default()
    };

    if total == 0 {
        m.timeliness = COLD_NEUTRAL;
        m.late_percentage = COLD_NEUTRAL;
        m.quality = COLD_NEUTRAL;
        m.accuracy = ACCURACY_NO_DATA;
        m.vote_validation = COLD_NEUTRAL;
        m.experience = 0.0;
        m.review_variance = COLD_REVIEW_VARIANCE;
        return m;
    }

    m.timeliness = clamp01(1.0 - f64::from(late) / f64::from(total));
    m.late_percentage = m.timeliness;

    let ratings: Vec<f64> = h.reviews.iter().filter_map(|r| r.quality_rating).collect();
    match mean(&ratings) {
        Some(avg) => {
            m.avg_quality_rating = avg;
            m.quality = clamp01(avg / p.quality_scale_max.max(f64::EPSILON));
        }
        None => m.quality = p.neutral_quality,
    }

    let deviations: Vec<f64> = h
        .reviews
        .iter()
        .filter_map(|r| r.consensus_xp.map(|c| (r.xp_score - c).abs()))
        .collect();
    match mean(&deviations) {
        Some(avg) => {
            let extreme = deviations
                .iter()
                .filter(|d| **d > p.extreme_miss_threshold)
                .count() as u32;
            m.avg_deviation = avg;
            m.extreme_miss_count = extreme;
            m.extreme_miss_rate = f64::from(extreme) / deviations.len() as f64;
            m.accuracy = clamp01(1.0 - avg / p.accuracy_deviation_scale.max(f64::EPSILON));
        }
        None => m.accuracy = ACCURACY_NO_DATA,
    }

    m.vote_validation = clamp01(
        p.vote_baseline + p.vote_bonus * f64::from(h.votes_validated)
            - p.vote_penalty * f64::from(h.votes_invalidated),
    );

    m.experience = clamp01(f64::from(total) / f64::from(p.experience_cap.max(1)));

    let xps: Vec<f64> = h.reviews.iter().map(|r| r.xp_score).collect();
    let xp_mean = mean(&xps).unwrap_or(0.0);
    let xp_std = (xps.iter().map(|x| (x - xp_mean).powi(2)).sum::<f64>() / xps.len() as f64).sqrt();
    m.review_variance = clamp01(1.0 - xp_std / p.max_xp_std_dev.max(f64::EPSILON));

    m
}

/// Derive metrics for a whole population, preserving order.
pub fn build_all(histories: &[ReviewerHistory], p: &MetricsParams) -> Vec<ReviewerMetrics> {
    histories.iter().map(|h| build_metrics(h, p)).collect()
}
