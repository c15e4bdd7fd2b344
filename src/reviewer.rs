//! # Reviewer Model
//!
//! Per-reviewer behavioral metrics and the closed set of formula weights.
//!
//! All normalized signals live in `[0.0, 1.0]` (higher = better). Raw counts
//! stay integers. A reviewer with no reviews carries a fixed cold-start vector
//! (see [`crate::history`]) so scoring never reads undefined values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel accuracy value meaning "no consensus data yet".
pub const ACCURACY_NO_DATA: f64 = 0.5;

/// One reviewer's derived metrics. Recomputed on demand, never persisted.
///
/// Fields missing from JSON input take their cold-start value (see
/// [`ReviewerMetrics::cold_start`]), not zero. `Default` stays all-zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default = "ReviewerMetrics::cold_start")]
pub struct ReviewerMetrics {
    // identity
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    // raw counts
    pub total_reviews: u32,
    pub late_reviews: u32,
    pub missed_reviews: u32,
    pub streak_weeks: u32,
    pub votes_validated: u32,
    pub votes_invalidated: u32,
    pub extreme_miss_count: u32,

    // normalized signals
    pub timeliness: f64,
    pub quality: f64,
    pub accuracy: f64,
    pub vote_validation: f64,
    pub experience: f64,
    pub missed_penalty: f64,
    pub penalty_score: f64,
    pub review_variance: f64,
    pub late_percentage: f64,

    // diagnostics
    pub avg_deviation: f64,
    pub avg_quality_rating: f64,
    pub extreme_miss_rate: f64,
}

impl ReviewerMetrics {
    /// Neutral vector for a reviewer with no reviews yet: no missed reviews,
    /// no penalties, and the 0.5 "no data" value on the other signals.
    pub fn cold_start() -> Self {
        Self {
            timeliness: 0.5,
            late_percentage: 0.5,
            quality: 0.5,
            accuracy: ACCURACY_NO_DATA,
            vote_validation: 0.5,
            experience: 0.0,
            missed_penalty: 1.0,
            penalty_score: 1.0,
            review_variance: 0.75,
            ..Default::default()
        }
    }

    /// Raw signal value backing a weight key.
    pub fn value(&self, key: WeightKey) -> f64 {
        match key {
            WeightKey::Timeliness => self.timeliness,
            WeightKey::Quality => self.quality,
            WeightKey::Accuracy => self.accuracy,
            WeightKey::VoteValidation => self.vote_validation,
            WeightKey::Experience => self.experience,
            WeightKey::MissedPenalty => self.missed_penalty,
            WeightKey::PenaltyScore => self.penalty_score,
            WeightKey::ReviewVariance => self.review_variance,
            WeightKey::LatePercentage => self.late_percentage,
        }
    }

    pub fn has_quality_data(&self) -> bool {
        self.avg_quality_rating > 0.0
    }

    /// Exact comparison against the sentinel: only an untouched 0.5 means "no data".
    #[allow(clippy::float_cmp)]
    pub fn has_accuracy_data(&self) -> bool {
        self.total_reviews > 0 && self.accuracy != ACCURACY_NO_DATA
    }

    pub fn has_vote_data(&self) -> bool {
        self.votes_validated > 0 || self.votes_invalidated > 0
    }

    /// Whether the reviewer has real data for `key`. Only quality, accuracy
    /// and vote validation can be absent; everything else always counts.
    pub fn has_data_for(&self, key: WeightKey) -> bool {
        match key {
            WeightKey::Quality => self.has_quality_data(),
            WeightKey::Accuracy => self.has_accuracy_data(),
            WeightKey::VoteValidation => self.has_vote_data(),
            _ => true,
        }
    }
}

/// Closed set of weight coefficients. Order here is the canonical iteration
/// order everywhere (scoring, random draws, matrices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightKey {
    Timeliness,
    Quality,
    Accuracy,
    VoteValidation,
    Experience,
    MissedPenalty,
    PenaltyScore,
    ReviewVariance,
    LatePercentage,
}

impl WeightKey {
    pub const ALL: [WeightKey; 9] = [
        WeightKey::Timeliness,
        WeightKey::Quality,
        WeightKey::Accuracy,
        WeightKey::VoteValidation,
        WeightKey::Experience,
        WeightKey::MissedPenalty,
        WeightKey::PenaltyScore,
        WeightKey::ReviewVariance,
        WeightKey::LatePercentage,
    ];

    /// Signals that may be missing for a reviewer (and get substituted or redistributed).
    pub const OPTIONAL: [WeightKey; 3] = [
        WeightKey::Quality,
        WeightKey::Accuracy,
        WeightKey::VoteValidation,
    ];

    /// Always part of the redistribution target set, even at zero nominal weight.
    pub const BASELINE_ACTIVE: [WeightKey; 3] = [
        WeightKey::Timeliness,
        WeightKey::Experience,
        WeightKey::PenaltyScore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WeightKey::Timeliness => "timeliness",
            WeightKey::Quality => "quality",
            WeightKey::Accuracy => "accuracy",
            WeightKey::VoteValidation => "voteValidation",
            WeightKey::Experience => "experience",
            WeightKey::MissedPenalty => "missedPenalty",
            WeightKey::PenaltyScore => "penaltyScore",
            WeightKey::ReviewVariance => "reviewVariance",
            WeightKey::LatePercentage => "latePercentage",
        }
    }

    /// Case-insensitive lookup accepting camelCase or snake_case names.
    pub fn parse(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        WeightKey::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == norm)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for WeightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The 9 named, non-negative weight coefficients.
///
/// Normalization routines keep them summing to 1.0 with no single weight
/// above the concentration cap; the type itself does not enforce that.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormulaWeights {
    pub timeliness: f64,
    pub quality: f64,
    pub accuracy: f64,
    pub vote_validation: f64,
    pub experience: f64,
    pub missed_penalty: f64,
    pub penalty_score: f64,
    pub review_variance: f64,
    pub late_percentage: f64,
}

impl FormulaWeights {
    /// Same weight on every key.
    pub fn uniform(w: f64) -> Self {
        Self::from_array([w; 9])
    }

    pub fn from_array(a: [f64; 9]) -> Self {
        Self {
            timeliness: a[0],
            quality: a[1],
            accuracy: a[2],
            vote_validation: a[3],
            experience: a[4],
            missed_penalty: a[5],
            penalty_score: a[6],
            review_variance: a[7],
            late_percentage: a[8],
        }
    }

    pub fn as_array(&self) -> [f64; 9] {
        [
            self.timeliness,
            self.quality,
            self.accuracy,
            self.vote_validation,
            self.experience,
            self.missed_penalty,
            self.penalty_score,
            self.review_variance,
            self.late_percentage,
        ]
    }

    pub fn get(&self, key: WeightKey) -> f64 {
        self.as_array()[key.index()]
    }

    pub fn set(&mut self, key: WeightKey, value: f64) {
        let slot = match key {
            WeightKey::Timeliness => &mut self.timeliness,
            WeightKey::Quality => &mut self.quality,
            WeightKey::Accuracy => &mut self.accuracy,
            WeightKey::VoteValidation => &mut self.vote_validation,
            WeightKey::Experience => &mut self.experience,
            WeightKey::MissedPenalty => &mut self.missed_penalty,
            WeightKey::PenaltyScore => &mut self.penalty_score,
            WeightKey::ReviewVariance => &mut self.review_variance,
            WeightKey::LatePercentage => &mut self.late_percentage,
        };
        *slot = value;
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// `(key, weight)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (WeightKey, f64)> + '_ {
        WeightKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

/// Substitute raw values for reviewers lacking data on a metric.
///
/// Only keys in [`WeightKey::OPTIONAL`] are ever consulted by the scorer; the
/// other fields exist so presets can be described with the full key set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeliness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_validation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missed_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_variance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub late_percentage: Option<f64>,
}

impl DefaultValues {
    pub const NONE: DefaultValues = DefaultValues {
        timeliness: None,
        quality: None,
        accuracy: None,
        vote_validation: None,
        experience: None,
        missed_penalty: None,
        penalty_score: None,
        review_variance: None,
        late_percentage: None,
    };

    pub fn get(&self, key: WeightKey) -> Option<f64> {
        match key {
            WeightKey::Timeliness => self.timeliness,
            WeightKey::Quality => self.quality,
            WeightKey::Accuracy => self.accuracy,
            WeightKey::VoteValidation => self.vote_validation,
            WeightKey::Experience => self.experience,
            WeightKey::MissedPenalty => self.missed_penalty,
            WeightKey::PenaltyScore => self.penalty_score,
            WeightKey::ReviewVariance => self.review_variance,
            WeightKey::LatePercentage => self.late_percentage,
        }
    }

    pub fn is_empty(&self) -> bool {
        WeightKey::ALL.into_iter().all(|k| self.get(k).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip_every_key() {
        let mut w = FormulaWeights::default();
        for (i, k) in WeightKey::ALL.into_iter().enumerate() {
            w.set(k, i as f64 / 10.0);
        }
        for (i, k) in WeightKey::ALL.into_iter().enumerate() {
            assert!((w.get(k) - i as f64 / 10.0).abs() < 1e-12, "key {k}");
        }
        assert!((w.sum() - 3.6).abs() < 1e-12);
    }

    #[test]
    fn key_parse_accepts_camel_and_snake() {
        assert_eq!(WeightKey::parse("voteValidation"), Some(WeightKey::VoteValidation));
        assert_eq!(WeightKey::parse("vote_validation"), Some(WeightKey::VoteValidation));
        assert_eq!(WeightKey::parse(" PENALTYSCORE "), Some(WeightKey::PenaltyScore));
        assert_eq!(WeightKey::parse("nope"), None);
    }

    #[test]
    fn has_data_predicates() {
        let mut m = ReviewerMetrics {
            total_reviews: 3,
            accuracy: 0.5,
            ..Default::default()
        };
        assert!(!m.has_quality_data());
        assert!(!m.has_accuracy_data(), "0.5 is the no-data sentinel");
        assert!(!m.has_vote_data());

        m.accuracy = 0.51;
        m.avg_quality_rating = 3.2;
        m.votes_invalidated = 1;
        assert!(m.has_accuracy_data());
        assert!(m.has_quality_data());
        assert!(m.has_vote_data());
        assert!(m.has_data_for(WeightKey::Timeliness));
    }

    #[test]
    fn metrics_json_uses_camel_case() {
        let m = ReviewerMetrics {
            id: "r1".into(),
            total_reviews: 4,
            vote_validation: 0.6,
            ..Default::default()
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["totalReviews"], serde_json::json!(4));
        assert!(v.get("email").is_none());
        let back: ReviewerMetrics = serde_json::from_value(v).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn missing_json_fields_take_cold_start_values() {
        let m: ReviewerMetrics = serde_json::from_str(r#"{"id":"x","experience":0.3}"#).unwrap();
        assert_eq!(m.id, "x");
        assert_eq!(m.total_reviews, 0);
        assert_eq!(m.experience, 0.3);
        assert_eq!(m.timeliness, 0.5);
        assert_eq!(m.missed_penalty, 1.0);
        assert_eq!(m.penalty_score, 1.0);
        assert_eq!(m.review_variance, 0.75);
        assert!(!m.has_accuracy_data());
    }
}
