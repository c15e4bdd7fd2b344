//! # Reviewer Classifier
//! Hand-authored heuristics sorting reviewers into bad / middle / good tiers.
//! Serves as ground truth for the optimizer when nothing better exists.
//!
//! Bad: any hard fail (missed reviews, admin penalties), or at least two soft
//! fails (late reviews, poor consensus accuracy on an established reviewer).
//! Good: passes every core gate and shows at least one strength.

use crate::reviewer::ReviewerMetrics;
use serde::Serialize;

// hard fails
pub const BAD_MISSED_PENALTY_BELOW: f64 = 0.75;
pub const BAD_PENALTY_SCORE_BELOW: f64 = 0.80;
// soft fails
pub const BAD_TIMELINESS_BELOW: f64 = 0.70;
pub const BAD_ACCURACY_BELOW: f64 = 0.50;
pub const BAD_ACCURACY_MIN_REVIEWS: u32 = 5;
pub const BAD_SOFT_FAILS_REQUIRED: usize = 2;

// core gate
pub const GOOD_EXPERIENCE_MIN: f64 = 0.50;
pub const GOOD_MISSED_PENALTY_MIN: f64 = 0.90;
pub const GOOD_PENALTY_SCORE_MIN: f64 = 0.90;
pub const GOOD_TIMELINESS_MIN: f64 = 0.85;
// strengths
pub const GOOD_VETERAN_EXPERIENCE: f64 = 1.0;
pub const GOOD_EXCELLENT_TIMELINESS: f64 = 0.95;
pub const GOOD_HIGH_ACCURACY: f64 = 0.70;
pub const GOOD_SOLID_ACCURACY: f64 = 0.65;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadVerdict {
    pub is_bad: bool,
    /// Conditions that made the reviewer bad; empty when not bad.
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoodVerdict {
    pub is_good: bool,
    /// Strengths found; empty when the core gate fails.
    pub strengths: Vec<String>,
}

pub fn identify_bad(r: &ReviewerMetrics) -> BadVerdict {
    let mut hard = Vec::new();
    if r.missed_penalty < BAD_MISSED_PENALTY_BELOW {
        hard.push(format!(
            "missed reviews: missedPenalty {:.2} < {:.2}",
            r.missed_penalty, BAD_MISSED_PENALTY_BELOW
        ));
    }
    if r.penalty_score < BAD_PENALTY_SCORE_BELOW {
        hard.push(format!(
            "admin penalties: penaltyScore {:.2} < {:.2}",
            r.penalty_score, BAD_PENALTY_SCORE_BELOW
        ));
    }
    if !hard.is_empty() {
        return BadVerdict {
            is_bad: true,
            reasons: hard,
        };
    }

    let mut soft = Vec::new();
    if r.timeliness < BAD_TIMELINESS_BELOW {
        soft.push(format!(
            "frequently late: timeliness {:.2} < {:.2}",
            r.timeliness, BAD_TIMELINESS_BELOW
        ));
    }
    if r.accuracy < BAD_ACCURACY_BELOW && r.total_reviews > BAD_ACCURACY_MIN_REVIEWS {
        soft.push(format!(
            "far from consensus: accuracy {:.2} < {:.2} over {} reviews",
            r.accuracy, BAD_ACCURACY_BELOW, r.total_reviews
        ));
    }

    if soft.len() >= BAD_SOFT_FAILS_REQUIRED {
        BadVerdict {
            is_bad: true,
            reasons: soft,
        }
    } else {
        BadVerdict {
            is_bad: false,
            reasons: Vec::new(),
        }
    }
}

pub fn identify_good(r: &ReviewerMetrics) -> GoodVerdict {
    let core = r.experience >= GOOD_EXPERIENCE_MIN
        && r.missed_penalty >= GOOD_MISSED_PENALTY_MIN
        && r.penalty_score >= GOOD_PENALTY_SCORE_MIN
        && r.timeliness >= GOOD_TIMELINESS_MIN;
    if !core {
        return GoodVerdict {
            is_good: false,
            strengths: Vec::new(),
        };
    }

    let mut strengths = Vec::new();
    if r.experience >= GOOD_VETERAN_EXPERIENCE {
        strengths.push("veteran reviewer".to_string());
    }
    if r.timeliness >= GOOD_EXCELLENT_TIMELINESS {
        strengths.push(format!("excellent timeliness ({:.2})", r.timeliness));
    }
    if r.accuracy >= GOOD_HIGH_ACCURACY {
        strengths.push(format!("high accuracy ({:.2})", r.accuracy));
    } else if r.accuracy >= GOOD_SOLID_ACCURACY {
        strengths.push(format!("solid accuracy ({:.2})", r.accuracy));
    }

    GoodVerdict {
        is_good: !strengths.is_empty(),
        strengths,
    }
}

/// Three-way partition; bad wins when both predicates match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification<'a> {
    pub good: Vec<&'a ReviewerMetrics>,
    pub middle: Vec<&'a ReviewerMetrics>,
    pub bad: Vec<&'a ReviewerMetrics>,
}

impl Classification<'_> {
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.good.len(), self.middle.len(), self.bad.len())
    }
}

pub fn classify_reviewers(list: &[ReviewerMetrics]) -> Classification<'_> {
    let mut out = Classification::default();
    for r in list {
        if identify_bad(r).is_bad {
            out.bad.push(r);
        } else if identify_good(r).is_good {
            out.good.push(r);
        } else {
            out.middle.push(r);
        }
    }
    out
}
