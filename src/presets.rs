//! # Formula Presets
//!
//! Named, versioned bundles of weights plus missing-data defaults.
//! Presets are immutable constants; new ones get appended, existing ones are
//! never edited in place (historical scores must stay reproducible).

use crate::reviewer::{DefaultValues, FormulaWeights};
use serde::Serialize;

/// A named weight preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: u32,
    pub weights: FormulaWeights,
    #[serde(skip_serializing_if = "DefaultValues::is_empty")]
    pub default_values: DefaultValues,
}

const ZERO: FormulaWeights = FormulaWeights {
    timeliness: 0.0,
    quality: 0.0,
    accuracy: 0.0,
    vote_validation: 0.0,
    experience: 0.0,
    missed_penalty: 0.0,
    penalty_score: 0.0,
    review_variance: 0.0,
    late_percentage: 0.0,
};

/// Historical production formula. Reviewers without quality ratings are
/// scored as if they averaged 0.625 so their scores keep the old level.
pub const LEGACY_BASELINE: FormulaDefinition = FormulaDefinition {
    id: "legacy",
    name: "Legacy Baseline",
    description: "Timeliness and quality only; assumes 0.625 quality when unrated.",
    version: 1,
    weights: FormulaWeights {
        timeliness: 0.3,
        quality: 0.7,
        ..ZERO
    },
    default_values: DefaultValues {
        quality: Some(0.625),
        ..DefaultValues::NONE
    },
};

pub const CUSTOM_V1: FormulaDefinition = FormulaDefinition {
    id: "custom-v1",
    name: "Custom V1",
    description: "Adds consensus accuracy, experience and penalty signals.",
    version: 1,
    weights: FormulaWeights {
        timeliness: 0.25,
        quality: 0.20,
        accuracy: 0.20,
        vote_validation: 0.05,
        experience: 0.10,
        missed_penalty: 0.10,
        penalty_score: 0.10,
        ..ZERO
    },
    default_values: DefaultValues::NONE,
};

pub const CUSTOM_V2: FormulaDefinition = FormulaDefinition {
    id: "custom-v2",
    name: "Custom V2",
    description: "Accuracy-led blend with vote validation and score consistency.",
    version: 2,
    weights: FormulaWeights {
        timeliness: 0.15,
        quality: 0.15,
        accuracy: 0.25,
        vote_validation: 0.10,
        experience: 0.10,
        missed_penalty: 0.10,
        penalty_score: 0.10,
        review_variance: 0.05,
        late_percentage: 0.0,
    },
    default_values: DefaultValues::NONE,
};

/// Equal weight on every signal. Used to bootstrap cluster labels when the
/// rule-based classifier finds nobody bad.
pub const NEUTRAL: FormulaDefinition = FormulaDefinition {
    id: "neutral",
    name: "Neutral",
    description: "Equal weight on all nine signals.",
    version: 1,
    weights: FormulaWeights {
        timeliness: 1.0 / 9.0,
        quality: 1.0 / 9.0,
        accuracy: 1.0 / 9.0,
        vote_validation: 1.0 / 9.0,
        experience: 1.0 / 9.0,
        missed_penalty: 1.0 / 9.0,
        penalty_score: 1.0 / 9.0,
        review_variance: 1.0 / 9.0,
        late_percentage: 1.0 / 9.0,
    },
    default_values: DefaultValues::NONE,
};

/// All registered presets, oldest first.
pub fn all() -> [&'static FormulaDefinition; 4] {
    [&LEGACY_BASELINE, &CUSTOM_V1, &CUSTOM_V2, &NEUTRAL]
}

/// Look a preset up by id (case-insensitive).
pub fn find(id: &str) -> Option<&'static FormulaDefinition> {
    let id = id.trim();
    all().into_iter().find(|p| p.id.eq_ignore_ascii_case(id))
}
