// src/dataset.rs
//! Reviewer population loading. Tolerant JSON shapes:
//! - bare array of metrics: `[{...}, ...]`
//! - wrapped metrics: `{ "reviewers": [...] }`
//! - raw histories: `{ "histories": [...] }` (derived through [`crate::history`])

use crate::history::{build_all, MetricsParams, ReviewerHistory};
use crate::reviewer::ReviewerMetrics;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatasetAny {
    Bare(Vec<ReviewerMetrics>),
    Wrapped { reviewers: Vec<ReviewerMetrics> },
    Histories {
        histories: Vec<ReviewerHistory>,
        #[serde(default)]
        params: Option<MetricsParams>,
    },
}

/// Parse a dataset from a JSON string.
pub fn parse_reviewers(json: &str) -> Result<Vec<ReviewerMetrics>> {
    let trimmed = json.trim();
    if trimmed.is_empty() || trimmed == "null" {
        anyhow::bail!("dataset is empty");
    }
    let any: DatasetAny = serde_json::from_str(trimmed).context("parse reviewer dataset JSON")?;
    Ok(match any {
        DatasetAny::Bare(v) | DatasetAny::Wrapped { reviewers: v } => v,
        DatasetAny::Histories { histories, params } => {
            build_all(&histories, &params.unwrap_or_default())
        }
    })
}

/// Load a dataset from a JSON file.
pub fn load_reviewers(path: &Path) -> Result<Vec<ReviewerMetrics>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading reviewers from {}", path.display()))?;
    parse_reviewers(&content).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_wrapped() {
        let bare = r#"[{"id":"a","totalReviews":3,"timeliness":0.9}]"#;
        let wrapped = r#"{"reviewers":[{"id":"a","totalReviews":3,"timeliness":0.9}]}"#;
        let a = parse_reviewers(bare).unwrap();
        let b = parse_reviewers(wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].total_reviews, 3);
    }

    #[test]
    fn histories_are_derived() {
        let json = r#"{"histories":[{"id":"h","reviews":[{"xpScore":10,"late":true}]}]}"#;
        let v = parse_reviewers(json).unwrap();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].late_reviews, 1);
        assert_eq!(v[0].timeliness, 0.0);
    }

    #[test]
    fn history_params_use_camel_case() {
        let json = r#"{"params":{"experienceCap":4},"histories":[{"id":"h","reviews":[{"xpScore":10},{"xpScore":10}]}]}"#;
        let v = parse_reviewers(json).unwrap();
        assert!((v[0].experience - 0.5).abs() < 1e-12);
    }

    #[test]
    fn sparse_record_is_a_neutral_newcomer() {
        use crate::classifier::identify_bad;
        use crate::presets::LEGACY_BASELINE;
        use crate::scorer::calculate_score;

        let v = parse_reviewers(r#"[{"id":"x","username":"newbie"}]"#).unwrap();
        let m = &v[0];
        assert_eq!(m.total_reviews, 0);
        assert_eq!(m.missed_penalty, 1.0);
        assert_eq!(m.penalty_score, 1.0);

        let verdict = identify_bad(m);
        assert!(!verdict.is_bad, "{:?}", verdict.reasons);
        let s = calculate_score(m, &LEGACY_BASELINE.weights, Some(&LEGACY_BASELINE.default_values));
        assert!((s - 0.5875).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(parse_reviewers("  ").is_err());
        assert!(parse_reviewers("null").is_err());
        assert!(parse_reviewers(r#"{"foo": 1}"#).is_err());
    }
}
