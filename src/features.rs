//! Explainability views: per-cluster metric profiles and a metric correlation matrix.
//! Nothing here feeds back into scoring or optimization.

use crate::classifier::{identify_bad, identify_good};
use crate::fitness::LabelSource;
use crate::presets::NEUTRAL;
use crate::reviewer::{ReviewerMetrics, WeightKey};
use crate::scorer::score_all;
use crate::stats::{calculate_correlation, k_means_1d};
use serde::Serialize;

/// Mean and z-score of one metric inside one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCell {
    pub metric: WeightKey,
    pub mean: f64,
    /// `(cluster mean - global mean) / global std`; 0 when the metric is constant.
    pub z_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub label: String,
    pub size: usize,
    pub features: Vec<FeatureCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub metric: WeightKey,
    /// Variance of cluster means, normalised so all metrics sum to 1.
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMatrix {
    pub source: LabelSource,
    pub clusters: Vec<ClusterProfile>,
    pub importance: Vec<FeatureImportance>,
}

/// Group reviewers (rule tiers, or a 2-means split of neutral scores when the
/// rules yield fewer than two non-empty tiers) and profile every metric.
pub fn calculate_feature_matrix(reviewers: &[ReviewerMetrics]) -> FeatureMatrix {
    let (source, groups) = group_reviewers(reviewers);

    let global: Vec<(f64, f64)> = WeightKey::ALL
        .iter()
        .map(|k| mean_std(reviewers.iter().map(|r| r.value(*k))))
        .collect();

    let clusters: Vec<ClusterProfile> = groups
        .iter()
        .map(|(label, members)| ClusterProfile {
            label: label.clone(),
            size: members.len(),
            features: WeightKey::ALL
                .iter()
                .zip(&global)
                .map(|(k, (g_mean, g_std))| {
                    let (mean, _) = mean_std(members.iter().map(|&i| reviewers[i].value(*k)));
                    FeatureCell {
                        metric: *k,
                        mean,
                        z_score: if *g_std > 0.0 { (mean - g_mean) / g_std } else { 0.0 },
                    }
                })
                .collect(),
        })
        .collect();

    let raw_importance: Vec<f64> = (0..WeightKey::ALL.len())
        .map(|m| mean_std(clusters.iter().map(|c| c.features[m].mean)).1.powi(2))
        .collect();
    let total: f64 = raw_importance.iter().sum();
    let importance = WeightKey::ALL
        .iter()
        .zip(&raw_importance)
        .map(|(k, v)| FeatureImportance {
            metric: *k,
            importance: if total > 0.0 { v / total } else { 0.0 },
        })
        .collect();

    FeatureMatrix {
        source,
        clusters,
        importance,
    }
}

fn group_reviewers(reviewers: &[ReviewerMetrics]) -> (LabelSource, Vec<(String, Vec<usize>)>) {
    let mut bad = Vec::new();
    let mut middle = Vec::new();
    let mut good = Vec::new();
    for (i, r) in reviewers.iter().enumerate() {
        if identify_bad(r).is_bad {
            bad.push(i);
        } else if identify_good(r).is_good {
            good.push(i);
        } else {
            middle.push(i);
        }
    }
    let tiers: Vec<(String, Vec<usize>)> = [("bad", bad), ("middle", middle), ("good", good)]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(l, v)| (l.to_string(), v))
        .collect();
    if tiers.len() >= 2 || reviewers.is_empty() {
        return (LabelSource::Rules, tiers);
    }

    let scores = score_all(reviewers, &NEUTRAL.weights, None);
    let km = k_means_1d(&scores, 2);
    let low = km.lowest_cluster().unwrap_or(0);
    let mut low_members = Vec::new();
    let mut high_members = Vec::new();
    for (i, a) in km.assignments.iter().enumerate() {
        if *a == low {
            low_members.push(i);
        } else {
            high_members.push(i);
        }
    }
    let clusters: Vec<(String, Vec<usize>)> =
        [("low", low_members), ("high", high_members)]
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(l, v)| (l.to_string(), v))
            .collect();
    (LabelSource::Clusters, clusters)
}

fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let v: Vec<f64> = values.collect();
    if v.is_empty() {
        return (0.0, 0.0);
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Pairwise Pearson correlations across all nine metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub keys: [WeightKey; 9],
    pub values: [[f64; 9]; 9],
}

impl CorrelationMatrix {
    pub fn get(&self, a: WeightKey, b: WeightKey) -> f64 {
        self.values[a as usize][b as usize]
    }
}

pub fn calculate_correlation_matrix(reviewers: &[ReviewerMetrics]) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = WeightKey::ALL
        .iter()
        .map(|k| reviewers.iter().map(|r| r.value(*k)).collect())
        .collect();
    let mut values = [[0.0; 9]; 9];
    for i in 0..9 {
        for j in i..9 {
            let r = if i == j && !columns[i].is_empty() {
                1.0
            } else {
                calculate_correlation(&columns[i], &columns[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix {
        keys: WeightKey::ALL,
        values,
    }
}
