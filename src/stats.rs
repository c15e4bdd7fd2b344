//! # Statistics
//! Small numeric helpers shared by the optimizer and the explainability layer:
//! summary stats with a 10-bucket histogram, Pearson correlation and 1-D k-means.
//!
//! Degenerate inputs (empty slices, zero variance) return neutral zeros, never NaN.

use serde::Serialize;

pub const HISTOGRAM_BUCKETS: usize = 10;
pub const KMEANS_MAX_ITERATIONS: usize = 100;

/// Summary of a score population.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Counts per `[0.0,0.1)`, `[0.1,0.2)`, ... `[0.9,1.0]`.
    pub distribution: [usize; HISTOGRAM_BUCKETS],
}

pub fn calculate_stats(scores: &[f64]) -> ScoreStats {
    if scores.is_empty() {
        return ScoreStats::default();
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut distribution = [0usize; HISTOGRAM_BUCKETS];
    for &s in scores {
        distribution[bucket(s)] += 1;
    }

    ScoreStats {
        mean,
        std_dev: variance.sqrt(),
        min,
        max,
        distribution,
    }
}

fn bucket(score: f64) -> usize {
    let b = (score.clamp(0.0, 1.0) * HISTOGRAM_BUCKETS as f64).floor();
    if b.is_finite() {
        (b as usize).min(HISTOGRAM_BUCKETS - 1)
    } else {
        0
    }
}

/// Pearson correlation. Uses the common prefix when lengths differ; returns 0
/// when either series has zero variance.
pub fn calculate_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = xs.iter().sum::<f64>() / n as f64;
    let my = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return 0.0;
    }
    let r = cov / (vx * vy).sqrt();
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Result of [`k_means_1d`]. `assignments[i]` indexes into `centroids`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct KMeansResult {
    pub centroids: Vec<f64>,
    pub assignments: Vec<usize>,
}

impl KMeansResult {
    /// Index of the cluster with the smallest centroid.
    pub fn lowest_cluster(&self) -> Option<usize> {
        self.centroids
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    /// Distance between the smallest and largest centroid.
    pub fn separation(&self) -> f64 {
        let lo = self.centroids.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.centroids.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if self.centroids.len() < 2 {
            0.0
        } else {
            hi - lo
        }
    }
}

/// Lloyd's algorithm in one dimension.
///
/// Centroids start evenly spaced from min to max, so the result is fully
/// deterministic. Ties go to the lower cluster index; an empty cluster keeps
/// its previous centroid.
pub fn k_means_1d(values: &[f64], k: usize) -> KMeansResult {
    if values.is_empty() || k == 0 {
        return KMeansResult::default();
    }
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut centroids: Vec<f64> = if k == 1 {
        vec![(lo + hi) / 2.0]
    } else {
        (0..k)
            .map(|i| lo + (hi - lo) * i as f64 / (k - 1) as f64)
            .collect()
    };
    let mut assignments = vec![0usize; values.len()];

    for iter in 0..KMEANS_MAX_ITERATIONS {
        let next: Vec<usize> = values.iter().map(|&v| nearest(&centroids, v)).collect();
        let changed = iter == 0 || next != assignments;
        assignments = next;

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&v, &a) in values.iter().zip(&assignments) {
            sums[a] += v;
            counts[a] += 1;
        }
        let updated: Vec<f64> = (0..k)
            .map(|j| {
                if counts[j] > 0 {
                    sums[j] / counts[j] as f64
                } else {
                    centroids[j]
                }
            })
            .collect();

        let moved = updated != centroids;
        centroids = updated;
        if !changed && !moved {
            break;
        }
    }

    KMeansResult {
        centroids,
        assignments,
    }
}

fn nearest(centroids: &[f64], v: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (j, c) in centroids.iter().enumerate() {
        let d = (v - c).abs();
        if d < best_d {
            best = j;
            best_d = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_basic_and_histogram() {
        let s = calculate_stats(&[0.05, 0.15, 0.15, 0.95, 1.0]);
        assert!((s.mean - 0.46).abs() < 1e-12);
        assert_eq!(s.min, 0.05);
        assert_eq!(s.max, 1.0);
        assert_eq!(s.distribution[0], 1);
        assert_eq!(s.distribution[1], 2);
        assert_eq!(s.distribution[9], 2, "1.0 lands in the last bucket");
        assert_eq!(s.distribution.iter().sum::<usize>(), 5);
    }

    #[test]
    fn stats_empty_is_zeroed() {
        let s = calculate_stats(&[]);
        assert_eq!(s, ScoreStats::default());
    }

    #[test]
    fn std_dev_is_population() {
        let s = calculate_stats(&[0.0, 1.0]);
        assert!((s.std_dev - 0.5).abs() < 1e-12);
    }

    #[test]
    fn correlation_perfect_and_inverse() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let zs = [4.0, 3.0, 2.0, 1.0];
        assert!((calculate_correlation(&xs, &ys) - 1.0).abs() < 1e-12);
        assert!((calculate_correlation(&xs, &zs) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_zero_variance_is_zero() {
        assert_eq!(calculate_correlation(&[0.3, 0.3, 0.3], &[0.1, 0.5, 0.9]), 0.0);
        assert_eq!(calculate_correlation(&[], &[]), 0.0);
    }

    #[test]
    fn kmeans_two_clear_groups() {
        let r = k_means_1d(&[0.1, 0.15, 0.8, 0.85, 0.9], 2);
        assert_eq!(r.centroids.len(), 2);
        assert!((r.centroids[0] - 0.125).abs() < 1e-9, "{:?}", r.centroids);
        assert!((r.centroids[1] - 0.85).abs() < 1e-9, "{:?}", r.centroids);
        assert_eq!(r.assignments, vec![0, 0, 1, 1, 1]);
        assert_eq!(r.lowest_cluster(), Some(0));
        assert!((r.separation() - 0.725).abs() < 1e-9);
    }

    #[test]
    fn kmeans_order_independent() {
        let a = k_means_1d(&[0.9, 0.1, 0.85, 0.15, 0.8], 2);
        let mut c = a.centroids.clone();
        c.sort_by(f64::total_cmp);
        assert!((c[0] - 0.125).abs() < 1e-9);
        assert!((c[1] - 0.85).abs() < 1e-9);
    }

    #[test]
    fn kmeans_identical_values_collapse() {
        let r = k_means_1d(&[0.4, 0.4, 0.4], 2);
        assert!(r.separation() < 1e-12);
        assert_eq!(r.assignments, vec![0, 0, 0]);
    }

    #[test]
    fn kmeans_degenerate_inputs() {
        assert_eq!(k_means_1d(&[], 2), KMeansResult::default());
        assert_eq!(k_means_1d(&[0.2], 0), KMeansResult::default());
    }
}
