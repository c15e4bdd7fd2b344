//! Demo: build a seeded synthetic reviewer cohort and run the optimizer end to end.
//!
//! Usage: `synthetic_cohort [SIZE] [SEED]` (defaults 60, 42).

use reviewer_reliability::history::{build_all, MetricsParams, ReviewRecord, ReviewerHistory};
use reviewer_reliability::optimizer::{optimize_weights, OptimizationConfig};
use reviewer_reliability::presets::LEGACY_BASELINE;
use reviewer_reliability::rng::SeededRng;
use reviewer_reliability::{classify_reviewers, telemetry};
use reviewer_reliability::fitness::compare_to_baseline;

#[derive(Clone, Copy)]
enum Archetype {
    Veteran,
    Regular,
    Flaky,
    Newcomer,
}

fn pick(rng: &mut SeededRng) -> Archetype {
    match rng.next_f64() {
        x if x < 0.25 => Archetype::Veteran,
        x if x < 0.65 => Archetype::Regular,
        x if x < 0.85 => Archetype::Flaky,
        _ => Archetype::Newcomer,
    }
}

fn history(i: usize, a: Archetype, rng: &mut SeededRng) -> ReviewerHistory {
    // (reviews, late prob, xp noise, missed, penalty xp)
    let (n, late_p, noise, missed, penalty) = match a {
        Archetype::Veteran => (25 + rng.next_index(10), 0.03, 6.0, 0, 0.0),
        Archetype::Regular => (8 + rng.next_index(10), 0.12, 15.0, rng.next_index(2) as u32, 0.0),
        Archetype::Flaky => (6 + rng.next_index(8), 0.4, 35.0, 1 + rng.next_index(3) as u32, 10.0 * rng.next_index(4) as f64),
        Archetype::Newcomer => (rng.next_index(4), 0.1, 12.0, 0, 0.0),
    };
    let reviews = (0..n)
        .map(|_| {
            let consensus = 20.0 + 60.0 * rng.next_f64();
            let xp = consensus + noise * (rng.next_f64() * 2.0 - 1.0);
            let rated = rng.next_f64() < 0.6;
            ReviewRecord {
                xp_score: xp,
                late: rng.next_f64() < late_p,
                quality_rating: rated.then(|| 1.0 + (4.0 * (1.0 - noise / 40.0) + rng.next_f64()).min(4.0)),
                consensus_xp: Some(consensus),
            }
        })
        .collect();
    ReviewerHistory {
        id: format!("r{i:03}"),
        username: format!("reviewer{i}"),
        reviews,
        missed_reviews: missed,
        streak_weeks: rng.next_index(12) as u32,
        votes_validated: rng.next_index(8) as u32,
        votes_invalidated: rng.next_index(3) as u32,
        penalty_xp: penalty,
        ..Default::default()
    }
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing(false);

    let mut args = std::env::args().skip(1);
    let size: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(60);
    let seed: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    let mut rng = SeededRng::new(seed);
    let histories: Vec<ReviewerHistory> = (0..size)
        .map(|i| {
            let a = pick(&mut rng);
            history(i, a, &mut rng)
        })
        .collect();
    let reviewers = build_all(&histories, &MetricsParams::default());

    let (good, middle, bad) = classify_reviewers(&reviewers).counts();
    println!("cohort: {size} reviewers (good {good}, middle {middle}, bad {bad})");

    let cfg = OptimizationConfig {
        seed,
        ..OptimizationConfig::default()
    };
    let result = optimize_weights(&reviewers, &cfg);
    println!(
        "optimizer: {} generations, fitness {:.4}, early stop {}, labels {:?}",
        result.iterations, result.score, result.early_stopped, result.label_source
    );
    for (k, w) in result.weights.iter() {
        println!("  {k:<16} {w:.3}");
    }
    println!(
        "metrics: discrimination {:.3}, bad accuracy {:.3}, fairness {:.3}, spread {:.3}",
        result.metrics.discrimination,
        result.metrics.bad_reviewer_accuracy,
        result.metrics.fairness,
        result.metrics.spread
    );

    let cmp = compare_to_baseline(&reviewers, &result.weights, &LEGACY_BASELINE);
    println!(
        "vs {}: correlation {:.3}, mean |delta| {:.3}",
        LEGACY_BASELINE.id, cmp.correlation, cmp.mean_abs_delta
    );
    Ok(())
}
