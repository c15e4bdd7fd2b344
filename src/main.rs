//! `reliability` CLI
//! Scores, classifies and optimizes a reviewer population loaded from a JSON
//! dataset. Results go to stdout as pretty JSON; logs go to stderr.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

use reviewer_reliability::config::{apply_env_overrides, load_config_default, load_config_from};
use reviewer_reliability::dataset::load_reviewers;
use reviewer_reliability::fitness::compare_to_baseline;
use reviewer_reliability::presets::{self, LEGACY_BASELINE};
use reviewer_reliability::stats::calculate_stats;
use reviewer_reliability::{
    calculate_correlation_matrix, calculate_feature_matrix, calculate_score_with_breakdown,
    classify_reviewers, identify_bad, identify_good, optimize_weights, telemetry, WeightKey,
};

#[derive(Parser, Debug)]
#[command(name = "reliability", about = "Reviewer reliability scoring and weight optimization", version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Install a Prometheus recorder and print the exposition text to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score every reviewer with a preset formula
    Score {
        /// Dataset JSON (metrics array, {"reviewers": ...} or {"histories": ...})
        input: PathBuf,
        /// Preset id (see `presets`)
        #[arg(short, long, default_value = "legacy")]
        preset: String,
        /// Include per-component contributions
        #[arg(long)]
        breakdown: bool,
    },
    /// Split reviewers into good / middle / bad with reasons
    Classify { input: PathBuf },
    /// Search for better weights with the genetic optimizer
    Optimize {
        input: PathBuf,
        /// Config file path (overrides $OPTIMIZER_CONFIG_PATH)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long)]
        max_iterations: Option<usize>,
        #[arg(long)]
        population_size: Option<usize>,
        /// Keys exempt from the coverage gate (comma separated)
        #[arg(long, value_delimiter = ',')]
        force_include: Vec<String>,
    },
    /// Per-cluster metric profiles and feature importance
    Features { input: PathBuf },
    /// Pairwise correlation of the nine metrics
    Correlations { input: PathBuf },
    /// List the registered formula presets
    Presets,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{s}");
    Ok(())
}

fn cmd_score(input: &Path, preset_id: &str, with_breakdown: bool) -> Result<()> {
    let preset = presets::find(preset_id).ok_or_else(|| anyhow!("unknown preset: {preset_id}"))?;
    let reviewers = load_reviewers(input)?;

    let rows: Vec<_> = reviewers
        .iter()
        .map(|r| {
            let b = calculate_score_with_breakdown(r, &preset.weights, Some(&preset.default_values));
            let mut row = json!({ "id": r.id, "username": r.username, "score": b.score });
            if with_breakdown {
                row["breakdown"] = json!(b.breakdown);
            }
            row
        })
        .collect();
    let scores: Vec<f64> = rows.iter().filter_map(|r| r["score"].as_f64()).collect();

    info!(preset = preset.id, reviewers = reviewers.len(), "scored");
    print_json(&json!({
        "preset": preset.id,
        "stats": calculate_stats(&scores),
        "reviewers": rows,
    }))
}

fn cmd_classify(input: &Path) -> Result<()> {
    let reviewers = load_reviewers(input)?;
    let classification = classify_reviewers(&reviewers);
    let (good, middle, bad) = classification.counts();

    let rows: Vec<_> = reviewers
        .iter()
        .map(|r| {
            let b = identify_bad(r);
            let g = identify_good(r);
            let tier = if b.is_bad {
                "bad"
            } else if g.is_good {
                "good"
            } else {
                "middle"
            };
            json!({
                "id": r.id,
                "username": r.username,
                "tier": tier,
                "reasons": b.reasons,
                "strengths": g.strengths,
            })
        })
        .collect();

    info!(good, middle, bad, "classified");
    print_json(&json!({
        "counts": { "good": good, "middle": middle, "bad": bad },
        "reviewers": rows,
    }))
}

struct OptimizeArgs {
    config: Option<PathBuf>,
    seed: Option<u32>,
    max_iterations: Option<usize>,
    population_size: Option<usize>,
    force_include: Vec<String>,
}

fn cmd_optimize(input: &Path, args: OptimizeArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(p) => {
            let mut c = load_config_from(p)?;
            apply_env_overrides(&mut c);
            c
        }
        None => load_config_default()?,
    };
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(n) = args.max_iterations {
        cfg.max_iterations = n;
    }
    if let Some(n) = args.population_size {
        cfg.population_size = n.max(1);
    }
    for s in &args.force_include {
        let key = WeightKey::parse(s).ok_or_else(|| anyhow!("unknown weight key: {s}"))?;
        if !cfg.force_include.contains(&key) {
            cfg.force_include.push(key);
        }
    }

    let reviewers = load_reviewers(input)?;
    let result = optimize_weights(&reviewers, &cfg);
    let comparison = compare_to_baseline(&reviewers, &result.weights, &LEGACY_BASELINE);

    print_json(&json!({
        "generatedAt": Utc::now().to_rfc3339(),
        "config": cfg,
        "result": result,
        "baseline": LEGACY_BASELINE.id,
        "comparison": comparison,
    }))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Score {
            input,
            preset,
            breakdown,
        } => cmd_score(&input, &preset, breakdown),
        Commands::Classify { input } => cmd_classify(&input),
        Commands::Optimize {
            input,
            config,
            seed,
            max_iterations,
            population_size,
            force_include,
        } => cmd_optimize(
            &input,
            OptimizeArgs {
                config,
                seed,
                max_iterations,
                population_size,
                force_include,
            },
        ),
        Commands::Features { input } => {
            let reviewers = load_reviewers(&input)?;
            print_json(&calculate_feature_matrix(&reviewers))
        }
        Commands::Correlations { input } => {
            let reviewers = load_reviewers(&input)?;
            print_json(&calculate_correlation_matrix(&reviewers))
        }
        Commands::Presets => print_json(&presets::all()),
    }
}

fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs);

    let prometheus = if cli.metrics {
        Some(telemetry::install_prometheus()?)
    } else {
        None
    };

    run(cli)?;

    if let Some(handle) = prometheus {
        eprintln!("{}", handle.render());
    }
    Ok(())
}
