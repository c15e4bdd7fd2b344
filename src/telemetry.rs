// src/telemetry.rs
//! Tracing setup for binaries and `metrics` series for the optimizer.
//!
//! The library only emits; installing a subscriber or a Prometheus recorder
//! is left to the binaries. Without a recorder every metric call is a no-op.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const RUNS_TOTAL: &str = "optimizer_runs_total";
pub const GENERATIONS_TOTAL: &str = "optimizer_generations_total";
pub const FITNESS_EVALUATIONS_TOTAL: &str = "optimizer_fitness_evaluations_total";
pub const EARLY_STOPS_TOTAL: &str = "optimizer_early_stops_total";
pub const BEST_FITNESS: &str = "optimizer_best_fitness";
pub const RUN_MS: &str = "optimizer_run_ms";

const DEFAULT_FILTER: &str = "reviewer_reliability=info,warn";

/// One-time metrics registration (so series carry descriptions on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(RUNS_TOTAL, "Completed weight optimizer runs.");
        describe_counter!(GENERATIONS_TOTAL, "Generations evolved across all runs.");
        describe_counter!(
            FITNESS_EVALUATIONS_TOTAL,
            "Candidate weight vectors scored against a reviewer population."
        );
        describe_counter!(
            EARLY_STOPS_TOTAL,
            "Runs stopped early on a fitness plateau."
        );
        describe_gauge!(BEST_FITNESS, "Best fitness of the most recent run.");
        describe_histogram!(RUN_MS, "Optimizer wall time in milliseconds.");
    });
}

/// Install a compact fmt subscriber. `RUST_LOG` overrides the default filter.
/// `json = true` switches to one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    // A second init (tests, embedding) is not an error worth failing on.
    let _ = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()
    };
}

/// Install a process-wide Prometheus recorder and return a render handle.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}
