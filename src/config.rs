// src/config.rs
//! Optimizer configuration from TOML, with env-var path and overrides.
//!
//! Resolution:
//! 1) $OPTIMIZER_CONFIG_PATH (must exist when set)
//! 2) config/optimizer.toml
//! 3) built-in defaults
//!
//! Then $OPTIMIZER_SEED / $OPTIMIZER_MAX_ITERATIONS / $OPTIMIZER_POPULATION_SIZE
//! override single fields; unparsable values are ignored.

use crate::optimizer::OptimizationConfig;
use crate::reviewer::WeightKey;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "OPTIMIZER_CONFIG_PATH";
pub const ENV_SEED: &str = "OPTIMIZER_SEED";
pub const ENV_MAX_ITERATIONS: &str = "OPTIMIZER_MAX_ITERATIONS";
pub const ENV_POPULATION_SIZE: &str = "OPTIMIZER_POPULATION_SIZE";
pub const DEFAULT_CONFIG_PATH: &str = "config/optimizer.toml";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    optimizer: RawOptimizer,
}

/// Same fields as `OptimizationConfig`, but force-include keys stay strings so
/// both `vote_validation` and `voteValidation` spellings are accepted.
#[derive(Debug, Default, Deserialize)]
struct RawOptimizer {
    max_iterations: Option<usize>,
    population_size: Option<usize>,
    mutation_rate: Option<f64>,
    elite_count: Option<usize>,
    target_bad_reviewer_accuracy: Option<f64>,
    seed: Option<u32>,
    #[serde(default)]
    force_include: Vec<String>,
}

impl RawOptimizer {
    fn into_config(self) -> Result<OptimizationConfig> {
        let d = OptimizationConfig::default();
        let force_include = self
            .force_include
            .iter()
            .map(|s| WeightKey::parse(s).ok_or_else(|| anyhow!("unknown weight key in force_include: {s}")))
            .collect::<Result<Vec<_>>>()?;

        let mut cfg = OptimizationConfig {
            max_iterations: self.max_iterations.unwrap_or(d.max_iterations),
            population_size: self.population_size.unwrap_or(d.population_size),
            mutation_rate: self.mutation_rate.unwrap_or(d.mutation_rate),
            elite_count: self.elite_count.unwrap_or(d.elite_count),
            target_bad_reviewer_accuracy: self
                .target_bad_reviewer_accuracy
                .unwrap_or(d.target_bad_reviewer_accuracy),
            seed: self.seed.unwrap_or(d.seed),
            force_include,
        };

        // Sanitize rates
        if !(0.0..=1.0).contains(&cfg.mutation_rate) {
            cfg.mutation_rate = d.mutation_rate;
        }
        if !(0.0..=1.0).contains(&cfg.target_bad_reviewer_accuracy) {
            cfg.target_bad_reviewer_accuracy = d.target_bad_reviewer_accuracy;
        }
        if cfg.population_size == 0 {
            cfg.population_size = d.population_size;
        }
        Ok(cfg)
    }
}

/// Parse a TOML document with an `[optimizer]` table.
pub fn parse_config(s: &str) -> Result<OptimizationConfig> {
    let file: ConfigFile = toml::from_str(s).context("parse optimizer TOML")?;
    file.optimizer.into_config()
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<OptimizationConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading optimizer config from {}", path.display()))?;
    parse_config(&content).with_context(|| format!("in {}", path.display()))
}

/// Load configuration using env var + fallbacks, then apply env overrides.
pub fn load_config_default() -> Result<OptimizationConfig> {
    let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_config_from(&pb)?
    } else {
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            load_config_from(&default_p)?
        } else {
            OptimizationConfig::default()
        }
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Override single fields from the environment.
pub fn apply_env_overrides(cfg: &mut OptimizationConfig) {
    if let Some(seed) = parse_env(ENV_SEED) {
        cfg.seed = seed;
    }
    if let Some(n) = parse_env(ENV_MAX_ITERATIONS) {
        cfg.max_iterations = n;
    }
    if let Some(n) = parse_env::<usize>(ENV_POPULATION_SIZE) {
        if n > 0 {
            cfg.population_size = n;
        }
    }
}
