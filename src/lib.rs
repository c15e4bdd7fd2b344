// src/lib.rs
// Public library surface for the CLI, the demo bin and integration tests.

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod features;
pub mod fitness;
pub mod history;
pub mod optimizer;
pub mod presets;
pub mod reviewer;
pub mod rng;
pub mod scorer;
pub mod stats;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::classifier::{classify_reviewers, identify_bad, identify_good};
pub use crate::features::{calculate_correlation_matrix, calculate_feature_matrix};
pub use crate::fitness::{calculate_fitness, evaluate_formula_weights};
pub use crate::optimizer::{optimize_weights, OptimizationConfig, OptimizationResult};
pub use crate::presets::FormulaDefinition;
pub use crate::reviewer::{DefaultValues, FormulaWeights, ReviewerMetrics, WeightKey};
pub use crate::scorer::{calculate_score, calculate_score_with_breakdown};
