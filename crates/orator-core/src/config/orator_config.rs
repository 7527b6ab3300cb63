//! Top-level Orator configuration with layered resolution.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ClusteringConfig, EvaluationConfig};
use crate::constants::{ENV_PREFIX, PROJECT_CONFIG_FILE};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`ORATOR_*`)
/// 2. Project config (`orator.toml` in the given root)
/// 3. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct OratorConfig {
    pub clustering: ClusteringConfig,
    pub evaluation: EvaluationConfig,
}

impl OratorConfig {
    /// Load configuration with layered resolution rooted at `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let project_config_path = root.join(PROJECT_CONFIG_FILE);
        if project_config_path.exists() {
            Self::merge_toml_file(&mut config, &project_config_path)?;
        }

        Self::apply_env_overrides(&mut config);

        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from a TOML string (for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &OratorConfig) -> Result<(), ConfigError> {
        if let Some(threshold) = config.clustering.distance_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ConfigError::ValidationFailed {
                    field: "clustering.distance_threshold".to_string(),
                    message: "must be a positive finite number".to_string(),
                });
            }
        }
        if let Some(steps) = config.clustering.max_agglomeration_steps {
            if steps == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: "clustering.max_agglomeration_steps".to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if let Some(density) = config.clustering.description_density_threshold {
            if !(0.0..=1.0).contains(&density) {
                return Err(ConfigError::ValidationFailed {
                    field: "clustering.description_density_threshold".to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        if let Some(ratio) = config.evaluation.similar_cluster_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::ValidationFailed {
                    field: "evaluation.similar_cluster_ratio".to_string(),
                    message: "must be in (0.0, 1.0]".to_string(),
                });
            }
        }
        if let Some(coefficient) = config.evaluation.correction_coefficient {
            if !coefficient.is_finite() || coefficient <= 0.0 {
                return Err(ConfigError::ValidationFailed {
                    field: "evaluation.correction_coefficient".to_string(),
                    message: "must be a positive finite number".to_string(),
                });
            }
        }
        if let Some(steps) = config.evaluation.max_correction_steps {
            if steps == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: "evaluation.max_correction_steps".to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        if let Some(budget) = config.evaluation.exhaustive_expansion_budget {
            if budget == 0 {
                return Err(ConfigError::ValidationFailed {
                    field: "evaluation.exhaustive_expansion_budget".to_string(),
                    message: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored (forward-compatible).
    fn merge_toml_file(config: &mut OratorConfig, path: &Path) -> Result<(), ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
                path: path.display().to_string(),
            })?;

        let file_config: OratorConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        Self::merge(config, &file_config);
        Ok(())
    }

    /// Merge `other` into `base`; `other` wins only where it has a value.
    fn merge(base: &mut OratorConfig, other: &OratorConfig) {
        // Clustering
        if other.clustering.distance_threshold.is_some() {
            base.clustering.distance_threshold = other.clustering.distance_threshold;
        }
        if other.clustering.seed.is_some() {
            base.clustering.seed = other.clustering.seed;
        }
        if other.clustering.max_agglomeration_steps.is_some() {
            base.clustering.max_agglomeration_steps = other.clustering.max_agglomeration_steps;
        }
        if other.clustering.description_density_threshold.is_some() {
            base.clustering.description_density_threshold =
                other.clustering.description_density_threshold;
        }

        // Evaluation
        if other.evaluation.similar_cluster_ratio.is_some() {
            base.evaluation.similar_cluster_ratio = other.evaluation.similar_cluster_ratio;
        }
        if other.evaluation.correction_coefficient.is_some() {
            base.evaluation.correction_coefficient = other.evaluation.correction_coefficient;
        }
        if other.evaluation.max_correction_steps.is_some() {
            base.evaluation.max_correction_steps = other.evaluation.max_correction_steps;
        }
        if other.evaluation.exhaustive_expansion_budget.is_some() {
            base.evaluation.exhaustive_expansion_budget =
                other.evaluation.exhaustive_expansion_budget;
        }
    }

    /// Apply `ORATOR_*` overrides. Unparseable values are ignored.
    fn apply_env_overrides(config: &mut OratorConfig) {
        let clustering = &mut config.clustering;
        clustering.distance_threshold =
            env_override("DISTANCE_THRESHOLD").or(clustering.distance_threshold);
        clustering.seed = env_override("SEED").or(clustering.seed);
        clustering.max_agglomeration_steps =
            env_override("MAX_AGGLOMERATION_STEPS").or(clustering.max_agglomeration_steps);
        clustering.description_density_threshold = env_override("DESCRIPTION_DENSITY_THRESHOLD")
            .or(clustering.description_density_threshold);

        let evaluation = &mut config.evaluation;
        evaluation.similar_cluster_ratio =
            env_override("SIMILAR_CLUSTER_RATIO").or(evaluation.similar_cluster_ratio);
        evaluation.correction_coefficient =
            env_override("CORRECTION_COEFFICIENT").or(evaluation.correction_coefficient);
        evaluation.max_correction_steps =
            env_override("MAX_CORRECTION_STEPS").or(evaluation.max_correction_steps);
        evaluation.exhaustive_expansion_budget = env_override("EXHAUSTIVE_EXPANSION_BUDGET")
            .or(evaluation.exhaustive_expansion_budget);
    }
}

/// Setting names that can be overridden as `ORATOR_<NAME>`.
pub const ENV_OVERRIDES: [&str; 8] = [
    "DISTANCE_THRESHOLD",
    "SEED",
    "MAX_AGGLOMERATION_STEPS",
    "DESCRIPTION_DENSITY_THRESHOLD",
    "SIMILAR_CLUSTER_RATIO",
    "CORRECTION_COEFFICIENT",
    "MAX_CORRECTION_STEPS",
    "EXHAUSTIVE_EXPANSION_BUDGET",
];

/// The name of the variable overriding `setting`.
pub fn env_var_name(setting: &str) -> String {
    format!("{ENV_PREFIX}{setting}")
}

fn env_override<T: FromStr>(setting: &str) -> Option<T> {
    debug_assert!(ENV_OVERRIDES.contains(&setting));
    std::env::var(env_var_name(setting)).ok()?.parse().ok()
}
