//! Configuration system for Orator.
//! TOML-based, 3-layer resolution: env > project > defaults.

pub mod clustering_config;
pub mod defaults;
pub mod evaluation_config;
pub mod orator_config;

pub use clustering_config::ClusteringConfig;
pub use evaluation_config::EvaluationConfig;
pub use orator_config::{env_var_name, OratorConfig, ENV_OVERRIDES};
