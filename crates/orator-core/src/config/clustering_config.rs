//! Clustering configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

/// Configuration for agglomeration and incremental insertion.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Merge/absorb distance limit. Default: 4.0.
    pub distance_threshold: Option<f64>,
    /// Seed for the cluster-selection generator. Default: entropy.
    pub seed: Option<u64>,
    /// Upper bound on agglomeration loop iterations per run.
    pub max_agglomeration_steps: Option<usize>,
    /// Description density below which annotation is requested. Default: 0.3.
    pub description_density_threshold: Option<f64>,
}

impl ClusteringConfig {
    pub fn effective_distance_threshold(&self) -> f64 {
        self.distance_threshold
            .unwrap_or(defaults::DEFAULT_DISTANCE_THRESHOLD)
    }

    pub fn effective_max_agglomeration_steps(&self) -> usize {
        self.max_agglomeration_steps
            .unwrap_or(defaults::DEFAULT_MAX_AGGLOMERATION_STEPS)
    }

    pub fn effective_description_density_threshold(&self) -> f64 {
        self.description_density_threshold
            .unwrap_or(defaults::DEFAULT_DESCRIPTION_DENSITY_THRESHOLD)
    }
}
