//! Evaluation and correction-route configuration.

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Share of a layer's clusters reported as "similar". Default: 0.3.
    pub similar_cluster_ratio: Option<f64>,
    /// The P in `P * sqrt(n) * max(d1..dn)`. Default: 1.0.
    pub correction_coefficient: Option<f64>,
    /// Longest correction route, in transitions. Default: 64.
    pub max_correction_steps: Option<usize>,
    /// Node expansions allowed to the exhaustive route search. Default: 100000.
    pub exhaustive_expansion_budget: Option<usize>,
}

impl EvaluationConfig {
    pub fn effective_similar_cluster_ratio(&self) -> f64 {
        self.similar_cluster_ratio
            .unwrap_or(defaults::DEFAULT_SIMILAR_CLUSTER_RATIO)
    }

    pub fn effective_correction_coefficient(&self) -> f64 {
        self.correction_coefficient
            .unwrap_or(defaults::DEFAULT_CORRECTION_COEFFICIENT)
    }

    pub fn effective_max_correction_steps(&self) -> usize {
        self.max_correction_steps
            .unwrap_or(defaults::DEFAULT_MAX_CORRECTION_STEPS)
    }

    pub fn effective_exhaustive_expansion_budget(&self) -> usize {
        self.exhaustive_expansion_budget
            .unwrap_or(defaults::DEFAULT_EXHAUSTIVE_EXPANSION_BUDGET)
    }
}
