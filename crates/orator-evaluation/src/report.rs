//! Evaluation results and word status, as text or JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use orator_clustering::LayerStatus;
use orator_core::errors::{EvaluationError, OratorResult};
use orator_core::models::{ClusterKey, Description, NodeId};

/// How an attempt was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Succeeded,
    Failed,
}

impl Verdict {
    pub fn is_failure(self) -> bool {
        matches!(self, Verdict::Failed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Succeeded => "succeeded",
            Verdict::Failed => "failed",
        })
    }
}

/// One cluster along a correction route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub cluster: ClusterKey,
    pub centroid: Option<NodeId>,
    /// Distance from the previous step; `None` for the first.
    pub distance: Option<f64>,
    pub descriptions: Vec<Description>,
}

/// Cheapest route from a failure cluster to a success cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionRoute {
    pub steps: Vec<RouteStep>,
    pub worst_edge: f64,
    pub cost: f64,
}

/// Everything learned from evaluating one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub word: String,
    pub attempt: NodeId,
    pub verdict: Verdict,
    /// DTW distance to the closest model centroid. Lower is better.
    pub score: f64,
    pub threshold: f64,
    /// Per-step alignment cost against the closest model, scaled to [0, 1].
    pub accuracy_profile: Vec<f64>,
    pub model_cluster: ClusterKey,
    /// Cluster the attempt was filed under.
    pub analyzed_cluster: ClusterKey,
    pub similar_successes: Vec<ClusterKey>,
    pub similar_failures: Vec<ClusterKey>,
    /// Ranked descriptions of the model and similar success clusters.
    pub characteristics: Vec<Description>,
    /// Ranked descriptions of similar failure clusters.
    pub weaknesses: Vec<Description>,
    /// Present only for failed attempts with a reachable success cluster.
    pub correction: Option<CorrectionRoute>,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationReport {
    pub fn to_json(&self) -> OratorResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            EvaluationError::ReportSerialization {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Accuracy profile as whole percentages.
    pub fn accuracy_percentages(&self) -> Vec<u32> {
        self.accuracy_profile
            .iter()
            .map(|v| (v * 100.0).round() as u32)
            .collect()
    }
}

fn write_ranked(f: &mut fmt::Formatter<'_>, descriptions: &[Description]) -> fmt::Result {
    for (rank, description) in descriptions.iter().enumerate() {
        writeln!(f, "    ({}) {}", rank + 1, description.text)?;
    }
    Ok(())
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "word: {}", self.word)?;
        writeln!(f, "attempt: {}", self.attempt)?;
        writeln!(f, "pronunciation score: {:.3} (threshold {})", self.score, self.threshold)?;
        writeln!(f, "*lower the score, the better.")?;
        writeln!(f, "classification: {}", self.verdict)?;

        let graph: Vec<String> = self
            .accuracy_percentages()
            .iter()
            .map(u32::to_string)
            .collect();
        writeln!(f, "accuracy graph: ({})", graph.join(", "))?;

        writeln!(f, "pronunciation characteristics:")?;
        write_ranked(f, &self.characteristics)?;
        writeln!(f, "pronunciation weaknesses:")?;
        write_ranked(f, &self.weaknesses)?;
        writeln!(f, "*higher the rank, higher the feasibility.")?;

        if let Some(route) = &self.correction {
            writeln!(f, "optimal correction route:")?;
            for (index, step) in route.steps.iter().enumerate() {
                match &step.centroid {
                    Some(centroid) => writeln!(f, "    ({}) {} [{}]", index + 1, step.cluster, centroid)?,
                    None => writeln!(f, "    ({}) {}", index + 1, step.cluster)?,
                }
                for description in &step.descriptions {
                    writeln!(f, "        {}", description.text)?;
                }
            }
            writeln!(f, "total correction cost: {:.3}", route.cost)?;
        }
        Ok(())
    }
}

/// Snapshot of a word's three layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordStatus {
    pub name: String,
    pub version: Option<String>,
    pub updated: Option<DateTime<Utc>>,
    pub layers: Vec<LayerStatus>,
    pub pending_annotations: usize,
}

impl WordStatus {
    pub fn to_json(&self) -> OratorResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            EvaluationError::ReportSerialization {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

impl fmt::Display for WordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "version: {}", self.version.as_deref().unwrap_or("-"))?;
        match self.updated {
            Some(updated) => writeln!(f, "updated: {}", updated.to_rfc3339())?,
            None => writeln!(f, "updated: -")?,
        }
        for layer in &self.layers {
            writeln!(f, "{} layer:", layer.kind)?;
            writeln!(f, "    total nodes: {}", layer.node_count)?;
            writeln!(f, "    total clusters: {}", layer.cluster_count)?;
            if let Some(index) = layer.davies_bouldin {
                writeln!(f, "    davies-bouldin: {index:.4}")?;
            }
            for cluster in &layer.clusters {
                writeln!(f, "    cluster#{}:", cluster.id)?;
                writeln!(f, "        size: {}", cluster.size)?;
                match &cluster.centroid {
                    Some(centroid) => writeln!(f, "        centroid: {centroid}")?,
                    None => writeln!(f, "        centroid: -")?,
                }
                writeln!(f, "        dd: {:.3}", cluster.description_density)?;
                writeln!(f, "        acd: {:.3}", cluster.average_centroid_distance)?;
            }
        }
        writeln!(f, "pending annotation requests: {}", self.pending_annotations)
    }
}
