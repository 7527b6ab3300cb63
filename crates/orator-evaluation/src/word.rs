//! A word: three clustering layers and everything evaluated against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use orator_clustering::algorithms::cost_path;
use orator_clustering::{AgglomerationOutcome, ClusterAnalyzer, Layer};
use orator_core::config::OratorConfig;
use orator_core::errors::{ClusteringError, EvaluationError, OratorResult};
use orator_core::models::{ClusterId, ClusterKey, Description, LayerKind, NodeId, SharedNode};
use orator_core::traits::NullAnnotationSink;

use crate::cmv::CmvPath;
use crate::report::{CorrectionRoute, EvaluationReport, RouteStep, Verdict, WordStatus};
use crate::requests::{AnnotationRequest, AnnotationRequestQueue};
use crate::search::{CorrectionGraph, ExhaustiveSearch};

/// Word metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordInfo {
    pub name: String,
    pub version: Option<String>,
    pub updated: Option<DateTime<Utc>>,
}

impl WordInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A cluster waiting for a human description, with the recordings to play.
#[derive(Debug, Clone)]
pub struct AnnotationTask {
    pub request: AnnotationRequest,
    /// Members ranked by closeness to the centroid.
    pub nodes: Vec<SharedNode>,
}

/// The three layers of one word plus the policy that maintains them.
///
/// Layers never share clusters; cross-layer comparisons go through direct
/// centroid distances. Every mutating operation takes `&mut self`.
#[derive(Debug)]
pub struct Word {
    info: WordInfo,
    config: OratorConfig,
    model: Layer,
    success: Layer,
    failure: Layer,
    analyzer: ClusterAnalyzer,
    requests: AnnotationRequestQueue,
}

impl Word {
    pub fn new(info: WordInfo, config: OratorConfig) -> Self {
        let analyzer = ClusterAnalyzer::new(config.clustering.clone());
        Self {
            info,
            config,
            model: Layer::new(LayerKind::Model),
            success: Layer::new(LayerKind::Success),
            failure: Layer::new(LayerKind::Failure),
            analyzer,
            requests: AnnotationRequestQueue::new(),
        }
    }

    pub fn info(&self) -> &WordInfo {
        &self.info
    }

    pub fn config(&self) -> &OratorConfig {
        &self.config
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        match kind {
            LayerKind::Model => &self.model,
            LayerKind::Success => &self.success,
            LayerKind::Failure => &self.failure,
        }
    }

    fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        self.parts(kind).0
    }

    /// A layer together with the analyzer and request queue, borrowed apart.
    fn parts(
        &mut self,
        kind: LayerKind,
    ) -> (&mut Layer, &mut ClusterAnalyzer, &mut AnnotationRequestQueue) {
        let layer = match kind {
            LayerKind::Model => &mut self.model,
            LayerKind::Success => &mut self.success,
            LayerKind::Failure => &mut self.failure,
        };
        (layer, &mut self.analyzer, &mut self.requests)
    }

    pub fn requests(&self) -> &AnnotationRequestQueue {
        &self.requests
    }

    /// Pool a node without clustering it; follow with [`rebuild`](Self::rebuild).
    pub fn load_node(&mut self, kind: LayerKind, node: SharedNode) -> bool {
        self.layer_mut(kind).add_node(node)
    }

    /// Re-cluster a layer from its pool.
    pub fn rebuild(&mut self, kind: LayerKind) -> OratorResult<AgglomerationOutcome> {
        let (layer, analyzer, requests) = self.parts(kind);
        let outcome = analyzer.initialize(layer)?;
        // Cluster ids of the old partition are gone.
        requests.forget_layer(kind);
        self.touch();
        Ok(outcome)
    }

    /// Pool and incrementally cluster a node.
    pub fn add_node(&mut self, kind: LayerKind, node: SharedNode) -> OratorResult<ClusterId> {
        let (layer, analyzer, _) = self.parts(kind);
        let cluster = analyzer.insert(layer, node)?;
        self.touch();
        Ok(cluster)
    }

    /// Take a node out of its clusters and its layer's pool.
    pub fn remove_node(&mut self, kind: LayerKind, node: &NodeId) -> OratorResult<SharedNode> {
        let unknown = || ClusteringError::UnknownNode {
            layer: kind.to_string(),
            node: node.to_string(),
        };
        let (layer, analyzer, requests) = self.parts(kind);
        if layer.node(node).is_none() {
            return Err(unknown().into());
        }
        for cluster in analyzer.displace(layer, node)? {
            if layer.cluster(cluster).is_none() {
                requests.forget(ClusterKey::new(kind, cluster));
            }
        }
        let removed = layer.forget_node(node).ok_or_else(unknown)?;
        self.touch();
        Ok(removed)
    }

    /// Classify an attempt against the model layer, file it under the
    /// success or failure layer, and explain the result.
    ///
    /// When explaining fails, an attempt filed by this call is withdrawn
    /// again before the error is returned.
    pub fn evaluate(&mut self, attempt: SharedNode) -> OratorResult<EvaluationReport> {
        if self.model.cluster_count() == 0 {
            return Err(EvaluationError::EmptyModelLayer {
                word: self.info.name.clone(),
            }
            .into());
        }
        let (model, score) = self.model.closest_cluster_to(&attempt).ok_or_else(|| {
            EvaluationError::IncomparableAttempt {
                word: self.info.name.clone(),
                node: attempt.id().to_string(),
            }
        })?;

        let verdict = if score > self.config.clustering.effective_distance_threshold() {
            Verdict::Failed
        } else {
            Verdict::Succeeded
        };
        let target = match verdict {
            Verdict::Failed => LayerKind::Failure,
            Verdict::Succeeded => LayerKind::Success,
        };

        let filed = self.layer(target).node(attempt.id()).is_none();
        let outcome = {
            let (layer, analyzer, _) = self.parts(target);
            analyzer.insert(layer, attempt.clone())
        }
        .and_then(|analyzed| {
            let classification = Classification {
                model,
                score,
                verdict,
                analyzed: ClusterKey::new(target, analyzed),
            };
            self.explain(&attempt, classification)
        });
        let report = self.withdraw_on_error(target, attempt.id(), filed, outcome)?;

        info!(
            word = %self.info.name,
            attempt = %attempt.id(),
            score,
            verdict = %verdict,
            cluster = %report.analyzed_cluster,
            "attempt evaluated"
        );
        self.touch();
        Ok(report)
    }

    fn explain(
        &mut self,
        attempt: &SharedNode,
        classification: Classification,
    ) -> OratorResult<EvaluationReport> {
        let Classification {
            model,
            score,
            verdict,
            analyzed,
        } = classification;
        let threshold = self.config.clustering.effective_distance_threshold();
        let density_threshold = self.config.clustering.effective_description_density_threshold();
        let ratio = self.config.evaluation.effective_similar_cluster_ratio();

        let model_centroid = self.model.cluster(model).and_then(|c| c.centroid().cloned());
        let accuracy_profile = match model_centroid {
            Some(centroid) => cost_path(&centroid, attempt).unwrap_or_else(|err| {
                warn!(attempt = %attempt.id(), error = %err, "no accuracy profile");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let analyzed_cluster = self
            .layer(analyzed.layer)
            .cluster(analyzed.cluster)
            .cloned()
            .ok_or_else(|| ClusteringError::UnknownCluster {
                layer: analyzed.layer.to_string(),
                cluster: analyzed.cluster.raw(),
            })?;
        // Neighbours in the attempt's own layer come from memoized cluster
        // distances; the other layer ranks a stand-in for the analyzed cluster.
        let (similar_successes, similar_failures) = if verdict.is_failure() {
            (
                self.success.similar_to_foreign(&analyzed_cluster, ratio)?,
                self.failure.similar_clusters(analyzed.cluster, ratio)?,
            )
        } else {
            (
                self.success.similar_clusters(analyzed.cluster, ratio)?,
                self.failure.similar_to_foreign(&analyzed_cluster, ratio)?,
            )
        };

        let mut characteristics =
            self.model.cluster_descriptions(model, density_threshold, &mut self.requests)?;
        let mut weaknesses = Vec::new();
        let own = {
            let (layer, _, requests) = self.parts(analyzed.layer);
            layer.cluster_descriptions(analyzed.cluster, density_threshold, requests)?
        };
        if verdict.is_failure() {
            weaknesses.extend(own);
        } else {
            characteristics.extend(own);
        }
        for &id in &similar_successes {
            characteristics.extend(self.success.cluster_descriptions(
                id,
                density_threshold,
                &mut self.requests,
            )?);
        }
        for &id in &similar_failures {
            weaknesses.extend(self.failure.cluster_descriptions(
                id,
                density_threshold,
                &mut self.requests,
            )?);
        }

        let correction = if verdict.is_failure() {
            self.correction_route(analyzed.cluster)?
        } else {
            None
        };

        Ok(EvaluationReport {
            word: self.info.name.clone(),
            attempt: attempt.id().clone(),
            verdict,
            score,
            threshold,
            accuracy_profile,
            model_cluster: ClusterKey::new(LayerKind::Model, model),
            analyzed_cluster: analyzed,
            similar_successes: keys(LayerKind::Success, &similar_successes),
            similar_failures: keys(LayerKind::Failure, &similar_failures),
            characteristics,
            weaknesses,
            correction,
            evaluated_at: Utc::now(),
        })
    }

    /// Take a freshly filed attempt back out when `outcome` is an error.
    fn withdraw_on_error<T>(
        &mut self,
        kind: LayerKind,
        attempt: &NodeId,
        filed: bool,
        outcome: OratorResult<T>,
    ) -> OratorResult<T> {
        if outcome.is_err() && filed {
            if let Err(err) = self.remove_node(kind, attempt) {
                warn!(node = %attempt, error = %err, "attempt could not be withdrawn");
            }
        }
        outcome
    }

    /// Failure-layer distances seen from `start`, with each cluster's exit.
    fn correction_graph(&mut self, start: ClusterId) -> OratorResult<CorrectionView> {
        let failures: Vec<ClusterId> = self.failure.clusters().map(|c| c.id()).collect();
        let Some(start_index) = failures.iter().position(|&id| id == start) else {
            return Err(ClusteringError::UnknownCluster {
                layer: LayerKind::Failure.to_string(),
                cluster: start.raw(),
            }
            .into());
        };

        let n = failures.len();
        let mut hops = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let distance = self.failure.cluster_distance(failures[i], failures[j])?;
                hops[i][j] = distance;
                hops[j][i] = distance;
            }
        }
        let exits: Vec<Option<(ClusterId, f64)>> = failures
            .iter()
            .map(|&id| {
                self.failure
                    .cluster(id)
                    .and_then(|c| c.centroid())
                    .and_then(|centroid| self.success.closest_cluster_to(centroid))
            })
            .collect();
        let graph = CorrectionGraph::new(
            start_index,
            hops.clone(),
            exits.iter().map(|e| e.map_or(f64::INFINITY, |(_, d)| d)).collect(),
        )?;
        Ok(CorrectionView {
            failures,
            hops,
            exits,
            graph,
        })
    }

    /// Exhaustive search over simple routes from `start`, bounded by the
    /// configured expansion budget. Slow; meant for checking
    /// [`correction_route`](Self::correction_route).
    pub fn exhaustive_correction(&mut self, start: ClusterId) -> OratorResult<ExhaustiveSearch> {
        let view = self.correction_graph(start)?;
        let evaluation = &self.config.evaluation;
        let search = view.graph.exhaustive_route(
            evaluation.effective_correction_coefficient(),
            evaluation.effective_max_correction_steps(),
            evaluation.effective_exhaustive_expansion_budget(),
        );
        if search.truncated {
            warn!(
                word = %self.info.name,
                cluster = %start,
                expansions = search.expansions,
                "exhaustive correction search truncated"
            );
        }
        Ok(search)
    }

    /// Cheapest CMV route from a failure cluster to the success layer.
    ///
    /// `None` when the success layer is empty or unreachable.
    pub fn correction_route(&mut self, start: ClusterId) -> OratorResult<Option<CorrectionRoute>> {
        let view = self.correction_graph(start)?;
        let coefficient = self.config.evaluation.effective_correction_coefficient();
        let max_hops = self.config.evaluation.effective_max_correction_steps();
        let Some(plan) = view.graph.bottleneck_route(coefficient, max_hops) else {
            debug!(word = %self.info.name, cluster = %start, "no reachable success cluster");
            return Ok(None);
        };
        let Some(&last) = plan.waypoints.last() else {
            return Ok(None);
        };
        let Some((exit, exit_distance)) = view.exits[last] else {
            return Ok(None);
        };

        let mut path = CmvPath::new(ClusterKey::new(LayerKind::Failure, start));
        for pair in plan.waypoints.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            path.push(
                ClusterKey::new(LayerKind::Failure, view.failures[to]),
                view.hops[from][to],
            );
        }
        path.push(ClusterKey::new(LayerKind::Success, exit), exit_distance);

        let cost = path.cost(coefficient).unwrap_or(plan.cost);
        let worst_edge = path.worst_edge();
        let density_threshold = self.config.clustering.effective_description_density_threshold();

        let (clusters, distances) = path.into_parts();
        let mut steps = Vec::with_capacity(clusters.len());
        for (index, key) in clusters.into_iter().enumerate() {
            let (layer, _, requests) = self.parts(key.layer);
            let descriptions = layer.cluster_descriptions(key.cluster, density_threshold, requests)?;
            let centroid = layer
                .cluster(key.cluster)
                .and_then(|c| c.centroid().map(|n| n.id().clone()));
            steps.push(RouteStep {
                cluster: key,
                centroid,
                distance: index.checked_sub(1).map(|i| distances[i]),
                descriptions,
            });
        }

        info!(
            word = %self.info.name,
            start = %start,
            steps = steps.len(),
            cost,
            "correction route found"
        );
        Ok(Some(CorrectionRoute {
            steps,
            worst_edge,
            cost,
        }))
    }

    pub fn status(&self) -> WordStatus {
        WordStatus {
            name: self.info.name.clone(),
            version: self.info.version.clone(),
            updated: self.info.updated,
            layers: LayerKind::ALL
                .iter()
                .map(|&kind| self.layer(kind).status())
                .collect(),
            pending_annotations: self.requests.len(),
        }
    }

    /// The most pressing annotation request whose cluster still exists.
    pub fn annotation_candidates(&mut self) -> Option<AnnotationTask> {
        let density_threshold = self.config.clustering.effective_description_density_threshold();
        while let Some(request) = self.requests.resolve() {
            let layer = self.layer_mut(request.cluster.layer);
            // Ranks the members by closeness to the centroid.
            let ranked = layer.cluster_descriptions(
                request.cluster.cluster,
                density_threshold,
                &mut NullAnnotationSink,
            );
            if ranked.is_err() {
                debug!(cluster = %request.cluster, "stale annotation request dropped");
                continue;
            }
            let nodes = layer
                .cluster(request.cluster.cluster)
                .map(|c| c.members().to_vec())
                .unwrap_or_default();
            return Some(AnnotationTask { request, nodes });
        }
        None
    }

    /// Attach a description to a cluster's centroid.
    pub fn annotate(&mut self, cluster: ClusterKey, description: Description) -> OratorResult<NodeId> {
        let annotated = self.layer_mut(cluster.layer).annotate(cluster.cluster, description)?;
        let density = self
            .layer(cluster.layer)
            .cluster(cluster.cluster)
            .map_or(0.0, |c| c.description_density());
        if density >= self.config.clustering.effective_description_density_threshold() {
            self.requests.forget(cluster);
        }
        self.touch();
        Ok(annotated)
    }

    /// Attach a description to one recording.
    pub fn annotate_node(
        &mut self,
        kind: LayerKind,
        node: &NodeId,
        description: Description,
    ) -> OratorResult<()> {
        let layer = self.layer(kind);
        let target = layer.node(node).ok_or_else(|| ClusteringError::UnknownNode {
            layer: kind.to_string(),
            node: node.to_string(),
        })?;
        target.add_description(description);
        Ok(())
    }

    fn touch(&mut self) {
        self.info.updated = Some(Utc::now());
    }
}

/// Where an attempt was filed, before it is explained.
#[derive(Debug, Clone, Copy)]
struct Classification {
    model: ClusterId,
    score: f64,
    verdict: Verdict,
    analyzed: ClusterKey,
}

struct CorrectionView {
    failures: Vec<ClusterId>,
    hops: Vec<Vec<f64>>,
    exits: Vec<Option<(ClusterId, f64)>>,
    graph: CorrectionGraph,
}

fn keys(layer: LayerKind, ids: &[ClusterId]) -> Vec<ClusterKey> {
    ids.iter().map(|&id| ClusterKey::new(layer, id)).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use orator_core::models::Node;

    use super::*;

    fn scalar(id: &str, x: f32) -> SharedNode {
        Arc::new(Node::new(id, vec![vec![x]]).unwrap())
    }

    fn failing_explanation() -> OratorResult<()> {
        Err(ClusteringError::EmptyCluster { cluster: 0 }.into())
    }

    #[test]
    fn failed_explanation_withdraws_a_new_attempt() {
        let mut word = Word::new(WordInfo::new("apple"), OratorConfig::default());
        word.add_node(LayerKind::Failure, scalar("old", 20.0)).unwrap();
        let attempt = word.add_node(LayerKind::Failure, scalar("try", 9.0)).unwrap();
        word.requests.request(ClusterKey::new(LayerKind::Failure, attempt), 0.0);

        let outcome =
            word.withdraw_on_error(LayerKind::Failure, &NodeId::from("try"), true, failing_explanation());

        assert!(outcome.is_err());
        let failure = word.layer(LayerKind::Failure);
        assert!(failure.node(&NodeId::from("try")).is_none());
        assert!(failure.cluster(attempt).is_none());
        assert_eq!(failure.node_count(), 1);
        assert!(word.requests().is_empty());
    }

    #[test]
    fn previously_filed_attempts_are_kept() {
        let mut word = Word::new(WordInfo::new("apple"), OratorConfig::default());
        word.add_node(LayerKind::Failure, scalar("try", 9.0)).unwrap();

        let outcome =
            word.withdraw_on_error(LayerKind::Failure, &NodeId::from("try"), false, failing_explanation());

        assert!(outcome.is_err());
        assert!(word.layer(LayerKind::Failure).node(&NodeId::from("try")).is_some());
    }

    #[test]
    fn successful_explanation_keeps_the_attempt() {
        let mut word = Word::new(WordInfo::new("apple"), OratorConfig::default());
        word.add_node(LayerKind::Success, scalar("try", 1.0)).unwrap();

        let outcome = word.withdraw_on_error(LayerKind::Success, &NodeId::from("try"), true, Ok(7));

        assert_eq!(outcome.unwrap(), 7);
        assert_eq!(word.layer(LayerKind::Success).node_count(), 1);
    }
}
