//! Agglomerative clustering policy over a [`Layer`].
//!
//! Merges are driven by randomly chosen mutual-nearest pairs. A cluster with
//! no mutual partner, or whose partner is too far, is isolated so it is not
//! drawn again. A cluster chosen as someone's partner is un-isolated. The
//! isolation set only resets when a run starts, so a run may stop with every
//! cluster isolated before the floor is reached; running again resumes from
//! the current partition and always makes at least one merge while two
//! clusters are within the distance threshold of each other.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use orator_core::config::ClusteringConfig;
use orator_core::errors::{ClusteringError, OratorResult};
use orator_core::models::{ClusterId, NodeId, SharedNode};

use crate::cluster::Cluster;
use crate::layer::Layer;

/// Why an agglomeration run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// At most one cluster left.
    SingleCluster,
    /// No cluster left to draw.
    AllIsolated,
    /// Cluster count fell to `max(sqrt(nodes / 2), 3)`.
    FloorReached,
    /// `max_agglomeration_steps` iterations ran.
    BudgetExhausted,
}

/// Summary of one agglomeration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgglomerationOutcome {
    pub steps: usize,
    pub merges: usize,
    pub isolations: usize,
    pub stop: StopReason,
}

/// Clustering policy. Holds no layer state, so one analyzer may serve
/// several layers.
#[derive(Debug, Clone)]
pub struct ClusterAnalyzer {
    config: ClusteringConfig,
    rng: SmallRng,
}

impl ClusterAnalyzer {
    /// Seeded from `config.seed`, or from entropy when unset.
    pub fn new(config: ClusteringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Default configuration with a fixed seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(ClusteringConfig {
            seed: Some(seed),
            ..ClusteringConfig::default()
        })
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Rebuild the layer's partition from scratch: one singleton per pooled
    /// node, then agglomerate.
    pub fn initialize(&mut self, layer: &mut Layer) -> OratorResult<AgglomerationOutcome> {
        layer.reset_clusters();

        let pooled: Vec<SharedNode> = layer.nodes().cloned().collect();
        for node in pooled {
            let id = layer.mint_cluster_id();
            let singleton = Cluster::singleton(id, layer.kind(), node, &mut layer.nodes)?;
            layer.clusters.register(singleton);
        }

        self.agglomerate(layer)
    }

    /// Merge mutual-nearest pairs until no valid merge remains.
    pub fn agglomerate(&mut self, layer: &mut Layer) -> OratorResult<AgglomerationOutcome> {
        let threshold = self.config.effective_distance_threshold();
        let budget = self.config.effective_max_agglomeration_steps();
        let floor = (layer.node_count() as f64 / 2.0).sqrt().max(3.0);

        layer.isolated.clear();
        let mut steps = 0;
        let mut merges = 0;
        let mut isolations = 0;

        let stop = loop {
            if layer.clusters.len() <= 1 {
                break StopReason::SingleCluster;
            }
            if steps >= budget {
                break StopReason::BudgetExhausted;
            }
            let Some(chosen) = layer.clusters.random_element(&layer.isolated, &mut self.rng) else {
                break StopReason::AllIsolated;
            };
            steps += 1;

            let Some(partner) = layer.clusters.mutual_nearest(&chosen, &mut layer.nodes)? else {
                layer.isolated.insert(chosen);
                isolations += 1;
                continue;
            };
            layer.isolated.remove(&partner);

            let distance = layer.clusters.distance_by_id(&chosen, &partner, &mut layer.nodes)?;
            if distance > threshold {
                layer.isolated.insert(chosen);
                layer.isolated.insert(partner);
                isolations += 2;
                continue;
            }

            let merged_id = layer.mint_cluster_id();
            let (Some(a), Some(b)) = (layer.clusters.get(&chosen), layer.clusters.get(&partner)) else {
                return Err(ClusteringError::UnknownCluster {
                    layer: layer.kind().to_string(),
                    cluster: chosen.raw(),
                }
                .into());
            };
            let merged = a.merge(b, merged_id, &mut layer.nodes)?;
            debug!(
                layer = %layer.kind(),
                left = %chosen,
                right = %partner,
                merged = %merged_id,
                distance,
                "merging clusters"
            );
            layer.clusters.remove(&chosen);
            layer.clusters.remove(&partner);
            layer.clusters.register(merged);
            merges += 1;

            if layer.clusters.len() as f64 <= floor {
                break StopReason::FloorReached;
            }
        };

        let outcome = AgglomerationOutcome {
            steps,
            merges,
            isolations,
            stop,
        };
        info!(
            layer = %layer.kind(),
            clusters = layer.cluster_count(),
            steps = outcome.steps,
            merges = outcome.merges,
            isolations = outcome.isolations,
            stop = ?outcome.stop,
            "agglomeration complete"
        );
        Ok(outcome)
    }

    /// Pool `node` and attach it to the closest cluster, or keep it as a new
    /// singleton when nothing is closer than the distance threshold.
    ///
    /// Returns the cluster now holding the node.
    pub fn insert(&mut self, layer: &mut Layer, node: SharedNode) -> OratorResult<ClusterId> {
        if let Some(existing) = layer.cluster_of(node.id()) {
            return Ok(existing);
        }
        layer.add_node(node.clone());

        let mut minimum = f64::INFINITY;
        let mut closest = None;
        let candidates: Vec<(ClusterId, SharedNode)> = layer
            .clusters()
            .filter_map(|cluster| cluster.centroid().map(|c| (cluster.id(), c.clone())))
            .collect();
        for (id, centroid) in candidates {
            let distance = layer.nodes.distance(&centroid, &node, &mut ())?;
            if distance < minimum {
                minimum = distance;
                closest = Some(id);
            }
        }

        let threshold = self.config.effective_distance_threshold();
        if let Some(target) = closest.filter(|_| minimum < threshold) {
            let nodes = &mut layer.nodes;
            if let Some(added) = layer
                .clusters
                .update_with(&target, |cluster| cluster.add_node(node.clone(), nodes))
            {
                added?;
                layer.isolated.remove(&target);
                debug!(
                    layer = %layer.kind(),
                    node = %node.id(),
                    cluster = %target,
                    distance = minimum,
                    "node absorbed into cluster"
                );
                return Ok(target);
            }
        }

        let id = layer.mint_cluster_id();
        let singleton = Cluster::singleton(id, layer.kind(), node.clone(), &mut layer.nodes)?;
        layer.clusters.register(singleton);
        debug!(layer = %layer.kind(), node = %node.id(), cluster = %id, "new singleton cluster");
        Ok(id)
    }

    /// Remove `node` from every cluster containing it, without
    /// re-agglomerating. Clusters left empty are retired.
    ///
    /// Returns the clusters that lost a member.
    pub fn displace(&mut self, layer: &mut Layer, node: &NodeId) -> OratorResult<Vec<ClusterId>> {
        let holders: Vec<ClusterId> = layer
            .clusters()
            .filter(|cluster| cluster.contains(node))
            .map(Cluster::id)
            .collect();

        for &id in &holders {
            let nodes = &mut layer.nodes;
            if let Some(removed) = layer
                .clusters
                .update_with(&id, |cluster| cluster.remove_node(node, nodes))
            {
                removed?;
            }
            if layer.cluster(id).is_some_and(Cluster::is_empty) {
                self.retire(layer, id);
                debug!(layer = %layer.kind(), cluster = %id, "retired empty cluster");
            }
        }
        Ok(holders)
    }

    fn retire(&self, layer: &mut Layer, id: ClusterId) {
        layer.clusters.remove(&id);
        layer.isolated.remove(&id);
    }
}
