//! One independent clustering context (model, success or failure).

use rustc_hash::FxHashSet;
use serde::Serialize;

use orator_core::errors::{ClusteringError, OratorResult};
use orator_core::models::{ClusterId, Description, LayerKind, Node, NodeId, SharedNode};
use orator_core::traits::AnnotationSink;

use crate::algorithms::dtw;
use crate::cache::DistanceCache;
use crate::cluster::{Cluster, NodeCache};
use crate::quality;

/// A member pool, its current partition into clusters, and the isolation
/// working set used while agglomerating.
#[derive(Debug)]
pub struct Layer {
    kind: LayerKind,
    pub(crate) nodes: NodeCache,
    pub(crate) clusters: DistanceCache<Cluster>,
    pub(crate) isolated: FxHashSet<ClusterId>,
    next_cluster_id: u64,
}

/// Snapshot of one cluster for status reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStatus {
    pub id: ClusterId,
    pub size: usize,
    pub centroid: Option<NodeId>,
    pub description_density: f64,
    pub average_centroid_distance: f64,
}

/// Snapshot of a whole layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStatus {
    pub kind: LayerKind,
    pub node_count: usize,
    pub cluster_count: usize,
    /// `None` with fewer than two clusters.
    pub davies_bouldin: Option<f64>,
    pub clusters: Vec<ClusterStatus>,
}

impl Layer {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            nodes: NodeCache::new(),
            clusters: DistanceCache::new(),
            isolated: FxHashSet::default(),
            next_cluster_id: 0,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Add a node to the member pool without clustering it.
    /// Returns `false` if a node with the same id is already pooled.
    pub fn add_node(&mut self, node: SharedNode) -> bool {
        self.nodes.register(node)
    }

    pub fn node(&self, id: &NodeId) -> Option<&SharedNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SharedNode> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop a node from the member pool and its distance rows.
    ///
    /// Clusters are not touched; displace the node first.
    pub fn forget_node(&mut self, id: &NodeId) -> Option<SharedNode> {
        self.nodes.remove(id)
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    /// Clusters in creation order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// The first cluster containing `node`.
    pub fn cluster_of(&self, node: &NodeId) -> Option<ClusterId> {
        self.clusters
            .iter()
            .find(|cluster| cluster.contains(node))
            .map(Cluster::id)
    }

    /// Memoized centroid distance between two clusters of this layer.
    pub fn cluster_distance(&mut self, a: ClusterId, b: ClusterId) -> OratorResult<f64> {
        self.require(a)?;
        self.require(b)?;
        self.clusters.distance_by_id(&a, &b, &mut self.nodes)
    }

    /// Centroid distance without touching the caches. Falls back to a
    /// direct DTW when the pair was never measured.
    pub fn peek_cluster_distance(&self, a: &Cluster, b: &Cluster) -> f64 {
        if a.id() == b.id() {
            return 0.0;
        }
        if let Some(cached) = self.clusters.cached_distance(&a.id(), &b.id()) {
            return cached;
        }
        match (a.centroid(), b.centroid()) {
            (Some(x), Some(y)) => self
                .nodes
                .cached_distance(x.id(), y.id())
                .unwrap_or_else(|| dtw::distance(x, y)),
            _ => f64::INFINITY,
        }
    }

    /// Cluster whose centroid is closest to `probe`, by direct DTW.
    ///
    /// The probe is not registered anywhere, so foreign or transient nodes
    /// can be compared without polluting this layer. Infinitely distant
    /// clusters never qualify; ties go to the older cluster.
    pub fn closest_cluster_to(&self, probe: &Node) -> Option<(ClusterId, f64)> {
        let mut best: Option<(ClusterId, f64)> = None;
        for cluster in self.clusters.iter() {
            let Some(centroid) = cluster.centroid() else {
                continue;
            };
            let distance = dtw::distance(probe, centroid);
            if distance < best.map_or(f64::INFINITY, |(_, d)| d) {
                best = Some((cluster.id(), distance));
            }
        }
        best
    }

    /// The clusters of this layer most similar to cluster `id`, ascending by
    /// memoized centroid distance; `id` itself is not included.
    ///
    /// Returns `max(round(N * ratio), min(2, N))` of the N other clusters.
    pub fn similar_clusters(&mut self, id: ClusterId, ratio: f64) -> OratorResult<Vec<ClusterId>> {
        self.require(id)?;
        self.clusters.nearest_fraction_by_id(&id, ratio, &mut self.nodes)
    }

    /// The clusters of this layer most similar to `foreign`, a cluster of
    /// another layer, counted as in [`similar_clusters`](Self::similar_clusters).
    ///
    /// A stand-in singleton around the foreign centroid is ranked among this
    /// layer's clusters and then removed with every distance it produced.
    pub fn similar_to_foreign(
        &mut self,
        foreign: &Cluster,
        ratio: f64,
    ) -> OratorResult<Vec<ClusterId>> {
        let Some(centroid) = foreign.centroid().cloned() else {
            return Ok(Vec::new());
        };
        let pooled = self.nodes.contains(centroid.id());
        let id = self.mint_cluster_id();

        let ranked = Cluster::singleton(id, self.kind, centroid.clone(), &mut self.nodes)
            .and_then(|stand_in| self.clusters.nearest_fraction(&stand_in, ratio, &mut self.nodes));

        self.clusters.remove(&id);
        if !pooled {
            self.nodes.remove(centroid.id());
        }
        ranked
    }

    /// Ranked member descriptions of one cluster; see [`Cluster::descriptions`].
    pub fn cluster_descriptions(
        &mut self,
        id: ClusterId,
        density_threshold: f64,
        sink: &mut dyn AnnotationSink,
    ) -> OratorResult<Vec<Description>> {
        let kind = self.kind;
        let cluster = self
            .clusters
            .get_mut(&id)
            .ok_or_else(|| unknown_cluster(kind, id))?;
        // Re-ranking members and refreshing density leave the centroid alone,
        // so memoized cluster distances stay valid.
        cluster.descriptions(&mut self.nodes, density_threshold, sink)
    }

    /// Attach a description to the centroid of `cluster`.
    pub fn annotate(&mut self, id: ClusterId, description: Description) -> OratorResult<NodeId> {
        let kind = self.kind;
        let cluster = self
            .clusters
            .get_mut(&id)
            .ok_or_else(|| unknown_cluster(kind, id))?;
        let centroid = cluster
            .centroid()
            .cloned()
            .ok_or(ClusteringError::EmptyCluster { cluster: id.raw() })?;
        centroid.add_description(description);
        cluster.refresh_description_density();
        Ok(centroid.id().clone())
    }

    pub fn status(&self) -> LayerStatus {
        let clusters = self
            .clusters
            .iter()
            .map(|cluster| ClusterStatus {
                id: cluster.id(),
                size: cluster.len(),
                centroid: cluster.centroid().map(|c| c.id().clone()),
                description_density: cluster.description_density(),
                average_centroid_distance: cluster.average_centroid_distance(),
            })
            .collect();

        LayerStatus {
            kind: self.kind,
            node_count: self.nodes.len(),
            cluster_count: self.clusters.len(),
            davies_bouldin: quality::davies_bouldin(self),
            clusters,
        }
    }

    pub(crate) fn mint_cluster_id(&mut self) -> ClusterId {
        let id = ClusterId(self.next_cluster_id);
        self.next_cluster_id += 1;
        id
    }

    /// Drop the partition, keeping the member pool and its distances.
    pub(crate) fn reset_clusters(&mut self) {
        self.clusters.clear();
        self.isolated.clear();
    }

    fn require(&self, id: ClusterId) -> OratorResult<()> {
        if self.clusters.contains(&id) {
            Ok(())
        } else {
            Err(unknown_cluster(self.kind, id).into())
        }
    }
}

fn unknown_cluster(layer: LayerKind, id: ClusterId) -> ClusteringError {
    ClusteringError::UnknownCluster {
        layer: layer.to_string(),
        cluster: id.raw(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use orator_core::traits::NullAnnotationSink;

    use super::*;

    fn point(id: &str, x: f32) -> SharedNode {
        Arc::new(Node::new(id, vec![vec![x]]).unwrap())
    }

    fn layer_with(points: &[(&str, f32)]) -> Layer {
        let mut layer = Layer::new(LayerKind::Success);
        for &(id, x) in points {
            let node = point(id, x);
            layer.add_node(node.clone());
            let cluster_id = layer.mint_cluster_id();
            let cluster = Cluster::singleton(cluster_id, layer.kind(), node, &mut layer.nodes).unwrap();
            layer.clusters.register(cluster);
        }
        layer
    }

    #[test]
    fn minted_ids_are_unique_across_resets() {
        let mut layer = Layer::new(LayerKind::Model);
        let first = layer.mint_cluster_id();
        layer.reset_clusters();
        assert_ne!(layer.mint_cluster_id(), first);
    }

    #[test]
    fn closest_cluster_uses_direct_distance() {
        let layer = layer_with(&[("a", 0.0), ("b", 5.0), ("c", 10.0)]);
        let probe = Node::new("probe", vec![vec![6.0]]).unwrap();
        assert_eq!(layer.closest_cluster_to(&probe), Some((ClusterId(1), 1.0)));
        // The probe is never pooled.
        assert_eq!(layer.node_count(), 3);
    }

    #[test]
    fn closest_cluster_ignores_mismatched_dimensions() {
        let layer = layer_with(&[("a", 0.0)]);
        let probe = Node::new("probe", vec![vec![0.0, 0.0]]).unwrap();
        assert_eq!(layer.closest_cluster_to(&probe), None);
    }

    #[test]
    fn similar_clusters_exclude_the_target() {
        let mut layer = layer_with(&[("a", 0.0), ("b", 1.0), ("c", 2.0), ("d", 3.0), ("e", 4.5)]);
        // Four others, round(4 * 0.3) = 1, raised to the minimum of 2.
        let near = layer.similar_clusters(ClusterId(3), 0.3).unwrap();
        assert_eq!(near, vec![ClusterId(2), ClusterId(4)]);
        // Served from the cluster cache.
        assert_eq!(layer.clusters.cached_distance(&ClusterId(3), &ClusterId(2)), Some(1.0));
        assert!(layer.similar_clusters(ClusterId(9), 0.3).is_err());
    }

    #[test]
    fn similar_to_foreign_leaves_no_trace() {
        let mut layer = layer_with(&[("a", 0.0), ("b", 1.0), ("c", 2.0), ("d", 3.0), ("e", 4.0)]);
        let mut elsewhere = NodeCache::new();
        let foreign =
            Cluster::singleton(ClusterId(0), LayerKind::Failure, point("x", 3.9), &mut elsewhere)
                .unwrap();

        let near = layer.similar_to_foreign(&foreign, 0.3).unwrap();
        // round(5 * 0.3) = 2.
        assert_eq!(near, vec![ClusterId(4), ClusterId(3)]);

        assert_eq!(layer.cluster_count(), 5);
        assert_eq!(layer.node_count(), 5);
        assert!(layer.node(&NodeId::from("x")).is_none());
        assert!(layer.clusters().all(|c| c.id().raw() < 5));
    }

    #[test]
    fn similar_to_an_empty_foreign_cluster_is_nothing() {
        let mut layer = layer_with(&[("a", 0.0)]);
        let empty = Cluster::new(ClusterId(0), LayerKind::Model);
        assert!(layer.similar_to_foreign(&empty, 0.3).unwrap().is_empty());
    }

    #[test]
    fn unknown_cluster_is_an_error() {
        let mut layer = layer_with(&[("a", 0.0)]);
        let err = layer.cluster_distance(ClusterId(0), ClusterId(9)).unwrap_err();
        assert!(err.to_string().contains("cluster 9"));
        assert!(layer
            .cluster_descriptions(ClusterId(9), 0.3, &mut NullAnnotationSink)
            .is_err());
    }

    #[test]
    fn annotate_targets_the_centroid() {
        let mut layer = layer_with(&[("a", 0.0)]);
        let annotated = layer.annotate(ClusterId(0), Description::new("soft onset")).unwrap();
        assert_eq!(annotated.as_str(), "a");
        assert_eq!(layer.cluster(ClusterId(0)).unwrap().description_density(), 1.0);
        assert_eq!(layer.node(&annotated).unwrap().description_count(), 1);
    }

    #[test]
    fn status_reports_every_cluster() {
        let layer = layer_with(&[("a", 0.0), ("b", 10.0)]);
        let status = layer.status();
        assert_eq!(status.node_count, 2);
        assert_eq!(status.cluster_count, 2);
        assert_eq!(status.clusters[1].centroid, Some(NodeId::from("b")));
        // Two singletons: no spread, so the index is 0.
        assert_eq!(status.davies_bouldin, Some(0.0));
    }
}
