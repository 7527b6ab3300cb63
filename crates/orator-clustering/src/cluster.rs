//! A group of recordings represented by its medoid.

use std::cmp::Ordering;

use orator_core::errors::OratorResult;
use orator_core::models::{ClusterId, ClusterKey, Description, LayerKind, NodeId, SharedNode};
use orator_core::traits::AnnotationSink;

use crate::cache::DistanceCache;
use crate::measure::Measurable;

/// A layer's pool of member nodes and their memoized DTW distances.
pub type NodeCache = DistanceCache<SharedNode>;

/// A bag of nodes with a medoid ("centroid").
///
/// The centroid is recomputed synchronously after every membership change:
/// - 0 members: no centroid, average centroid distance 0;
/// - 1 member: that member, 0;
/// - 2 members: the first member, their mutual distance;
/// - 3+: the member minimizing total distance to the others, that minimal
///   sum divided by the member count.
#[derive(Debug, Clone)]
pub struct Cluster {
    id: ClusterId,
    layer: LayerKind,
    members: Vec<SharedNode>,
    centroid: Option<SharedNode>,
    average_centroid_distance: f64,
    description_density: f64,
}

impl Cluster {
    pub fn new(id: ClusterId, layer: LayerKind) -> Self {
        Self {
            id,
            layer,
            members: Vec::new(),
            centroid: None,
            average_centroid_distance: 0.0,
            description_density: 0.0,
        }
    }

    pub fn singleton(
        id: ClusterId,
        layer: LayerKind,
        node: SharedNode,
        nodes: &mut NodeCache,
    ) -> OratorResult<Self> {
        let mut cluster = Self::new(id, layer);
        cluster.add_node(node, nodes)?;
        Ok(cluster)
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn layer(&self) -> LayerKind {
        self.layer
    }

    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(self.layer, self.id)
    }

    pub fn members(&self) -> &[SharedNode] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.members.iter().any(|member| member.id() == node)
    }

    pub fn centroid(&self) -> Option<&SharedNode> {
        self.centroid.as_ref()
    }

    pub fn average_centroid_distance(&self) -> f64 {
        self.average_centroid_distance
    }

    /// Annotation count ÷ member count, as of the last refresh.
    pub fn description_density(&self) -> f64 {
        self.description_density
    }

    /// Add a node. Returns `false` if it was already a member.
    pub fn add_node(&mut self, node: SharedNode, nodes: &mut NodeCache) -> OratorResult<bool> {
        if self.contains(node.id()) {
            return Ok(false);
        }
        self.members.push(node);
        self.recompute_centroid(nodes)?;
        Ok(true)
    }

    /// Add several nodes with a single centroid recompute.
    pub fn add_nodes(
        &mut self,
        incoming: impl IntoIterator<Item = SharedNode>,
        nodes: &mut NodeCache,
    ) -> OratorResult<usize> {
        let before = self.members.len();
        for node in incoming {
            if !self.contains(node.id()) {
                self.members.push(node);
            }
        }
        let added = self.members.len() - before;
        if added > 0 {
            self.recompute_centroid(nodes)?;
        }
        Ok(added)
    }

    /// Remove a node. Returns `false` if it was not a member.
    pub fn remove_node(&mut self, node: &NodeId, nodes: &mut NodeCache) -> OratorResult<bool> {
        let before = self.members.len();
        self.members.retain(|member| member.id() != node);
        if self.members.len() == before {
            return Ok(false);
        }
        self.recompute_centroid(nodes)?;
        Ok(true)
    }

    pub fn remove_nodes(&mut self, outgoing: &[NodeId], nodes: &mut NodeCache) -> OratorResult<usize> {
        let before = self.members.len();
        self.members.retain(|member| !outgoing.contains(member.id()));
        let removed = before - self.members.len();
        if removed > 0 {
            self.recompute_centroid(nodes)?;
        }
        Ok(removed)
    }

    /// Centroid-to-centroid distance. +∞ when either side is empty.
    pub fn distance_to(&self, other: &Cluster, nodes: &mut NodeCache) -> OratorResult<f64> {
        match (&self.centroid, &other.centroid) {
            (Some(a), Some(b)) => nodes.distance(a, b, &mut ()),
            _ => Ok(f64::INFINITY),
        }
    }

    /// A new cluster holding both member sets. Neither input is modified.
    pub fn merge(&self, other: &Cluster, id: ClusterId, nodes: &mut NodeCache) -> OratorResult<Cluster> {
        let mut merged = Cluster::new(id, self.layer);
        merged.add_nodes(
            self.members.iter().chain(other.members.iter()).cloned(),
            nodes,
        )?;
        Ok(merged)
    }

    /// Member descriptions, most representative member first.
    ///
    /// Members are re-ordered by distance to the centroid. The description
    /// density is refreshed and, when below `density_threshold`, the sink is
    /// told this cluster needs more human description.
    pub fn descriptions(
        &mut self,
        nodes: &mut NodeCache,
        density_threshold: f64,
        sink: &mut dyn AnnotationSink,
    ) -> OratorResult<Vec<Description>> {
        if let Some(centroid) = self.centroid.clone() {
            let mut ranked = Vec::with_capacity(self.members.len());
            for member in &self.members {
                ranked.push((nodes.distance(&centroid, member, &mut ())?, member.clone()));
            }
            // Stable: equidistant members keep their order.
            ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            self.members = ranked.into_iter().map(|(_, member)| member).collect();
        }

        let descriptions: Vec<Description> = self
            .members
            .iter()
            .flat_map(|member| member.descriptions())
            .collect();

        self.refresh_description_density();
        if !self.members.is_empty() && self.description_density < density_threshold {
            sink.request_annotation(self.key(), self.description_density);
        }

        Ok(descriptions)
    }

    pub(crate) fn refresh_description_density(&mut self) {
        self.description_density = if self.members.is_empty() {
            0.0
        } else {
            let total: usize = self.members.iter().map(|m| m.description_count()).sum();
            total as f64 / self.members.len() as f64
        };
    }

    fn recompute_centroid(&mut self, nodes: &mut NodeCache) -> OratorResult<()> {
        self.refresh_description_density();

        if self.members.len() < 3 {
            self.centroid = self.members.first().cloned();
            self.average_centroid_distance = match self.members.as_slice() {
                [a, b] => nodes.distance(a, b, &mut ())?,
                _ => 0.0,
            };
            return Ok(());
        }

        let mut minimum_sum = f64::INFINITY;
        let mut candidate = None;
        for a in &self.members {
            let mut sum = 0.0;
            for b in &self.members {
                if a.id() != b.id() {
                    sum += nodes.distance(a, b, &mut ())?;
                }
            }
            if sum < minimum_sum {
                minimum_sum = sum;
                candidate = Some(a.clone());
            }
        }

        // Every sum infinite (mismatched dimensions): keep the first member.
        self.centroid = candidate.or_else(|| self.members.first().cloned());
        self.average_centroid_distance = minimum_sum / self.members.len() as f64;
        Ok(())
    }
}

impl Measurable for Cluster {
    type Id = ClusterId;
    type Context = NodeCache;

    fn id(&self) -> &ClusterId {
        &self.id
    }

    fn measure(&self, other: &Self, nodes: &mut NodeCache) -> OratorResult<f64> {
        self.distance_to(other, nodes)
    }
}
