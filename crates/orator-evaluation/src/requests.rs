//! Queue of "please describe this cluster" requests.

use serde::Serialize;
use tracing::debug;

use orator_core::models::{ClusterKey, LayerKind};
use orator_core::traits::AnnotationSink;

/// Outstanding requests for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRequest {
    pub cluster: ClusterKey,
    /// How many times the cluster was found under-described.
    pub count: u32,
    /// Description density at the latest sighting.
    pub description_density: f64,
}

impl AnnotationRequest {
    /// Clusters seen sparse more often, and sparser ones, come first.
    pub fn priority(&self) -> f64 {
        f64::from(self.count).sqrt() * (1.0 - self.description_density.clamp(0.0, 1.0))
    }
}

/// Owned by a word; clusters report into it through [`AnnotationSink`].
///
/// Entries stay in first-request order, so equal priorities resolve
/// oldest first.
#[derive(Debug, Clone, Default)]
pub struct AnnotationRequestQueue {
    entries: Vec<AnnotationRequest>,
}

impl AnnotationRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total outstanding requests, counting repeats.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct clusters waiting, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &AnnotationRequest> {
        self.entries.iter()
    }

    pub fn get(&self, cluster: ClusterKey) -> Option<&AnnotationRequest> {
        self.entries.iter().find(|e| e.cluster == cluster)
    }

    /// Record one sighting of an under-described cluster.
    pub fn request(&mut self, cluster: ClusterKey, description_density: f64) {
        match self.entries.iter_mut().find(|e| e.cluster == cluster) {
            Some(entry) => {
                entry.count += 1;
                entry.description_density = description_density;
            }
            None => self.entries.push(AnnotationRequest {
                cluster,
                count: 1,
                description_density,
            }),
        }
    }

    /// Take one request for the highest-priority cluster.
    ///
    /// Returns a snapshot of the entry as it stood; the stored count drops by
    /// one and the entry disappears once it reaches zero.
    pub fn resolve(&mut self) -> Option<AnnotationRequest> {
        let mut chosen: Option<(usize, f64)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let priority = entry.priority();
            if chosen.map_or(true, |(_, best)| priority > best) {
                chosen = Some((index, priority));
            }
        }
        let (index, priority) = chosen?;

        let snapshot = self.entries[index].clone();
        if snapshot.count <= 1 {
            self.entries.remove(index);
        } else {
            self.entries[index].count -= 1;
        }
        debug!(cluster = %snapshot.cluster, priority, "annotation request resolved");
        Some(snapshot)
    }

    /// Drop every request for `cluster`.
    pub fn forget(&mut self, cluster: ClusterKey) -> Option<AnnotationRequest> {
        let index = self.entries.iter().position(|e| e.cluster == cluster)?;
        Some(self.entries.remove(index))
    }

    /// Drop every request for clusters of `layer`.
    pub fn forget_layer(&mut self, layer: LayerKind) {
        self.entries.retain(|e| e.cluster.layer != layer);
    }
}

impl AnnotationSink for AnnotationRequestQueue {
    fn request_annotation(&mut self, cluster: ClusterKey, description_density: f64) {
        self.request(cluster, description_density);
    }
}

#[cfg(test)]
mod tests {
    use orator_core::models::ClusterId;

    use super::*;

    fn key(layer: LayerKind, id: u64) -> ClusterKey {
        ClusterKey::new(layer, ClusterId(id))
    }

    #[test]
    fn repeated_sightings_accumulate() {
        let mut queue = AnnotationRequestQueue::new();
        queue.request(key(LayerKind::Model, 1), 0.2);
        queue.request(key(LayerKind::Model, 1), 0.1);
        queue.request(key(LayerKind::Failure, 1), 0.0);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending().count(), 2);
        let entry = queue.get(key(LayerKind::Model, 1)).unwrap();
        assert_eq!(entry.count, 2);
        assert_eq!(entry.description_density, 0.1);
    }

    #[test]
    fn resolve_prefers_frequent_and_sparse() {
        let mut queue = AnnotationRequestQueue::new();
        let sparse = key(LayerKind::Success, 1);
        let frequent = key(LayerKind::Success, 2);
        queue.request(sparse, 0.0);
        for _ in 0..4 {
            queue.request(frequent, 0.25);
        }
        // sqrt(4) * 0.75 = 1.5 beats sqrt(1) * 1.0.
        assert_eq!(queue.resolve().unwrap().cluster, frequent);
        assert_eq!(queue.get(frequent).unwrap().count, 3);
    }

    #[test]
    fn resolve_drains_and_ties_go_to_the_oldest() {
        let mut queue = AnnotationRequestQueue::new();
        let first = key(LayerKind::Failure, 7);
        let second = key(LayerKind::Failure, 8);
        queue.request(first, 0.2);
        queue.request(second, 0.2);

        assert_eq!(queue.resolve().unwrap().cluster, first);
        assert_eq!(queue.resolve().unwrap().cluster, second);
        assert_eq!(queue.resolve(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn forgetting_a_layer_keeps_the_others() {
        let mut queue = AnnotationRequestQueue::new();
        queue.request(key(LayerKind::Model, 0), 0.0);
        queue.request(key(LayerKind::Failure, 0), 0.0);
        queue.forget_layer(LayerKind::Model);
        assert_eq!(queue.len(), 1);
        assert!(queue.forget(key(LayerKind::Failure, 0)).is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn works_as_a_sink() {
        let mut queue = AnnotationRequestQueue::new();
        let sink: &mut dyn AnnotationSink = &mut queue;
        sink.request_annotation(key(LayerKind::Model, 3), 0.1);
        assert_eq!(queue.len(), 1);
    }
}
