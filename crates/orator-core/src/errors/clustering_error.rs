/// Clustering subsystem errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClusteringError {
    #[error("cluster {cluster} not found in {layer} layer")]
    UnknownCluster { layer: String, cluster: u64 },

    #[error("node {node} not found in {layer} layer")]
    UnknownNode { layer: String, node: String },

    #[error("cluster {cluster} has no members")]
    EmptyCluster { cluster: u64 },
}
