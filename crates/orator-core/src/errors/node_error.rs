//! Node construction and feature-shape errors.

/// Errors raised while building a node or comparing feature sequences.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    #[error("node {node} has an empty feature sequence")]
    EmptyFeatures { node: String },

    #[error("node {node} has zero-dimension feature vectors")]
    ZeroDimension { node: String },

    #[error("node {node} frame {frame} has {found} dimensions, expected {expected}")]
    RaggedFeatures {
        node: String,
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("node {node} frame {frame} dimension {dimension} is not finite")]
    NonFiniteFeature {
        node: String,
        frame: usize,
        dimension: usize,
    },

    #[error("feature dimension mismatch: {left} has {left_dims}, {right} has {right_dims}")]
    DimensionMismatch {
        left: String,
        right: String,
        left_dims: usize,
        right_dims: usize,
    },
}
