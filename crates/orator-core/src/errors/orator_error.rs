use super::{ClusteringError, ConfigError, EvaluationError, NodeError};

/// Top-level error aggregating every subsystem via `From` conversions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OratorError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Clustering error: {0}")]
    Clustering(#[from] ClusteringError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias used across the workspace.
pub type OratorResult<T> = Result<T, OratorError>;
