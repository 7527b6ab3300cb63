//! Error handling for Orator.
//! One error enum per subsystem, `thiserror` only, aggregated by [`OratorError`].

pub mod clustering_error;
pub mod config_error;
pub mod evaluation_error;
pub mod node_error;
pub mod orator_error;

pub use clustering_error::ClusteringError;
pub use config_error::ConfigError;
pub use evaluation_error::EvaluationError;
pub use node_error::NodeError;
pub use orator_error::{OratorError, OratorResult};
