//! # orator-core
//!
//! Foundation crate for the Orator pronunciation evaluator.
//! Defines nodes, descriptions, identifiers, errors, config, tracing and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;
pub mod tracing;

// Re-export the most commonly used types at the crate root.
pub use config::OratorConfig;
pub use errors::{OratorError, OratorResult};
pub use models::{ClusterId, ClusterKey, Description, LayerKind, Node, NodeId, NodeInfo};
