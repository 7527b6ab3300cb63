//! # orator-clustering
//!
//! Leaf-to-root building blocks of pronunciation clustering:
//! DTW distance → memoized distance cache → medoid cluster → layer → analyzer.
//! Agglomeration merges random mutual-nearest pairs until no valid merge remains.

pub mod algorithms;
pub mod analyzer;
pub mod cache;
pub mod cluster;
pub mod layer;
pub mod measure;
pub mod quality;

pub use analyzer::{AgglomerationOutcome, ClusterAnalyzer, StopReason};
pub use cache::DistanceCache;
pub use cluster::{Cluster, NodeCache};
pub use layer::{ClusterStatus, Layer, LayerStatus};
pub use measure::Measurable;
