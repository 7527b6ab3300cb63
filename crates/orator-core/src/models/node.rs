//! A single recorded pronunciation attempt.

use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Description, NodeId};
use crate::errors::NodeError;

/// Nodes are shared between a layer's pool and the clusters that contain them.
pub type SharedNode = Arc<Node>;

/// Recording metadata, carried through to reports untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    pub source: Option<PathBuf>,
    pub recorder: Option<String>,
    pub recorder_age: Option<u32>,
    pub recorder_sex: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// An ordered sequence of fixed-dimension feature vectors.
///
/// Identity is the [`NodeId`] alone: two nodes with the same id are equal
/// regardless of content. Features never change after construction; only the
/// description list may grow.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    features: Vec<Vec<f32>>,
    dimensions: usize,
    info: NodeInfo,
    descriptions: RwLock<Vec<Description>>,
}

impl Node {
    /// Build a node, rejecting shapes that would poison DTW with NaNs.
    pub fn new(id: impl Into<NodeId>, features: Vec<Vec<f32>>) -> Result<Self, NodeError> {
        let id = id.into();
        let dimensions = match features.first() {
            Some(first) => first.len(),
            None => {
                return Err(NodeError::EmptyFeatures {
                    node: id.to_string(),
                })
            }
        };
        if dimensions == 0 {
            return Err(NodeError::ZeroDimension {
                node: id.to_string(),
            });
        }

        for (frame, vector) in features.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(NodeError::RaggedFeatures {
                    node: id.to_string(),
                    frame,
                    expected: dimensions,
                    found: vector.len(),
                });
            }
            if let Some(dimension) = vector.iter().position(|v| !v.is_finite()) {
                return Err(NodeError::NonFiniteFeature {
                    node: id.to_string(),
                    frame,
                    dimension,
                });
            }
        }

        Ok(Self {
            id,
            features,
            dimensions,
            info: NodeInfo::default(),
            descriptions: RwLock::new(Vec::new()),
        })
    }

    pub fn with_info(mut self, info: NodeInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_descriptions(self, descriptions: Vec<Description>) -> Self {
        *self
            .descriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = descriptions;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn features(&self) -> &[Vec<f32>] {
        &self.features
    }

    /// Number of feature frames.
    pub fn frame_count(&self) -> usize {
        self.features.len()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn info(&self) -> &NodeInfo {
        &self.info
    }

    /// Snapshot of the current descriptions.
    pub fn descriptions(&self) -> Vec<Description> {
        self.descriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn description_count(&self) -> usize {
        self.descriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn add_description(&self, description: Description) {
        self.descriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(description);
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
