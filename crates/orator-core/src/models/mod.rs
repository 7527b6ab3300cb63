//! Domain models shared by every Orator crate.

pub mod description;
pub mod identifiers;
pub mod layer_kind;
pub mod node;

pub use description::{Description, DescriptionInfo};
pub use identifiers::{ClusterId, ClusterKey, NodeId};
pub use layer_kind::LayerKind;
pub use node::{Node, NodeInfo, SharedNode};
