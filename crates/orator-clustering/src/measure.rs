//! The metric seam between cached entities and their distance functions.

use std::fmt::Debug;
use std::hash::Hash;

use orator_core::errors::OratorResult;
use orator_core::models::{Node, NodeId, SharedNode};

use crate::algorithms::dtw;

/// An entity that can be stored in a [`DistanceCache`](crate::DistanceCache).
///
/// `Context` carries whatever the metric needs beyond the two operands; a
/// cluster, for instance, measures through its layer's node cache.
pub trait Measurable {
    type Id: Clone + Eq + Hash + Debug;
    type Context: ?Sized;

    fn id(&self) -> &Self::Id;

    /// Distance to `other`. Must be symmetric.
    fn measure(&self, other: &Self, context: &mut Self::Context) -> OratorResult<f64>;
}

impl Measurable for SharedNode {
    type Id = NodeId;
    type Context = ();

    fn id(&self) -> &NodeId {
        Node::id(self)
    }

    fn measure(&self, other: &Self, _context: &mut ()) -> OratorResult<f64> {
        Ok(dtw::distance(self, other))
    }
}
