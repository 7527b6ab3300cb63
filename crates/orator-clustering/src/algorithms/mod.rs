//! Sequence-alignment algorithms.

pub mod dtw;

pub use dtw::{cost_path, distance, local_distance, sequence_distance, CostTable};
