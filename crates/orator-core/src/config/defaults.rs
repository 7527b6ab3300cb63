// Single source of truth for all default values.

// --- Clustering ---
/// Largest centroid distance at which two clusters may merge.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 4.0;
pub const DEFAULT_MAX_AGGLOMERATION_STEPS: usize = 1_000_000;
/// Below this annotation/member ratio a cluster asks for more descriptions.
pub const DEFAULT_DESCRIPTION_DENSITY_THRESHOLD: f64 = 0.3;

// --- Evaluation ---
pub const DEFAULT_SIMILAR_CLUSTER_RATIO: f64 = 0.3;
pub const DEFAULT_CORRECTION_COEFFICIENT: f64 = 1.0;
pub const DEFAULT_MAX_CORRECTION_STEPS: usize = 64;
pub const DEFAULT_EXHAUSTIVE_EXPANSION_BUDGET: usize = 100_000;
