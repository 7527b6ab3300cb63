//! Partition quality metrics.

use crate::layer::Layer;

/// Davies-Bouldin index of a layer's clusters. Lower is better.
///
/// For every cluster A, the worst ratio `(acd(A) + acd(B)) / d(A, B)` over
/// the other clusters B, averaged over all clusters. Pairs that cannot be
/// compared (infinite distance, or coincident centroids with no spread) add
/// nothing. `None` with fewer than two clusters.
pub fn davies_bouldin(layer: &Layer) -> Option<f64> {
    let clusters: Vec<_> = layer.clusters().collect();
    if clusters.len() < 2 {
        return None;
    }

    let mut sum = 0.0;
    for a in &clusters {
        let mut worst = 0.0_f64;
        for b in &clusters {
            if a.id() == b.id() {
                continue;
            }
            let spread = a.average_centroid_distance() + b.average_centroid_distance();
            let separation = layer.peek_cluster_distance(a, b);
            let ratio = spread / separation;
            if !ratio.is_nan() {
                worst = worst.max(ratio);
            }
        }
        sum += worst;
    }
    Some(sum / clusters.len() as f64)
}
