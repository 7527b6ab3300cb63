//! Dynamic Time Warping over feature sequences.
//!
//! Time axis: DTW alignment. Feature axis: Euclidean distance per frame pair.
//! Full (L1+1)×(L2+1) table, +∞ borders except the origin, no band constraint
//! and no early termination.

use orator_core::errors::NodeError;
use orator_core::models::Node;

/// Euclidean distance between two frames.
/// Frames of different dimension are infinitely far apart.
pub fn local_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Accumulated-cost table of one alignment.
#[derive(Debug, Clone)]
pub struct CostTable {
    rows: usize,
    cols: usize,
    cells: Vec<f64>,
}

impl CostTable {
    /// Fill the table for sequences `a` (rows) and `b` (columns).
    pub fn fill(a: &[Vec<f32>], b: &[Vec<f32>]) -> Self {
        let rows = a.len() + 1;
        let cols = b.len() + 1;
        let mut cells = vec![f64::INFINITY; rows * cols];
        cells[0] = 0.0;

        for i in 1..rows {
            for j in 1..cols {
                let cost = local_distance(&a[i - 1], &b[j - 1]);
                let insertion = cells[(i - 1) * cols + j];
                let deletion = cells[i * cols + j - 1];
                let matched = cells[(i - 1) * cols + j - 1];
                cells[i * cols + j] = cost + insertion.min(deletion).min(matched);
            }
        }

        Self { rows, cols, cells }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.cols + j]
    }

    /// Total alignment cost, `table[L1][L2]`.
    pub fn total(&self) -> f64 {
        self.get(self.rows - 1, self.cols - 1)
    }

    /// Cumulative costs along the backtracked warping path, front to back.
    ///
    /// Holds `max(L1, L2) + 1` entries; when the warping path is longer than
    /// that, only its tail is recorded.
    pub fn backtrack(&self) -> Vec<f64> {
        let (mut i, mut j) = (self.rows - 1, self.cols - 1);
        let len = i.max(j) + 1;
        let mut path = vec![0.0; len];

        for slot in (0..len).rev() {
            path[slot] = self.get(i, j);
            if i == 0 && j == 0 {
                break;
            }
            (i, j) = self.predecessor(i, j);
        }
        path
    }

    /// Cheapest of {diagonal, up, left}; earlier candidates win ties.
    fn predecessor(&self, i: usize, j: usize) -> (usize, usize) {
        let candidates = [
            (i > 0 && j > 0).then(|| (i - 1, j - 1)),
            (i > 0).then(|| (i - 1, j)),
            (j > 0).then(|| (i, j - 1)),
        ];

        let mut best: Option<(f64, (usize, usize))> = None;
        for cell in candidates.into_iter().flatten() {
            let value = self.get(cell.0, cell.1);
            if best.map_or(true, |(minimum, _)| value < minimum) {
                best = Some((value, cell));
            }
        }
        best.map_or((0, 0), |(_, cell)| cell)
    }

    /// Per-step cost deltas along the warping path, scaled into [0, 1].
    ///
    /// The largest step maps to exactly 1.0. A path with no cost at all
    /// (identical sequences) yields all zeros.
    pub fn cost_profile(&self) -> Vec<f64> {
        let cumulative = self.backtrack();

        let mut previous = 0.0;
        let deltas: Vec<f64> = cumulative
            .iter()
            .map(|&value| {
                let delta = value - previous;
                previous = value;
                delta
            })
            .collect();

        let maximum = deltas.iter().copied().fold(0.0_f64, f64::max);
        if maximum <= 0.0 || !maximum.is_finite() {
            return vec![0.0; deltas.len()];
        }
        deltas.into_iter().map(|delta| delta / maximum).collect()
    }
}

/// DTW distance between two raw feature sequences.
pub fn sequence_distance(a: &[Vec<f32>], b: &[Vec<f32>]) -> f64 {
    CostTable::fill(a, b).total()
}

/// DTW distance between two nodes. +∞ when their dimensions differ.
pub fn distance(a: &Node, b: &Node) -> f64 {
    sequence_distance(a.features(), b.features())
}

/// Normalized accuracy profile of `b` aligned against `a`.
pub fn cost_path(a: &Node, b: &Node) -> Result<Vec<f64>, NodeError> {
    if a.dimensions() != b.dimensions() {
        return Err(NodeError::DimensionMismatch {
            left: a.id().to_string(),
            right: b.id().to_string(),
            left_dims: a.dimensions(),
            right_dims: b.dimensions(),
        });
    }
    Ok(CostTable::fill(a.features(), b.features()).cost_profile())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, frames: &[&[f32]]) -> Node {
        Node::new(id, frames.iter().map(|f| f.to_vec()).collect()).unwrap()
    }

    #[test]
    fn single_frames_reduce_to_euclidean() {
        let a = node("a", &[&[1.0, 2.0, 3.0]]);
        let b = node("b", &[&[4.0, 6.0, 3.0]]);
        assert_eq!(distance(&a, &b), 5.0);
    }

    #[test]
    fn identical_content_is_zero_apart() {
        let frames: &[&[f32]] = &[&[0.5, 1.5], &[2.0, -1.0], &[3.25, 0.0]];
        let a = node("a", frames);
        let copy = node("copy", frames);
        assert_eq!(distance(&a, &copy), 0.0);
    }

    #[test]
    fn dimension_mismatch_is_infinite_not_a_panic() {
        let a = node("a", &[&[1.0, 2.0]]);
        let b = node("b", &[&[1.0, 2.0, 3.0]]);
        assert!(distance(&a, &b).is_infinite());
        assert!(matches!(
            cost_path(&a, &b),
            Err(NodeError::DimensionMismatch { left_dims: 2, right_dims: 3, .. })
        ));
    }

    #[test]
    fn warping_absorbs_repeated_frames() {
        let a = node("a", &[&[0.0], &[1.0], &[2.0]]);
        let stretched = node("b", &[&[0.0], &[1.0], &[1.0], &[1.0], &[2.0]]);
        assert_eq!(distance(&a, &stretched), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = node("a", &[&[0.0], &[3.0], &[1.0]]);
        let b = node("b", &[&[1.0], &[2.0]]);
        assert_eq!(distance(&a, &b), distance(&b, &a));
    }

    #[test]
    fn table_borders_are_infinite() {
        let table = CostTable::fill(&[vec![1.0]], &[vec![2.0], vec![3.0]]);
        assert_eq!(table.get(0, 0), 0.0);
        assert!(table.get(0, 1).is_infinite());
        assert!(table.get(1, 0).is_infinite());
        assert_eq!(table.get(1, 1), 1.0);
        assert_eq!(table.get(1, 2), 3.0);
    }

    #[test]
    fn backtrack_records_cumulative_costs() {
        // a = [0, 1], b = [0, 2]: diagonal path 0 → 0 → 1.
        let table = CostTable::fill(&[vec![0.0], vec![1.0]], &[vec![0.0], vec![2.0]]);
        assert_eq!(table.backtrack(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn profile_is_normalized_to_largest_step() {
        let a = node("a", &[&[0.0], &[1.0], &[5.0]]);
        let b = node("b", &[&[0.0], &[3.0], &[5.0]]);
        let profile = cost_path(&a, &b).unwrap();
        assert_eq!(profile.len(), 4);
        assert!(profile.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(profile.iter().copied().fold(0.0, f64::max), 1.0);
    }

    #[test]
    fn identical_sequences_give_flat_profile() {
        let frames: &[&[f32]] = &[&[1.0], &[2.0]];
        let profile = cost_path(&node("a", frames), &node("b", frames)).unwrap();
        assert_eq!(profile, vec![0.0, 0.0, 0.0]);
    }
}
