//! Compensated-maximum-value (CMV) paths.
//!
//! A route is as hard as its hardest transition, compensated by how many
//! transitions it takes: `coefficient * sqrt(n) * max(d1, ..., dn)` for a
//! route with `n` transitions of distances `d1..dn`.

use serde::Serialize;

/// CMV cost of a route given its transition distances.
/// `None` for a route without transitions.
pub fn cmv_cost(coefficient: f64, distances: &[f64]) -> Option<f64> {
    if distances.is_empty() {
        return None;
    }
    let worst = distances.iter().copied().fold(0.0_f64, f64::max);
    Some(coefficient * (distances.len() as f64).sqrt() * worst)
}

/// An ordered sequence of steps with the distance of every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CmvPath<T> {
    steps: Vec<T>,
    distances: Vec<f64>,
}

impl<T> CmvPath<T> {
    pub fn new(start: T) -> Self {
        Self {
            steps: vec![start],
            distances: Vec::new(),
        }
    }

    /// Append a step reached from the current last step at `distance`.
    pub fn push(&mut self, step: T, distance: f64) -> &mut Self {
        self.steps.push(step);
        self.distances.push(distance);
        self
    }

    pub fn steps(&self) -> &[T] {
        &self.steps
    }

    /// Transition distances; one fewer than the steps.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn transitions(&self) -> usize {
        self.distances.len()
    }

    pub fn first(&self) -> Option<&T> {
        self.steps.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.steps.last()
    }

    /// Largest transition distance, 0 for a single step.
    pub fn worst_edge(&self) -> f64 {
        self.distances.iter().copied().fold(0.0_f64, f64::max)
    }

    /// `None` for a single-step path, which has no cost.
    pub fn cost(&self, coefficient: f64) -> Option<f64> {
        cmv_cost(coefficient, &self.distances)
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<f64>) {
        (self.steps, self.distances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_counts_transitions() {
        let mut path = CmvPath::new('a');
        path.push('b', 1.0).push('c', 5.0).push('d', 2.0);
        assert_eq!(path.steps(), &['a', 'b', 'c', 'd']);
        assert_eq!(path.worst_edge(), 5.0);
        assert_eq!(path.cost(1.0), Some(3.0_f64.sqrt() * 5.0));
        assert_eq!(path.cost(2.0), Some(2.0 * 3.0_f64.sqrt() * 5.0));
    }

    #[test]
    fn single_step_has_no_cost() {
        let path = CmvPath::new(7);
        assert_eq!(path.cost(1.0), None);
        assert_eq!(path.worst_edge(), 0.0);
        assert_eq!(cmv_cost(1.0, &[]), None);
    }

    #[test]
    fn detour_can_beat_a_hard_jump() {
        // One jump of 9 vs three hops of at most 4.
        let direct = cmv_cost(1.0, &[9.0]).unwrap();
        let detour = cmv_cost(1.0, &[4.0, 3.0, 4.0]).unwrap();
        assert!(detour < direct);
    }
}
