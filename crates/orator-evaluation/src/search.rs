//! Cheapest correction route through the failure layer.
//!
//! Vertices are failure clusters, addressed by index. A route starts at
//! `start`, hops between failure clusters, and leaves through the exit edge
//! of its last vertex (the distance to that cluster's nearest success
//! cluster). Its cost is the CMV of all its transitions, exit included
//! (see [`cmv_cost`](crate::cmv::cmv_cost)).

use orator_core::errors::EvaluationError;

/// Distances among failure clusters plus each one's exit distance.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionGraph {
    start: usize,
    hops: Vec<Vec<f64>>,
    exits: Vec<f64>,
}

/// A route through the graph. `waypoints[0]` is the start vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub waypoints: Vec<usize>,
    pub cost: f64,
}

/// Result of the exhaustive search.
#[derive(Debug, Clone, PartialEq)]
pub struct ExhaustiveSearch {
    pub best: Option<RoutePlan>,
    pub expansions: usize,
    /// The budget ran out before every simple path was visited.
    pub truncated: bool,
}

impl CorrectionGraph {
    /// `hops` must be a square matrix matching `exits`, and `start` an index
    /// into it. Infinite entries mark impossible transitions.
    pub fn new(
        start: usize,
        hops: Vec<Vec<f64>>,
        exits: Vec<f64>,
    ) -> Result<Self, EvaluationError> {
        let n = exits.len();
        let malformed = |reason: String| Err(EvaluationError::MalformedCorrectionGraph { reason });
        if start >= n {
            return malformed(format!("start {start} outside {n} vertices"));
        }
        if hops.len() != n {
            return malformed(format!("{} hop rows for {n} exits", hops.len()));
        }
        if let Some((row, hop)) = hops.iter().enumerate().find(|(_, hop)| hop.len() != n) {
            return malformed(format!("hop row {row} has {} entries, expected {n}", hop.len()));
        }
        Ok(Self { start, hops, exits })
    }

    pub fn len(&self) -> usize {
        self.exits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exits.is_empty()
    }

    /// CMV cost of a route with `transitions` edges whose worst edge is `worst`.
    fn route_cost(coefficient: f64, transitions: usize, worst: f64) -> f64 {
        coefficient * (transitions as f64).sqrt() * worst
    }

    /// Layered bottleneck relaxation.
    ///
    /// `best[m][v]` is the smallest possible worst hop over walks of exactly
    /// `m` hops from the start to `v`. Each layer costs O(F²), and at most
    /// `min(max_hops, F - 1)` layers are built. Walks that revisit a vertex
    /// never beat their shortcut, so the winner is a simple path. Ties go to
    /// the route with fewer hops.
    pub fn bottleneck_route(&self, coefficient: f64, max_hops: usize) -> Option<RoutePlan> {
        let n = self.len();
        if self.start >= n {
            return None;
        }
        let layers = max_hops.min(n - 1);

        let mut current = vec![f64::INFINITY; n];
        current[self.start] = 0.0;
        let mut predecessors: Vec<Vec<usize>> = Vec::with_capacity(layers);

        let mut best: Option<(f64, usize, usize)> = None;
        let consider = |layer: &[f64], hops: usize, best: &mut Option<(f64, usize, usize)>| {
            for (v, &bottleneck) in layer.iter().enumerate() {
                let worst = bottleneck.max(self.exits[v]);
                if !worst.is_finite() {
                    continue;
                }
                let cost = Self::route_cost(coefficient, hops + 1, worst);
                if best.map_or(true, |(minimum, _, _)| cost < minimum) {
                    *best = Some((cost, hops, v));
                }
            }
        };

        consider(&current, 0, &mut best);
        for hops in 1..=layers {
            let mut next = vec![f64::INFINITY; n];
            let mut from = vec![usize::MAX; n];
            for (u, &reach) in current.iter().enumerate() {
                if !reach.is_finite() {
                    continue;
                }
                for v in 0..n {
                    if u == v {
                        continue;
                    }
                    let candidate = reach.max(self.hops[u][v]);
                    if candidate < next[v] {
                        next[v] = candidate;
                        from[v] = u;
                    }
                }
            }
            predecessors.push(from);
            consider(&next, hops, &mut best);
            current = next;
        }

        let (cost, hops, end) = best?;
        let mut waypoints = vec![end];
        let mut vertex = end;
        for layer in (0..hops).rev() {
            vertex = predecessors[layer][vertex];
            waypoints.push(vertex);
        }
        waypoints.reverse();
        Some(RoutePlan { waypoints, cost })
    }

    /// Depth-first enumeration of every simple path from the start, with an
    /// explicit stack, at most `max_hops` hops and `budget` expansions.
    pub fn exhaustive_route(
        &self,
        coefficient: f64,
        max_hops: usize,
        budget: usize,
    ) -> ExhaustiveSearch {
        let n = self.len();
        let mut search = ExhaustiveSearch {
            best: None,
            expansions: 0,
            truncated: false,
        };
        if self.start >= n {
            return search;
        }

        let mut on_path = vec![false; n];
        let mut path = vec![self.start];
        let mut worst_hops = vec![0.0_f64];
        // Next neighbour to try, per depth.
        let mut cursor = vec![0_usize];
        on_path[self.start] = true;
        self.offer(coefficient, &path, worst_hops[0], &mut search.best);

        while let Some(depth) = cursor.len().checked_sub(1) {
            let u = path[depth];
            let v = cursor[depth];
            if v >= n || depth >= max_hops {
                cursor.pop();
                path.pop();
                worst_hops.pop();
                on_path[u] = false;
                continue;
            }
            cursor[depth] += 1;
            if on_path[v] || !self.hops[u][v].is_finite() {
                continue;
            }
            if search.expansions >= budget {
                search.truncated = true;
                break;
            }
            search.expansions += 1;

            let worst = worst_hops[depth].max(self.hops[u][v]);
            path.push(v);
            worst_hops.push(worst);
            cursor.push(0);
            on_path[v] = true;
            self.offer(coefficient, &path, worst, &mut search.best);
        }
        search
    }

    fn offer(
        &self,
        coefficient: f64,
        path: &[usize],
        worst_hop: f64,
        best: &mut Option<RoutePlan>,
    ) {
        let Some(&last) = path.last() else {
            return;
        };
        let worst = worst_hop.max(self.exits[last]);
        if !worst.is_finite() {
            return;
        }
        let cost = Self::route_cost(coefficient, path.len(), worst);
        if best.as_ref().map_or(true, |plan| cost < plan.cost) {
            *best = Some(RoutePlan {
                waypoints: path.to_vec(),
                cost,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = f64::INFINITY;

    fn symmetric(n: usize, edges: &[(usize, usize, f64)]) -> Vec<Vec<f64>> {
        let mut hops = vec![vec![INF; n]; n];
        for (i, row) in hops.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        for &(a, b, d) in edges {
            hops[a][b] = d;
            hops[b][a] = d;
        }
        hops
    }

    #[test]
    fn direct_exit_when_nothing_helps() {
        let hops = symmetric(2, &[(0, 1, 10.0)]);
        let graph = CorrectionGraph::new(0, hops, vec![3.0, 1.0]).unwrap();
        let plan = graph.bottleneck_route(1.0, 8).unwrap();
        assert_eq!(plan.waypoints, vec![0]);
        assert_eq!(plan.cost, 3.0);
    }

    #[test]
    fn detour_through_failures() {
        // Exit from 0 costs 9; 0 -> 1 -> 2 then exit is at most 4 per hop.
        let hops = symmetric(3, &[(0, 1, 4.0), (1, 2, 3.0), (0, 2, 8.0)]);
        let graph = CorrectionGraph::new(0, hops, vec![9.0, 7.0, 4.0]).unwrap();
        let plan = graph.bottleneck_route(1.0, 8).unwrap();
        assert_eq!(plan.waypoints, vec![0, 1, 2]);
        assert!((plan.cost - 3.0_f64.sqrt() * 4.0).abs() < 1e-12);

        let reference = graph.exhaustive_route(1.0, 8, 1_000);
        assert!(!reference.truncated);
        assert_eq!(reference.best, Some(plan));
    }

    #[test]
    fn hop_cap_limits_detours() {
        let hops = symmetric(3, &[(0, 1, 4.0), (1, 2, 3.0)]);
        let graph = CorrectionGraph::new(0, hops, vec![9.0, 7.0, 4.0]).unwrap();
        let plan = graph.bottleneck_route(1.0, 1).unwrap();
        // 0 -> 1 then exit: sqrt(2) * 7 = 9.9 loses to exiting directly at 9.
        assert_eq!(plan.waypoints, vec![0]);
    }

    #[test]
    fn unreachable_success_layer_yields_nothing() {
        let hops = symmetric(2, &[(0, 1, 1.0)]);
        let graph = CorrectionGraph::new(0, hops, vec![INF, INF]).unwrap();
        assert_eq!(graph.bottleneck_route(1.0, 8), None);
        assert_eq!(graph.exhaustive_route(1.0, 8, 100).best, None);
    }

    #[test]
    fn equal_costs_prefer_fewer_hops() {
        // Every route has worst edge 0, so every cost is 0.
        let hops = symmetric(3, &[(0, 1, 0.0), (1, 2, 0.0), (0, 2, 0.0)]);
        let graph = CorrectionGraph::new(0, hops, vec![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(graph.bottleneck_route(1.0, 8).unwrap().waypoints, vec![0]);
        assert_eq!(graph.exhaustive_route(1.0, 8, 100).best.unwrap().waypoints, vec![0]);
    }

    #[test]
    fn exhaustive_budget_truncates() {
        let n = 8;
        let hops = vec![vec![1.0; n]; n];
        let graph = CorrectionGraph::new(0, hops, vec![2.0; n]).unwrap();
        let search = graph.exhaustive_route(1.0, n, 10);
        assert!(search.truncated);
        assert_eq!(search.expansions, 10);
        assert!(search.best.is_some());
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let square = symmetric(2, &[(0, 1, 1.0)]);
        assert!(CorrectionGraph::new(2, square.clone(), vec![1.0, 1.0]).is_err());
        assert!(CorrectionGraph::new(0, square.clone(), vec![1.0, 1.0, 1.0]).is_err());
        assert!(CorrectionGraph::new(0, Vec::new(), Vec::new()).is_err());

        let ragged = vec![vec![0.0, 1.0], vec![1.0]];
        let err = CorrectionGraph::new(0, ragged, vec![1.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::MalformedCorrectionGraph {
                reason: "hop row 1 has 1 entries, expected 2".to_string()
            }
        );
        assert!(CorrectionGraph::new(1, square, vec![1.0, 1.0]).is_ok());
    }
}
