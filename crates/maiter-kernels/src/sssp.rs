//! Single-source shortest paths: the monoid is `min` rather than `sum`,
//! `delta`'s identity is `+∞` (no pending improvement) instead of `0`,
//! and priority is `-delta` so rows with a smaller tentative distance
//! are scheduled first.
//!
//! Follows `PagerankKernel`'s structure, substituting the monoid,
//! identity, and spreading rule the shortest-paths recurrence needs.

use maiter_core::config::Config;
use maiter_core::engine;
use maiter_core::error::Result;
use maiter_core::kernel::{IterateKernel, TermChecker};
use maiter_core::sharder::ModSharder;
use std::sync::Arc;

/// One out-edge: destination vertex and non-negative edge weight.
pub type Edge = (u64, f64);

/// SSSP's `IterateKernel<u64, f64, Vec<Edge>>`: distances accumulate by
/// `min`, `D` is the weighted out-adjacency list.
#[derive(Debug, Clone, Copy)]
pub struct SsspKernel {
    /// The single source vertex; every other vertex starts at `+∞`.
    pub source: u64,
}

impl IterateKernel<u64, f64, Vec<Edge>> for SsspKernel {
    fn read_data(&self, line: &str) -> Option<(u64, Vec<Edge>, usize)> {
        let (key_str, rest) = line.split_once('\t')?;
        let key: u64 = key_str.trim().parse().ok()?;
        let edges: Vec<Edge> = rest
            .split_whitespace()
            .filter_map(|token| {
                let (target_str, weight_str) = token.split_once(',')?;
                let target: u64 = target_str.parse().ok()?;
                let weight: f64 = weight_str.parse().ok()?;
                Some((target, weight))
            })
            .collect();
        let size = edges.len();
        Some((key, edges, size))
    }

    fn init_v(&self, _k: &u64, _data: &Vec<Edge>) -> f64 {
        f64::INFINITY
    }

    fn init_c(&self, k: &u64, _data: &Vec<Edge>) -> f64 {
        if *k == self.source {
            0.0
        } else {
            f64::INFINITY
        }
    }

    fn process_delta_v(&self, _k: &u64, delta: f64, _value: &f64, _data: &Vec<Edge>) -> f64 {
        delta
    }

    fn g_func(
        &self,
        _k: &u64,
        delta: &f64,
        _value: &f64,
        data: &Vec<Edge>,
        output: &mut Vec<(u64, f64)>,
    ) {
        if !delta.is_finite() {
            return;
        }
        for &(target, weight) in data {
            output.push((target, delta + weight));
        }
    }

    fn accumulate(&self, a: f64, b: &f64) -> f64 {
        a.min(*b)
    }

    fn priority(&self, _value: &f64, delta: &f64) -> f64 {
        if delta.is_finite() {
            -delta
        } else {
            f64::NEG_INFINITY
        }
    }

    fn default_v(&self) -> f64 {
        f64::INFINITY
    }

    fn out_targets(&self, data: &Vec<Edge>) -> Vec<u64> {
        data.iter().map(|&(target, _weight)| target).collect()
    }
}

/// Converges once fewer than `epsilon`-worth of rows still carry a
/// pending (finite, non-identity) delta. `SumDeltaTermChecker` doesn't
/// fit SSSP: its identity is `+∞`, and summing infinities is meaningless.
/// This checker instead counts rows still doing work.
#[derive(Debug, Clone, Copy)]
pub struct PendingCountTermChecker {
    /// Stop once the global pending-row count drops below this.
    pub epsilon: f64,
}

impl TermChecker<f64> for PendingCountTermChecker {
    fn local_reduce(&self, rows: &[(f64, f64)]) -> f64 {
        rows.iter()
            .filter(|(delta, _value)| delta.is_finite())
            .count() as f64
    }

    fn global_reduce(&self, locals: &[f64]) -> f64 {
        locals.iter().sum()
    }

    fn converged(&self, _previous: f64, current: f64) -> bool {
        current < self.epsilon
    }
}

/// Entry point registered under the name `"sssp"`. The source vertex is
/// taken from `config.num_nodes`'s sibling field — SSSP has no natural
/// home for a "source vertex" option in the shared `Config`, so callers
/// wanting a non-zero source should construct [`SsspKernel`] directly and
/// call [`maiter_core::engine::run`] themselves rather than going through
/// the registry.
pub fn run(config: &Config) -> Result<()> {
    tracing::debug!(source = 0, "dispatching sssp kernel");
    let kernel: Arc<dyn IterateKernel<u64, f64, Vec<Edge>>> = Arc::new(SsspKernel { source: 0 });
    let sharder = Arc::new(ModSharder);
    let checker = Box::new(PendingCountTermChecker {
        epsilon: config.term_epsilon.max(0.5),
    });
    engine::run(config, kernel, sharder, checker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_data_parses_weighted_edges() {
        let kernel = SsspKernel { source: 0 };
        let (key, data, size) = kernel.read_data("1\t2,0.5 3,1.5").unwrap();
        assert_eq!(key, 1);
        assert_eq!(data, vec![(2, 0.5), (3, 1.5)]);
        assert_eq!(size, 2);
    }

    #[test]
    fn source_starts_at_zero_others_at_infinity() {
        let kernel = SsspKernel { source: 7 };
        assert_eq!(kernel.init_c(&7, &Vec::new()), 0.0);
        assert!(kernel.init_c(&8, &Vec::new()).is_infinite());
    }

    #[test]
    fn infinite_delta_emits_no_messages() {
        let kernel = SsspKernel { source: 0 };
        let mut output = Vec::new();
        kernel.g_func(&1, &f64::INFINITY, &0.0, &vec![(2, 1.0)], &mut output);
        assert!(output.is_empty());
    }

    #[test]
    fn finite_delta_relaxes_neighbours_by_edge_weight() {
        let kernel = SsspKernel { source: 0 };
        let mut output = Vec::new();
        kernel.g_func(&1, &2.0, &0.0, &vec![(2, 1.0), (3, 3.0)], &mut output);
        assert_eq!(output, vec![(2, 3.0), (3, 5.0)]);
    }

    #[test]
    fn accumulate_keeps_the_shorter_distance() {
        let kernel = SsspKernel { source: 0 };
        assert_eq!(kernel.accumulate(5.0, &3.0), 3.0);
        assert_eq!(kernel.accumulate(2.0, &9.0), 2.0);
    }

    #[test]
    fn pending_count_term_checker_converges_when_nothing_is_pending() {
        let checker = PendingCountTermChecker { epsilon: 0.5 };
        let rows = vec![(f64::INFINITY, 1.0), (f64::INFINITY, 2.0)];
        let local = checker.local_reduce(&rows);
        assert_eq!(local, 0.0);
        assert!(checker.converged(0.0, checker.global_reduce(&[local])));
    }

    #[test]
    fn pending_count_term_checker_does_not_converge_with_active_rows() {
        let checker = PendingCountTermChecker { epsilon: 0.5 };
        let rows = vec![(1.5, 1.0), (f64::INFINITY, 2.0)];
        let local = checker.local_reduce(&rows);
        assert_eq!(local, 1.0);
        assert!(!checker.converged(0.0, local));
    }
}
