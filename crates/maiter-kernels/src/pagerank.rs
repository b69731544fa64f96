//! PageRank: `delta` starts at `0.2` for every vertex, spreads as
//! `delta * damping / out_degree` to each out-neighbour, and `value`
//! accumulates by simple sum.

use maiter_core::config::Config;
use maiter_core::engine;
use maiter_core::error::Result;
use maiter_core::kernel::{IterateKernel, SumDeltaTermChecker};
use maiter_core::sharder::ModSharder;
use std::sync::Arc;

/// Damping factor `d` in the PageRank recurrence `v = (1-d) + d * sum(...)`.
/// Fixed at `0.8`; exposed here as a constant rather than a kernel field
/// since every built-in use of this kernel shares it.
pub const DAMPING: f64 = 0.8;

/// PageRank's `IterateKernel<u64, f64, Vec<u64>>`: vertex keys are `u64`,
/// `V` is the rank mass (delta/value), `D` is the out-adjacency list.
#[derive(Debug, Clone, Copy, Default)]
pub struct PagerankKernel;

impl IterateKernel<u64, f64, Vec<u64>> for PagerankKernel {
    fn read_data(&self, line: &str) -> Option<(u64, Vec<u64>, usize)> {
        let (key_str, rest) = line.split_once('\t')?;
        let key: u64 = key_str.trim().parse().ok()?;
        let targets: Vec<u64> = rest
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        let size = targets.len();
        Some((key, targets, size))
    }

    fn init_v(&self, _k: &u64, _data: &Vec<u64>) -> f64 {
        0.0
    }

    fn init_c(&self, _k: &u64, _data: &Vec<u64>) -> f64 {
        0.2
    }

    fn process_delta_v(&self, _k: &u64, delta: f64, _value: &f64, _data: &Vec<u64>) -> f64 {
        delta
    }

    fn g_func(
        &self,
        _k: &u64,
        delta: &f64,
        _value: &f64,
        data: &Vec<u64>,
        output: &mut Vec<(u64, f64)>,
    ) {
        if data.is_empty() {
            return;
        }
        let share = delta * DAMPING / data.len() as f64;
        for &target in data {
            output.push((target, share));
        }
    }

    fn accumulate(&self, a: f64, b: &f64) -> f64 {
        a + b
    }

    fn priority(&self, _value: &f64, delta: &f64) -> f64 {
        *delta
    }

    fn default_v(&self) -> f64 {
        0.0
    }

    fn out_targets(&self, data: &Vec<u64>) -> Vec<u64> {
        data.clone()
    }
}

/// Entry point registered under the name `"pagerank"` in the CLI's
/// [`maiter_core::RunnerRegistry`].
pub fn run(config: &Config) -> Result<()> {
    tracing::debug!(damping = DAMPING, "dispatching pagerank kernel");
    let kernel: Arc<dyn IterateKernel<u64, f64, Vec<u64>>> = Arc::new(PagerankKernel);
    let sharder = Arc::new(ModSharder);
    let checker = Box::new(SumDeltaTermChecker {
        epsilon: config.term_epsilon,
    });
    engine::run(config, kernel, sharder, checker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_data_parses_tab_separated_adjacency() {
        let kernel = PagerankKernel;
        let (key, data, size) = kernel.read_data("3\t1 2 4").unwrap();
        assert_eq!(key, 3);
        assert_eq!(data, vec![1, 2, 4]);
        assert_eq!(size, 3);
    }

    #[test]
    fn read_data_rejects_lines_without_tab() {
        let kernel = PagerankKernel;
        assert!(kernel.read_data("no tab here").is_none());
    }

    #[test]
    fn dangling_vertex_with_no_out_edges_emits_nothing() {
        let kernel = PagerankKernel;
        let mut output = Vec::new();
        kernel.g_func(&1, &0.2, &0.0, &Vec::new(), &mut output);
        assert!(output.is_empty());
    }

    #[test]
    fn mass_spreads_evenly_with_damping_applied() {
        let kernel = PagerankKernel;
        let mut output = Vec::new();
        kernel.g_func(&1, &1.0, &0.0, &vec![2, 3], &mut output);
        assert_eq!(output.len(), 2);
        for (_, share) in &output {
            assert!((share - 0.4).abs() < 1e-12);
        }
    }

    #[test]
    fn init_c_seeds_every_vertex_with_point_two() {
        let kernel = PagerankKernel;
        assert!((kernel.init_c(&0, &Vec::new()) - 0.2).abs() < 1e-12);
    }
}
