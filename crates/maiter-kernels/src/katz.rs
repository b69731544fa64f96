//! Katz centrality: PageRank-shaped recurrence with an attenuation factor
//! `β < 1` and an additive constant `α` applied every iteration, rather
//! than PageRank's damping-only spread.
//!
//! Follows `PagerankKernel`'s structure (same read_data/accumulate
//! shape); the recurrence itself — `x_i = α + β · Σ_j A_ij x_j` — is the
//! standard Katz centrality definition.

use maiter_core::config::Config;
use maiter_core::engine;
use maiter_core::error::Result;
use maiter_core::kernel::{IterateKernel, SumDeltaTermChecker};
use maiter_core::sharder::ModSharder;
use std::sync::Arc;

/// Katz's `IterateKernel<u64, f64, Vec<u64>>`: `beta` attenuates spread
/// messages, `alpha` is the per-vertex constant added at load time via
/// `init_c`.
#[derive(Debug, Clone, Copy)]
pub struct KatzKernel {
    /// Attenuation factor, must be `0 < beta < 1 / max_out_degree` for the
    /// recurrence to converge (caller responsibility, not checked here).
    pub beta: f64,
    /// Additive constant seeded as every vertex's initial delta.
    pub alpha: f64,
}

impl Default for KatzKernel {
    fn default() -> Self {
        Self {
            beta: 0.1,
            alpha: 1.0,
        }
    }
}

impl IterateKernel<u64, f64, Vec<u64>> for KatzKernel {
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
        self.alpha
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
        let message = delta * self.beta;
        for &target in data {
            output.push((target, message));
        }
    }

    fn accumulate(&self, a: f64, b: &f64) -> f64 {
        a + b
    }

    fn priority(&self, _value: &f64, delta: &f64) -> f64 {
        delta.abs()
    }

    fn default_v(&self) -> f64 {
        0.0
    }

    fn out_targets(&self, data: &Vec<u64>) -> Vec<u64> {
        data.clone()
    }
}

/// Entry point registered under the name `"katz"`.
pub fn run(config: &Config) -> Result<()> {
    let kernel = KatzKernel::default();
    tracing::debug!(beta = kernel.beta, alpha = kernel.alpha, "dispatching katz kernel");
    let kernel: Arc<dyn IterateKernel<u64, f64, Vec<u64>>> = Arc::new(kernel);
    let sharder = Arc::new(ModSharder);
    let checker = Box::new(SumDeltaTermChecker {
        epsilon: config.term_epsilon,
    });
    engine::run(config, kernel, sharder, checker)
}
