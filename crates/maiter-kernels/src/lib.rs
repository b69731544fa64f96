//! Built-in `IterateKernel` implementations over `maiter-core`'s engine:
//! PageRank, single-source shortest paths, and Katz centrality.
//!
//! These exist to make the engine runnable end-to-end and to cover
//! end-to-end test scenarios; none of them are part of the core hard
//! subsystem the engine itself provides.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod katz;
pub mod pagerank;
pub mod sssp;

pub use katz::KatzKernel;
pub use pagerank::PagerankKernel;
pub use sssp::{PendingCountTermChecker, SsspKernel};

use maiter_core::registry::RunnerRegistry;

/// Registers every built-in kernel's runner under its canonical name:
/// `"pagerank"`, `"sssp"`, `"katz"`. Callers (the CLI's `main`) build the
/// registry explicitly rather than relying on hidden static-initializer
/// registration, avoiding the need for a Rust equivalent of C++ global
/// constructors.
pub fn register_builtin(registry: &mut RunnerRegistry) {
    registry.register("pagerank", pagerank::run);
    registry.register("sssp", sssp::run);
    registry.register("katz", katz::run);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_three_builtin_kernels() {
        let mut registry = RunnerRegistry::new();
        register_builtin(&mut registry);
        assert_eq!(registry.names(), vec!["katz", "pagerank", "sssp"]);
    }
}
