//! The runner registry: an explicit map from kernel name to its entry
//! point, built by each binary's `main` rather than populated by hidden
//! static-initializer side effects.
//!
//! Upstream dispatches kernels through a registration macro that relies
//! on global constructors running before `main`. Rust has no equivalent
//! without reaching for a crate like `inventory`, and avoiding that kind
//! of initialization-order dependency is worth the extra boilerplate.
//! Each kernel crate instead exposes a plain `fn(&Config) -> Result<()>`
//! and registers it explicitly.

use std::collections::HashMap;

use crate::config::Config;
use crate::error::{Error, Result};

/// A kernel's entry point: given a fully validated [`Config`], load its
/// partition, run the cluster to convergence, and write results.
pub type Runner = fn(&Config) -> Result<()>;

/// Explicit name-to-runner map, built by `main` before dispatch.
#[derive(Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Runner>,
}

impl RunnerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            runners: HashMap::new(),
        }
    }

    /// Registers `runner` under `name`, overwriting any prior entry for
    /// the same name.
    pub fn register(&mut self, name: impl Into<String>, runner: Runner) -> &mut Self {
        self.runners.insert(name.into(), runner);
        self
    }

    /// Looks up and invokes the runner named `name` with `config`.
    ///
    /// # Errors
    /// Returns [`Error::UnknownKernel`] if no runner was registered under
    /// that name.
    pub fn dispatch(&self, name: &str, config: &Config) -> Result<()> {
        let runner = self
            .runners
            .get(name)
            .ok_or_else(|| Error::UnknownKernel(name.to_string()))?;
        runner(config)
    }

    /// Names of every registered runner, for `--help`-style listings.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
