//! Configuration loading via `maiter.toml`, `MAITER_*` environment
//! variables, and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (values set directly on [`Config`] by the caller)
//! 2. Environment variables (`MAITER_*`)
//! 3. Configuration file (`maiter.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Top-level engine configuration: the CLI/config option table plus the
/// ambient additions every runnable binary needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input partition directory (`--graph_dir`).
    pub graph_dir: String,
    /// Output directory for dumped results (`--result_dir`).
    pub result_dir: String,
    /// Expected total vertex count; a pre-sizing hint (`--num_nodes`).
    pub num_nodes: u64,
    /// Priority-scheduler fraction `p` in `(0, 1]` (`--portion`).
    pub portion: f64,
    /// High-degree threshold `D` enabling the copy-vertex path (`--degree`).
    pub degree: u64,
    /// Shard count, equal to worker count (`--shard`).
    pub shard: usize,
    /// Interval between termination-detector reductions, in seconds.
    pub term_interval_secs: u64,
    /// Convergence threshold `ε` for the termination detector.
    pub term_epsilon: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph_dir: "graph".to_string(),
            result_dir: "result".to_string(),
            num_nodes: 0,
            portion: 1.0,
            degree: u64::MAX,
            shard: 1,
            term_interval_secs: 1,
            term_epsilon: 1e-4,
        }
    }
}

impl Config {
    /// Loads configuration layering a `maiter.toml` file (if present) and
    /// `MAITER_*` environment variables over the defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        } else if Path::new("maiter.toml").exists() {
            figment = figment.merge(Toml::file("maiter.toml"));
        }

        let figment = figment.merge(Env::prefixed("MAITER_"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Validates the configuration, returning a [`Error::Config`] on the
    /// first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.shard == 0 {
            return Err(Error::Config("shard count must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.portion) || self.portion <= 0.0 {
            return Err(Error::Config(format!(
                "portion must be in (0, 1], got {}",
                self.portion
            )));
        }
        if self.graph_dir.is_empty() {
            return Err(Error::Config("graph_dir must not be empty".into()));
        }
        if self.result_dir.is_empty() {
            return Err(Error::Config("result_dir must not be empty".into()));
        }
        if self.term_interval_secs == 0 {
            return Err(Error::Config(
                "term_interval_secs must be >= 1: a zero interval lets the master take two \
                 successive snapshots before any shard completes a batch, which declares \
                 convergence on an unchanged initial state rather than a real fixpoint"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Path to the primary partition file for `shard_id`.
    #[must_use]
    pub fn partition_file(&self, shard_id: usize) -> std::path::PathBuf {
        Path::new(&self.graph_dir).join(format!("part{shard_id}"))
    }

    /// Path to the copy-adjacency partition file for `shard_id`.
    #[must_use]
    pub fn copy_partition_file(&self, shard_id: usize) -> std::path::PathBuf {
        Path::new(&self.graph_dir).join(format!("part{}", shard_id + self.shard))
    }

    /// Path to the result file for `shard_id`.
    #[must_use]
    pub fn result_file(&self, shard_id: usize) -> std::path::PathBuf {
        Path::new(&self.result_dir).join(format!("part-{shard_id}"))
    }
}
