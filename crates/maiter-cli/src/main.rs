//! Maiter CLI — runs a built-in graph computation kernel to convergence.
//!
//! Usage:
//!   `maiter run --graph-dir ./graph --result-dir ./result --kernel pagerank --shard 4`
//!   `maiter list-kernels`

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use maiter_core::Config;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "maiter")]
#[command(author, version)]
#[command(about = "Run Maiter-style asynchronous iterative graph computations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in kernel to convergence and dump results.
    Run {
        /// Kernel to run (pagerank, sssp, katz).
        #[arg(long)]
        kernel: String,

        /// Directory containing `part0..partN` partition files.
        #[arg(long)]
        graph_dir: Option<PathBuf>,

        /// Directory to write `part-0..part-N` result files to.
        #[arg(long)]
        result_dir: Option<PathBuf>,

        /// Optional `maiter.toml` configuration file; `MAITER_*` env vars
        /// and these flags override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Expected vertex count (pre-sizing hint).
        #[arg(long)]
        num_nodes: Option<u64>,

        /// Priority-scheduler fraction in (0, 1].
        #[arg(long)]
        portion: Option<f64>,

        /// Out-degree threshold enabling copy-vertex consolidation.
        #[arg(long)]
        degree: Option<u64>,

        /// Number of shards (= worker threads).
        #[arg(long)]
        shard: Option<usize>,

        /// Seconds between termination-detector polls.
        #[arg(long)]
        term_interval_secs: Option<u64>,

        /// Convergence threshold epsilon.
        #[arg(long)]
        term_epsilon: Option<f64>,
    },

    /// List the names of every registered built-in kernel.
    ListKernels,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut registry = maiter_core::RunnerRegistry::new();
    maiter_kernels::register_builtin(&mut registry);

    match cli.command {
        Commands::ListKernels => {
            for name in registry.names() {
                println!("{name}");
            }
        }
        Commands::Run {
            kernel,
            graph_dir,
            result_dir,
            config,
            num_nodes,
            portion,
            degree,
            shard,
            term_interval_secs,
            term_epsilon,
        } => {
            let mut cfg = Config::load(config.as_deref())?;
            if let Some(v) = graph_dir {
                cfg.graph_dir = v.display().to_string();
            }
            if let Some(v) = result_dir {
                cfg.result_dir = v.display().to_string();
            }
            if let Some(v) = num_nodes {
                cfg.num_nodes = v;
            }
            if let Some(v) = portion {
                cfg.portion = v;
            }
            if let Some(v) = degree {
                cfg.degree = v;
            }
            if let Some(v) = shard {
                cfg.shard = v;
            }
            if let Some(v) = term_interval_secs {
                cfg.term_interval_secs = v;
            }
            if let Some(v) = term_epsilon {
                cfg.term_epsilon = v;
            }
            cfg.validate()?;

            info!(kernel = %kernel, shard = cfg.shard, "starting cluster");
            registry.dispatch(&kernel, &cfg)?;
            info!("cluster converged, results written");
        }
    }

    Ok(())
}
