//! Asynchronous, delta-accumulative iterative graph computation.
//!
//! A worker owns a shard of vertices in a [`table::StateTable`]. Each
//! vertex carries a pending `delta` and a propagated-so-far `value`;
//! `delta` is folded into `value` and spread to neighbours by a
//! user-supplied [`kernel::IterateKernel`], on no fixed schedule and with
//! no global barrier between supersteps — hence "asynchronous." A
//! [`scheduler::PriorityScheduler`] decides which rows get processed
//! first when not every row can run every pass; a
//! [`termination::TerminationDetector`] decides when the whole cluster
//! has converged closely enough to stop.
//!
//! This crate provides the reusable engine — table, scheduler, worker
//! loop, transport, termination, configuration, partition I/O. Concrete
//! kernels (PageRank, single-source shortest paths, Katz centrality)
//! live in `maiter-kernels`; the CLI binary lives in `maiter-cli`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod kernel;
pub mod partition;
pub mod registry;
pub mod result;
pub mod scheduler;
pub mod sharder;
pub mod sync;
pub mod table;
pub mod termination;
pub mod transport;
pub mod worker;

pub use config::Config;
pub use error::{Error, Result};
pub use kernel::{IterateKernel, SumDeltaTermChecker, TermChecker};
pub use registry::{Runner, RunnerRegistry};
pub use scheduler::PriorityScheduler;
pub use sharder::{HashSharder, ModSharder, Sharder};
pub use table::StateTable;
pub use termination::TerminationDetector;
pub use transport::{InProcessTransport, Transport, TransportHandle};
pub use worker::StopFlag;
