//! The cluster orchestrator: wires together per-shard state tables,
//! iteration threads, receiver threads, the termination master, and the
//! load/dump phases around them.
//!
//! A real deployment runs one worker per process, coordinated over an
//! actual network. [`run`] runs every shard as a thread in this process
//! instead, talking over [`InProcessTransport`] — one concrete, testable
//! body for what would otherwise be an interfaces-only collaborator.

use std::hash::Hash;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::kernel::{IterateKernel, TermChecker};
use crate::partition::{load_copy_partition, load_primary_partition};
use crate::result::write_result;
use crate::sharder::Sharder;
use crate::sync::Arc;
use crate::table::StateTable;
use crate::termination::{run_master_loop, TerminationDetector};
use crate::transport::{InProcessTransport, Transport};
use crate::worker::{apply_inbound, run_iteration_loop, StopFlag};

/// Bounded inbound-queue capacity for the in-process transport. Large
/// enough that a single batch's worth of fanout rarely blocks; callers
/// needing a different bound should construct their own
/// [`InProcessTransport`] and drive the pieces in `worker`/`termination`
/// directly instead of going through [`run`].
const DEFAULT_QUEUE_CAPACITY: usize = 1 << 16;

/// Runs one full cluster lifecycle: load partitions, iterate to
/// convergence, dump results. `num_shards` comes from `config.shard`;
/// every shard runs as a thread in this process.
///
/// # Errors
/// Propagates partition-load and result-write I/O errors. A panic in a
/// spawned worker thread is not converted to an `Error` — it is treated
/// as a programming-error bug, consistent with this crate's no-`unwrap`
/// discipline only covering expected failure modes.
pub fn run<K, V, D>(
    config: &Config,
    kernel: Arc<dyn IterateKernel<K, V, D>>,
    sharder: Arc<dyn Sharder<K>>,
    term_checker: Box<dyn TermChecker<V>>,
) -> Result<()>
where
    K: Eq + Hash + Clone + Send + Sync + std::fmt::Display + 'static,
    V: Clone + Send + Sync + std::fmt::Display + 'static,
    D: Send + Sync + 'static,
{
    config.validate()?;
    let num_shards = config.shard;
    let graph_dir = PathBuf::from(&config.graph_dir);
    let result_dir = PathBuf::from(&config.result_dir);

    let tables: Vec<Arc<StateTable<K, V, D>>> = (0..num_shards)
        .map(|_| Arc::new(StateTable::with_capacity_hint(config.num_nodes as usize)))
        .collect();

    for (shard_id, table) in tables.iter().enumerate() {
        load_primary_partition(&graph_dir, shard_id, config.degree, kernel.as_ref(), table)?;
        load_copy_partition(
            &graph_dir,
            shard_id,
            num_shards,
            kernel.as_ref(),
            sharder.as_ref(),
            table,
        )?;
    }

    let transport = Arc::new(InProcessTransport::<K, V>::new(
        num_shards,
        DEFAULT_QUEUE_CAPACITY,
    ));
    let stop = StopFlag::new();

    let mut handles = Vec::new();

    // One iteration thread plus one receiver thread per shard.
    for shard_id in 0..num_shards {
        let table = Arc::clone(&tables[shard_id]);
        let kernel = Arc::clone(&kernel);
        let sharder = Arc::clone(&sharder);
        let transport_handle = transport.sender_handle();
        let portion = config.portion;
        let stop_clone = stop.clone();
        handles.push(std::thread::spawn(move || {
            run_iteration_loop(
                table.as_ref(),
                kernel.as_ref(),
                sharder.as_ref(),
                shard_id,
                num_shards,
                portion,
                &transport_handle,
                &stop_clone,
            );
        }));

        let table = Arc::clone(&tables[shard_id]);
        let kernel = Arc::clone(&kernel);
        let transport = Arc::clone(&transport);
        let stop_clone = stop.clone();
        handles.push(std::thread::spawn(move || {
            while !stop_clone.is_set() {
                let inbound = transport.drain_inbound(shard_id);
                if inbound.is_empty() {
                    std::thread::sleep(Duration::from_millis(1));
                    continue;
                }
                apply_inbound(table.as_ref(), kernel.as_ref(), inbound);
            }
        }));
    }

    let detector = TerminationDetector::new(Duration::from_secs(config.term_interval_secs), term_checker);
    let table_refs: Vec<Arc<StateTable<K, V, D>>> = tables.clone();
    let stop_for_master = stop.clone();
    let master = std::thread::spawn(move || {
        let refs: Vec<&StateTable<K, V, D>> = table_refs.iter().map(|t| t.as_ref()).collect();
        run_master_loop(detector, &refs, &stop_for_master);
    });

    master.join().map_err(|_| {
        crate::error::Error::Internal("termination master thread panicked".to_string())
    })?;
    for handle in handles {
        handle.join().map_err(|_| {
            crate::error::Error::Internal("worker thread panicked".to_string())
        })?;
    }

    for (shard_id, table) in tables.iter().enumerate() {
        write_result(&result_dir, shard_id, table.as_ref())?;
    }

    Ok(())
}
