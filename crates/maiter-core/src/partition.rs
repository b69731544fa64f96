//! Partition-file loading.
//!
//! Each shard's input is two files: `part${shard_id}` (one line per
//! owned vertex, `key<TAB>target1 target2 ...`) and
//! `part${shard_id + num_shards}` (the adjacency slice used to seed this
//! shard's copy-vertex rows for high-fanout vertices owned by *other*
//! shards). Each file gets its own handle rather than reusing one
//! already-exhausted reader across both passes.

use std::fs::File;
use std::hash::Hash;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};
use crate::kernel::IterateKernel;
use crate::table::StateTable;

/// Loads shard `shard_id`'s primary rows from `part${shard_id}`, applying
/// `kernel.read_data` to each line and routing to `put` (high-fanout,
/// out-degree >= `degree`) or `put2` (low-fanout).
///
/// Malformed lines are logged and skipped; a missing file is a fatal
/// configuration error.
pub fn load_primary_partition<K, V, D>(
    graph_dir: &Path,
    shard_id: usize,
    degree: u64,
    kernel: &dyn IterateKernel<K, V, D>,
    table: &StateTable<K, V, D>,
) -> Result<usize>
where
    K: Eq + Hash + Clone,
{
    let path = graph_dir.join(format!("part{shard_id}"));
    let file = File::open(&path)
        .map_err(|_| Error::PartitionFileMissing(path.display().to_string()))?;
    let reader = BufReader::new(file);

    let mut loaded = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match kernel.read_data(&line) {
            Some((key, data, size)) => {
                let value = kernel.init_v(&key, &data);
                let delta = kernel.init_c(&key, &data);
                if size as u64 >= degree {
                    table.put(key, delta, value, data);
                } else {
                    table.put2(key, delta, value, data);
                }
                loaded += 1;
            }
            None => {
                tracing::warn!(shard_id, lineno, "skipping malformed partition line");
            }
        }
    }
    Ok(loaded)
}

/// Loads shard `shard_id`'s copy-vertex adjacency slice from
/// `part${shard_id + num_shards}`, populating `putc` rows: one per
/// high-fanout vertex that has at least one out-neighbour owned by this
/// shard.
///
/// Each line in this file is the *same* `key<TAB>targets...` format, but
/// `targets` here are filtered by the caller's sharder to just this
/// shard's slice before being stored as the copy row's `local_targets`:
/// its data is the local slice of the vertex's out-adjacency.
pub fn load_copy_partition<K, V, D>(
    graph_dir: &Path,
    shard_id: usize,
    num_shards: usize,
    kernel: &dyn IterateKernel<K, V, D>,
    sharder: &dyn crate::sharder::Sharder<K>,
    table: &StateTable<K, V, D>,
) -> Result<usize>
where
    K: Eq + Hash + Clone,
{
    let path = graph_dir.join(format!("part{}", shard_id + num_shards));
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(_) => {
            // No copy-adjacency file for this shard (e.g. no high-fanout
            // vertices route through it); not fatal — the copy-vertex
            // path is an optimization, not a load-time requirement.
            tracing::info!(shard_id, path = %path.display(), "no copy partition file, skipping");
            return Ok(0);
        }
    };
    let reader = BufReader::new(file);

    let mut loaded = 0usize;
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match kernel.read_data(&line) {
            Some((key, data, _size)) => {
                // Each line names a high-fanout vertex's *full*
                // out-adjacency; `out_targets` projects it into keys, and
                // only the slice this shard owns becomes `local_targets`
                // — the rest is someone else's copy row's problem.
                let local_targets: Vec<K> = kernel
                    .out_targets(&data)
                    .into_iter()
                    .filter(|t| sharder.shard_of(t, num_shards) == shard_id)
                    .collect();
                loaded += 1;
                table.putc(key, local_targets, kernel.default_v());
            }
            None => {
                tracing::warn!(shard_id, lineno, "skipping malformed copy-partition line");
            }
        }
    }
    Ok(loaded)
}
