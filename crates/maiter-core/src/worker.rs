//! The asynchronous iteration loop and copy-vertex routing.
//!
//! One [`IterationThread`] per owned shard pops a scheduler-selected
//! batch, applies the kernel, and routes the kernel's output either
//! directly (low-fanout primary rows: `run_iter`) or through copy-vertex
//! consolidation (high-fanout primary rows: `run_iter2`). A separate
//! [`merge_copy_buffers`] pass periodically drains this shard's copy
//! table, fanning each consolidated delta out to its locally-owned
//! targets.

use std::hash::Hash;

use crate::kernel::IterateKernel;
use crate::scheduler::PriorityScheduler;
use crate::sharder::Sharder;
use crate::sync::{Arc, AtomicBool, Ordering};
use crate::table::StateTable;
use crate::transport::{Inbound, TransportHandle};

/// Runs one pass of the iteration loop's contract for a single primary
/// row that does *not* participate in copy-vertex consolidation
/// (`high_fanout == false`): pop delta, fold into value, run `g_func`,
/// and route each output directly — local accumulate or remote send, one
/// message per target.
#[allow(clippy::too_many_arguments)]
pub fn run_iter<K, V, D>(
    k: &K,
    table: &StateTable<K, V, D>,
    kernel: &dyn IterateKernel<K, V, D>,
    sharder: &dyn Sharder<K>,
    this_shard: usize,
    num_shards: usize,
    transport: &TransportHandle<K, V>,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let Some(popped) = table.swap_delta(k, kernel.default_v()) else {
        return;
    };
    let Some(value_snapshot) = table.with_row_mut(k, |row| {
        let transformed = kernel.process_delta_v(k, popped.clone(), &row.value, &row.data);
        row.value = kernel.accumulate(row.value.clone(), &transformed);
        (transformed, row.value.clone())
    }) else {
        return;
    };
    let (delta_for_spread, value_after) = value_snapshot;

    let mut output = Vec::new();
    table.with_row_mut(k, |row| {
        kernel.g_func(k, &delta_for_spread, &value_after, &row.data, &mut output);
    });

    for (target, message) in output {
        let dest = sharder.shard_of(&target, num_shards);
        if dest == this_shard {
            table.accumulate_delta(&target, &message, kernel);
        } else if let Err(err) = transport.send_direct(dest, target, message) {
            tracing::warn!(shard = this_shard, %err, "dropping undelivered direct message");
        }
    }
}

/// Runs one pass of the iteration loop's contract for a high-fanout
/// primary row (`high_fanout == true`): pop delta, fold into value, run
/// `g_func`, then partition outputs by destination shard — local targets
/// are accumulated directly, and every distinct *remote* shard touched
/// gets exactly one consolidated `accumulate_copy` message rather than
/// one message per neighbour.
///
/// Correctness of consolidation depends on the kernel emitting the same
/// message value to every neighbour in one `g_func` call — callers must
/// disable copy-vertex routing (`degree = u64::MAX`) for kernels that
/// don't.
#[allow(clippy::too_many_arguments)]
pub fn run_iter2<K, V, D>(
    k: &K,
    table: &StateTable<K, V, D>,
    kernel: &dyn IterateKernel<K, V, D>,
    sharder: &dyn Sharder<K>,
    this_shard: usize,
    num_shards: usize,
    transport: &TransportHandle<K, V>,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let Some(popped) = table.swap_delta(k, kernel.default_v()) else {
        return;
    };
    let Some((delta_for_spread, value_after)) = table.with_row_mut(k, |row| {
        let transformed = kernel.process_delta_v(k, popped.clone(), &row.value, &row.data);
        row.value = kernel.accumulate(row.value.clone(), &transformed);
        (transformed, row.value.clone())
    }) else {
        return;
    };

    let mut output = Vec::new();
    table.with_row_mut(k, |row| {
        kernel.g_func(k, &delta_for_spread, &value_after, &row.data, &mut output);
    });

    let mut remote_shards_touched: Vec<usize> = Vec::new();
    let mut consolidated_message: Option<V> = None;

    for (target, message) in output {
        let dest = sharder.shard_of(&target, num_shards);
        if dest == this_shard {
            table.accumulate_delta(&target, &message, kernel);
        } else {
            if !remote_shards_touched.contains(&dest) {
                remote_shards_touched.push(dest);
            }
            // Uniformity precondition: every neighbour in this
            // call gets the same message, so any one of them stands in
            // for the consolidated per-shard value.
            consolidated_message = Some(message);
        }
    }

    if let Some(message) = consolidated_message {
        for dest in remote_shards_touched {
            if let Err(err) = transport.send_copy(dest, k.clone(), message.clone()) {
                tracing::warn!(shard = this_shard, %err, "dropping undelivered copy-consolidation message");
            }
        }
    }
}

/// Drains this shard's copy table, fanning each non-identity delta out
/// over its locally-owned targets and resetting the row to identity.
/// The drain-then-fanout is atomic per key with respect to further
/// `accumulate_copy` calls because [`StateTable::swap_copy_delta`] holds
/// the row's stripe lock across the whole swap.
pub fn merge_copy_buffers<K, V, D>(table: &StateTable<K, V, D>, kernel: &dyn IterateKernel<K, V, D>)
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    for key in table.copy_keys() {
        let Some(drained) = table.swap_copy_delta(&key, kernel.default_v()) else {
            continue;
        };
        let targets = table
            .with_copy_row_mut(&key, |row| row.local_targets.clone())
            .unwrap_or_default();
        for target in targets {
            table.accumulate_delta(&target, &drained, kernel);
        }
    }
}

/// Applies every inbound message queued for this shard: direct deltas
/// accumulate straight into a primary row, copy deltas accumulate into a
/// copy row. Runs on the shard's dedicated receiver thread, concurrently
/// with the iteration thread's processing of other rows.
pub fn apply_inbound<K, V, D>(
    table: &StateTable<K, V, D>,
    kernel: &dyn IterateKernel<K, V, D>,
    inbound: Vec<Inbound<K, V>>,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    for msg in inbound {
        match msg {
            Inbound::Direct(env) => table.accumulate_delta(&env.key, &env.delta, kernel),
            Inbound::Copy(env) => table.accumulate_copy(&env.vertex, &env.delta, kernel),
        }
    }
}

/// Runs one full pass over a scheduler-selected batch: dispatch each key
/// to `run_iter` or `run_iter2` by its `high_fanout` flag, then merge
/// this shard's copy buffers exactly once — the merge call sits outside
/// the per-row loop, at least once per batch.
#[allow(clippy::too_many_arguments)]
pub fn run_batch<K, V, D>(
    batch: &[(K, bool)],
    table: &StateTable<K, V, D>,
    kernel: &dyn IterateKernel<K, V, D>,
    sharder: &dyn Sharder<K>,
    this_shard: usize,
    num_shards: usize,
    transport: &TransportHandle<K, V>,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    for (key, high_fanout) in batch {
        if *high_fanout {
            run_iter2(key, table, kernel, sharder, this_shard, num_shards, transport);
        } else {
            run_iter(key, table, kernel, sharder, this_shard, num_shards, transport);
        }
    }
    merge_copy_buffers(table, kernel);
}

/// Cooperative stop flag shared between the master's termination
/// detector and every shard's iteration/receiver threads. Polled between
/// batches, never mid-batch, so in-flight outbound messages at stop time
/// may or may not land — acceptable since the termination criterion
/// already tolerates drift.
#[derive(Clone)]
pub struct StopFlag(Arc<AtomicBool>);

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl StopFlag {
    /// Creates a fresh, unset stop flag.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signals every holder to stop after the current batch.
    pub fn signal(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// True once [`StopFlag::signal`] has been called.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives one shard's iteration thread until the stop flag is set,
/// running the priority scheduler once per pass.
pub fn run_iteration_loop<K, V, D>(
    table: &StateTable<K, V, D>,
    kernel: &dyn IterateKernel<K, V, D>,
    sharder: &dyn Sharder<K>,
    this_shard: usize,
    num_shards: usize,
    portion: f64,
    transport: &TransportHandle<K, V>,
    stop: &StopFlag,
) where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let scheduler = PriorityScheduler;
    while !stop.is_set() {
        let snapshot = table.snapshot_delta_value();
        if snapshot.is_empty() {
            std::thread::yield_now();
            continue;
        }
        let selected_keys = scheduler.select(&snapshot, portion, kernel);
        let fanout_by_key: std::collections::HashMap<K, bool> =
            table.primary_keys_with_fanout().into_iter().collect();
        let batch: Vec<(K, bool)> = selected_keys
            .into_iter()
            .filter_map(|k| {
                let hf = *fanout_by_key.get(&k)?;
                Some((k, hf))
            })
            .collect();
        run_batch(&batch, table, kernel, sharder, this_shard, num_shards, transport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharder::ModSharder;
    use crate::transport::{Inbound, InProcessTransport};

    /// Sum-accumulate, uniform-spread kernel: every out-neighbour in
    /// `data` gets the same message (the precondition copy-vertex
    /// consolidation depends on).
    struct UniformSpreadKernel;
    impl IterateKernel<u64, f64, Vec<u64>> for UniformSpreadKernel {
        fn read_data(&self, _line: &str) -> Option<(u64, Vec<u64>, usize)> {
            None
        }
        fn init_v(&self, _k: &u64, _data: &Vec<u64>) -> f64 {
            0.0
        }
        fn init_c(&self, _k: &u64, _data: &Vec<u64>) -> f64 {
            0.0
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
            for &target in data {
                output.push((target, *delta));
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
    }

    #[test]
    fn run_iter_routes_local_targets_directly_and_queues_remote_ones() {
        let kernel = UniformSpreadKernel;
        let sharder = ModSharder;
        let table: StateTable<u64, f64, Vec<u64>> = StateTable::new();
        // shard 0 owns even keys, shard 1 owns odd keys (mod-2 sharding).
        table.put2(0, 1.0, 0.0, vec![2, 3]);
        table.put2(2, 0.0, 0.0, Vec::new());

        let transport: InProcessTransport<u64, f64> = InProcessTransport::new(2, 16);
        let handle = transport.sender_handle();

        run_iter(&0, &table, &kernel, &sharder, 0, 2, &handle);

        // local target 2 accumulated directly.
        assert!((table.with_row_mut(&2, |r| r.delta).unwrap() - 1.0).abs() < 1e-12);
        // the row's own delta was popped back to identity.
        assert!((table.with_row_mut(&0, |r| r.delta).unwrap()).abs() < 1e-12);
        // remote target 3 (owned by shard 1) went out over the transport.
        let inbound = transport.drain_inbound(1);
        assert_eq!(inbound.len(), 1);
        match &inbound[0] {
            Inbound::Direct(env) => {
                assert_eq!(env.key, 3);
                assert!((env.delta - 1.0).abs() < 1e-12);
            }
            Inbound::Copy(_) => panic!("expected a direct envelope from run_iter"),
        }
    }

    #[test]
    fn run_iter2_consolidates_one_message_per_remote_shard_touched() {
        let kernel = UniformSpreadKernel;
        let sharder = ModSharder;
        let table: StateTable<u64, f64, Vec<u64>> = StateTable::new();
        // vertex 0 (shard 0) fans out to 100 neighbours split across
        // shards 1, 2 and 3 (4-shard cluster) plus one local neighbour.
        let mut targets: Vec<u64> = vec![4]; // local to shard 0
        targets.extend(1..=99u64); // spread across shards 1..=3
        table.put(0, 2.0, 0.0, targets);
        table.put2(4, 0.0, 0.0, Vec::new());

        let transport: InProcessTransport<u64, f64> = InProcessTransport::new(4, 256);
        let handle = transport.sender_handle();

        run_iter2(&0, &table, &kernel, &sharder, 0, 4, &handle);

        // local neighbour accumulated directly.
        assert!((table.with_row_mut(&4, |r| r.delta).unwrap() - 2.0).abs() < 1e-12);

        // exactly one consolidated copy message landed on each of the
        // three remote shards touched — not one per remote neighbour.
        for remote_shard in 1..=3usize {
            let inbound = transport.drain_inbound(remote_shard);
            assert_eq!(
                inbound.len(),
                1,
                "shard {remote_shard} should receive exactly one consolidated message"
            );
            match &inbound[0] {
                Inbound::Copy(env) => {
                    assert_eq!(env.vertex, 0);
                    assert!((env.delta - 2.0).abs() < 1e-12);
                }
                Inbound::Direct(_) => panic!("expected a copy envelope from run_iter2"),
            }
        }
    }

    #[test]
    fn merge_copy_buffers_fans_out_and_resets_to_identity() {
        let kernel = UniformSpreadKernel;
        let table: StateTable<u64, f64, Vec<u64>> = StateTable::new();
        table.put2(10, 0.0, 0.0, Vec::new());
        table.put2(11, 0.0, 0.0, Vec::new());
        table.putc(0, vec![10, 11], 0.0);
        table.accumulate_copy(&0, &0.6, &kernel);

        merge_copy_buffers(&table, &kernel);

        assert!((table.with_row_mut(&10, |r| r.delta).unwrap() - 0.6).abs() < 1e-12);
        assert!((table.with_row_mut(&11, |r| r.delta).unwrap() - 0.6).abs() < 1e-12);
        // drained back to identity, so a second merge with no further
        // accumulation is a no-op.
        merge_copy_buffers(&table, &kernel);
        assert!((table.with_row_mut(&10, |r| r.delta).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn apply_inbound_routes_direct_and_copy_envelopes() {
        let kernel = UniformSpreadKernel;
        let table: StateTable<u64, f64, Vec<u64>> = StateTable::new();
        table.put2(1, 0.0, 0.0, Vec::new());
        table.putc(2, vec![1], 0.0);

        apply_inbound(
            &table,
            &kernel,
            vec![
                Inbound::Direct(crate::transport::Envelope { key: 1, delta: 0.3 }),
                Inbound::Copy(crate::transport::CopyEnvelope { vertex: 2, delta: 0.7 }),
            ],
        );

        assert!((table.with_row_mut(&1, |r| r.delta).unwrap() - 0.3).abs() < 1e-12);
        assert!((table.with_copy_row_mut(&2, |r| r.delta).unwrap() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn stop_flag_starts_unset_and_latches_once_signaled() {
        let stop = StopFlag::new();
        assert!(!stop.is_set());
        stop.signal();
        assert!(stop.is_set());
    }
}
