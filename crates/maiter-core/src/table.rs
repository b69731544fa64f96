//! The sharded delta-accumulative state table.
//!
//! Two physical maps per worker:
//!
//! - the **primary table**: one row per vertex this shard owns, keyed by
//!   [`Sharder::shard_of`]. A row's `high_fanout` flag resolves an
//!   overloaded `is_copy` term from the original data model — see
//!   `DESIGN.md` — and selects `run_iter` vs `run_iter2` routing in
//!   [`crate::worker`].
//! - the **copy table**: one row per high-fanout vertex *of any shard*,
//!   holding this shard's slice of that vertex's out-adjacency and a
//!   delta buffer accumulated via remote `accumulate_copy` calls.
//!
//! Both maps are backed by [`dashmap::DashMap`], which internally stripes
//! its buckets across a fixed number of shards, each behind its own
//! `RwLock` — fine-grained locking per bucket rather than one global
//! lock, without a hand-rolled open-addressed array. Holding a `DashMap`
//! entry guard across the read-modify-write in [`StateTable::swap_delta`]
//! is what gives us an atomic swap-with-identity: no `accumulate_delta`
//! for that key can interleave while the guard is held.

use dashmap::DashMap;
use std::hash::Hash;

use crate::kernel::IterateKernel;

/// One vertex's state in the primary table.
#[derive(Debug, Clone)]
pub struct Row<V, D> {
    /// Accumulated, not-yet-propagated update (F1).
    pub delta: V,
    /// Propagated-so-far value (F2).
    pub value: V,
    /// Static per-vertex payload (e.g. adjacency list). Immutable after load.
    pub data: D,
    /// True when this vertex's out-degree is `>= D`, i.e. it has replica
    /// rows in every shard's copy table and its outputs must be routed
    /// through copy-vertex consolidation rather than emitted per-target.
    pub high_fanout: bool,
}

/// One vertex's state in the copy table: a consolidation buffer plus the
/// slice of that vertex's out-neighbours owned by this shard.
#[derive(Debug, Clone)]
pub struct CopyRow<V, K> {
    /// Accumulated message destined for every target in `local_targets`.
    pub delta: V,
    /// This shard's slice of the high-fanout vertex's out-adjacency.
    pub local_targets: Vec<K>,
}

/// The per-worker sharded state table: primary rows plus copy-vertex
/// replica rows, safe for concurrent iteration and remote accumulation.
pub struct StateTable<K, V, D> {
    primary: DashMap<K, Row<V, D>>,
    copy: DashMap<K, CopyRow<V, K>>,
}

impl<K, V, D> Default for StateTable<K, V, D>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, D> StateTable<K, V, D>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty table. `DashMap` grows on demand; a pre-sizing
    /// hint for the expected vertex count is honored via
    /// [`StateTable::with_capacity_hint`] instead.
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: DashMap::new(),
            copy: DashMap::new(),
        }
    }

    /// Creates an empty table pre-sized for roughly `num_nodes` entries
    /// (the `--num_nodes` pre-sizing hint).
    #[must_use]
    pub fn with_capacity_hint(num_nodes: usize) -> Self {
        Self {
            primary: DashMap::with_capacity(num_nodes),
            copy: DashMap::new(),
        }
    }

    /// Inserts a primary row for a high-fanout vertex.
    pub fn put(&self, k: K, delta: V, value: V, data: D) {
        self.primary.insert(
            k,
            Row {
                delta,
                value,
                data,
                high_fanout: true,
            },
        );
    }

    /// Inserts a primary row for a low-fanout vertex. Distinct from
    /// `put` only in that it never participates in the
    /// copy-vertex routing path.
    pub fn put2(&self, k: K, delta: V, value: V, data: D) {
        self.primary.insert(
            k,
            Row {
                delta,
                value,
                data,
                high_fanout: false,
            },
        );
    }

    /// Inserts or overwrites a copy row for `k` on this shard.
    /// `local_targets` is the slice of `k`'s out-neighbours owned by this
    /// shard.
    pub fn putc(&self, k: K, local_targets: Vec<K>, identity: V) {
        self.copy.insert(
            k,
            CopyRow {
                delta: identity,
                local_targets,
            },
        );
    }

    /// `row[k].delta ⊕= v`, under the target row's stripe lock. Safe
    /// against concurrent calls to any `accumulate_*`/`swap_delta` on the
    /// same or different keys.
    pub fn accumulate_delta(&self, k: &K, v: &V, kernel: &dyn IterateKernel<K, V, D>)
    where
        V: Clone,
    {
        if let Some(mut row) = self.primary.get_mut(k) {
            let current = row.delta.clone();
            row.delta = kernel.accumulate(current, v);
        }
    }

    /// `row[k].value ⊕= v`.
    pub fn accumulate_value(&self, k: &K, v: &V, kernel: &dyn IterateKernel<K, V, D>)
    where
        V: Clone,
    {
        if let Some(mut row) = self.primary.get_mut(k) {
            let current = row.value.clone();
            row.value = kernel.accumulate(current, v);
        }
    }

    /// Overwrites `row[k].delta` (used to reset to identity after
    /// spreading, and by the priority scheduler's tests).
    pub fn update_delta(&self, k: &K, v: V) {
        if let Some(mut row) = self.primary.get_mut(k) {
            row.delta = v;
        }
    }

    /// `copy_row[k].delta ⊕= v`, on this shard's copy table. Called both
    /// locally (routing a high-fanout vertex's own-shard neighbours) and
    /// remotely (via the transport, delivering another shard's owner's
    /// consolidated message).
    pub fn accumulate_copy(&self, k: &K, v: &V, kernel: &dyn IterateKernel<K, V, D>)
    where
        V: Clone,
    {
        if let Some(mut row) = self.copy.get_mut(k) {
            let current = row.delta.clone();
            row.delta = kernel.accumulate(current, v);
        }
    }

    /// Atomically swaps `row[k].delta` with `identity`, returning the
    /// pre-swap value. This is the one operation that must never
    /// interleave with a concurrent `accumulate_delta` on the same key —
    /// holding the `DashMap` entry guard across the whole read-then-write
    /// makes that true by construction.
    pub fn swap_delta(&self, k: &K, identity: V) -> Option<V>
    where
        V: Clone,
    {
        self.primary.get_mut(k).map(|mut row| {
            std::mem::replace(&mut row.delta, identity)
        })
    }

    /// Atomically swaps a copy row's `delta` with `identity`, used by
    /// the copy-buffer drain, which must be atomic with respect to
    /// further `accumulate_copy` calls.
    pub fn swap_copy_delta(&self, k: &K, identity: V) -> Option<V> {
        self.copy.get_mut(k).map(|mut row| std::mem::replace(&mut row.delta, identity))
    }

    /// Returns a clone of the value at `k`, or `None` if absent. `get`
    /// on an absent key is undefined by the core contract; this checked
    /// accessor exists for callers (tests, the dumper) that need to
    /// tolerate absence rather than assume presence.
    pub fn get_value(&self, k: &K) -> Option<V>
    where
        V: Clone,
    {
        self.primary.get(k).map(|row| row.value.clone())
    }

    /// Number of primary rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    /// True if there are no primary rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Number of copy rows on this shard.
    #[must_use]
    pub fn copy_len(&self) -> usize {
        self.copy.len()
    }

    /// Snapshots `(delta, value)` for every primary row, used by the
    /// scheduler and the termination detector. The snapshot is a
    /// best-effort read: concurrent `accumulate_*` calls on rows not yet
    /// visited are reflected; calls on rows already visited are not.
    pub fn snapshot_delta_value(&self) -> Vec<(K, V, V)>
    where
        V: Clone,
    {
        self.primary
            .iter()
            .map(|entry| (entry.key().clone(), entry.delta.clone(), entry.value.clone()))
            .collect()
    }

    /// Iterates every primary row's key, used by the scheduler's uniform
    /// sampling pass.
    pub fn keys(&self) -> Vec<K> {
        self.primary.iter().map(|e| e.key().clone()).collect()
    }

    /// Runs `f` with exclusive access to a primary row, returning `None`
    /// if the key is absent. This is the primitive the iteration loop's
    /// `process_delta_v -> g_func -> reset_delta` critical section is
    /// built from: updates within one call never interleave with another
    /// accumulate on the same key, because `f` holds the row lock for
    /// its whole duration.
    pub fn with_row_mut<R>(&self, k: &K, f: impl FnOnce(&mut Row<V, D>) -> R) -> Option<R> {
        self.primary.get_mut(k).map(|mut row| f(&mut row))
    }

    /// Runs `f` with exclusive access to a copy row.
    pub fn with_copy_row_mut<R>(&self, k: &K, f: impl FnOnce(&mut CopyRow<V, K>) -> R) -> Option<R> {
        self.copy.get_mut(k).map(|mut row| f(&mut row))
    }

    /// Every primary row's key, paired with its `high_fanout` flag — the
    /// engine's dispatch point between `run_iter` and `run_iter2`.
    pub fn primary_keys_with_fanout(&self) -> Vec<(K, bool)> {
        self.primary
            .iter()
            .map(|e| (e.key().clone(), e.high_fanout))
            .collect()
    }

    /// Every copy row's key, used by `merge_copy_buffers`.
    pub fn copy_keys(&self) -> Vec<K> {
        self.copy.iter().map(|e| e.key().clone()).collect()
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::kernel::IterateKernel;
    use proptest::prelude::*;

    struct SumKernel;
    impl IterateKernel<u64, f64, ()> for SumKernel {
        fn read_data(&self, _line: &str) -> Option<(u64, (), usize)> {
            None
        }
        fn init_v(&self, _k: &u64, _data: &()) -> f64 {
            0.0
        }
        fn init_c(&self, _k: &u64, _data: &()) -> f64 {
            0.0
        }
        fn process_delta_v(&self, _k: &u64, delta: f64, _value: &f64, _data: &()) -> f64 {
            delta
        }
        fn g_func(&self, _k: &u64, _delta: &f64, _value: &f64, _data: &(), _output: &mut Vec<(u64, f64)>) {}
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

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Accumulator correctness (spec §8): for any sequence of
        /// `accumulate_delta` calls interleaved in any order, the sum of
        /// everything ever written equals what `swap_delta` reads back
        /// plus whatever's left in the row afterwards. Integer-valued
        /// deltas sidestep floating-point addition's non-associativity so
        /// the property holds exactly, not just within tolerance.
        #[test]
        fn accumulate_then_swap_recovers_exact_sum(deltas in proptest::collection::vec(-100i64..100i64, 0..200)) {
            let t: StateTable<u64, f64, ()> = StateTable::new();
            t.put2(1, 0.0, 0.0, ());
            let kernel = SumKernel;
            let expected: i64 = deltas.iter().sum();

            for d in &deltas {
                t.accumulate_delta(&1, &(*d as f64), &kernel);
            }
            let swapped = t.swap_delta(&1, 0.0).unwrap();
            prop_assert!((swapped - expected as f64).abs() < 1e-6);
            // the row was reset to identity by the swap.
            prop_assert!(t.with_row_mut(&1, |r| r.delta).unwrap().abs() < 1e-12);
        }

        /// A swap-with-identity mid-stream splits the sequence into two
        /// accumulation windows; the two swapped totals must still sum to
        /// the grand total, regardless of where the split falls.
        #[test]
        fn swap_mid_stream_partitions_the_total(
            first in proptest::collection::vec(-50i64..50i64, 0..100),
            second in proptest::collection::vec(-50i64..50i64, 0..100),
        ) {
            let t: StateTable<u64, f64, ()> = StateTable::new();
            t.put2(1, 0.0, 0.0, ());
            let kernel = SumKernel;

            for d in &first {
                t.accumulate_delta(&1, &(*d as f64), &kernel);
            }
            let swapped_first = t.swap_delta(&1, 0.0).unwrap();
            for d in &second {
                t.accumulate_delta(&1, &(*d as f64), &kernel);
            }
            let swapped_second = t.swap_delta(&1, 0.0).unwrap();

            let expected_first: i64 = first.iter().sum();
            let expected_second: i64 = second.iter().sum();
            prop_assert!((swapped_first - expected_first as f64).abs() < 1e-6);
            prop_assert!((swapped_second - expected_second as f64).abs() < 1e-6);
        }
    }
}
