//! The distributed termination detector.
//!
//! Periodically, the master triggers a local reduction on every worker's
//! table, combines the results with [`TermChecker::global_reduce`], and
//! compares against the previous snapshot. Convergence stops the iteration
//! loops cooperatively via a shared [`crate::worker::StopFlag`].
//!
//! The reduction is explicitly a best-effort snapshot, not a barrier:
//! per-worker values may keep drifting during the read, and that's
//! tolerated by construction — the criterion only ever compares two
//! already-stale snapshots.

use std::time::Duration;

use crate::kernel::TermChecker;
use crate::table::StateTable;
use crate::worker::StopFlag;
use std::hash::Hash;

/// Floor applied to a zero (or otherwise degenerate) polling interval.
///
/// `Config::validate` already rejects `term_interval_secs == 0` before an
/// engine run ever starts a master thread, but `TerminationDetector` is a
/// public building block callers can construct directly (bypassing that
/// validation). A zero interval lets `run_master_loop` take two
/// back-to-back snapshots before any shard has finished a single batch,
/// which compares the unchanged initial state against itself and declares
/// convergence on a fixpoint that was never actually reached. Flooring
/// here keeps that one-instruction-apart failure mode out of reach even
/// for direct callers.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Drives the termination detector: every `interval`, reduce every
/// worker's table, combine, compare to the previous global value, and
/// signal `stop` on convergence.
pub struct TerminationDetector<V> {
    interval: Duration,
    previous_global: Option<f64>,
    checker: Box<dyn TermChecker<V>>,
}

impl<V> TerminationDetector<V> {
    /// Builds a detector that reduces every `interval` using `checker`.
    /// `interval` is floored to [`MIN_POLL_INTERVAL`] if zero.
    #[must_use]
    pub fn new(interval: Duration, checker: Box<dyn TermChecker<V>>) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            previous_global: None,
            checker,
        }
    }

    /// Reduces `tables` (one per worker shard) to a global scalar and
    /// returns `true` if that value has converged relative to the
    /// previous call. The very first call never converges (there is no
    /// previous snapshot to compare against).
    pub fn poll<K, D>(&mut self, tables: &[&StateTable<K, V, D>]) -> bool
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        let locals: Vec<f64> = tables
            .iter()
            .map(|table| {
                let snapshot = table.snapshot_delta_value();
                let pairs: Vec<(V, V)> = snapshot
                    .into_iter()
                    .map(|(_, delta, value)| (delta, value))
                    .collect();
                self.checker.local_reduce(&pairs)
            })
            .collect();

        let global = self.checker.global_reduce(&locals);
        let converged = match self.previous_global {
            Some(prev) => self.checker.converged(prev, global),
            None => false,
        };
        self.previous_global = Some(global);
        converged
    }

    /// How long to sleep between polls.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The most recent global reduced value, if a poll has happened.
    #[must_use]
    pub fn last_global(&self) -> Option<f64> {
        self.previous_global
    }
}

/// Runs the detector's poll loop on the calling thread until convergence,
/// then signals `stop`. Intended to run on its own "master" thread
/// alongside the per-shard worker threads.
pub fn run_master_loop<K, V, D>(
    mut detector: TerminationDetector<V>,
    tables: &[&StateTable<K, V, D>],
    stop: &StopFlag,
) where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let interval = detector.interval();
    loop {
        std::thread::sleep(interval);
        if detector.poll(tables) {
            stop.signal();
            return;
        }
    }
}
