//! The sampling-based priority scheduler.
//!
//! Given a portion `p ∈ (0, 1]`, [`PriorityScheduler::select`] returns
//! approximately the top `p · |primary_table|` vertex keys ranked by
//! `kernel.priority(value, delta)`, without sorting the whole table: a
//! uniform random sample estimates the `(1 − p)`-quantile threshold, then
//! a single full pass keeps whatever clears it.
//!
//! Rows may be mutated by concurrent remote accumulation while this scan
//! runs; the scheduler only ever reads the snapshot it was handed,
//! so a row selected here may already be stale by the time the iteration
//! loop processes it. That's fine — re-reading `delta` is exactly what
//! the loop does next.

use rand::seq::SliceRandom;

use crate::kernel::IterateKernel;

/// Minimum sample size, so that tiny tables still get a reasonable
/// quantile estimate instead of degenerating on one or two draws.
const MIN_SAMPLE: usize = 32;

/// Samples at most this fraction of the table for threshold estimation,
/// to keep the sampling pass itself cheap on huge tables.
const MAX_SAMPLE_FRACTION: f64 = 0.05;

/// Selects the approximate top-`p` fraction of a table's rows by
/// kernel-defined priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityScheduler;

impl PriorityScheduler {
    /// Returns the subset of `rows` (each `(key, delta, value)`) whose
    /// priority clears the sampled `(1 - portion)`-quantile threshold.
    ///
    /// `portion = 1.0` degenerates to "every row" without sampling.
    /// Ties on the threshold may be included or excluded arbitrarily —
    /// callers must not depend on which.
    pub fn select<K, V, D>(
        &self,
        rows: &[(K, V, V)],
        portion: f64,
        kernel: &dyn IterateKernel<K, V, D>,
    ) -> Vec<K>
    where
        K: Clone,
        V: Clone,
    {
        if portion >= 1.0 || rows.is_empty() {
            return rows.iter().map(|(k, _, _)| k.clone()).collect();
        }

        let threshold = self.sample_threshold(rows, portion, kernel);

        rows.iter()
            .filter(|(_, delta, value)| kernel.priority(value, delta) >= threshold)
            .map(|(k, _, _)| k.clone())
            .collect()
    }

    /// Estimates the `(1 - portion)`-quantile of `kernel.priority` over a
    /// uniform random sample of `rows`, without sorting the full table.
    fn sample_threshold<K, V, D>(
        &self,
        rows: &[(K, V, V)],
        portion: f64,
        kernel: &dyn IterateKernel<K, V, D>,
    ) -> f64 {
        let sample_size = ((rows.len() as f64) * MAX_SAMPLE_FRACTION)
            .ceil()
            .max(MIN_SAMPLE as f64)
            .min(rows.len() as f64) as usize;

        let indices: Vec<usize> = (0..rows.len()).collect();
        let sampled_indices = uniform_sample(&indices, sample_size);

        let mut sample_priorities: Vec<f64> = sampled_indices
            .iter()
            .map(|&i| {
                let (_, delta, value) = &rows[i];
                kernel.priority(value, delta)
            })
            .collect();

        sample_priorities.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // The (1 - portion)-quantile: skip the lowest (1 - portion) of
        // the sample, keep the rest.
        let skip = ((sample_priorities.len() as f64) * (1.0 - portion)).floor() as usize;
        let skip = skip.min(sample_priorities.len().saturating_sub(1));
        sample_priorities[skip]
    }
}

/// Draws `sample_size` elements uniformly at random from `universe`
/// without replacement. Backs `sample_threshold`'s quantile estimate;
/// exposed separately so benches can measure the sampling pass on its own.
#[must_use]
pub fn uniform_sample<T: Clone>(universe: &[T], sample_size: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    let mut indices: Vec<usize> = (0..universe.len()).collect();
    let n = sample_size.min(universe.len());
    indices.partial_shuffle(&mut rng, n);
    indices[..n].iter().map(|&i| universe[i].clone()).collect()
}
