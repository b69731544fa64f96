//! The user-supplied kernel contract.
//!
//! Per-kernel specialization elsewhere is usually done with templates
//! plus virtual methods. Here the `(K, V, D)` triple is bound at
//! table-construction time and the kernel is stored as a single
//! trait object.

/// The polymorphic per-vertex kernel: accumulator, spreading function,
/// priority function, and the load-time parser.
///
/// `K` is the vertex key type, `V` is the delta/value type (a commutative
/// monoid under [`IterateKernel::accumulate`]), `D` is the static
/// per-vertex payload (typically an adjacency list).
///
/// # Contract
///
/// - `accumulate` must be commutative and associative with identity
///   `default_v()`. Asynchronous correctness depends entirely on this;
///   violating it is caller responsibility and is never checked here.
/// - `g_func` must emit a message value that is uniform across all of a
///   vertex's neighbours in one invocation if the caller intends to run
///   with copy-vertex consolidation enabled (`degree != u64::MAX`).
///   Non-uniform kernels must set `degree = u64::MAX` to disable it.
pub trait IterateKernel<K, V, D>: Send + Sync {
    /// Parses one partition-file line into `(key, data, out_degree)`.
    ///
    /// Returns `None` for a malformed line; the caller logs and skips it
    /// rather than aborting.
    fn read_data(&self, line: &str) -> Option<(K, D, usize)>;

    /// Initial `value` (F2) for a freshly loaded vertex.
    fn init_v(&self, k: &K, data: &D) -> V;

    /// Initial `delta` (F1) for a freshly loaded vertex.
    fn init_c(&self, k: &K, data: &D) -> V;

    /// Pre-propagation transform applied to a popped delta before it is
    /// folded into `value`. The identity transform (`|_, d, _, _| d`) is
    /// correct for kernels with no damping/decay step.
    fn process_delta_v(&self, k: &K, delta: V, value: &V, data: &D) -> V;

    /// The spreading rule: given the freshly popped (and
    /// `process_delta_v`-transformed) delta, emit `(target, message)`
    /// pairs into `output`. Must not retain `output`'s previous contents
    /// assumptions; callers always pass a cleared buffer.
    fn g_func(&self, k: &K, delta: &V, value: &V, data: &D, output: &mut Vec<(K, V)>);

    /// The monoid operation `a ⊕ b`. Must be commutative and associative.
    fn accumulate(&self, a: V, b: &V) -> V;

    /// Scalar priority used by the sampling scheduler. Higher values are
    /// scheduled first. Treating an identity (zero-progress) delta as
    /// lowest priority is the convention built-in kernels follow.
    fn priority(&self, value: &V, delta: &V) -> f64;

    /// The identity element of `accumulate`.
    fn default_v(&self) -> V;

    /// Extracts the out-neighbour keys from a parsed `data` payload, used
    /// only to seed copy-vertex `local_targets` when loading the
    /// `part${shard + num_shards}` adjacency file (see
    /// [`crate::partition::load_copy_partition`]). Kernels whose `D` is
    /// not adjacency-shaped can rely on the default empty list, since
    /// such kernels have no business enabling the copy-vertex path
    /// (`degree = u64::MAX`) in the first place.
    fn out_targets(&self, data: &D) -> Vec<K> {
        let _ = data;
        Vec::new()
    }
}

/// User-supplied termination criterion.
///
/// Implementations reduce a worker's local table to a scalar, which the
/// master then reduces again across workers and compares against the
/// previous snapshot.
pub trait TermChecker<V>: Send + Sync {
    /// Reduces one worker's current `(delta, value)` snapshot to a local
    /// scalar. The snapshot is a best-effort read, not a barrier:
    /// concurrent accumulation during the scan is tolerated.
    fn local_reduce(&self, rows: &[(V, V)]) -> f64;

    /// Reduces per-worker local scalars to one global scalar.
    fn global_reduce(&self, locals: &[f64]) -> f64;

    /// Returns true if iteration should stop given the previous and
    /// current global reduced values.
    fn converged(&self, previous: f64, current: f64) -> bool;
}

/// `Σ|delta|` local reduce, `Σ` global reduce, converges when the
/// absolute change between successive snapshots drops below `epsilon`.
/// Correct for any sum-accumulate kernel whose identity delta is zero.
#[derive(Debug, Clone, Copy)]
pub struct SumDeltaTermChecker {
    /// Convergence threshold `ε`.
    pub epsilon: f64,
}

impl<V> TermChecker<V> for SumDeltaTermChecker
where
    V: Into<f64> + Copy,
{
    fn local_reduce(&self, rows: &[(V, V)]) -> f64 {
        rows.iter().map(|(delta, _value)| (*delta).into().abs()).sum()
    }

    fn global_reduce(&self, locals: &[f64]) -> f64 {
        locals.iter().sum()
    }

    fn converged(&self, previous: f64, current: f64) -> bool {
        (previous - current).abs() < self.epsilon || current < self.epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_delta_term_checker_converges_on_small_change() {
        let checker = SumDeltaTermChecker { epsilon: 1e-4 };
        assert!(TermChecker::<f64>::converged(&checker, 0.00011, 0.0001));
        assert!(!TermChecker::<f64>::converged(&checker, 1.0, 0.5));
    }

    #[test]
    fn sum_delta_term_checker_converges_when_absolutely_small() {
        let checker = SumDeltaTermChecker { epsilon: 1e-4 };
        assert!(TermChecker::<f64>::converged(&checker, 10.0, 0.00005));
    }

    #[test]
    fn local_and_global_reduce_sum_magnitudes() {
        let checker = SumDeltaTermChecker { epsilon: 1e-4 };
        let rows: Vec<(f64, f64)> = vec![(-1.0, 2.0), (0.5, 3.0), (0.25, 1.0)];
        let local = checker.local_reduce(&rows);
        assert!((local - 1.75).abs() < 1e-9);
        let global = checker.global_reduce(&[local, local]);
        assert!((global - 3.5).abs() < 1e-9);
    }
}
