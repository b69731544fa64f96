//! Vertex-to-shard partitioning.
//!
//! The partitioner is pure and deterministic: every worker must compute
//! the same `owner(v)` without coordination.

use std::hash::{Hash, Hasher};

/// Maps a vertex key to a shard id in `0..num_shards`.
///
/// Implementations must be pure functions of `(k, num_shards)` — no
/// interior mutability, no randomness.
pub trait Sharder<K>: Send + Sync {
    /// Returns the owning shard for `k` given `num_shards` total shards.
    fn shard_of(&self, k: &K, num_shards: usize) -> usize;
}

/// Default partitioner: literal `k % num_shards` for integer keys, used
/// by every built-in kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModSharder;

impl Sharder<u64> for ModSharder {
    fn shard_of(&self, k: &u64, num_shards: usize) -> usize {
        (k % num_shards as u64) as usize
    }
}

impl Sharder<i64> for ModSharder {
    fn shard_of(&self, k: &i64, num_shards: usize) -> usize {
        (k.rem_euclid(num_shards as i64)) as usize
    }
}

/// A fallback partitioner for keys with no natural modulus: hashes the
/// key and reduces mod `num_shards`. Still deterministic and pure as
/// long as `K`'s `Hash` impl is.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashSharder;

impl<K: Hash> Sharder<K> for HashSharder {
    fn shard_of(&self, k: &K, num_shards: usize) -> usize {
        let mut hasher = rustc_hash::FxHasher::default();
        k.hash(&mut hasher);
        (hasher.finish() % num_shards as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_sharder_is_deterministic_and_pure() {
        let s = ModSharder;
        for k in 0u64..100 {
            assert_eq!(s.shard_of(&k, 4), s.shard_of(&k, 4));
            assert!(s.shard_of(&k, 4) < 4);
        }
    }

    #[test]
    fn mod_sharder_matches_literal_modulo() {
        let s = ModSharder;
        assert_eq!(s.shard_of(&7u64, 3), 1);
        assert_eq!(s.shard_of(&9u64, 3), 0);
    }

    #[test]
    fn hash_sharder_is_deterministic() {
        let s = HashSharder;
        let k = "vertex-42".to_string();
        assert_eq!(s.shard_of(&k, 8), s.shard_of(&k, 8));
    }
}
