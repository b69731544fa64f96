//! The RPC transport interface plus one concrete, in-process
//! implementation over bounded `crossbeam-channel` channels.
//!
//! A real cluster-spanning transport is out of scope: workers here run
//! as threads in one process rather than as separate processes
//! on separate machines. [`InProcessTransport`] exists so the rest of the
//! subsystem — routing, batching, backpressure, cooperative shutdown —
//! can be built and tested against a real (if local) transport instead
//! of a mock.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::time::Duration;

use crate::error::{Error, Result};

/// A single `(key, delta)` message destined for a remote shard.
#[derive(Debug, Clone)]
pub struct Envelope<K, V> {
    /// Target vertex key.
    pub key: K,
    /// Delta to accumulate at the target.
    pub delta: V,
}

/// An envelope destined for a copy-vertex's remote replica rather than a
/// primary row directly: `vertex` identifies which high-fanout vertex's
/// copy row to accumulate into.
#[derive(Debug, Clone)]
pub struct CopyEnvelope<K, V> {
    /// The high-fanout vertex whose copy-row delta is being consolidated.
    pub vertex: K,
    /// The per-neighbour message value (uniform across the vertex's
    /// local-to-that-shard neighbours).
    pub delta: V,
}

/// What a shard's receiver thread pulls off the wire: either a direct
/// accumulation into a primary row, or a consolidated copy-row delta.
#[derive(Debug, Clone)]
pub enum Inbound<K, V> {
    /// Direct delta for a primary row this shard owns.
    Direct(Envelope<K, V>),
    /// Consolidated delta for a copy-vertex replica this shard hosts.
    Copy(CopyEnvelope<K, V>),
}

/// Outbound message queue semantics between shards, abstracting over
/// whatever actually moves bytes between workers.
///
/// Implementations may buffer per destination and flush in batches; a
/// flush is required at least once per caller-defined batch. No
/// ordering is guaranteed across destinations, and none is required
/// within one destination since `accumulate` is commutative.
pub trait Transport<K, V>: Send + Sync {
    /// Sends a direct delta to `dest_shard`. May block briefly under
    /// backpressure if the destination's inbound queue is full.
    fn send_direct(&self, dest_shard: usize, key: K, delta: V) -> Result<()>;

    /// Sends a consolidated copy-vertex delta to `dest_shard`.
    fn send_copy(&self, dest_shard: usize, vertex: K, delta: V) -> Result<()>;

    /// Drains every inbound message currently queued for this shard,
    /// without blocking.
    fn drain_inbound(&self, this_shard: usize) -> Vec<Inbound<K, V>>;
}

/// Bounded in-process transport: one pair of bounded channels per
/// ordered `(src, dst)` shard pair, all owned by one `InProcessTransport`
/// instance shared across every worker thread.
///
/// Bounded capacity is the transport's backpressure mechanism: a full
/// inbound queue causes `send_direct`/`send_copy` to retry with a short
/// backoff before giving up.
pub struct InProcessTransport<K, V> {
    num_shards: usize,
    // inbound[i] is shard i's inbound queue, fed by every other shard.
    senders: Vec<Sender<Inbound<K, V>>>,
    receivers: Vec<Receiver<Inbound<K, V>>>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<K, V> InProcessTransport<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    /// Builds a fully-connected in-process transport for `num_shards`
    /// shards, each with an inbound queue of `queue_capacity`.
    #[must_use]
    pub fn new(num_shards: usize, queue_capacity: usize) -> Self {
        let mut senders = Vec::with_capacity(num_shards);
        let mut receivers = Vec::with_capacity(num_shards);
        for _ in 0..num_shards {
            let (tx, rx) = crossbeam_channel::bounded(queue_capacity);
            senders.push(tx);
            receivers.push(rx);
        }
        Self {
            num_shards,
            senders,
            receivers,
            max_attempts: 8,
            retry_backoff: Duration::from_millis(2),
        }
    }

    /// Returns a cheaply-cloneable handle that can send to any shard;
    /// each worker thread holds one.
    #[must_use]
    pub fn sender_handle(&self) -> TransportHandle<K, V>
    where
        K: Clone,
        V: Clone,
    {
        TransportHandle {
            senders: self.senders.clone(),
            max_attempts: self.max_attempts,
            retry_backoff: self.retry_backoff,
        }
    }

    fn receiver_for(&self, shard: usize) -> &Receiver<Inbound<K, V>> {
        &self.receivers[shard]
    }

    /// Number of shards this transport was built for.
    #[must_use]
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }
}

impl<K, V> Transport<K, V> for InProcessTransport<K, V>
where
    K: Send + Sync + Clone + 'static,
    V: Send + Sync + Clone + 'static,
{
    fn send_direct(&self, dest_shard: usize, key: K, delta: V) -> Result<()> {
        send_with_retry(
            &self.senders[dest_shard],
            Inbound::Direct(Envelope { key, delta }),
            dest_shard,
            self.max_attempts,
            self.retry_backoff,
        )
    }

    fn send_copy(&self, dest_shard: usize, vertex: K, delta: V) -> Result<()> {
        send_with_retry(
            &self.senders[dest_shard],
            Inbound::Copy(CopyEnvelope { vertex, delta }),
            dest_shard,
            self.max_attempts,
            self.retry_backoff,
        )
    }

    fn drain_inbound(&self, this_shard: usize) -> Vec<Inbound<K, V>> {
        self.receiver_for(this_shard).try_iter().collect()
    }
}

/// A cloneable sending handle into an [`InProcessTransport`], for worker
/// threads that only ever send (the shared receivers stay with the
/// transport/receiver threads).
#[derive(Clone)]
pub struct TransportHandle<K, V> {
    senders: Vec<Sender<Inbound<K, V>>>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<K, V> TransportHandle<K, V>
where
    K: Send + Sync + Clone + 'static,
    V: Send + Sync + Clone + 'static,
{
    /// Sends a direct delta to `dest_shard`.
    pub fn send_direct(&self, dest_shard: usize, key: K, delta: V) -> Result<()> {
        send_with_retry(
            &self.senders[dest_shard],
            Inbound::Direct(Envelope { key, delta }),
            dest_shard,
            self.max_attempts,
            self.retry_backoff,
        )
    }

    /// Sends a consolidated copy-vertex delta to `dest_shard`.
    pub fn send_copy(&self, dest_shard: usize, vertex: K, delta: V) -> Result<()> {
        send_with_retry(
            &self.senders[dest_shard],
            Inbound::Copy(CopyEnvelope { vertex, delta }),
            dest_shard,
            self.max_attempts,
            self.retry_backoff,
        )
    }
}

fn send_with_retry<K, V>(
    sender: &Sender<Inbound<K, V>>,
    mut msg: Inbound<K, V>,
    dest_shard: usize,
    max_attempts: u32,
    backoff: Duration,
) -> Result<()> {
    for attempt in 1..=max_attempts {
        match sender.try_send(msg) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(returned)) => {
                msg = returned;
                tracing::warn!(dest_shard, attempt, "inbound queue full, backing off");
                std::thread::sleep(backoff);
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(Error::TransportFailed {
                    shard: dest_shard,
                    attempts: attempt,
                    reason: "receiver disconnected".to_string(),
                });
            }
        }
    }
    Err(Error::TransportFailed {
        shard: dest_shard,
        attempts: max_attempts,
        reason: "inbound queue stayed full".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_send_and_drain_roundtrip() {
        let transport: InProcessTransport<u64, f64> = InProcessTransport::new(2, 16);
        transport.send_direct(1, 42, 0.5).unwrap();
        let inbound = transport.drain_inbound(1);
        assert_eq!(inbound.len(), 1);
        match &inbound[0] {
            Inbound::Direct(env) => {
                assert_eq!(env.key, 42);
                assert!((env.delta - 0.5).abs() < 1e-12);
            }
            Inbound::Copy(_) => panic!("expected direct envelope"),
        }
    }

    #[test]
    fn copy_send_and_drain_roundtrip() {
        let transport: InProcessTransport<u64, f64> = InProcessTransport::new(2, 16);
        transport.send_copy(0, 7, 1.5).unwrap();
        let inbound = transport.drain_inbound(0);
        assert_eq!(inbound.len(), 1);
        match &inbound[0] {
            Inbound::Copy(env) => {
                assert_eq!(env.vertex, 7);
                assert!((env.delta - 1.5).abs() < 1e-12);
            }
            Inbound::Direct(_) => panic!("expected copy envelope"),
        }
    }

    #[test]
    fn drain_on_empty_queue_returns_empty() {
        let transport: InProcessTransport<u64, f64> = InProcessTransport::new(2, 16);
        assert!(transport.drain_inbound(0).is_empty());
    }

    #[test]
    fn full_queue_eventually_fails_with_transport_error() {
        let transport: InProcessTransport<u64, f64> = InProcessTransport::new(1, 1);
        // fill the one slot
        transport.send_direct(0, 1, 1.0).unwrap();
        let err = transport.send_direct(0, 2, 2.0).unwrap_err();
        assert!(matches!(err, Error::TransportFailed { .. }));
    }
}
