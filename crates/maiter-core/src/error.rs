//! Error types for `maiter-core`.
//!
//! Configuration errors are fatal at startup, load errors are logged and
//! skipped, capacity exhaustion is fatal, transport errors retry with
//! backoff before becoming fatal, and kernel contract violations
//! (non-commutative accumulators, non-uniform `g_func` with copy-vertex
//! enabled) are caller responsibility and never detected at runtime.

use thiserror::Error;

/// Result type alias for `maiter-core` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `maiter-core` operations.
///
/// Error codes follow the pattern `MAITER-XXX` for easy cross-referencing
/// in logs.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration (MAITER-001). Fatal at startup.
    #[error("[MAITER-001] configuration error: {0}")]
    Config(String),

    /// Partition file could not be opened (MAITER-002). Fatal at startup.
    #[error("[MAITER-002] cannot open partition file '{0}'")]
    PartitionFileMissing(String),

    /// State table capacity exhausted and resize failed (MAITER-003). Fatal.
    #[error("[MAITER-003] state table capacity exhausted (entries={entries}, capacity={capacity})")]
    CapacityExhausted {
        /// Entries at the time of failure.
        entries: usize,
        /// Capacity at the time of failure.
        capacity: usize,
    },

    /// A remote shard was unreachable after exhausting retries (MAITER-004).
    #[error("[MAITER-004] transport to shard {shard} failed after {attempts} attempts: {reason}")]
    TransportFailed {
        /// Destination shard id.
        shard: usize,
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Underlying failure reason.
        reason: String,
    },

    /// Requested key is not present in the table (MAITER-005).
    ///
    /// `get` on an absent key is undefined by the table's core contract;
    /// this variant exists only for the checked accessors this crate
    /// exposes in addition to the unchecked contract ones.
    #[error("[MAITER-005] key not found in state table")]
    KeyNotFound,

    /// Row removal was requested (MAITER-006).
    ///
    /// Upstream declares a `remove` operation but never implements it;
    /// this crate treats row removal as unsupported rather than silently
    /// no-opping.
    #[error("[MAITER-006] row removal is not supported")]
    RemoveUnsupported,

    /// IO error (MAITER-007).
    #[error("[MAITER-007] io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown kernel name requested from the runner registry (MAITER-008).
    #[error("[MAITER-008] unknown kernel '{0}'")]
    UnknownKernel(String),

    /// Internal error (MAITER-009). Should not happen by construction.
    #[error("[MAITER-009] internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the error code (e.g. "MAITER-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "MAITER-001",
            Self::PartitionFileMissing(_) => "MAITER-002",
            Self::CapacityExhausted { .. } => "MAITER-003",
            Self::TransportFailed { .. } => "MAITER-004",
            Self::KeyNotFound => "MAITER-005",
            Self::RemoveUnsupported => "MAITER-006",
            Self::Io(_) => "MAITER-007",
            Self::UnknownKernel(_) => "MAITER-008",
            Self::Internal(_) => "MAITER-009",
        }
    }

    /// Returns true if the caller can plausibly retry or skip past this
    /// error rather than aborting the process.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::KeyNotFound | Self::TransportFailed { .. })
    }
}
