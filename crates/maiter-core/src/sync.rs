//! Synchronization primitives, switchable to loom's mocked versions for
//! concurrency testing.
//!
//! The state table's accumulate/swap critical section is the one place
//! in this crate where a lost update is a correctness bug, not
//! a performance bug. Loom lets us exhaustively interleave the writer and
//! reader threads that exercise it, instead of hoping a stress test
//! happens to catch a race. `dashmap`'s own internals aren't
//! loom-instrumented, so the loom test models the same pop/accumulate
//! pattern over a small hand-rolled striped structure built on these
//! aliases, mirroring the real table's locking discipline exactly.
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --features loom --test loom_accumulate --release
//! ```

#[cfg(loom)]
pub use loom::sync::Arc;

#[cfg(not(loom))]
pub use std::sync::Arc;

#[cfg(loom)]
pub use loom::sync::atomic::{AtomicBool, Ordering};

#[cfg(not(loom))]
pub use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(loom)]
pub use loom::thread;

#[cfg(not(loom))]
pub use std::thread;

// parking_lot has no loom-mocked equivalent; under loom we fall back to
// loom's own Mutex, which is what actually gets model-checked.
#[cfg(loom)]
pub use loom::sync::Mutex;

#[cfg(not(loom))]
pub use parking_lot::Mutex;
