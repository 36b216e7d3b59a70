//! A lock-free, fixed-type object pool for high-frequency insert/remove under
//! unbounded multi-thread contention.
//!
//! This crate provides [`AtomicPool`], a growable pool of uniformly-sized
//! item slots that hands out and reclaims items without taking locks. It
//! targets workloads such as per-request node allocation in concurrent data
//! structures, where a general-purpose allocator's lock contention or
//! per-allocation metadata is too expensive.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that
//! provides mechanisms for high-performance hardware-aware programming in
//! Rust.
//!
//! # Key properties
//!
//! - **Lock-free**: every operation is a compare-exchange retry loop; no
//!   thread ever waits on another thread's lock
//! - **ABA-safe**: free-list pointers carry a version counter in their low
//!   alignment bits, so a slot that is freed and relinked between a stale
//!   read and its compare-exchange cannot cause a false match
//! - **Grow-only**: the pool grows one chunk at a time on demand and never
//!   returns memory to the system while it lives, which keeps every handed-out
//!   pointer valid until its item is removed
//! - **Stable addresses**: slots are never moved, resized or reused for a
//!   different slot, so no hazard-pointer or epoch machinery is needed
//!
//! # Failure model
//!
//! Contention (lost compare-exchanges, momentarily empty free lists, racing
//! growth) is resolved internally by retrying and never surfaces to callers.
//! The only externally visible failure is [`Error::ChunkAllocationFailed`]
//! when the memory system cannot back a new chunk. Hot paths never unwind.
//!
//! # Examples
//!
//! ```
//! use atomic_pool::AtomicPool;
//!
//! let pool = AtomicPool::<u64>::builder().build();
//!
//! let item = pool.insert(42).unwrap();
//!
//! // The pool hands out raw pointers; dereferencing them and returning them
//! // is the caller's responsibility.
//! // SAFETY: The item came from this pool and is not used again afterwards.
//! unsafe {
//!     assert_eq!(*item.as_ref(), 42);
//!     pool.remove(Some(item));
//! }
//! ```
//!
//! Growth is automatic; a pool with a full frontier chunk simply gets wider:
//!
//! ```
//! use std::num::NonZero;
//!
//! use atomic_pool::AtomicPool;
//!
//! let pool = AtomicPool::<u32>::builder()
//!     .slots_per_chunk(NonZero::new(2).unwrap())
//!     .build();
//!
//! let items: Vec<_> = (0..5).map(|n| pool.insert(n).unwrap()).collect();
//!
//! assert!(pool.chunk_count() >= 2);
//!
//! for item in items {
//!     // SAFETY: Each item came from this pool and is not used again.
//!     unsafe { pool.remove(Some(item)) };
//! }
//! ```

mod builder;
mod chunk;
mod drop_policy;
mod error;
mod object_pool;
mod pool;
mod slot;
mod tagging;

pub use builder::AtomicPoolBuilder;
pub use drop_policy::DropPolicy;
pub use error::Error;
pub use object_pool::ObjectPool;
pub use pool::AtomicPool;
pub use slot::{MAX_ITEM_ALIGN, MAX_ITEM_SIZE};
