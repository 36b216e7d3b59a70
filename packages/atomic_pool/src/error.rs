use thiserror::Error;

/// Errors that can occur when operating an [`AtomicPool`][crate::AtomicPool].
///
/// Transient conditions (contended compare-exchanges, momentarily exhausted
/// free lists) are resolved internally and never surface here. The only
/// externally visible failure is genuine resource exhaustion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The memory system could not provide backing storage for a new pool chunk.
    ///
    /// The pool remains fully usable; the caller may retry, back off or report.
    #[error("failed to allocate backing storage for a pool chunk of {slot_count} slots")]
    ChunkAllocationFailed {
        /// Number of slots the chunk that failed to allocate would have held.
        slot_count: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
