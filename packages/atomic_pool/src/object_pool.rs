use std::ptr::NonNull;

use crate::Error;

/// Insert/remove capability of an object pool, decoupled from the concrete
/// pool implementation.
///
/// Callers that only need to obtain and return items can hold a
/// `&dyn ObjectPool<T>` instead of committing to [`AtomicPool`][crate::AtomicPool].
///
/// # Examples
///
/// ```
/// use atomic_pool::{AtomicPool, ObjectPool};
///
/// let pool = AtomicPool::<u64>::builder().build();
/// let pool: &dyn ObjectPool<u64> = &pool;
///
/// let item = pool.insert(42).unwrap();
///
/// // SAFETY: The item came from this pool and is not used again afterwards.
/// unsafe {
///     assert_eq!(*item.as_ref(), 42);
///     pool.remove(Some(item));
/// }
/// ```
pub trait ObjectPool<T> {
    /// Moves a value into the pool and returns a pointer to its new home.
    ///
    /// # Errors
    ///
    /// Fails only when the pool needed to grow and the memory system could
    /// not provide storage for a new chunk.
    fn insert(&self, value: T) -> Result<NonNull<T>, Error>;

    /// Drops the pointed-to item and returns its slot to the pool.
    ///
    /// Passing `None` is a no-op, so the result of a failed or bypassed
    /// insertion can be handed back without inspection.
    ///
    /// # Safety
    ///
    /// A `Some` pointer must have been returned by an insertion method of
    /// this same pool, must point to an item that is still live, and must not
    /// be used in any way after this call.
    unsafe fn remove(&self, ptr: Option<NonNull<T>>);
}
