use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::pool::{DEFAULT_SLOTS_PER_CHUNK, DEFAULT_TAG_MASK};
use crate::{AtomicPool, DropPolicy};

/// Builder for creating an instance of [`AtomicPool`].
///
/// All settings are optional; the defaults (1000 slots per chunk, a five-bit
/// tag mask, leak-tolerant drop behavior) suit most uses.
///
/// # Examples
///
/// ```
/// use atomic_pool::AtomicPool;
///
/// let pool = AtomicPool::<u64>::builder().build();
/// # drop(pool);
/// ```
///
/// With a custom chunk size:
///
/// ```
/// use std::num::NonZero;
///
/// use atomic_pool::AtomicPool;
///
/// let pool = AtomicPool::<u64>::builder()
///     .slots_per_chunk(NonZero::new(64).unwrap())
///     .build();
/// # drop(pool);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred
/// between threads, allowing pool configuration to happen on a different
/// thread than where the pool is used. However, it is not thread-safe
/// ([`Sync`]) as it contains mutable configuration state.
#[must_use]
pub struct AtomicPoolBuilder<T> {
    slots_per_chunk: NonZero<usize>,
    tag_mask: usize,
    drop_policy: DropPolicy,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe.
    _not_sync: PhantomData<(fn() -> T, Cell<()>)>,
}

impl<T> AtomicPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots_per_chunk: DEFAULT_SLOTS_PER_CHUNK,
            tag_mask: DEFAULT_TAG_MASK,
            drop_policy: DropPolicy::default(),
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of slots in each chunk of the pool.
    ///
    /// Larger chunks mean fewer growth events under sustained demand at the
    /// cost of a coarser allocation granularity.
    #[inline]
    pub fn slots_per_chunk(mut self, slots_per_chunk: NonZero<usize>) -> Self {
        self.slots_per_chunk = slots_per_chunk;
        self
    }

    /// Sets the tag mask: the low pointer bits that carry the free-list
    /// version counter.
    ///
    /// Must be of the form `2^k - 1` and fit within the zero bits guaranteed
    /// by the slot alignment; [`build`][Self::build] validates this. A wider
    /// mask tolerates more pop/push cycles between a stale read and its
    /// compare-exchange before a false match becomes possible.
    #[inline]
    pub fn tag_mask(mut self, tag_mask: usize) -> Self {
        self.tag_mask = tag_mask;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat items still live when the pool is dropped.
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if the tag mask is not of the form `2^k - 1`, if it does not
    /// fit within the slot alignment, or if the initial chunk cannot be
    /// allocated.
    #[must_use]
    pub fn build(self) -> AtomicPool<T> {
        AtomicPool::new_inner(self.slots_per_chunk, self.tag_mask, self.drop_policy)
    }
}

impl<T> fmt::Debug for AtomicPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicPoolBuilder")
            .field("slots_per_chunk", &self.slots_per_chunk)
            .field("tag_mask", &self.tag_mask)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}
