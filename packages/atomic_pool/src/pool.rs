use std::fmt;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::{ptr, thread};

use new_zealand::nz;

use crate::chunk::Chunk;
use crate::error::Result;
use crate::slot::Slot;
use crate::tagging::AddressTagger;
use crate::{DropPolicy, Error, ObjectPool};

/// Default number of slots in each chunk of the pool.
pub(crate) const DEFAULT_SLOTS_PER_CHUNK: NonZero<usize> = nz!(1000);

/// Default tag mask: five version bits, well within the six zero bits that
/// the 64-byte slot alignment guarantees.
pub(crate) const DEFAULT_TAG_MASK: usize = 0b11111;

/// A lock-free object pool for items of a single type `T`.
///
/// The pool hands out and reclaims uniformly-sized item slots under unbounded
/// multi-thread contention without taking locks. It grows on demand, one
/// chunk of slots at a time, and never returns memory to the system while it
/// lives. This targets high-frequency insert/remove patterns, such as
/// per-request node allocation in concurrent data structures, where a
/// general-purpose allocator's contention or metadata overhead is too costly.
///
/// Internally the pool is a singly-linked chain of fixed-size chunks anchored
/// by two permanent sentinel chunks. Insertions pop a slot from the free list
/// of the frontier chunk (the one right after the head sentinel); when that
/// list is exhausted, a fresh chunk is prepended to the chain with a guarded
/// compare-exchange so racing threads cannot install duplicates. Removals
/// push the slot onto the frontier chunk's free list, which is not
/// necessarily the chunk the slot's storage came from.
///
/// Every operation is lock-free: a thread may retry its own compare-exchange
/// under contention, but it never waits on another thread, and some thread
/// always makes progress.
///
/// # Item requirements
///
/// `size_of::<T>()` must not exceed [`MAX_ITEM_SIZE`][crate::MAX_ITEM_SIZE]
/// and `align_of::<T>()` must not exceed
/// [`MAX_ITEM_ALIGN`][crate::MAX_ITEM_ALIGN]. A type that does not fit is
/// rejected at compile time.
///
/// # Pointer stability
///
/// Chunks are never resized, relocated or released while the pool lives, so
/// a pointer returned by an insertion stays valid until the item is removed
/// or the pool is dropped. This address stability is also what makes the
/// pool's tagged-pointer ABA defense sufficient without hazard pointers.
///
/// # Examples
///
/// ```
/// use atomic_pool::AtomicPool;
///
/// let pool = AtomicPool::<u64>::builder().build();
///
/// let item = pool.insert(42).unwrap();
///
/// // SAFETY: The item came from this pool and is not used again afterwards.
/// unsafe {
///     assert_eq!(*item.as_ref(), 42);
///     pool.remove(Some(item));
/// }
/// ```
///
/// Shared across threads:
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use atomic_pool::AtomicPool;
///
/// let pool = Arc::new(AtomicPool::<u64>::builder().build());
///
/// let workers: Vec<_> = (0..4)
///     .map(|worker| {
///         let pool = Arc::clone(&pool);
///         thread::spawn(move || {
///             let item = pool.insert(worker).unwrap();
///             // SAFETY: The item came from this pool and is not used again.
///             unsafe { pool.remove(Some(item)) };
///         })
///     })
///     .collect();
///
/// for worker in workers {
///     worker.join().unwrap();
/// }
/// ```
pub struct AtomicPool<T> {
    /// Head sentinel; never holds slots, never the allocation target. Its
    /// chain link points at the frontier chunk.
    head: NonNull<Chunk<T>>,

    /// Tail sentinel; terminates the chain and bounds diagnostics walks.
    tail: NonNull<Chunk<T>>,

    /// Raised when a thread observes the frontier exhausted, lowered by the
    /// thread that prepares a replacement chunk. Several threads may observe
    /// it; only one chain installation wins.
    needs_chunk: AtomicBool,

    tagger: AddressTagger,

    slots_per_chunk: NonZero<usize>,

    drop_policy: DropPolicy,

    _items: PhantomData<T>,
}

// SAFETY: The pool moves items of T across threads (inserted on one, removed
// on another) but never shares references to them itself, so T: Send is
// required and sufficient. All internal shared state is accessed via atomics.
unsafe impl<T: Send> Send for AtomicPool<T> {}

// SAFETY: As above; every &self operation is built from atomic loads and
// compare-exchanges, which is the point of the type.
unsafe impl<T: Send> Sync for AtomicPool<T> {}

impl<T> AtomicPool<T> {
    /// Creates a builder for configuring a new pool.
    pub fn builder() -> crate::AtomicPoolBuilder<T> {
        crate::AtomicPoolBuilder::new()
    }

    pub(crate) fn new_inner(
        slots_per_chunk: NonZero<usize>,
        tag_mask: usize,
        drop_policy: DropPolicy,
    ) -> Self {
        assert!(
            tag_mask.wrapping_add(1).is_power_of_two(),
            "tag mask must be of the form 2^k - 1, got {tag_mask:#b}"
        );
        assert!(
            tag_mask < align_of::<Slot<T>>(),
            "tag mask {tag_mask:#b} does not fit in the zero bits guaranteed by the slot alignment {}",
            align_of::<Slot<T>>()
        );

        let tagger = AddressTagger::new(tag_mask);

        let tail = NonNull::from(Box::leak(Chunk::sentinel(tagger)));
        let head = NonNull::from(Box::leak(Chunk::sentinel(tagger)));

        let first = Chunk::with_slots(slots_per_chunk, tagger)
            .expect("we do not intend to handle allocation failure during pool construction - OOM results in panic");
        let first = Box::into_raw(first);

        // Chain: head -> first -> tail, wired before the pool is shared.
        // SAFETY: Just created via Box::into_raw, valid and exclusively ours.
        unsafe { &*first }.link_next(tail.as_ptr());

        // SAFETY: Just leaked above, valid for the pool's lifetime.
        unsafe { head.as_ref() }.link_next(first);

        Self {
            head,
            tail,
            needs_chunk: AtomicBool::new(false),
            tagger,
            slots_per_chunk,
            drop_policy,
            _items: PhantomData,
        }
    }

    /// Moves a value into the pool and returns a pointer to its new home.
    ///
    /// The pointer stays valid until the item is removed or the pool is
    /// dropped. Reading or writing through it is the caller's unsafe
    /// responsibility, as is eventually handing it back via
    /// [`remove`][Self::remove].
    ///
    /// # Errors
    ///
    /// Fails only when the pool needed to grow and the memory system could
    /// not provide storage for a new chunk. Contention never surfaces as an
    /// error; the operation retries internally until it wins.
    pub fn insert(&self, value: T) -> Result<NonNull<T>> {
        // SAFETY: The closure fully initializes the item.
        unsafe {
            self.insert_with(|place| {
                place.write(value);
            })
        }
    }

    /// Initializes an item in place inside a freshly obtained slot.
    ///
    /// Useful when the item is expensive to construct and move, or when it
    /// should learn its own address during initialization.
    ///
    /// # Errors
    ///
    /// As for [`insert`][Self::insert].
    ///
    /// # Panics
    ///
    /// If `f` panics, the slot being initialized is lost to the pool: it is
    /// neither live nor linked into any free list.
    ///
    /// # Safety
    ///
    /// The closure must fully initialize the item before returning.
    pub unsafe fn insert_with(&self, f: impl FnOnce(&mut MaybeUninit<T>)) -> Result<NonNull<T>> {
        let slot = self.allocate_slot()?;

        // SAFETY: The slot was just popped from a free list, so its storage
        // is exclusively ours and nothing holds a reference into it.
        let value_ptr = unsafe { slot.as_ref() }.value_ptr();

        let mut place = value_ptr.cast::<MaybeUninit<T>>();

        // SAFETY: Valid for writes of T (slot storage fits T by compile-time
        // check) and exclusively ours, per above.
        f(unsafe { place.as_mut() });

        Ok(value_ptr)
    }

    /// Drops the pointed-to item and returns its slot to the pool.
    ///
    /// The slot is pushed onto the free list of the *current* frontier chunk,
    /// which over time need not be the chunk the slot's storage came from.
    /// Free-list membership is independent of storage ownership, so this is
    /// the intended behavior, not an accounting bug.
    ///
    /// Passing `None` is a no-op, so the result of a bypassed insertion can
    /// be handed back without inspection.
    ///
    /// # Safety
    ///
    /// A `Some` pointer must have been returned by an insertion method of
    /// this same pool, must point to an item that is still live, and must not
    /// be used in any way after this call.
    pub unsafe fn remove(&self, ptr: Option<NonNull<T>>) {
        let Some(value_ptr) = ptr else {
            return;
        };

        // SAFETY: The caller guarantees the item is live and exclusively
        // ours to tear down.
        unsafe {
            ptr::drop_in_place(value_ptr.as_ptr());
        }

        // SAFETY: The caller guarantees the pointer came from an insertion
        // method of this pool, i.e. from Slot::value_ptr.
        let slot = unsafe { Slot::from_value_ptr(value_ptr) };

        self.deallocate_slot(slot);
    }

    /// Adds one chunk to the pool ahead of demand.
    ///
    /// Same effect as the growth the pool performs by itself when the
    /// frontier chunk runs dry, including the guarded installation that
    /// keeps racing growers from inserting duplicates.
    ///
    /// # Errors
    ///
    /// Fails when the memory system cannot provide storage for the chunk.
    pub fn grow(&self) -> Result<()> {
        let new_chunk = self.new_chunk()?;

        // SAFETY: Sentinels live as long as the pool.
        let head = unsafe { self.head.as_ref() };

        let mut frontier = head.next_chunk();

        loop {
            // SAFETY: Just created, exclusively ours until installed.
            unsafe { &*new_chunk }.link_next(frontier);

            match head.next_atomic().compare_exchange(
                frontier,
                new_chunk,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => frontier = actual,
            }
        }
    }

    /// Best-effort count of free slots across all data chunks.
    ///
    /// The underlying walks race with concurrent inserts and removes, so the
    /// result is a diagnostic snapshot, not a number to base flow control on.
    /// At quiescence it is exact.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.chunk_free_counts().into_iter().sum()
    }

    /// Best-effort free-slot count of each data chunk, frontier first.
    ///
    /// Counts entries of each chunk's free list. A freed slot joins the list
    /// of whichever chunk was the frontier at the time, so these are
    /// list-membership counts, not storage-origin counts.
    #[must_use]
    pub fn chunk_free_counts(&self) -> Vec<usize> {
        let mut counts = Vec::new();

        self.for_each_data_chunk(|chunk| counts.push(chunk.free_count()));

        counts
    }

    /// Number of data chunks currently in the chain.
    ///
    /// Monotonically non-decreasing for the pool's lifetime.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        let mut count = 0_usize;

        // Cannot overflow: chunk count is bounded by available memory.
        self.for_each_data_chunk(|_| count = count.wrapping_add(1));

        count
    }

    fn for_each_data_chunk(&self, mut f: impl FnMut(&Chunk<T>)) {
        // SAFETY: Sentinels live as long as the pool.
        let mut cursor = unsafe { self.head.as_ref() }.next_chunk();

        while cursor != self.tail.as_ptr() {
            // SAFETY: Chunks are never removed from the chain while the pool
            // lives, so every pointer reachable from the head stays valid.
            let chunk = unsafe { &*cursor };

            f(chunk);

            cursor = chunk.next_chunk();
        }
    }

    fn new_chunk(&self) -> Result<*mut Chunk<T>> {
        Chunk::with_slots(self.slots_per_chunk, self.tagger)
            .map(Box::into_raw)
            .ok_or(Error::ChunkAllocationFailed {
                slot_count: self.slots_per_chunk.get(),
            })
    }

    /// Obtains a free slot, growing the chain when the frontier runs dry.
    ///
    /// The loop never gives up because of contention; it returns an error
    /// only when a new chunk is needed and cannot be allocated while no slot
    /// is in hand.
    fn allocate_slot(&self) -> Result<NonNull<Slot<T>>> {
        // SAFETY: Sentinels live as long as the pool.
        let head = unsafe { self.head.as_ref() };

        loop {
            let frontier_ptr = head.next_chunk();

            // SAFETY: Chunks are never removed from the chain while the pool
            // lives; the chain always holds at least the tail sentinel.
            let frontier = unsafe { &*frontier_ptr };

            let popped = frontier.try_pop_free();

            if popped.is_none() {
                self.raise_needs_chunk();
            }

            if !self.needs_chunk.load(Ordering::Acquire) {
                match popped {
                    Some(slot) => return Ok(slot),
                    // Another thread is mid-growth; its chunk will appear.
                    None => continue,
                }
            }

            // Growth: prepare a chunk that logically precedes the frontier
            // we examined, then try to install it as the new frontier.
            let new_chunk = match self.new_chunk() {
                Ok(chunk) => chunk,
                Err(error) => {
                    // A slot in hand outranks the failed growth; the flag
                    // stays raised for the next caller to retry.
                    return popped.ok_or(error);
                }
            };

            // SAFETY: Just created, exclusively ours until installed.
            unsafe { &*new_chunk }.link_next(frontier_ptr);

            self.lower_needs_chunk();

            match head.next_atomic().compare_exchange(
                frontier_ptr,
                new_chunk,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if let Some(slot) = popped {
                        return Ok(slot);
                    }
                }
                Err(_) => {
                    // Another thread changed the frontier between our read
                    // and our install; discard the speculative chunk and use
                    // the chain it grew instead.
                    // SAFETY: Never installed, still exclusively ours.
                    drop(unsafe { Box::from_raw(new_chunk) });

                    if let Some(slot) = popped {
                        return Ok(slot);
                    }
                }
            }
        }
    }

    fn deallocate_slot(&self, slot: NonNull<Slot<T>>) {
        // SAFETY: Sentinels live as long as the pool.
        let head = unsafe { self.head.as_ref() };

        // The frontier at the time of the call, not necessarily the chunk
        // this slot's storage belongs to.
        // SAFETY: Chunks are never removed from the chain while the pool lives.
        let frontier = unsafe { &*head.next_chunk() };

        frontier.push_free(slot);
    }

    fn raise_needs_chunk(&self) {
        let mut observed = self.needs_chunk.load(Ordering::Acquire);

        while let Err(actual) =
            self.needs_chunk
                .compare_exchange_weak(observed, true, Ordering::AcqRel, Ordering::Acquire)
        {
            observed = actual;
        }
    }

    fn lower_needs_chunk(&self) {
        let mut observed = self.needs_chunk.load(Ordering::Acquire);

        while let Err(actual) =
            self.needs_chunk
                .compare_exchange_weak(observed, false, Ordering::AcqRel, Ordering::Acquire)
        {
            observed = actual;
        }
    }

    /// Validates the free-list topology: every list terminates, no slot is
    /// linked twice and the lists never hold more entries than the pool has
    /// slots.
    ///
    /// Requires exclusive access because the walk is only meaningful at
    /// quiescence.
    #[cfg(debug_assertions)]
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[expect(
        clippy::needless_pass_by_ref_mut,
        reason = "exclusive access stands in for quiescence"
    )]
    pub(crate) fn integrity_check(&mut self) {
        use std::collections::HashSet;

        let mut capacity = 0_usize;

        self.for_each_data_chunk(|chunk| {
            capacity = capacity
                .checked_add(chunk.slot_count())
                .expect("slot capacity fits in usize");
        });

        let tagger = self.tagger;
        let mut seen: HashSet<usize> = HashSet::new();

        self.for_each_data_chunk(|chunk| {
            let mut cursor = tagger.untagged(chunk.free_head_snapshot());

            while let Some(slot) = NonNull::new(cursor) {
                assert!(
                    seen.insert(slot.as_ptr().addr()),
                    "slot {slot:?} is linked into a free list more than once"
                );

                // SAFETY: Slots are never deallocated while the pool lives.
                cursor = tagger.untagged(unsafe { slot.as_ref() }.next_free().load(Ordering::Acquire));
            }
        });

        assert!(
            seen.len() <= capacity,
            "free lists hold {} slots but the pool only has {capacity}",
            seen.len()
        );
    }
}

impl<T> ObjectPool<T> for AtomicPool<T> {
    fn insert(&self, value: T) -> Result<NonNull<T>> {
        Self::insert(self, value)
    }

    unsafe fn remove(&self, ptr: Option<NonNull<T>>) {
        // SAFETY: Forwarding the trait contract to the inherent method.
        unsafe { Self::remove(self, ptr) }
    }
}

impl<T> Drop for AtomicPool<T> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.integrity_check();

        // Dropping is only defined at quiescence, so the walk is exact.
        let mut capacity = 0_usize;
        let mut free = 0_usize;

        self.for_each_data_chunk(|chunk| {
            capacity = capacity
                .checked_add(chunk.slot_count())
                .expect("slot capacity fits in usize");
            free = free
                .checked_add(chunk.free_count())
                .expect("free count fits in usize");
        });

        let mut cursor = self.head.as_ptr();

        while !cursor.is_null() {
            // SAFETY: Every chunk in the chain, sentinels included, was
            // created via Box::into_raw/Box::leak and is freed exactly once
            // in this walk.
            let chunk = unsafe { Box::from_raw(cursor) };

            cursor = chunk.next_chunk();
        }

        // We free the memory first and only then check the policy, so that a
        // failing check does not also leak the arena. If we are already
        // panicking, do not panic again and obscure the original failure.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotLeakItems) {
            // Cannot underflow: a free list entry always corresponds to one
            // of the pool's slots.
            let live = capacity.wrapping_sub(free);

            assert!(
                live == 0,
                "dropped a pool with {live} live items - this is forbidden by DropPolicy::MustNotLeakItems"
            );
        }
    }
}

impl<T> fmt::Debug for AtomicPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicPool")
            .field("slots_per_chunk", &self.slots_per_chunk)
            .field("tag_mask", &self.tagger.mask())
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::assert_impl_all;

    use super::*;

    // The whole point of the pool is to be shared across threads.
    assert_impl_all!(AtomicPool<u64>: Send, Sync, std::fmt::Debug);

    fn small_pool() -> AtomicPool<u64> {
        AtomicPool::builder().slots_per_chunk(nz!(4)).build()
    }

    /// Test helper that tracks whether it has been dropped.
    struct DropTracker {
        dropped: Rc<Cell<bool>>,
    }

    impl DropTracker {
        fn new() -> (Self, Rc<Cell<bool>>) {
            let dropped = Rc::new(Cell::new(false));
            (
                Self {
                    dropped: Rc::clone(&dropped),
                },
                dropped,
            )
        }
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    #[test]
    fn insert_and_read_back() {
        let pool = small_pool();

        let item = pool.insert(42).expect("fresh pool has capacity");

        unsafe {
            assert_eq!(*item.as_ref(), 42);
            pool.remove(Some(item));
        }
    }

    #[test]
    fn inserted_items_have_distinct_addresses() {
        let pool = small_pool();

        let items: Vec<_> = (0..4)
            .map(|n| pool.insert(n).expect("within chunk capacity"))
            .collect();

        for (i, a) in items.iter().enumerate() {
            for b in items.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }

        for item in items {
            unsafe { pool.remove(Some(item)) };
        }
    }

    #[test]
    fn remove_none_is_a_noop() {
        let pool = small_pool();

        unsafe { pool.remove(None) };

        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn removed_slot_is_obtainable_again() {
        let pool = small_pool();

        let first = pool.insert(1).expect("fresh pool has capacity");
        let first_addr = first.as_ptr();

        unsafe { pool.remove(Some(first)) };

        // The freed slot sits at the head of the frontier free list, so the
        // next insertion gets exactly that slot back.
        let second = pool.insert(2).expect("slot was just returned");

        assert_eq!(second.as_ptr(), first_addr);

        unsafe { pool.remove(Some(second)) };
    }

    #[test]
    fn remove_runs_the_destructor() {
        let pool = AtomicPool::<DropTracker>::builder()
            .slots_per_chunk(nz!(2))
            .build();

        let (tracker, dropped) = DropTracker::new();

        let item = pool.insert(tracker).expect("fresh pool has capacity");

        assert!(!dropped.get());

        unsafe { pool.remove(Some(item)) };

        assert!(dropped.get());
    }

    #[test]
    fn insert_with_initializes_in_place() {
        let pool = small_pool();

        // SAFETY: The closure fully initializes the item.
        let item = unsafe {
            pool.insert_with(|place| {
                place.write(7);
            })
        }
        .expect("fresh pool has capacity");

        unsafe {
            assert_eq!(*item.as_ref(), 7);
            pool.remove(Some(item));
        }
    }

    #[test]
    fn pool_grows_when_frontier_is_exhausted() {
        let pool = AtomicPool::<u64>::builder().slots_per_chunk(nz!(2)).build();

        assert_eq!(pool.chunk_count(), 1);

        let items: Vec<_> = (0..5)
            .map(|n| pool.insert(n).expect("pool grows on demand"))
            .collect();

        assert!(pool.chunk_count() >= 2);

        for item in items {
            unsafe { pool.remove(Some(item)) };
        }

        // At quiescence, every slot is free again.
        let capacity = pool.chunk_count().checked_mul(2).expect("small numbers");
        assert_eq!(pool.free_count(), capacity);
    }

    #[test]
    fn explicit_grow_prepends_a_chunk() {
        let pool = small_pool();

        let before = pool.chunk_count();
        let free_before = pool.free_count();

        pool.grow().expect("growth allocation is not expected to fail");

        assert_eq!(pool.chunk_count(), before + 1);
        assert_eq!(pool.free_count(), free_before + 4);

        // The fresh chunk is the new frontier.
        assert_eq!(pool.chunk_free_counts().first(), Some(&4));
    }

    #[test]
    fn diagnostics_reflect_quiescent_state() {
        let pool = small_pool();

        assert_eq!(pool.free_count(), 4);
        assert_eq!(pool.chunk_free_counts(), vec![4]);

        let item = pool.insert(9).expect("fresh pool has capacity");

        assert_eq!(pool.free_count(), 3);

        unsafe { pool.remove(Some(item)) };

        assert_eq!(pool.free_count(), 4);
    }

    #[test]
    fn free_list_stays_sound_under_churn() {
        let pool = AtomicPool::<u64>::builder().slots_per_chunk(nz!(8)).build();

        for round in 0..100 {
            let items: Vec<_> = (0..8)
                .map(|n| pool.insert(round * 8 + n).expect("within capacity"))
                .collect();

            for item in items {
                unsafe { pool.remove(Some(item)) };
            }
        }

        assert_eq!(pool.free_count(), 8);

        // Dropping the pool also runs the debug-build free-list validation.
        drop(pool);
    }

    #[test]
    fn works_through_the_capability_trait() {
        let pool = small_pool();
        let pool: &dyn ObjectPool<u64> = &pool;

        let item = pool.insert(11).expect("fresh pool has capacity");

        unsafe {
            assert_eq!(*item.as_ref(), 11);
            pool.remove(Some(item));
        }
    }

    #[test]
    fn may_leak_items_tolerates_live_items_at_drop() {
        let pool = small_pool();

        let _item = pool.insert(1).expect("fresh pool has capacity");

        // Default policy: dropping with a live item is fine; its storage is
        // released without running the destructor.
        drop(pool);
    }

    #[test]
    #[should_panic]
    fn must_not_leak_items_panics_on_live_items_at_drop() {
        let pool = AtomicPool::<u64>::builder()
            .slots_per_chunk(nz!(4))
            .drop_policy(DropPolicy::MustNotLeakItems)
            .build();

        let _item = pool.insert(1).expect("fresh pool has capacity");

        drop(pool);
    }

    #[test]
    fn must_not_leak_items_accepts_clean_drop() {
        let pool = AtomicPool::<u64>::builder()
            .slots_per_chunk(nz!(4))
            .drop_policy(DropPolicy::MustNotLeakItems)
            .build();

        let item = pool.insert(1).expect("fresh pool has capacity");

        unsafe { pool.remove(Some(item)) };

        drop(pool);
    }

    #[test]
    fn items_survive_growth_untouched() {
        let pool = AtomicPool::<u64>::builder().slots_per_chunk(nz!(2)).build();

        let early = pool.insert(1).expect("fresh pool has capacity");

        // Force several growth events; the early item's storage must not be
        // disturbed by any of them.
        let later: Vec<_> = (0..10)
            .map(|n| pool.insert(n).expect("pool grows on demand"))
            .collect();

        unsafe {
            assert_eq!(*early.as_ref(), 1);
        }

        unsafe { pool.remove(Some(early)) };
        for item in later {
            unsafe { pool.remove(Some(item)) };
        }
    }
}
