use std::alloc::{Layout, alloc, dealloc};
use std::num::NonZero;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::slot::Slot;
use crate::tagging::AddressTagger;

/// A fixed-size array of slots plus the lock-free machinery that hands them
/// out: an intrusive free list threaded through the slots and a forward link
/// to the next chunk in the pool's chain.
///
/// The slot array is allocated once at chunk construction and neither resized
/// nor released until the chunk itself is dropped. Slot addresses are
/// therefore stable for the lifetime of the owning pool, which is what makes
/// the tagged-pointer ABA defense sufficient: an address, once assigned to a
/// slot, is never reused for a different slot.
///
/// Sentinel chunks (the anchors of the pool's chain) own no slots and never
/// participate in allocation; only their chain link is meaningful.
///
/// Note that the free list and the slot array are decoupled on purpose: a
/// slot freed through the pool is pushed onto whatever chunk is at the front
/// of the chain at that moment, so over time this chunk's free list may link
/// slots whose backing storage lives in other chunks. The list is purely
/// pointer-threaded, so this is harmless.
pub(crate) struct Chunk<T> {
    /// First slot of the chunk's slot array; null for sentinel chunks.
    slots: *mut Slot<T>,

    /// Number of slots in the array; zero for sentinel chunks.
    slot_count: usize,

    /// Head of the free list. May hold a tagged pointer; consult the tagger
    /// before dereferencing.
    free_head: AtomicPtr<Slot<T>>,

    /// Next chunk in the pool's chain; null until linked.
    next: AtomicPtr<Chunk<T>>,

    tagger: AddressTagger,
}

impl<T> Chunk<T> {
    /// Creates a slotless chunk for use as a chain anchor.
    pub(crate) fn sentinel(tagger: AddressTagger) -> Box<Self> {
        Box::new(Self {
            slots: ptr::null_mut(),
            slot_count: 0,
            free_head: AtomicPtr::new(ptr::null_mut()),
            next: AtomicPtr::new(ptr::null_mut()),
            tagger,
        })
    }

    /// Creates a chunk with `slot_count` slots, pre-threaded into a free list
    /// in array order.
    ///
    /// Returns `None` when the memory system cannot provide the slot array.
    /// This is the allocation failure the pool reports to its callers, so it
    /// is a value rather than a panic.
    pub(crate) fn with_slots(slot_count: NonZero<usize>, tagger: AddressTagger) -> Option<Box<Self>> {
        let layout = Layout::array::<Slot<T>>(slot_count.get())
            .expect("slot array size calculation cannot overflow for reasonable slot counts");

        // SAFETY: The layout is non-zero-sized: slot_count is non-zero and a
        // slot is at least its own alignment in size.
        let first = unsafe { alloc(layout) }.cast::<Slot<T>>();

        if first.is_null() {
            return None;
        }

        for index in 0..slot_count.get() {
            // SAFETY: index is within the array we just allocated, and the
            // allocation is aligned for Slot<T>.
            unsafe {
                first.add(index).write(Slot::new());
            }
        }

        // Thread the free list: each slot links to its array successor, the
        // last slot terminates the list.
        // Cannot overflow: a full-range slot_count would exceed virtual memory.
        let last_index = slot_count.get().wrapping_sub(1);

        for index in 0..last_index {
            // SAFETY: index and index + 1 are within the array and every slot
            // was initialized above.
            unsafe {
                (*first.add(index))
                    .next_free()
                    .store(first.add(index.wrapping_add(1)), Ordering::Release);
            }
        }

        Some(Box::new(Self {
            slots: first,
            slot_count: slot_count.get(),
            free_head: AtomicPtr::new(first),
            next: AtomicPtr::new(ptr::null_mut()),
            tagger,
        }))
    }

    /// Atomically removes and returns the current head of the free list, or
    /// `None` when the list is observed empty.
    ///
    /// An empty list is a normal condition, not an error; the pool responds
    /// by growing the chain. The returned pointer is clean (untagged) and the
    /// slot it names is exclusively the caller's until pushed back.
    ///
    /// Before installing the new head, its version counter is set to one more
    /// than the departing head's and the installed pointer carries that
    /// version in its tag bits. A slot that is popped and re-pushed while a
    /// slow reader holds the old head value thereby produces a bitwise
    /// different head, so the slow reader's compare-exchange fails instead of
    /// corrupting the list.
    pub(crate) fn try_pop_free(&self) -> Option<NonNull<Slot<T>>> {
        let mut observed = self.free_head.load(Ordering::Acquire);

        loop {
            let head = NonNull::new(self.tagger.untagged(observed))?;

            // SAFETY: Slots are never deallocated while the pool lives, so
            // the clean head pointer is valid even if we lose the race below.
            let next = unsafe { head.as_ref() }.next_free().load(Ordering::Acquire);
            let clean_next = self.tagger.untagged(next);

            let replacement = if clean_next.is_null() {
                next
            } else {
                // SAFETY: As above; the slot outlives every reference to it.
                let successor = unsafe { &*clean_next };

                // SAFETY: As above.
                let version = unsafe { head.as_ref() }.version().wrapping_add(1);
                successor.set_version(version);

                self.tagger
                    .tagged(clean_next, version)
                    .expect("slot addresses are aligned beyond the tag mask, validated at pool construction")
            };

            match self.free_head.compare_exchange_weak(
                observed,
                replacement,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(head),
                Err(actual) => observed = actual,
            }
        }
    }

    /// Atomically prepends a slot to the free list.
    ///
    /// The slot must be exclusively the caller's (previously popped and no
    /// longer live). The same version discipline as in
    /// [`try_pop_free`][Self::try_pop_free] applies: the incoming slot is
    /// tagged one version past the head it replaces.
    pub(crate) fn push_free(&self, slot: NonNull<Slot<T>>) {
        let mut observed = self.free_head.load(Ordering::Acquire);

        loop {
            let clean_head = self.tagger.untagged(observed);

            // SAFETY: The caller owns the slot exclusively; nothing else
            // reads its link until the compare-exchange below publishes it.
            unsafe { slot.as_ref() }.next_free().store(observed, Ordering::Release);

            let replacement = if clean_head.is_null() {
                slot.as_ptr()
            } else {
                // SAFETY: Slots are never deallocated while the pool lives.
                let version = unsafe { (*clean_head).version() }.wrapping_add(1);

                // SAFETY: As above; the caller owns the slot.
                unsafe { slot.as_ref() }.set_version(version);

                self.tagger
                    .tagged(slot.as_ptr(), version)
                    .expect("slot addresses are aligned beyond the tag mask, validated at pool construction")
            };

            match self.free_head.compare_exchange_weak(
                observed,
                replacement,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => observed = actual,
            }
        }
    }

    /// Walks the free list and counts its entries.
    ///
    /// Diagnostics only: the walk is not atomic with respect to concurrent
    /// pops and pushes, so the result is best-effort and must not feed
    /// correctness decisions. At quiescence it is exact.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated into an infinite walk.
    pub(crate) fn free_count(&self) -> usize {
        let mut count = 0_usize;
        let mut cursor = self.tagger.untagged(self.free_head.load(Ordering::Acquire));

        while let Some(slot) = NonNull::new(cursor) {
            // Cannot overflow: the count is bounded by the number of slots
            // that fit in virtual memory.
            count = count.wrapping_add(1);

            // SAFETY: Slots are never deallocated while the pool lives.
            cursor = self
                .tagger
                .untagged(unsafe { slot.as_ref() }.next_free().load(Ordering::Acquire));
        }

        count
    }

    /// Number of slots whose backing storage this chunk owns.
    pub(crate) fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub(crate) fn next_chunk(&self) -> *mut Chunk<T> {
        self.next.load(Ordering::Acquire)
    }

    /// Sets the forward chain link, spinning until the compare-exchange lands.
    ///
    /// Not a true single-assignment: a stale observed value is simply retried
    /// against, so the last caller wins.
    pub(crate) fn link_next(&self, next_chunk: *mut Chunk<T>) {
        let mut observed = self.next.load(Ordering::Acquire);

        while let Err(actual) =
            self.next
                .compare_exchange_weak(observed, next_chunk, Ordering::AcqRel, Ordering::Acquire)
        {
            observed = actual;
        }
    }

    /// The chain link itself, for the pool's guarded frontier installation.
    pub(crate) fn next_atomic(&self) -> &AtomicPtr<Chunk<T>> {
        &self.next
    }

    /// Raw (possibly tagged) free-list head, for quiescent validation walks.
    #[cfg(debug_assertions)]
    pub(crate) fn free_head_snapshot(&self) -> *mut Slot<T> {
        self.free_head.load(Ordering::Acquire)
    }
}

impl<T> Drop for Chunk<T> {
    fn drop(&mut self) {
        if self.slots.is_null() {
            return;
        }

        let layout = Layout::array::<Slot<T>>(self.slot_count)
            .expect("layout was already computed once at construction");

        // Slots hold no droppable state of their own; items still live in
        // them are the pool's drop-policy concern, not the chunk's.
        // SAFETY: The array was allocated in with_slots() with this layout
        // and has not been deallocated yet.
        unsafe {
            dealloc(self.slots.cast(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    fn test_chunk(slot_count: NonZero<usize>) -> Box<Chunk<u64>> {
        Chunk::with_slots(slot_count, AddressTagger::new(0b11111))
            .expect("test chunk allocation is not expected to fail")
    }

    #[test]
    fn fresh_chunk_has_all_slots_free() {
        let chunk = test_chunk(nz!(10));

        assert_eq!(chunk.free_count(), 10);
        assert_eq!(chunk.slot_count(), 10);
    }

    #[test]
    fn sentinel_has_no_slots() {
        let sentinel = Chunk::<u64>::sentinel(AddressTagger::new(0b11111));

        assert_eq!(sentinel.free_count(), 0);
        assert_eq!(sentinel.slot_count(), 0);
        assert!(sentinel.try_pop_free().is_none());
    }

    #[test]
    fn pop_until_empty_yields_distinct_slots() {
        let chunk = test_chunk(nz!(5));

        let mut popped = Vec::new();

        while let Some(slot) = chunk.try_pop_free() {
            assert!(!popped.contains(&slot), "same slot popped twice");
            popped.push(slot);
        }

        assert_eq!(popped.len(), 5);
        assert_eq!(chunk.free_count(), 0);
        assert!(chunk.try_pop_free().is_none());
    }

    #[test]
    fn pushed_slot_becomes_poppable_again() {
        let chunk = test_chunk(nz!(3));

        let first = chunk.try_pop_free().expect("fresh chunk has free slots");
        let second = chunk.try_pop_free().expect("fresh chunk has free slots");

        assert_eq!(chunk.free_count(), 1);

        chunk.push_free(first);

        assert_eq!(chunk.free_count(), 2);

        // LIFO: the slot we just pushed comes back first.
        let repopped = chunk.try_pop_free().expect("just pushed a slot");
        assert_eq!(repopped, first);

        chunk.push_free(second);
        chunk.push_free(repopped);
    }

    #[test]
    fn pop_then_push_cycles_advance_the_version() {
        let chunk = test_chunk(nz!(2));

        let slot = chunk.try_pop_free().expect("fresh chunk has free slots");
        chunk.push_free(slot);

        // SAFETY: The slot is within a live chunk.
        let version_after_first_cycle = unsafe { slot.as_ref() }.version();

        let slot = chunk.try_pop_free().expect("slot was pushed back");
        chunk.push_free(slot);

        // SAFETY: As above.
        let version_after_second_cycle = unsafe { slot.as_ref() }.version();

        assert_ne!(version_after_first_cycle, version_after_second_cycle);
    }

    #[test]
    fn foreign_slot_can_be_pushed() {
        // Deallocation targets the frontier chunk, so a chunk must accept
        // slots whose storage belongs to another chunk.
        let home = test_chunk(nz!(2));
        let away = test_chunk(nz!(2));

        let slot = home.try_pop_free().expect("fresh chunk has free slots");
        away.push_free(slot);

        assert_eq!(home.free_count(), 1);
        assert_eq!(away.free_count(), 3);

        let repopped = away.try_pop_free().expect("just pushed a slot");
        assert_eq!(repopped, slot);
    }

    #[test]
    fn chain_link_round_trips() {
        let first = test_chunk(nz!(2));
        let second = test_chunk(nz!(2));

        assert!(first.next_chunk().is_null());

        let second_ptr = Box::into_raw(second);
        first.link_next(second_ptr);

        assert_eq!(first.next_chunk(), second_ptr);

        // SAFETY: We just leaked it above and nothing else references it.
        drop(unsafe { Box::from_raw(second_ptr) });
    }
}
