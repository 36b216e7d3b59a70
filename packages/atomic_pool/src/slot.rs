use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

/// Maximum size in bytes of an item the pool can store.
///
/// Every slot reserves exactly this much storage regardless of the actual
/// item size; a type larger than this is rejected at compile time.
pub const MAX_ITEM_SIZE: usize = 64;

/// Maximum alignment of an item the pool can store.
///
/// Slot storage is aligned to this value. The alignment also determines how
/// many low address bits are guaranteed zero and therefore available to the
/// tag mask.
pub const MAX_ITEM_ALIGN: usize = 64;

/// One storage cell of a pool chunk: room for exactly one item of the managed
/// type, plus the intrusive free-list link and the version counter used to
/// defeat ABA on the free-list head.
///
/// A slot is either FREE (linked into some chunk's free list, storage
/// uninitialized or holding the leftover bytes of a removed item) or LIVE
/// (storage holds one initialized item and the slot is reachable from no free
/// list). The slot itself does not record which state it is in; the free-list
/// topology does.
///
/// Layout invariant: `data` is the first field of a `repr(C)` struct, so the
/// address of a slot and the address of the item stored in it are the same.
/// This is what allows [`from_value_ptr`][Self::from_value_ptr] to recover
/// the slot from a caller-held item pointer with a plain cast. The `align(64)`
/// guarantees the low six address bits of every slot are zero, which is the
/// headroom the tag mask lives in.
#[repr(C, align(64))]
pub(crate) struct Slot<T> {
    /// Uninitialized storage for one item. Accessed only through raw pointers
    /// while the slot is live; never borrowed by the pool itself.
    data: UnsafeCell<[MaybeUninit<u8>; MAX_ITEM_SIZE]>,

    /// Link to the next free slot. Holds a tagged pointer whenever the linked
    /// slot carried a nonzero version at link time.
    next_free: AtomicPtr<Slot<T>>,

    /// Version counter, incremented each time this slot becomes the head of a
    /// free list. Travels in the tag bits of pointers to this slot.
    version: AtomicUsize,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        const {
            assert!(
                size_of::<T>() <= MAX_ITEM_SIZE,
                "item type is larger than the slot storage"
            );
            assert!(
                align_of::<T>() <= MAX_ITEM_ALIGN,
                "item type requires stronger alignment than the slot storage"
            );
        }

        Self {
            data: UnsafeCell::new([MaybeUninit::uninit(); MAX_ITEM_SIZE]),
            next_free: AtomicPtr::new(ptr::null_mut()),
            version: AtomicUsize::new(0),
        }
    }

    /// Pointer to the item storage of this slot.
    ///
    /// Valid for reads/writes of `T` for as long as the owning chunk exists;
    /// whether it points at an initialized item depends on the slot state,
    /// which the caller is responsible for knowing.
    pub(crate) fn value_ptr(&self) -> NonNull<T> {
        #[expect(
            clippy::cast_ptr_alignment,
            reason = "slot storage is 64-byte aligned by repr and item alignment is checked at compile time"
        )]
        let ptr = self.data.get().cast::<T>();

        // SAFETY: Derived from a reference, so never null.
        unsafe { NonNull::new_unchecked(ptr) }
    }

    /// Recovers the slot containing the given item pointer.
    ///
    /// # Safety
    ///
    /// The pointer must have been returned by [`value_ptr`][Self::value_ptr]
    /// on a slot that is still within a live chunk.
    pub(crate) unsafe fn from_value_ptr(ptr: NonNull<T>) -> NonNull<Slot<T>> {
        // Item storage sits at offset zero of the repr(C) slot.
        ptr.cast::<Slot<T>>()
    }

    pub(crate) fn next_free(&self) -> &AtomicPtr<Slot<T>> {
        &self.next_free
    }

    pub(crate) fn version(&self) -> usize {
        self.version.load(Ordering::Acquire)
    }

    pub(crate) fn set_version(&self, version: usize) {
        self.version.store(version, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;

    #[test]
    fn value_ptr_round_trips_to_slot() {
        let slot = Slot::<u64>::new();

        let value_ptr = slot.value_ptr();

        // SAFETY: The pointer came from value_ptr() on a live slot.
        let recovered = unsafe { Slot::from_value_ptr(value_ptr) };

        assert_eq!(recovered.as_ptr(), ptr::from_ref(&slot).cast_mut());
    }

    #[test]
    fn slot_address_has_tag_headroom() {
        let slots: Vec<Slot<u64>> = (0..4).map(|_| Slot::new()).collect();

        for slot in &slots {
            assert_eq!(ptr::from_ref(slot).addr() & (MAX_ITEM_ALIGN - 1), 0);
        }
    }

    #[test]
    fn fresh_slot_is_unlinked_and_unversioned() {
        let slot = Slot::<u64>::new();

        assert!(slot.next_free().load(Ordering::Acquire).is_null());
        assert_eq!(slot.version(), 0);
    }

    #[test]
    fn version_counter_round_trips() {
        let slot = Slot::<u64>::new();

        slot.set_version(17);

        assert_eq!(slot.version(), 17);
    }

    #[test]
    fn storage_holds_a_written_value() {
        let slot = Slot::<[u8; 64]>::new();

        let value_ptr = slot.value_ptr();

        // SAFETY: The pointer is valid for writes of the full storage size
        // and nothing else accesses the slot concurrently.
        unsafe {
            value_ptr.write([7_u8; 64]);
            assert_eq!(value_ptr.read(), [7_u8; 64]);
        }
    }
}
