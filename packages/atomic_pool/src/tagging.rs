/// Packs a small version counter into the low alignment bits of a pointer.
///
/// The free-list protocol needs a version counter that travels with the list
/// head in a single word, so that a compare-exchange observes both the pointer
/// and its version at once. Slot addresses are aligned strongly enough that
/// their low bits are always zero, which leaves those bits free to carry the
/// counter.
///
/// This is the only type in the crate that performs raw address arithmetic.
/// Everything else works with the clean pointers it returns.
///
/// The mask must be of the form `2^k - 1`, covering only bits that are
/// guaranteed zero by the alignment of the pointee. The pool validates this
/// against the slot alignment at construction time.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AddressTagger {
    /// Bits available for the version counter; also the largest storable tag.
    mask: usize,
}

impl AddressTagger {
    pub(crate) const fn new(mask: usize) -> Self {
        debug_assert!(
            mask.wrapping_add(1).is_power_of_two(),
            "tag mask must be of the form 2^k - 1"
        );

        Self { mask }
    }

    /// The bits this tagger may set in a pointer.
    pub(crate) const fn mask(self) -> usize {
        self.mask
    }

    /// Returns the pointer with all tag bits cleared.
    ///
    /// The identity of the pointee is defined by the clean address; two tagged
    /// pointers refer to the same object whenever their clean forms are equal.
    pub(crate) fn untagged<T>(self, ptr: *mut T) -> *mut T {
        ptr.map_addr(|addr| addr & !self.mask)
    }

    /// Returns `true` if the pointer's tag bits are currently all zero, i.e.
    /// the address is aligned strongly enough to carry a tag without damage.
    pub(crate) fn is_taggable<T>(self, ptr: *mut T) -> bool {
        ptr.addr() & self.mask == 0
    }

    /// Returns the pointer with `version mod (mask + 1)` set into the tag
    /// bits, or `None` if the address has low bits set and cannot carry a tag.
    ///
    /// A `None` here means the pointee's alignment does not match the mask
    /// the pool was configured with. Callers must treat it as a linking
    /// failure; the original pointer must not be used in tagged form.
    pub(crate) fn tagged<T>(self, ptr: *mut T, version: usize) -> Option<*mut T> {
        if !self.is_taggable(ptr) {
            return None;
        }

        Some(ptr.map_addr(|addr| addr | (version & self.mask)))
    }

    /// Reads the tag bits of the pointer.
    pub(crate) fn tag_of<T>(self, ptr: *mut T) -> usize {
        ptr.addr() & self.mask
    }
}

#[cfg(test)]
mod tests {
    use std::ptr;

    use super::*;

    /// Aligned strongly enough for every mask the tests use.
    #[repr(align(64))]
    struct Aligned(#[expect(dead_code, reason = "only the address matters")] u8);

    #[test]
    fn round_trip_preserves_address_and_tag() {
        let target = Aligned(0);
        let clean = ptr::from_ref(&target).cast_mut();

        let tagger = AddressTagger::new(0b11111);

        for version in 0..=tagger.mask() {
            let tagged = tagger
                .tagged(clean, version)
                .expect("aligned address must be taggable");

            assert_eq!(tagger.untagged(tagged), clean);
            assert_eq!(tagger.tag_of(tagged), version);
        }
    }

    #[test]
    fn tag_wraps_modulo_mask_plus_one() {
        let target = Aligned(0);
        let clean = ptr::from_ref(&target).cast_mut();

        let tagger = AddressTagger::new(0b11111);

        let tagged = tagger
            .tagged(clean, 32 + 7)
            .expect("aligned address must be taggable");

        assert_eq!(tagger.tag_of(tagged), 7);
        assert_eq!(tagger.untagged(tagged), clean);
    }

    #[test]
    fn misaligned_address_is_not_taggable() {
        let target = Aligned(0);
        let clean = ptr::from_ref(&target).cast_mut();

        let tagger = AddressTagger::new(0b11111);

        let misaligned = clean.map_addr(|addr| addr | 1);

        assert!(!tagger.is_taggable(misaligned));
        assert!(tagger.tagged(misaligned, 3).is_none());
    }

    #[test]
    fn tagged_address_is_no_longer_taggable() {
        let target = Aligned(0);
        let clean = ptr::from_ref(&target).cast_mut();

        let tagger = AddressTagger::new(0b11111);

        assert!(tagger.is_taggable(clean));

        let tagged = tagger
            .tagged(clean, 5)
            .expect("aligned address must be taggable");

        assert!(!tagger.is_taggable(tagged));
    }

    #[test]
    fn untagged_is_identity_on_clean_pointers() {
        let target = Aligned(0);
        let clean = ptr::from_ref(&target).cast_mut();

        let tagger = AddressTagger::new(0b111);

        assert_eq!(tagger.untagged(clean), clean);
        assert_eq!(tagger.tag_of(clean), 0);
    }

    #[test]
    fn null_stays_null_when_untagged() {
        let tagger = AddressTagger::new(0b11111);

        assert_eq!(tagger.untagged(ptr::null_mut::<Aligned>()), ptr::null_mut());
    }

    #[test]
    fn zero_mask_disables_tagging() {
        let target = Aligned(0);
        let clean = ptr::from_ref(&target).cast_mut();

        let tagger = AddressTagger::new(0);

        let tagged = tagger
            .tagged(clean, 12345)
            .expect("every address is taggable with an empty mask");

        assert_eq!(tagged, clean);
        assert_eq!(tagger.tag_of(tagged), 0);
    }
}
