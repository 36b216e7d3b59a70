/// Determines how the pool treats items that are still live when it is dropped.
///
/// The pool does not track which slots hold live items beyond what its free
/// lists imply, so it cannot run the destructors of remaining items. Dropping
/// a pool always releases all chunk storage; this policy only governs whether
/// leaving live items behind is acceptable.
///
/// # Examples
///
/// ```
/// use atomic_pool::{AtomicPool, DropPolicy};
///
/// // The drop policy is set at pool creation time.
/// let pool = AtomicPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotLeakItems)
///     .build();
/// drop(pool);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Storage of any remaining live items is released without running their
    /// destructors. This is the default.
    ///
    /// Appropriate for item types without meaningful teardown. Types that own
    /// other resources should be removed from the pool before it is dropped.
    #[default]
    MayLeakItems,

    /// The pool will panic if any item is still live when it is dropped.
    ///
    /// Liveness is determined by walking the free lists, which is exact at
    /// drop time because dropping the pool is only defined once no other
    /// thread is operating on it.
    MustNotLeakItems,
}
