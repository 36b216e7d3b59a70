use std::fmt;
use std::sync::Arc;

use crate::stack::Core;

/// The producer endpoint of a stack created by [`stack()`][crate::stack].
///
/// Cloneable and usable from any number of threads concurrently; every clone
/// feeds the same stack. Pushing never blocks: it is a compare-exchange
/// retry loop against the top-of-stack pointer.
pub struct Pusher<T> {
    core: Arc<Core<T>>,
}

// SAFETY: Values of T are moved into the stack here and moved out on the
// popper's thread, so T: Send is required and sufficient. The endpoint itself
// only touches the atomic top-of-stack pointer.
unsafe impl<T: Send> Send for Pusher<T> {}

// SAFETY: As above; push() is safe under any number of concurrent callers.
unsafe impl<T: Send> Sync for Pusher<T> {}

impl<T> Pusher<T> {
    pub(crate) fn new(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    /// Pushes a value onto the stack.
    ///
    /// The value becomes the new top; the matching pop on the consumer side
    /// observes everything that happened before this call.
    ///
    /// # Examples
    ///
    /// ```
    /// let (pusher, mut popper) = relay_stack::stack::<u32>();
    ///
    /// pusher.push(5);
    ///
    /// assert_eq!(popper.pop(), Some(5));
    /// ```
    pub fn push(&self, value: T) {
        self.core.push(value);
    }

    /// Best-effort emptiness snapshot.
    ///
    /// Racy by construction: another thread may push or the consumer may pop
    /// between the load and any action you take on the result. Usable as a
    /// polling heuristic, never as a synchronization primitive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }
}

impl<T> Clone for Pusher<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> fmt::Debug for Pusher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pusher")
            .field("is_empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Pusher<u64>: Send, Sync, Clone, std::fmt::Debug);

    #[test]
    fn clone_is_shallow() {
        let (pusher, mut popper) = crate::stack::<u32>();
        let clone = pusher.clone();

        clone.push(1);

        assert!(!pusher.is_empty());
        assert_eq!(popper.pop(), Some(1));
    }
}
