use std::fmt;
use std::sync::Arc;

use crate::stack::Core;

/// The consumer endpoint of a stack created by [`stack()`][crate::stack].
///
/// Deliberately not cloneable: exactly one popper exists per stack, which is
/// what allows each pop to free its node on the spot without hazard pointers
/// or deferred reclamation. Move it to whichever thread consumes the values.
pub struct Popper<T> {
    core: Arc<Core<T>>,
}

// SAFETY: Values of T are moved out of the stack here after being moved in
// on producer threads, so T: Send is required and sufficient.
unsafe impl<T: Send> Send for Popper<T> {}

// SAFETY: The only &self method is the racy emptiness snapshot; popping
// requires &mut self, so shared references cannot be used to pop
// concurrently.
unsafe impl<T: Send> Sync for Popper<T> {}

impl<T> Popper<T> {
    pub(crate) fn new(core: Arc<Core<T>>) -> Self {
        Self { core }
    }

    /// Removes and returns the current top value, or `None` when the stack
    /// is observed empty.
    ///
    /// An empty stack is a normal condition, not an error; producers may
    /// still be running. The returned value is the caller's to clean up.
    ///
    /// # Examples
    ///
    /// ```
    /// let (pusher, mut popper) = relay_stack::stack::<u32>();
    ///
    /// pusher.push(1);
    /// pusher.push(2);
    ///
    /// assert_eq!(popper.pop(), Some(2));
    /// assert_eq!(popper.pop(), Some(1));
    /// assert_eq!(popper.pop(), None);
    /// ```
    pub fn pop(&mut self) -> Option<T> {
        // SAFETY: There is exactly one Popper per stack and we hold it
        // exclusively, so no other thread can be popping concurrently.
        unsafe { self.core.pop() }
    }

    /// Best-effort emptiness snapshot.
    ///
    /// Racy by construction: a producer may push between the load and any
    /// action you take on the result. Usable as a polling heuristic, never
    /// as a synchronization primitive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }
}

impl<T> fmt::Debug for Popper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Popper")
            .field("is_empty", &self.is_empty())
            .finish_non_exhaustive()
    }
}
