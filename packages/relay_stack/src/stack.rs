use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::{Popper, Pusher};

/// Creates a new stack and returns its two endpoints.
///
/// The [`Pusher`] may be cloned and used from any number of threads; the
/// [`Popper`] is the single consumer. The stack's storage is released when
/// both endpoints are gone, dropping any values still on it.
///
/// # Examples
///
/// ```
/// let (pusher, mut popper) = relay_stack::stack::<&str>();
///
/// pusher.push("hello");
///
/// assert_eq!(popper.pop(), Some("hello"));
/// ```
#[must_use]
pub fn stack<T>() -> (Pusher<T>, Popper<T>) {
    let core = Arc::new(Core::new());

    (Pusher::new(Arc::clone(&core)), Popper::new(core))
}

/// One entry of the stack; heap-allocated per push, freed per pop.
pub(crate) struct Node<T> {
    value: T,

    /// Next node down the stack. Written only before the node is published
    /// and never mutated afterwards, so plain reads are fine once the node
    /// has been observed through the head.
    next: *mut Node<T>,
}

/// The shared state behind both endpoints: the top-of-stack pointer.
pub(crate) struct Core<T> {
    head: AtomicPtr<Node<T>>,

    /// The nodes own values of T, dropped in our Drop.
    _values: PhantomData<T>,
}

impl<T> Core<T> {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            _values: PhantomData,
        }
    }

    /// Wraps the value in a fresh node and links it ahead of the observed
    /// top, retrying the compare-exchange until it lands.
    ///
    /// Safe for any number of concurrent callers: the node is invisible to
    /// other threads until the successful compare-exchange publishes it.
    pub(crate) fn push(&self, value: T) {
        let node = Box::into_raw(Box::new(Node {
            value,
            next: ptr::null_mut(),
        }));

        let mut observed = self.head.load(Ordering::Acquire);

        loop {
            // SAFETY: The node is not yet published; we are its only user.
            unsafe {
                (*node).next = observed;
            }

            match self
                .head
                .compare_exchange_weak(observed, node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => observed = actual,
            }
        }
    }

    /// Removes and returns the current top value, or `None` when the stack
    /// is observed empty. The removed node is freed here.
    ///
    /// # Safety
    ///
    /// At most one thread may be inside this method at a time. Freeing the
    /// node on the spot is only sound because no concurrent popper can be
    /// holding a pointer into it.
    pub(crate) unsafe fn pop(&self) -> Option<T> {
        let mut observed = self.head.load(Ordering::Acquire);

        loop {
            let node_ptr = NonNull::new(observed)?;

            // SAFETY: Only this thread removes nodes (caller contract), so a
            // node reachable from the head stays allocated until we free it
            // below; its next field is immutable after publication.
            let next = unsafe { node_ptr.as_ref() }.next;

            match self
                .head
                .compare_exchange_weak(observed, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    // SAFETY: The node is now unreachable from the stack and
                    // was allocated via Box::into_raw in push().
                    let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };

                    return Some(node.value);
                }
                Err(actual) => observed = actual,
            }
        }
    }

    /// Racy emptiness snapshot; a heuristic, never a synchronization result.
    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl<T> Drop for Core<T> {
    fn drop(&mut self) {
        // Both endpoints are gone, so no concurrency remains.
        let mut cursor = *self.head.get_mut();

        while !cursor.is_null() {
            // SAFETY: Every node was allocated via Box::into_raw in push()
            // and is freed exactly once in this walk. Dropping the box also
            // drops the value it carries.
            let node = unsafe { Box::from_raw(cursor) };

            cursor = node.next;
        }
    }
}
