//! A minimal lock-free stack for handing values from any number of producer
//! threads to a single consumer thread.
//!
//! The stack is split into two endpoints at creation: a cloneable
//! [`Pusher`] that any thread may use concurrently, and an exclusive
//! [`Popper`] held by the consumer. Both sides are lock-free compare-exchange
//! loops; neither ever blocks on the other.
//!
//! This is part of the [Folo project](https://github.com/folo-rs/folo) that
//! provides mechanisms for high-performance hardware-aware programming in
//! Rust.
//!
//! The single-consumer split is what makes the stack's eager memory
//! reclamation safe: each pop frees its node immediately, which is only sound
//! because no other thread can be halfway through reading that node. There is
//! no hazard-pointer or epoch machinery and none is needed.
//!
//! Ordering: values come out in reverse order of their insertion by any
//! single thread; across threads, each push merely happens-before the pop
//! that removes it.
//!
//! # Examples
//!
//! ```
//! let (pusher, mut popper) = relay_stack::stack::<u32>();
//!
//! pusher.push(1);
//! pusher.push(2);
//! pusher.push(3);
//!
//! assert_eq!(popper.pop(), Some(3));
//! assert_eq!(popper.pop(), Some(2));
//! assert_eq!(popper.pop(), Some(1));
//! assert_eq!(popper.pop(), None);
//! ```
//!
//! Producers and a consumer on different threads:
//!
//! ```
//! use std::thread;
//!
//! let (pusher, mut popper) = relay_stack::stack::<u64>();
//!
//! let producers: Vec<_> = (0..4)
//!     .map(|worker| {
//!         let pusher = pusher.clone();
//!         thread::spawn(move || {
//!             for n in 0..100 {
//!                 pusher.push(worker * 100 + n);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for producer in producers {
//!     producer.join().unwrap();
//! }
//!
//! let mut drained = 0;
//! while popper.pop().is_some() {
//!     drained += 1;
//! }
//!
//! assert_eq!(drained, 400);
//! ```

mod popper;
mod pusher;
mod stack;

pub use popper::Popper;
pub use pusher::Pusher;
pub use stack::stack;
