//! Basic usage example for `AtomicPool`.
//!
//! This example demonstrates inserting items, reading them back through the
//! returned pointers and removing them, plus the pool's growth diagnostics.

use std::num::NonZero;

use atomic_pool::AtomicPool;

fn main() {
    // Create a pool with small chunks so growth is easy to observe.
    let pool = AtomicPool::<u32>::builder()
        .slots_per_chunk(NonZero::new(4).unwrap())
        .build();

    println!(
        "Created pool: {} chunk(s), {} free slots",
        pool.chunk_count(),
        pool.free_count()
    );

    // Insert some values.
    let item1 = pool.insert(0xdead_beef_u32).unwrap();
    let item2 = pool.insert(0xcafe_babe_u32).unwrap();
    let item3 = pool.insert(0xfeed_face_u32).unwrap();

    println!("Inserted 3 items");

    // The pool hands out raw pointers; reading through them is our call.
    // SAFETY: All three items are live and exclusively ours.
    unsafe {
        println!("Value 1: {:#x}", *item1.as_ref());
        println!("Value 2: {:#x}", *item2.as_ref());
        println!("Value 3: {:#x}", *item3.as_ref());
    }

    // Push past one chunk's capacity; the pool grows by itself.
    let extra: Vec<_> = (0..6_u32).map(|n| pool.insert(n).unwrap()).collect();

    println!(
        "After 6 more inserts: {} chunk(s), per-chunk free counts {:?}",
        pool.chunk_count(),
        pool.chunk_free_counts()
    );

    // Return everything.
    // SAFETY: Each item came from this pool and is removed exactly once.
    unsafe {
        pool.remove(Some(item1));
        pool.remove(Some(item2));
        pool.remove(Some(item3));

        for item in extra {
            pool.remove(Some(item));
        }
    }

    println!(
        "After returning everything: {} free slots",
        pool.free_count()
    );
}
