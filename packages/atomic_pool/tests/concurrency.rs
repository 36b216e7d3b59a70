//! Multi-threaded behavior of the pool: distinct handouts, slot accounting
//! under churn and growth under concurrent demand.

#![allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]

use std::collections::HashSet;
use std::num::NonZero;
use std::ptr::NonNull;
use std::sync::Arc;
use std::thread;

use atomic_pool::AtomicPool;
use testing::with_watchdog;

/// A pool pointer that may travel between threads.
///
/// `NonNull` itself is deliberately not `Send`; for pool items this is fine
/// because the pool guarantees address stability and each pointer is used by
/// one thread at a time in these tests.
struct SendPtr(NonNull<u64>);

// SAFETY: See above; ownership of the pointed-to item moves with the wrapper.
unsafe impl Send for SendPtr {}

#[test]
fn concurrent_inserts_yield_distinct_addresses() {
    with_watchdog(|| {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 500;

        let pool = Arc::new(
            AtomicPool::<u64>::builder()
                .slots_per_chunk(NonZero::new(100).unwrap())
                .build(),
        );

        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|n| {
                            let item = pool
                                .insert((worker * PER_THREAD + n) as u64)
                                .expect("growth keeps the pool from running out");
                            SendPtr(item)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all_items = Vec::new();
        for worker in workers {
            all_items.extend(worker.join().expect("producer thread completed"));
        }

        let distinct: HashSet<usize> = all_items
            .iter()
            .map(|item| item.0.as_ptr().addr())
            .collect();

        assert_eq!(distinct.len(), THREADS * PER_THREAD);

        for item in all_items {
            // SAFETY: Each pointer came from this pool and is removed once.
            unsafe { pool.remove(Some(item.0)) };
        }

        assert_eq!(pool.free_count(), pool.chunk_count() * 100);
    });
}

#[test]
// Tens of thousands of contended atomic operations - far too slow under Miri.
#[cfg_attr(miri, ignore)]
fn churn_preserves_slot_accounting() {
    // The ABA stress: many threads pop and push the same few slots at once.
    // A corrupted free list would show up as a lost slot, a duplicate
    // handout or a cyclic list (which the watchdog turns into a failure).
    with_watchdog(|| {
        const THREADS: usize = 8;
        const ROUNDS: usize = 2_000;

        let pool = Arc::new(
            AtomicPool::<u64>::builder()
                .slots_per_chunk(NonZero::new(4).unwrap())
                .build(),
        );

        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for round in 0..ROUNDS {
                        let item = pool
                            .insert((worker * ROUNDS + round) as u64)
                            .expect("growth keeps the pool from running out");

                        // SAFETY: Just inserted; not used afterwards.
                        unsafe { pool.remove(Some(item)) };
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("churn thread completed");
        }

        // Total free + live is constant: everything was returned, so every
        // slot of every chunk must be reachable through some free list.
        assert_eq!(pool.free_count(), pool.chunk_count() * 4);
    });
}

#[test]
fn pool_grows_under_concurrent_demand() {
    with_watchdog(|| {
        const CHUNK_CAPACITY: usize = 100;
        const THREADS: usize = 4;

        // One more insertion than one chunk can satisfy, split over threads.
        const PER_THREAD: usize = (CHUNK_CAPACITY + 1).div_ceil(THREADS);

        let pool = Arc::new(
            AtomicPool::<u64>::builder()
                .slots_per_chunk(NonZero::new(CHUNK_CAPACITY).unwrap())
                .build(),
        );

        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|n| {
                            let item = pool
                                .insert((worker * PER_THREAD + n) as u64)
                                .expect("every insertion must succeed; the pool grows");
                            SendPtr(item)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all_items = Vec::new();
        for worker in workers {
            all_items.extend(worker.join().expect("producer thread completed"));
        }

        assert!(all_items.len() > CHUNK_CAPACITY);

        for item in all_items {
            // SAFETY: Each pointer came from this pool and is removed once.
            unsafe { pool.remove(Some(item.0)) };
        }

        // More items than one chunk holds were live at once, so the chain
        // must have grown, and with everything returned the per-chunk counts
        // must add up to the full capacity.
        assert!(pool.chunk_count() >= 2);

        let counts = pool.chunk_free_counts();
        assert_eq!(counts.len(), pool.chunk_count());
        assert_eq!(
            counts.into_iter().sum::<usize>(),
            pool.chunk_count() * CHUNK_CAPACITY
        );
    });
}

#[test]
fn explicit_growth_races_cleanly_with_inserts() {
    with_watchdog(|| {
        const THREADS: usize = 4;

        let pool = Arc::new(
            AtomicPool::<u64>::builder()
                .slots_per_chunk(NonZero::new(8).unwrap())
                .build(),
        );

        let workers: Vec<_> = (0..THREADS)
            .map(|worker| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for n in 0..200_u64 {
                        if n % 50 == 0 {
                            pool.grow().expect("growth allocation succeeds");
                        }

                        let item = pool
                            .insert(worker as u64 * 1_000 + n)
                            .expect("growth keeps the pool from running out");

                        // SAFETY: Just inserted; not used afterwards.
                        unsafe { pool.remove(Some(item)) };
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker thread completed");
        }

        assert_eq!(pool.free_count(), pool.chunk_count() * 8);
    });
}
