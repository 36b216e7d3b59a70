//! Basic benchmarks for the `atomic_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::iter;
use std::num::NonZero;
use std::time::Instant;

use alloc_tracker::Allocator;
use atomic_pool::AtomicPool;
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = u64;
const TEST_VALUE: TestItem = 1024;

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("pool_basic");

    let allocs_op = allocs.operation("build_empty");
    group.bench_function("build_empty", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(
                    AtomicPool::<TestItem>::builder()
                        .slots_per_chunk(NonZero::new(128).unwrap())
                        .build(),
                ));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("insert_one");
    group.bench_function("insert_one", |b| {
        b.iter_custom(|iters| {
            let pools = iter::repeat_with(|| AtomicPool::<TestItem>::builder().build())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &pools {
                drop(black_box(pool.insert(TEST_VALUE)));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("insert_remove_pair");
    group.bench_function("insert_remove_pair", |b| {
        b.iter_custom(|iters| {
            let pool = AtomicPool::<TestItem>::builder().build();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                let item = pool.insert(TEST_VALUE).unwrap();

                // SAFETY: Just inserted into this pool; not used afterwards.
                unsafe { pool.remove(Some(black_box(item))) };
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("insert_10k");
    group.bench_function("insert_10k", |b| {
        b.iter_custom(|iters| {
            let pools = iter::repeat_with(|| AtomicPool::<TestItem>::builder().build())
                .take(usize::try_from(iters).unwrap())
                .collect::<Vec<_>>();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for pool in &pools {
                for _ in 0..10_000 {
                    drop(black_box(pool.insert(TEST_VALUE)));
                }
            }

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
