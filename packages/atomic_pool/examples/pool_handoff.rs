//! `AtomicPool` and `relay_stack` working together: producer threads allocate
//! items from a shared pool and hand them to a consumer thread, which reads
//! and then removes them.

use std::ptr::NonNull;
use std::sync::Arc;
use std::thread;

use atomic_pool::AtomicPool;

struct Job {
    worker: u32,
    payload: u32,
}

/// A pool pointer that may travel between threads; exactly one thread uses
/// it at a time (producer until push, consumer after pop).
struct JobHandle(NonNull<Job>);

// SAFETY: Ownership of the pointed-to job moves with the wrapper.
unsafe impl Send for JobHandle {}

fn main() {
    let pool = Arc::new(AtomicPool::<Job>::builder().build());
    let (pusher, mut popper) = relay_stack::stack::<JobHandle>();

    let producers: Vec<_> = (0..3_u32)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            let pusher = pusher.clone();
            thread::spawn(move || {
                for payload in 0..5 {
                    let job = pool
                        .insert(Job { worker, payload })
                        .expect("pool grows on demand");

                    pusher.push(JobHandle(job));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer thread completed");
    }

    // Drain the handoff stack and return every job to the pool.
    let mut consumed = 0;

    while let Some(handle) = popper.pop() {
        // SAFETY: The job is live until we remove it below.
        let job = unsafe { handle.0.as_ref() };

        println!("worker {} sent payload {}", job.worker, job.payload);
        consumed += 1;

        // SAFETY: Popped exactly once; not used after removal.
        unsafe { pool.remove(Some(handle.0)) };
    }

    println!(
        "consumed {consumed} jobs; pool reports {} free slots again",
        pool.free_count()
    );
}
