//! Basic usage example for `relay_stack`.
//!
//! This example demonstrates the split endpoints: cloneable pushers on
//! producer threads, one popper on the consumer side.

use std::thread;

fn main() {
    let (pusher, mut popper) = relay_stack::stack::<String>();

    let producers: Vec<_> = (0..3)
        .map(|worker| {
            let pusher = pusher.clone();
            thread::spawn(move || {
                for n in 0..4 {
                    pusher.push(format!("message {n} from worker {worker}"));
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().expect("producer thread completed");
    }

    // Values come out newest-first within each producer's run.
    while let Some(message) = popper.pop() {
        println!("{message}");
    }

    println!("stack drained: {}", popper.is_empty());
}
