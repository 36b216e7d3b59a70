//! Private helpers for testing in this workspace's packages.

use std::panic;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Runs a test body with a timeout so a livelocked or deadlocked test fails
/// instead of hanging the build.
///
/// The body runs on a separate thread; if it does not finish within the
/// limit, this function panics on the calling thread. The stuck worker
/// thread is abandoned, which is fine for a test process.
///
/// The limit is generous because the concurrency tests in this workspace
/// deliberately provoke heavy contention, and more generous still under
/// Miri, where atomics are interpreted and dramatically slower.
///
/// # Panics
///
/// Panics if the body exceeds the limit or itself panics.
///
/// # Examples
///
/// ```
/// use testing::with_watchdog;
///
/// let result = with_watchdog(|| 2 + 2);
/// assert_eq!(result, 4);
/// ```
pub fn with_watchdog<F, R>(body: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let limit = if cfg!(miri) {
        Duration::from_secs(300)
    } else {
        Duration::from_secs(30)
    };

    let (result_tx, result_rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        // A send failure means the watchdog already gave up on us; there is
        // nobody left to care about the result.
        drop(result_tx.send(body()));
    });

    match result_rx.recv_timeout(limit) {
        Ok(result) => {
            worker.join().expect("worker already sent its result");
            result
        }
        Err(RecvTimeoutError::Disconnected) => {
            // The worker died without sending: re-raise its panic here so
            // the test shows the real failure.
            match worker.join() {
                Err(payload) => panic::resume_unwind(payload),
                Ok(()) => unreachable!("worker succeeded without sending a result"),
            }
        }
        Err(RecvTimeoutError::Timeout) => {
            panic!("test body exceeded the {limit:?} watchdog limit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_the_result_through() {
        assert_eq!(with_watchdog(|| 40 + 2), 42);
    }

    #[test]
    #[should_panic]
    fn propagates_a_panicking_body() {
        with_watchdog(|| panic!("intentional"));
    }
}
