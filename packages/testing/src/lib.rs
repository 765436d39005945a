#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for multithreaded tests of the message pool.

use std::env;
use std::panic;
use std::sync::{Barrier, mpsc};
use std::thread;
use std::time::Duration;

/// Runs a test body on a separate thread and fails the test if it does not finish in time.
///
/// Lock-free retry loops that stop making progress would otherwise hang the test binary
/// forever. The timeout is 10 seconds normally and 60 seconds under Miri.
///
/// When the `MUTATION_TESTING` environment variable is `1`, the body runs directly on the
/// calling thread so that mutation testing can detect hanging mutations on its own.
///
/// # Panics
///
/// Panics if the body exceeds the timeout. Panics raised by the body are propagated.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let sum = with_watchdog(|| 2 + 2);
/// assert_eq!(sum, 4);
/// ```
pub fn with_watchdog<F, R>(body: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return body();
    }

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (tx, rx) = mpsc::channel();

    let worker = thread::spawn(move || {
        // The receiver is gone if we already timed out, nobody is left to tell.
        drop(tx.send(body()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            worker.join().expect("worker thread sent its result, so it did not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {timeout:?}, a retry loop is probably stuck");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match worker.join() {
            Ok(()) => panic!("worker thread exited without sending a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Runs `work` on `thread_count` threads that all start at the same moment.
///
/// Each thread receives its index in `0..thread_count`. The results are returned in index
/// order once every thread has finished.
///
/// # Panics
///
/// Propagates any panic raised by `work`.
///
/// # Example
///
/// ```rust
/// use testing::run_on_threads;
///
/// let doubled = run_on_threads(4, |index| index * 2);
/// assert_eq!(doubled, [0, 2, 4, 6]);
/// ```
pub fn run_on_threads<F, R>(thread_count: usize, work: F) -> Vec<R>
where
    F: Fn(usize) -> R + Sync,
    R: Send,
{
    let start = Barrier::new(thread_count);

    thread::scope(|s| {
        let handles = (0..thread_count)
            .map(|index| {
                let start = &start;
                let work = &work;

                s.spawn(move || {
                    start.wait();
                    work(index)
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect()
    })
}
