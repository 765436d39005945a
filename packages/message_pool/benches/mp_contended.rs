//! Multithreaded benchmarks for the `message_pool` crate.
//!
//! Every thread runs the same acquire/release cycle against one shared pool. The measured time
//! is the wall clock time until all threads have finished their share of the iterations.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use message_pool::{MessagePool, SlowPath};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const THREAD_COUNTS: [u64; 3] = [2, 4, 8];

#[derive(Default)]
struct TestMessage {
    _sequence: u64,
    _payload: Vec<u8>,
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("mp_contended");

    for thread_count in THREAD_COUNTS {
        for (slow_path_name, slow_path) in
            [("lock_free", SlowPath::LockFree), ("locked", SlowPath::Locked)]
        {
            group.bench_function(format!("single_{slow_path_name}_x{thread_count}"), |b| {
                b.iter_custom(|iters| {
                    run_contended(iters, thread_count, slow_path, |pool| {
                        let item = black_box(pool.acquire());
                        pool.release(item);
                    })
                });
            });

            group.bench_function(format!("pair_{slow_path_name}_x{thread_count}"), |b| {
                b.iter_custom(|iters| {
                    run_contended(iters, thread_count, slow_path, |pool| {
                        let first = black_box(pool.acquire());
                        let second = black_box(pool.acquire());
                        pool.release(second);
                        pool.release(first);
                    })
                });
            });
        }
    }

    group.finish();
}

fn run_contended(
    iters: u64,
    thread_count: u64,
    slow_path: SlowPath,
    cycle: fn(&MessagePool<TestMessage>),
) -> Duration {
    let pool = MessagePool::<TestMessage>::builder()
        .slow_path(slow_path)
        .build();

    let per_thread = iters.div_ceil(thread_count);
    let start_line = Barrier::new(usize::try_from(thread_count).unwrap() + 1);

    thread::scope(|s| {
        for _ in 0..thread_count {
            s.spawn(|| {
                start_line.wait();

                for _ in 0..per_thread {
                    cycle(&pool);
                }
            });
        }

        start_line.wait();
        let start = Instant::now();

        // Leaving the scope joins every worker.
        start
    })
    .elapsed()
}
