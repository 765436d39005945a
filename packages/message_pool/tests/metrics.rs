//! Integration test for the metrics that message pools report through `nm`.
//!
//! This test is in a separate integration test binary so that no other test adds to the
//! process-wide event counts.

use std::thread;

use message_pool::MessagePool;
use nm::Report;

const CONSTRUCTED: &str = "message_pool_items_constructed";
const DISCARDED: &str = "message_pool_items_discarded";

fn count_of(report: &Report, name: &str) -> u64 {
    report
        .events()
        .find(|e| e.name() == name)
        .map_or(0, |e| e.count())
}

#[test]
fn slow_path_outcomes_are_counted_across_threads() {
    let pool = MessagePool::<Vec<u8>>::builder().max_size(1).build();

    // Empty pool: every item is constructed.
    let items = [pool.acquire(), pool.acquire(), pool.acquire()];

    // Fast slot, then the single stack place, then nowhere left.
    for item in items {
        pool.release(item);
    }

    // Two pooled items come back, the third is constructed.
    let items = [pool.acquire(), pool.acquire(), pool.acquire()];

    // Once more, one of them does not fit.
    for item in items {
        pool.release(item);
    }

    // Observations made on other threads are aggregated into the same events.
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                let pool = MessagePool::<Vec<u8>>::builder().max_size(0).build();

                let first = pool.acquire();
                let second = pool.acquire();
                pool.release(first);
                pool.release(second);
            });
        }
    });

    let report = Report::collect();
    assert_eq!(count_of(&report, CONSTRUCTED), 4 + 4 * 2);
    assert_eq!(count_of(&report, DISCARDED), 2 + 4);

    // Round trips through the fast slot are not observed at all.
    for _ in 0..1_000 {
        let item = pool.acquire();
        pool.release(item);
    }

    let report = Report::collect();
    assert_eq!(count_of(&report, CONSTRUCTED), 12);
    assert_eq!(count_of(&report, DISCARDED), 6);
}
