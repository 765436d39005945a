//! Concise example of recycling messages through a pool.
//!
//! Shows an explicit pool with a custom limit, automatic release through `Recycled` and a
//! process-wide pool shared through the `poolable!` macro.

use message_pool::{MessagePool, Poolable, poolable};

#[derive(Debug, Default)]
struct OrderUpdate {
    order_id: u64,
    venue: String,
}

#[derive(Debug, Default)]
struct Ack {
    order_id: u64,
}

poolable!(Ack);

fn main() {
    println!("=== Explicit pool ===");
    explicit_pool();

    println!("\n=== Automatic release ===");
    automatic_release();

    println!("\n=== Process-wide pool ===");
    process_wide_pool();
}

fn explicit_pool() {
    let pool = MessagePool::<OrderUpdate>::builder().max_size(8).build();

    let mut update = pool.acquire();
    update.order_id = 1001;
    update.venue.clear();
    update.venue.push_str("XNAS");
    println!("Encoding {update:?}");
    pool.release(update);

    // The same instance comes back, together with its string buffer.
    let update = pool.acquire();
    println!("Reused instance still holds {update:?}");
    pool.release(update);

    println!("{pool:?}");
}

fn automatic_release() {
    let pool = MessagePool::<Vec<u8>>::new();

    for frame in 0..3_u8 {
        let mut buffer = pool.acquire_recycled();
        buffer.clear();
        buffer.extend_from_slice(&[frame; 4]);
        println!("Frame {frame}: {} bytes, capacity {}", buffer.len(), buffer.capacity());
    }
}

fn process_wide_pool() {
    let mut ack = Ack::acquire();
    ack.order_id = 1001;
    println!("Sending {ack:?}");
    ack.release();

    println!("Pooled acks ready: fast slot {}", Ack::pool().has_fast_item());
}
