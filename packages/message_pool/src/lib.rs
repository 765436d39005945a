//! A bounded, thread-safe object pool for recycling short-lived message instances.
//!
//! This crate provides [`MessagePool`], a pool of heap-allocated `T` values meant for hot
//! serialization paths where the same kind of message is created and thrown away at a high rate.
//! Instead of allocating a fresh message every time, callers [`acquire()`][1] one from the pool,
//! fill it in, and [`release()`][2] it when done.
//!
//! # Key Features
//!
//! - **Single-item fast path**: A thread that acquires and releases one item at a time reuses
//!   the same instance with one atomic operation per call
//! - **Lock-free slow path**: Surplus items go onto a lock-free LIFO stack protected by
//!   epoch-based reclamation, so no operation ever waits for another thread
//! - **Bounded**: The slow-path stack holds at most [`max_size()`][3] items; anything beyond
//!   that is dropped
//! - **Live configuration**: Limits can be changed at any time, per pool or process-wide
//! - **Node recycling**: Link nodes of the stack are reused on a best-effort basis, with a
//!   configurable [policy][NodeRecycling]
//! - **Global pools**: One process-wide pool per type via [`MessagePool::global()`],
//!   the [`Poolable`] trait and the [`poolable!`] macro
//! - **Content-agnostic**: The pool never inspects or resets items - you get them back exactly
//!   as they were released
//!
//! # Examples
//!
//! ## Explicit acquire and release
//!
//! ```
//! use message_pool::MessagePool;
//!
//! #[derive(Default)]
//! struct Request {
//!     id: u64,
//!     payload: Vec<u8>,
//! }
//!
//! let pool = MessagePool::<Request>::new();
//!
//! let mut request = pool.acquire();
//! request.id = 1;
//! request.payload.clear();
//! request.payload.extend_from_slice(b"ping");
//!
//! pool.release(request);
//! ```
//!
//! ## Automatic release
//!
//! ```
//! use message_pool::MessagePool;
//!
//! let pool = MessagePool::<String>::builder().max_size(32).build();
//!
//! {
//!     let mut line = pool.acquire_recycled();
//!     line.push_str("returned to the pool at the end of this scope");
//! }
//!
//! assert!(pool.has_fast_item());
//! ```
//!
//! ## Process-wide pools
//!
//! ```
//! use message_pool::{Poolable, poolable};
//!
//! #[derive(Default)]
//! struct Event {
//!     kind: u16,
//! }
//!
//! poolable!(Event);
//!
//! let mut event = Event::acquire();
//! event.kind = 7;
//! event.release();
//! ```
//!
//! # Ownership contract
//!
//! Releasing an item hands it over to the pool. Because items travel as `Box<T>`, the type
//! system already prevents releasing the same instance twice or using it after release.
//!
//! [1]: MessagePool::acquire
//! [2]: MessagePool::release
//! [3]: MessagePool::max_size

mod builder;
mod capacity;
mod fast_slot;
mod global;
mod item_stack;
mod lock_free_stack;
mod locked_stack;
mod metrics;
mod node;
mod node_recycling;
mod pool;
mod recycled;
mod recycler;
mod slow_path;

pub use builder::*;
pub(crate) use capacity::CapacityGovernor;
pub use capacity::{DEFAULT_MAX_SIZE, default_max_size, set_default_max_size};
pub(crate) use fast_slot::*;
pub use global::Poolable;
pub(crate) use item_stack::*;
pub(crate) use lock_free_stack::*;
pub(crate) use locked_stack::*;
pub(crate) use node::*;
pub use node_recycling::*;
pub use pool::MessagePool;
pub use recycled::Recycled;
pub(crate) use recycler::*;
pub use slow_path::*;
