//! Metrics for the message pools.
//!
//! Only slow-path outcomes are observed, so the fast slot round trip stays free of any
//! bookkeeping. The events are shared by every pool in the process regardless of item type.

use nm::Event;

thread_local! {
    /// A pool had nothing to hand out and constructed a new item.
    pub(crate) static ITEMS_CONSTRUCTED: Event = Event::builder()
        .name("message_pool_items_constructed")
        .build();

    /// A released item did not fit into the pool and was dropped.
    pub(crate) static ITEMS_DISCARDED: Event = Event::builder()
        .name("message_pool_items_discarded")
        .build();

    /// A drained link node could not be recycled and was freed instead.
    pub(crate) static NODES_ABANDONED: Event = Event::builder()
        .name("message_pool_nodes_abandoned")
        .build();
}
