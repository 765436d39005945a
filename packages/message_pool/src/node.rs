use std::cell::UnsafeCell;

use crossbeam::epoch::Atomic;

/// A link cell shared by the slow-path stack and the spare node free-list.
///
/// At any point in time a node is in exactly one of these states:
///
/// * linked into the item stack, holding an item;
/// * linked into the free-list of a [`NodeRecycler`][crate::NodeRecycler], holding nothing;
/// * detached - owned by the one thread whose compare-and-swap unlinked it, or retired and
///   waiting for the epoch to advance before it may be recycled or freed.
///
/// Other threads may still read `next` of a detached node through a stale head pointer they
/// loaded while pinned, which is why `next` is atomic. The `item` field is only ever touched by
/// the thread that exclusively holds the node (before publishing it, or after winning the
/// compare-and-swap that unlinks it).
#[derive(Debug)]
pub(crate) struct Node<T> {
    item: UnsafeCell<Option<Box<T>>>,
    pub(crate) next: Atomic<Self>,
}

impl<T> Node<T> {
    pub(crate) fn new() -> Self {
        Self {
            item: UnsafeCell::new(None),
            next: Atomic::null(),
        }
    }

    /// Stores an item in the node.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the item of this node, which is the case between
    /// obtaining the node (fresh allocation or a won free-list exchange) and publishing it.
    pub(crate) unsafe fn put_item(&self, item: Box<T>) {
        // SAFETY: Forwarding guarantee from the caller - nobody else touches `item` right now.
        let slot = unsafe { &mut *self.item.get() };

        debug_assert!(slot.is_none(), "node already holds an item");
        *slot = Some(item);
    }

    /// Removes the item from the node, leaving it empty.
    ///
    /// # Safety
    ///
    /// The caller must have exclusive access to the item of this node, which is the case after
    /// winning the compare-and-swap that unlinked the node from the stack.
    pub(crate) unsafe fn take_item(&self) -> Option<Box<T>> {
        // SAFETY: Forwarding guarantee from the caller - nobody else touches `item` right now.
        unsafe { &mut *self.item.get() }.take()
    }
}
