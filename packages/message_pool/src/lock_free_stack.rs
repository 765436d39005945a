use std::sync::Arc;
use std::sync::atomic;

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam::utils::Backoff;

use crate::{Node, NodeRecycler, NodeRecycling};

/// A multi-producer, multi-consumer LIFO stack of boxed items (a Treiber stack).
///
/// Link nodes come from a [`NodeRecycler`] when one is available and are handed back to it
/// after their item has been popped. The stack does not count its items - capacity accounting
/// is the job of the caller.
///
/// # Memory reclamation
///
/// Every operation runs under a pinned epoch guard. A popped node is never reused or freed
/// directly - it is retired through the epoch, so it only becomes available again once no
/// thread can still be comparing against a stale pointer to it.
#[derive(Debug)]
pub(crate) struct LockFreeStack<T> {
    head: Atomic<Node<T>>,

    /// Shared with the deferred functions that recycle retired nodes, which may run on any
    /// thread and after the stack itself is gone.
    recycler: Arc<NodeRecycler<T>>,
}

impl<T> LockFreeStack<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(recycling: NodeRecycling) -> Self {
        Self {
            head: Atomic::null(),
            recycler: Arc::new(NodeRecycler::new(recycling)),
        }
    }

    pub(crate) fn node_recycling(&self) -> NodeRecycling {
        self.recycler.policy()
    }

    pub(crate) fn spare_nodes(&self) -> usize {
        self.recycler.spare_nodes()
    }

    /// Pushes an item, retrying with backoff until the head exchange succeeds.
    #[cfg_attr(test, mutants::skip)] // Can be mutated to an infinite loop.
    pub(crate) fn push(&self, item: Box<T>) {
        let guard = epoch::pin();

        let node = self
            .recycler
            .take(&guard)
            .unwrap_or_else(|| Owned::new(Node::new()).into_shared(&guard));

        // SAFETY: The node was either just allocated or just detached from the free-list,
        // and nodes are not freed while we are pinned.
        let node_ref = unsafe { node.deref() };

        // SAFETY: Until the exchange below publishes the node, we are its only owner.
        unsafe {
            node_ref.put_item(item);
        }

        let backoff = Backoff::new();

        loop {
            let head = self.head.load(atomic::Ordering::Relaxed, &guard);
            node_ref.next.store(head, atomic::Ordering::Relaxed);

            // Release publishes the item to whoever pops this node.
            if self
                .head
                .compare_exchange(
                    head,
                    node,
                    atomic::Ordering::Release,
                    atomic::Ordering::Relaxed,
                    &guard,
                )
                .is_ok()
            {
                return;
            }

            backoff.spin();
        }
    }

    /// Pops the most recently pushed item, or returns `None` if the stack is empty.
    ///
    /// `max_size` is the current item limit of the owning pool, which caps how many drained
    /// nodes are kept for reuse.
    pub(crate) fn try_pop(&self, max_size: usize) -> Option<Box<T>> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            // Acquire pairs with the Release of the push that published this node.
            let head = self.head.load(atomic::Ordering::Acquire, &guard);

            // SAFETY: A node reachable from the head is only recycled or freed after being
            // retired through the epoch, which cannot complete while we are pinned.
            let node = unsafe { head.as_ref() }?;

            let next = node.next.load(atomic::Ordering::Relaxed, &guard);

            if self
                .head
                .compare_exchange(
                    head,
                    next,
                    atomic::Ordering::Acquire,
                    atomic::Ordering::Relaxed,
                    &guard,
                )
                .is_ok()
            {
                // SAFETY: Winning the exchange detached the node, so its item is ours alone.
                let item = unsafe { node.take_item() };

                self.retire(head, &guard, max_size);

                debug_assert!(item.is_some(), "stack node without an item");
                return item;
            }

            backoff.spin();
        }
    }

    /// Hands a detached node to the recycler once no pinned thread can still observe it.
    #[cfg_attr(test, mutants::skip)] // Recycling is just a cache, the stack stays correct without it.
    fn retire(&self, node: Shared<'_, Node<T>>, guard: &Guard, max_size: usize) {
        let spare_limit = self.recycler.policy().spare_limit(max_size);

        if spare_limit == 0 {
            // SAFETY: The node is detached from the stack and destruction is deferred until
            // every thread that could still hold a pointer to it has unpinned.
            unsafe {
                guard.defer_destroy(node);
            }

            return;
        }

        let recycler = Arc::clone(&self.recycler);

        let recycle = move || {
            // SAFETY: By the time deferred functions run, every thread that was pinned when the
            // node was detached has unpinned, so nobody else holds a pointer to it any more.
            let node = unsafe { node.into_owned() };

            recycler.offer(node, spare_limit);
        };

        // SAFETY: The closure only captures the node pointer and an owned handle to the
        // recycler. Items are `Send + 'static`, so running it later on another thread is fine.
        unsafe {
            guard.defer_unchecked(recycle);
        }
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        // SAFETY: We have exclusive access to the stack, so no other thread can be looking at
        // its nodes and there is nothing to protect against.
        let guard = unsafe { epoch::unprotected() };

        let mut current = self.head.load(atomic::Ordering::Relaxed, guard);

        while !current.is_null() {
            // SAFETY: Every node in the stack was allocated as an `Owned` and is linked exactly
            // once. We have exclusive access, so nobody else holds a pointer to it. Dropping the
            // node drops the item it holds.
            let node = unsafe { current.into_owned() };
            current = node.next.load(atomic::Ordering::Relaxed, guard);
        }
    }
}

// SAFETY: Items are only ever accessed by the one thread that exclusively owns their node
// (before publishing it or after unlinking it), so the stack moves `T` values between threads
// but never shares them.
unsafe impl<T: Send> Send for LockFreeStack<T> {}

// SAFETY: See `Send`. All shared state is accessed through atomics.
unsafe impl<T: Send> Sync for LockFreeStack<T> {}
