use std::sync::atomic::{self, AtomicUsize};

use crossbeam::epoch::{self, Atomic, Guard, Owned, Shared};
use nm::Event;
use tracing::trace;

use crate::metrics::NODES_ABANDONED;
use crate::{Node, NodeRecycling};

/// A best-effort free-list of spare link nodes for the lock-free stack.
///
/// The caller decides how many spare nodes are worth keeping and passes that limit to every
/// [`offer()`][Self::offer]. Both directions make exactly one compare-and-swap attempt on the
/// list. A lost [`offer()`][Self::offer] frees the node, a lost [`take()`][Self::take] makes
/// the caller allocate. Neither ever spins on the list.
///
/// # Reclamation
///
/// Nodes only enter the free-list through [`offer()`][Self::offer], which the stack calls from
/// an epoch-deferred function once every thread that was pinned when the node was unlinked has
/// unpinned. Consequently, while any thread is pinned and holding a stale pointer to a node,
/// that node cannot reappear at the head of either list, which rules out the ABA hazard on
/// both the stack and the free-list.
#[derive(Debug)]
pub(crate) struct NodeRecycler<T> {
    free: Atomic<Node<T>>,

    /// Places reserved in `free`. Reserved before a node is published and released after one
    /// is unlinked, so it is never less than the number of nodes actually in the list.
    spare: AtomicUsize,

    policy: NodeRecycling,
}

impl<T> NodeRecycler<T> {
    pub(crate) fn new(policy: NodeRecycling) -> Self {
        Self {
            free: Atomic::null(),
            spare: AtomicUsize::new(0),
            policy,
        }
    }

    pub(crate) fn policy(&self) -> NodeRecycling {
        self.policy
    }

    pub(crate) fn spare_nodes(&self) -> usize {
        self.spare.load(atomic::Ordering::Relaxed)
    }

    /// Offers a retired node for reuse.
    ///
    /// The node is freed if the free-list already holds `limit` spare nodes or if the exchange
    /// loses a race. The node must be empty and no longer reachable by any other thread.
    pub(crate) fn offer(&self, node: Owned<Node<T>>, limit: usize) -> OfferOutcome {
        // Reserving a place up front keeps the free-list within `limit` even when many
        // deferred functions recycle into it at the same time.
        if self
            .spare
            .fetch_update(atomic::Ordering::Relaxed, atomic::Ordering::Relaxed, |spare| {
                (spare < limit).then(|| spare.wrapping_add(1))
            })
            .is_err()
        {
            return OfferOutcome::Refused;
        }

        let guard = epoch::pin();

        let head = self.free.load(atomic::Ordering::Relaxed, &guard);
        node.next.store(head, atomic::Ordering::Relaxed);

        match self.free.compare_exchange(
            head,
            node,
            atomic::Ordering::Release,
            atomic::Ordering::Relaxed,
            &guard,
        ) {
            Ok(_) => OfferOutcome::Recycled,
            Err(lost) => {
                self.spare.fetch_sub(1, atomic::Ordering::Relaxed);
                drop(lost.new);

                trace!("link node abandoned after losing recycle race");
                NODES_ABANDONED.with(Event::observe_once);

                OfferOutcome::Abandoned
            }
        }
    }

    /// Takes a spare node off the free-list, if one can be had without contention.
    ///
    /// The returned node is detached, empty and exclusively owned by the caller, although other
    /// pinned threads may still read its `next` field until they notice the list has changed.
    pub(crate) fn take<'g>(&self, guard: &'g Guard) -> Option<Shared<'g, Node<T>>> {
        if self.policy == NodeRecycling::Disabled {
            return None;
        }

        let head = self.free.load(atomic::Ordering::Acquire, guard);

        // SAFETY: Nodes in the free-list are only freed when the recycler itself is dropped,
        // and a node that leaves the list can only come back (or be freed) after every thread
        // pinned at that time, including us, has unpinned.
        let node = unsafe { head.as_ref() }?;

        let next = node.next.load(atomic::Ordering::Relaxed, guard);

        self.free
            .compare_exchange(
                head,
                next,
                atomic::Ordering::Acquire,
                atomic::Ordering::Relaxed,
                guard,
            )
            .ok()?;

        self.spare.fetch_sub(1, atomic::Ordering::Relaxed);

        Some(head)
    }
}

impl<T> Drop for NodeRecycler<T> {
    fn drop(&mut self) {
        // SAFETY: We have exclusive access to the recycler, so no other thread can be looking
        // at the free-list and there is nothing to protect against.
        let guard = unsafe { epoch::unprotected() };

        let mut current = self.free.load(atomic::Ordering::Relaxed, guard);

        while !current.is_null() {
            // SAFETY: Every node in the free-list was allocated as an `Owned` and is linked
            // exactly once. We have exclusive access, so nobody else holds a pointer to it.
            let node = unsafe { current.into_owned() };
            current = node.next.load(atomic::Ordering::Relaxed, guard);
        }
    }
}

// SAFETY: Nodes in the free-list never hold items, and a node is only handed out to one caller
// at a time via a successful compare-and-swap. Moving the recycler between threads moves
// nothing but pointers to such nodes.
unsafe impl<T: Send> Send for NodeRecycler<T> {}

// SAFETY: All shared access goes through atomics; see `Send`.
unsafe impl<T: Send> Sync for NodeRecycler<T> {}

/// What became of a node offered to a [`NodeRecycler`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum OfferOutcome {
    /// The node is in the free-list.
    Recycled,

    /// The free-list was full and the node was freed.
    Refused,

    /// The exchange lost a race with another thread and the node was freed.
    Abandoned,
}
