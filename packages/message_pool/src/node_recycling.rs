use std::num::NonZero;

/// Determines what happens to the link nodes of the slow-path stack once their item is taken.
///
/// Every item pushed to the slow-path stack needs a link node. Recycling nodes through a spare
/// node free-list avoids an allocation per push in steady state. Recycling is best-effort: a
/// drained node is offered to the free-list with exactly one compare-and-swap attempt and is
/// freed if that attempt loses a race, so the free-list never blocks or retries.
///
/// Every policy puts a hard cap on the number of spare nodes. A node that arrives while the
/// free-list is at its cap is freed.
///
/// By default, the free-list holds at most as many spare nodes as the pool's maximum size.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use message_pool::{MessagePool, NodeRecycling};
///
/// let pool = MessagePool::<Vec<u8>>::builder()
///     .node_recycling(NodeRecycling::Bounded(NonZero::new(32).unwrap()))
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum NodeRecycling {
    /// Drained nodes are kept while the free-list holds fewer spare nodes than the pool's
    /// current maximum size. This is the default.
    ///
    /// The stack never holds more items than the maximum size, so this is enough spare nodes
    /// to refill it completely without allocating. The cap follows the maximum size when it
    /// is changed at runtime.
    #[default]
    UpToMaxSize,

    /// Drained nodes are kept while the free-list holds fewer spare nodes than the given
    /// limit, independent of the pool's maximum size.
    Bounded(NonZero<usize>),

    /// Drained nodes are always freed and every push allocates a fresh node.
    Disabled,
}

impl NodeRecycling {
    /// The most spare nodes the free-list may hold for a pool whose maximum size is `max_size`.
    pub(crate) fn spare_limit(self, max_size: usize) -> usize {
        match self {
            Self::UpToMaxSize => max_size,
            Self::Bounded(limit) => limit.get(),
            Self::Disabled => 0,
        }
    }
}
