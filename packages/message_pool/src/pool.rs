use std::any::type_name;
use std::fmt;

use nm::Event;
use tracing::{debug, trace};

use crate::metrics::{ITEMS_CONSTRUCTED, ITEMS_DISCARDED};
use crate::{
    FastSlot, ItemStack, MessagePoolBuilder, NodeRecycling, Recycled, SlowPath, global,
};

/// A bounded, thread-safe pool of reusable `T` instances.
///
/// Items are handed out as `Box<T>` by [`acquire()`][1] and handed back by [`release()`][2].
/// The pool never inspects or resets its items - whatever state an item was released in is the
/// state the next caller receives it in.
///
/// # Structure
///
/// Released items first land in a single-item fast slot. A thread that acquires and releases
/// one item at a time therefore reuses the same instance with one atomic operation per call.
///
/// When the fast slot is occupied, released items go onto a slow-path LIFO stack whose length
/// is bounded by [`max_size()`][3]. Items that do not fit are dropped. When both the fast slot
/// and the stack are empty, [`acquire()`][1] constructs a new item via [`Default`].
///
/// # Thread safety
///
/// The pool is [`Sync`] and meant to be shared. With the default [`SlowPath::LockFree`],
/// every operation completes via atomic exchanges and bounded spinning - no thread ever waits
/// for another thread to release a lock.
///
/// No ordering is guaranteed between items that went through the fast slot and items that went
/// through the stack. Only items routed exclusively through the stack come back in LIFO order.
///
/// # Example
///
/// ```
/// use message_pool::MessagePool;
///
/// #[derive(Default)]
/// struct Heartbeat {
///     sequence: u64,
/// }
///
/// let pool = MessagePool::<Heartbeat>::new();
///
/// let mut message = pool.acquire();
/// message.sequence = 42;
/// pool.release(message);
///
/// // The same instance comes back, exactly as it was released.
/// let message = pool.acquire();
/// assert_eq!(message.sequence, 42);
/// ```
///
/// [1]: Self::acquire
/// [2]: Self::release
/// [3]: Self::max_size
pub struct MessagePool<T> {
    fast_slot: FastSlot<T>,
    stack: ItemStack<T>,
}

impl<T> MessagePool<T>
where
    T: Default + Send + 'static,
{
    pub(crate) fn new_inner(
        max_size: Option<usize>,
        slow_path: SlowPath,
        node_recycling: NodeRecycling,
    ) -> Self {
        Self {
            fast_slot: FastSlot::new(),
            stack: ItemStack::new(max_size, slow_path, node_recycling),
        }
    }

    /// Creates a new pool with the default configuration.
    ///
    /// The pool starts empty and follows the process-wide [default limit][1].
    ///
    /// # Example
    ///
    /// ```
    /// use message_pool::{MessagePool, default_max_size};
    ///
    /// let pool = MessagePool::<Vec<u8>>::new();
    ///
    /// assert_eq!(pool.stack_len(), 0);
    /// assert_eq!(pool.max_size(), default_max_size());
    /// ```
    ///
    /// [1]: crate::default_max_size
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new pool with a custom configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use message_pool::MessagePool;
    ///
    /// let pool = MessagePool::<String>::builder().max_size(16).build();
    ///
    /// assert_eq!(pool.max_size(), 16);
    /// ```
    pub fn builder() -> MessagePoolBuilder<T> {
        MessagePoolBuilder::new()
    }

    /// The process-wide pool for `T`, created on first use and never dropped.
    ///
    /// Every call for the same `T` returns the same pool. Lookup goes through a shared registry
    /// that takes a read lock, so code on a hot path should hold on to the returned reference
    /// or use the [`poolable!`][crate::poolable] macro, which caches it per type.
    ///
    /// # Example
    ///
    /// ```
    /// use std::ptr;
    ///
    /// use message_pool::MessagePool;
    ///
    /// #[derive(Default)]
    /// struct Ack;
    ///
    /// let first = MessagePool::<Ack>::global();
    /// let second = MessagePool::<Ack>::global();
    ///
    /// assert!(ptr::eq(first, second));
    /// ```
    #[must_use]
    pub fn global() -> &'static Self {
        global::pool_for::<T>()
    }

    /// Takes an item from the pool, constructing a new one if the pool is empty.
    ///
    /// Never fails. The item is in whatever state it was released in.
    #[must_use]
    pub fn acquire(&self) -> Box<T> {
        if let Some(item) = self.fast_slot.take() {
            return item;
        }

        if let Some(item) = self.stack.try_pop() {
            return item;
        }

        Self::construct()
    }

    /// Takes an item from the pool wrapped in a handle that releases it when dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use message_pool::MessagePool;
    ///
    /// let pool = MessagePool::<Vec<u8>>::new();
    ///
    /// {
    ///     let mut buffer = pool.acquire_recycled();
    ///     buffer.extend_from_slice(b"hello");
    /// } // Released back into the pool here.
    ///
    /// assert_eq!(*pool.acquire(), b"hello");
    /// ```
    #[must_use]
    pub fn acquire_recycled(&self) -> Recycled<'_, T> {
        Recycled::new(self.acquire(), self)
    }

    /// Hands an item to the pool for reuse.
    ///
    /// Never fails. If the fast slot is occupied and the slow-path stack is at its limit, the
    /// item is dropped.
    ///
    /// Items do not have to originate from this pool - any `Box<T>` is accepted.
    pub fn release(&self, item: Box<T>) {
        let Err(item) = self.fast_slot.try_put(item) else {
            return;
        };

        if let Err(item) = self.stack.try_push(item) {
            Self::discard(item);
        }
    }

    /// Hands an item to the pool for reuse if there is one; does nothing for `None`.
    pub fn release_opt(&self, item: Option<Box<T>>) {
        if let Some(item) = item {
            self.release(item);
        }
    }

    #[cold]
    fn construct() -> Box<T> {
        trace!(item_type = type_name::<T>(), "message pool empty, constructing item");
        ITEMS_CONSTRUCTED.with(Event::observe_once);

        Box::default()
    }

    #[cold]
    fn discard(item: Box<T>) {
        trace!(item_type = type_name::<T>(), "message pool full, dropping item");
        ITEMS_DISCARDED.with(Event::observe_once);

        drop(item);
    }

    /// The maximum number of items held on the slow-path stack.
    ///
    /// The fast slot holds one more item on top of this.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.stack.governor().max_size()
    }

    /// Pins the slow-path limit of this pool to the given value.
    ///
    /// Takes effect immediately. Lowering the limit below the current [`stack_len()`][1]
    /// evicts nothing; it only prevents more items from being stacked until enough have been
    /// acquired. Values of `usize::MAX` are clamped to `usize::MAX - 1`.
    ///
    /// # Example
    ///
    /// ```
    /// use message_pool::MessagePool;
    ///
    /// let pool = MessagePool::<u64>::new();
    /// pool.set_max_size(0);
    ///
    /// pool.release(Box::new(1)); // Lands in the fast slot.
    /// pool.release(Box::new(2)); // Dropped, the stack may not hold anything.
    ///
    /// assert_eq!(pool.stack_len(), 0);
    /// ```
    ///
    /// [1]: Self::stack_len
    pub fn set_max_size(&self, max_size: usize) {
        self.stack.governor().set_max_size(max_size);

        debug!(
            item_type = type_name::<T>(),
            max_size = self.max_size(),
            "message pool limit changed"
        );
    }

    /// Makes this pool follow the process-wide [default limit][1] again.
    ///
    /// [1]: crate::default_max_size
    pub fn inherit_default_max_size(&self) {
        self.stack.governor().inherit_default_max_size();

        debug!(
            item_type = type_name::<T>(),
            "message pool limit now follows the process-wide default"
        );
    }

    /// Whether this pool follows the process-wide [default limit][1].
    ///
    /// [1]: crate::default_max_size
    #[must_use]
    pub fn follows_default_max_size(&self) -> bool {
        self.stack.governor().inherits_default()
    }

    /// The number of items on the slow-path stack, not counting the fast slot.
    ///
    /// Under concurrent use this is a snapshot that may already be outdated.
    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.stack.governor().occupancy()
    }

    /// Whether the fast slot currently holds an item.
    #[must_use]
    pub fn has_fast_item(&self) -> bool {
        self.fast_slot.is_occupied()
    }

    /// The number of spare link nodes kept for future slow-path pushes.
    ///
    /// This stays within the limit of the [`NodeRecycling`] policy. Lowering the maximum size
    /// stops new nodes from being kept but does not free the ones already there.
    #[must_use]
    pub fn spare_nodes(&self) -> usize {
        self.stack.spare_nodes()
    }

    /// The slow path this pool was built with.
    #[must_use]
    pub fn slow_path(&self) -> SlowPath {
        self.stack.slow_path()
    }

    /// The node recycling policy in force for this pool.
    ///
    /// Always [`NodeRecycling::Disabled`] for [`SlowPath::Locked`], which has no link nodes.
    #[must_use]
    pub fn node_recycling(&self) -> NodeRecycling {
        self.stack.node_recycling()
    }
}

impl<T> Default for MessagePool<T>
where
    T: Default + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MessagePool<T>
where
    T: Default + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("max_size", &self.max_size())
            .field("stack_len", &self.stack_len())
            .field("has_fast_item", &self.has_fast_item())
            .field("spare_nodes", &self.spare_nodes())
            .field("slow_path", &self.slow_path())
            .field("node_recycling", &self.node_recycling())
            .finish_non_exhaustive()
    }
}
