use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;

use crate::{MessagePool, NodeRecycling, SlowPath};

/// Builder for creating an instance of [`MessagePool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`MessagePool::new()`] is sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use message_pool::{MessagePool, NodeRecycling, SlowPath};
///
/// let pool = MessagePool::<Vec<u8>>::builder()
///     .max_size(256)
///     .node_recycling(NodeRecycling::Disabled)
///     .slow_path(SlowPath::LockFree)
///     .build();
///
/// assert_eq!(pool.max_size(), 256);
/// ```
#[must_use]
pub struct MessagePoolBuilder<T> {
    max_size: Option<usize>,
    node_recycling: NodeRecycling,
    slow_path: SlowPath,

    _item: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for MessagePoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagePoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("max_size", &self.max_size)
            .field("node_recycling", &self.node_recycling)
            .field("slow_path", &self.slow_path)
            .finish()
    }
}

impl<T> MessagePoolBuilder<T>
where
    T: Default + Send + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            max_size: None,
            node_recycling: NodeRecycling::default(),
            slow_path: SlowPath::default(),
            _item: PhantomData,
        }
    }

    /// Pins the maximum number of items held on the slow-path stack.
    ///
    /// If not set, the pool follows the process-wide [default limit][1], including later
    /// changes to it. The limit can also be changed after the pool is built via
    /// [`MessagePool::set_max_size()`].
    ///
    /// [1]: crate::default_max_size
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the [node recycling policy][NodeRecycling] of the lock-free slow path.
    ///
    /// Has no effect with [`SlowPath::Locked`].
    pub fn node_recycling(mut self, policy: NodeRecycling) -> Self {
        self.node_recycling = policy;
        self
    }

    /// Selects the [slow path][SlowPath] data structure.
    pub fn slow_path(mut self, slow_path: SlowPath) -> Self {
        self.slow_path = slow_path;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use message_pool::MessagePool;
    ///
    /// let pool = MessagePool::<u64>::builder().build();
    /// assert!(pool.follows_default_max_size());
    /// ```
    #[must_use]
    pub fn build(self) -> MessagePool<T> {
        MessagePool::new_inner(self.max_size, self.slow_path, self.node_recycling)
    }
}
