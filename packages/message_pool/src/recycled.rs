use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::MessagePool;

/// An item acquired from a [`MessagePool`] that goes back to the pool when dropped.
///
/// Created by [`MessagePool::acquire_recycled()`]. Use [`into_inner()`][Self::into_inner] to
/// take the item out and manage its lifetime manually.
///
/// # Example
///
/// ```
/// use message_pool::{MessagePool, Recycled};
///
/// let pool = MessagePool::<String>::new();
///
/// let mut greeting = pool.acquire_recycled();
/// greeting.push_str("hello");
///
/// // Detached items are not returned automatically.
/// let owned: Box<String> = Recycled::into_inner(greeting);
/// assert_eq!(*owned, "hello");
/// assert!(!pool.has_fast_item());
/// ```
pub struct Recycled<'pool, T>
where
    T: Default + Send + 'static,
{
    // Only `None` after `into_inner()` has taken the item, at which point the handle is gone.
    item: Option<Box<T>>,
    pool: &'pool MessagePool<T>,
}

impl<'pool, T> Recycled<'pool, T>
where
    T: Default + Send + 'static,
{
    pub(crate) fn new(item: Box<T>, pool: &'pool MessagePool<T>) -> Self {
        Self {
            item: Some(item),
            pool,
        }
    }

    /// Detaches the item from the handle so it is not released on drop.
    ///
    /// This is an associated function rather than a method to avoid shadowing methods of `T`.
    #[must_use]
    pub fn into_inner(mut this: Self) -> Box<T> {
        this.item
            .take()
            .expect("item is only taken when the handle is consumed")
    }

    /// The pool this item will be released to.
    #[must_use]
    pub fn pool(this: &Self) -> &'pool MessagePool<T> {
        this.pool
    }
}

impl<T> Deref for Recycled<'_, T>
where
    T: Default + Send + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        self.item
            .as_deref()
            .expect("item is only taken when the handle is consumed")
    }
}

impl<T> DerefMut for Recycled<'_, T>
where
    T: Default + Send + 'static,
{
    fn deref_mut(&mut self) -> &mut T {
        self.item
            .as_deref_mut()
            .expect("item is only taken when the handle is consumed")
    }
}

impl<T> Drop for Recycled<'_, T>
where
    T: Default + Send + 'static,
{
    fn drop(&mut self) {
        self.pool.release_opt(self.item.take());
    }
}

impl<T> fmt::Debug for Recycled<'_, T>
where
    T: Default + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("attached", &self.item.is_some())
            .finish_non_exhaustive()
    }
}
