use parking_lot::Mutex;

/// A LIFO stack of boxed items guarded by a mutex.
///
/// The locking counterpart of [`LockFreeStack`][crate::LockFreeStack], with the same contract:
/// capacity accounting is the job of the caller.
#[derive(Debug)]
pub(crate) struct LockedStack<T> {
    items: Mutex<Vec<Box<T>>>,
}

impl<T> LockedStack<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, item: Box<T>) {
        self.items.lock().push(item);
    }

    pub(crate) fn try_pop(&self) -> Option<Box<T>> {
        self.items.lock().pop()
    }
}
