use std::ptr;
use std::sync::atomic::{self, AtomicPtr};

/// A single-item cache in front of the slow-path stack.
///
/// A thread that repeatedly acquires and releases one item at a time only ever touches this
/// slot, with one atomic exchange per acquire and one compare-and-swap per release.
#[derive(Debug)]
pub(crate) struct FastSlot<T> {
    /// Null when empty, otherwise a pointer obtained from `Box::into_raw`.
    item: AtomicPtr<T>,
}

impl<T> FastSlot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            item: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Empties the slot, returning whatever it held.
    pub(crate) fn take(&self) -> Option<Box<T>> {
        // Acquire pairs with the Release in `try_put()` so we see the item as it was left.
        // Release makes our emptying visible before anyone refills the slot.
        let item = self.item.swap(ptr::null_mut(), atomic::Ordering::AcqRel);

        if item.is_null() {
            return None;
        }

        // SAFETY: Non-null values in the slot always come from `Box::into_raw()` and the swap
        // above removed the pointer from the slot, so we are its only owner.
        Some(unsafe { Box::from_raw(item) })
    }

    /// Places the item into the slot if the slot is empty, otherwise hands it back.
    pub(crate) fn try_put(&self, item: Box<T>) -> Result<(), Box<T>> {
        let raw = Box::into_raw(item);

        match self.item.compare_exchange(
            ptr::null_mut(),
            raw,
            atomic::Ordering::Release,
            atomic::Ordering::Relaxed,
        ) {
            Ok(_) => Ok(()),
            // SAFETY: The exchange failed, so the pointer never left our hands and we still own
            // the allocation we just turned into it.
            Err(_) => Err(unsafe { Box::from_raw(raw) }),
        }
    }

    pub(crate) fn is_occupied(&self) -> bool {
        !self.item.load(atomic::Ordering::Relaxed).is_null()
    }
}

impl<T> Drop for FastSlot<T> {
    fn drop(&mut self) {
        drop(self.take());
    }
}

// SAFETY: The slot owns at most one `T` and hands it over by value, never sharing it.
unsafe impl<T: Send> Send for FastSlot<T> {}

// SAFETY: See `Send`. The only shared state is the atomic pointer.
unsafe impl<T: Send> Sync for FastSlot<T> {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_empty() {
        let slot = FastSlot::<u32>::new();

        assert!(!slot.is_occupied());
        assert!(slot.take().is_none());
    }

    #[test]
    fn holds_one_item() {
        let slot = FastSlot::new();

        assert!(slot.try_put(Box::new(1)).is_ok());
        assert!(slot.is_occupied());

        let rejected = slot.try_put(Box::new(2)).unwrap_err();
        assert_eq!(*rejected, 2);

        assert_eq!(slot.take().as_deref(), Some(&1));
        assert!(!slot.is_occupied());
        assert!(slot.take().is_none());
    }

    #[test]
    fn returns_the_same_box() {
        let slot = FastSlot::new();

        let item = Box::new(String::from("payload"));
        let address = ptr::from_ref::<String>(&item);

        slot.try_put(item).unwrap();
        let taken = slot.take().unwrap();

        assert_eq!(ptr::from_ref::<String>(&taken), address);
    }

    #[test]
    fn drop_releases_item() {
        let tracker = Arc::new(());

        let slot = FastSlot::new();
        slot.try_put(Box::new(Arc::clone(&tracker))).unwrap();
        assert_eq!(Arc::strong_count(&tracker), 2);

        drop(slot);
        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    static_assertions::assert_impl_all!(FastSlot<String>: Send, Sync);
}
