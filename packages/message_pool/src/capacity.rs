use std::sync::atomic::{self, AtomicUsize};

use crossbeam::utils::Backoff;
use tracing::debug;

/// The maximum number of items a pool keeps on its slow-path stack unless configured otherwise.
///
/// The fast slot is not counted against this limit, so a pool at the default limit can hold
/// up to `DEFAULT_MAX_SIZE + 1` idle items.
pub const DEFAULT_MAX_SIZE: usize = 100;

/// The live process-wide default limit, shared by every pool that was not given its own limit.
static DEFAULT_LIMIT: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_SIZE);

/// Stored in a governor's own limit to indicate that it follows [`DEFAULT_LIMIT`].
const INHERIT: usize = usize::MAX;

/// Explicit limits are clamped to this value so they never collide with [`INHERIT`].
const MAX_EXPLICIT_LIMIT: usize = INHERIT - 1;

/// Returns the process-wide default slow-path limit.
///
/// Pools that were built without an explicit [`max_size`][1] follow this value, including any
/// later changes made through [`set_default_max_size()`].
///
/// # Example
///
/// ```
/// use message_pool::{DEFAULT_MAX_SIZE, default_max_size};
///
/// // Unless some other code in the process has changed it.
/// assert_eq!(default_max_size(), DEFAULT_MAX_SIZE);
/// ```
///
/// [1]: crate::MessagePoolBuilder::max_size
#[must_use]
pub fn default_max_size() -> usize {
    DEFAULT_LIMIT.load(atomic::Ordering::Relaxed)
}

/// Changes the process-wide default slow-path limit.
///
/// The change takes effect immediately for every pool that follows the default, including
/// pools that already hold items. Lowering the limit below the current occupancy of a pool does
/// not evict anything, it only prevents further items from being stacked until the occupancy
/// drops below the new limit.
///
/// Values of `usize::MAX` are clamped to `usize::MAX - 1`.
pub fn set_default_max_size(max_size: usize) {
    let max_size = max_size.min(MAX_EXPLICIT_LIMIT);
    let previous = DEFAULT_LIMIT.swap(max_size, atomic::Ordering::Relaxed);

    debug!(previous, max_size, "default message pool limit changed");
}

/// Enforces the upper bound on the number of items resident in a slow-path stack.
///
/// The occupancy counter is only an accounting device - it does not publish any data on its own,
/// so all operations on it are relaxed. The stack it guards does its own synchronization.
#[derive(Debug)]
pub(crate) struct CapacityGovernor {
    occupancy: AtomicUsize,

    /// Either an explicit limit or [`INHERIT`]. Re-read on every reservation attempt.
    max_size: AtomicUsize,
}

impl CapacityGovernor {
    /// Creates a governor with its own limit, or one that follows the default if `None`.
    pub(crate) fn new(max_size: Option<usize>) -> Self {
        let max_size = max_size.map_or(INHERIT, |limit| limit.min(MAX_EXPLICIT_LIMIT));

        Self {
            occupancy: AtomicUsize::new(0),
            max_size: AtomicUsize::new(max_size),
        }
    }

    /// Claims one unit of capacity if the occupancy is below the current limit.
    ///
    /// Returns `false` if the stack is full, in which case the caller must not push.
    pub(crate) fn try_reserve(&self) -> bool {
        let backoff = Backoff::new();
        let mut occupancy = self.occupancy.load(atomic::Ordering::Relaxed);

        loop {
            if occupancy >= self.max_size() {
                return false;
            }

            // Cannot overflow: occupancy is below a limit that is at most usize::MAX - 1.
            let reserved = occupancy.wrapping_add(1);

            match self.occupancy.compare_exchange_weak(
                occupancy,
                reserved,
                atomic::Ordering::Relaxed,
                atomic::Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => {
                    occupancy = current;
                    backoff.spin();
                }
            }
        }
    }

    /// Returns one unit of capacity after an item has left the stack.
    pub(crate) fn release(&self) {
        let previous = self.occupancy.fetch_sub(1, atomic::Ordering::Relaxed);

        debug_assert!(
            previous > 0,
            "capacity released more times than it was reserved"
        );
    }

    /// The number of reserved units, i.e. items on (or about to be pushed to) the stack.
    pub(crate) fn occupancy(&self) -> usize {
        self.occupancy.load(atomic::Ordering::Relaxed)
    }

    /// The limit currently in force, resolving the process-wide default if inherited.
    pub(crate) fn max_size(&self) -> usize {
        match self.max_size.load(atomic::Ordering::Relaxed) {
            INHERIT => default_max_size(),
            explicit => explicit,
        }
    }

    /// Whether this governor follows the process-wide default limit.
    pub(crate) fn inherits_default(&self) -> bool {
        self.max_size.load(atomic::Ordering::Relaxed) == INHERIT
    }

    pub(crate) fn set_max_size(&self, max_size: usize) {
        self.max_size
            .store(max_size.min(MAX_EXPLICIT_LIMIT), atomic::Ordering::Relaxed);
    }

    pub(crate) fn inherit_default_max_size(&self) {
        self.max_size.store(INHERIT, atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn reserves_up_to_limit() {
        let governor = CapacityGovernor::new(Some(3));

        assert!(governor.try_reserve());
        assert!(governor.try_reserve());
        assert!(governor.try_reserve());
        assert!(!governor.try_reserve());
        assert_eq!(governor.occupancy(), 3);

        governor.release();
        assert_eq!(governor.occupancy(), 2);
        assert!(governor.try_reserve());
        assert!(!governor.try_reserve());
    }

    #[test]
    fn zero_limit_never_reserves() {
        let governor = CapacityGovernor::new(Some(0));

        assert!(!governor.try_reserve());
        assert_eq!(governor.occupancy(), 0);
    }

    #[test]
    fn shrinking_limit_blocks_until_drained() {
        let governor = CapacityGovernor::new(Some(5));

        for _ in 0..5 {
            assert!(governor.try_reserve());
        }

        governor.set_max_size(2);
        assert_eq!(governor.max_size(), 2);

        // Occupancy stays above the new limit; nothing is evicted.
        assert_eq!(governor.occupancy(), 5);
        assert!(!governor.try_reserve());

        governor.release();
        governor.release();
        governor.release();
        assert_eq!(governor.occupancy(), 2);
        assert!(!governor.try_reserve());

        governor.release();
        assert!(governor.try_reserve());
        assert!(!governor.try_reserve());
    }

    #[test]
    fn explicit_limit_is_clamped_below_sentinel() {
        let governor = CapacityGovernor::new(Some(usize::MAX));

        assert!(!governor.inherits_default());
        assert_eq!(governor.max_size(), usize::MAX - 1);
    }

    #[test]
    fn inherits_default_until_pinned() {
        let governor = CapacityGovernor::new(None);
        assert!(governor.inherits_default());
        assert_eq!(governor.max_size(), default_max_size());

        governor.set_max_size(7);
        assert!(!governor.inherits_default());
        assert_eq!(governor.max_size(), 7);

        governor.inherit_default_max_size();
        assert!(governor.inherits_default());
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Too slow under Miri.
    fn concurrent_reservations_never_exceed_limit() {
        const LIMIT: usize = 16;
        const THREADS: usize = 8;

        let governor = Arc::new(CapacityGovernor::new(Some(LIMIT)));

        let threads = (0..THREADS)
            .map(|_| {
                let governor = Arc::clone(&governor);

                thread::spawn(move || {
                    let mut reserved = 0_usize;

                    for _ in 0..1000 {
                        if governor.try_reserve() {
                            reserved = reserved.checked_add(1).unwrap();
                            assert!(governor.occupancy() <= LIMIT);
                        }

                        if reserved > 0 {
                            governor.release();
                            reserved = reserved.checked_sub(1).unwrap();
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(governor.occupancy(), 0);
    }

    static_assertions::assert_impl_all!(CapacityGovernor: Send, Sync);
}
