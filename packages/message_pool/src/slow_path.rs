/// Selects the data structure that holds released items once the fast slot is occupied.
///
/// Both variants have the same observable behavior: a LIFO stack bounded by the pool's
/// [`max_size`][crate::MessagePool::max_size]. They differ only in how they synchronize.
///
/// # Examples
///
/// ```
/// use message_pool::{MessagePool, SlowPath};
///
/// let pool = MessagePool::<String>::builder()
///     .slow_path(SlowPath::Locked)
///     .build();
///
/// assert_eq!(pool.slow_path(), SlowPath::Locked);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum SlowPath {
    /// A lock-free intrusive stack with epoch-based node reclamation and node recycling.
    /// This is the default.
    ///
    /// Every operation completes through atomic exchanges and bounded spinning, with no
    /// possibility of a thread being descheduled while holding a lock that others wait for.
    #[default]
    LockFree,

    /// A vector guarded by a mutex.
    ///
    /// Simpler and with fewer moving parts, at the cost of serializing all slow-path activity.
    /// Reasonable when the slow path is rarely taken or when contention is known to be low.
    Locked,
}
