//! Process-wide pools, one per item type.

use std::any::{Any, TypeId, type_name};
use std::sync::{Arc, LazyLock};

use arc_swap::ArcSwap;
use foldhash::{HashMap, HashMapExt};
use parking_lot::Mutex;
use tracing::debug;

use crate::MessagePool;

type PoolRef = &'static (dyn Any + Send + Sync);

/// Every value is a leaked `MessagePool<T>` keyed by `TypeId::of::<T>()`.
///
/// Lookups read the current map without taking any lock. Registering a pool copies the map and
/// swaps the copy in, which happens once per item type.
static REGISTRY: LazyLock<ArcSwap<HashMap<TypeId, PoolRef>>> =
    LazyLock::new(|| ArcSwap::from_pointee(HashMap::new()));

/// Held while registering a pool, so that each item type gets exactly one.
static REGISTERING: Mutex<()> = Mutex::new(());

pub(crate) fn pool_for<T>() -> &'static MessagePool<T>
where
    T: Default + Send + 'static,
{
    let key = TypeId::of::<T>();

    let existing = REGISTRY.load().get(&key).copied();
    let pool = existing.unwrap_or_else(register::<T>);

    pool.downcast_ref::<MessagePool<T>>()
        .expect("registry entries are always stored under the TypeId of their item type")
}

#[cold]
fn register<T>() -> PoolRef
where
    T: Default + Send + 'static,
{
    let key = TypeId::of::<T>();
    let _registering = REGISTERING.lock();

    // Another thread may have registered the type while we were waiting.
    let current = REGISTRY.load_full();

    if let Some(pool) = current.get(&key) {
        return *pool;
    }

    debug!(item_type = type_name::<T>(), "creating global message pool");

    let pool: PoolRef = Box::leak(Box::new(MessagePool::<T>::new()));

    let mut updated = (*current).clone();
    updated.insert(key, pool);
    REGISTRY.store(Arc::new(updated));

    pool
}

/// A type whose instances are recycled through a process-wide [`MessagePool`].
///
/// All methods have default implementations, so an empty `impl` block is enough. The default
/// [`pool()`][Self::pool] looks the pool up in a shared registry on every call; implement the
/// trait via the [`poolable!`][crate::poolable] macro instead to cache the lookup per type.
///
/// # Example
///
/// ```
/// use message_pool::Poolable;
///
/// #[derive(Default)]
/// struct Quote {
///     bid: u64,
///     ask: u64,
/// }
///
/// impl Poolable for Quote {}
///
/// let mut quote = Quote::acquire();
/// quote.bid = 100;
/// quote.ask = 101;
/// quote.release();
///
/// assert_eq!(Quote::acquire().ask, 101);
/// ```
pub trait Poolable: Default + Send + 'static {
    /// The process-wide pool for this type.
    #[must_use]
    fn pool() -> &'static MessagePool<Self> {
        MessagePool::global()
    }

    /// Takes an instance from the process-wide pool.
    #[must_use]
    fn acquire() -> Box<Self> {
        Self::pool().acquire()
    }

    /// Returns this instance to the process-wide pool.
    fn release(self: Box<Self>) {
        Self::pool().release(self);
    }
}

/// Implements [`Poolable`][crate::Poolable] for one or more types, caching the pool reference
/// of each type in a static.
///
/// # Example
///
/// ```
/// use message_pool::{Poolable, poolable};
///
/// #[derive(Default)]
/// struct Ping(u32);
///
/// #[derive(Default)]
/// struct Pong(u32);
///
/// poolable!(Ping, Pong);
///
/// let ping = Ping::acquire();
/// assert_eq!(ping.0, 0);
/// ping.release();
///
/// assert!(Ping::pool().has_fast_item());
/// assert!(!Pong::pool().has_fast_item());
/// ```
#[macro_export]
macro_rules! poolable {
    ($($item:ty),+ $(,)?) => {
        $(
            impl $crate::Poolable for $item {
                fn pool() -> &'static $crate::MessagePool<Self> {
                    static POOL: ::std::sync::LazyLock<&'static $crate::MessagePool<$item>> =
                        ::std::sync::LazyLock::new($crate::MessagePool::<$item>::global);

                    *POOL
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::ptr;
    use std::thread;

    use testing::{run_on_threads, with_watchdog};

    use super::*;

    #[derive(Default)]
    struct Registered;

    #[derive(Default)]
    struct Other;

    #[derive(Default)]
    struct ViaTrait(u8);

    impl Poolable for ViaTrait {}

    #[derive(Default)]
    struct ViaMacro(u8);

    crate::poolable!(ViaMacro);

    #[test]
    fn same_type_same_pool() {
        let first = pool_for::<Registered>();
        let second = pool_for::<Registered>();

        assert!(ptr::eq(first, second));
    }

    #[test]
    fn different_types_different_pools() {
        let registered = pool_for::<Registered>();
        let other = pool_for::<Other>();

        assert!(!ptr::addr_eq(registered, other));
    }

    #[test]
    fn concurrent_first_use_agrees() {
        #[derive(Default)]
        struct Contended;

        let addresses = thread::scope(|s| {
            let handles = (0..8)
                .map(|_| s.spawn(|| ptr::from_ref(pool_for::<Contended>()).addr()))
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[derive(Default)]
    struct Tagged<const N: usize>;

    fn pool_addresses() -> [usize; 6] {
        [
            ptr::from_ref(pool_for::<Tagged<0>>()).addr(),
            ptr::from_ref(pool_for::<Tagged<1>>()).addr(),
            ptr::from_ref(pool_for::<Tagged<2>>()).addr(),
            ptr::from_ref(pool_for::<Tagged<3>>()).addr(),
            ptr::from_ref(pool_for::<Tagged<4>>()).addr(),
            ptr::from_ref(pool_for::<Tagged<5>>()).addr(),
        ]
    }

    #[test]
    fn concurrent_registration_of_many_types_agrees() {
        let per_thread = run_on_threads(8, |_| pool_addresses());

        assert!(per_thread.windows(2).all(|pair| pair[0] == pair[1]));

        let distinct = per_thread[0].iter().collect::<HashSet<_>>();
        assert_eq!(distinct.len(), per_thread[0].len());

        // Registering more types later keeps the earlier pools in place.
        pool_for::<Tagged<6>>();
        assert_eq!(pool_addresses(), per_thread[0]);
    }

    #[test]
    fn lookups_do_not_wait_for_registration() {
        #[derive(Default)]
        struct Looked;

        let expected = ptr::from_ref(pool_for::<Looked>()).addr();

        with_watchdog(move || {
            // Block registration of new types; known types must still be found.
            let _registering = REGISTERING.lock();

            let found = thread::scope(|s| {
                s.spawn(|| ptr::from_ref(pool_for::<Looked>()).addr())
                    .join()
                    .unwrap()
            });

            assert_eq!(found, expected);
        });
    }

    #[test]
    fn trait_uses_global_pool() {
        let item = Box::new(ViaTrait(5));
        item.release();

        assert!(ptr::eq(ViaTrait::pool(), MessagePool::<ViaTrait>::global()));
        assert_eq!(ViaTrait::acquire().0, 5);
    }

    #[test]
    fn macro_caches_global_pool() {
        assert!(ptr::eq(ViaMacro::pool(), MessagePool::<ViaMacro>::global()));

        let mut item = ViaMacro::acquire();
        item.0 = 3;
        item.release();

        assert_eq!(ViaMacro::acquire().0, 3);
    }
}
