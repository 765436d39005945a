use crate::{CapacityGovernor, LockFreeStack, LockedStack, NodeRecycling, SlowPath};

/// The slow path of a pool: a LIFO stack of items bounded by a capacity governor.
///
/// Every item on the stack is backed by exactly one reserved unit of capacity. A unit is
/// reserved before the item is pushed and released after the item is popped, so the occupancy
/// never drops below the number of items actually on the stack.
#[derive(Debug)]
pub(crate) struct ItemStack<T> {
    governor: CapacityGovernor,
    storage: Storage<T>,
}

#[derive(Debug)]
enum Storage<T> {
    LockFree(LockFreeStack<T>),
    Locked(LockedStack<T>),
}

impl<T> ItemStack<T>
where
    T: Send + 'static,
{
    pub(crate) fn new(
        max_size: Option<usize>,
        slow_path: SlowPath,
        node_recycling: NodeRecycling,
    ) -> Self {
        let storage = match slow_path {
            SlowPath::LockFree => Storage::LockFree(LockFreeStack::new(node_recycling)),
            SlowPath::Locked => Storage::Locked(LockedStack::new()),
        };

        Self {
            governor: CapacityGovernor::new(max_size),
            storage,
        }
    }

    /// Pushes the item if there is capacity for it, otherwise hands it back.
    pub(crate) fn try_push(&self, item: Box<T>) -> Result<(), Box<T>> {
        if !self.governor.try_reserve() {
            return Err(item);
        }

        match &self.storage {
            Storage::LockFree(stack) => stack.push(item),
            Storage::Locked(stack) => stack.push(item),
        }

        Ok(())
    }

    pub(crate) fn try_pop(&self) -> Option<Box<T>> {
        let item = match &self.storage {
            Storage::LockFree(stack) => stack.try_pop(self.governor.max_size()),
            Storage::Locked(stack) => stack.try_pop(),
        }?;

        self.governor.release();

        Some(item)
    }

    pub(crate) fn governor(&self) -> &CapacityGovernor {
        &self.governor
    }

    pub(crate) fn slow_path(&self) -> SlowPath {
        match self.storage {
            Storage::LockFree(_) => SlowPath::LockFree,
            Storage::Locked(_) => SlowPath::Locked,
        }
    }

    /// The locked slow path has no link nodes, so it always reports recycling as disabled.
    pub(crate) fn node_recycling(&self) -> NodeRecycling {
        match &self.storage {
            Storage::LockFree(stack) => stack.node_recycling(),
            Storage::Locked(_) => NodeRecycling::Disabled,
        }
    }

    pub(crate) fn spare_nodes(&self) -> usize {
        match &self.storage {
            Storage::LockFree(stack) => stack.spare_nodes(),
            Storage::Locked(_) => 0,
        }
    }
}
