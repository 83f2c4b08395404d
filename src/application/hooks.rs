//! Caller-supplied predicates and callbacks.
//!
//! Lists are copy-on-write: a decision takes a cheap `Arc` snapshot and runs
//! every hook without holding any lock, so hooks may call back into the
//! limiter.

use parking_lot::RwLock;
use std::sync::Arc;

/// Predicate over an event. Must be free of side effects.
pub type Filter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Callback run when an identity becomes limited.
pub type Trigger<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Ordered list of hooks.
pub(crate) struct HookList<H> {
    items: RwLock<Arc<Vec<H>>>,
}

impl<H: Clone> HookList<H> {
    pub(crate) fn new() -> Self {
        Self {
            items: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Current hooks in registration order.
    pub(crate) fn snapshot(&self) -> Arc<Vec<H>> {
        Arc::clone(&self.items.read())
    }

    pub(crate) fn push(&self, hook: H) {
        self.extend(std::iter::once(hook));
    }

    pub(crate) fn extend(&self, hooks: impl IntoIterator<Item = H>) {
        let mut items = self.items.write();
        Arc::make_mut(&mut *items).extend(hooks);
    }

    pub(crate) fn replace(&self, hooks: Vec<H>) {
        *self.items.write() = Arc::new(hooks);
    }

    pub(crate) fn clear(&self) {
        self.replace(Vec::new());
    }

    pub(crate) fn len(&self) -> usize {
        self.items.read().len()
    }
}

impl<H> std::fmt::Debug for HookList<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookList")
            .field("len", &self.items.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_preserved() {
        let list: HookList<u32> = HookList::new();
        list.push(1);
        list.extend([2, 3]);
        assert_eq!(*list.snapshot(), vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_snapshot_unaffected_by_later_changes() {
        let list: HookList<u32> = HookList::new();
        list.push(1);
        let before = list.snapshot();

        list.push(2);
        list.replace(vec![9]);

        assert_eq!(*before, vec![1]);
        assert_eq!(*list.snapshot(), vec![9]);
    }

    #[test]
    fn test_clear() {
        let list: HookList<Filter<u8>> = HookList::new();
        list.push(Arc::new(|v: &u8| *v > 3));
        assert_eq!(list.len(), 1);
        list.clear();
        assert_eq!(list.len(), 0);
    }
}
