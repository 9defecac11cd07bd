/// Subscriber registry shared by both board stores.
///
/// Listeners are keyed by a monotonically increasing id so a `Subscription`
/// removes exactly the registration it was created for, even when the same
/// closure is registered twice.
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::types::{Board, Column};

/// Callback invoked with every board delivered by a store.
pub type Listener<C> = Arc<dyn Fn(&Board<C>) + Send + Sync>;

pub struct ListenerSet<C: Column> {
    listeners: Mutex<HashMap<u64, Listener<C>>>,
    next_id: AtomicU64,
}

impl<C: Column> ListenerSet<C> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add(&self, listener: Listener<C>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        id
    }

    pub fn remove(&self, id: u64) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every registered listener with `board`.
    /// The registry lock is released before callbacks run, so a listener may
    /// subscribe or unsubscribe from inside its callback.
    pub fn notify(&self, board: &Board<C>) {
        let current: Vec<Listener<C>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for listener in current {
            listener(board);
        }
    }

    pub fn clear(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<C: Column> Default for ListenerSet<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `BoardStore::subscribe`.
pub struct Subscription<C: Column> {
    id: u64,
    set: Weak<ListenerSet<C>>,
}

impl<C: Column> Subscription<C> {
    pub(crate) fn new(id: u64, set: &Arc<ListenerSet<C>>) -> Self {
        Self {
            id,
            set: Arc::downgrade(set),
        }
    }

    /// Stop receiving updates. Returns false if the store is already gone
    /// or the listener was removed before.
    pub fn unsubscribe(self) -> bool {
        match self.set.upgrade() {
            Some(set) => set.remove(self.id),
            None => false,
        }
    }
}

impl<C: Column> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetroColumn;
    use std::sync::atomic::AtomicUsize;

    fn counting(counter: &Arc<AtomicUsize>) -> Listener<RetroColumn> {
        let counter = counter.clone();
        Arc::new(move |_board: &Board<RetroColumn>| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_notify_reaches_every_listener() {
        let set = Arc::new(ListenerSet::<RetroColumn>::new());
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        set.add(counting(&a));
        set.add(counting(&b));

        set.notify(&Board::for_today());

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_closure_registered_twice_is_removed_once() {
        let set = Arc::new(ListenerSet::<RetroColumn>::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let listener = counting(&hits);
        let first = Subscription::new(set.add(listener.clone()), &set);
        let _second = Subscription::new(set.add(listener), &set);

        assert!(first.unsubscribe());
        set.notify(&Board::for_today());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_unsubscribe_after_set_dropped() {
        let set = Arc::new(ListenerSet::<RetroColumn>::new());
        let sub = Subscription::new(set.add(Arc::new(|_: &Board<RetroColumn>| {})), &set);
        drop(set);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_listener_can_subscribe_during_notify() {
        let set = Arc::new(ListenerSet::<RetroColumn>::new());
        let inner = set.clone();
        set.add(Arc::new(move |_: &Board<RetroColumn>| {
            inner.add(Arc::new(|_: &Board<RetroColumn>| {}));
        }));

        set.notify(&Board::for_today());
        assert_eq!(set.len(), 2);
    }
}
