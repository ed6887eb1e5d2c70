//! Topic-keyed change notification.
//!
//! Plain listeners are told about changes that already happened. Vetoable
//! listeners are asked about a proposed change before it happens; they run in
//! registration order and the first one returning `false` rejects the change.
//! Listeners may subscribe or unsubscribe from inside a callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Topic names published by the engine.
pub mod topics {
    pub const FILTER_CHANGED: &str = "filter-changed";
    pub const SORT_CHANGED: &str = "sort-changed";
    pub const EXECUTE_CHANGED: &str = "execute-changed";
    pub const SELECTION_CHANGING: &str = "selection-changing";
    pub const SELECTION_CHANGED: &str = "selection-changed";
    pub const MODIFICATION_CHANGING: &str = "modification-changing";
    pub const ITEM_ADDED: &str = "item-added";
    pub const ITEM_UPDATED: &str = "item-updated";
    pub const ITEMS_REMOVED: &str = "items-removed";
    pub const MODIFICATIONS_CLEARED: &str = "modifications-cleared";
    pub const PAGE_CHANGED: &str = "page-changed";
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;
type Vetoer<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

pub struct ChangeEmitter<E> {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Listener<E>)>>>,
    vetoers: RwLock<HashMap<String, Vec<(ListenerId, Vetoer<E>)>>>,
    next_id: AtomicU64,
}

impl<E> Default for ChangeEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<E> ChangeEmitter<E> {
    pub fn new() -> Self {
        ChangeEmitter {
            listeners: RwLock::new(HashMap::new()),
            vetoers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribe to changes that already happened on `topic`.
    pub fn on<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id();
        write(&self.listeners)
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Subscribe to proposed changes on `topic`. Return `false` to reject.
    pub fn on_vetoable<F>(&self, topic: &str, vetoer: F) -> ListenerId
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let id = self.next_id();
        write(&self.vetoers)
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(vetoer)));
        id
    }

    /// Remove a listener of either kind. Returns whether it was registered.
    pub fn off(&self, id: ListenerId) -> bool {
        fn remove<V>(map: &mut HashMap<String, Vec<(ListenerId, V)>>, id: ListenerId) -> bool {
            let mut removed = false;
            for entries in map.values_mut() {
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != id);
                removed |= entries.len() != before;
            }
            removed
        }

        let removed = remove(&mut write(&self.listeners), id);
        removed || remove(&mut write(&self.vetoers), id)
    }

    pub fn emit(&self, topic: &str, event: &E) {
        let snapshot: Vec<Listener<E>> = read(&self.listeners)
            .get(topic)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Ask every vetoable listener of `topic`; `false` if any rejected.
    pub fn propose(&self, topic: &str, event: &E) -> bool {
        let snapshot: Vec<Vetoer<E>> = read(&self.vetoers)
            .get(topic)
            .map(|entries| entries.iter().map(|(_, v)| Arc::clone(v)).collect())
            .unwrap_or_default();
        snapshot.iter().all(|vetoer| vetoer(event))
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        let plain = read(&self.listeners).get(topic).map_or(0, Vec::len);
        let vetoable = read(&self.vetoers).get(topic).map_or(0, Vec::len);
        plain + vetoable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn emit_reaches_topic_listeners_only() {
        let emitter: ChangeEmitter<u32> = ChangeEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        emitter.on("a", move |value| sink.lock().unwrap().push(*value));
        emitter.emit("a", &1);
        emitter.emit("b", &2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn first_rejection_stops_the_vote() {
        let emitter: ChangeEmitter<u32> = ChangeEmitter::new();
        let asked = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&asked);
        emitter.on_vetoable("t", move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            true
        });
        emitter.on_vetoable("t", |value| *value < 10);
        let count = Arc::clone(&asked);
        emitter.on_vetoable("t", move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            true
        });

        assert!(emitter.propose("t", &1));
        assert_eq!(asked.load(Ordering::SeqCst), 2);

        assert!(!emitter.propose("t", &20));
        assert_eq!(asked.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn propose_without_vetoers_accepts() {
        let emitter: ChangeEmitter<()> = ChangeEmitter::new();
        assert!(emitter.propose("anything", &()));
    }

    #[test]
    fn off_unsubscribes() {
        let emitter: ChangeEmitter<()> = ChangeEmitter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&calls);
        let id = emitter.on("t", move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        let veto = emitter.on_vetoable("t", |_| false);
        assert_eq!(emitter.listener_count("t"), 2);

        assert!(emitter.off(id));
        assert!(emitter.off(veto));
        assert!(!emitter.off(id));

        emitter.emit("t", &());
        assert!(emitter.propose("t", &()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listeners_can_subscribe_while_emitting() {
        let emitter: Arc<ChangeEmitter<()>> = Arc::new(ChangeEmitter::new());
        let inner = Arc::clone(&emitter);
        emitter.on("t", move |_| {
            inner.on("other", |_| {});
        });
        emitter.emit("t", &());
        assert_eq!(emitter.listener_count("other"), 1);
    }
}
