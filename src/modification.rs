//! Added/updated/removed bookkeeping attached to a collection.
//!
//! The log records what the user changed; it never undoes or applies those
//! changes to the backing source itself.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::item_set::{CollectionItem, ItemSet};
use crate::observe::{topics, ChangeEmitter, ListenerId};
use crate::selection::Selection;

pub struct ModificationLog<T> {
    added: ItemSet<T>,
    updated: ItemSet<T>,
    removed: Selection<T>,
}

impl<T: CollectionItem> Default for ModificationLog<T> {
    fn default() -> Self {
        Self {
            added: ItemSet::new(),
            updated: ItemSet::new(),
            removed: Selection::Empty,
        }
    }
}

impl<T: CollectionItem> Clone for ModificationLog<T> {
    fn clone(&self) -> Self {
        Self {
            added: self.added.clone(),
            updated: self.updated.clone(),
            removed: self.removed.clone(),
        }
    }
}

impl<T: CollectionItem + fmt::Debug> fmt::Debug for ModificationLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModificationLog")
            .field("added", &self.added.as_slice())
            .field("updated", &self.updated.as_slice())
            .field("removed", &self.removed)
            .finish()
    }
}

impl<T: CollectionItem> ModificationLog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Added items in registration order.
    pub fn added_items(&self) -> &[T] {
        self.added.as_slice()
    }

    pub fn updated_items(&self) -> &[T] {
        self.updated.as_slice()
    }

    pub fn removed_items(&self) -> &Selection<T> {
        &self.removed
    }

    pub fn is_added(&self, item: &T) -> bool {
        self.added.contains(item)
    }

    pub fn is_updated(&self, item: &T) -> bool {
        self.updated.contains(item)
    }

    /// Returns `false` if the item was already registered.
    pub fn register_added_item(&mut self, item: T) -> bool {
        self.added.insert(item)
    }

    pub fn unregister_added_item(&mut self, item: &T) -> bool {
        self.added.remove(item)
    }

    /// Add to or drop from the updated set. Returns whether the set changed.
    pub fn register_updated_item(&mut self, item: T, updated: bool) -> bool {
        if updated {
            self.updated.insert(item)
        } else {
            self.updated.remove(&item)
        }
    }

    /// Replace the removed selection and forget added or updated entries it
    /// covers. Only the added and updated sets are scanned.
    pub fn set_removed_items(&mut self, removed: Selection<T>) {
        self.added.retain(|item| !removed.contains(item));
        self.updated.retain(|item| !removed.contains(item));
        self.removed = removed;
    }

    pub fn clear(&mut self) {
        self.added.clear();
        self.updated.clear();
        self.removed = Selection::Empty;
    }

    pub fn is_modified(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    /// Combine two logs. Added items keep their order with duplicates dropped;
    /// removed selections are unioned without being materialized.
    pub fn join(&self, other: &ModificationLog<T>) -> ModificationLog<T> {
        let mut added = self.added.clone();
        added.extend(other.added.iter().cloned());
        let mut updated = self.updated.clone();
        updated.extend(other.updated.iter().cloned());
        ModificationLog {
            added,
            updated,
            removed: self.removed.union(&other.removed),
        }
    }

    /// Element-wise conversion of all three categories.
    pub fn map<U, F, G>(&self, forward: F, backward: G) -> ModificationLog<U>
    where
        U: CollectionItem,
        F: Fn(&T) -> U + Send + Sync + 'static,
        G: Fn(&U) -> Option<T> + Send + Sync + 'static,
    {
        let forward = Arc::new(forward);
        let added = self.added.iter().map(|item| forward(item)).collect();
        let updated = self.updated.iter().map(|item| forward(item)).collect();
        let removed = self.removed.map(move |item| forward(item), backward);
        ModificationLog {
            added,
            updated,
            removed,
        }
    }
}

/// What a single tracker operation did.
#[derive(Clone)]
pub enum ModificationEvent<T> {
    Added(T),
    Unregistered(T),
    Updated { item: T, updated: bool },
    Removed(Selection<T>),
    Cleared,
}

impl<T> ModificationEvent<T> {
    /// Topic the event is published on once accepted.
    pub fn topic(&self) -> &'static str {
        match self {
            ModificationEvent::Added(_) | ModificationEvent::Unregistered(_) => topics::ITEM_ADDED,
            ModificationEvent::Updated { .. } => topics::ITEM_UPDATED,
            ModificationEvent::Removed(_) => topics::ITEMS_REMOVED,
            ModificationEvent::Cleared => topics::MODIFICATIONS_CLEARED,
        }
    }
}

/// Payload of the modification topics.
#[derive(Clone)]
pub struct ModificationChange<T> {
    pub old: Arc<ModificationLog<T>>,
    pub new: Arc<ModificationLog<T>>,
    pub event: ModificationEvent<T>,
}

/// Observable owner of the current [`ModificationLog`].
///
/// Each change builds a new log, offers it on `modification-changing`, and
/// on acceptance swaps it in and publishes the event's own topic. Snapshots
/// handed out earlier are never mutated.
pub struct ModificationTracker<T> {
    log: RwLock<Arc<ModificationLog<T>>>,
    emitter: ChangeEmitter<ModificationChange<T>>,
}

impl<T: CollectionItem> Default for ModificationTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CollectionItem> ModificationTracker<T> {
    pub fn new() -> Self {
        Self {
            log: RwLock::new(Arc::new(ModificationLog::new())),
            emitter: ChangeEmitter::new(),
        }
    }

    pub fn log(&self) -> Arc<ModificationLog<T>> {
        Arc::clone(&self.log.read().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    pub fn is_modified(&self) -> bool {
        self.log().is_modified()
    }

    pub fn register_added_item(&self, item: T) -> bool {
        let event = ModificationEvent::Added(item.clone());
        self.apply(event, |log| log.register_added_item(item))
    }

    pub fn unregister_added_item(&self, item: &T) -> bool {
        let event = ModificationEvent::Unregistered(item.clone());
        self.apply(event, |log| log.unregister_added_item(item))
    }

    pub fn register_updated_item(&self, item: T, updated: bool) -> bool {
        let event = ModificationEvent::Updated {
            item: item.clone(),
            updated,
        };
        self.apply(event, |log| log.register_updated_item(item, updated))
    }

    pub fn set_removed_items(&self, removed: Selection<T>) -> bool {
        let event = ModificationEvent::Removed(removed.clone());
        self.apply(event, |log| {
            let same_removed = log.removed.has_same_item_set(&removed);
            let kept = (log.added.len(), log.updated.len());
            log.set_removed_items(removed);
            !same_removed || kept != (log.added.len(), log.updated.len())
        })
    }

    pub fn clear(&self) -> bool {
        self.apply(ModificationEvent::Cleared, |log| {
            let modified = log.is_modified();
            log.clear();
            modified
        })
    }

    /// Subscribe to proposed changes. Return `false` to reject.
    pub fn on_modification_changing<F>(&self, vetoer: F) -> ListenerId
    where
        F: Fn(&ModificationChange<T>) -> bool + Send + Sync + 'static,
    {
        self.emitter.on_vetoable(topics::MODIFICATION_CHANGING, vetoer)
    }

    /// Subscribe to `item-added`, `item-updated`, `items-removed` or
    /// `modifications-cleared`.
    pub fn on_change<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&ModificationChange<T>) + Send + Sync + 'static,
    {
        self.emitter.on(topic, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    /// `mutate` returns whether it changed the log. Unchanged logs are not
    /// proposed and count as accepted.
    fn apply(
        &self,
        event: ModificationEvent<T>,
        mutate: impl FnOnce(&mut ModificationLog<T>) -> bool,
    ) -> bool {
        let old = self.log();
        let mut next = ModificationLog::clone(&old);
        if !mutate(&mut next) {
            return true;
        }
        let change = ModificationChange {
            old,
            new: Arc::new(next),
            event,
        };
        if !self.emitter.propose(topics::MODIFICATION_CHANGING, &change) {
            debug!(topic = change.event.topic(), "modification vetoed");
            return false;
        }
        let mut current = self.log.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = Arc::clone(&change.new);
        drop(current);
        self.emitter.emit(change.event.topic(), &change);
        true
    }
}
