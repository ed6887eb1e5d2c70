//! Vetoable selection state.
//!
//! Every operation proposes a new [`Selection`] on the `selection-changing`
//! topic; any vetoable listener may reject it, in which case the operation
//! returns `Ok(false)` and nothing changes. Accepted changes are then
//! announced on `selection-changed`.
//!
//! Handlers are `Send + Sync`, but the order in which concurrent mutations
//! from different threads are applied is not specified. Drive a handler from
//! the thread that owns its collection.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CollectionError, Result};
use crate::item_set::CollectionItem;
use crate::observe::{topics, ChangeEmitter, ListenerId};
use crate::selection::{MappedSelection, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// At most one item. Selecting an item replaces the previous one.
    Single,
    Multi,
    /// Nothing can be selected.
    NoSelection,
    /// Same as `Multi`.
    #[default]
    Default,
}

impl SelectionMode {
    fn permits(self, selection: &Selection<impl CollectionItem>) -> bool {
        match self {
            SelectionMode::NoSelection => selection.is_empty(),
            SelectionMode::Single => selection.len() <= 1,
            SelectionMode::Multi | SelectionMode::Default => true,
        }
    }
}

/// Payload of both selection topics.
#[derive(Clone)]
pub struct SelectionChange<T> {
    pub old: Selection<T>,
    pub new: Selection<T>,
}

impl<T: CollectionItem> fmt::Debug for SelectionChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionChange")
            .field("old", &self.old)
            .field("new", &self.new)
            .finish()
    }
}

/// Source of "every item" for `select_all` and `invert_selection`.
pub trait SelectionDomain<T>: Send + Sync {
    fn all_items(&self) -> Result<Selection<T>>;
}

/// Operations shared by plain and mapped handlers.
///
/// `Ok(false)` means the change was rejected by the selection mode or by a
/// vetoable listener. Errors only come from resolving selections.
pub trait SelectionHandling<T>: Send + Sync {
    fn mode(&self) -> SelectionMode;

    fn selection(&self) -> Selection<T>;

    fn select(&self, item: &T, on: bool) -> Result<bool>;

    fn select_items(&self, items: &[T], on: bool) -> Result<bool>;

    fn select_all(&self, on: bool) -> Result<bool>;

    fn invert_selection(&self) -> Result<bool>;

    fn set_selection(&self, selection: Selection<T>) -> Result<bool>;
}

pub struct SelectionHandler<T> {
    mode: SelectionMode,
    selection: RwLock<Selection<T>>,
    domain: Option<Arc<dyn SelectionDomain<T>>>,
    emitter: ChangeEmitter<SelectionChange<T>>,
}

impl<T: CollectionItem> fmt::Debug for SelectionHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionHandler")
            .field("mode", &self.mode)
            .field("selection", &self.selection())
            .finish()
    }
}

impl<T: CollectionItem> SelectionHandler<T> {
    /// A handler without a domain; `select_all` and `invert_selection` fail
    /// with `Unsupported`.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selection: RwLock::new(Selection::Empty),
            domain: None,
            emitter: ChangeEmitter::new(),
        }
    }

    pub fn with_domain(mode: SelectionMode, domain: Arc<dyn SelectionDomain<T>>) -> Self {
        Self {
            domain: Some(domain),
            ..Self::new(mode)
        }
    }

    pub fn on_selection_changing<F>(&self, vetoer: F) -> ListenerId
    where
        F: Fn(&SelectionChange<T>) -> bool + Send + Sync + 'static,
    {
        self.emitter.on_vetoable(topics::SELECTION_CHANGING, vetoer)
    }

    pub fn on_selection_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SelectionChange<T>) + Send + Sync + 'static,
    {
        self.emitter.on(topics::SELECTION_CHANGED, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    fn all_items(&self) -> Result<Selection<T>> {
        match &self.domain {
            Some(domain) => domain.all_items(),
            None => Err(CollectionError::unsupported("select_all without a collection")),
        }
    }

    fn apply(&self, new: Selection<T>) -> bool {
        if !self.mode.permits(&new) {
            debug!(mode = ?self.mode, size = new.len(), "selection change not allowed by mode");
            return false;
        }
        let old = self.selection();
        if old.has_same_item_set(&new) {
            return true;
        }
        let change = SelectionChange { old, new };
        if !self.emitter.propose(topics::SELECTION_CHANGING, &change) {
            debug!("selection change vetoed");
            return false;
        }
        *self
            .selection
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = change.new.clone();
        self.emitter.emit(topics::SELECTION_CHANGED, &change);
        true
    }
}

impl<T: CollectionItem> SelectionHandling<T> for SelectionHandler<T> {
    fn mode(&self) -> SelectionMode {
        self.mode
    }

    fn selection(&self) -> Selection<T> {
        self.selection
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn select(&self, item: &T, on: bool) -> Result<bool> {
        let current = self.selection();
        let next = match (on, self.mode) {
            (true, SelectionMode::Single) => Selection::of([item.clone()]),
            (true, _) => current.with_item(item),
            (false, _) => current.without_items(std::slice::from_ref(item))?,
        };
        Ok(self.apply(next))
    }

    fn select_items(&self, items: &[T], on: bool) -> Result<bool> {
        let current = self.selection();
        let next = if on {
            items.iter().fold(current, |acc, item| acc.with_item(item))
        } else {
            current.without_items(items)?
        };
        Ok(self.apply(next))
    }

    fn select_all(&self, on: bool) -> Result<bool> {
        let next = if on { self.all_items()? } else { Selection::Empty };
        Ok(self.apply(next))
    }

    fn invert_selection(&self) -> Result<bool> {
        let all = self.all_items()?;
        let next = all.difference(&self.selection())?;
        Ok(self.apply(next))
    }

    fn set_selection(&self, selection: Selection<T>) -> Result<bool> {
        Ok(self.apply(selection))
    }
}

type Forward<T, B> = Arc<dyn Fn(&B) -> T + Send + Sync>;
type Backward<T, B> = Arc<dyn Fn(&T) -> Option<B> + Send + Sync>;

/// Selection handler over wrapper items `T` that stores its state in an inner
/// handler over backing records `B`.
///
/// Mutations are translated to `B` and forwarded; reads are translated back.
/// Notifications from the inner handler are re-published here, so listeners
/// of either handler see every change exactly once.
pub struct MappedSelectionHandler<T, B> {
    inner: Arc<SelectionHandler<B>>,
    forward: Forward<T, B>,
    backward: Backward<T, B>,
    emitter: Arc<ChangeEmitter<SelectionChange<T>>>,
    relays: [ListenerId; 2],
}

impl<T: CollectionItem, B: CollectionItem> MappedSelectionHandler<T, B> {
    /// `backward` returns the record a wrapper was built from, or `None` for
    /// wrappers without one (those can never be selected).
    pub fn new<F, G>(inner: Arc<SelectionHandler<B>>, forward: F, backward: G) -> Self
    where
        F: Fn(&B) -> T + Send + Sync + 'static,
        G: Fn(&T) -> Option<B> + Send + Sync + 'static,
    {
        let forward: Forward<T, B> = Arc::new(forward);
        let backward: Backward<T, B> = Arc::new(backward);
        let emitter = Arc::new(ChangeEmitter::new());

        let relay_veto = {
            let emitter = Arc::clone(&emitter);
            let (forward, backward) = (Arc::clone(&forward), Arc::clone(&backward));
            inner.on_selection_changing(move |change| {
                let mapped = map_change(change, &forward, &backward);
                emitter.propose(topics::SELECTION_CHANGING, &mapped)
            })
        };
        let relay_change = {
            let emitter = Arc::clone(&emitter);
            let (forward, backward) = (Arc::clone(&forward), Arc::clone(&backward));
            inner.on_selection_changed(move |change| {
                let mapped = map_change(change, &forward, &backward);
                emitter.emit(topics::SELECTION_CHANGED, &mapped)
            })
        };

        Self {
            inner,
            forward,
            backward,
            emitter,
            relays: [relay_veto, relay_change],
        }
    }

    pub fn inner(&self) -> &Arc<SelectionHandler<B>> {
        &self.inner
    }

    pub fn on_selection_changing<F>(&self, vetoer: F) -> ListenerId
    where
        F: Fn(&SelectionChange<T>) -> bool + Send + Sync + 'static,
    {
        self.emitter.on_vetoable(topics::SELECTION_CHANGING, vetoer)
    }

    pub fn on_selection_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SelectionChange<T>) + Send + Sync + 'static,
    {
        self.emitter.on(topics::SELECTION_CHANGED, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    fn to_backing(&self, items: &[T]) -> Option<Vec<B>> {
        items.iter().map(|item| (self.backward)(item)).collect()
    }

    fn selection_to_backing(&self, selection: &Selection<T>) -> Result<Option<Selection<B>>> {
        match selection {
            Selection::Empty => Ok(Some(Selection::Empty)),
            Selection::Mapped(view) => {
                if let Some(mapped) = view.as_any().downcast_ref::<MappedSelection<T, B>>() {
                    return Ok(Some(mapped.inner().clone()));
                }
                Ok(self.to_backing(&selection.to_vec()?).map(Selection::of))
            }
            other => Ok(self.to_backing(&other.to_vec()?).map(Selection::of)),
        }
    }
}

fn map_change<T: CollectionItem, B: CollectionItem>(
    change: &SelectionChange<B>,
    forward: &Forward<T, B>,
    backward: &Backward<T, B>,
) -> SelectionChange<T> {
    SelectionChange {
        old: map_selection(&change.old, forward, backward),
        new: map_selection(&change.new, forward, backward),
    }
}

fn map_selection<T: CollectionItem, B: CollectionItem>(
    selection: &Selection<B>,
    forward: &Forward<T, B>,
    backward: &Backward<T, B>,
) -> Selection<T> {
    let (forward, backward) = (Arc::clone(forward), Arc::clone(backward));
    selection.map(move |b| forward(b), move |t| backward(t))
}

impl<T, B> Drop for MappedSelectionHandler<T, B> {
    fn drop(&mut self) {
        for id in self.relays {
            self.inner.emitter.off(id);
        }
    }
}

impl<T: CollectionItem, B: CollectionItem> SelectionHandling<T> for MappedSelectionHandler<T, B> {
    fn mode(&self) -> SelectionMode {
        self.inner.mode()
    }

    fn selection(&self) -> Selection<T> {
        map_selection(&self.inner.selection(), &self.forward, &self.backward)
    }

    fn select(&self, item: &T, on: bool) -> Result<bool> {
        match (self.backward)(item) {
            Some(backing) => self.inner.select(&backing, on),
            None => Ok(false),
        }
    }

    fn select_items(&self, items: &[T], on: bool) -> Result<bool> {
        match self.to_backing(items) {
            Some(backing) => self.inner.select_items(&backing, on),
            None => Ok(false),
        }
    }

    fn select_all(&self, on: bool) -> Result<bool> {
        self.inner.select_all(on)
    }

    fn invert_selection(&self) -> Result<bool> {
        self.inner.invert_selection()
    }

    fn set_selection(&self, selection: Selection<T>) -> Result<bool> {
        match self.selection_to_backing(&selection)? {
            Some(backing) => self.inner.set_selection(backing),
            None => Ok(false),
        }
    }
}
