//! Immutable selection snapshots.
//!
//! A [`Selection`] describes which items are chosen without necessarily
//! holding them. Identifier-backed selections keep only ids and hydrate items
//! lazily, a batch at a time, when iterated; `len` and `contains` never hydrate.

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use tracing::warn;

use crate::error::Result;
use crate::item_set::{CollectionItem, ItemSet};

/// Items fetched per resolver call while iterating identifier selections.
pub const DEFAULT_RESOLVE_BATCH: usize = 100;

/// Lazy iterator over a selection's items. Resolution failures are yielded
/// once, after which the iterator ends.
pub type SelectionIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Maps between items and the identifiers of an external source.
pub trait IdResolver<T>: Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    fn id_for_item(&self, item: &T) -> Self::Id;

    fn item_for_id(&self, id: &Self::Id) -> Result<T>;

    /// Hydrate `ids`, in the same order.
    fn items_for_ids(&self, ids: &[Self::Id]) -> Result<Vec<T>> {
        ids.iter().map(|id| self.item_for_id(id)).collect()
    }
}

/// Type-erased set of identifiers plus the resolver that hydrates them.
pub trait IdentifierSet<T>: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, item: &T) -> bool;

    /// Hydrate members `offset..offset + limit` in id order.
    fn resolve(&self, offset: usize, limit: usize) -> Result<Vec<T>>;

    fn with_item(&self, item: &T) -> Arc<dyn IdentifierSet<T>>;

    fn without_items(&self, items: &[T]) -> Arc<dyn IdentifierSet<T>>;

    /// `self - other` on ids, when both come from the same kind of source.
    fn difference(&self, other: &dyn IdentifierSet<T>) -> Option<Arc<dyn IdentifierSet<T>>>;

    /// Id-level equality, when both come from the same kind of source.
    fn same_ids(&self, other: &dyn IdentifierSet<T>) -> Option<bool>;

    /// Members not already present in `earlier`, counted on ids.
    fn count_not_in(&self, earlier: &[Selection<T>]) -> usize;

    fn as_any(&self) -> &dyn Any;
}

/// Read-only view used for selections derived from another item type.
pub trait SelectionView<T>: Send + Sync {
    fn len(&self) -> usize;

    fn contains(&self, item: &T) -> bool;

    fn iter_batched(&self, batch: usize) -> SelectionIter<'_, T>;

    fn count_not_in(&self, _earlier: &[Selection<T>]) -> usize {
        self.len()
    }

    fn as_any(&self) -> &dyn Any;
}

pub enum Selection<T> {
    Empty,
    /// Items the caller enumerated.
    Explicit(Arc<ItemSet<T>>),
    /// Ids of a possibly huge result set; items are never materialized up front.
    Identifiers(Arc<dyn IdentifierSet<T>>),
    /// Selection-of-selections; members present in several parts count once.
    Union(Arc<[Selection<T>]>),
    /// A selection over another item type seen through a mapping.
    Mapped(Arc<dyn SelectionView<T>>),
}

impl<T> Clone for Selection<T> {
    fn clone(&self) -> Self {
        match self {
            Selection::Empty => Selection::Empty,
            Selection::Explicit(set) => Selection::Explicit(Arc::clone(set)),
            Selection::Identifiers(ids) => Selection::Identifiers(Arc::clone(ids)),
            Selection::Union(parts) => Selection::Union(Arc::clone(parts)),
            Selection::Mapped(view) => Selection::Mapped(Arc::clone(view)),
        }
    }
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::Empty
    }
}

impl<T: CollectionItem> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Selection::Empty => "Empty",
            Selection::Explicit(_) => "Explicit",
            Selection::Identifiers(_) => "Identifiers",
            Selection::Union(_) => "Union",
            Selection::Mapped(_) => "Mapped",
        };
        f.debug_struct("Selection")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

impl<T: CollectionItem> Selection<T> {
    pub fn empty() -> Self {
        Selection::Empty
    }

    /// Selection of enumerated items; duplicates collapse.
    pub fn of(items: impl IntoIterator<Item = T>) -> Self {
        let set: ItemSet<T> = items.into_iter().collect();
        if set.is_empty() {
            Selection::Empty
        } else {
            Selection::Explicit(Arc::new(set))
        }
    }

    pub fn identifiers(set: Arc<dyn IdentifierSet<T>>) -> Self {
        if set.is_empty() {
            Selection::Empty
        } else {
            Selection::Identifiers(set)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::Empty => 0,
            Selection::Explicit(set) => set.len(),
            Selection::Identifiers(ids) => ids.len(),
            Selection::Mapped(view) => view.len(),
            Selection::Union(parts) => parts
                .iter()
                .enumerate()
                .map(|(i, part)| part.count_not_in(&parts[..i]))
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count_not_in(&self, earlier: &[Selection<T>]) -> usize {
        match self {
            Selection::Empty => 0,
            Selection::Explicit(set) => set
                .iter()
                .filter(|item| !earlier.iter().any(|part| part.contains(item)))
                .count(),
            Selection::Identifiers(ids) => ids.count_not_in(earlier),
            Selection::Mapped(view) => view.count_not_in(earlier),
            Selection::Union(parts) => {
                let mut seen = earlier.to_vec();
                let mut count = 0;
                for part in parts.iter() {
                    count += part.count_not_in(&seen);
                    seen.push(part.clone());
                }
                count
            }
        }
    }

    pub fn contains(&self, item: &T) -> bool {
        match self {
            Selection::Empty => false,
            Selection::Explicit(set) => set.contains(item),
            Selection::Identifiers(ids) => ids.contains(item),
            Selection::Mapped(view) => view.contains(item),
            Selection::Union(parts) => parts.iter().any(|part| part.contains(item)),
        }
    }

    pub fn iter(&self) -> SelectionIter<'_, T> {
        self.iter_batched(DEFAULT_RESOLVE_BATCH)
    }

    /// Iterate, hydrating identifier members `batch` at a time.
    pub fn iter_batched(&self, batch: usize) -> SelectionIter<'_, T> {
        let batch = batch.max(1);
        match self {
            Selection::Empty => Box::new(std::iter::empty()),
            Selection::Explicit(set) => Box::new(set.iter().cloned().map(Ok)),
            Selection::Identifiers(ids) => Box::new(ResolvingIter::new(ids.as_ref(), batch)),
            Selection::Mapped(view) => view.iter_batched(batch),
            Selection::Union(parts) => Box::new(parts.iter().enumerate().flat_map(
                move |(i, part)| {
                    let earlier = &parts[..i];
                    part.iter_batched(batch).filter(move |item| match item {
                        Ok(item) => !earlier.iter().any(|p| p.contains(item)),
                        Err(_) => true,
                    })
                },
            )),
        }
    }

    /// Materialize every member.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }

    /// Same members, regardless of representation.
    pub fn has_same_item_set(&self, other: &Selection<T>) -> bool {
        if self.len() != other.len() {
            return false;
        }
        match (self, other) {
            (Selection::Empty, _) | (_, Selection::Empty) => true,
            (Selection::Identifiers(a), Selection::Identifiers(b)) => {
                match a.same_ids(b.as_ref()) {
                    Some(same) => same,
                    None => self.all_contained_in(other),
                }
            }
            (Selection::Explicit(set), _) => set.iter().all(|item| other.contains(item)),
            (_, Selection::Explicit(set)) => set.iter().all(|item| self.contains(item)),
            _ => self.all_contained_in(other),
        }
    }

    fn all_contained_in(&self, other: &Selection<T>) -> bool {
        for item in self.iter() {
            match item {
                Ok(item) if other.contains(&item) => {}
                Ok(_) => return false,
                Err(err) => {
                    warn!(error = %err, "could not resolve selection while comparing");
                    return false;
                }
            }
        }
        true
    }

    /// `self ∪ other` as a selection-of-selections. Nothing is hydrated.
    pub fn union(&self, other: &Selection<T>) -> Selection<T> {
        let mut parts = Vec::new();
        self.flatten_into(&mut parts);
        other.flatten_into(&mut parts);
        match parts.len() {
            0 => Selection::Empty,
            1 => parts.remove(0),
            _ => Selection::Union(parts.into()),
        }
    }

    fn flatten_into(&self, parts: &mut Vec<Selection<T>>) {
        match self {
            Selection::Empty => {}
            Selection::Union(inner) => {
                for part in inner.iter() {
                    part.flatten_into(parts);
                }
            }
            other => parts.push(other.clone()),
        }
    }

    /// Members of `self` not in `other`.
    ///
    /// Identifier selections are subtracted on ids; only selections that have
    /// no id-level shortcut are hydrated.
    pub fn difference(&self, other: &Selection<T>) -> Result<Selection<T>> {
        match (self, other) {
            (Selection::Empty, _) => Ok(Selection::Empty),
            (_, Selection::Empty) => Ok(self.clone()),
            (Selection::Explicit(set), _) => Ok(Selection::of(
                set.iter().filter(|item| !other.contains(item)).cloned(),
            )),
            (Selection::Identifiers(ids), Selection::Explicit(items)) => {
                Ok(Selection::identifiers(ids.without_items(items.as_slice())))
            }
            (Selection::Identifiers(ids), Selection::Identifiers(rhs)) => {
                match ids.difference(rhs.as_ref()) {
                    Some(diff) => Ok(Selection::identifiers(diff)),
                    None => self.materialized_difference(other),
                }
            }
            _ => self.materialized_difference(other),
        }
    }

    fn materialized_difference(&self, other: &Selection<T>) -> Result<Selection<T>> {
        let mut kept = ItemSet::new();
        for item in self.iter() {
            let item = item?;
            if !other.contains(&item) {
                kept.insert(item);
            }
        }
        Ok(Selection::of(kept))
    }

    /// This selection plus `item`.
    pub fn with_item(&self, item: &T) -> Selection<T> {
        match self {
            Selection::Empty => Selection::of([item.clone()]),
            Selection::Explicit(set) => {
                if set.contains(item) {
                    return self.clone();
                }
                let mut set = ItemSet::clone(set);
                set.insert(item.clone());
                Selection::Explicit(Arc::new(set))
            }
            Selection::Identifiers(ids) => Selection::identifiers(ids.with_item(item)),
            _ if self.contains(item) => self.clone(),
            _ => self.union(&Selection::of([item.clone()])),
        }
    }

    /// This selection minus `items`.
    pub fn without_items(&self, items: &[T]) -> Result<Selection<T>> {
        match self {
            Selection::Empty => Ok(Selection::Empty),
            Selection::Explicit(set) => Ok(Selection::of(
                set.iter().filter(|item| !items.contains(item)).cloned(),
            )),
            Selection::Identifiers(ids) => Ok(Selection::identifiers(ids.without_items(items))),
            _ => self.difference(&Selection::of(items.iter().cloned())),
        }
    }

    /// View this selection as a selection of `U`.
    ///
    /// `backward` answers `contains` for the mapped selection: it should
    /// return the `T` a `U` was derived from, or `None` if it has none.
    pub fn map<U, F, G>(&self, forward: F, backward: G) -> Selection<U>
    where
        U: CollectionItem,
        F: Fn(&T) -> U + Send + Sync + 'static,
        G: Fn(&U) -> Option<T> + Send + Sync + 'static,
    {
        if matches!(self, Selection::Empty) {
            return Selection::Empty;
        }
        Selection::Mapped(Arc::new(MappedSelection {
            inner: self.clone(),
            forward: Arc::new(forward),
            backward: Arc::new(backward),
        }))
    }
}

struct ResolvingIter<'a, T> {
    set: &'a dyn IdentifierSet<T>,
    offset: usize,
    batch: usize,
    buffer: VecDeque<T>,
    done: bool,
}

impl<'a, T> ResolvingIter<'a, T> {
    fn new(set: &'a dyn IdentifierSet<T>, batch: usize) -> Self {
        Self {
            set,
            offset: 0,
            batch,
            buffer: VecDeque::new(),
            done: false,
        }
    }
}

impl<T> Iterator for ResolvingIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.buffer.pop_front() {
            return Some(Ok(item));
        }
        if self.done || self.offset >= self.set.len() {
            return None;
        }
        match self.set.resolve(self.offset, self.batch) {
            Ok(items) if items.is_empty() => {
                self.done = true;
                None
            }
            Ok(items) => {
                self.offset += self.batch;
                self.buffer.extend(items);
                self.buffer.pop_front().map(Ok)
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// [`IdentifierSet`] over a shared id list and an [`IdResolver`].
pub struct IdSet<T, R: IdResolver<T>> {
    ids: Arc<Vec<R::Id>>,
    lookup: OnceLock<HashSet<R::Id>>,
    resolver: Arc<R>,
    _item: PhantomData<fn() -> T>,
}

impl<T, R: IdResolver<T>> IdSet<T, R> {
    /// `ids` must be free of duplicates; the list is shared, not copied.
    pub fn new(ids: Arc<Vec<R::Id>>, resolver: Arc<R>) -> Self {
        Self {
            ids,
            lookup: OnceLock::new(),
            resolver,
            _item: PhantomData,
        }
    }

    pub fn ids(&self) -> &[R::Id] {
        &self.ids
    }

    fn lookup(&self) -> &HashSet<R::Id> {
        self.lookup.get_or_init(|| self.ids.iter().cloned().collect())
    }

    fn derive(&self, ids: Vec<R::Id>) -> Arc<dyn IdentifierSet<T>>
    where
        T: CollectionItem,
    {
        Arc::new(IdSet::<T, R>::new(Arc::new(ids), Arc::clone(&self.resolver)))
    }

    fn shared(&self) -> Arc<dyn IdentifierSet<T>>
    where
        T: CollectionItem,
    {
        Arc::new(IdSet::<T, R>::new(Arc::clone(&self.ids), Arc::clone(&self.resolver)))
    }
}

impl<T: CollectionItem, R: IdResolver<T>> IdentifierSet<T> for IdSet<T, R> {
    fn len(&self) -> usize {
        self.ids.len()
    }

    fn contains(&self, item: &T) -> bool {
        self.lookup().contains(&self.resolver.id_for_item(item))
    }

    fn resolve(&self, offset: usize, limit: usize) -> Result<Vec<T>> {
        let start = offset.min(self.ids.len());
        let end = offset.saturating_add(limit).min(self.ids.len());
        if start == end {
            return Ok(Vec::new());
        }
        self.resolver.items_for_ids(&self.ids[start..end])
    }

    fn with_item(&self, item: &T) -> Arc<dyn IdentifierSet<T>> {
        let id = self.resolver.id_for_item(item);
        if self.lookup().contains(&id) {
            return self.shared();
        }
        let mut ids = Vec::with_capacity(self.ids.len() + 1);
        ids.extend(self.ids.iter().cloned());
        ids.push(id);
        self.derive(ids)
    }

    fn without_items(&self, items: &[T]) -> Arc<dyn IdentifierSet<T>> {
        let removed: HashSet<R::Id> = items
            .iter()
            .map(|item| self.resolver.id_for_item(item))
            .collect();
        if removed.iter().all(|id| !self.lookup().contains(id)) {
            return self.shared();
        }
        self.derive(
            self.ids
                .iter()
                .filter(|id| !removed.contains(*id))
                .cloned()
                .collect(),
        )
    }

    fn difference(&self, other: &dyn IdentifierSet<T>) -> Option<Arc<dyn IdentifierSet<T>>> {
        let other = other.as_any().downcast_ref::<Self>()?;
        let removed = other.lookup();
        Some(self.derive(
            self.ids
                .iter()
                .filter(|id| !removed.contains(*id))
                .cloned()
                .collect(),
        ))
    }

    fn same_ids(&self, other: &dyn IdentifierSet<T>) -> Option<bool> {
        let other = other.as_any().downcast_ref::<Self>()?;
        Some(self.lookup() == other.lookup())
    }

    fn count_not_in(&self, earlier: &[Selection<T>]) -> usize {
        if earlier.is_empty() {
            return self.len();
        }
        let mut enumerated: HashSet<R::Id> = HashSet::new();
        let mut id_sets: Vec<&HashSet<R::Id>> = Vec::new();
        for part in earlier {
            match part {
                Selection::Explicit(items) => {
                    enumerated.extend(items.iter().map(|item| self.resolver.id_for_item(item)));
                }
                Selection::Identifiers(set) => {
                    if let Some(same) = set.as_any().downcast_ref::<Self>() {
                        id_sets.push(same.lookup());
                    }
                }
                // Parts from unrelated sources are taken to be disjoint.
                _ => {}
            }
        }
        self.ids
            .iter()
            .filter(|id| !enumerated.contains(*id) && !id_sets.iter().any(|set| set.contains(*id)))
            .count()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Selection of `T` derived from a selection of backing records `B`.
pub struct MappedSelection<T, B> {
    inner: Selection<B>,
    forward: Arc<dyn Fn(&B) -> T + Send + Sync>,
    backward: Arc<dyn Fn(&T) -> Option<B> + Send + Sync>,
}

impl<T, B> MappedSelection<T, B> {
    pub fn inner(&self) -> &Selection<B> {
        &self.inner
    }
}

impl<T: CollectionItem, B: CollectionItem> SelectionView<T> for MappedSelection<T, B> {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn contains(&self, item: &T) -> bool {
        (self.backward)(item).is_some_and(|backing| self.inner.contains(&backing))
    }

    /// Earlier mapped parts of the same shape are compared on their backing
    /// records; explicit items are mapped back. Other parts are taken to be
    /// disjoint.
    fn count_not_in(&self, earlier: &[Selection<T>]) -> usize {
        let mut inners = Vec::new();
        let mut listed: HashSet<&T> = HashSet::new();
        for part in earlier {
            match part {
                Selection::Mapped(view) => {
                    if let Some(same) = view.as_any().downcast_ref::<Self>() {
                        same.inner.flatten_into(&mut inners);
                    }
                }
                Selection::Explicit(items) => listed.extend(items.iter()),
                _ => {}
            }
        }
        let overlap = listed
            .into_iter()
            .filter_map(|item| (self.backward)(item))
            .filter(|backing| {
                self.inner.contains(backing) && !inners.iter().any(|part| part.contains(backing))
            })
            .collect::<HashSet<B>>()
            .len();
        self.inner.count_not_in(&inners).saturating_sub(overlap)
    }

    fn iter_batched(&self, batch: usize) -> SelectionIter<'_, T> {
        let forward = Arc::clone(&self.forward);
        Box::new(
            self.inner
                .iter_batched(batch)
                .map(move |backing| backing.map(|b| forward(&b))),
        )
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
