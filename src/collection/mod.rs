//! The pageable collection façade and its backing strategies.

pub mod backing;
pub mod cache;
pub mod identifier;
pub mod in_memory;
pub mod paging;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::attribute::{AttributeAccessor, SharedAccessor};
use crate::config::CollectionConfig;
use crate::error::{CollectionError, Result};
use crate::item_set::CollectionItem;
use crate::modification::{ModificationLog, ModificationTracker};
use crate::observe::{topics, ChangeEmitter, ListenerId};
use crate::query::QuerySpecification;
use crate::selection::Selection;
use crate::selection_handler::{SelectionDomain, SelectionHandler, SelectionHandling};

use backing::CollectionBacking;
use identifier::{IdentifierBacking, IdentifierService};
use in_memory::InMemoryBacking;
use paging::{clamp_page_index, page_count, PageRange};

/// Current page index (1-based) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    pub index: u64,
    pub size: usize,
}

/// Payload of `page-changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageChange {
    pub old: PagePosition,
    pub new: PagePosition,
}

struct PageState {
    position: PagePosition,
    /// Query revision the page index was last checked against; `None` after
    /// the item source itself changed.
    validated: Option<u64>,
}

struct BackingDomain<T>(Arc<dyn CollectionBacking<T>>);

impl<T> SelectionDomain<T> for BackingDomain<T> {
    fn all_items(&self) -> Result<Selection<T>> {
        self.0.select_all()
    }
}

/// Filtered, sorted, paged view over an item source, with selection and
/// modification bookkeeping.
///
/// Reads after a query change always observe the new query. If the change
/// leaves the current page index past the last page, the index moves to the
/// last page and `page-changed` is published. Explicit navigation is never
/// clamped: reading a page past the end yields no items.
pub struct PageableCollection<T> {
    backing: Arc<dyn CollectionBacking<T>>,
    query: Arc<QuerySpecification>,
    state: Mutex<PageState>,
    resolve_batch: usize,
    selection: Arc<SelectionHandler<T>>,
    modifications: ModificationTracker<T>,
    emitter: ChangeEmitter<PageChange>,
}

impl<T: CollectionItem> PageableCollection<T> {
    /// In-memory collection with default settings.
    pub fn in_memory<A>(items: Vec<T>, accessor: A) -> Self
    where
        A: AttributeAccessor<T> + 'static,
    {
        let query = Arc::new(QuerySpecification::new());
        let backing = InMemoryBacking::new(items, Arc::new(accessor), Arc::clone(&query));
        Self::assemble(Arc::new(backing), query, &CollectionConfig::default())
    }

    pub fn in_memory_with_config(
        items: Vec<T>,
        accessor: SharedAccessor<T>,
        config: &CollectionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let query = Arc::new(QuerySpecification::new());
        let backing = InMemoryBacking::new(items, accessor, Arc::clone(&query));
        Ok(Self::assemble(Arc::new(backing), query, config))
    }

    /// Identifier-backed collection with default settings.
    pub fn identifier_backed<S>(service: Arc<S>) -> Self
    where
        S: IdentifierService<T>,
    {
        let query = Arc::new(QuerySpecification::new());
        let backing = IdentifierBacking::new(service, Arc::clone(&query));
        Self::assemble(Arc::new(backing), query, &CollectionConfig::default())
    }

    pub fn identifier_backed_with_config<S>(
        service: Arc<S>,
        config: &CollectionConfig,
    ) -> Result<Self>
    where
        S: IdentifierService<T>,
    {
        config.validate()?;
        let query = Arc::new(QuerySpecification::new());
        let backing = IdentifierBacking::new(service, Arc::clone(&query));
        Ok(Self::assemble(Arc::new(backing), query, config))
    }

    /// Collection over a custom strategy. `backing` must read `query`.
    pub fn from_backing(
        backing: Arc<dyn CollectionBacking<T>>,
        query: Arc<QuerySpecification>,
        config: &CollectionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(backing, query, config))
    }

    fn assemble(
        backing: Arc<dyn CollectionBacking<T>>,
        query: Arc<QuerySpecification>,
        config: &CollectionConfig,
    ) -> Self {
        let domain = Arc::new(BackingDomain(Arc::clone(&backing)));
        let selection = Arc::new(SelectionHandler::with_domain(config.selection_mode, domain));
        let validated = Some(query.revision());
        PageableCollection {
            backing,
            query,
            state: Mutex::new(PageState {
                position: PagePosition {
                    index: 1,
                    size: config.page_size,
                },
                validated,
            }),
            resolve_batch: config.resolve_batch_size,
            selection,
            modifications: ModificationTracker::new(),
            emitter: ChangeEmitter::new(),
        }
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, PageState>> {
        self.state
            .lock()
            .map_err(|_| CollectionError::LockPoisoned("page state"))
    }

    pub fn query(&self) -> &Arc<QuerySpecification> {
        &self.query
    }

    pub fn backing(&self) -> &Arc<dyn CollectionBacking<T>> {
        &self.backing
    }

    /// Page position after re-checking it against the current query.
    pub fn position(&self) -> Result<PagePosition> {
        let revision = self.query.revision();
        {
            let state = self.lock_state()?;
            if state.validated == Some(revision) {
                return Ok(state.position);
            }
        }

        let total = self.backing.total_count()?;
        let change = {
            let mut state = self.lock_state()?;
            let old = state.position;
            state.position.index = clamp_page_index(old.index, total, old.size);
            state.validated = Some(revision);
            PageChange {
                old,
                new: state.position,
            }
        };
        if change.old != change.new {
            debug!(
                from = change.old.index,
                to = change.new.index,
                total,
                "page index moved after the view changed"
            );
            self.emitter.emit(topics::PAGE_CHANGED, &change);
        }
        Ok(change.new)
    }

    pub fn current_page_index(&self) -> Result<u64> {
        Ok(self.position()?.index)
    }

    pub fn page_size(&self) -> Result<usize> {
        Ok(self.lock_state()?.position.size)
    }

    pub fn page_count(&self) -> Result<u64> {
        let position = self.position()?;
        Ok(page_count(self.total_item_count()?, position.size))
    }

    /// Items on the current page. Empty when the index is past the last page.
    pub fn items_on_page(&self) -> Result<Vec<T>> {
        let position = self.position()?;
        let total = self.backing.total_count()?;
        let range = PageRange::compute(position.index, position.size, total)?;
        trace!(index = position.index, first = range.first, last = range.last, "reading page");
        self.backing.page(range)
    }

    /// Navigate to `index` (1-based). Indices past the last page are kept and
    /// read as empty pages.
    pub fn set_current_page_index(&self, index: i64) -> Result<()> {
        if index < 1 {
            return Err(CollectionError::InvalidPageIndex(index));
        }
        let revision = self.query.revision();
        self.update_position(|state| {
            state.position.index = index as u64;
            state.validated = Some(revision);
        })
    }

    /// Change the page size. The page index is kept.
    pub fn set_page_size(&self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(CollectionError::InvalidPageSize(size));
        }
        self.update_position(|state| state.position.size = size)
    }

    fn update_position(&self, apply: impl FnOnce(&mut PageState)) -> Result<()> {
        let change = {
            let mut state = self.lock_state()?;
            let old = state.position;
            apply(&mut state);
            PageChange {
                old,
                new: state.position,
            }
        };
        if change.old != change.new {
            self.emitter.emit(topics::PAGE_CHANGED, &change);
        }
        Ok(())
    }

    /// Items matching the current filter.
    pub fn total_item_count(&self) -> Result<u64> {
        self.backing.total_count()
    }

    /// Items before filtering. Cached by the identifier-backed strategy.
    pub fn unfiltered_item_count(&self) -> Result<u64> {
        self.backing.unfiltered_count()
    }

    /// Every matching item in sort order.
    pub fn iter(&self) -> Result<Box<dyn Iterator<Item = Result<T>> + Send + '_>> {
        self.backing.items(self.resolve_batch)
    }

    pub fn selection_handler(&self) -> &Arc<SelectionHandler<T>> {
        &self.selection
    }

    /// Snapshot of the current modification log.
    pub fn modification_log(&self) -> Arc<ModificationLog<T>> {
        self.modifications.log()
    }

    pub fn modifications(&self) -> &ModificationTracker<T> {
        &self.modifications
    }

    pub fn on_page_changed<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PageChange) + Send + Sync + 'static,
    {
        self.emitter.on(topics::PAGE_CHANGED, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    /// Forget every cached list, page and count.
    pub fn clear_caches(&self) -> Result<()> {
        self.backing.clear_caches();
        self.invalidate_position()
    }

    fn invalidate_position(&self) -> Result<()> {
        self.lock_state()?.validated = None;
        Ok(())
    }

    /// Append an item to the source and record it as added. Returns whether
    /// the modification log accepted the entry.
    pub fn add_item(&self, item: T) -> Result<bool> {
        self.backing.add_item(item.clone())?;
        self.invalidate_position()?;
        Ok(self.modifications.register_added_item(item))
    }

    /// Remove the selected items from the source, record them as removed and
    /// clear the selection.
    ///
    /// Returns how many items left the source and whether both the log entry
    /// and the selection reset were accepted. On `false` the source has still
    /// changed; a listener rejected the bookkeeping.
    pub fn remove_selected(&self) -> Result<(usize, bool)> {
        let selected = self.selection.selection();
        if selected.is_empty() {
            return Ok((0, true));
        }
        let removed = self.backing.remove_items(&selected)?;
        self.invalidate_position()?;
        let all_removed = self.modifications.log().removed_items().union(&selected);
        let logged = self.modifications.set_removed_items(all_removed);
        if !logged {
            debug!("removal not recorded in the modification log");
        }
        let cleared = self.selection.select_all(false)?;
        if !cleared {
            debug!("selection kept after removal");
        }
        Ok((removed, logged && cleared))
    }

    /// Replace the whole item source. Modifications and selection are reset.
    ///
    /// Returns whether both resets were accepted.
    pub fn replace_items(&self, items: Vec<T>) -> Result<bool> {
        self.backing.replace_items(items)?;
        self.invalidate_position()?;
        let cleared_log = self.modifications.clear();
        if !cleared_log {
            debug!("modification log kept after replacing items");
        }
        let cleared_selection = self.selection.select_all(false)?;
        Ok(cleared_log && cleared_selection)
    }
}
