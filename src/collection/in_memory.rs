use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::attribute::SharedAccessor;
use crate::collection::backing::CollectionBacking;
use crate::collection::cache::LoadingCache;
use crate::collection::paging::PageRange;
use crate::error::{CollectionError, Result};
use crate::item_set::CollectionItem;
use crate::query::QuerySpecification;
use crate::selection::Selection;

/// Holds the full item sequence and materializes the filtered, sorted view
/// locally.
pub struct InMemoryBacking<T> {
    items: RwLock<Vec<T>>,
    accessor: SharedAccessor<T>,
    query: Arc<QuerySpecification>,
    epoch: AtomicU64,
    view: LoadingCache<(u64, u64), Arc<Vec<T>>>,
}

impl<T: CollectionItem> InMemoryBacking<T> {
    pub fn new(items: Vec<T>, accessor: SharedAccessor<T>, query: Arc<QuerySpecification>) -> Self {
        Self {
            items: RwLock::new(items),
            accessor,
            query,
            epoch: AtomicU64::new(0),
            view: LoadingCache::new("in-memory view"),
        }
    }

    /// The filtered, sorted items, recomputed after any query or item change.
    pub fn view(&self) -> Result<Arc<Vec<T>>> {
        if !self.query.execute() {
            return Ok(Arc::new(Vec::new()));
        }
        let key = (self.query.revision(), self.epoch.load(Ordering::Acquire));
        self.view.get_or_load(key, || self.materialize())
    }

    fn materialize(&self) -> Result<Arc<Vec<T>>> {
        let filter = self.query.effective_filter();
        let order = self.query.effective_sort_order();
        let mut view: Vec<T> = {
            let items = self
                .items
                .read()
                .map_err(|_| CollectionError::LockPoisoned("in-memory items"))?;
            match &filter {
                Some(filter) => items
                    .iter()
                    .filter(|item| filter.matches(*item, self.accessor.as_ref()))
                    .cloned()
                    .collect(),
                None => items.clone(),
            }
        };
        order.sort(&mut view, self.accessor.as_ref());
        debug!(matched = view.len(), sort = %order, "materialized in-memory view");
        Ok(Arc::new(view))
    }

    fn mutate<R>(&self, change: impl FnOnce(&mut Vec<T>) -> R) -> Result<R> {
        let mut items = self
            .items
            .write()
            .map_err(|_| CollectionError::LockPoisoned("in-memory items"))?;
        let result = change(&mut items);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        Ok(result)
    }
}

impl<T: CollectionItem> CollectionBacking<T> for InMemoryBacking<T> {
    fn total_count(&self) -> Result<u64> {
        Ok(self.view()?.len() as u64)
    }

    fn unfiltered_count(&self) -> Result<u64> {
        if !self.query.execute() {
            return Ok(0);
        }
        let items = self
            .items
            .read()
            .map_err(|_| CollectionError::LockPoisoned("in-memory items"))?;
        Ok(items.len() as u64)
    }

    fn page(&self, range: PageRange) -> Result<Vec<T>> {
        let view = self.view()?;
        let offsets = range.offsets();
        let end = offsets.end.min(view.len());
        let start = offsets.start.min(end);
        Ok(view[start..end].to_vec())
    }

    fn items(&self, _batch: usize) -> Result<Box<dyn Iterator<Item = Result<T>> + Send + '_>> {
        let view = self.view()?;
        Ok(Box::new((0..view.len()).map(move |i| Ok(view[i].clone()))))
    }

    fn select_all(&self) -> Result<Selection<T>> {
        Ok(Selection::of(self.view()?.iter().cloned()))
    }

    fn clear_caches(&self) {
        self.view.clear();
    }

    fn add_item(&self, item: T) -> Result<()> {
        self.mutate(|items| items.push(item))
    }

    fn remove_items(&self, selection: &Selection<T>) -> Result<usize> {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|item| !selection.contains(item));
            before - items.len()
        })
    }

    fn replace_items(&self, items: Vec<T>) -> Result<()> {
        self.mutate(|current| *current = items)
    }
}
