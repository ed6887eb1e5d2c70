use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::collection::backing::CollectionBacking;
use crate::collection::cache::LoadingCache;
use crate::collection::paging::PageRange;
use crate::error::Result;
use crate::item_set::CollectionItem;
use crate::query::QuerySpecification;
use crate::selection::{IdResolver, IdSet, Selection};

/// Remote source that filters and sorts by itself and answers with ids.
///
/// Items are hydrated through [`IdResolver::items_for_ids`], which must
/// return items in the order of the ids it was given.
pub trait IdentifierService<T>: IdResolver<T> {
    /// Ids of every item matching `query`, in `query`'s sort order.
    fn find_ids(&self, query: &QuerySpecification) -> Result<Vec<Self::Id>>;

    /// Number of items before filtering.
    fn unfiltered_count(&self, query: &QuerySpecification) -> Result<u64>;
}

type CacheKey = (u64, u64);

/// Caches the id list per query revision and hydrates one page at a time.
///
/// The id list, the current page and the unfiltered count are each loaded
/// single-flight: concurrent readers of the same uncached state trigger one
/// service call and share its result. Failed calls are not cached.
pub struct IdentifierBacking<T, S: IdentifierService<T>> {
    service: Arc<S>,
    query: Arc<QuerySpecification>,
    epoch: AtomicU64,
    ids: LoadingCache<CacheKey, Arc<Vec<S::Id>>>,
    page: LoadingCache<(CacheKey, u64, u64), Arc<Vec<T>>>,
    unfiltered: LoadingCache<CacheKey, u64>,
}

impl<T: CollectionItem, S: IdentifierService<T>> IdentifierBacking<T, S> {
    pub fn new(service: Arc<S>, query: Arc<QuerySpecification>) -> Self {
        Self {
            service,
            query,
            epoch: AtomicU64::new(0),
            ids: LoadingCache::new("identifier list"),
            page: LoadingCache::new("page items"),
            unfiltered: LoadingCache::new("unfiltered count"),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    fn key(&self) -> CacheKey {
        (self.query.revision(), self.epoch.load(Ordering::Acquire))
    }

    fn ids_for(&self, key: CacheKey) -> Result<Arc<Vec<S::Id>>> {
        if !self.query.execute() {
            return Ok(Arc::new(Vec::new()));
        }
        self.ids.get_or_load(key, || {
            debug!(revision = key.0, "fetching identifiers");
            let ids = self.service.find_ids(&self.query)?;
            debug!(revision = key.0, count = ids.len(), "identifiers fetched");
            Ok(Arc::new(ids))
        })
    }

    /// The matching ids for the current query.
    pub fn ids(&self) -> Result<Arc<Vec<S::Id>>> {
        self.ids_for(self.key())
    }
}

impl<T: CollectionItem, S: IdentifierService<T>> CollectionBacking<T> for IdentifierBacking<T, S> {
    fn total_count(&self) -> Result<u64> {
        Ok(self.ids()?.len() as u64)
    }

    fn unfiltered_count(&self) -> Result<u64> {
        if !self.query.execute() {
            return Ok(0);
        }
        self.unfiltered.get_or_load(self.key(), || {
            debug!("fetching unfiltered count");
            self.service.unfiltered_count(&self.query)
        })
    }

    fn page(&self, range: PageRange) -> Result<Vec<T>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.key();
        let ids = self.ids_for(key)?;
        let offsets = range.offsets();
        let end = offsets.end.min(ids.len());
        let start = offsets.start.min(end);
        if start == end {
            return Ok(Vec::new());
        }
        let items = self.page.get_or_load((key, range.first, range.last), || {
            let wanted = &ids[start..end];
            debug!(first = range.first, last = range.last, "hydrating page");
            let items = self.service.items_for_ids(wanted)?;
            if items.len() != wanted.len() {
                warn!(
                    requested = wanted.len(),
                    returned = items.len(),
                    "identifier service returned a different number of items"
                );
            }
            Ok(Arc::new(items))
        })?;
        Ok(items.as_ref().clone())
    }

    fn items(&self, batch: usize) -> Result<Box<dyn Iterator<Item = Result<T>> + Send + '_>> {
        Ok(Box::new(Hydrating {
            ids: self.ids()?,
            service: self.service.as_ref(),
            offset: 0,
            batch: batch.max(1),
            buffer: VecDeque::new(),
            done: false,
        }))
    }

    fn select_all(&self) -> Result<Selection<T>> {
        let ids = self.ids()?;
        Ok(Selection::identifiers(Arc::new(IdSet::<T, S>::new(
            ids,
            Arc::clone(&self.service),
        ))))
    }

    fn clear_caches(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.ids.clear();
        self.page.clear();
        self.unfiltered.clear();
        debug!("identifier caches cleared");
    }
}

/// Walks a fixed id list, hydrating `batch` items per service call.
struct Hydrating<'a, T, S: IdentifierService<T>> {
    ids: Arc<Vec<S::Id>>,
    service: &'a S,
    offset: usize,
    batch: usize,
    buffer: VecDeque<T>,
    done: bool,
}

impl<T, S: IdentifierService<T>> Iterator for Hydrating<'_, T, S> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.buffer.pop_front() {
            return Some(Ok(item));
        }
        if self.done || self.offset >= self.ids.len() {
            return None;
        }
        let end = (self.offset + self.batch).min(self.ids.len());
        match self.service.items_for_ids(&self.ids[self.offset..end]) {
            Ok(items) => {
                self.offset = end;
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
