use crate::collection::paging::PageRange;
use crate::error::{CollectionError, Result};
use crate::selection::Selection;

/// Strategy that supplies a collection's items.
///
/// Implementations read the collection's `QuerySpecification` themselves and
/// must return fresh results on the first call after its revision changes.
pub trait CollectionBacking<T>: Send + Sync {
    /// Items matching the current filter.
    fn total_count(&self) -> Result<u64>;

    /// Items before filtering.
    fn unfiltered_count(&self) -> Result<u64>;

    /// Items of `range` in the current sort order.
    fn page(&self, range: PageRange) -> Result<Vec<T>>;

    /// Every matching item in sort order. Identifier-backed strategies
    /// hydrate lazily, `batch` items at a time.
    fn items(&self, batch: usize) -> Result<Box<dyn Iterator<Item = Result<T>> + Send + '_>>;

    /// Selection of every matching item.
    fn select_all(&self) -> Result<Selection<T>>;

    fn clear_caches(&self);

    fn add_item(&self, _item: T) -> Result<()> {
        Err(CollectionError::unsupported("add_item"))
    }

    /// Remove the items of `selection` from the source. Returns how many
    /// were removed.
    fn remove_items(&self, _selection: &Selection<T>) -> Result<usize> {
        Err(CollectionError::unsupported("remove_items"))
    }

    fn replace_items(&self, _items: Vec<T>) -> Result<()> {
        Err(CollectionError::unsupported("replace_items"))
    }
}
