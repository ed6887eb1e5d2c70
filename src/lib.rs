//! Filtered, sorted, paged and selectable views over item sources.
//!
//! A [`PageableCollection`] presents either an in-memory sequence or an
//! identifier-backed remote source through one contract. Queries are
//! described by a [`QuerySpecification`], selections by immutable
//! [`Selection`] snapshots, and user edits by a [`ModificationLog`].

extern crate self as pageable;

mod attribute;
mod collection;
mod config;
mod error;
mod filter;
mod item_set;
mod modification;
mod observe;
mod operator;
mod query;
mod registry;
mod selection;
mod selection_handler;
mod sort;
mod value;

pub use attribute::{
    AttributeAccessor, QueryAttribute, Queryable, QueryableAccessor, SharedAccessor,
};
pub use collection::backing::CollectionBacking;
pub use collection::cache::LoadingCache;
pub use collection::identifier::{IdentifierBacking, IdentifierService};
pub use collection::in_memory::InMemoryBacking;
pub use collection::paging::{clamp_page_index, page_count, PageRange, MAX_ITEM_INDEX};
pub use collection::{PageChange, PagePosition, PageableCollection};
pub use config::CollectionConfig;
pub use error::{CollectionError, Result};
pub use filter::{Comparison, FilterNode};
pub use item_set::{CollectionItem, ItemSet};
pub use modification::{ModificationChange, ModificationEvent, ModificationLog, ModificationTracker};
pub use observe::{topics, ChangeEmitter, ListenerId};
pub use operator::{ComparisonOperator, TextMatch};
pub use query::{QueryChange, QuerySpecification};
pub use registry::OperatorRegistry;
pub use selection::{
    IdResolver, IdSet, IdentifierSet, MappedSelection, Selection, SelectionIter, SelectionView,
    DEFAULT_RESOLVE_BATCH,
};
pub use selection_handler::{
    MappedSelectionHandler, SelectionChange, SelectionDomain, SelectionHandler, SelectionHandling,
    SelectionMode,
};
pub use sort::{SortDirection, SortKey, SortOrder};
pub use value::{Value, ValueType};

#[cfg(feature = "derive")]
pub use pageable_macros::Queryable;
