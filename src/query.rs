//! Filter, sort and execute state that drives a collection's view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use crate::filter::FilterNode;
use crate::observe::{topics, ChangeEmitter, ListenerId};
use crate::sort::SortOrder;

/// Payload of `filter-changed`, `sort-changed` and `execute-changed`.
#[derive(Debug, Clone)]
pub struct QueryChange {
    pub topic: &'static str,
    /// Revision after the change.
    pub revision: u64,
}

#[derive(Debug, Clone)]
struct QueryState {
    filter: Option<FilterNode>,
    sort_order: Option<SortOrder>,
    default_sort_order: Option<SortOrder>,
    execute: bool,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            filter: None,
            sort_order: None,
            default_sort_order: None,
            execute: true,
        }
    }
}

impl QueryState {
    fn effective_sort_order(&self) -> SortOrder {
        match (&self.sort_order, &self.default_sort_order) {
            (Some(active), Some(fallback)) => active.then(fallback),
            (Some(active), None) => active.clone(),
            (None, Some(fallback)) => fallback.clone(),
            (None, None) => SortOrder::default(),
        }
    }
}

/// Observable query state.
///
/// Every effective change bumps [`revision`](Self::revision) before the
/// notification goes out, so a listener (or the next read) that compares
/// revisions never sees stale cached state. Setting a value equal to the
/// current one is not a change.
pub struct QuerySpecification {
    state: RwLock<QueryState>,
    revision: AtomicU64,
    emitter: ChangeEmitter<QueryChange>,
}

impl Default for QuerySpecification {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QuerySpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("QuerySpecification")
            .field("filter", &state.filter)
            .field("sort_order", &state.sort_order)
            .field("default_sort_order", &state.default_sort_order)
            .field("execute", &state.execute)
            .field("revision", &self.revision())
            .finish()
    }
}

impl QuerySpecification {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(QueryState::default()),
            revision: AtomicU64::new(0),
            emitter: ChangeEmitter::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, QueryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, QueryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The filter as set, including ineffective leaves.
    pub fn filter(&self) -> Option<FilterNode> {
        self.read().filter.clone()
    }

    /// The filter collections evaluate: pruned of ineffective comparisons.
    pub fn effective_filter(&self) -> Option<FilterNode> {
        self.read().filter.as_ref().and_then(FilterNode::prune)
    }

    /// Replace the filter; `None` clears it. Returns whether anything changed.
    pub fn set_filter(&self, filter: Option<FilterNode>) -> bool {
        let changed = {
            let mut state = self.write();
            if state.filter == filter {
                false
            } else {
                state.filter = filter;
                true
            }
        };
        self.changed(changed, topics::FILTER_CHANGED)
    }

    /// The active sort order, if one was set.
    pub fn sort_order(&self) -> Option<SortOrder> {
        self.read().sort_order.clone()
    }

    /// Replace the active sort order; `None` falls back to the default order.
    pub fn set_sort_order(&self, sort_order: Option<SortOrder>) -> bool {
        self.update_sort(|state| state.sort_order = sort_order)
    }

    pub fn default_sort_order(&self) -> Option<SortOrder> {
        self.read().default_sort_order.clone()
    }

    pub fn set_default_sort_order(&self, sort_order: Option<SortOrder>) -> bool {
        self.update_sort(|state| state.default_sort_order = sort_order)
    }

    /// Active order followed by the default order's remaining keys.
    pub fn effective_sort_order(&self) -> SortOrder {
        self.read().effective_sort_order()
    }

    fn update_sort(&self, apply: impl FnOnce(&mut QueryState)) -> bool {
        let changed = {
            let mut state = self.write();
            let before = state.effective_sort_order();
            apply(&mut state);
            state.effective_sort_order() != before
        };
        self.changed(changed, topics::SORT_CHANGED)
    }

    /// When `false`, collections present an empty result and do not query
    /// their source.
    pub fn execute(&self) -> bool {
        self.read().execute
    }

    pub fn set_execute(&self, execute: bool) -> bool {
        let changed = {
            let mut state = self.write();
            let changed = state.execute != execute;
            state.execute = execute;
            changed
        };
        self.changed(changed, topics::EXECUTE_CHANGED)
    }

    /// Monotonic counter of effective changes.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Subscribe to one of the query topics.
    pub fn on_change<F>(&self, topic: &str, listener: F) -> ListenerId
    where
        F: Fn(&QueryChange) + Send + Sync + 'static,
    {
        self.emitter.on(topic, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.emitter.off(id)
    }

    fn changed(&self, changed: bool, topic: &'static str) -> bool {
        if !changed {
            return false;
        }
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(topic, revision, "query changed");
        self.emitter.emit(topic, &QueryChange { topic, revision });
        true
    }
}
