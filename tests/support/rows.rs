//! A fake remote source that answers with ids and counts every call.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pageable::{
    CollectionError, IdResolver, IdentifierService, Queryable, QueryableAccessor,
    QuerySpecification, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Queryable)]
pub struct Row {
    pub id: u64,
    #[queryable(natural)]
    pub label: String,
    pub group: i64,
}

impl Row {
    pub fn new(id: u64) -> Self {
        Row {
            id,
            label: format!("row-{:07}", id),
            group: (id % 3) as i64,
        }
    }
}

#[derive(Debug, Default)]
pub struct Calls {
    pub find_ids: AtomicUsize,
    pub get_items: AtomicUsize,
    pub hydrated: AtomicUsize,
    pub unfiltered: AtomicUsize,
}

pub struct RowService {
    rows: u64,
    delay: Duration,
    failing: AtomicBool,
    pub calls: Calls,
}

impl RowService {
    pub fn new(rows: u64) -> Self {
        RowService {
            rows,
            delay: Duration::ZERO,
            failing: AtomicBool::new(false),
            calls: Calls::default(),
        }
    }

    /// Every service call sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn find_calls(&self) -> usize {
        self.calls.find_ids.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.calls.get_items.load(Ordering::SeqCst)
    }

    pub fn hydrated(&self) -> usize {
        self.calls.hydrated.load(Ordering::SeqCst)
    }

    pub fn unfiltered_calls(&self) -> usize {
        self.calls.unfiltered.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<()> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollectionError::service_message("row service unavailable"));
        }
        Ok(())
    }
}

impl IdResolver<Row> for RowService {
    type Id = u64;

    fn id_for_item(&self, item: &Row) -> u64 {
        item.id
    }

    fn item_for_id(&self, id: &u64) -> Result<Row> {
        self.items_for_ids(std::slice::from_ref(id))
            .map(|mut rows| rows.remove(0))
    }

    fn items_for_ids(&self, ids: &[u64]) -> Result<Vec<Row>> {
        self.calls.get_items.fetch_add(1, Ordering::SeqCst);
        self.enter()?;
        self.calls.hydrated.fetch_add(ids.len(), Ordering::SeqCst);
        Ok(ids.iter().copied().map(Row::new).collect())
    }
}

impl IdentifierService<Row> for RowService {
    fn find_ids(&self, query: &QuerySpecification) -> Result<Vec<u64>> {
        self.calls.find_ids.fetch_add(1, Ordering::SeqCst);
        self.enter()?;
        let filter = query.effective_filter();
        let order = query.effective_sort_order();
        if filter.is_none() && order.is_empty() {
            return Ok((0..self.rows).collect());
        }
        let mut rows: Vec<Row> = (0..self.rows)
            .map(Row::new)
            .filter(|row| filter.as_ref().map_or(true, |f| f.matches(row, &QueryableAccessor)))
            .collect();
        order.sort(&mut rows, &QueryableAccessor);
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    fn unfiltered_count(&self, _query: &QuerySpecification) -> Result<u64> {
        self.calls.unfiltered.fetch_add(1, Ordering::SeqCst);
        self.enter()?;
        Ok(self.rows)
    }
}
