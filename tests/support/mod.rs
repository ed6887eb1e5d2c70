//! Shared fixtures for the integration tests.
#![allow(dead_code)]

pub mod rows;

use std::sync::Arc;

use pageable::{QueryAttribute, Queryable, QueryableAccessor, PageableCollection, ValueType};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness. Set `RUST_LOG=pageable=debug` to
/// see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Queryable)]
pub struct Person {
    #[queryable(natural)]
    pub name: String,
    pub age: i64,
    #[queryable(rename = "city")]
    pub town: Option<String>,
    #[queryable(skip)]
    pub notes: Vec<u8>,
}

impl Person {
    pub fn new(name: &str, age: i64) -> Self {
        Person {
            name: name.to_string(),
            age,
            town: None,
            notes: Vec::new(),
        }
    }

    pub fn living_in(mut self, town: &str) -> Self {
        self.town = Some(town.to_string());
        self
    }
}

/// `a` through `f`, ages descending so that name and age orders disagree.
pub fn letters() -> Vec<Person> {
    ["a", "b", "c", "d", "e", "f"]
        .iter()
        .enumerate()
        .map(|(i, name)| Person::new(name, 60 - 10 * i as i64))
        .collect()
}

pub fn people(items: Vec<Person>) -> PageableCollection<Person> {
    init_tracing();
    PageableCollection::in_memory(items, QueryableAccessor)
}

pub fn names(items: &[Person]) -> Vec<&str> {
    items.iter().map(|p| p.name.as_str()).collect()
}

pub fn name() -> Arc<QueryAttribute> {
    QueryAttribute::new("name", ValueType::Text)
}

pub fn age() -> Arc<QueryAttribute> {
    QueryAttribute::new("age", ValueType::Int)
}

pub fn city() -> Arc<QueryAttribute> {
    QueryAttribute::new("city", ValueType::Text)
}

/// Natural value of an item, as seen by pass-through sort keys.
pub fn natural<T: Queryable>(item: &T) -> pageable::Value {
    item.natural_value()
}
