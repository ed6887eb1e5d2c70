//! Query attributes and the accessor seam used to read them from items.

use std::fmt;
use std::sync::Arc;

use crate::value::{Value, ValueType};

/// A filterable/sortable field of an item type.
///
/// Attributes are created once per schema and shared (through `Arc`) by every
/// filter leaf and sort key that mentions them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryAttribute {
    name: String,
    value_type: ValueType,
    title: Option<String>,
}

impl QueryAttribute {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            value_type,
            title: None,
        })
    }

    pub fn titled(
        name: impl Into<String>,
        value_type: ValueType,
        title: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            value_type,
            title: Some(title.into()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Human readable title, falling back to the name.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for QueryAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Reads attribute values out of items.
///
/// Implementations must be side-effect free: filters and sort comparators may
/// call them any number of times, in any order.
pub trait AttributeAccessor<T: ?Sized>: Send + Sync {
    /// Value of `attribute` on `item`, `Value::Null` when absent.
    fn value(&self, item: &T, attribute: &str) -> Value;

    /// The item's own value, used by pass-through sort keys.
    fn natural_value(&self, _item: &T) -> Value {
        Value::Null
    }
}

impl<T: ?Sized, F> AttributeAccessor<T> for F
where
    F: Fn(&T, &str) -> Value + Send + Sync,
{
    fn value(&self, item: &T, attribute: &str) -> Value {
        self(item, attribute)
    }
}

/// Items that expose their attributes directly.
///
/// Usually derived with `#[derive(Queryable)]`.
pub trait Queryable {
    fn attribute(&self, name: &str) -> Value;

    fn natural_value(&self) -> Value {
        Value::Null
    }
}

/// [`AttributeAccessor`] for any [`Queryable`] item.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryableAccessor;

impl<T: Queryable + ?Sized> AttributeAccessor<T> for QueryableAccessor {
    fn value(&self, item: &T, attribute: &str) -> Value {
        item.attribute(attribute)
    }

    fn natural_value(&self, item: &T) -> Value {
        item.natural_value()
    }
}

/// Shared accessor handle as stored by collections.
pub type SharedAccessor<T> = Arc<dyn AttributeAccessor<T>>;
