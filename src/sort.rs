//! Multi-key sort orders.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeAccessor, QueryAttribute};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// One sort criterion. A key without an attribute compares the items' own
/// (natural) values.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    attribute: Option<Arc<QueryAttribute>>,
    direction: SortDirection,
}

impl SortKey {
    pub fn new(attribute: &Arc<QueryAttribute>, direction: SortDirection) -> Self {
        Self {
            attribute: Some(Arc::clone(attribute)),
            direction,
        }
    }

    pub fn ascending(attribute: &Arc<QueryAttribute>) -> Self {
        Self::new(attribute, SortDirection::Ascending)
    }

    pub fn descending(attribute: &Arc<QueryAttribute>) -> Self {
        Self::new(attribute, SortDirection::Descending)
    }

    pub fn pass_through(direction: SortDirection) -> Self {
        Self {
            attribute: None,
            direction,
        }
    }

    pub fn attribute(&self) -> Option<&Arc<QueryAttribute>> {
        self.attribute.as_ref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn reversed(&self) -> Self {
        Self {
            attribute: self.attribute.clone(),
            direction: self.direction.reversed(),
        }
    }

    fn same_target(&self, other: &SortKey) -> bool {
        match (&self.attribute, &other.attribute) {
            (Some(a), Some(b)) => a.name() == b.name(),
            (None, None) => true,
            _ => false,
        }
    }

    fn compare<T: ?Sized>(&self, a: &T, b: &T, accessor: &dyn AttributeAccessor<T>) -> Ordering {
        let ordering = match &self.attribute {
            Some(attribute) => accessor
                .value(a, attribute.name())
                .compare(&accessor.value(b, attribute.name())),
            None => accessor.natural_value(a).compare(&accessor.natural_value(b)),
        };
        self.direction.apply(ordering)
    }
}

/// Ordered list of [`SortKey`]s compared lexicographically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortOrder {
    keys: Vec<SortKey>,
}

impl SortOrder {
    pub fn new(keys: impl IntoIterator<Item = SortKey>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn by(attribute: &Arc<QueryAttribute>, direction: SortDirection) -> Self {
        Self::new([SortKey::new(attribute, direction)])
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A new order with every key's direction flipped.
    pub fn reversed(&self) -> Self {
        Self {
            keys: self.keys.iter().map(SortKey::reversed).collect(),
        }
    }

    /// This order followed by the keys of `fallback` that target attributes
    /// not already sorted on.
    pub fn then(&self, fallback: &SortOrder) -> Self {
        let mut keys = self.keys.clone();
        for key in &fallback.keys {
            if !keys.iter().any(|k| k.same_target(key)) {
                keys.push(key.clone());
            }
        }
        Self { keys }
    }

    /// Compare two items. With no keys, the items' natural values decide.
    pub fn compare<T: ?Sized>(
        &self,
        a: &T,
        b: &T,
        accessor: &dyn AttributeAccessor<T>,
    ) -> Ordering {
        if self.keys.is_empty() {
            return SortKey::pass_through(SortDirection::Ascending).compare(a, b, accessor);
        }
        for key in &self.keys {
            let ordering = key.compare(a, b, accessor);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort.
    pub fn sort<T>(&self, items: &mut [T], accessor: &dyn AttributeAccessor<T>) {
        items.sort_by(|a, b| self.compare(a, b, accessor));
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let target = key.attribute.as_ref().map_or("<self>", |a| a.name());
            let arrow = match key.direction {
                SortDirection::Ascending => "asc",
                SortDirection::Descending => "desc",
            };
            write!(f, "{} {}", target, arrow)?;
        }
        Ok(())
    }
}
