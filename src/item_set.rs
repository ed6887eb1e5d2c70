use std::collections::HashSet;
use std::hash::Hash;

/// Bounds every collection item satisfies.
///
/// Items are de-duplicated by their own `Eq`/`Hash`, never by address.
pub trait CollectionItem: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> CollectionItem for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// Insertion-ordered set.
#[derive(Debug, Clone)]
pub struct ItemSet<T> {
    order: Vec<T>,
    members: HashSet<T>,
}

impl<T: Clone + Eq + Hash> Default for ItemSet<T> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            members: HashSet::new(),
        }
    }
}

impl<T: Clone + Eq + Hash> ItemSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the item was already present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.members.contains(&item) {
            return false;
        }
        self.members.insert(item.clone());
        self.order.push(item);
        true
    }

    pub fn remove(&mut self, item: &T) -> bool {
        if !self.members.remove(item) {
            return false;
        }
        self.order.retain(|existing| existing != item);
        true
    }

    /// Keep only the items for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let members = &mut self.members;
        self.order.retain(|item| {
            let kept = keep(item);
            if !kept {
                members.remove(item);
            }
            kept
        });
    }

    pub fn contains(&self, item: &T) -> bool {
        self.members.contains(item)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.order
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl<T: Clone + Eq + Hash> PartialEq for ItemSet<T> {
    /// Order-sensitive.
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl<T: Clone + Eq + Hash> Eq for ItemSet<T> {}

impl<T: Clone + Eq + Hash> FromIterator<T> for ItemSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = ItemSet::new();
        set.extend(iter);
        set
    }
}

impl<T: Clone + Eq + Hash> Extend<T> for ItemSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<'a, T: Clone + Eq + Hash> IntoIterator for &'a ItemSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

impl<T: Clone + Eq + Hash> IntoIterator for ItemSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}
