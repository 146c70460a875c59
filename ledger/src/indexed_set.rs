//! Insertion-ordered set with O(1) membership, insert, and remove.
//!
//! Removal uses swap-and-pop: the last element moves into the vacated slot and
//! its recorded position is updated. Positions are stored 1-based internally so
//! a missing entry can never be confused with slot 0; callers never see them.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug)]
pub struct IndexedSet<T> {
    items: Vec<T>,
    /// item → 1-based slot in `items`.
    positions: HashMap<T, usize>,
}

impl<T> IndexedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }
}

impl<T: Clone + Eq + Hash> IndexedSet<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.positions.contains_key(item)
    }

    /// Insert `item`. Returns `false` if it was already present.
    pub fn insert(&mut self, item: T) -> bool {
        if self.positions.contains_key(&item) {
            return false;
        }
        self.items.push(item.clone());
        self.positions.insert(item, self.items.len());
        true
    }

    /// Remove `item`. Returns `false` if it was not present.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(position) = self.positions.remove(item) else {
            return false;
        };
        let slot = position - 1;
        self.items.swap_remove(slot);
        if let Some(moved) = self.items.get(slot) {
            if let Some(moved_position) = self.positions.get_mut(moved) {
                *moved_position = position;
            }
        }
        true
    }
}

/// Two sets are equal when they hold the same items in the same order.
impl<T: Eq + Hash> PartialEq for IndexedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq + Hash> Eq for IndexedSet<T> {}

impl<T> Default for IndexedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a IndexedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Clone + Eq + Hash> FromIterator<T> for IndexedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

/// Serialized as the plain element sequence; positions are rebuilt on load.
impl<T: Serialize> Serialize for IndexedSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for IndexedSet<T>
where
    T: Deserialize<'de> + Clone + Eq + Hash,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        let mut set = Self::new();
        for item in items {
            if !set.insert(item) {
                return Err(de::Error::custom("duplicate element in indexed set"));
            }
        }
        Ok(set)
    }
}
