//! Wrappers around std collections for the bookkeeping the cache needs.

use std::collections::VecDeque;
use std::hash::Hash;

use crate::internal::prelude::*;

/// A sorted set of ids, used by guild records to track which global entries belong to them.
#[derive(Clone, Debug)]
pub(crate) struct SnowflakeSet<T>(Vec<T>);

impl<T> Default for SnowflakeSet<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Copy + Ord> SnowflakeSet<T> {
    pub fn from_ids(ids: impl IntoIterator<Item = T>) -> Self {
        let mut ids: Vec<T> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn contains(&self, id: T) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    /// Returns whether the id was newly inserted.
    pub fn insert(&mut self, id: T) -> bool {
        match self.0.binary_search(&id) {
            Ok(_) => false,
            Err(index) => {
                self.0.insert(index, id);
                true
            },
        }
    }

    pub fn remove(&mut self, id: T) -> bool {
        match self.0.binary_search(&id) {
            Ok(index) => {
                self.0.remove(index);
                true
            },
            Err(_) => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Adds an id to an optional set, creating the set on first use.
pub(crate) fn add_id<T: Copy + Ord>(handle: &mut Option<SnowflakeSet<T>>, id: T) {
    handle.get_or_insert_with(SnowflakeSet::default).insert(id);
}

/// Removes an id from an optional set. A set left empty is dropped.
pub(crate) fn remove_id<T: Copy + Ord>(handle: &mut Option<SnowflakeSet<T>>, id: T) -> bool {
    let Some(set) = handle else {
        return false;
    };

    let removed = set.remove(id);
    if set.is_empty() {
        *handle = None;
    }

    removed
}

/// A map which remembers insertion order and holds at most `limit` entries.
///
/// Inserting past the limit evicts the oldest entry, which is handed back to the caller so it can
/// release whatever the entry referenced.
#[derive(Debug)]
pub(crate) struct BoundedMap<K, V> {
    map: FxHashMap<K, V>,
    order: VecDeque<K>,
    limit: usize,
}

impl<K: Copy + Eq + Hash, V> BoundedMap<K, V> {
    pub fn new(limit: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            order: VecDeque::new(),
            limit,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Inserts a new entry, returning the entry evicted to make room for it.
    ///
    /// Replacing an existing key keeps its place in the eviction order. With a limit of 0 the
    /// inserted entry itself is evicted straight away.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(existing) = self.map.get_mut(&key) {
            *existing = value;
            return None;
        }

        self.map.insert(key, value);
        self.order.push_back(key);

        if self.map.len() > self.limit {
            let oldest = self.order.pop_front()?;
            return self.map.remove(&oldest).map(|value| (oldest, value));
        }

        None
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        if let Some(index) = self.order.iter().position(|k| k == key) {
            self.order.remove(index);
        }

        Some(value)
    }

    /// Iterates from the oldest entry to the newest.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().filter_map(|key| self.map.get_key_value(key))
    }

    /// Removes every entry, oldest first.
    pub fn take_all(&mut self) -> Vec<(K, V)> {
        let mut map = std::mem::take(&mut self.map);
        self.order.drain(..).filter_map(|key| map.remove(&key).map(|value| (key, value))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{add_id, remove_id, BoundedMap, SnowflakeSet};
    use crate::model::id::RoleId;

    #[test]
    fn snowflake_set_is_sorted_and_unique() {
        let mut set = SnowflakeSet::from_ids([3, 1, 2, 3]);
        assert_eq!(set.iter().collect::<Vec<_>>(), [1, 2, 3]);
        assert!(!set.insert(2));
        assert!(set.insert(0));
        assert!(set.contains(0));
        assert!(set.remove(3));
        assert!(!set.remove(3));
        assert_eq!(set.iter().collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn optional_set_collapses_when_emptied() {
        let mut handle = None;
        assert!(!remove_id(&mut handle, 1));

        add_id(&mut handle, 1);
        add_id(&mut handle, 2);
        assert!(remove_id(&mut handle, 1));
        assert!(handle.is_some());
        assert!(remove_id(&mut handle, 2));
        assert!(handle.is_none());
    }

    #[test]
    fn id_sets_need_no_default_ids() {
        let mut handle: Option<SnowflakeSet<RoleId>> = None;
        add_id(&mut handle, RoleId::new(2));
        add_id(&mut handle, RoleId::new(1));
        let ids = handle.as_ref().map(|set| set.iter().collect::<Vec<_>>());
        assert_eq!(ids, Some(vec![RoleId::new(1), RoleId::new(2)]));
        assert!(SnowflakeSet::<RoleId>::default().is_empty());
    }

    #[test]
    fn bounded_map_evicts_oldest() {
        let mut map = BoundedMap::new(2);
        assert_eq!(map.insert(1, "a"), None);
        assert_eq!(map.insert(2, "b"), None);
        // Replacing keeps the original position.
        assert_eq!(map.insert(1, "c"), None);
        assert_eq!(map.insert(3, "d"), Some((1, "c")));
        assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [2, 3]);

        assert_eq!(map.remove(&2), Some("b"));
        assert_eq!(map.take_all(), [(3, "d")]);
        assert_eq!(map.iter().count(), 0);
    }

    #[test]
    fn zero_limit_evicts_immediately() {
        let mut map = BoundedMap::new(0);
        assert_eq!(map.insert(1, "a"), Some((1, "a")));
        assert!(!map.contains_key(&1));
    }
}
