use std::fmt;
use std::hash::Hash;
use std::ops::{Bound, RangeBounds};

use super::data::DataRecord;
use crate::internal::prelude::*;

/// Storage behind a [`CacheView`], indexable by position and by key.
trait ViewSource<K, V>: Send + Sync {
    fn len(&self) -> usize;

    fn key_at(&self, index: usize) -> Option<&K>;

    fn value_at(&self, index: usize) -> Option<V>;

    fn position(&self, key: &K) -> Option<usize>;
}

fn index_keys<K: Clone + Eq + Hash>(keys: &[K]) -> FxHashMap<K, usize> {
    keys.iter().enumerate().map(|(index, key)| (key.clone(), index)).collect()
}

/// Values stored as-is. Reading one clones it out of its [`Arc`].
struct Values<K, V> {
    keys: Box<[K]>,
    values: Box<[Arc<V>]>,
    index: FxHashMap<K, usize>,
}

impl<K, V> ViewSource<K, V> for Values<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn key_at(&self, index: usize) -> Option<&K> {
        self.keys.get(index)
    }

    fn value_at(&self, index: usize) -> Option<V> {
        self.values.get(index).map(|value| V::clone(value))
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }
}

/// Data records paired with the shared entities they referenced when the view was taken. Each
/// read builds a fresh entity.
struct Records<K, R: DataRecord> {
    keys: Box<[K]>,
    records: Box<[(Arc<R>, R::Refs)]>,
    index: FxHashMap<K, usize>,
}

impl<K, R> ViewSource<K, R::Entity> for Records<K, R>
where
    K: Eq + Hash + Send + Sync,
    R: DataRecord,
{
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn key_at(&self, index: usize) -> Option<&K> {
        self.keys.get(index)
    }

    fn value_at(&self, index: usize) -> Option<R::Entity> {
        let (record, refs) = self.records.get(index)?;
        Some(record.to_entity(refs))
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }
}

/// A read-only, point-in-time snapshot of a set of cached entities.
///
/// Views are what every bulk cache query returns. Entries keep the order they were collected in,
/// can be looked up by key or by position, and every read hands out an owned value. A view never
/// observes mutations made to the cache after it was taken, so it is safe to hold on to one for
/// as long as needed.
///
/// Cloning a view is cheap; clones share the same snapshot.
pub struct CacheView<K, V> {
    source: Option<Arc<dyn ViewSource<K, V>>>,
}

impl<K, V> CacheView<K, V> {
    /// A view with no entries.
    pub const fn empty() -> Self {
        Self {
            source: None,
        }
    }

    pub fn len(&self) -> usize {
        self.source.as_ref().map_or(0, |source| source.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the value stored at `index`.
    pub fn get_at(&self, index: usize) -> Option<(K, V)>
    where
        K: Clone,
    {
        let source = self.source.as_ref()?;
        Some((source.key_at(index)?.clone(), source.value_at(index)?))
    }

    /// Builds the entries whose positions fall within `range`. Out of bounds positions are
    /// ignored.
    pub fn get_range(&self, range: impl RangeBounds<usize>) -> Vec<(K, V)>
    where
        K: Clone,
    {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.saturating_add(1),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => len,
        }
        .min(len);

        (start..end).filter_map(|index| self.get_at(index)).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        let source = self.source.as_deref();
        (0..self.len()).filter_map(move |index| source?.key_at(index))
    }

    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        let source = self.source.as_deref();
        (0..self.len()).filter_map(move |index| source?.value_at(index))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            view: self,
            index: 0,
        }
    }
}

impl<K: Eq + Hash, V> CacheView<K, V> {
    pub fn contains_key(&self, key: &K) -> bool {
        self.source.as_ref().is_some_and(|source| source.position(key).is_some())
    }

    /// Builds the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        let source = self.source.as_ref()?;
        source.value_at(source.position(key)?)
    }
}

impl<K, V> CacheView<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn from_values(entries: impl IntoIterator<Item = (K, Arc<V>)>) -> Self {
        let (keys, values): (Vec<K>, Vec<Arc<V>>) = entries.into_iter().unzip();
        if keys.is_empty() {
            return Self::empty();
        }

        let index = index_keys(&keys);
        Self {
            source: Some(Arc::new(Values {
                keys: keys.into_boxed_slice(),
                values: values.into_boxed_slice(),
                index,
            })),
        }
    }
}

impl<K, V> CacheView<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: 'static,
{
    pub(crate) fn from_records<R>(entries: impl IntoIterator<Item = (K, Arc<R>, R::Refs)>) -> Self
    where
        R: DataRecord<Entity = V>,
    {
        let mut keys = Vec::new();
        let mut records = Vec::new();
        for (key, record, refs) in entries {
            keys.push(key);
            records.push((record, refs));
        }

        if keys.is_empty() {
            return Self::empty();
        }

        let index = index_keys(&keys);
        Self {
            source: Some(Arc::new(Records {
                keys: keys.into_boxed_slice(),
                records: records.into_boxed_slice(),
                index,
            })),
        }
    }
}

impl<K, V> Clone for CacheView<K, V> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<K, V> Default for CacheView<K, V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Clone + fmt::Debug, V: fmt::Debug> fmt::Debug for CacheView<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An iterator over the entries of a [`CacheView`], building each value as it goes.
pub struct Iter<'a, K, V> {
    view: &'a CacheView<K, V>,
    index: usize,
}

impl<K: Clone, V> Iterator for Iter<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.view.len() {
            let index = self.index;
            self.index += 1;
            if let Some(entry) = self.view.get_at(index) {
                return Some(entry);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.view.len().saturating_sub(self.index)))
    }
}

impl<'a, K: Clone, V> IntoIterator for &'a CacheView<K, V> {
    type Item = (K, V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
