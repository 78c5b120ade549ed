//! Reference counted storage for entities shared between several parents.

use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::error;

use crate::internal::prelude::*;

/// A value plus the number of cached entities currently referencing it.
///
/// The value sits behind an [`Arc`] so that views can hold on to the exact version they were built
/// from; replacing the value never touches a view handed out earlier.
#[derive(Debug)]
pub(crate) struct SharedCell<T> {
    value: Arc<T>,
    ref_count: usize,
}

impl<T> SharedCell<T> {
    /// Wraps a value with a reference count of 0.
    pub fn wrap(value: T) -> Self {
        Self {
            value: Arc::new(value),
            ref_count: 0,
        }
    }

    pub fn value(&self) -> &Arc<T> {
        &self.value
    }

    /// Replaces the value, keeping the reference count.
    pub fn set(&mut self, value: T) {
        self.value = Arc::new(value);
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn increment(&mut self, n: usize) {
        self.ref_count += n;
    }

    /// Decrements the count by `n`, returning the new count.
    ///
    /// Going below zero means some owner released a reference it never acquired. That is logged
    /// and asserted on in debug builds; release builds clamp the count at zero.
    pub fn decrement(&mut self, n: usize) -> usize {
        if n > self.ref_count {
            error!(ref_count = self.ref_count, decrement = n, "Shared cell reference count would go negative");
        }

        debug_assert!(n <= self.ref_count, "shared cell reference count went negative");
        self.ref_count = self.ref_count.saturating_sub(n);
        self.ref_count
    }
}

impl<T: Clone> SharedCell<T> {
    /// Returns an owned copy of the value.
    pub fn read(&self) -> T {
        T::clone(&self.value)
    }

    /// Mutable access to the value. Clones it first if a view still shares it.
    pub fn make_mut(&mut self) -> &mut T {
        Arc::make_mut(&mut self.value)
    }
}

/// A keyed pool of [`SharedCell`]s which drops a cell as soon as nothing references it.
#[derive(Debug)]
pub(crate) struct SharedPool<K, T> {
    cells: FxHashMap<K, SharedCell<T>>,
}

impl<K: Copy + Debug + Eq + Hash, T> SharedPool<K, T> {
    pub fn get(&self, key: K) -> Option<&SharedCell<T>> {
        self.cells.get(&key)
    }

    pub fn arc(&self, key: K) -> Option<Arc<T>> {
        self.cells.get(&key).map(|cell| Arc::clone(cell.value()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &SharedCell<T>)> {
        self.cells.iter().map(|(key, cell)| (*key, cell))
    }

    /// Inserts or refreshes the value under `key` without changing its reference count.
    pub fn upsert(&mut self, key: K, value: T) -> &mut SharedCell<T> {
        match self.cells.entry(key) {
            Entry::Occupied(entry) => {
                let cell = entry.into_mut();
                cell.set(value);
                cell
            },
            Entry::Vacant(entry) => entry.insert(SharedCell::wrap(value)),
        }
    }

    /// Inserts or refreshes the value under `key` and takes one reference to it.
    pub fn acquire(&mut self, key: K, value: T) {
        self.upsert(key, value).increment(1);
    }

    /// Gives up `n` references to the cell under `key`, then removes the cell if nothing
    /// references it any more and it isn't `exempt`.
    ///
    /// Passing `n = 0` only performs the collection check. Returns whether the cell was removed.
    pub fn release(&mut self, key: K, n: usize, exempt: bool) -> bool {
        let Some(cell) = self.cells.get_mut(&key) else {
            if n > 0 {
                error!(?key, "Released a reference to an entry missing from its pool");
            }

            debug_assert_eq!(n, 0, "released a reference to an entry missing from its pool");
            return false;
        };

        if cell.decrement(n) == 0 && !exempt {
            self.cells.remove(&key);
            return true;
        }

        false
    }
}

impl<K, T> Default for SharedPool<K, T> {
    fn default() -> Self {
        Self {
            cells: FxHashMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SharedCell, SharedPool};

    #[test]
    fn cell_keeps_count_across_replacement() {
        let mut cell = SharedCell::wrap("old");
        cell.increment(2);
        let before = std::sync::Arc::clone(cell.value());

        cell.set("new");
        assert_eq!(cell.ref_count(), 2);
        assert_eq!(cell.read(), "new");
        assert_eq!(*before, "old");
        assert_eq!(cell.decrement(1), 1);
    }

    #[test]
    fn pool_collects_unreferenced_cells() {
        let mut pool = SharedPool::<u64, &str>::default();
        pool.acquire(1, "a");
        pool.acquire(1, "b");
        assert_eq!(pool.get(1).unwrap().ref_count(), 2);
        assert_eq!(pool.get(1).unwrap().read(), "b");

        assert!(!pool.release(1, 1, false));
        assert!(pool.get(1).is_some());
        assert!(pool.release(1, 1, false));
        assert!(pool.get(1).is_none());
    }

    #[test]
    fn pool_keeps_exempt_cells() {
        let mut pool = SharedPool::<u64, &str>::default();
        pool.acquire(1, "a");
        assert!(!pool.release(1, 1, true));
        assert_eq!(pool.get(1).unwrap().ref_count(), 0);

        // A zero release only runs the collection check.
        assert!(pool.release(1, 0, false));
        assert_eq!(pool.len(), 0);
        assert!(!pool.release(2, 0, false));
    }
}
