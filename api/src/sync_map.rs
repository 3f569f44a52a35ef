use std::{
    borrow::Borrow,
    collections::{hash_map::Entry, HashMap},
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Reasons a [`SyncMap`] update can be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SyncMapError {
    /// An insert required the key to be absent, but it was present.
    KeyExists,
    /// A union would overwrite an existing value with a different one.
    ValueConflict,
}

/// A concurrency-safe map shared between tasks.
///
/// Backs the shortener registry and the stateful shorteners' reverse
/// tables, which are mutated from whichever task happens to drive a clock.
pub(crate) struct SyncMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> SyncMap<K, V> {
    pub(crate) fn new() -> Self {
        Self::with(HashMap::new())
    }

    pub(crate) fn with(init: HashMap<K, V>) -> Self {
        SyncMap {
            inner: Mutex::new(init),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds the value at the specified key, returning any previous value.
    ///
    /// With `err_if_exists` set, a present key is left untouched and the
    /// insert is rejected instead.
    pub(crate) fn insert(
        &self,
        key: K,
        value: V,
        err_if_exists: bool,
    ) -> Result<Option<V>, SyncMapError> {
        match self.lock().entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                Ok(None)
            }
            Entry::Occupied(mut entry) => {
                if err_if_exists {
                    Err(SyncMapError::KeyExists)
                } else {
                    Ok(Some(entry.insert(value)))
                }
            }
        }
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.lock().get(key).cloned()
    }

    /// Returns the keys within the map, sorted.
    pub(crate) fn keys(&self) -> Vec<K>
    where
        K: Ord + Clone,
    {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(crate) fn snapshot(&self) -> HashMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        self.lock().clone()
    }

    /// Adds every entry of `entries`, rejecting the whole batch if any
    /// entry would change the value already stored at its key.
    pub(crate) fn try_union(&self, entries: HashMap<K, V>) -> Result<(), SyncMapError>
    where
        V: PartialEq,
    {
        let mut map = self.lock();
        if entries
            .iter()
            .any(|(key, value)| map.get(key).is_some_and(|existing| existing != value))
        {
            return Err(SyncMapError::ValueConflict);
        }
        map.extend(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_get() {
        let map = SyncMap::new();
        assert_eq!(map.insert("a", 1, false), Ok(None));
        assert_eq!(map.get("a"), Some(1));
        assert_eq!(map.get("b"), None);
    }

    #[test]
    fn insert_overwrites_and_returns_previous() {
        let map = SyncMap::new();
        map.insert("a", 1, false).unwrap();
        assert_eq!(map.insert("a", 2, false), Ok(Some(1)));
        assert_eq!(map.get("a"), Some(2));
    }

    #[test]
    fn insert_rejects_existing_key_when_asked() {
        let map = SyncMap::new();
        map.insert("a", 1, false).unwrap();
        assert_eq!(map.insert("a", 2, true), Err(SyncMapError::KeyExists));
        assert_eq!(map.get("a"), Some(1));
    }

    #[test]
    fn keys_are_sorted() {
        let map = SyncMap::with(HashMap::from([("c", 3), ("a", 1), ("b", 2)]));
        assert_eq!(map.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn union_merges_disjoint_and_identical_entries() {
        let map = SyncMap::with(HashMap::from([("a", 1)]));
        map.try_union(HashMap::from([("a", 1), ("b", 2)])).unwrap();
        assert_eq!(map.snapshot(), HashMap::from([("a", 1), ("b", 2)]));
    }

    #[test]
    fn union_rejects_conflicting_values_without_applying() {
        let map = SyncMap::with(HashMap::from([("a", 1)]));
        assert_eq!(
            map.try_union(HashMap::from([("a", 9), ("b", 2)])),
            Err(SyncMapError::ValueConflict)
        );
        assert_eq!(map.snapshot(), HashMap::from([("a", 1)]));
    }
}
