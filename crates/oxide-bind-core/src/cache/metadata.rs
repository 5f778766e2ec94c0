//! Process-wide, append-only metadata cache.

use std::fmt;
use std::hash::Hash;

use dashmap::DashMap;

/// A concurrent cache that never evicts.
///
/// Meant for `static` per-type metadata: entries are owned by the cache for
/// the rest of the process and are never freed. The key space must be
/// finite (types, not user input).
pub struct MetadataCache<K, V> {
    entries: DashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> MetadataCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the cached value, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the cached value for `key`, computing and inserting it if absent.
    ///
    /// `compute` runs without any lock held and may run more than once when
    /// threads race; the first value inserted wins.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(found) = self.get(&key) {
            return found;
        }
        let computed = compute();
        self.entries.entry(key).or_insert(computed).value().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for MetadataCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for MetadataCache<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataCache")
            .field("len", &self.entries.len())
            .finish()
    }
}
