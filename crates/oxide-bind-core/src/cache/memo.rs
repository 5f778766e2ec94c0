//! Per-registry memo of factory chain results.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Memoises chain lookups until the chain changes.
///
/// Each [`invalidate`](Self::invalidate) starts a new generation. A result
/// computed against an older generation is returned to its caller but never
/// retained, so a lookup racing a registration cannot leave a stale entry
/// behind.
pub struct ChainMemo<K, V> {
    entries: DashMap<K, V>,
    generation: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> ChainMemo<K, V> {
    /// Creates an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Returns the memoised value for `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// The current generation. Read it before taking the chain snapshot the
    /// value will be computed from.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Records `value` for `key` if no invalidation happened since
    /// `generation`, and returns the value callers should use.
    pub fn insert(&self, generation: u64, key: K, value: V) -> V {
        if self.generation() != generation {
            return value;
        }
        let kept = self.entries.entry(key.clone()).or_insert(value).value().clone();
        if self.generation() != generation {
            self.entries.remove(&key);
        }
        kept
    }

    /// Forgets every entry and starts a new generation.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    /// Number of memoised entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is memoised.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for ChainMemo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> fmt::Debug for ChainMemo<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainMemo")
            .field("len", &self.entries.len())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}
