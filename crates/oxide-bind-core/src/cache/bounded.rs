//! Size-bounded memoisation with hit/miss accounting.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::{CacheSettings, ConfigRegistry, Eviction};

/// Computes the value for a missing key.
pub type CacheLoader<K, V> = Box<dyn Fn(&K, &ConfigRegistry) -> V + Send + Sync>;

/// Chooses which entry to drop from a full cache.
///
/// Entries are kept in insertion order; the policy returns the position of
/// the victim in that order.
pub trait EvictionPolicy: Send + Sync + fmt::Debug {
    /// Returns the index of the entry to evict from a cache holding `len`
    /// entries. `len` is always at least one; an index past the end evicts
    /// the newest entry.
    fn victim(&self, len: usize) -> usize;
}

impl EvictionPolicy for Eviction {
    fn victim(&self, len: usize) -> usize {
        match self {
            Self::Fifo => 0,
            Self::Newest => len - 1,
        }
    }
}

/// A memoising cache with an optional size bound.
///
/// Reads take a shared lock. A miss takes the exclusive lock, checks again,
/// then runs the loader and inserts while still holding it, so two threads
/// missing on the same key compute it once. The loader must therefore not
/// call back into the same cache.
///
/// Eviction follows the configured [`EvictionPolicy`] over insertion order;
/// lookups do not reorder entries, so this is not an LRU.
pub struct BoundedCache<K, V> {
    entries: RwLock<IndexMap<K, V>>,
    maximum_size: Option<usize>,
    policy: Arc<dyn EvictionPolicy>,
    loader: CacheLoader<K, V>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache from `settings` that computes misses with `loader`.
    pub fn new(
        settings: &CacheSettings,
        loader: impl Fn(&K, &ConfigRegistry) -> V + Send + Sync + 'static,
    ) -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
            maximum_size: settings.maximum_size,
            policy: Arc::new(settings.eviction),
            loader: Box::new(loader),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Replaces the eviction policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn EvictionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the cached value for `key`, computing it on a miss.
    pub fn get(&self, key: &K, registry: &ConfigRegistry) -> V {
        if self.is_disabled() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return (self.loader)(key, registry);
        }

        if let Some(value) = self.entries.read().get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value.clone();
        }

        let mut entries = self.entries.write();
        if let Some(value) = entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let value = (self.loader)(key, registry);
        if let Some(maximum_size) = self.maximum_size {
            while entries.len() >= maximum_size {
                let last = entries.len() - 1;
                let mut victim = self.policy.victim(entries.len());
                if victim > last {
                    debug!(
                        victim,
                        last,
                        policy = ?self.policy,
                        "eviction index out of range, evicting newest"
                    );
                    victim = last;
                }
                entries.shift_remove_index(victim);
                trace!(victim, size = entries.len(), "evicted cache entry");
            }
        }
        entries.insert(key.clone(), value.clone());
        value
    }

    /// Returns true when `key` is currently cached. Does not count as an access.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<K, V> BoundedCache<K, V> {
    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns true when the cache has been configured off.
    pub const fn is_disabled(&self) -> bool {
        matches!(self.maximum_size, Some(0))
    }

    /// A formatted summary of size and hit/miss counters.
    pub fn stats(&self) -> String {
        let maximum = self
            .maximum_size
            .map_or_else(|| String::from("unbounded"), |size| size.to_string());
        format!(
            "size={} maximum_size={} hits={} misses={}",
            self.len(),
            maximum,
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl<K, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("stats", &self.stats())
            .field("policy", &self.policy)
            .finish()
    }
}
