//! Per-registry cache configuration.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{CacheSettings, Config, ConfigRegistry};

use super::bounded::{BoundedCache, EvictionPolicy};

/// Holds the settings that bounded caches in one registry are built with.
///
/// Other configs call [`build`](Self::build) from their `create` so that a
/// registry's caches share one size bound and eviction policy.
#[derive(Debug)]
pub struct Caches {
    settings: RwLock<CacheSettings>,
    policy: RwLock<Option<Arc<dyn EvictionPolicy>>>,
}

impl Caches {
    /// Current settings.
    pub fn settings(&self) -> CacheSettings {
        self.settings.read().clone()
    }

    /// Replaces the settings. Affects caches built afterwards.
    pub fn apply(&self, settings: &CacheSettings) {
        *self.settings.write() = settings.clone();
    }

    /// Sets the maximum size. `Some(0)` disables caching.
    pub fn set_maximum_size(&self, maximum_size: Option<usize>) {
        self.settings.write().maximum_size = maximum_size;
    }

    /// Overrides the eviction order with a custom policy.
    pub fn set_eviction_policy(&self, policy: Arc<dyn EvictionPolicy>) {
        *self.policy.write() = Some(policy);
    }

    /// Builds a cache with the current settings.
    pub fn build<K, V>(
        &self,
        loader: impl Fn(&K, &ConfigRegistry) -> V + Send + Sync + 'static,
    ) -> BoundedCache<K, V>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        let cache = BoundedCache::new(&self.settings(), loader);
        match self.policy.read().clone() {
            Some(policy) => cache.with_policy(policy),
            None => cache,
        }
    }
}

impl Config for Caches {
    fn create(_registry: &ConfigRegistry) -> Self {
        Self {
            settings: RwLock::new(CacheSettings::default()),
            policy: RwLock::new(None),
        }
    }

    fn create_copy(&self) -> Self {
        Self {
            settings: RwLock::new(self.settings()),
            policy: RwLock::new(self.policy.read().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_uses_current_settings() {
        let registry = ConfigRegistry::new();
        let caches = registry.get::<Caches>();
        caches.set_maximum_size(Some(1));
        let cache: BoundedCache<u8, u8> = caches.build(|key: &u8, _registry| *key);
        cache.get(&1, &registry);
        cache.get(&2, &registry);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let registry = ConfigRegistry::new();
        registry.get::<Caches>().set_maximum_size(Some(5));
        let fork = registry.create_copy();
        fork.get::<Caches>().set_maximum_size(None);
        assert_eq!(registry.get::<Caches>().settings().maximum_size, Some(5));
        assert_eq!(fork.get::<Caches>().settings().maximum_size, None);
    }
}
