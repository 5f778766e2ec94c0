//! The config registry.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::argument::Arguments;
use crate::cache::Caches;
use crate::error::{BindError, Result};

use super::settings::Settings;

/// A configuration object owned by a [`ConfigRegistry`].
///
/// Config types are internally synchronised: the registry hands out shared
/// `Arc<T>` handles and mutation goes through `&self` methods.
pub trait Config: Send + Sync + 'static {
    /// Builds the default instance for `registry`.
    ///
    /// May run more than once when two threads race on first access; only
    /// one result is kept, so construction must not have side effects.
    fn create(registry: &ConfigRegistry) -> Self
    where
        Self: Sized;

    /// Returns an independent deep copy.
    #[must_use]
    fn create_copy(&self) -> Self
    where
        Self: Sized;

    /// Informs the instance of the registry that now owns it.
    fn set_registry(&self, _registry: &ConfigRegistry) {}
}

trait ErasedConfig: Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
    fn copy_erased(&self) -> Arc<dyn ErasedConfig>;
    fn bind(&self, registry: &ConfigRegistry);
    fn type_name(&self) -> &'static str;
}

impl<T: Config> ErasedConfig for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn copy_erased(&self) -> Arc<dyn ErasedConfig> {
        Arc::new(self.create_copy())
    }

    fn bind(&self, registry: &ConfigRegistry) {
        self.set_registry(registry);
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

struct RegistryInner {
    configs: DashMap<TypeId, Arc<dyn ErasedConfig>>,
}

/// A per-session container of configuration objects.
///
/// Cloning the handle shares the same registry; use
/// [`create_copy`](Self::create_copy) to fork an independent one.
#[derive(Clone)]
pub struct ConfigRegistry {
    inner: Arc<RegistryInner>,
}

impl ConfigRegistry {
    /// Creates an empty registry. Configs are created on first access.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                configs: DashMap::new(),
            }),
        }
    }

    /// Creates a registry seeded from `settings`.
    #[must_use]
    pub fn with_settings(settings: &Settings) -> Self {
        let registry = Self::new();
        registry.get::<Caches>().apply(&settings.cache);
        registry.get::<Arguments>().apply(&settings.arguments);
        registry
    }

    /// Returns the instance of `T`, creating it on first access.
    pub fn get<T: Config>(&self) -> Arc<T> {
        let key = TypeId::of::<T>();
        if let Some(existing) = self.inner.configs.get(&key) {
            return downcast::<T>(Arc::clone(existing.value()));
        }

        // Built without holding any map lock: `create` may read other configs.
        let created = T::create(self);
        created.set_registry(self);
        let created: Arc<dyn ErasedConfig> = Arc::new(created);
        let retained = Arc::clone(self.inner.configs.entry(key).or_insert(created).value());
        debug!(config = retained.type_name(), "realized config");
        downcast::<T>(retained)
    }

    /// Runs `configure` against the instance of `T`.
    pub fn configure<T: Config>(&self, configure: impl FnOnce(&T)) -> &Self {
        configure(&self.get::<T>());
        self
    }

    /// Returns true when `T` has already been created in this registry.
    #[must_use]
    pub fn is_realized<T: Config>(&self) -> bool {
        self.inner.configs.contains_key(&TypeId::of::<T>())
    }

    /// Number of configs created so far.
    #[must_use]
    pub fn realized_count(&self) -> usize {
        self.inner.configs.len()
    }

    /// Forks the registry.
    ///
    /// Every realised config is deep-copied into the new registry and told
    /// about its new owner. Configs never accessed in `self` stay unrealised
    /// in the copy.
    #[must_use]
    pub fn create_copy(&self) -> Self {
        let snapshot: Vec<(TypeId, Arc<dyn ErasedConfig>)> = self
            .inner
            .configs
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let copy = Self::new();
        let copies: Vec<Arc<dyn ErasedConfig>> = snapshot
            .iter()
            .map(|(key, config)| {
                let copied = config.copy_erased();
                copy.inner.configs.insert(*key, Arc::clone(&copied));
                copied
            })
            .collect();
        for copied in &copies {
            copied.bind(&copy);
        }

        debug!(configs = copies.len(), "forked config registry");
        copy
    }

    fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&'static str> = self
            .inner
            .configs
            .iter()
            .map(|entry| entry.value().type_name())
            .collect();
        names.sort_unstable();
        f.debug_struct("ConfigRegistry").field("configs", &names).finish()
    }
}

fn downcast<T: Config>(erased: Arc<dyn ErasedConfig>) -> Arc<T> {
    match erased.into_any().downcast::<T>() {
        Ok(config) => config,
        Err(_) => unreachable!("config stored under a foreign TypeId"),
    }
}

/// A weak back-reference from a config object to its owning registry.
///
/// Weak so that a registry and its configs never keep each other alive.
#[derive(Default)]
pub struct RegistryRef(RwLock<Weak<RegistryInner>>);

impl RegistryRef {
    /// Creates an unbound reference.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reference bound to `registry`.
    #[must_use]
    pub fn to(registry: &ConfigRegistry) -> Self {
        Self(RwLock::new(registry.downgrade()))
    }

    /// Points the reference at `registry`.
    pub fn set(&self, registry: &ConfigRegistry) {
        *self.0.write() = registry.downgrade();
    }

    /// Returns the owning registry.
    pub fn get(&self) -> Result<ConfigRegistry> {
        self.0
            .read()
            .upgrade()
            .map(|inner| ConfigRegistry { inner })
            .ok_or(BindError::RegistryClosed)
    }
}

impl fmt::Debug for RegistryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self.0.read().strong_count() > 0;
        f.debug_tuple("RegistryRef").field(&bound).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    #[derive(Debug)]
    struct Greeting {
        text: Mutex<String>,
        owner: RegistryRef,
    }

    impl Greeting {
        fn text(&self) -> String {
            self.text.lock().clone()
        }

        fn set_text(&self, text: &str) {
            *self.text.lock() = String::from(text);
        }
    }

    impl Config for Greeting {
        fn create(_registry: &ConfigRegistry) -> Self {
            Self {
                text: Mutex::new(String::from("hello")),
                owner: RegistryRef::new(),
            }
        }

        fn create_copy(&self) -> Self {
            Self {
                text: Mutex::new(self.text()),
                owner: RegistryRef::new(),
            }
        }

        fn set_registry(&self, registry: &ConfigRegistry) {
            self.owner.set(registry);
        }
    }

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Config for Counted {
        fn create(_registry: &ConfigRegistry) -> Self {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Self
        }

        fn create_copy(&self) -> Self {
            Self
        }
    }

    #[test]
    fn test_get_is_lazy_and_stable() {
        let registry = ConfigRegistry::new();
        assert!(!registry.is_realized::<Greeting>());
        let first = registry.get::<Greeting>();
        let second = registry.get::<Greeting>();
        assert!(registry.is_realized::<Greeting>());
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_set_registry_on_create() {
        let registry = ConfigRegistry::new();
        let greeting = registry.get::<Greeting>();
        let owner = greeting.owner.get().unwrap();
        assert!(Arc::ptr_eq(&owner.inner, &registry.inner));
    }

    #[test]
    fn test_fork_isolation() {
        let parent = ConfigRegistry::new();
        parent.get::<Greeting>().set_text("parent");
        let child = parent.create_copy();

        parent.get::<Greeting>().set_text("changed in parent");
        assert_eq!(child.get::<Greeting>().text(), "parent");

        child.get::<Greeting>().set_text("changed in child");
        assert_eq!(parent.get::<Greeting>().text(), "changed in parent");
    }

    #[test]
    fn test_fork_informs_copies_of_new_owner() {
        let parent = ConfigRegistry::new();
        parent.get::<Greeting>();
        let child = parent.create_copy();
        let owner = child.get::<Greeting>().owner.get().unwrap();
        assert!(Arc::ptr_eq(&owner.inner, &child.inner));
    }

    #[test]
    fn test_fork_preserves_laziness() {
        let parent = ConfigRegistry::new();
        parent.get::<Greeting>();
        let child = parent.create_copy();
        assert!(child.is_realized::<Greeting>());
        assert!(!child.is_realized::<Counted>());
        assert_eq!(child.realized_count(), 1);
    }

    #[test]
    fn test_concurrent_first_access_keeps_one_instance() {
        let registry = ConfigRegistry::new();
        let handles: Vec<Arc<Counted>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.get::<Counted>()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        for handle in &handles {
            assert!(Arc::ptr_eq(handle, &handles[0]));
        }
        assert!(CREATED.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_registry_ref_after_drop() {
        let reference = {
            let registry = ConfigRegistry::new();
            RegistryRef::to(&registry)
        };
        assert!(matches!(reference.get(), Err(BindError::RegistryClosed)));
    }
}
