//! Qualifier discovery for declared properties.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::cache::{BoundedCache, Caches};
use crate::config::{Config, ConfigRegistry, RegistryRef};
use crate::error::Result;
use crate::types::{QualifiedType, Qualifier, QualifierSet, TypeDescriptor};

/// A property as declared on its owner type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredElement {
    owner: TypeDescriptor,
    name: String,
    declared: QualifiedType,
}

impl DeclaredElement {
    /// Describes the property `name` of `owner`, declared as `declared`.
    #[must_use]
    pub fn new(owner: TypeDescriptor, name: impl Into<String>, declared: QualifiedType) -> Self {
        Self {
            owner,
            name: name.into(),
            declared,
        }
    }

    #[must_use]
    pub const fn owner(&self) -> &TypeDescriptor {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn declared(&self) -> &QualifiedType {
        &self.declared
    }
}

/// Inspects a declared element and reports the qualifiers it carries.
pub trait QualifierStrategy: Send + Sync + fmt::Debug {
    fn discover(&self, element: &DeclaredElement) -> QualifierSet;
}

/// Reports the qualifiers written on the declaration itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredQualifiers;

impl QualifierStrategy for DeclaredQualifiers {
    fn discover(&self, element: &DeclaredElement) -> QualifierSet {
        element.declared.qualifiers().clone()
    }
}

/// Attaches a qualifier to one named property of one owner type.
///
/// For types whose declarations cannot be annotated.
#[derive(Debug, Clone)]
pub struct PropertyQualifier {
    owner: TypeDescriptor,
    name: String,
    qualifier: Qualifier,
}

impl PropertyQualifier {
    #[must_use]
    pub fn new(owner: TypeDescriptor, name: impl Into<String>, qualifier: Qualifier) -> Self {
        Self {
            owner,
            name: name.into(),
            qualifier,
        }
    }
}

impl QualifierStrategy for PropertyQualifier {
    fn discover(&self, element: &DeclaredElement) -> QualifierSet {
        let mut found = QualifierSet::new();
        if element.owner == self.owner && element.name == self.name {
            found.insert(self.qualifier);
        }
        found
    }
}

type QualifierCache = BoundedCache<DeclaredElement, QualifierSet>;

/// Resolves the effective qualified type of declared properties.
///
/// Every registered strategy is asked and the results are unioned. Results
/// are memoised per element in a bounded cache built from the registry's
/// [`Caches`] settings on first use.
pub struct Qualifiers {
    registry: RegistryRef,
    strategies: RwLock<Vec<Arc<dyn QualifierStrategy>>>,
    cache: OnceLock<QualifierCache>,
}

impl Qualifiers {
    /// Adds a discovery strategy and forgets memoised results.
    pub fn register(&self, strategy: Arc<dyn QualifierStrategy>) -> &Self {
        self.strategies.write().push(strategy);
        if let Some(cache) = self.cache.get() {
            cache.clear();
        }
        self
    }

    /// Runs every strategy against `element`, bypassing the cache.
    pub fn discover(&self, element: &DeclaredElement) -> QualifierSet {
        let strategies = self.strategies.read().clone();
        strategies.iter().fold(QualifierSet::new(), |mut found, strategy| {
            found.extend_from(&strategy.discover(element));
            found
        })
    }

    /// The declared type of `element` with its discovered qualifiers.
    pub fn qualify(&self, element: &DeclaredElement) -> Result<QualifiedType> {
        let registry = self.registry.get()?;
        let qualifiers = self.cache(&registry).get(element, &registry);
        Ok(element.declared.with_qualifiers(qualifiers))
    }

    /// Size and hit/miss summary of the memo cache.
    pub fn stats(&self) -> String {
        self.cache
            .get()
            .map_or_else(|| String::from("not built"), BoundedCache::stats)
    }

    fn cache(&self, registry: &ConfigRegistry) -> &QualifierCache {
        self.cache.get_or_init(|| {
            registry
                .get::<Caches>()
                .build(|element: &DeclaredElement, registry: &ConfigRegistry| {
                    registry.get::<Self>().discover(element)
                })
        })
    }
}

impl Config for Qualifiers {
    fn create(registry: &ConfigRegistry) -> Self {
        Self {
            registry: RegistryRef::to(registry),
            strategies: RwLock::new(vec![Arc::new(DeclaredQualifiers)]),
            cache: OnceLock::new(),
        }
    }

    fn create_copy(&self) -> Self {
        Self {
            registry: RegistryRef::new(),
            strategies: RwLock::new(self.strategies.read().clone()),
            cache: OnceLock::new(),
        }
    }

    fn set_registry(&self, registry: &ConfigRegistry) {
        self.registry.set(registry);
    }
}

impl fmt::Debug for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Qualifiers")
            .field("strategies", &self.strategies.read().len())
            .field("cache", &self.stats())
            .finish_non_exhaustive()
    }
}
