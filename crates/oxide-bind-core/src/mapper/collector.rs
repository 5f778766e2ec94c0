//! Result collectors and the `Collectors` config.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::ChainMemo;
use crate::chain::FactoryChain;
use crate::config::{Config, ConfigRegistry, RegistryRef};
use crate::error::{BindError, Result};
use crate::types::{AnyValue, QualifiedType};
use crate::value::SqlValue;

use super::row::ResultRow;
use super::row_mapper::RowMappers;

/// Gathers mapped rows into a container.
pub trait ResultCollector: Send + Sync + fmt::Debug {
    /// The type each row is mapped to before collection.
    fn element_type(&self) -> QualifiedType;

    /// Builds the container from the mapped elements, in row order.
    fn collect(&self, elements: Vec<Option<AnyValue>>) -> Result<AnyValue>;
}

/// Builds collectors for container types.
pub trait CollectorFactory: Send + Sync + fmt::Debug {
    /// Returns a collector producing `container`, or `None`.
    fn build(
        &self,
        container: &QualifiedType,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn ResultCollector>>>;
}

/// Collects into `Vec<T>`. Null elements are rejected.
pub struct VecCollectorFactory<T>(PhantomData<fn() -> T>);

impl<T> VecCollectorFactory<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for VecCollectorFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for VecCollectorFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VecCollectorFactory<{}>", std::any::type_name::<T>())
    }
}

impl<T: Any + Clone + Send + Sync> CollectorFactory for VecCollectorFactory<T> {
    fn build(
        &self,
        container: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn ResultCollector>>> {
        if *container != QualifiedType::of::<Vec<T>>() {
            return Ok(None);
        }
        Ok(Some(Arc::new(VecCollector::<T>(PhantomData))))
    }
}

struct VecCollector<T>(PhantomData<fn() -> T>);

impl<T> fmt::Debug for VecCollector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VecCollector<{}>", std::any::type_name::<T>())
    }
}

impl<T: Any + Clone + Send + Sync> ResultCollector for VecCollector<T> {
    fn element_type(&self) -> QualifiedType {
        QualifiedType::of::<T>()
    }

    fn collect(&self, elements: Vec<Option<AnyValue>>) -> Result<AnyValue> {
        let mut out: Vec<T> = Vec::with_capacity(elements.len());
        for element in elements {
            let element = element.ok_or_else(|| BindError::TypeMismatch {
                expected: std::any::type_name::<T>().to_string(),
                found: String::from("null"),
            })?;
            let element = element
                .downcast_ref::<T>()
                .ok_or_else(|| BindError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    found: String::from("a value of another type"),
                })?;
            out.push(element.clone());
        }
        Ok(Arc::new(out))
    }
}

fn builtin_factories() -> FactoryChain<dyn CollectorFactory> {
    let mut chain: FactoryChain<dyn CollectorFactory> = FactoryChain::new();
    chain.register(Arc::new(VecCollectorFactory::<SqlValue>::new()));
    chain.register(Arc::new(VecCollectorFactory::<bool>::new()));
    chain.register(Arc::new(VecCollectorFactory::<i32>::new()));
    chain.register(Arc::new(VecCollectorFactory::<i64>::new()));
    chain.register(Arc::new(VecCollectorFactory::<f64>::new()));
    chain.register(Arc::new(VecCollectorFactory::<String>::new()));
    chain
}

/// Resolves container types to [`ResultCollector`]s.
pub struct Collectors {
    registry: RegistryRef,
    factories: RwLock<FactoryChain<dyn CollectorFactory>>,
    cache: ChainMemo<QualifiedType, Option<Arc<dyn ResultCollector>>>,
}

impl Collectors {
    /// Registers a factory ahead of every factory already registered.
    pub fn register(&self, factory: Arc<dyn CollectorFactory>) -> &Self {
        let mut factories = self.factories.write();
        factories.register(factory);
        self.cache.invalidate();
        drop(factories);
        self
    }

    /// Finds a collector for `container`.
    pub fn find_for(&self, container: &QualifiedType) -> Result<Option<Arc<dyn ResultCollector>>> {
        if let Some(cached) = self.cache.get(container) {
            return Ok(cached);
        }
        let registry = self.registry.get()?;
        let (generation, chain) = {
            let factories = self.factories.read();
            (self.cache.generation(), factories.clone())
        };
        let found = chain.find_first(|factory| {
            factory
                .build(container, &registry)
                .map_err(|source| {
                    BindError::factory_failed(factory, container, "collector", source)
                })
        })?;
        Ok(self.cache.insert(generation, container.clone(), found))
    }

    /// The element type of `container`, if a collector claims it.
    pub fn element_type(&self, container: &QualifiedType) -> Result<Option<QualifiedType>> {
        Ok(self.find_for(container)?.map(|collector| collector.element_type()))
    }

    /// Maps every row to the element type of `container` and collects them.
    pub fn map_rows<R: ResultRow>(
        &self,
        container: &QualifiedType,
        rows: &[R],
    ) -> Result<AnyValue> {
        let collector = self
            .find_for(container)?
            .ok_or_else(|| BindError::NoCollector(container.clone()))?;
        let element = collector.element_type();
        let registry = self.registry.get()?;
        let mapper = registry
            .get::<RowMappers>()
            .find_for(&element)?
            .ok_or(BindError::NoRowMapper(element))?;
        let elements = rows
            .iter()
            .map(|row| mapper.map(row, &registry))
            .collect::<Result<Vec<_>>>()?;
        collector.collect(elements)
    }

    /// Typed form of [`map_rows`](Self::map_rows).
    pub fn collect_into<C: Any + Clone, R: ResultRow>(&self, rows: &[R]) -> Result<C> {
        let container = QualifiedType::of::<C>();
        let collected = self.map_rows(&container, rows)?;
        collected
            .downcast_ref::<C>()
            .cloned()
            .ok_or_else(|| BindError::TypeMismatch {
                expected: container.to_string(),
                found: String::from("collector output of another type"),
            })
    }
}

impl Config for Collectors {
    fn create(registry: &ConfigRegistry) -> Self {
        Self {
            registry: RegistryRef::to(registry),
            factories: RwLock::new(builtin_factories()),
            cache: ChainMemo::new(),
        }
    }

    fn create_copy(&self) -> Self {
        Self {
            registry: RegistryRef::new(),
            factories: RwLock::new(self.factories.read().clone()),
            cache: ChainMemo::new(),
        }
    }

    fn set_registry(&self, registry: &ConfigRegistry) {
        self.registry.set(registry);
    }
}

impl fmt::Debug for Collectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collectors")
            .field("factories", &self.factories.read().len())
            .finish_non_exhaustive()
    }
}
