//! Column mappers and the `ColumnMappers` config.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::ChainMemo;
use crate::chain::FactoryChain;
use crate::config::{Config, ConfigRegistry, RegistryRef};
use crate::error::{BindError, Result};
use crate::types::{AnyValue, QualifiedType, Qualifier};
use crate::value::{FromSqlValue, SqlValue};

use super::row::ResultRow;

/// Reads one column of a row as a typed value.
pub trait ColumnMapper: Send + Sync + fmt::Debug {
    /// Maps the column at `column`. SQL NULL maps to `None`.
    fn map(
        &self,
        row: &dyn ResultRow,
        column: usize,
        config: &ConfigRegistry,
    ) -> Result<Option<AnyValue>>;
}

/// Builds column mappers for the types it recognises.
pub trait ColumnMapperFactory: Send + Sync + fmt::Debug {
    /// Returns a mapper for `ty`, or `None` if this factory does not handle it.
    fn build(
        &self,
        ty: &QualifiedType,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn ColumnMapper>>>;
}

/// Maps columns to `T` through [`FromSqlValue`].
pub struct ValueColumnMapperFactory<T> {
    ty: QualifiedType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromSqlValue + Any + Send + Sync> ValueColumnMapperFactory<T> {
    /// Creates a factory for unqualified `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ty: QualifiedType::of::<T>(),
            _marker: PhantomData,
        }
    }

    /// Restricts the factory to `T` carrying `qualifier`.
    #[must_use]
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.ty = self.ty.with(qualifier);
        self
    }
}

impl<T: FromSqlValue + Any + Send + Sync> Default for ValueColumnMapperFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromSqlValue + Any + Send + Sync> ColumnMapperFactory for ValueColumnMapperFactory<T> {
    fn build(
        &self,
        ty: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn ColumnMapper>>> {
        if *ty != self.ty {
            return Ok(None);
        }
        Ok(Some(Arc::new(ValueColumnMapper::<T>(PhantomData))))
    }
}

impl<T> fmt::Debug for ValueColumnMapperFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueColumnMapperFactory<{}>", self.ty)
    }
}

struct ValueColumnMapper<T>(PhantomData<fn() -> T>);

impl<T: FromSqlValue + Any + Send + Sync> ColumnMapper for ValueColumnMapper<T> {
    fn map(
        &self,
        row: &dyn ResultRow,
        column: usize,
        _config: &ConfigRegistry,
    ) -> Result<Option<AnyValue>> {
        let value = row.value(column)?;
        if value.is_null() {
            return Ok(None);
        }
        match T::from_sql_value(value) {
            Some(mapped) => Ok(Some(Arc::new(mapped))),
            None => Err(BindError::ColumnType {
                column: row.column_name(column).unwrap_or("?").to_string(),
                expected: std::any::type_name::<T>(),
                found: value.kind().to_string(),
            }),
        }
    }
}

impl<T> fmt::Debug for ValueColumnMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueColumnMapper<{}>", std::any::type_name::<T>())
    }
}

/// Hands out one fixed mapper for one exact type.
#[derive(Debug)]
pub struct InstanceColumnMapperFactory {
    ty: QualifiedType,
    mapper: Arc<dyn ColumnMapper>,
}

impl InstanceColumnMapperFactory {
    /// Maps `ty` with `mapper`.
    #[must_use]
    pub fn new(ty: QualifiedType, mapper: Arc<dyn ColumnMapper>) -> Self {
        Self { ty, mapper }
    }
}

impl ColumnMapperFactory for InstanceColumnMapperFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn ColumnMapper>>> {
        Ok((*ty == self.ty).then(|| Arc::clone(&self.mapper)))
    }
}

fn builtin_factories() -> FactoryChain<dyn ColumnMapperFactory> {
    let mut chain: FactoryChain<dyn ColumnMapperFactory> = FactoryChain::new();
    chain.register(Arc::new(ValueColumnMapperFactory::<SqlValue>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<bool>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<i8>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<i16>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<i32>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<i64>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<u8>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<u16>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<u32>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<f64>::new()));
    chain.register(Arc::new(ValueColumnMapperFactory::<String>::new()));
    chain.register(Arc::new(
        ValueColumnMapperFactory::<String>::new().qualified(Qualifier::NVarchar),
    ));
    chain.register(Arc::new(ValueColumnMapperFactory::<Vec<u8>>::new()));
    chain
}

/// Resolves types to [`ColumnMapper`]s through a chain of factories.
///
/// Lookups are memoised per type, including misses, until the next
/// registration.
pub struct ColumnMappers {
    registry: RegistryRef,
    factories: RwLock<FactoryChain<dyn ColumnMapperFactory>>,
    cache: ChainMemo<QualifiedType, Option<Arc<dyn ColumnMapper>>>,
}

impl ColumnMappers {
    /// Registers a factory ahead of every factory already registered.
    pub fn register(&self, factory: Arc<dyn ColumnMapperFactory>) -> &Self {
        let mut factories = self.factories.write();
        factories.register(factory);
        self.cache.invalidate();
        drop(factories);
        self
    }

    /// Registers `mapper` for exactly `ty`.
    pub fn register_mapper(&self, ty: QualifiedType, mapper: Arc<dyn ColumnMapper>) -> &Self {
        self.register(Arc::new(InstanceColumnMapperFactory::new(ty, mapper)))
    }

    /// Finds a mapper for `ty`.
    pub fn find_for(&self, ty: &QualifiedType) -> Result<Option<Arc<dyn ColumnMapper>>> {
        if let Some(cached) = self.cache.get(ty) {
            return Ok(cached);
        }
        let registry = self.registry.get()?;
        let (generation, chain) = {
            let factories = self.factories.read();
            (self.cache.generation(), factories.clone())
        };
        let found = chain.find_first(|factory| {
            factory
                .build(ty, &registry)
                .map_err(|source| BindError::factory_failed(factory, ty, "column", source))
        })?;
        if found.is_none() {
            debug!(ty = %ty, "no column mapper factory matched");
        }
        Ok(self.cache.insert(generation, ty.clone(), found))
    }
}

impl Config for ColumnMappers {
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

impl fmt::Debug for ColumnMappers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMappers")
            .field("factories", &self.factories.read().len())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
