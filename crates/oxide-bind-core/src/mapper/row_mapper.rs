//! Row mappers and the `RowMappers` config.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::cache::ChainMemo;
use crate::chain::FactoryChain;
use crate::config::{Config, ConfigRegistry, RegistryRef};
use crate::error::{BindError, Result};
use crate::types::{AnyValue, QualifiedType};
use crate::value::SqlValue;

use super::column::{ColumnMapper, ColumnMappers};
use super::row::ResultRow;

/// Turns a whole row into one value.
pub trait RowMapper: Send + Sync + fmt::Debug {
    /// Maps `row`. `None` stands for a null result.
    fn map(&self, row: &dyn ResultRow, config: &ConfigRegistry) -> Result<Option<AnyValue>>;
}

/// Builds row mappers for the types it recognises.
pub trait RowMapperFactory: Send + Sync + fmt::Debug {
    /// Returns a mapper for `ty`, or `None` if this factory does not handle it.
    fn build(
        &self,
        ty: &QualifiedType,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn RowMapper>>>;
}

/// Maps the first column of a row with a column mapper.
#[derive(Debug)]
pub struct SingleColumnMapper {
    column: Arc<dyn ColumnMapper>,
}

impl SingleColumnMapper {
    /// Wraps `column`.
    #[must_use]
    pub fn new(column: Arc<dyn ColumnMapper>) -> Self {
        Self { column }
    }
}

impl RowMapper for SingleColumnMapper {
    fn map(&self, row: &dyn ResultRow, config: &ConfigRegistry) -> Result<Option<AnyValue>> {
        self.column.map(row, 0, config)
    }
}

/// Maps a row to an `IndexMap<String, SqlValue>` keyed by column name.
///
/// Column order is preserved. Unnamed columns are keyed by their index.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapRowMapper;

impl RowMapper for MapRowMapper {
    fn map(&self, row: &dyn ResultRow, _config: &ConfigRegistry) -> Result<Option<AnyValue>> {
        let mut columns: IndexMap<String, SqlValue> = IndexMap::with_capacity(row.column_count());
        for index in 0..row.column_count() {
            let name = row
                .column_name(index)
                .map_or_else(|| index.to_string(), str::to_lowercase);
            columns.insert(name, row.value(index)?.clone());
        }
        Ok(Some(Arc::new(columns)))
    }
}

#[derive(Debug)]
struct InstanceRowMapperFactory {
    ty: QualifiedType,
    mapper: Arc<dyn RowMapper>,
}

impl RowMapperFactory for InstanceRowMapperFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn RowMapper>>> {
        Ok((*ty == self.ty).then(|| Arc::clone(&self.mapper)))
    }
}

/// Resolves types to [`RowMapper`]s.
///
/// When no row mapper factory claims a type, the [`ColumnMappers`] of the
/// same registry are asked and a hit is wrapped in a [`SingleColumnMapper`].
/// Only the row mapper chain's own results are memoised here; the column
/// side is asked again on every row-side miss.
pub struct RowMappers {
    registry: RegistryRef,
    factories: RwLock<FactoryChain<dyn RowMapperFactory>>,
    cache: ChainMemo<QualifiedType, Option<Arc<dyn RowMapper>>>,
}

impl RowMappers {
    /// Registers a factory ahead of every factory already registered.
    pub fn register(&self, factory: Arc<dyn RowMapperFactory>) -> &Self {
        let mut factories = self.factories.write();
        factories.register(factory);
        self.cache.invalidate();
        drop(factories);
        self
    }

    /// Registers `mapper` for exactly `ty`.
    pub fn register_mapper(&self, ty: QualifiedType, mapper: Arc<dyn RowMapper>) -> &Self {
        self.register(Arc::new(InstanceRowMapperFactory { ty, mapper }))
    }

    /// Finds a mapper for `ty`.
    pub fn find_for(&self, ty: &QualifiedType) -> Result<Option<Arc<dyn RowMapper>>> {
        let registry = self.registry.get()?;
        let found = match self.cache.get(ty) {
            Some(cached) => cached,
            None => {
                let (generation, chain) = {
                    let factories = self.factories.read();
                    (self.cache.generation(), factories.clone())
                };
                let found = chain.find_first(|factory| {
                    factory
                        .build(ty, &registry)
                        .map_err(|source| BindError::factory_failed(factory, ty, "row", source))
                })?;
                self.cache.insert(generation, ty.clone(), found)
            }
        };
        if found.is_some() {
            return Ok(found);
        }
        let column = registry
            .get::<ColumnMappers>()
            .find_for(ty)?
            .map(|column| Arc::new(SingleColumnMapper::new(column)) as Arc<dyn RowMapper>);
        if column.is_none() {
            debug!(ty = %ty, "no row mapper matched");
        }
        Ok(column)
    }

    /// Maps `row` to `T`.
    pub fn map_to<T: Any + Clone>(&self, row: &dyn ResultRow) -> Result<Option<T>> {
        let ty = QualifiedType::of::<T>();
        let mapper = self
            .find_for(&ty)?
            .ok_or_else(|| BindError::NoRowMapper(ty.clone()))?;
        let registry = self.registry.get()?;
        match mapper.map(row, &registry)? {
            None => Ok(None),
            Some(value) => value
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| BindError::TypeMismatch {
                    expected: ty.to_string(),
                    found: format!("{mapper:?}"),
                }),
        }
    }
}

impl Config for RowMappers {
    fn create(registry: &ConfigRegistry) -> Self {
        let mut factories: FactoryChain<dyn RowMapperFactory> = FactoryChain::new();
        factories.register(Arc::new(InstanceRowMapperFactory {
            ty: QualifiedType::of::<IndexMap<String, SqlValue>>(),
            mapper: Arc::new(MapRowMapper),
        }));
        Self {
            registry: RegistryRef::to(registry),
            factories: RwLock::new(factories),
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

impl fmt::Debug for RowMappers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMappers")
            .field("factories", &self.factories.read().len())
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Row;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    #[derive(Debug)]
    struct UserMapper;

    impl RowMapper for UserMapper {
        fn map(&self, row: &dyn ResultRow, _config: &ConfigRegistry) -> Result<Option<AnyValue>> {
            let id = match row.value(0)? {
                SqlValue::Int(n) => *n,
                other => {
                    return Err(BindError::ColumnType {
                        column: String::from("id"),
                        expected: "i64",
                        found: other.kind().to_string(),
                    })
                }
            };
            let name = match row.value(1)? {
                SqlValue::Text(s) => s.clone(),
                _ => String::new(),
            };
            Ok(Some(Arc::new(User { id, name })))
        }
    }

    fn user_row() -> Row {
        Row::new()
            .with("ID", SqlValue::Int(7))
            .with("Name", SqlValue::Text(String::from("ada")))
    }

    #[test]
    fn test_registered_mapper() {
        let registry = ConfigRegistry::new();
        let mappers = registry.get::<RowMappers>();
        mappers.register_mapper(QualifiedType::of::<User>(), Arc::new(UserMapper));
        let user = mappers.map_to::<User>(&user_row()).unwrap();
        assert_eq!(
            user,
            Some(User {
                id: 7,
                name: String::from("ada"),
            })
        );
    }

    #[test]
    fn test_falls_back_to_column_mapper() {
        let registry = ConfigRegistry::new();
        let mappers = registry.get::<RowMappers>();
        assert_eq!(mappers.map_to::<i64>(&user_row()).unwrap(), Some(7));
    }

    #[test]
    fn test_map_row_mapper() {
        let registry = ConfigRegistry::new();
        let map = registry
            .get::<RowMappers>()
            .map_to::<IndexMap<String, SqlValue>>(&user_row())
            .unwrap()
            .unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name"]);
        assert_eq!(map["name"], SqlValue::Text(String::from("ada")));
    }

    #[test]
    fn test_unknown_type_is_error() {
        #[derive(Clone)]
        struct Unmapped;
        let registry = ConfigRegistry::new();
        let result = registry.get::<RowMappers>().map_to::<Unmapped>(&user_row());
        assert!(matches!(result, Err(BindError::NoRowMapper(_))));
    }
}
