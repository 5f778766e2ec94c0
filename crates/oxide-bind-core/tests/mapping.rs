//! Reading rows back through column mappers, row mappers and collectors.

mod common;

use std::sync::Arc;

use common::text;
use indexmap::IndexMap;
use oxide_bind_core::mapper::{
    Collectors, ColumnMapper, ColumnMappers, ResultRow, Row, RowMapper, RowMappers,
    ValueColumnMapperFactory, VecCollectorFactory,
};
use oxide_bind_core::{
    AnyValue, BindError, ConfigRegistry, QualifiedType, Qualifier, Result, SqlValue,
};

#[derive(Debug, Clone, PartialEq)]
struct Account {
    id: i64,
    owner: String,
}

#[derive(Debug)]
struct AccountMapper;

impl RowMapper for AccountMapper {
    fn map(&self, row: &dyn ResultRow, config: &ConfigRegistry) -> Result<Option<AnyValue>> {
        let columns = config.get::<ColumnMappers>();
        let read = |name: &str, ty: QualifiedType| -> Result<Option<AnyValue>> {
            let index = row.column_index(name).ok_or_else(|| BindError::ColumnOutOfRange {
                index: row.column_count(),
                count: row.column_count(),
            })?;
            let mapper = columns.find_for(&ty)?.ok_or(BindError::NoColumnMapper(ty))?;
            mapper.map(row, index, config)
        };
        let id = read("id", QualifiedType::of::<i64>())?
            .and_then(|v| v.downcast_ref::<i64>().copied())
            .unwrap_or_default();
        let owner = read("owner", QualifiedType::of::<String>())?
            .and_then(|v| v.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        Ok(Some(Arc::new(Account { id, owner })))
    }
}

fn rows() -> Vec<Row> {
    vec![
        Row::new().with("ID", SqlValue::Int(1)).with("OWNER", text("ada")),
        Row::new().with("ID", SqlValue::Int(2)).with("OWNER", text("grace")),
    ]
}

#[test]
fn test_row_mapper_uses_column_mappers() {
    let config = ConfigRegistry::new();
    config
        .get::<RowMappers>()
        .register_mapper(QualifiedType::of::<Account>(), Arc::new(AccountMapper));
    let account = config.get::<RowMappers>().map_to::<Account>(&rows()[1]).unwrap();
    assert_eq!(
        account,
        Some(Account {
            id: 2,
            owner: String::from("grace"),
        })
    );
}

#[test]
fn test_collect_custom_rows() {
    let config = ConfigRegistry::new();
    config
        .get::<RowMappers>()
        .register_mapper(QualifiedType::of::<Account>(), Arc::new(AccountMapper));
    config
        .get::<Collectors>()
        .register(Arc::new(VecCollectorFactory::<Account>::new()));

    let accounts: Vec<Account> = config.get::<Collectors>().collect_into(&rows()).unwrap();
    let owners: Vec<&str> = accounts.iter().map(|a| a.owner.as_str()).collect();
    assert_eq!(owners, vec!["ada", "grace"]);
}

#[test]
fn test_map_rows_to_maps() {
    let config = ConfigRegistry::new();
    let maps = config
        .get::<Collectors>()
        .register(Arc::new(VecCollectorFactory::<IndexMap<String, SqlValue>>::new()))
        .collect_into::<Vec<IndexMap<String, SqlValue>>, _>(&rows())
        .unwrap();
    assert_eq!(maps.len(), 2);
    assert_eq!(maps[0]["owner"], text("ada"));
}

#[test]
fn test_qualified_column_mapper() {
    let config = ConfigRegistry::new();
    let nvarchar = QualifiedType::of::<String>().with(Qualifier::NVarchar);
    let mapper = config.get::<ColumnMappers>().find_for(&nvarchar).unwrap().unwrap();
    let row = Row::new().with("n", text("ü"));
    let value = mapper.map(&row, 0, &config).unwrap().unwrap();
    assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("ü"));

    let json = QualifiedType::of::<String>().with(Qualifier::Json);
    assert!(config.get::<ColumnMappers>().find_for(&json).unwrap().is_none());

    config
        .get::<ColumnMappers>()
        .register(Arc::new(ValueColumnMapperFactory::<String>::new().qualified(Qualifier::Json)));
    assert!(config.get::<ColumnMappers>().find_for(&json).unwrap().is_some());
}

#[test]
fn test_missing_row_mapper() {
    let config = ConfigRegistry::new();
    let result = config.get::<RowMappers>().map_to::<Account>(&rows()[0]);
    assert!(matches!(result, Err(BindError::NoRowMapper(_))));
}

#[test]
fn test_column_mapper_trait_object() {
    let config = ConfigRegistry::new();
    let mapper: Arc<dyn ColumnMapper> = config
        .get::<ColumnMappers>()
        .find_for(&QualifiedType::of::<bool>())
        .unwrap()
        .unwrap();
    let row = Row::new().with("flag", SqlValue::Int(1));
    let value = mapper.map(&row, 0, &config).unwrap().unwrap();
    assert_eq!(value.downcast_ref::<bool>(), Some(&true));
}

// =============================================================================
// Test: Late column mapper registration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct Celsius(f64);

#[derive(Debug)]
struct CelsiusMapper;

impl ColumnMapper for CelsiusMapper {
    fn map(
        &self,
        row: &dyn ResultRow,
        column: usize,
        _config: &ConfigRegistry,
    ) -> Result<Option<AnyValue>> {
        match row.value(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Float(degrees) => Ok(Some(Arc::new(Celsius(*degrees)))),
            other => Err(BindError::ColumnType {
                column: row.column_name(column).unwrap_or("?").to_string(),
                expected: "Celsius",
                found: other.kind().to_string(),
            }),
        }
    }
}

#[test]
fn test_column_mapper_registered_after_row_miss() {
    let config = ConfigRegistry::new();
    let reading = Row::new().with("temperature", SqlValue::Float(21.5));
    let mappers = config.get::<RowMappers>();

    let before = mappers.map_to::<Celsius>(&reading);
    assert!(matches!(before, Err(BindError::NoRowMapper(_))));

    config
        .get::<ColumnMappers>()
        .register_mapper(QualifiedType::of::<Celsius>(), Arc::new(CelsiusMapper));
    assert_eq!(mappers.map_to::<Celsius>(&reading).unwrap(), Some(Celsius(21.5)));
}

#[test]
fn test_collect_after_late_column_mapper() {
    let config = ConfigRegistry::new();
    let readings = vec![
        Row::new().with("temperature", SqlValue::Float(18.0)),
        Row::new().with("temperature", SqlValue::Float(20.0)),
    ];
    config
        .get::<Collectors>()
        .register(Arc::new(VecCollectorFactory::<Celsius>::new()));
    assert!(config.get::<Collectors>().collect_into::<Vec<Celsius>, _>(&readings).is_err());

    config
        .get::<ColumnMappers>()
        .register_mapper(QualifiedType::of::<Celsius>(), Arc::new(CelsiusMapper));
    let collected: Vec<Celsius> = config.get::<Collectors>().collect_into(&readings).unwrap();
    assert_eq!(collected, vec![Celsius(18.0), Celsius(20.0)]);
}
