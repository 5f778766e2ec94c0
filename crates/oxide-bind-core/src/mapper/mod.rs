//! Read-side converters.
//!
//! Column mappers turn one column of a [`ResultRow`] into a typed value, row
//! mappers turn a whole row into one, and collectors gather mapped rows into
//! a container. Each kind resolves through its own factory chain config:
//! [`ColumnMappers`], [`RowMappers`], [`Collectors`].

mod collector;
mod column;
mod row;
mod row_mapper;

pub use collector::{CollectorFactory, Collectors, ResultCollector, VecCollectorFactory};
pub use column::{
    ColumnMapper, ColumnMapperFactory, ColumnMappers, InstanceColumnMapperFactory,
    ValueColumnMapperFactory,
};
pub use row::{ResultRow, Row};
pub use row_mapper::{MapRowMapper, RowMapper, RowMapperFactory, RowMappers, SingleColumnMapper};
