//! Arguments and the sink they write into.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Result;
use crate::value::{SqlType, SqlValue};

/// The statement-side target arguments bind into.
///
/// Implemented by the statement execution layer. Positions are zero-based.
pub trait ParameterSink {
    /// Binds `value` at `position`, tagged with its storage type if known.
    fn bind(&mut self, position: usize, value: SqlValue, sql_type: Option<SqlType>) -> Result<()>;

    /// Binds a null. A typed null lets the driver send the right wire type.
    fn bind_null(&mut self, position: usize, sql_type: Option<SqlType>) -> Result<()> {
        self.bind(position, SqlValue::Null, sql_type)
    }
}

/// A deferred write of one value.
pub trait Argument: Send + Sync + fmt::Debug {
    /// Writes the value into `sink` at `position`.
    fn apply(&self, position: usize, sink: &mut dyn ParameterSink) -> Result<()>;
}

/// A concrete value with its storage type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueArgument {
    value: SqlValue,
    sql_type: Option<SqlType>,
}

impl ValueArgument {
    /// Creates an argument for `value`.
    #[must_use]
    pub const fn new(value: SqlValue, sql_type: Option<SqlType>) -> Self {
        Self { value, sql_type }
    }

    /// The value that will be bound.
    #[must_use]
    pub const fn value(&self) -> &SqlValue {
        &self.value
    }
}

impl Argument for ValueArgument {
    fn apply(&self, position: usize, sink: &mut dyn ParameterSink) -> Result<()> {
        sink.bind(position, self.value.clone(), self.sql_type)
    }
}

/// A null, typed or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullArgument {
    sql_type: Option<SqlType>,
}

impl NullArgument {
    /// A null of the given storage type.
    #[must_use]
    pub const fn typed(sql_type: SqlType) -> Self {
        Self {
            sql_type: Some(sql_type),
        }
    }

    /// A null whose storage type is left to the driver.
    #[must_use]
    pub const fn untyped() -> Self {
        Self { sql_type: None }
    }

    /// The storage type, if any.
    #[must_use]
    pub const fn sql_type(&self) -> Option<SqlType> {
        self.sql_type
    }
}

impl Argument for NullArgument {
    fn apply(&self, position: usize, sink: &mut dyn ParameterSink) -> Result<()> {
        sink.bind_null(position, self.sql_type)
    }
}

/// One recorded parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// The bound value.
    pub value: SqlValue,
    /// The storage type the argument declared.
    pub sql_type: Option<SqlType>,
}

/// An in-memory sink that records what was bound where.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    params: BTreeMap<usize, BoundParameter>,
}

impl BoundParameters {
    /// Creates an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The parameter bound at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&BoundParameter> {
        self.params.get(&position)
    }

    /// The value bound at `position`.
    #[must_use]
    pub fn value(&self, position: usize) -> Option<&SqlValue> {
        self.params.get(&position).map(|p| &p.value)
    }

    /// Number of bound positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true when nothing was bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The bound values ordered by position.
    #[must_use]
    pub fn values(&self) -> Vec<SqlValue> {
        self.params.values().map(|p| p.value.clone()).collect()
    }
}

impl ParameterSink for BoundParameters {
    fn bind(&mut self, position: usize, value: SqlValue, sql_type: Option<SqlType>) -> Result<()> {
        self.params.insert(position, BoundParameter { value, sql_type });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_argument_applies() {
        let mut sink = BoundParameters::new();
        ValueArgument::new(SqlValue::Int(5), Some(SqlType::Integer))
            .apply(0, &mut sink)
            .unwrap();
        assert_eq!(
            sink.get(0),
            Some(&BoundParameter {
                value: SqlValue::Int(5),
                sql_type: Some(SqlType::Integer),
            })
        );
    }

    #[test]
    fn test_typed_and_untyped_null() {
        let mut sink = BoundParameters::new();
        NullArgument::typed(SqlType::Varchar).apply(0, &mut sink).unwrap();
        NullArgument::untyped().apply(1, &mut sink).unwrap();
        assert_eq!(sink.get(0).unwrap().sql_type, Some(SqlType::Varchar));
        assert_eq!(sink.get(1).unwrap().sql_type, None);
        assert_eq!(sink.values(), vec![SqlValue::Null, SqlValue::Null]);
    }
}
