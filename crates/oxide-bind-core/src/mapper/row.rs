//! Result rows.

use crate::error::{BindError, Result};
use crate::value::SqlValue;

/// One row of a result set, as seen by mappers.
///
/// Implemented by the statement execution layer. Columns are zero-based.
pub trait ResultRow {
    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Name of the column at `index`.
    fn column_name(&self, index: usize) -> Option<&str>;

    /// Value of the column at `index`.
    fn value(&self, index: usize) -> Result<&SqlValue>;

    /// Index of the column named `name`, compared case-insensitively.
    fn column_index(&self, name: &str) -> Option<usize> {
        (0..self.column_count()).find(|&i| {
            self.column_name(i)
                .is_some_and(|column| column.eq_ignore_ascii_case(name))
        })
    }
}

/// An in-memory row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a column.
    pub fn push(&mut self, name: impl Into<String>, value: SqlValue) {
        self.columns.push((name.into(), value));
    }
}

impl ResultRow for Row {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|(name, _)| name.as_str())
    }

    fn value(&self, index: usize) -> Result<&SqlValue> {
        self.columns
            .get(index)
            .map(|(_, value)| value)
            .ok_or(BindError::ColumnOutOfRange {
                index,
                count: self.columns.len(),
            })
    }
}
