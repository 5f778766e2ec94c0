//! Error types for argument and mapper resolution.

use std::fmt;

use thiserror::Error;

use crate::types::QualifiedType;

/// Errors raised while resolving, binding or mapping values.
#[derive(Debug, Error)]
pub enum BindError {
    /// No argument factory accepted the type of a bound property.
    #[error("no argument factory registered for {ty} bound as '{name}' on {object}")]
    NoArgumentFactory {
        /// The type of the value that could not be bound.
        ty: QualifiedType,
        /// The binding name that resolved to the value.
        name: String,
        /// Description of the object the value was read from.
        object: String,
    },

    /// No argument factory accepted a type outside any named binding.
    #[error("no argument factory registered for {0}")]
    NoArgumentFor(QualifiedType),

    /// A nested binding path crossed a null value without the nullable marker.
    #[error(
        "trying to bind nested argument '{name}', but found null at '{segment}'; \
         mark it as nullable with '{segment}?'"
    )]
    NullNestedValue {
        /// The full binding name being resolved.
        name: String,
        /// The segment whose value was null.
        segment: String,
    },

    /// A factory claimed a type and then failed while building for it.
    #[error("{factory} failed to build for {ty} ({value}): {source}")]
    FactoryFailed {
        /// Debug description of the failing factory.
        factory: String,
        /// The requested type.
        ty: QualifiedType,
        /// Description of the value being converted.
        value: String,
        /// The underlying failure.
        #[source]
        source: Box<BindError>,
    },

    /// A payload did not have the runtime type its declared type promised.
    #[error("expected a value of type {expected}, found {found}")]
    TypeMismatch {
        /// The declared type.
        expected: String,
        /// What was actually found.
        found: String,
    },

    /// A nested path tried to descend into a type with no property table.
    #[error("no property table registered for {0}; cannot resolve nested properties")]
    NoPropertyTable(String),

    /// No column mapper could be resolved for a type.
    #[error("no column mapper registered for {0}")]
    NoColumnMapper(QualifiedType),

    /// No row mapper could be resolved for a type.
    #[error("no row mapper registered for {0}")]
    NoRowMapper(QualifiedType),

    /// No collector could be resolved for a container type.
    #[error("no collector registered for {0}")]
    NoCollector(QualifiedType),

    /// A result row was asked for a column it does not have.
    #[error("column {index} out of range for a row of {count} columns")]
    ColumnOutOfRange {
        /// The requested column index.
        index: usize,
        /// Number of columns in the row.
        count: usize,
    },

    /// A column held a value that the mapper cannot convert.
    #[error("column '{column}' cannot be read as {expected}: found {found}")]
    ColumnType {
        /// Column name.
        column: String,
        /// Expected Rust type.
        expected: &'static str,
        /// Description of the value found.
        found: String,
    },

    /// A named parameter had no argument and no finder could supply one.
    #[error("missing named parameter '{0}' in binding")]
    MissingNamedParameter(String),

    /// A binding name was malformed.
    #[error("invalid binding name '{0}'")]
    InvalidBindingName(String),

    /// A config object outlived the registry that owns it.
    #[error("config registry has been closed")]
    RegistryClosed,

    /// The parameter sink rejected a value.
    #[error("parameter sink error: {0}")]
    Sink(String),
}

impl BindError {
    /// Wraps a failure of a factory that had claimed `ty`.
    #[must_use]
    pub fn factory_failed(
        factory: &dyn fmt::Debug,
        ty: &QualifiedType,
        value: impl Into<String>,
        source: Self,
    ) -> Self {
        Self::FactoryFailed {
            factory: format!("{factory:?}"),
            ty: ty.clone(),
            value: value.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, BindError>;
