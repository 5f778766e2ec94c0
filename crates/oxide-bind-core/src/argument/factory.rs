//! Argument factories.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigRegistry;
use crate::error::{BindError, Result};
use crate::types::{AnyValue, QualifiedType, Qualifier, UntypedNull};
use crate::value::{SqlType, SqlValue, ToSqlValue};

use super::arguments::Arguments;
use super::binder::{Argument, NullArgument, ValueArgument};

/// A type-bound binder: resolves the factory once, then turns many values of
/// that type into arguments.
pub type PreparedArgument =
    Arc<dyn Fn(Option<&AnyValue>) -> Result<Arc<dyn Argument>> + Send + Sync>;

/// Builds arguments for the types it recognises.
pub trait ArgumentFactory: Send + Sync + fmt::Debug {
    /// Builds an argument for `value` typed as `ty`.
    ///
    /// `Ok(None)` means the factory does not handle `ty`. An error means it
    /// does handle `ty` but failed, which is a defect in the factory.
    fn build(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>>;

    /// Returns a reusable binder for `ty`, if this factory can prepare one.
    fn prepare(
        &self,
        _ty: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<PreparedArgument>> {
        Ok(None)
    }
}

type Convert<T> = Arc<dyn Fn(&T) -> SqlValue + Send + Sync>;

/// Binds values of exactly one qualified type `T`.
///
/// A null binds as a typed null of the factory's [`SqlType`]. A payload that
/// is not a `T` is a hard error: the declared type promised a `T`.
pub struct ValueArgumentFactory<T> {
    ty: QualifiedType,
    sql_type: SqlType,
    convert: Convert<T>,
}

impl<T: Any + Send + Sync> ValueArgumentFactory<T> {
    /// Creates a factory for unqualified `T`.
    pub fn new(
        sql_type: SqlType,
        convert: impl Fn(&T) -> SqlValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            ty: QualifiedType::of::<T>(),
            sql_type,
            convert: Arc::new(convert),
        }
    }

    /// Restricts the factory to `T` carrying `qualifier`.
    #[must_use]
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.ty = self.ty.with(qualifier);
        self
    }

    /// The exact type this factory accepts.
    #[must_use]
    pub const fn accepts(&self) -> &QualifiedType {
        &self.ty
    }

    fn bind(
        sql_type: SqlType,
        convert: &Convert<T>,
        value: Option<&AnyValue>,
    ) -> Result<Arc<dyn Argument>> {
        match value {
            None => Ok(Arc::new(NullArgument::typed(sql_type))),
            Some(payload) => {
                let typed = payload.downcast_ref::<T>().ok_or_else(|| BindError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    found: String::from("a payload of another type"),
                })?;
                Ok(Arc::new(ValueArgument::new(convert(typed), Some(sql_type))))
            }
        }
    }
}

impl<T: ToSqlValue + Clone + Any + Send + Sync> ValueArgumentFactory<T> {
    /// Creates a factory that converts through [`ToSqlValue`].
    #[must_use]
    pub fn to_sql(sql_type: SqlType) -> Self {
        Self::new(sql_type, |value: &T| value.clone().to_sql_value())
    }
}

impl<T: Any + Send + Sync> ArgumentFactory for ValueArgumentFactory<T> {
    fn build(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
        _config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        if *ty != self.ty {
            return Ok(None);
        }
        Self::bind(self.sql_type, &self.convert, value).map(Some)
    }

    fn prepare(
        &self,
        ty: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<PreparedArgument>> {
        if *ty != self.ty {
            return Ok(None);
        }
        let sql_type = self.sql_type;
        let convert = Arc::clone(&self.convert);
        Ok(Some(Arc::new(move |value: Option<&AnyValue>| {
            Self::bind(sql_type, &convert, value)
        })))
    }
}

impl<T> fmt::Debug for ValueArgumentFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueArgumentFactory<{}>({})", self.ty, self.sql_type)
    }
}

/// A fixed, ordered group of factories that behaves like one.
///
/// Members are tried first to last, so resolving through the composite is
/// the same as resolving through its members in declared order.
#[derive(Debug)]
pub struct CompositeArgumentFactory {
    name: &'static str,
    members: Vec<Arc<dyn ArgumentFactory>>,
}

impl CompositeArgumentFactory {
    /// Creates a composite over `members`, tried in the given order.
    #[must_use]
    pub fn new(name: &'static str, members: Vec<Arc<dyn ArgumentFactory>>) -> Self {
        Self { name, members }
    }

    /// The composite's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The members in resolution order.
    #[must_use]
    pub fn members(&self) -> &[Arc<dyn ArgumentFactory>] {
        &self.members
    }
}

impl ArgumentFactory for CompositeArgumentFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        for member in &self.members {
            if let Some(argument) = member.build(ty, value, config)? {
                return Ok(Some(argument));
            }
        }
        Ok(None)
    }

    fn prepare(
        &self,
        ty: &QualifiedType,
        config: &ConfigRegistry,
    ) -> Result<Option<PreparedArgument>> {
        for member in &self.members {
            if let Some(prepared) = member.prepare(ty, config)? {
                return Ok(Some(prepared));
            }
        }
        Ok(None)
    }
}

/// Binds [`UntypedNull`] as the registry's configured untyped null.
#[derive(Debug, Default)]
pub struct UntypedNullArgumentFactory;

impl ArgumentFactory for UntypedNullArgumentFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        _value: Option<&AnyValue>,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        if !ty.is::<UntypedNull>() {
            return Ok(None);
        }
        Ok(Some(config.get::<Arguments>().untyped_null_argument()))
    }
}

/// Binds raw [`SqlValue`]s as they are, typed by their natural storage type.
#[derive(Debug, Default)]
pub struct SqlValueArgumentFactory;

impl SqlValueArgumentFactory {
    fn bind(value: Option<&AnyValue>) -> Result<Arc<dyn Argument>> {
        let Some(payload) = value else {
            return Ok(Arc::new(NullArgument::untyped()));
        };
        let sql_value = payload
            .downcast_ref::<SqlValue>()
            .ok_or_else(|| BindError::TypeMismatch {
                expected: String::from("SqlValue"),
                found: String::from("a payload of another type"),
            })?;
        let sql_type = sql_value.natural_type();
        Ok(Arc::new(ValueArgument::new(sql_value.clone(), sql_type)))
    }
}

impl ArgumentFactory for SqlValueArgumentFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
        _config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        if *ty != QualifiedType::of::<SqlValue>() {
            return Ok(None);
        }
        Self::bind(value).map(Some)
    }

    fn prepare(
        &self,
        ty: &QualifiedType,
        _config: &ConfigRegistry,
    ) -> Result<Option<PreparedArgument>> {
        if *ty != QualifiedType::of::<SqlValue>() {
            return Ok(None);
        }
        Ok(Some(Arc::new(Self::bind)))
    }
}

/// Passes through values that already are arguments (`Arc<dyn Argument>`).
#[derive(Debug, Default)]
pub struct DirectArgumentFactory;

impl ArgumentFactory for DirectArgumentFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        if !ty.is::<Arc<dyn Argument>>() {
            return Ok(None);
        }
        match value {
            None => Ok(Some(config.get::<Arguments>().untyped_null_argument())),
            Some(payload) => payload
                .downcast_ref::<Arc<dyn Argument>>()
                .map(|argument| Some(Arc::clone(argument)))
                .ok_or_else(|| BindError::TypeMismatch {
                    expected: String::from("Arc<dyn Argument>"),
                    found: String::from("a payload of another type"),
                }),
        }
    }
}

/// The factories every [`Arguments`] config starts with.
///
/// Covers booleans, integers, floats, strings (plain and `@NVarchar`), byte
/// blobs, raw [`SqlValue`]s, [`UntypedNull`] and pre-built arguments.
#[derive(Debug)]
pub struct BuiltInArgumentFactory(CompositeArgumentFactory);

impl BuiltInArgumentFactory {
    /// Creates the built-in factory set.
    #[must_use]
    pub fn new() -> Self {
        let members: Vec<Arc<dyn ArgumentFactory>> = vec![
            Arc::new(DirectArgumentFactory),
            Arc::new(UntypedNullArgumentFactory),
            Arc::new(SqlValueArgumentFactory),
            Arc::new(ValueArgumentFactory::<bool>::to_sql(SqlType::Boolean)),
            Arc::new(ValueArgumentFactory::<i8>::to_sql(SqlType::TinyInt)),
            Arc::new(ValueArgumentFactory::<i16>::to_sql(SqlType::SmallInt)),
            Arc::new(ValueArgumentFactory::<i32>::to_sql(SqlType::Integer)),
            Arc::new(ValueArgumentFactory::<i64>::to_sql(SqlType::BigInt)),
            Arc::new(ValueArgumentFactory::<u8>::to_sql(SqlType::SmallInt)),
            Arc::new(ValueArgumentFactory::<u16>::to_sql(SqlType::Integer)),
            Arc::new(ValueArgumentFactory::<u32>::to_sql(SqlType::BigInt)),
            Arc::new(ValueArgumentFactory::<f32>::to_sql(SqlType::Real)),
            Arc::new(ValueArgumentFactory::<f64>::to_sql(SqlType::Double)),
            Arc::new(ValueArgumentFactory::<String>::to_sql(SqlType::Varchar)),
            Arc::new(
                ValueArgumentFactory::<String>::to_sql(SqlType::NVarchar)
                    .qualified(Qualifier::NVarchar),
            ),
            Arc::new(ValueArgumentFactory::<&'static str>::to_sql(SqlType::Varchar)),
            Arc::new(ValueArgumentFactory::<Vec<u8>>::to_sql(SqlType::Blob)),
        ];
        Self(CompositeArgumentFactory::new("built-in", members))
    }

    /// The member factories in resolution order.
    #[must_use]
    pub fn members(&self) -> &[Arc<dyn ArgumentFactory>] {
        self.0.members()
    }
}

impl Default for BuiltInArgumentFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentFactory for BuiltInArgumentFactory {
    fn build(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        self.0.build(ty, value, config)
    }

    fn prepare(
        &self,
        ty: &QualifiedType,
        config: &ConfigRegistry,
    ) -> Result<Option<PreparedArgument>> {
        self.0.prepare(ty, config)
    }
}
