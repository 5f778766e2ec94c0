//! The `Arguments` config: the argument factory chain of one registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::cache::ChainMemo;
use crate::chain::FactoryChain;
use crate::config::{ArgumentSettings, Config, ConfigRegistry, RegistryRef};
use crate::error::{BindError, Result};
use crate::types::{AnyValue, QualifiedType, TypedValue};

use super::binder::{Argument, NullArgument};
use super::factory::{ArgumentFactory, BuiltInArgumentFactory, PreparedArgument};

/// Resolves values to [`Argument`]s through a chain of factories.
///
/// Starts with [`BuiltInArgumentFactory`]; factories registered later take
/// precedence over earlier ones.
pub struct Arguments {
    registry: RegistryRef,
    factories: RwLock<FactoryChain<dyn ArgumentFactory>>,
    prepared: ChainMemo<QualifiedType, Option<PreparedArgument>>,
    untyped_null: RwLock<Arc<dyn Argument>>,
    settings: RwLock<ArgumentSettings>,
}

impl Arguments {
    /// Registers a factory ahead of every factory already registered.
    pub fn register(&self, factory: Arc<dyn ArgumentFactory>) -> &Self {
        let mut factories = self.factories.write();
        factories.register(factory);
        self.prepared.invalidate();
        drop(factories);
        self
    }

    /// A snapshot of the factory chain.
    pub fn factories(&self) -> FactoryChain<dyn ArgumentFactory> {
        self.factories.read().clone()
    }

    /// Finds an argument for `value` typed as `ty`.
    ///
    /// `Ok(None)` when no factory handles the type. A factory that handles
    /// the type and fails yields [`BindError::FactoryFailed`].
    pub fn find_for(
        &self,
        ty: &QualifiedType,
        value: Option<&AnyValue>,
    ) -> Result<Option<Arc<dyn Argument>>> {
        let registry = self.registry.get()?;
        let found = self.factories().find_first(|factory| {
            factory
                .build(ty, value, &registry)
                .map_err(|source| failed(factory.as_ref(), ty, value, source))
        })?;
        if found.is_none() {
            debug!(ty = %ty, "no argument factory matched");
        }
        Ok(found)
    }

    /// Finds an argument for a [`TypedValue`].
    pub fn find_for_value(&self, value: &TypedValue) -> Result<Option<Arc<dyn Argument>>> {
        self.find_for(value.ty(), value.value())
    }

    /// Returns a reusable binder for `ty`, if some factory can prepare one.
    ///
    /// Results, including "none", are memoised per type until the next
    /// [`register`](Self::register).
    pub fn prepare_for(&self, ty: &QualifiedType) -> Result<Option<PreparedArgument>> {
        if let Some(cached) = self.prepared.get(ty) {
            return Ok(cached);
        }
        let registry = self.registry.get()?;
        let (generation, chain) = {
            let factories = self.factories.read();
            (self.prepared.generation(), factories.clone())
        };
        let prepared = chain.find_first(|factory| {
            factory
                .prepare(ty, &registry)
                .map_err(|source| failed(factory.as_ref(), ty, None, source))
        })?;
        debug!(ty = %ty, prepared = prepared.is_some(), "resolved prepared argument");
        Ok(self.prepared.insert(generation, ty.clone(), prepared))
    }

    /// Returns a binder for many values of `ty`.
    ///
    /// Uses a prepared binder when prepared arguments are enabled and one is
    /// available; otherwise each value is resolved with
    /// [`find_for`](Self::find_for).
    pub fn binder_for(&self, ty: &QualifiedType) -> Result<PreparedArgument> {
        if self.prepared_arguments_enabled() {
            if let Some(prepared) = self.prepare_for(ty)? {
                return Ok(prepared);
            }
        }
        let registry = self.registry.get()?;
        let ty = ty.clone();
        Ok(Arc::new(move |value: Option<&AnyValue>| {
            registry
                .get::<Self>()
                .find_for(&ty, value)?
                .ok_or_else(|| BindError::NoArgumentFor(ty.clone()))
        }))
    }

    /// The argument used for nulls of unknown type.
    pub fn untyped_null_argument(&self) -> Arc<dyn Argument> {
        Arc::clone(&self.untyped_null.read())
    }

    /// Replaces the argument used for nulls of unknown type.
    pub fn set_untyped_null_argument(&self, argument: Arc<dyn Argument>) -> &Self {
        *self.untyped_null.write() = argument;
        self
    }

    /// Whether [`binder_for`](Self::binder_for) may use prepared binders.
    pub fn prepared_arguments_enabled(&self) -> bool {
        self.settings.read().prepared_arguments_enabled
    }

    /// Enables or disables prepared binders.
    pub fn set_prepared_arguments_enabled(&self, enabled: bool) -> &Self {
        self.settings.write().prepared_arguments_enabled = enabled;
        self
    }

    /// Applies serialized settings.
    pub fn apply(&self, settings: &ArgumentSettings) {
        *self.settings.write() = settings.clone();
    }
}

fn failed(
    factory: &dyn ArgumentFactory,
    ty: &QualifiedType,
    value: Option<&AnyValue>,
    source: BindError,
) -> BindError {
    debug!(factory = ?factory, ty = %ty, error = %source, "argument factory failed");
    let value = if value.is_some() { "non-null value" } else { "null" };
    BindError::factory_failed(&factory, ty, value, source)
}

impl Config for Arguments {
    fn create(registry: &ConfigRegistry) -> Self {
        let mut factories: FactoryChain<dyn ArgumentFactory> = FactoryChain::new();
        factories.register(Arc::new(BuiltInArgumentFactory::new()));
        Self {
            registry: RegistryRef::to(registry),
            factories: RwLock::new(factories),
            prepared: ChainMemo::new(),
            untyped_null: RwLock::new(Arc::new(NullArgument::untyped())),
            settings: RwLock::new(ArgumentSettings::default()),
        }
    }

    fn create_copy(&self) -> Self {
        Self {
            registry: RegistryRef::new(),
            factories: RwLock::new(self.factories()),
            prepared: ChainMemo::new(),
            untyped_null: RwLock::new(self.untyped_null_argument()),
            settings: RwLock::new(self.settings.read().clone()),
        }
    }

    fn set_registry(&self, registry: &ConfigRegistry) {
        self.registry.set(registry);
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("factories", &*self.factories.read())
            .field("prepared", &self.prepared.len())
            .field("settings", &*self.settings.read())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{BoundParameters, ValueArgument, ValueArgumentFactory};
    use crate::types::Qualifier;
    use crate::value::{SqlType, SqlValue};

    fn bound(argument: &Arc<dyn Argument>) -> SqlValue {
        let mut sink = BoundParameters::new();
        argument.apply(0, &mut sink).unwrap();
        sink.value(0).unwrap().clone()
    }

    fn text(value: &str) -> AnyValue {
        Arc::new(String::from(value))
    }

    #[test]
    fn test_builtin_string() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        let value = text("hi");
        let argument = arguments
            .find_for(&QualifiedType::of::<String>(), Some(&value))
            .unwrap()
            .unwrap();
        assert_eq!(bound(&argument), SqlValue::Text(String::from("hi")));
    }

    #[test]
    fn test_unknown_type_is_none() {
        struct Opaque;
        let registry = ConfigRegistry::new();
        let found = registry
            .get::<Arguments>()
            .find_for(&QualifiedType::of::<Opaque>(), None)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_later_registration_overrides_builtin() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        arguments.register(Arc::new(ValueArgumentFactory::<String>::new(
            SqlType::Varchar,
            |s: &String| SqlValue::Text(s.to_uppercase()),
        )));
        let value = text("shout");
        let argument = arguments
            .find_for(&QualifiedType::of::<String>(), Some(&value))
            .unwrap()
            .unwrap();
        assert_eq!(bound(&argument), SqlValue::Text(String::from("SHOUT")));
    }

    #[test]
    fn test_factory_failure_is_wrapped() {
        let registry = ConfigRegistry::new();
        let wrong: AnyValue = Arc::new(5_u64);
        let result = registry
            .get::<Arguments>()
            .find_for(&QualifiedType::of::<String>(), Some(&wrong));
        match result {
            Err(BindError::FactoryFailed { ty, value, source, .. }) => {
                assert_eq!(ty, QualifiedType::of::<String>());
                assert_eq!(value, "non-null value");
                assert!(matches!(*source, BindError::TypeMismatch { .. }));
            }
            other => panic!("expected FactoryFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_nvarchar_qualified_string() {
        let registry = ConfigRegistry::new();
        let ty = QualifiedType::of::<String>().with(Qualifier::NVarchar);
        let argument = registry.get::<Arguments>().find_for(&ty, None).unwrap().unwrap();
        let mut sink = BoundParameters::new();
        argument.apply(0, &mut sink).unwrap();
        assert_eq!(sink.get(0).unwrap().sql_type, Some(SqlType::NVarchar));
    }

    #[test]
    fn test_untyped_null_is_configurable() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        arguments.set_untyped_null_argument(Arc::new(NullArgument::typed(SqlType::Other)));
        let argument = arguments
            .find_for_value(&TypedValue::untyped_null())
            .unwrap()
            .unwrap();
        let mut sink = BoundParameters::new();
        argument.apply(0, &mut sink).unwrap();
        assert_eq!(sink.get(0).unwrap().sql_type, Some(SqlType::Other));
    }

    #[test]
    fn test_prepare_for_is_memoised_and_invalidated() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        let ty = QualifiedType::of::<i64>();
        let first = arguments.prepare_for(&ty).unwrap().unwrap();
        let second = arguments.prepare_for(&ty).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        arguments.register(Arc::new(ValueArgumentFactory::<i64>::new(SqlType::BigInt, |n: &i64| {
            SqlValue::Int(n * 10)
        })));
        let third = arguments.prepare_for(&ty).unwrap().unwrap();
        let value: AnyValue = Arc::new(2_i64);
        assert_eq!(bound(&third(Some(&value)).unwrap()), SqlValue::Int(20));
    }

    #[derive(Debug)]
    struct BuildOnly;

    impl ArgumentFactory for BuildOnly {
        fn build(
            &self,
            ty: &QualifiedType,
            _value: Option<&AnyValue>,
            _config: &ConfigRegistry,
        ) -> Result<Option<Arc<dyn Argument>>> {
            Ok(ty.is::<char>().then(|| {
                Arc::new(ValueArgument::new(SqlValue::Text(String::from("c")), None))
                    as Arc<dyn Argument>
            }))
        }
    }

    #[test]
    fn test_binder_falls_back_to_build() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        arguments.register(Arc::new(BuildOnly));
        let ty = QualifiedType::of::<char>();
        assert!(arguments.prepare_for(&ty).unwrap().is_none());
        let binder = arguments.binder_for(&ty).unwrap();
        let value: AnyValue = Arc::new('x');
        assert_eq!(bound(&binder(Some(&value)).unwrap()), SqlValue::Text(String::from("c")));
    }

    #[test]
    fn test_binder_without_factory_errors_per_value() {
        struct Opaque;
        let registry = ConfigRegistry::new();
        let binder = registry
            .get::<Arguments>()
            .binder_for(&QualifiedType::of::<Opaque>())
            .unwrap();
        assert!(matches!(binder(None), Err(BindError::NoArgumentFor(_))));
    }

    #[test]
    fn test_disabled_prepared_arguments_use_build() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        arguments.set_prepared_arguments_enabled(false);
        let binder = arguments.binder_for(&QualifiedType::of::<i32>()).unwrap();
        let value: AnyValue = Arc::new(4_i32);
        assert_eq!(bound(&binder(Some(&value)).unwrap()), SqlValue::Int(4));
        assert!(!arguments.prepared_arguments_enabled());
    }

    #[test]
    fn test_fork_does_not_share_factories() {
        let parent = ConfigRegistry::new();
        let before = parent.get::<Arguments>().factories().len();
        let child = parent.create_copy();
        child.get::<Arguments>().register(Arc::new(BuildOnly));
        assert_eq!(parent.get::<Arguments>().factories().len(), before);
        assert_eq!(child.get::<Arguments>().factories().len(), before + 1);
        assert!(parent
            .get::<Arguments>()
            .find_for(&QualifiedType::of::<char>(), None)
            .unwrap()
            .is_none());
    }

    #[derive(Debug, Default)]
    struct RegistersDuringPrepare {
        fired: std::sync::atomic::AtomicBool,
    }

    impl ArgumentFactory for RegistersDuringPrepare {
        fn build(
            &self,
            _ty: &QualifiedType,
            _value: Option<&AnyValue>,
            _config: &ConfigRegistry,
        ) -> Result<Option<Arc<dyn Argument>>> {
            Ok(None)
        }

        fn prepare(
            &self,
            ty: &QualifiedType,
            config: &ConfigRegistry,
        ) -> Result<Option<PreparedArgument>> {
            if !ty.is::<u16>() || self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
                return Ok(None);
            }
            config
                .get::<Arguments>()
                .register(Arc::new(ValueArgumentFactory::<u16>::new(SqlType::Integer, |n: &u16| {
                    SqlValue::Int(i64::from(*n) * 100)
                })));
            Ok(Some(Arc::new(|_value: Option<&AnyValue>| -> Result<Arc<dyn Argument>> {
                Ok(Arc::new(ValueArgument::new(SqlValue::Int(-1), None)))
            })))
        }
    }

    #[test]
    fn test_registration_during_prepare_is_not_shadowed() {
        let registry = ConfigRegistry::new();
        let arguments = registry.get::<Arguments>();
        arguments.register(Arc::new(RegistersDuringPrepare::default()));
        let ty = QualifiedType::of::<u16>();
        let value: AnyValue = Arc::new(3_u16);

        let racing = arguments.prepare_for(&ty).unwrap().unwrap();
        assert_eq!(bound(&racing(Some(&value)).unwrap()), SqlValue::Int(-1));

        let current = arguments.prepare_for(&ty).unwrap().unwrap();
        assert_eq!(bound(&current(Some(&value)).unwrap()), SqlValue::Int(300));
    }
}
