//! Property descriptor tables.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use tracing::debug;

use crate::cache::MetadataCache;
use crate::error::{BindError, Result};
use crate::types::{AnyValue, QualifiedType, Qualifier, TypeDescriptor, TypedValue};

type Getter = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<Option<AnyValue>> + Send + Sync>;

/// A type whose properties can be bound by name.
///
/// Usually derived with `#[derive(Bean)]`.
pub trait Bean: Any + Send + Sync {
    /// Builds the property table for this type.
    ///
    /// Called at most a handful of times per process; the result is kept in
    /// [`PropertyTables`].
    fn property_table() -> PropertyTable;
}

/// One readable property of a type.
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: String,
    ty: QualifiedType,
    getter: Getter,
    nested: Option<fn() -> Arc<PropertyTable>>,
}

impl PropertyDescriptor {
    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type, including statically declared qualifiers.
    #[must_use]
    pub const fn ty(&self) -> &QualifiedType {
        &self.ty
    }

    /// Reads the property from `owner`.
    pub fn read(&self, owner: &(dyn Any + Send + Sync)) -> Result<TypedValue> {
        let value = (self.getter)(owner)?;
        Ok(TypedValue::new(self.ty.clone(), value))
    }

    /// The table of the property's own type, when it is a bean.
    #[must_use]
    pub fn nested_table(&self) -> Option<Arc<PropertyTable>> {
        self.nested.map(|table| table())
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("nested", &self.nested.is_some())
            .finish_non_exhaustive()
    }
}

/// The ordered properties of one type.
#[derive(Debug, Clone)]
pub struct PropertyTable {
    owner: TypeDescriptor,
    properties: IndexMap<String, PropertyDescriptor>,
}

impl PropertyTable {
    /// Starts a table for `T`.
    #[must_use]
    pub fn builder<T: Any + Send + Sync>() -> PropertyTableBuilder<T> {
        PropertyTableBuilder {
            properties: IndexMap::new(),
            _marker: PhantomData,
        }
    }

    /// The type this table describes.
    #[must_use]
    pub const fn owner(&self) -> &TypeDescriptor {
        &self.owner
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true when the type has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Builder for [`PropertyTable`].
pub struct PropertyTableBuilder<T> {
    properties: IndexMap<String, PropertyDescriptor>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> PropertyTableBuilder<T> {
    /// Adds a property that is never null.
    #[must_use]
    pub fn property<V, F>(self, name: &str, get: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.insert(name, QualifiedType::of::<V>(), None, move |owner: &T| {
            Some(Arc::new(get(owner)) as AnyValue)
        })
    }

    /// Adds a property whose value may be absent.
    ///
    /// A `None` reads as a null typed as `V`.
    #[must_use]
    pub fn nullable<V, F>(self, name: &str, get: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        self.insert(name, QualifiedType::of::<V>(), None, move |owner: &T| {
            get(owner).map(|value| Arc::new(value) as AnyValue)
        })
    }

    /// Adds a property holding another bean, so dotted names can descend into it.
    #[must_use]
    pub fn bean<V, F>(self, name: &str, get: F) -> Self
    where
        V: Bean,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.insert(
            name,
            QualifiedType::of::<V>(),
            Some(PropertyTables::of::<V>),
            move |owner: &T| Some(Arc::new(get(owner)) as AnyValue),
        )
    }

    /// Adds a bean property whose value may be absent.
    #[must_use]
    pub fn nullable_bean<V, F>(self, name: &str, get: F) -> Self
    where
        V: Bean,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        self.insert(
            name,
            QualifiedType::of::<V>(),
            Some(PropertyTables::of::<V>),
            move |owner: &T| get(owner).map(|value| Arc::new(value) as AnyValue),
        )
    }

    /// Adds `qualifier` to the declared type of the property `name`.
    ///
    /// Unknown names are ignored.
    #[must_use]
    pub fn qualify(mut self, name: &str, qualifier: Qualifier) -> Self {
        if let Some(descriptor) = self.properties.get_mut(name) {
            descriptor.ty = descriptor.ty.with(qualifier);
        }
        self
    }

    /// Finishes the table.
    #[must_use]
    pub fn build(self) -> PropertyTable {
        PropertyTable {
            owner: TypeDescriptor::of::<T>(),
            properties: self.properties,
        }
    }

    fn insert(
        mut self,
        name: &str,
        ty: QualifiedType,
        nested: Option<fn() -> Arc<PropertyTable>>,
        read: impl Fn(&T) -> Option<AnyValue> + Send + Sync + 'static,
    ) -> Self {
        let getter: Getter = Arc::new(move |owner: &(dyn Any + Send + Sync)| {
            let owner = owner
                .downcast_ref::<T>()
                .ok_or_else(|| BindError::TypeMismatch {
                    expected: std::any::type_name::<T>().to_string(),
                    found: String::from("an object of another type"),
                })?;
            Ok(read(owner))
        });
        self.properties.insert(
            name.to_string(),
            PropertyDescriptor {
                name: name.to_string(),
                ty,
                getter,
                nested,
            },
        );
        self
    }
}

static TABLES: LazyLock<MetadataCache<TypeId, Arc<PropertyTable>>> =
    LazyLock::new(MetadataCache::new);

/// The process-wide store of bean property tables.
///
/// Tables are built on first use and kept for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct PropertyTables;

impl PropertyTables {
    /// The table for `T`, building it on first use.
    pub fn of<T: Bean>() -> Arc<PropertyTable> {
        TABLES.get_or_insert_with(TypeId::of::<T>(), || {
            let table = T::property_table();
            debug!(
                owner = %table.owner(),
                properties = table.len(),
                "built property table"
            );
            Arc::new(table)
        })
    }

    /// The table for the type with id `id`, if it has been built.
    pub fn lookup(id: TypeId) -> Option<Arc<PropertyTable>> {
        TABLES.get(&id)
    }

    /// Number of tables built so far.
    pub fn len() -> usize {
        TABLES.len()
    }
}
