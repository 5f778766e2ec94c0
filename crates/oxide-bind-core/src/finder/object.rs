//! Finders over object properties, including dotted paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::argument::{Argument, Arguments};
use crate::config::ConfigRegistry;
use crate::error::{BindError, Result};
use crate::property::{Bean, DeclaredElement, PropertyTable, PropertyTables, Qualifiers};
use crate::types::{AnyValue, QualifiedType, TypedValue};

use super::NamedArgumentFinder;

/// Reads named properties of one object.
pub trait PropertySource: Send + Sync + fmt::Debug {
    /// A description of the object for error messages.
    fn describe(&self) -> String;

    /// Names of the readable properties.
    fn names(&self) -> Vec<String>;

    /// Reads the property `name`. `Ok(None)` when there is no such property.
    fn value(&self, name: &str, config: &ConfigRegistry) -> Result<Option<TypedValue>>;

    /// A source over `value`, which was read from the property `name`.
    fn nested(
        &self,
        name: &str,
        ty: &QualifiedType,
        value: AnyValue,
        config: &ConfigRegistry,
    ) -> Result<Arc<dyn PropertySource>>;
}

/// Properties of a [`Bean`], read through its [`PropertyTable`].
///
/// Property types pass through the registry's [`Qualifiers`] config.
#[derive(Clone)]
pub struct BeanProperties {
    root: AnyValue,
    table: Arc<PropertyTable>,
}

impl BeanProperties {
    /// Reads `root` through `table`. The table must describe `root`'s type.
    #[must_use]
    pub fn new(root: AnyValue, table: Arc<PropertyTable>) -> Self {
        Self { root, table }
    }

    #[must_use]
    pub fn of<T: Bean>(bean: T) -> Self {
        Self::shared(Arc::new(bean))
    }

    #[must_use]
    pub fn shared<T: Bean>(bean: Arc<T>) -> Self {
        Self::new(bean, PropertyTables::of::<T>())
    }
}

impl PropertySource for BeanProperties {
    fn describe(&self) -> String {
        format!("bean {}", self.table.owner())
    }

    fn names(&self) -> Vec<String> {
        self.table.names().map(String::from).collect()
    }

    fn value(&self, name: &str, config: &ConfigRegistry) -> Result<Option<TypedValue>> {
        let Some(descriptor) = self.table.get(name) else {
            return Ok(None);
        };
        let read = descriptor.read(&*self.root)?;
        let element = DeclaredElement::new(*self.table.owner(), name, descriptor.ty().clone());
        let ty = config.get::<Qualifiers>().qualify(&element)?;
        Ok(Some(TypedValue::new(ty, read.value().cloned())))
    }

    fn nested(
        &self,
        name: &str,
        ty: &QualifiedType,
        value: AnyValue,
        _config: &ConfigRegistry,
    ) -> Result<Arc<dyn PropertySource>> {
        let table = self
            .table
            .get(name)
            .and_then(|descriptor| descriptor.nested_table())
            .or_else(|| PropertyTables::lookup(ty.raw().id()))
            .ok_or_else(|| BindError::NoPropertyTable(ty.to_string()))?;
        Ok(Arc::new(Self::new(value, table)))
    }
}

impl fmt::Debug for BeanProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanProperties")
            .field("owner", self.table.owner())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum ChildFinder {
    /// The parent segment is not a property.
    Missing,
    /// The parent was null and marked nullable.
    NullSafe,
    Nested(Arc<ObjectPropertyFinder>),
}

/// Resolves names under a prefix against the properties of one object.
///
/// A name without a dot is a leaf: its property value is turned into an
/// argument through the registry's [`Arguments`]. A dotted name descends into
/// the first segment's value. The finder built for each first segment is
/// kept for the life of this finder, so repeated lookups re-read leaf values
/// but do not navigate again. Failed navigations are not kept.
pub struct ObjectPropertyFinder {
    prefix: String,
    source: Arc<dyn PropertySource>,
    children: Mutex<HashMap<String, ChildFinder>>,
}

impl ObjectPropertyFinder {
    /// A finder for names starting with `prefix.` (or every name when
    /// `prefix` is empty).
    #[must_use]
    pub fn new(prefix: &str, source: Arc<dyn PropertySource>) -> Self {
        let prefix = if prefix.is_empty() || prefix.ends_with('.') {
            prefix.to_string()
        } else {
            format!("{prefix}.")
        };
        Self {
            prefix,
            source,
            children: Mutex::new(HashMap::new()),
        }
    }

    /// A finder over the properties of `bean`.
    #[must_use]
    pub fn bean<T: Bean>(prefix: &str, bean: T) -> Self {
        Self::new(prefix, Arc::new(BeanProperties::of(bean)))
    }

    /// The normalised prefix, ending in `.` unless empty.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn find_leaf(&self, name: &str, config: &ConfigRegistry) -> Result<Option<Arc<dyn Argument>>> {
        let Some(value) = self.source.value(name, config)? else {
            return Ok(None);
        };
        let argument = config
            .get::<Arguments>()
            .find_for_value(&value)?
            .ok_or_else(|| BindError::NoArgumentFactory {
                ty: value.ty().clone(),
                name: name.to_string(),
                object: self.source.describe(),
            })?;
        Ok(Some(argument))
    }

    fn child(
        &self,
        segment: &str,
        nullable: bool,
        path: &str,
        config: &ConfigRegistry,
    ) -> Result<ChildFinder> {
        if let Some(found) = self.children.lock().get(segment) {
            return Ok(found.clone());
        }

        let found = match self.source.value(segment, config)? {
            None => ChildFinder::Missing,
            Some(parent) => match parent.value() {
                Some(payload) => {
                    let source = self
                        .source
                        .nested(segment, parent.ty(), Arc::clone(payload), config)?;
                    ChildFinder::Nested(Arc::new(Self::new("", source)))
                }
                None if nullable => ChildFinder::NullSafe,
                None => {
                    return Err(BindError::NullNestedValue {
                        name: path.to_string(),
                        segment: segment.to_string(),
                    })
                }
            },
        };
        trace!(segment, object = %self.source.describe(), "cached nested finder");
        Ok(self
            .children
            .lock()
            .entry(segment.to_string())
            .or_insert(found)
            .clone())
    }
}

impl NamedArgumentFinder for ObjectPropertyFinder {
    fn find(&self, name: &str, config: &ConfigRegistry) -> Result<Option<Arc<dyn Argument>>> {
        let Some(rest) = name.strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };
        let Some((parent, path)) = rest.split_once('.') else {
            return self.find_leaf(rest, config);
        };
        let (segment, nullable) = parent
            .strip_suffix('?')
            .map_or((parent, false), |stripped| (stripped, true));

        match self.child(segment, nullable, path, config)? {
            ChildFinder::Missing => Ok(None),
            ChildFinder::NullSafe => Ok(Some(config.get::<Arguments>().untyped_null_argument())),
            ChildFinder::Nested(finder) => finder.find(path, config),
        }
    }

    fn names(&self) -> Vec<String> {
        self.source
            .names()
            .into_iter()
            .map(|name| format!("{}{name}", self.prefix))
            .collect()
    }
}

impl fmt::Debug for ObjectPropertyFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPropertyFinder")
            .field("prefix", &self.prefix)
            .field("source", &self.source)
            .field("children", &self.children.lock().len())
            .finish()
    }
}
