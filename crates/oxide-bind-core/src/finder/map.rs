use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::argument::{Argument, Arguments};
use crate::config::ConfigRegistry;
use crate::error::{BindError, Result};
use crate::types::TypedValue;

use super::NamedArgumentFinder;

/// A finder over an explicit name to value map.
#[derive(Clone, Default)]
pub struct MapArguments {
    values: IndexMap<String, TypedValue>,
}

impl MapArguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: TypedValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TypedValue) {
        self.values.insert(name.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, TypedValue)> for MapArguments {
    fn from_iter<I: IntoIterator<Item = (String, TypedValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl NamedArgumentFinder for MapArguments {
    fn find(&self, name: &str, config: &ConfigRegistry) -> Result<Option<Arc<dyn Argument>>> {
        let Some(value) = self.values.get(name) else {
            return Ok(None);
        };
        config
            .get::<Arguments>()
            .find_for_value(value)?
            .map(Some)
            .ok_or_else(|| BindError::NoArgumentFactory {
                ty: value.ty().clone(),
                name: name.to_string(),
                object: String::from("map arguments"),
            })
    }

    fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

impl fmt::Debug for MapArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapArguments")
            .field("names", &self.names())
            .finish()
    }
}
