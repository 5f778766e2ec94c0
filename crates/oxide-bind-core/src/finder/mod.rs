//! Named argument finders.
//!
//! A finder supplies arguments for names that were not bound explicitly,
//! typically by reading properties of an object bound under a prefix. The
//! [`ObjectPropertyFinder`] resolves dotted names such as
//! `customer.address.city` one segment at a time; a segment ending in `?`
//! turns a null intermediate value into an untyped null instead of an error.

mod map;
mod object;

use std::fmt;
use std::sync::Arc;

use crate::argument::Argument;
use crate::config::ConfigRegistry;
use crate::error::Result;

pub use map::MapArguments;
pub use object::{BeanProperties, ObjectPropertyFinder, PropertySource};

/// Supplies arguments for binding names.
pub trait NamedArgumentFinder: Send + Sync + fmt::Debug {
    /// Resolves `name`.
    ///
    /// `Ok(None)` means this finder does not know the name and the next
    /// finder should be asked.
    fn find(&self, name: &str, config: &ConfigRegistry) -> Result<Option<Arc<dyn Argument>>>;

    /// The names this finder can resolve directly, for diagnostics.
    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}
