//! The arguments bound to one statement.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::argument::{Argument, Arguments, ParameterSink};
use crate::config::ConfigRegistry;
use crate::error::{BindError, Result};
use crate::finder::{MapArguments, NamedArgumentFinder, ObjectPropertyFinder};
use crate::property::Bean;
use crate::types::TypedValue;

/// Positional and named arguments for one statement execution.
///
/// Named lookups try explicitly bound names first, then the registered
/// finders, most recently added first.
#[derive(Default)]
pub struct Binding {
    positionals: BTreeMap<usize, Arc<dyn Argument>>,
    named: HashMap<String, Arc<dyn Argument>>,
    finders: Vec<Arc<dyn NamedArgumentFinder>>,
}

impl Binding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `argument` at the zero-based `position`, replacing any earlier one.
    pub fn add_positional(&mut self, position: usize, argument: Arc<dyn Argument>) -> &mut Self {
        self.positionals.insert(position, argument);
        self
    }

    /// Binds `argument` under `name`, replacing any earlier one.
    pub fn add_named(&mut self, name: impl Into<String>, argument: Arc<dyn Argument>) -> &mut Self {
        self.named.insert(name.into(), argument);
        self
    }

    /// Resolves `value` through the registry's [`Arguments`] and binds it at `position`.
    pub fn bind(
        &mut self,
        position: usize,
        value: &TypedValue,
        config: &ConfigRegistry,
    ) -> Result<&mut Self> {
        let argument = resolve(value, config)?;
        Ok(self.add_positional(position, argument))
    }

    /// Resolves `value` through the registry's [`Arguments`] and binds it as `name`.
    pub fn bind_named(
        &mut self,
        name: impl Into<String>,
        value: &TypedValue,
        config: &ConfigRegistry,
    ) -> Result<&mut Self> {
        let argument = resolve(value, config)?;
        Ok(self.add_named(name, argument))
    }

    /// Adds a finder consulted for names not bound explicitly.
    pub fn add_named_finder(&mut self, finder: Arc<dyn NamedArgumentFinder>) -> &mut Self {
        self.finders.push(finder);
        self
    }

    /// Makes the properties of `bean` available as `prefix.property`.
    pub fn bind_bean<T: Bean>(&mut self, prefix: &str, bean: T) -> &mut Self {
        self.add_named_finder(Arc::new(ObjectPropertyFinder::bean(prefix, bean)))
    }

    /// Makes every entry of `map` available by its key.
    pub fn bind_map(&mut self, map: MapArguments) -> &mut Self {
        self.add_named_finder(Arc::new(map))
    }

    /// Finds the argument for `name`.
    pub fn find_for_name(
        &self,
        name: &str,
        config: &ConfigRegistry,
    ) -> Result<Option<Arc<dyn Argument>>> {
        validate_name(name)?;
        if let Some(argument) = self.named.get(name) {
            return Ok(Some(Arc::clone(argument)));
        }
        for finder in self.finders.iter().rev() {
            if let Some(argument) = finder.find(name, config)? {
                return Ok(Some(argument));
            }
        }
        Ok(None)
    }

    /// Applies every positional argument to `sink`.
    pub fn apply_positional(&self, sink: &mut dyn ParameterSink) -> Result<()> {
        for (position, argument) in &self.positionals {
            argument.apply(*position, sink)?;
        }
        Ok(())
    }

    /// Applies the arguments for `names`, the i-th name at position i.
    pub fn apply_named(
        &self,
        names: &[&str],
        sink: &mut dyn ParameterSink,
        config: &ConfigRegistry,
    ) -> Result<()> {
        for (position, name) in names.iter().enumerate() {
            let Some(argument) = self.find_for_name(name, config)? else {
                debug!(name, known = ?self.known_names(), "missing named parameter");
                return Err(BindError::MissingNamedParameter((*name).to_string()));
            };
            argument.apply(position, sink)?;
        }
        Ok(())
    }

    /// Drops every argument and finder.
    pub fn clear(&mut self) {
        self.positionals.clear();
        self.named.clear();
        self.finders.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positionals.is_empty() && self.named.is_empty() && self.finders.is_empty()
    }

    fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.named.keys().cloned().collect();
        names.extend(self.finders.iter().flat_map(|finder| finder.names()));
        names.sort();
        names
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("positionals", &self.positionals)
            .field("named", &self.named)
            .field("finders", &self.finders)
            .finish()
    }
}

fn resolve(value: &TypedValue, config: &ConfigRegistry) -> Result<Arc<dyn Argument>> {
    config
        .get::<Arguments>()
        .find_for_value(value)?
        .ok_or_else(|| BindError::NoArgumentFor(value.ty().clone()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return Err(BindError::InvalidBindingName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{BoundParameters, ValueArgument};
    use crate::property::PropertyTable;
    use crate::value::SqlValue;

    struct Point {
        x: i64,
        y: i64,
    }

    impl Bean for Point {
        fn property_table() -> PropertyTable {
            PropertyTable::builder::<Self>()
                .property("x", |p: &Self| p.x)
                .property("y", |p: &Self| p.y)
                .build()
        }
    }

    fn text(s: &str) -> Arc<dyn Argument> {
        Arc::new(ValueArgument::new(SqlValue::Text(s.to_string()), None))
    }

    #[test]
    fn test_positional() {
        let config = ConfigRegistry::new();
        let mut binding = Binding::new();
        binding.bind(1, &TypedValue::of(2_i64), &config).unwrap();
        binding.add_positional(0, text("a"));
        let mut sink = BoundParameters::new();
        binding.apply_positional(&mut sink).unwrap();
        assert_eq!(sink.values(), vec![SqlValue::Text(String::from("a")), SqlValue::Int(2)]);
    }

    #[test]
    fn test_named_before_finders() {
        let config = ConfigRegistry::new();
        let mut binding = Binding::new();
        binding.bind_bean("p", Point { x: 1, y: 2 });
        binding.add_named("p.x", text("explicit"));
        let mut sink = BoundParameters::new();
        binding.apply_named(&["p.x", "p.y"], &mut sink, &config).unwrap();
        assert_eq!(
            sink.values(),
            vec![SqlValue::Text(String::from("explicit")), SqlValue::Int(2)]
        );
    }

    #[test]
    fn test_last_finder_wins() {
        let config = ConfigRegistry::new();
        let mut binding = Binding::new();
        binding.bind_map(MapArguments::new().with("x", TypedValue::of(1_i64)));
        binding.bind_map(MapArguments::new().with("x", TypedValue::of(2_i64)));
        let mut sink = BoundParameters::new();
        binding.apply_named(&["x"], &mut sink, &config).unwrap();
        assert_eq!(sink.value(0), Some(&SqlValue::Int(2)));
    }

    #[test]
    fn test_missing_name() {
        let config = ConfigRegistry::new();
        let mut binding = Binding::new();
        binding.bind_bean("p", Point { x: 1, y: 2 });
        let mut sink = BoundParameters::new();
        let result = binding.apply_named(&["p.z"], &mut sink, &config);
        assert!(matches!(result, Err(BindError::MissingNamedParameter(name)) if name == "p.z"));
    }

    #[test]
    fn test_invalid_name() {
        let config = ConfigRegistry::new();
        let binding = Binding::new();
        for name in ["", ".a", "a.", "a..b"] {
            assert!(matches!(
                binding.find_for_name(name, &config),
                Err(BindError::InvalidBindingName(_))
            ));
        }
    }

    #[test]
    fn test_clear() {
        let mut binding = Binding::new();
        binding.add_positional(0, text("a")).add_named("n", text("b"));
        assert!(!binding.is_empty());
        binding.clear();
        assert!(binding.is_empty());
    }
}
