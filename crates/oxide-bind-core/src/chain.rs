//! Ordered, overridable factory registries.
//!
//! Every converter kind (arguments, column mappers, row mappers, collectors)
//! keeps its factories in a [`FactoryChain`]. Resolution walks the chain from
//! the most recently registered factory to the oldest and stops at the first
//! factory that produces something, so a later `register` overrides broader
//! factories registered before it without needing a removal API.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// An ordered list of factories consulted last-registered-first.
pub struct FactoryChain<F: ?Sized> {
    factories: Vec<Arc<F>>,
}

impl<F: ?Sized> FactoryChain<F> {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Registers a factory. It takes precedence over every factory already
    /// in the chain.
    pub fn register(&mut self, factory: Arc<F>) {
        self.factories.push(factory);
    }

    /// Number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Iterates factories in precedence order (newest first).
    pub fn iter(&self) -> impl Iterator<Item = &Arc<F>> {
        self.factories.iter().rev()
    }

    /// Returns the first non-empty result in precedence order.
    ///
    /// An error from any factory stops the walk and is returned as-is.
    pub fn find_first<R>(
        &self,
        mut attempt: impl FnMut(&Arc<F>) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        for factory in self.iter() {
            if let Some(found) = attempt(factory)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl<F: ?Sized> Default for FactoryChain<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> Clone for FactoryChain<F> {
    /// Copies the list; factories themselves are immutable and shared.
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<F: ?Sized + fmt::Debug> fmt::Debug for FactoryChain<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
