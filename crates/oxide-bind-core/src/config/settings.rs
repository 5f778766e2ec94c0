//! Serializable settings used to seed a registry.

use serde::{Deserialize, Serialize};

/// Top-level settings for a registry.
///
/// Every field has a default, so partial documents deserialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-registry cache settings.
    pub cache: CacheSettings,
    /// Argument resolution settings.
    pub arguments: ArgumentSettings,
}

/// Settings for bounded caches created through [`Caches`](crate::cache::Caches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of entries. `None` is unbounded; `Some(0)` disables
    /// caching entirely.
    pub maximum_size: Option<usize>,
    /// Which entries to drop when the cache is full.
    pub eviction: Eviction,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            maximum_size: Some(1_000),
            eviction: Eviction::Fifo,
        }
    }
}

impl CacheSettings {
    /// Settings with the given maximum size and FIFO eviction.
    #[must_use]
    pub const fn bounded(maximum_size: usize) -> Self {
        Self {
            maximum_size: Some(maximum_size),
            eviction: Eviction::Fifo,
        }
    }

    /// Settings with no size bound.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            maximum_size: None,
            eviction: Eviction::Fifo,
        }
    }

    /// Returns true when caching is switched off.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        matches!(self.maximum_size, Some(0))
    }
}

/// Built-in eviction orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eviction {
    /// Drop the oldest inserted entry first.
    #[default]
    Fifo,
    /// Drop the most recently inserted entry first.
    Newest,
}

/// Settings for the [`Arguments`](crate::argument::Arguments) config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgumentSettings {
    /// Whether batch binding may use prepared, type-bound binders.
    pub prepared_arguments_enabled: bool,
}

impl Default for ArgumentSettings {
    fn default() -> Self {
        Self {
            prepared_arguments_enabled: true,
        }
    }
}
