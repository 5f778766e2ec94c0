//! Per-session configuration.
//!
//! A [`ConfigRegistry`] owns one instance of every [`Config`] type it has been
//! asked for. Instances are created lazily and forked with
//! [`ConfigRegistry::create_copy`]; the [`Settings`] types seed a registry
//! from serialized configuration.

mod registry;
mod settings;

pub use registry::{Config, ConfigRegistry, RegistryRef};
pub use settings::{ArgumentSettings, CacheSettings, Eviction, Settings};
