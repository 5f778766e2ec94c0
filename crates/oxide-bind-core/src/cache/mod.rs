//! Metadata and result caches.
//!
//! Three kinds of cache live here:
//!
//! - [`MetadataCache`]: process-wide, append-only, never evicts. Used for
//!   per-type metadata such as property tables, where the key space is the
//!   finite set of types in the program.
//! - [`BoundedCache`]: per-registry, optionally size-bounded, with pluggable
//!   eviction and hit/miss accounting. Created through the [`Caches`] config.
//! - [`ChainMemo`]: unbounded per-registry memo of factory chain lookups,
//!   invalidated by generation whenever a chain changes.

mod bounded;
mod caches;
mod memo;
mod metadata;

pub use bounded::{BoundedCache, CacheLoader, EvictionPolicy};
pub use caches::Caches;
pub use memo::ChainMemo;
pub use metadata::MetadataCache;
