//! Type descriptors, qualifiers and typed values.
//!
//! A [`QualifiedType`] is the key every factory chain resolves on: a Rust type
//! identity plus an unordered set of [`Qualifier`] tags. Two types with the
//! same raw type but different qualifiers are different keys.

mod qualified;
mod qualifier;
mod typed_value;

pub use qualified::{QualifiedType, TypeDescriptor};
pub use qualifier::{Qualifier, QualifierSet};
pub use typed_value::{AnyValue, TypedValue, UntypedNull};
