//! Write-side converters.
//!
//! An [`Argument`] is a deferred binder: given a parameter position and a
//! [`ParameterSink`], it writes one value in a type-correct way. Arguments
//! are produced by [`ArgumentFactory`] implementations registered in the
//! [`Arguments`] config.

mod arguments;
mod binder;
mod factory;

pub use arguments::Arguments;
pub use binder::{
    Argument, BoundParameter, BoundParameters, NullArgument, ParameterSink, ValueArgument,
};
pub use factory::{
    ArgumentFactory, BuiltInArgumentFactory, CompositeArgumentFactory, DirectArgumentFactory,
    PreparedArgument, SqlValueArgumentFactory, UntypedNullArgumentFactory, ValueArgumentFactory,
};
