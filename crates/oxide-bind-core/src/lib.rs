//! # oxide-bind-core
//!
//! Run-time resolution of argument binders and result mappers for SQL
//! statements.
//!
//! This crate provides:
//! - [`QualifiedType`]: a type plus qualifier tags, the key every lookup uses
//! - Factory chains where the most recently registered factory wins
//! - A [`ConfigRegistry`] of lazily created, forkable per-session configs
//! - Named argument finders that resolve dotted paths like `customer.address.city`
//! - Size-bounded and process-wide metadata caches
//!
//! ## Binding a bean
//!
//! ```rust
//! use oxide_bind_core::property::{Bean, PropertyTable};
//! use oxide_bind_core::{Binding, BoundParameters, ConfigRegistry, SqlValue};
//!
//! struct Address {
//!     city: String,
//! }
//!
//! impl Bean for Address {
//!     fn property_table() -> PropertyTable {
//!         PropertyTable::builder::<Self>()
//!             .property("city", |a: &Self| a.city.clone())
//!             .build()
//!     }
//! }
//!
//! let config = ConfigRegistry::new();
//! let mut binding = Binding::new();
//! binding.bind_bean("address", Address { city: String::from("Paris") });
//!
//! let mut sink = BoundParameters::new();
//! binding.apply_named(&["address.city"], &mut sink, &config).unwrap();
//! assert_eq!(sink.value(0), Some(&SqlValue::Text(String::from("Paris"))));
//! ```
//!
//! ## Precedence
//!
//! Factories registered later are consulted first, so an application can
//! override any built-in converter:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use oxide_bind_core::argument::{Arguments, ValueArgumentFactory};
//! use oxide_bind_core::{BoundParameters, ConfigRegistry, QualifiedType, SqlType, SqlValue};
//!
//! let config = ConfigRegistry::new();
//! let arguments = config.get::<Arguments>();
//! arguments.register(Arc::new(ValueArgumentFactory::<bool>::new(SqlType::Integer, |b| {
//!     SqlValue::Int(i64::from(*b))
//! })));
//!
//! let value: oxide_bind_core::AnyValue = Arc::new(true);
//! let argument = arguments
//!     .find_for(&QualifiedType::of::<bool>(), Some(&value))
//!     .unwrap()
//!     .unwrap();
//! let mut sink = BoundParameters::new();
//! argument.apply(0, &mut sink).unwrap();
//! assert_eq!(sink.value(0), Some(&SqlValue::Int(1)));
//! ```

pub mod argument;
pub mod binding;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod finder;
pub mod mapper;
pub mod property;
pub mod types;
pub mod value;

pub use argument::{Argument, Arguments, BoundParameters, ParameterSink};
pub use binding::Binding;
pub use chain::FactoryChain;
pub use config::{Config, ConfigRegistry, Settings};
pub use error::{BindError, Result};
pub use finder::{NamedArgumentFinder, ObjectPropertyFinder};
pub use property::{Bean, PropertyTable, PropertyTables};
pub use types::{AnyValue, QualifiedType, Qualifier, TypedValue};
pub use value::{SqlType, SqlValue, ToSqlValue};
