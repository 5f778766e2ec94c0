#![allow(dead_code)]

use std::sync::Arc;

use oxide_bind_core::argument::BoundParameter;
use oxide_bind_core::{
    Argument, Binding, BoundParameters, ConfigRegistry, NamedArgumentFinder, SqlValue,
};
use oxide_bind_derive::Bean;

#[derive(Debug, Clone, Bean)]
pub struct Address {
    pub street: String,
    pub city: String,
    #[property(qualifier = "nvarchar")]
    pub country: String,
}

#[derive(Debug, Clone, Bean)]
pub struct Customer {
    pub id: i64,
    #[property(name = "fullName")]
    pub name: String,
    pub email: Option<String>,
    #[property(bean)]
    pub address: Option<Address>,
    #[property(skip)]
    pub password_hash: Vec<u8>,
}

#[derive(Debug, Clone, Bean)]
pub struct Inner {
    pub b: String,
}

#[derive(Debug, Clone, Bean)]
pub struct Outer {
    #[property(bean)]
    pub a: Option<Inner>,
}

pub fn address() -> Address {
    Address {
        street: String::from("1 Rue de Rivoli"),
        city: String::from("Paris"),
        country: String::from("France"),
    }
}

pub fn customer(address: Option<Address>) -> Customer {
    Customer {
        id: 42,
        name: String::from("Ada Lovelace"),
        email: None,
        address,
        password_hash: vec![0xde, 0xad],
    }
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(String::from(s))
}

/// Applies `argument` at position 0 of a fresh sink.
pub fn apply(argument: &Arc<dyn Argument>) -> BoundParameter {
    let mut sink = BoundParameters::new();
    argument
        .apply(0, &mut sink)
        .unwrap_or_else(|e| panic!("Failed to apply {argument:?}: {e}"));
    sink.get(0).cloned().unwrap_or_else(|| panic!("Nothing bound by {argument:?}"))
}

/// Resolves `name` through `finder` and applies it.
pub fn find(
    finder: &dyn NamedArgumentFinder,
    name: &str,
    config: &ConfigRegistry,
) -> BoundParameter {
    let argument = finder
        .find(name, config)
        .unwrap_or_else(|e| panic!("Failed to resolve {name}: {e}"))
        .unwrap_or_else(|| panic!("Nothing found for {name}"));
    apply(&argument)
}

/// Applies `names` of `binding` in order.
pub fn apply_named(binding: &Binding, names: &[&str], config: &ConfigRegistry) -> BoundParameters {
    let mut sink = BoundParameters::new();
    binding
        .apply_named(names, &mut sink, config)
        .unwrap_or_else(|e| panic!("Failed to bind {names:?}: {e}"));
    sink
}
