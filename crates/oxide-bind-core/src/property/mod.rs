//! Per-type property metadata.
//!
//! A [`PropertyTable`] lists the readable properties of a type together with
//! their declared [`QualifiedType`](crate::types::QualifiedType). Tables for
//! [`Bean`] types live in the process-wide [`PropertyTables`] store; the
//! per-registry [`Qualifiers`] config decides which qualifiers a declared
//! property finally carries.

mod qualifiers;
mod table;

pub use qualifiers::{
    DeclaredElement, DeclaredQualifiers, PropertyQualifier, QualifierStrategy, Qualifiers,
};
pub use table::{Bean, PropertyDescriptor, PropertyTable, PropertyTableBuilder, PropertyTables};
