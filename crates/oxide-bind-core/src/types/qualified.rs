//! Type descriptors and qualified types.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::qualifier::{Qualifier, QualifierSet};

/// Identity of a Rust type, with its name kept for diagnostics.
///
/// Equality and hashing use the `TypeId` only.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// Describes `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type identity.
    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    /// The full type name, as reported by `std::any::type_name`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The type name with module paths stripped, e.g. `Vec<u8>`.
    #[must_use]
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for c in self.name.chars() {
            if c.is_alphanumeric() || c == '_' || c == ':' {
                segment.push(c);
            } else {
                out.push_str(segment.rsplit("::").next().unwrap_or(""));
                segment.clear();
                out.push(c);
            }
        }
        out.push_str(segment.rsplit("::").next().unwrap_or(""));
        out
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// A type descriptor plus an unordered set of qualifiers.
///
/// Immutable; `with` returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedType {
    raw: TypeDescriptor,
    qualifiers: QualifierSet,
}

impl QualifiedType {
    /// The unqualified type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeDescriptor::of::<T>())
    }

    /// The unqualified type described by `raw`.
    #[must_use]
    pub const fn new(raw: TypeDescriptor) -> Self {
        Self {
            raw,
            qualifiers: QualifierSet::new(),
        }
    }

    /// Returns a copy with `qualifier` added.
    #[must_use]
    pub fn with(&self, qualifier: Qualifier) -> Self {
        let mut qualifiers = self.qualifiers.clone();
        qualifiers.insert(qualifier);
        Self {
            raw: self.raw,
            qualifiers,
        }
    }

    /// Returns a copy with every qualifier in `qualifiers` added.
    #[must_use]
    pub fn with_all(&self, qualifiers: impl IntoIterator<Item = Qualifier>) -> Self {
        let mut set = self.qualifiers.clone();
        set.extend(qualifiers);
        Self {
            raw: self.raw,
            qualifiers: set,
        }
    }

    /// Returns a copy with the qualifiers replaced by `qualifiers`.
    #[must_use]
    pub fn with_qualifiers(&self, qualifiers: QualifierSet) -> Self {
        Self {
            raw: self.raw,
            qualifiers,
        }
    }

    /// Returns the same raw type with no qualifiers.
    #[must_use]
    pub const fn without_qualifiers(&self) -> Self {
        Self::new(self.raw)
    }

    /// The raw type.
    #[must_use]
    pub const fn raw(&self) -> &TypeDescriptor {
        &self.raw
    }

    /// The qualifier set.
    #[must_use]
    pub const fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }

    /// Returns true when no qualifiers are attached.
    #[must_use]
    pub fn is_unqualified(&self) -> bool {
        self.qualifiers.is_empty()
    }

    /// Returns true when the raw type is `T`, regardless of qualifiers.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.raw.id() == TypeId::of::<T>()
    }
}

impl fmt::Display for QualifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifiers.is_empty() {
            write!(f, "{}", self.raw)
        } else {
            write!(f, "{} {}", self.qualifiers, self.raw)
        }
    }
}
