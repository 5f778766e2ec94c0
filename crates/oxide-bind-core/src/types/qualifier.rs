//! Qualifier tags.

use std::collections::BTreeSet;
use std::fmt;

/// A statically declared tag that disambiguates otherwise identical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    /// Bind or read the string in the national character set.
    NVarchar,
    /// The value is a JSON document.
    Json,
    /// Enum values are stored by name.
    EnumByName,
    /// Enum values are stored by ordinal.
    EnumByOrdinal,
    /// An application-defined tag.
    Named(&'static str),
}

impl Qualifier {
    /// Parses the textual form used in `#[property(qualifier = "...")]`.
    ///
    /// Unknown tags become [`Qualifier::Named`].
    #[must_use]
    pub fn from_tag(tag: &'static str) -> Self {
        match tag {
            "nvarchar" => Self::NVarchar,
            "json" => Self::Json,
            "enum_by_name" => Self::EnumByName,
            "enum_by_ordinal" => Self::EnumByOrdinal,
            other => Self::Named(other),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NVarchar => f.write_str("@NVarchar"),
            Self::Json => f.write_str("@Json"),
            Self::EnumByName => f.write_str("@EnumByName"),
            Self::EnumByOrdinal => f.write_str("@EnumByOrdinal"),
            Self::Named(name) => write!(f, "@{name}"),
        }
    }
}

/// An unordered set of qualifiers.
///
/// Backed by a `BTreeSet` so that equality and hashing never depend on the
/// order qualifiers were added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QualifierSet(BTreeSet<Qualifier>);

impl QualifierSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a qualifier.
    pub fn insert(&mut self, qualifier: Qualifier) {
        self.0.insert(qualifier);
    }

    /// Adds every qualifier from `other`.
    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    /// Returns true when `qualifier` is present.
    #[must_use]
    pub fn contains(&self, qualifier: &Qualifier) -> bool {
        self.0.contains(qualifier)
    }

    /// Returns true when the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of qualifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the qualifiers in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.iter()
    }
}

impl FromIterator<Qualifier> for QualifierSet {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Qualifier> for QualifierSet {
    fn extend<I: IntoIterator<Item = Qualifier>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl fmt::Display for QualifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&tags.join(" "))
    }
}
