//! Values paired with the type they should be treated as.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::qualified::QualifiedType;
use super::qualifier::Qualifier;

/// A type-erased, shareable payload.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

type PayloadEq = fn(&AnyValue, &AnyValue) -> bool;

fn payload_eq<V: Any + PartialEq>(a: &AnyValue, b: &AnyValue) -> bool {
    match (a.downcast_ref::<V>(), b.downcast_ref::<V>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Marker type for a null whose type is not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UntypedNull;

/// A value plus the type it should be bound as.
///
/// The declared type may differ from the payload's runtime type, notably when
/// the payload is absent: a `TypedValue::null::<String>()` still resolves
/// through the `String` factories so the sink receives a typed null.
///
/// Payloads compare by identity unless the value was built with
/// [`comparable`](Self::comparable), which compares them with `V`'s
/// `PartialEq`.
#[derive(Clone)]
pub struct TypedValue {
    ty: QualifiedType,
    value: Option<AnyValue>,
    payload_eq: Option<PayloadEq>,
}

impl TypedValue {
    /// Pairs an explicit type with an optional payload.
    #[must_use]
    pub const fn new(ty: QualifiedType, value: Option<AnyValue>) -> Self {
        Self {
            ty,
            value,
            payload_eq: None,
        }
    }

    /// Wraps `value`, typed as `V`.
    #[must_use]
    pub fn of<V: Any + Send + Sync>(value: V) -> Self {
        Self::new(QualifiedType::of::<V>(), Some(Arc::new(value)))
    }

    /// Wraps `value`, typed as `V`, comparing payloads by value.
    #[must_use]
    pub fn comparable<V: Any + Send + Sync + PartialEq>(value: V) -> Self {
        Self {
            payload_eq: Some(payload_eq::<V>),
            ..Self::of(value)
        }
    }

    /// Wraps an already shared value, typed as `V`.
    #[must_use]
    pub fn shared<V: Any + Send + Sync>(value: Arc<V>) -> Self {
        Self::new(QualifiedType::of::<V>(), Some(value))
    }

    /// A null typed as `V`.
    #[must_use]
    pub fn null<V: ?Sized + 'static>() -> Self {
        Self::new(QualifiedType::of::<V>(), None)
    }

    /// A null of unknown type.
    #[must_use]
    pub fn untyped_null() -> Self {
        Self::null::<UntypedNull>()
    }

    /// `Some(v)` becomes a value, `None` becomes a null typed as `V`.
    #[must_use]
    pub fn from_option<V: Any + Send + Sync>(value: Option<V>) -> Self {
        value.map_or_else(Self::null::<V>, Self::of)
    }

    /// Returns a copy with `qualifier` added to the declared type.
    #[must_use]
    pub fn qualified(self, qualifier: Qualifier) -> Self {
        Self {
            ty: self.ty.with(qualifier),
            ..self
        }
    }

    /// The declared type.
    #[must_use]
    pub const fn ty(&self) -> &QualifiedType {
        &self.ty
    }

    /// The payload, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&AnyValue> {
        self.value.as_ref()
    }

    /// Returns true when there is no payload.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Borrows the payload as `V`, if present and of that type.
    #[must_use]
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.as_ref().and_then(|v| v.downcast_ref::<V>())
    }
}

impl PartialEq for TypedValue {
    /// Types compare structurally; payloads compare by identity, or by
    /// value when either side was built with [`TypedValue::comparable`].
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
            && match (&self.value, &other.value) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    Arc::ptr_eq(a, b)
                        || self
                            .payload_eq
                            .or(other.payload_eq)
                            .is_some_and(|eq| eq(a, b))
                }
                _ => false,
            }
    }
}

impl fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValue")
            .field("ty", &self.ty.to_string())
            .field("null", &self.value.is_none())
            .finish()
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_some() {
            write!(f, "value of {}", self.ty)
        } else {
            write!(f, "null {}", self.ty)
        }
    }
}
