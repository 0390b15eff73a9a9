use core::any::{Any, TypeId};

use serde_core::{Serialize, Serializer};

use crate::value::TypePath;

// -----------------------------------------------------------------------------
// Value

/// The type-erased element trait.
///
/// Everything a sequence can contain is a `dyn Value`. The trait is
/// deliberately small: the engine needs to know a value's runtime type (to
/// resolve a codec for it), its type path (for discriminator framing and
/// diagnostics), whether it is the null value, and how to compare it against
/// another value (for default-value suppression). Everything else, such as
/// how the value is actually written, lives in the codec resolved from the
/// [registry](crate::registry).
///
/// The trait is implemented for `()`, `bool`, `char`, the integer and float
/// primitives, `String`, `&'static str`, and [`Null`].
///
/// # Examples
///
/// ```
/// use tb_codec::value::{Null, Value};
///
/// let a: &dyn Value = &3_i32;
/// let b: &dyn Value = &3_i32;
///
/// assert_eq!(a.partial_eq(b), Some(true));
/// assert_eq!(a.downcast_ref::<i32>(), Some(&3));
/// assert!(!a.is_null());
/// assert!(Null.is_null());
/// ```
pub trait Value: Any + Send + Sync {
    /// Returns the [type path](TypePath::type_path) of the underlying type.
    fn type_path(&self) -> &'static str;

    /// Returns the value as a [`&dyn Any`](Any).
    fn as_any(&self) -> &dyn Any;

    /// Returns the [`TypeId`] of the underlying type.
    #[inline]
    fn ty_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// Whether this is the null value.
    ///
    /// Only [`Null`] returns `true`.
    #[inline]
    fn is_null(&self) -> bool {
        false
    }

    /// Compares this value against another type-erased value.
    ///
    /// Returns `None` when the two values are of different types (or the
    /// underlying type has no meaningful equality).
    fn partial_eq(&self, other: &dyn Value) -> Option<bool>;
}

impl dyn Value {
    /// Returns a typed reference to this value, or `None` if the underlying
    /// type is not `T`.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Returns `true` if the underlying type is `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl core::fmt::Debug for dyn Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "dyn Value(`{}`)", self.type_path())
    }
}

// -----------------------------------------------------------------------------
// Null

/// The dedicated null value.
///
/// Sequences express "no value at this position" with `Null`, not with an
/// option type: a heterogeneous sequence holds boxed values, and a missing
/// one is still a value that must produce the format's null production.
///
/// `Null` serializes as a unit, which maps to the null production of the
/// common self-describing formats.
///
/// # Examples
///
/// ```
/// use tb_codec::value::{Null, Value};
///
/// assert!(Null.is_null());
/// assert_eq!(Null.partial_eq(&Null), Some(true));
/// assert_eq!(Null.partial_eq(&1_i32), Some(false));
/// ```
#[derive(Clone, Copy, Default, Debug)]
pub struct Null;

impl TypePath for Null {
    #[inline]
    fn type_path() -> &'static str {
        "tb_codec::value::Null"
    }

    #[inline]
    fn type_name() -> &'static str {
        "Null"
    }
}

impl Value for Null {
    #[inline]
    fn type_path(&self) -> &'static str {
        <Self as TypePath>::type_path()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn is_null(&self) -> bool {
        true
    }

    #[inline]
    fn partial_eq(&self, other: &dyn Value) -> Option<bool> {
        Some(other.is_null())
    }
}

impl Serialize for Null {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Null, Value};

    #[test]
    fn downcast() {
        let value: &dyn Value = &12_u8;
        assert!(value.is::<u8>());
        assert_eq!(value.downcast_ref::<u8>(), Some(&12));
        assert_eq!(value.downcast_ref::<u16>(), None);
    }

    #[test]
    fn null_is_only_equal_to_null() {
        let null: &dyn Value = &Null;
        assert_eq!(null.partial_eq(&Null), Some(true));
        assert_eq!(null.partial_eq(&0_i32), Some(false));
        assert_eq!((&0_i32 as &dyn Value).partial_eq(null), None);
    }
}
