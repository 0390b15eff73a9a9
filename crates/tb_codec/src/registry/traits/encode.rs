use serde_core::{Serialize, Serializer};

use crate::registry::FromType;
use crate::value::{TypePath, Value};

// -----------------------------------------------------------------------------
// TypeTraitEncode

/// The element codec: writes a type-erased value through its `serde`
/// implementation.
///
/// Internally stores function pointers bound to a specific concrete type.
/// When given a type-erased value, it downcasts to that type and hands the
/// result to the serializer as a `&dyn erased_serde::Serialize`.
///
/// A codec optionally carries an *emptiness probe*, consulted by the
/// `IfEmpty` suppression rule. Without one, a built-in check recognizes the
/// null value and empty strings.
///
/// # Safety
///
/// Passing a value of a different type than the codec was built for will
/// cause a panic.
///
/// # Examples
///
/// ```
/// use tb_codec::registry::TypeRegistry;
/// use tb_codec::value::Value;
///
/// let registry = TypeRegistry::new();
/// let value: &dyn Value = &7_i32;
///
/// let codec = registry.encode_codec(value.ty_id()).unwrap();
/// let output = serde_json::to_string(&tb_codec::registry::Encoded::new(&codec, value)).unwrap();
///
/// assert_eq!(output, "7");
/// ```
#[derive(Clone)]
pub struct TypeTraitEncode {
    erase: fn(&dyn Value) -> &dyn erased_serde::Serialize,
    empty: Option<fn(&dyn Value) -> bool>,
    str_codec: bool,
    type_path: &'static str,
}

impl<T: Value + TypePath + Serialize> FromType<T> for TypeTraitEncode {
    fn from_type() -> Self {
        Self {
            erase: |value| match value.downcast_ref::<T>() {
                Some(val) => val as &dyn erased_serde::Serialize,
                None => {
                    panic!(
                        "codec type mismatched, codec for `{}`, value of `{}`",
                        <T as TypePath>::type_path(),
                        value.type_path(),
                    );
                }
            },
            empty: None,
            str_codec: false,
            type_path: <T as TypePath>::type_path(),
        }
    }
}

impl TypeTraitEncode {
    /// Creates the codec for type `T`.
    ///
    /// Equivalent to [`FromType::from_type`], as a named constructor.
    #[inline]
    pub fn of<T: Value + TypePath + Serialize>() -> Self {
        <Self as FromType<T>>::from_type()
    }

    /// The engine's default string codec.
    ///
    /// Marked so the writer can recognize it by identity and take the direct
    /// string fast path. Covers `String` and `&'static str` values.
    pub fn string() -> Self {
        Self {
            erase: |value| {
                if let Some(val) = value.downcast_ref::<String>() {
                    return val as &dyn erased_serde::Serialize;
                }
                match value.downcast_ref::<&'static str>() {
                    Some(val) => val as &dyn erased_serde::Serialize,
                    None => panic!(
                        "codec type mismatched, string codec with value of `{}`",
                        value.type_path(),
                    ),
                }
            },
            empty: Some(|value| value.downcast_ref::<String>().is_some_and(String::is_empty)
                || value.downcast_ref::<&'static str>().is_some_and(|s| s.is_empty())),
            str_codec: true,
            type_path: <String as TypePath>::type_path(),
        }
    }

    /// Attaches an emptiness probe consulted by `IfEmpty` suppression.
    #[inline]
    pub fn with_emptiness(mut self, probe: fn(&dyn Value) -> bool) -> Self {
        self.empty = Some(probe);
        self
    }

    /// Calls the bound type's [`Serialize`].
    ///
    /// `TypeTraitEncode` does not carry a type flag, but the functions used
    /// internally are type specific.
    ///
    /// # Panic
    /// - Mismatched type
    #[inline(always)]
    pub fn encode<S: Serializer>(
        &self,
        value: &dyn Value,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        (self.erase)(value).serialize(serializer)
    }

    /// Whether the value counts as "empty" for suppression purposes.
    ///
    /// Null is always empty. With no probe attached, strings are checked for
    /// zero length and anything else is non-empty.
    pub fn is_empty(&self, value: &dyn Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self.empty {
            Some(probe) => probe(value),
            None => {
                value.downcast_ref::<String>().is_some_and(String::is_empty)
                    || value.downcast_ref::<&'static str>().is_some_and(|s| s.is_empty())
            }
        }
    }

    /// Whether this is the engine's default string codec.
    #[inline]
    pub const fn is_string(&self) -> bool {
        self.str_codec
    }

    /// Returns the type path the codec was built for.
    #[inline]
    pub const fn type_path(&self) -> &'static str {
        self.type_path
    }
}

impl PartialEq for TypeTraitEncode {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::fn_addr_eq(self.erase, other.erase) && self.str_codec == other.str_codec
    }
}

impl core::fmt::Debug for TypeTraitEncode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeTraitEncode")
            .field("type_path", &self.type_path)
            .field("str_codec", &self.str_codec)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Encoded

/// A `Serialize` pairing of a codec and a value.
///
/// This is the smallest unit the engine hands to a serializer: the codec's
/// erased accessor applied to one value, with no framing or suppression.
pub struct Encoded<'a> {
    codec: &'a TypeTraitEncode,
    value: &'a dyn Value,
}

impl<'a> Encoded<'a> {
    /// Pairs a codec with a value.
    #[inline]
    pub const fn new(codec: &'a TypeTraitEncode, value: &'a dyn Value) -> Self {
        Self { codec, value }
    }
}

impl Serialize for Encoded<'_> {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.codec.encode(self.value, serializer)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Encoded, TypeTraitEncode};
    use crate::value::Value;

    #[test]
    fn encodes_through_serde() {
        let codec = TypeTraitEncode::of::<i32>();
        let value: &dyn Value = &41_i32;
        let out = serde_json::to_string(&Encoded::new(&codec, value)).unwrap();
        assert_eq!(out, "41");
    }

    #[test]
    fn builtin_emptiness() {
        let codec = TypeTraitEncode::of::<String>();
        assert!(codec.is_empty(&String::new()));
        assert!(!codec.is_empty(&String::from("x")));
        assert!(!codec.is_empty(&0_i32));
    }

    #[test]
    fn string_codec_identity() {
        assert!(TypeTraitEncode::string().is_string());
        assert!(!TypeTraitEncode::of::<String>().is_string());
        assert_eq!(TypeTraitEncode::string(), TypeTraitEncode::string());
        assert_ne!(TypeTraitEncode::string(), TypeTraitEncode::of::<String>());
    }
}
