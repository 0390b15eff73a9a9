use serde_core::ser::{SerializeMap, SerializeSeq};
use serde_core::{Serialize, Serializer};

use crate::registry::{Encoded, TypeTraitEncode};
use crate::ser::SiteId;
use crate::value::Value;

// -----------------------------------------------------------------------------
// TagStyle

/// The shape of the discriminator framing around a tagged value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagStyle {
    /// A map with a single entry: the value's type path as key, the value's
    /// own production as value.
    ObjectEntry,
    /// A two-element array: the value's type path, then the value's own
    /// production.
    ArrayWrapper,
    /// No discriminator. The value's own production is written as-is: its
    /// structural brackets still open and close, but nothing frames them.
    Noop,
}

// -----------------------------------------------------------------------------
// TypeTag

/// A stateless strategy that frames a value with a type discriminator.
///
/// Polymorphic elements need their concrete type recorded in the output so a
/// reader can pick the right deserializer. A `TypeTag` writes the
/// discriminator before the value's own production and the matching closer
/// after it, in one of the [`TagStyle`] shapes.
///
/// The tag may be *rebound* to a usage site during contextualization; the
/// site identity only feeds diagnostics and cache keys, never behavior.
///
/// # Examples
///
/// ```
/// use tb_codec::ser::{TagStyle, TypeTag};
///
/// let tag = TypeTag::new(TagStyle::ObjectEntry);
/// assert_eq!(tag.style(), TagStyle::ObjectEntry);
///
/// let noop = TypeTag::noop();
/// assert_eq!(noop.style(), TagStyle::Noop);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTag {
    style: TagStyle,
    site: Option<SiteId>,
}

impl TypeTag {
    /// Creates a tag writer with the given style, bound to no site.
    #[inline]
    pub const fn new(style: TagStyle) -> Self {
        Self { style, site: None }
    }

    /// The no-op variant: delegates to the value's own production without a
    /// discriminator.
    #[inline]
    pub const fn noop() -> Self {
        Self::new(TagStyle::Noop)
    }

    /// Returns the framing style.
    #[inline]
    pub const fn style(&self) -> TagStyle {
        self.style
    }

    /// Returns the usage site this tag is bound to, if any.
    #[inline]
    pub const fn site(&self) -> Option<SiteId> {
        self.site
    }

    /// Rebinds the tag to a usage site.
    ///
    /// Returns a new tag; the original is untouched. A `None` site keeps the
    /// current binding.
    #[inline]
    pub fn rebound(&self, site: Option<SiteId>) -> Self {
        Self {
            style: self.style,
            site: site.or(self.site),
        }
    }

    /// Writes one framed value: discriminator open, the value's production
    /// through its codec, discriminator close.
    ///
    /// The open and close are balanced exactly once per call; a failure from
    /// the codec propagates before any closer is attempted.
    pub(crate) fn write_tagged<S: Serializer>(
        &self,
        value: &dyn Value,
        codec: &TypeTraitEncode,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match self.style {
            TagStyle::ObjectEntry => {
                let mut state = serializer.serialize_map(Some(1))?;
                state.serialize_entry(value.type_path(), &Encoded::new(codec, value))?;
                state.end()
            }
            TagStyle::ArrayWrapper => {
                let mut state = serializer.serialize_seq(Some(2))?;
                state.serialize_element(value.type_path())?;
                state.serialize_element(&Encoded::new(codec, value))?;
                state.end()
            }
            TagStyle::Noop => codec.encode(value, serializer),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
