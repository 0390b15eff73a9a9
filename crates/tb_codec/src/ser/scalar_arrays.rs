use std::sync::Arc;

use serde_core::ser::SerializeSeq;
use serde_core::{Serialize, Serializer};

use crate::ser::{CodecConfig, SiteId, UsageSite};

// -----------------------------------------------------------------------------
// ScalarShape

/// The output shape of a scalar array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarShape {
    /// One scalar production per element, inside an array production.
    Natural,
    /// A packed binary vector: each element's bit pattern written
    /// big-endian into one contiguous buffer, emitted as the format's
    /// binary scalar production.
    ///
    /// Only floating-point arrays honor this shape; other scalar kinds fall
    /// back to [`Natural`](ScalarShape::Natural).
    PackedBinary,
}

// -----------------------------------------------------------------------------
// ScalarCodec

/// The fixed-shape codec for primitive scalar arrays.
///
/// Scalar arrays bypass element codec resolution entirely, since their
/// element type can never vary at runtime; this codec carries only the output
/// shape decisions: the [`ScalarShape`] and the unwrap-single tri-state.
///
/// Shape selection happens during contextualization from the usage site's
/// format override, and is reversible: a later override can switch a float
/// array back from packed binary to the array form.
///
/// # Examples
///
/// ```
/// use tb_codec::ser::{ScalarCodec, ScalarShape, UsageSite, contextualize_scalar};
///
/// let prototype = ScalarCodec::prototype();
/// assert_eq!(prototype.shape(), ScalarShape::Natural);
///
/// let site = UsageSite::anonymous().with_scalar_shape(ScalarShape::PackedBinary);
/// let packed = contextualize_scalar(&prototype, &site);
/// assert_eq!(packed.shape(), ScalarShape::PackedBinary);
///
/// // Reversible: a later override switches back.
/// let site = UsageSite::anonymous().with_scalar_shape(ScalarShape::Natural);
/// let natural = contextualize_scalar(&packed, &site);
/// assert_eq!(natural.shape(), ScalarShape::Natural);
/// ```
#[derive(Debug)]
pub struct ScalarCodec {
    shape: ScalarShape,
    unwrap_single: Option<bool>,
    site: Option<SiteId>,
}

impl ScalarCodec {
    /// Creates an unspecialized codec: natural shape, no overrides.
    #[inline]
    pub const fn new() -> Self {
        Self {
            shape: ScalarShape::Natural,
            unwrap_single: None,
            site: None,
        }
    }

    /// Creates a shared prototype codec.
    #[inline]
    pub fn prototype() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the output shape.
    #[inline]
    pub const fn shape(&self) -> ScalarShape {
        self.shape
    }

    /// Returns the unwrap-single tri-state.
    #[inline]
    pub const fn unwrap_single(&self) -> Option<bool> {
        self.unwrap_single
    }

    /// Returns the usage site this codec was specialized for, if any.
    #[inline]
    pub const fn site(&self) -> Option<SiteId> {
        self.site
    }
}

impl Default for ScalarCodec {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Specializes a scalar-array prototype for one usage site.
///
/// Scalar contextualization cannot fail: the only derived fields are the
/// output shape and the unwrap tri-state. As with sequence codecs, the
/// prototype itself is returned when nothing changes.
pub fn contextualize_scalar(prototype: &Arc<ScalarCodec>, site: &UsageSite) -> Arc<ScalarCodec> {
    let shape = site.scalar_shape().unwrap_or(prototype.shape);
    let unwrap_single = site.unwrap_single().or(prototype.unwrap_single);
    let site = site.id().or(prototype.site);

    if shape == prototype.shape
        && unwrap_single == prototype.unwrap_single
        && site == prototype.site
    {
        return Arc::clone(prototype);
    }

    Arc::new(ScalarCodec {
        shape,
        unwrap_single,
        site,
    })
}

// -----------------------------------------------------------------------------
// ScalarElement

/// One primitive element kind of a scalar array.
///
/// Implemented for the integer primitives, `bool`, and the floats. Only the
/// floats are packable.
pub trait ScalarElement: Copy + Send + Sync {
    /// Whether the packed binary vector shape applies to this kind.
    const PACKABLE: bool = false;

    /// Writes one element as the format's scalar production.
    fn write<S: Serializer>(self, serializer: S) -> Result<S::Ok, S::Error>;

    /// Appends this element's big-endian bit pattern to the buffer.
    ///
    /// Only called when [`PACKABLE`](ScalarElement::PACKABLE) holds.
    fn pack_be(self, _out: &mut Vec<u8>) {}
}

macro_rules! impl_scalar_element {
    ($ty:ty, $method:ident) => {
        impl ScalarElement for $ty {
            #[inline]
            fn write<S: Serializer>(self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.$method(self)
            }
        }
    };
    (float $ty:ty, $method:ident) => {
        impl ScalarElement for $ty {
            const PACKABLE: bool = true;

            #[inline]
            fn write<S: Serializer>(self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.$method(self)
            }

            #[inline]
            fn pack_be(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_be_bytes());
            }
        }
    };
}

impl_scalar_element!(bool, serialize_bool);
impl_scalar_element!(u8, serialize_u8);
impl_scalar_element!(u16, serialize_u16);
impl_scalar_element!(u32, serialize_u32);
impl_scalar_element!(u64, serialize_u64);
impl_scalar_element!(i8, serialize_i8);
impl_scalar_element!(i16, serialize_i16);
impl_scalar_element!(i32, serialize_i32);
impl_scalar_element!(i64, serialize_i64);
impl_scalar_element!(float f32, serialize_f32);
impl_scalar_element!(float f64, serialize_f64);

// -----------------------------------------------------------------------------
// ScalarArrayDriver

/// Serializer for a primitive scalar slice.
///
/// No element codec resolution, no dispatch cache, no suppression: the
/// element type is fixed, and the only decisions are the output shape and
/// unwrap-single.
///
/// # Examples
///
/// ```
/// use tb_codec::ser::{CodecConfig, ScalarArrayDriver, ScalarCodec};
///
/// let codec = ScalarCodec::new();
/// let config = CodecConfig::default();
///
/// let data = [1_i32, 2, 3];
/// let driver = ScalarArrayDriver::new(&codec, &data, &config);
///
/// assert_eq!(serde_json::to_string(&driver).unwrap(), "[1,2,3]");
/// ```
pub struct ScalarArrayDriver<'a, T: ScalarElement> {
    codec: &'a ScalarCodec,
    data: &'a [T],
    config: &'a CodecConfig,
}

impl<'a, T: ScalarElement> ScalarArrayDriver<'a, T> {
    /// Creates a driver for one scalar slice.
    #[inline]
    pub const fn new(codec: &'a ScalarCodec, data: &'a [T], config: &'a CodecConfig) -> Self {
        Self {
            codec,
            data,
            config,
        }
    }
}

impl<T: ScalarElement> Serialize for ScalarArrayDriver<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if T::PACKABLE && self.codec.shape() == ScalarShape::PackedBinary {
            let mut buffer = Vec::with_capacity(core::mem::size_of_val(self.data));
            for element in self.data {
                element.pack_be(&mut buffer);
            }
            return serializer.serialize_bytes(&buffer);
        }

        if self.data.len() == 1
            && self
                .codec
                .unwrap_single()
                .unwrap_or(self.config.unwrap_single_arrays)
        {
            return self.data[0].write(serializer);
        }

        let mut state = serializer.serialize_seq(Some(self.data.len()))?;
        for element in self.data {
            state.serialize_element(&Emit(*element))?;
        }
        state.end()
    }
}

/// One scalar element as a `Serialize`.
struct Emit<T: ScalarElement>(T);

impl<T: ScalarElement> Serialize for Emit<T> {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.write(serializer)
    }
}

// -----------------------------------------------------------------------------
// CharArrayDriver

/// Serializer for a char slice.
///
/// Char arrays default to a single string production; the
/// write-char-arrays-as-arrays flag forces the array-of-strings form
/// instead.
///
/// # Examples
///
/// ```
/// use tb_codec::ser::{CharArrayDriver, CodecConfig};
///
/// let config = CodecConfig::default();
/// let data = ['a', 'b', 'c'];
///
/// let driver = CharArrayDriver::new(&data, &config);
/// assert_eq!(serde_json::to_string(&driver).unwrap(), r#""abc""#);
///
/// let config = CodecConfig {
///     char_arrays_as_arrays: true,
///     ..CodecConfig::default()
/// };
/// let driver = CharArrayDriver::new(&data, &config);
/// assert_eq!(serde_json::to_string(&driver).unwrap(), r#"["a","b","c"]"#);
/// ```
pub struct CharArrayDriver<'a> {
    data: &'a [char],
    config: &'a CodecConfig,
}

impl<'a> CharArrayDriver<'a> {
    /// Creates a driver for one char slice.
    #[inline]
    pub const fn new(data: &'a [char], config: &'a CodecConfig) -> Self {
        Self { data, config }
    }
}

impl Serialize for CharArrayDriver<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.config.char_arrays_as_arrays {
            let mut state = serializer.serialize_seq(Some(self.data.len()))?;
            for ch in self.data {
                state.serialize_element(ch)?;
            }
            return state.end();
        }

        let string: String = self.data.iter().collect();
        serializer.serialize_str(&string)
    }
}

// -----------------------------------------------------------------------------
// Tests
