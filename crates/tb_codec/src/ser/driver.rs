use core::cell::RefCell;

use serde_core::ser::SerializeMap;
use serde_core::{Serialize, Serializer};

use crate::registry::{Encoded, TypeRegistry};
use crate::ser::error_utils::{entry_error, make_custom_error};
use crate::ser::writer::{ElementEmit, WriteCx, write_elements, write_sequence};
use crate::ser::{CodecConfig, SeqCodec, TagStyle, TypeTag};
use crate::value::{MapEntry, Null, Sequence, Value};

/// The framing overlay used by [`SequenceDriver::framed`] when the codec
/// carries no tag of its own.
static OBJECT_ENTRY_TAG: TypeTag = TypeTag::new(TagStyle::ObjectEntry);

// -----------------------------------------------------------------------------
// SequenceDriver

/// Serializer for one sequence value through a specialized codec.
///
/// This is the engine's main entry point: pair a codec (usually the result
/// of [`contextualize`]) with a value, the registry, and the configuration
/// snapshot, and hand the driver to any `serde` serializer.
///
/// # Examples
///
/// ```
/// use tb_codec::registry::TypeRegistry;
/// use tb_codec::ser::{CodecConfig, SeqCodec, SequenceDriver, UsageSite, contextualize};
/// use tb_codec::value::TypeRef;
///
/// let registry = TypeRegistry::new();
/// let config = CodecConfig::default();
///
/// let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
/// let codec = contextualize(&prototype, &UsageSite::anonymous(), &registry, &config).unwrap();
///
/// let value = vec![1, 2, 3];
/// let driver = SequenceDriver::new(&codec, &value, &registry, &config);
///
/// assert_eq!(serde_json::to_string(&driver).unwrap(), "[1,2,3]");
/// ```
///
/// [`contextualize`]: crate::ser::contextualize
pub struct SequenceDriver<'a> {
    codec: &'a SeqCodec,
    value: &'a dyn Sequence,
    registry: &'a TypeRegistry,
    config: &'a CodecConfig,
    framed: bool,
}

impl<'a> SequenceDriver<'a> {
    /// Creates a driver for one sequence value.
    #[inline]
    pub const fn new(
        codec: &'a SeqCodec,
        value: &'a dyn Sequence,
        registry: &'a TypeRegistry,
        config: &'a CodecConfig,
    ) -> Self {
        Self {
            codec,
            value,
            registry,
            config,
            framed: false,
        }
    }

    /// Forces type-discriminator framing for the elements.
    ///
    /// When the codec carries no tag of its own, an object-entry tag is
    /// overlaid; elements from closed domains stay unframed either way.
    #[inline]
    pub const fn framed(mut self) -> Self {
        self.framed = true;
        self
    }

    fn cx(&self) -> WriteCx<'a> {
        WriteCx {
            codec: self.codec,
            registry: self.registry,
            config: self.config,
            force_tag: if self.framed {
                Some(&OBJECT_ENTRY_TAG)
            } else {
                None
            },
        }
    }
}

impl Serialize for SequenceDriver<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        write_sequence(&self.cx(), self.value, serializer)
    }
}

// -----------------------------------------------------------------------------
// IterDriver

/// Serializer for a single-pass iterator source.
///
/// The iterator is consumed by serialization, so a driver can only be
/// serialized once; a second attempt is an error. Single-pass sources never
/// unwrap to a bare element, since detecting "exactly one" would consume
/// state irreversibly; the output is always an array production.
///
/// # Examples
///
/// ```
/// use tb_codec::registry::TypeRegistry;
/// use tb_codec::ser::{CodecConfig, IterDriver, SeqCodec};
/// use tb_codec::value::Value;
///
/// let registry = TypeRegistry::new();
/// let config = CodecConfig::default();
/// let codec = SeqCodec::new(None);
///
/// let one = [7_i32];
/// let iter = one.iter().map(|v| v as &dyn Value);
/// let driver = IterDriver::new(&codec, iter, &registry, &config);
///
/// // Exactly one element, but single-pass sources still produce an array.
/// assert_eq!(serde_json::to_string(&driver).unwrap(), "[7]");
/// ```
pub struct IterDriver<'a, I> {
    codec: &'a SeqCodec,
    iter: RefCell<Option<I>>,
    registry: &'a TypeRegistry,
    config: &'a CodecConfig,
}

impl<'a, I: Iterator<Item = &'a dyn Value>> IterDriver<'a, I> {
    /// Creates a driver that will drain the iterator on serialization.
    #[inline]
    pub fn new(
        codec: &'a SeqCodec,
        iter: I,
        registry: &'a TypeRegistry,
        config: &'a CodecConfig,
    ) -> Self {
        Self {
            codec,
            iter: RefCell::new(Some(iter)),
            registry,
            config,
        }
    }
}

impl<'a, I: Iterator<Item = &'a dyn Value>> Serialize for IterDriver<'a, I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(iter) = self.iter.borrow_mut().take() else {
            return Err(make_custom_error(
                "single-pass iterator source already consumed",
            ));
        };
        let cx = WriteCx {
            codec: self.codec,
            registry: self.registry,
            config: self.config,
            force_tag: None,
        };
        write_elements(&cx, None, iter, serializer)
    }
}

// -----------------------------------------------------------------------------
// EntryDriver

/// Serializer for a single-key [`MapEntry`].
///
/// The entry is written as a map with one entry. Its value side goes
/// through the same suppression and framing machinery as a sequence
/// element; a suppressed value suppresses the whole entry, leaving an empty
/// map production. Failures are annotated with the entry key.
///
/// # Examples
///
/// ```
/// use tb_codec::registry::TypeRegistry;
/// use tb_codec::ser::{CodecConfig, EntryDriver, SeqCodec};
/// use tb_codec::value::MapEntry;
///
/// let registry = TypeRegistry::new();
/// let config = CodecConfig::default();
/// let codec = SeqCodec::new(None);
///
/// let entry = MapEntry::new(String::from("answer"), 42_i32);
/// let driver = EntryDriver::new(&codec, &entry, &registry, &config);
///
/// assert_eq!(serde_json::to_string(&driver).unwrap(), r#"{"answer":42}"#);
/// ```
pub struct EntryDriver<'a> {
    codec: &'a SeqCodec,
    entry: &'a MapEntry,
    registry: &'a TypeRegistry,
    config: &'a CodecConfig,
}

impl<'a> EntryDriver<'a> {
    /// Creates a driver for one map entry.
    #[inline]
    pub const fn new(
        codec: &'a SeqCodec,
        entry: &'a MapEntry,
        registry: &'a TypeRegistry,
        config: &'a CodecConfig,
    ) -> Self {
        Self {
            codec,
            entry,
            registry,
            config,
        }
    }
}

impl Serialize for EntryDriver<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let cx = WriteCx {
            codec: self.codec,
            registry: self.registry,
            config: self.config,
            force_tag: None,
        };
        let key = self.entry.key();
        let value = self.entry.value();
        let suppress = self.codec.suppress();

        // Resolve the value codec first: content-sensitive suppression
        // delegates the emptiness check to it.
        let value_codec = if value.is_null() {
            None
        } else {
            match self.codec.elem_codec() {
                Some(codec) => Some(codec.clone()),
                None => Some(cx.resolve_dynamic::<S::Error>(value, 0)?),
            }
        };

        let suppressed = match &value_codec {
            None => suppress.suppresses_null(),
            Some(codec) => suppress.suppresses_value(value, codec),
        };
        if suppressed {
            let state = serializer.serialize_map(Some(0))?;
            return state.end();
        }

        let key_codec = self.registry.encode_codec(key.ty_id()).ok_or_else(|| {
            make_custom_error(format_args!(
                "no element codec registered for the entry key type `{}`",
                key.type_path()
            ))
        })?;

        let mut state = serializer.serialize_map(Some(1))?;
        let result = match &value_codec {
            Some(codec) => state.serialize_entry(
                &Encoded::new(&key_codec, key),
                &ElementEmit::new(value, codec, cx.framing_for(value)),
            ),
            None => state.serialize_entry(&Encoded::new(&key_codec, key), &Null),
        };
        result.map_err(|err| entry_error(key, err))?;
        state.end()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use core::any::Any;
    use std::sync::Arc;

    use serde_core::Serialize;

    use super::{EntryDriver, IterDriver, SequenceDriver};
    use crate::registry::TypeRegistry;
    use crate::ser::{
        CodecConfig, Inclusion, SeqCodec, SiteId, TagStyle, TypeTag, UsageSite, contextualize,
    };
    use crate::value::{DynamicSequence, Iterable, MapEntry, Sequence, TypePath, TypeRef, Value};

    fn filtering() -> CodecConfig {
        CodecConfig {
            content_filtering: true,
            ..CodecConfig::default()
        }
    }

    fn json(codec: &SeqCodec, value: &dyn Sequence, registry: &TypeRegistry, config: &CodecConfig) -> String {
        serde_json::to_string(&SequenceDriver::new(codec, value, registry, config)).unwrap()
    }

    // -------------------------------------------------------------------------
    // Suppression

    #[test]
    fn null_suppression_is_gated_by_the_filtering_opt_in() {
        let registry = TypeRegistry::new();
        let prototype = SeqCodec::prototype(None);
        let site = UsageSite::anonymous().with_inclusion(Inclusion::NonNull);

        let mut value = DynamicSequence::new();
        value.push(1_i32);
        value.push_null();
        value.push(2_i32);
        value.push_null();

        let on = filtering();
        let codec = contextualize(&prototype, &site, &registry, &on).unwrap();
        assert_eq!(json(&codec, &value, &registry, &on), "[1,2]");

        let off = CodecConfig::default();
        let codec = contextualize(&prototype, &site, &registry, &off).unwrap();
        assert_eq!(json(&codec, &value, &registry, &off), "[1,null,2,null]");
    }

    #[test]
    fn empty_strings_are_suppressed_by_non_empty() {
        let registry = TypeRegistry::new();
        let config = filtering();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<String>()));
        let site = UsageSite::anonymous().with_inclusion(Inclusion::NonEmpty);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        let value = vec![String::new(), String::from("x"), String::new()];
        assert_eq!(json(&codec, &value, &registry, &config), r#"["x"]"#);

        // An empty container stays an empty array: this engine suppresses
        // elements, never the container itself.
        let empty: Vec<String> = vec![];
        assert_eq!(json(&codec, &empty, &registry, &config), "[]");
    }

    #[test]
    fn default_values_are_suppressed_by_non_default() {
        let registry = TypeRegistry::new();
        let config = filtering();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let site = UsageSite::anonymous().with_inclusion(Inclusion::NonDefault);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        let value = vec![0_i32, 0, 5];
        assert_eq!(json(&codec, &value, &registry, &config), "[5]");
    }

    #[test]
    fn custom_predicate_suppression() {
        let registry = TypeRegistry::new();
        let config = filtering();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let odd = Inclusion::Custom(Arc::new(|value: &dyn Value| {
            value.downcast_ref::<i32>().is_some_and(|v| v % 2 != 0)
        }));
        let site = UsageSite::anonymous().with_inclusion(odd);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        let value = vec![1_i32, 2, 3, 4];
        assert_eq!(json(&codec, &value, &registry, &config), "[2,4]");
    }

    // -------------------------------------------------------------------------
    // Unwrap-single

    #[test]
    fn unwrap_single_element_sequences() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let site = UsageSite::anonymous().with_unwrap_single(true);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        assert_eq!(json(&codec, &vec![9_i32], &registry, &config), "9");
        // Zero or two elements always produce a full array.
        assert_eq!(json(&codec, &Vec::<i32>::new(), &registry, &config), "[]");
        assert_eq!(json(&codec, &vec![9_i32, 8], &registry, &config), "[9,8]");
    }

    #[test]
    fn unwrap_defers_to_the_global_setting() {
        let registry = TypeRegistry::new();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let codec =
            contextualize(&prototype, &UsageSite::anonymous(), &registry, &CodecConfig::default())
                .unwrap();

        let on = CodecConfig {
            unwrap_single_arrays: true,
            ..CodecConfig::default()
        };
        assert_eq!(json(&codec, &vec![9_i32], &registry, &on), "9");

        let off = CodecConfig::default();
        assert_eq!(json(&codec, &vec![9_i32], &registry, &off), "[9]");

        // An explicit `Some(false)` override beats the global setting.
        let site = UsageSite::anonymous().with_unwrap_single(false);
        let codec = contextualize(&prototype, &site, &registry, &on).unwrap();
        assert_eq!(json(&codec, &vec![9_i32], &registry, &on), "[9]");
    }

    #[test]
    fn count_unknown_sources_unwrap_by_peeking() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let site = UsageSite::anonymous().with_unwrap_single(true);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        let one = Iterable::new(vec![9_i32]);
        assert_eq!(json(&codec, &one, &registry, &config), "9");

        let two = Iterable::new(vec![9_i32, 8]);
        assert_eq!(json(&codec, &two, &registry, &config), "[9,8]");
    }

    #[test]
    fn single_pass_sources_never_unwrap_and_drain_once() {
        let registry = TypeRegistry::new();
        let config = CodecConfig {
            unwrap_single_arrays: true,
            ..CodecConfig::default()
        };
        let codec = SeqCodec::new(None);

        let one = [7_i32];
        let driver = IterDriver::new(
            &codec,
            one.iter().map(|v| v as &dyn Value),
            &registry,
            &config,
        );
        assert_eq!(serde_json::to_string(&driver).unwrap(), "[7]");

        // The source is gone; serializing again is an error.
        let err = serde_json::to_string(&driver).unwrap_err();
        assert!(err.to_string().contains("already consumed"));
    }

    // -------------------------------------------------------------------------
    // Type framing

    #[test]
    fn framing_is_balanced_and_skips_suppressed_elements() {
        let registry = TypeRegistry::new();
        let config = filtering();
        let prototype =
            Arc::new(SeqCodec::new(None).with_type_tag(TypeTag::new(TagStyle::ObjectEntry)));
        let site = UsageSite::anonymous().with_inclusion(Inclusion::NonNull);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        let mut value = DynamicSequence::new();
        value.push(1_i32);
        value.push_null();
        value.push(2_i64);

        let out = json(&codec, &value, &registry, &config);
        assert_eq!(out, r#"[{"i32":1},{"i64":2}]"#);
        // One discriminator open and close per surviving element, none for
        // the suppressed null.
        assert_eq!(out.matches('{').count(), 2);
        assert_eq!(out.matches('}').count(), 2);
    }

    #[test]
    fn closed_domain_elements_stay_unframed() {
        #[derive(Clone, Copy)]
        struct Mode;

        impl TypePath for Mode {
            fn type_path() -> &'static str {
                "tests::Mode"
            }
            fn type_name() -> &'static str {
                "Mode"
            }
        }
        impl Value for Mode {
            fn type_path(&self) -> &'static str {
                <Self as TypePath>::type_path()
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn partial_eq(&self, other: &dyn Value) -> Option<bool> {
                Some(other.is::<Self>())
            }
        }
        impl Serialize for Mode {
            fn serialize<S: serde_core::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_str("fast")
            }
        }

        let mut registry = TypeRegistry::new();
        registry.register::<Mode>();
        registry
            .get_mut(core::any::TypeId::of::<Mode>())
            .unwrap()
            .set_closed_domain(true);

        let config = CodecConfig::default();
        let prototype =
            Arc::new(SeqCodec::new(None).with_type_tag(TypeTag::new(TagStyle::ObjectEntry)));
        let codec =
            contextualize(&prototype, &UsageSite::anonymous(), &registry, &config).unwrap();

        let mut value = DynamicSequence::new();
        value.push(Mode);
        value.push(5_i32);

        assert_eq!(
            json(&codec, &value, &registry, &config),
            r#"["fast",{"i32":5}]"#
        );
    }

    #[test]
    fn framed_driver_overlays_a_tag() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let codec = SeqCodec::new(None);

        let mut value = DynamicSequence::new();
        value.push(1_i32);

        let driver = SequenceDriver::new(&codec, &value, &registry, &config).framed();
        assert_eq!(serde_json::to_string(&driver).unwrap(), r#"[{"i32":1}]"#);
    }

    #[test]
    fn production_shape_is_format_agnostic() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let codec = SeqCodec::new(None);

        let mut value = DynamicSequence::new();
        value.push(1_i32);
        value.push(2_i32);

        let driver = SequenceDriver::new(&codec, &value, &registry, &config);
        assert_eq!(ron::to_string(&driver).unwrap(), "[1,2]");
    }

    // -------------------------------------------------------------------------
    // Dispatch

    #[test]
    fn dynamic_elements_populate_the_dispatch_cache() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let codec = SeqCodec::new(None);

        let mut value = DynamicSequence::new();
        value.push(1_i32);
        value.push(String::from("x"));
        value.push(2_i32);

        assert_eq!(json(&codec, &value, &registry, &config), r#"[1,"x",2]"#);
        assert_eq!(codec.dispatch().len(), 2);
    }

    #[test]
    fn unregistered_runtime_type_is_a_resolution_error() {
        struct Alien;
        impl TypePath for Alien {
            fn type_path() -> &'static str {
                "tests::Alien"
            }
            fn type_name() -> &'static str {
                "Alien"
            }
        }
        impl Value for Alien {
            fn type_path(&self) -> &'static str {
                <Self as TypePath>::type_path()
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn partial_eq(&self, _other: &dyn Value) -> Option<bool> {
                None
            }
        }

        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let codec = SeqCodec::new(None);

        let mut value = DynamicSequence::new();
        value.push(1_i32);
        value.push(Alien);

        let driver = SequenceDriver::new(&codec, &value, &registry, &config);
        let err = serde_json::to_string(&driver).unwrap_err();
        assert!(err.to_string().contains("tests::Alien"));
        assert!(err.to_string().contains("element index 1"));
    }

    // -------------------------------------------------------------------------
    // Error propagation

    struct Brittle(i32);

    impl TypePath for Brittle {
        fn type_path() -> &'static str {
            "tests::Brittle"
        }
        fn type_name() -> &'static str {
            "Brittle"
        }
    }
    impl Value for Brittle {
        fn type_path(&self) -> &'static str {
            <Self as TypePath>::type_path()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn partial_eq(&self, other: &dyn Value) -> Option<bool> {
            other.downcast_ref::<Self>().map(|other| self.0 == other.0)
        }
    }
    impl Serialize for Brittle {
        fn serialize<S: serde_core::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.0 < 0 {
                return Err(serde_core::ser::Error::custom("brittle element refused"));
            }
            serializer.serialize_i32(self.0)
        }
    }

    #[test]
    fn element_failures_carry_the_index_and_abort_the_traversal() {
        let mut registry = TypeRegistry::new();
        registry.register::<Brittle>();

        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<Brittle>()));
        let codec =
            contextualize(&prototype, &UsageSite::new(SiteId::new(1)), &registry, &config)
                .unwrap();

        let value = vec![Brittle(1), Brittle(2), Brittle(-3), Brittle(4), Brittle(5)];

        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut buffer);
        let driver = SequenceDriver::new(&codec, &value, &registry, &config);
        let err = driver.serialize(&mut serializer).unwrap_err();

        assert!(err.to_string().contains("element index 2"));
        assert!(err.to_string().contains("brittle element refused"));

        // Nothing for the failing element or its successors reached the sink.
        let written = String::from_utf8(buffer).unwrap();
        assert!(written.starts_with("[1,2"));
        assert!(!written.contains('4'));
        assert!(!written.contains('5'));
    }

    // -------------------------------------------------------------------------
    // String fast path

    #[test]
    fn string_sequences_take_the_direct_path() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<String>()));
        let codec =
            contextualize(&prototype, &UsageSite::anonymous(), &registry, &config).unwrap();

        assert!(codec.elem_codec().unwrap().is_string());

        let value = vec![String::from("a"), String::from("b")];
        assert_eq!(json(&codec, &value, &registry, &config), r#"["a","b"]"#);

        let slices: Vec<&'static str> = vec!["a", "b"];
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<&'static str>()));
        let codec =
            contextualize(&prototype, &UsageSite::anonymous(), &registry, &config).unwrap();
        assert_eq!(json(&codec, &slices, &registry, &config), r#"["a","b"]"#);
    }

    // -------------------------------------------------------------------------
    // Map entries

    #[test]
    fn suppressed_entry_value_leaves_an_empty_map() {
        let registry = TypeRegistry::new();
        let config = filtering();
        let prototype = SeqCodec::prototype(None);
        let site = UsageSite::anonymous().with_inclusion(Inclusion::NonNull);
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        let entry = MapEntry::with_null_value(String::from("gone"));
        let driver = EntryDriver::new(&codec, &entry, &registry, &config);
        assert_eq!(serde_json::to_string(&driver).unwrap(), "{}");

        // With filtering off, the null value is written.
        let off = CodecConfig::default();
        let codec = contextualize(&prototype, &site, &registry, &off).unwrap();
        let driver = EntryDriver::new(&codec, &entry, &registry, &off);
        assert_eq!(serde_json::to_string(&driver).unwrap(), r#"{"gone":null}"#);
    }

    #[test]
    fn entry_value_failures_carry_the_key() {
        let mut registry = TypeRegistry::new();
        registry.register::<Brittle>();

        let config = CodecConfig::default();
        let codec = SeqCodec::new(None);
        let entry = MapEntry::new(String::from("k"), Brittle(-1));

        let driver = EntryDriver::new(&codec, &entry, &registry, &config);
        let err = serde_json::to_string(&driver).unwrap_err();
        assert!(err.to_string().contains("entry value"));
        assert!(err.to_string().contains("alloc::string::String"));
    }
}
