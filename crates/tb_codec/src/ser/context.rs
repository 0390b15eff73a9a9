use std::borrow::Cow;
use std::sync::Arc;

use crate::registry::{TypeRegistry, TypeTraitEncode};
use crate::ser::inclusion::rule_for;
use crate::ser::{Inclusion, ScalarShape, SeqCodec, SuppressRule};

// -----------------------------------------------------------------------------
// SiteId

/// An opaque usage-site identity.
///
/// Only used for diagnostics and as a cache-key component by the caller;
/// never consulted for behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SiteId(u64);

impl SiteId {
    /// Creates a site identity from a raw token.
    #[inline]
    pub const fn new(token: u64) -> Self {
        Self(token)
    }

    /// Returns the raw token.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// -----------------------------------------------------------------------------
// UsageSite

/// The per-site configuration a container codec is contextualized against.
///
/// A usage site is one place a declared container type is written from: a
/// property, a root value. It carries the format overrides, the inclusion
/// override, and any explicitly configured element codec for that place.
/// Sites are plain values built with consuming setters:
///
/// ```
/// use tb_codec::ser::{Inclusion, SiteId, UsageSite};
///
/// let site = UsageSite::new(SiteId::new(1))
///     .with_unwrap_single(true)
///     .with_inclusion(Inclusion::NonNull);
///
/// assert_eq!(site.unwrap_single(), Some(true));
/// ```
#[derive(Clone, Debug, Default)]
pub struct UsageSite {
    id: Option<SiteId>,
    unwrap_single: Option<bool>,
    scalar_shape: Option<ScalarShape>,
    inclusion: Option<Inclusion>,
    codec: Option<TypeTraitEncode>,
    content_codec: Option<TypeTraitEncode>,
}

impl UsageSite {
    /// A site with an identity and no overrides.
    #[inline]
    pub fn new(id: SiteId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// A site with no identity and no overrides.
    #[inline]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Sets the unwrap-single format override.
    #[inline]
    pub fn with_unwrap_single(mut self, unwrap: bool) -> Self {
        self.unwrap_single = Some(unwrap);
        self
    }

    /// Sets the scalar-array shape format override.
    #[inline]
    pub fn with_scalar_shape(mut self, shape: ScalarShape) -> Self {
        self.scalar_shape = Some(shape);
        self
    }

    /// Sets the content-inclusion override.
    #[inline]
    pub fn with_inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = Some(inclusion);
        self
    }

    /// Sets an explicitly configured element codec.
    ///
    /// Takes precedence over everything else during contextualization.
    #[inline]
    pub fn with_codec(mut self, codec: TypeTraitEncode) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Sets the content-codec annotation.
    ///
    /// Takes precedence over static resolution, but not over
    /// [`with_codec`](Self::with_codec).
    #[inline]
    pub fn with_content_codec(mut self, codec: TypeTraitEncode) -> Self {
        self.content_codec = Some(codec);
        self
    }

    /// Returns the site identity, if any.
    #[inline]
    pub const fn id(&self) -> Option<SiteId> {
        self.id
    }

    /// Returns the unwrap-single format override.
    #[inline]
    pub const fn unwrap_single(&self) -> Option<bool> {
        self.unwrap_single
    }

    /// Returns the scalar-array shape format override.
    #[inline]
    pub const fn scalar_shape(&self) -> Option<ScalarShape> {
        self.scalar_shape
    }

    /// Returns the content-inclusion override.
    #[inline]
    pub const fn inclusion(&self) -> Option<&Inclusion> {
        self.inclusion.as_ref()
    }

    /// Returns the explicitly configured element codec.
    #[inline]
    pub const fn codec(&self) -> Option<&TypeTraitEncode> {
        self.codec.as_ref()
    }

    /// Returns the content-codec annotation.
    #[inline]
    pub const fn content_codec(&self) -> Option<&TypeTraitEncode> {
        self.content_codec.as_ref()
    }
}

// -----------------------------------------------------------------------------
// CodecConfig

/// The immutable global-configuration snapshot.
///
/// Threaded explicitly into contextualization and the drivers, never read
/// from ambient state, so tests can vary flags per call without
/// cross-test interference.
#[derive(Clone, Debug, Default)]
pub struct CodecConfig {
    /// The global default for unwrap-single, used when a codec's tri-state
    /// is unset.
    pub unwrap_single_arrays: bool,
    /// Apply inclusion filtering to container contents.
    ///
    /// Content filtering has a cost and changes output shape for legacy
    /// consumers, so it is an explicit opt-in; with the flag off, every
    /// element is written.
    pub content_filtering: bool,
    /// Write char arrays as arrays of one-char strings instead of a single
    /// string production.
    pub char_arrays_as_arrays: bool,
    /// The global default content inclusion, used when neither the usage
    /// site nor the declared element type carries an override.
    pub default_content_inclusion: Option<Inclusion>,
}

// -----------------------------------------------------------------------------
// ContextError

/// An error derived during contextualization.
///
/// Resolution errors are fatal and surfaced immediately: a statically-typed
/// declared element whose codec cannot be found never reaches traversal.
#[derive(Debug)]
pub enum ContextError {
    /// No element codec is registered for the declared element type.
    UnresolvableElement { type_path: Cow<'static, str> },
}

impl core::fmt::Display for ContextError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnresolvableElement { type_path } => {
                write!(f, "no element codec registered for type `{type_path}`")
            }
        }
    }
}

impl core::error::Error for ContextError {}

// -----------------------------------------------------------------------------
// contextualize

/// Specializes a prototype container codec for one usage site.
///
/// Runs once per (declared element type, usage site) pair; every later
/// write of that pair goes straight to the writer with the returned codec.
/// The pipeline:
///
/// 1. Rebinds the type tag to the site.
/// 2. Resolves the element codec, in priority order: site-configured codec,
///    content-codec annotation, then, when static typing holds and the
///    declared element type is known, the registry's codec for the declared
///    type. Otherwise resolution is deferred to the dispatch cache at
///    traversal time.
/// 3. Resolves unwrap-single from the site's format override.
/// 4. Resolves the element suppression rule from the site's inclusion
///    override, the declared type's, or the global default, gated by the
///    content-filtering opt-in, so traversal never re-derives policy.
/// 5. Builds a new specialized codec, or returns the prototype unchanged
///    (reference equality is the no-op signal).
///
/// Contextualization is side-effect free and safe to race: two threads
/// specializing the same prototype both compute a valid instance, and
/// whichever the caller's cache keeps is correct.
///
/// # Errors
///
/// [`ContextError::UnresolvableElement`] when static typing holds but the
/// declared element type has no registered codec.
///
/// # Examples
///
/// ```
/// use tb_codec::registry::TypeRegistry;
/// use tb_codec::ser::{CodecConfig, SeqCodec, UsageSite, contextualize};
/// use tb_codec::value::TypeRef;
///
/// let registry = TypeRegistry::new();
/// let config = CodecConfig::default();
///
/// // A type-erased prototype with no overrides: the prototype itself
/// // comes back.
/// let prototype = SeqCodec::prototype(None);
/// let same = contextualize(&prototype, &UsageSite::anonymous(), &registry, &config).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&prototype, &same));
///
/// // A declared element type resolves its codec eagerly, and a format
/// // override forces a new specialized instance.
/// let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
/// let site = UsageSite::anonymous().with_unwrap_single(true);
/// let specialized = contextualize(&prototype, &site, &registry, &config).unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&prototype, &specialized));
/// assert!(specialized.static_typing());
/// assert_eq!(specialized.unwrap_single(), Some(true));
/// ```
pub fn contextualize(
    prototype: &Arc<SeqCodec>,
    site: &UsageSite,
    registry: &TypeRegistry,
    config: &CodecConfig,
) -> Result<Arc<SeqCodec>, ContextError> {
    // 1. Rebind the type tag to the usage site.
    let type_tag = prototype.type_tag().map(|tag| tag.rebound(site.id()));

    // 2. Resolve the element codec in priority order.
    let static_typing = prototype.static_typing()
        || prototype
            .elem_type()
            .is_some_and(|ty| registry.is_final(ty.id()));

    let elem_codec = if let Some(codec) = site.codec() {
        Some(codec.clone())
    } else if let Some(codec) = site.content_codec() {
        Some(codec.clone())
    } else if static_typing {
        match prototype.elem_type() {
            Some(ty) => Some(registry.encode_codec(ty.id()).ok_or_else(|| {
                ContextError::UnresolvableElement {
                    type_path: Cow::Borrowed(ty.path()),
                }
            })?),
            // The universal element type: defer to the dispatch cache.
            None => None,
        }
    } else {
        None
    };

    // 3. Resolve unwrap-single from the site's format override.
    let unwrap_single = site.unwrap_single().or(prototype.unwrap_single());

    // 4. Resolve the element suppression rule, gated by the opt-in.
    let suppress = if config.content_filtering {
        let inclusion = site
            .inclusion()
            .or_else(|| {
                prototype
                    .elem_type()
                    .and_then(|ty| registry.get(ty.id()))
                    .and_then(|meta| meta.content_inclusion())
            })
            .or(config.default_content_inclusion.as_ref());
        match inclusion {
            Some(inclusion) => rule_for(inclusion, prototype.elem_type(), registry),
            None => prototype.suppress().clone(),
        }
    } else {
        SuppressRule::Never
    };

    // 5. Build a specialized codec, or return the prototype unchanged.
    Ok(prototype.specialize(
        site.id(),
        static_typing,
        type_tag,
        elem_codec,
        unwrap_single,
        suppress,
    ))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{CodecConfig, ContextError, SiteId, UsageSite, contextualize};
    use crate::registry::{TypeRegistry, TypeTraitEncode};
    use crate::ser::{Inclusion, SeqCodec, SuppressRule, TagStyle, TypeTag};
    use crate::value::TypeRef;

    #[test]
    fn idempotent_and_reference_equal_when_unchanged() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(None);
        let site = UsageSite::anonymous();

        let first = contextualize(&prototype, &site, &registry, &config).unwrap();
        let second = contextualize(&prototype, &site, &registry, &config).unwrap();

        assert!(Arc::ptr_eq(&prototype, &first));
        assert!(Arc::ptr_eq(&prototype, &second));
    }

    #[test]
    fn idempotent_with_overrides() {
        let registry = TypeRegistry::new();
        let config = CodecConfig {
            content_filtering: true,
            ..CodecConfig::default()
        };
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let site = UsageSite::new(SiteId::new(9))
            .with_unwrap_single(false)
            .with_inclusion(Inclusion::NonNull);

        let first = contextualize(&prototype, &site, &registry, &config).unwrap();
        let second = contextualize(&prototype, &site, &registry, &config).unwrap();

        assert!(!Arc::ptr_eq(&prototype, &first));
        assert_eq!(first.unwrap_single(), second.unwrap_single());
        assert_eq!(first.suppress(), second.suppress());
        assert_eq!(first.site(), second.site());
    }

    #[test]
    fn final_declared_type_resolves_statically() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));

        let codec =
            contextualize(&prototype, &UsageSite::new(SiteId::new(1)), &registry, &config).unwrap();

        assert!(codec.static_typing());
        assert_eq!(codec.elem_codec().map(TypeTraitEncode::type_path), Some("i32"));
    }

    #[test]
    fn unresolvable_static_element_is_fatal() {
        struct Opaque;
        impl crate::value::TypePath for Opaque {
            fn type_path() -> &'static str {
                "tests::Opaque"
            }
            fn type_name() -> &'static str {
                "Opaque"
            }
        }

        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype =
            Arc::new(SeqCodec::new(Some(TypeRef::of::<Opaque>())).with_static_typing(true));

        let err = contextualize(&prototype, &UsageSite::anonymous(), &registry, &config)
            .unwrap_err();
        assert!(matches!(err, ContextError::UnresolvableElement { .. }));
        assert!(err.to_string().contains("tests::Opaque"));
    }

    #[test]
    fn site_codec_outranks_static_resolution() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));

        let site = UsageSite::anonymous().with_codec(TypeTraitEncode::of::<u64>());
        let codec = contextualize(&prototype, &site, &registry, &config).unwrap();

        assert_eq!(codec.elem_codec().map(TypeTraitEncode::type_path), Some("u64"));
    }

    #[test]
    fn filtering_gate_bakes_the_rule() {
        let registry = TypeRegistry::new();
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let site = UsageSite::anonymous().with_inclusion(Inclusion::NonNull);

        let off = CodecConfig::default();
        let codec = contextualize(&prototype, &site, &registry, &off).unwrap();
        assert_eq!(codec.suppress(), &SuppressRule::Never);

        let on = CodecConfig {
            content_filtering: true,
            ..CodecConfig::default()
        };
        let codec = contextualize(&prototype, &site, &registry, &on).unwrap();
        assert_eq!(codec.suppress(), &SuppressRule::IfNull);
    }

    #[test]
    fn type_level_inclusion_applies_without_site_override() {
        let mut registry = TypeRegistry::new();
        registry
            .get_mut(core::any::TypeId::of::<i32>())
            .unwrap()
            .set_content_inclusion(Some(Inclusion::NonDefault));

        let config = CodecConfig {
            content_filtering: true,
            ..CodecConfig::default()
        };
        let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
        let codec =
            contextualize(&prototype, &UsageSite::anonymous(), &registry, &config).unwrap();

        assert!(matches!(codec.suppress(), SuppressRule::IfEqualsDefault(_)));
    }

    #[test]
    fn tag_is_rebound_to_the_site() {
        let registry = TypeRegistry::new();
        let config = CodecConfig::default();
        let prototype =
            Arc::new(SeqCodec::new(None).with_type_tag(TypeTag::new(TagStyle::ObjectEntry)));

        let codec = contextualize(&prototype, &UsageSite::new(SiteId::new(7)), &registry, &config)
            .unwrap();

        assert_eq!(codec.type_tag().unwrap().site(), Some(SiteId::new(7)));
    }
}
