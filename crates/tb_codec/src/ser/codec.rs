use std::sync::Arc;

use crate::registry::TypeTraitEncode;
use crate::ser::{DispatchCache, SiteId, SuppressRule, TypeTag};
use crate::value::TypeRef;

// -----------------------------------------------------------------------------
// SeqCodec

/// The immutable container codec for sequence-shaped values.
///
/// One long-lived *prototype* exists per declared container kind; the
/// contextualization pipeline derives *specialized* instances from it, one
/// per usage site. Both are plain immutable values: a codec is never mutated
/// after creation, so it can be shared freely between threads and
/// traversals. The only interior state is the [`DispatchCache`], which is
/// append-only and lock-free.
///
/// Fields:
///
/// - **declared element type**: `None` means type-erased/unknown, and every
///   element resolves its codec by runtime type.
/// - **static typing**: the element runtime type is assumed fixed and equal
///   to the declared type, so the codec resolves eagerly.
/// - **type tag**: present iff elements may be polymorphic and must carry a
///   discriminator.
/// - **element codec**: the statically resolved codec, when static
///   resolution was possible.
/// - **unwrap single**, a tri-state: `Some(_)` overrides, `None` defers to
///   the global setting.
/// - **suppression rule**: the effective element suppression policy.
/// - **site**: opaque usage-site identity, used only for diagnostics and
///   cache keys.
///
/// # Examples
///
/// ```
/// use tb_codec::ser::SeqCodec;
/// use tb_codec::value::TypeRef;
///
/// let prototype = SeqCodec::prototype(Some(TypeRef::of::<i32>()));
/// assert!(!prototype.static_typing());
/// assert!(prototype.elem_codec().is_none());
/// ```
pub struct SeqCodec {
    elem_type: Option<TypeRef>,
    static_typing: bool,
    type_tag: Option<TypeTag>,
    elem_codec: Option<TypeTraitEncode>,
    unwrap_single: Option<bool>,
    suppress: SuppressRule,
    site: Option<SiteId>,
    dispatch: DispatchCache,
}

impl SeqCodec {
    /// Creates an unspecialized codec for the given declared element type.
    ///
    /// `None` declares a type-erased element: codecs are resolved per
    /// element at traversal time through the dispatch cache.
    pub fn new(elem_type: Option<TypeRef>) -> Self {
        Self {
            elem_type,
            static_typing: false,
            type_tag: None,
            elem_codec: None,
            unwrap_single: None,
            suppress: SuppressRule::Never,
            site: None,
            dispatch: DispatchCache::new(),
        }
    }

    /// Creates a shared prototype codec for the given declared element type.
    #[inline]
    pub fn prototype(elem_type: Option<TypeRef>) -> Arc<Self> {
        Arc::new(Self::new(elem_type))
    }

    /// Sets the type tag on a not-yet-shared codec.
    #[inline]
    pub fn with_type_tag(mut self, tag: TypeTag) -> Self {
        self.type_tag = Some(tag);
        self
    }

    /// Forces static typing on a not-yet-shared codec.
    #[inline]
    pub fn with_static_typing(mut self, static_typing: bool) -> Self {
        self.static_typing = static_typing;
        self
    }

    /// Sets the unwrap-single override on a not-yet-shared codec.
    #[inline]
    pub fn with_unwrap_single(mut self, unwrap: bool) -> Self {
        self.unwrap_single = Some(unwrap);
        self
    }

    /// Sets the suppression rule on a not-yet-shared codec.
    #[inline]
    pub fn with_suppression(mut self, rule: SuppressRule) -> Self {
        self.suppress = rule;
        self
    }

    /// Returns the declared element type.
    #[inline]
    pub const fn elem_type(&self) -> Option<TypeRef> {
        self.elem_type
    }

    /// Whether element runtime types are assumed fixed and equal to the
    /// declared type.
    #[inline]
    pub const fn static_typing(&self) -> bool {
        self.static_typing
    }

    /// Returns the type tag, if elements must carry a discriminator.
    #[inline]
    pub const fn type_tag(&self) -> Option<&TypeTag> {
        self.type_tag.as_ref()
    }

    /// Returns the statically resolved element codec, if any.
    #[inline]
    pub const fn elem_codec(&self) -> Option<&TypeTraitEncode> {
        self.elem_codec.as_ref()
    }

    /// Returns the unwrap-single tri-state.
    #[inline]
    pub const fn unwrap_single(&self) -> Option<bool> {
        self.unwrap_single
    }

    /// Returns the element suppression rule.
    #[inline]
    pub const fn suppress(&self) -> &SuppressRule {
        &self.suppress
    }

    /// Returns the usage site this codec was specialized for, if any.
    #[inline]
    pub const fn site(&self) -> Option<SiteId> {
        self.site
    }

    /// Returns the dispatch cache.
    #[inline]
    pub(crate) const fn dispatch(&self) -> &DispatchCache {
        &self.dispatch
    }

    /// Builds a specialized codec from this prototype and the derived
    /// fields, or returns the prototype itself when every field is
    /// unchanged.
    ///
    /// Reference equality of the result against the prototype is the no-op
    /// signal: callers cache the returned `Arc` per usage site either way.
    pub(crate) fn specialize(
        self: &Arc<Self>,
        site: Option<SiteId>,
        static_typing: bool,
        type_tag: Option<TypeTag>,
        elem_codec: Option<TypeTraitEncode>,
        unwrap_single: Option<bool>,
        suppress: SuppressRule,
    ) -> Arc<Self> {
        let site = site.or(self.site);
        let unchanged = self.static_typing == static_typing
            && self.type_tag == type_tag
            && self.elem_codec == elem_codec
            && self.unwrap_single == unwrap_single
            && self.suppress == suppress
            && self.site == site;

        if unchanged {
            return Arc::clone(self);
        }

        Arc::new(Self {
            elem_type: self.elem_type,
            static_typing,
            type_tag,
            elem_codec,
            unwrap_single,
            suppress,
            site,
            // Specialized codecs start with their own empty cache: entries
            // are keyed by runtime type under *this* site's declared type.
            dispatch: DispatchCache::new(),
        })
    }
}

impl core::fmt::Debug for SeqCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeqCodec")
            .field("elem_type", &self.elem_type.map(|ty| ty.path()))
            .field("static_typing", &self.static_typing)
            .field("type_tag", &self.type_tag)
            .field("elem_codec", &self.elem_codec)
            .field("unwrap_single", &self.unwrap_single)
            .field("suppress", &self.suppress)
            .field("site", &self.site)
            .finish()
    }
}
