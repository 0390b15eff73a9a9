use serde_core::ser::SerializeSeq;
use serde_core::{Serialize, Serializer};

use crate::registry::{TypeRegistry, TypeTraitEncode};
use crate::ser::error_utils::{element_error, no_codec_error, with_frame};
use crate::ser::{CodecConfig, SeqCodec, TypeTag};
use crate::value::{Null, Sequence, Value};

// -----------------------------------------------------------------------------
// WriteCx

/// Everything one traversal needs: the specialized codec, the registry (as
/// codec lookup service), the configuration snapshot, and an optional
/// driver-level framing overlay.
pub(super) struct WriteCx<'a> {
    pub codec: &'a SeqCodec,
    pub registry: &'a TypeRegistry,
    pub config: &'a CodecConfig,
    pub force_tag: Option<&'a TypeTag>,
}

impl WriteCx<'_> {
    fn unwrap_enabled(&self) -> bool {
        self.codec
            .unwrap_single()
            .unwrap_or(self.config.unwrap_single_arrays)
    }

    /// The framing for one concrete element.
    ///
    /// Elements whose runtime type forms a closed, non-polymorphic domain
    /// are exempt: a reader never needs a discriminator for them.
    pub(super) fn framing_for(&self, element: &dyn Value) -> Option<&TypeTag> {
        let tag = self.codec.type_tag().or(self.force_tag)?;
        if self.registry.is_closed_domain(element.ty_id()) {
            None
        } else {
            Some(tag)
        }
    }

    /// Resolves an element codec by runtime type through the dispatch
    /// cache, falling back to the registry on a miss.
    pub(super) fn resolve_dynamic<E: serde_core::ser::Error>(
        &self,
        element: &dyn Value,
        index: usize,
    ) -> Result<TypeTraitEncode, E> {
        self.codec
            .dispatch()
            .resolve_or_insert(element.ty_id(), || {
                self.registry.encode_codec(element.ty_id())
            })
            .ok_or_else(|| no_codec_error(index, element.type_path()))
    }
}

// -----------------------------------------------------------------------------
// Sequence writing

/// Writes one sequence value through a specialized codec.
///
/// Entry point for every restartable container kind; the per-element loop is
/// shared with the single-pass path through [`write_elements`].
pub(super) fn write_sequence<S: Serializer>(
    cx: &WriteCx<'_>,
    value: &dyn Sequence,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    // Unwrap decision. `has_single_element` is a cheap count for sized
    // sources and a bounded two-element peek of a fresh iterator otherwise,
    // so nothing is consumed irreversibly here.
    if cx.unwrap_enabled() && value.has_single_element() {
        if let Some(element) = value.elements().next() {
            return write_single(cx, element, serializer);
        }
    }
    write_elements(cx, value.size_hint(), value.elements(), serializer)
}

/// Writes a one-element sequence as the bare element's production.
///
/// Suppression does not apply here: a standalone production cannot be
/// omitted by this engine; absence of the container as a whole is the
/// enclosing property's concern.
fn write_single<S: Serializer>(
    cx: &WriteCx<'_>,
    element: &dyn Value,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if element.is_null() {
        return Null.serialize(serializer);
    }

    let resolved;
    let codec = match cx.codec.elem_codec() {
        Some(codec) => codec,
        None => {
            resolved = cx.resolve_dynamic::<S::Error>(element, 0)?;
            &resolved
        }
    };

    with_frame(element.type_path(), || match cx.framing_for(element) {
        Some(tag) => tag.write_tagged(element, codec, serializer),
        None => codec.encode(element, serializer),
    })
    .map_err(|err| element_error(0, err))
}

/// The per-element loop shared by every container kind.
///
/// For each element: nulls are suppressed or written as the null
/// production; otherwise the codec is resolved (statically or through the
/// dispatch cache), content suppression is applied, and the element is
/// emitted, framed when the codec carries a type tag and the element's
/// runtime type is not a closed domain. A failure is annotated with the
/// element index and aborts the traversal; nothing more reaches the sink.
pub(super) fn write_elements<'a, S, I>(
    cx: &WriteCx<'_>,
    count: Option<usize>,
    elements: I,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    I: Iterator<Item = &'a dyn Value>,
{
    let suppress = cx.codec.suppress();
    let static_codec = cx.codec.elem_codec();
    let mut state = serializer.serialize_seq(count)?;

    for (index, element) in elements.enumerate() {
        if element.is_null() {
            if suppress.suppresses_null() {
                continue;
            }
            state
                .serialize_element(&Null)
                .map_err(|err| element_error(index, err))?;
            continue;
        }

        let resolved;
        let codec = match static_codec {
            Some(codec) => codec,
            None => {
                resolved = cx.resolve_dynamic::<S::Error>(element, index)?;
                &resolved
            }
        };

        // A suppressed element never opens framing.
        if suppress.suppresses_value(element, codec) {
            continue;
        }

        let framing = cx.framing_for(element);

        // Direct string fast path: the engine's own string codec, unframed.
        if framing.is_none() && codec.is_string() {
            if let Some(string) = element.downcast_ref::<String>() {
                state
                    .serialize_element(string.as_str())
                    .map_err(|err| element_error(index, err))?;
                continue;
            }
            if let Some(string) = element.downcast_ref::<&'static str>() {
                state
                    .serialize_element(*string)
                    .map_err(|err| element_error(index, err))?;
                continue;
            }
        }

        with_frame(element.type_path(), || {
            state.serialize_element(&ElementEmit {
                element,
                codec,
                framing,
            })
        })
        .map_err(|err| element_error(index, err))?;
    }

    state.end()
}

// -----------------------------------------------------------------------------
// ElementEmit

/// One element's production: the resolved codec applied to the value, with
/// optional discriminator framing around it.
pub(super) struct ElementEmit<'a> {
    element: &'a dyn Value,
    codec: &'a TypeTraitEncode,
    framing: Option<&'a TypeTag>,
}

impl<'a> ElementEmit<'a> {
    pub(super) fn new(
        element: &'a dyn Value,
        codec: &'a TypeTraitEncode,
        framing: Option<&'a TypeTag>,
    ) -> Self {
        Self {
            element,
            codec,
            framing,
        }
    }
}

impl Serialize for ElementEmit<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.framing {
            Some(tag) => tag.write_tagged(self.element, self.codec, serializer),
            None => self.codec.encode(self.element, serializer),
        }
    }
}
