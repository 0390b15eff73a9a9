//! Contextualization and the sequence writer.
//!
//! ## Menu
//!
//! - [`SeqCodec`]: The immutable container codec: one prototype per
//!   declared container kind, one specialized instance per usage site.
//! - [`contextualize`]: The one-time specialization pipeline.
//! - [`UsageSite`] / [`SiteId`]: Per-site configuration and identity.
//! - [`CodecConfig`]: The explicit global-configuration snapshot.
//! - [`Inclusion`] / [`SuppressRule`]: Content-inclusion overrides and the
//!   effective element suppression rules derived from them.
//! - [`TypeTag`] / [`TagStyle`]: Type-discriminator framing for polymorphic
//!   elements.
//! - [`DispatchCache`]: The copy-on-write runtime-type → codec cache.
//! - Drivers, `serde` serializers pairing a codec with one value:
//!     - [`SequenceDriver`]: Any restartable sequence.
//!     - [`IterDriver`]: Single-pass iterator sources.
//!     - [`EntryDriver`]: Single-key map entries.
//!     - [`ScalarArrayDriver`] / [`CharArrayDriver`]: Primitive slices,
//!       including the packed-binary float vector shape.
//!
//! ## Writing a sequence
//!
//! ```
//! use tb_codec::registry::TypeRegistry;
//! use tb_codec::ser::{
//!     CodecConfig, Inclusion, SeqCodec, SequenceDriver, UsageSite, contextualize,
//! };
//! use tb_codec::value::{DynamicSequence, TypeRef};
//!
//! let registry = TypeRegistry::new();
//! let config = CodecConfig {
//!     content_filtering: true,
//!     ..CodecConfig::default()
//! };
//!
//! let prototype = SeqCodec::prototype(None);
//! let site = UsageSite::anonymous().with_inclusion(Inclusion::NonNull);
//! let codec = contextualize(&prototype, &site, &registry, &config).unwrap();
//!
//! let mut value = DynamicSequence::new();
//! value.push(1_i32);
//! value.push_null();
//! value.push(2_i32);
//!
//! let driver = SequenceDriver::new(&codec, &value, &registry, &config);
//! assert_eq!(serde_json::to_string(&driver).unwrap(), "[1,2]");
//! ```

// -----------------------------------------------------------------------------
// Modules

mod codec;
mod context;
mod dispatch;
mod driver;
mod error_utils;
mod inclusion;
mod scalar_arrays;
mod type_tag;
mod writer;

// -----------------------------------------------------------------------------
// Exports

pub use codec::SeqCodec;
pub use context::{CodecConfig, ContextError, SiteId, UsageSite, contextualize};
pub use dispatch::DispatchCache;
pub use driver::{EntryDriver, IterDriver, SequenceDriver};
pub use inclusion::{Inclusion, SuppressRule, ValuePredicate};
pub use scalar_arrays::{
    CharArrayDriver, ScalarArrayDriver, ScalarCodec, ScalarElement, ScalarShape,
    contextualize_scalar,
};
pub use type_tag::{TagStyle, TypeTag};
