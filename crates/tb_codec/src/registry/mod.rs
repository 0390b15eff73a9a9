//! The type registry: per-type metadata and capability lookup.
//!
//! ## Menu
//!
//! - [`TypeTrait`]: A capability attached to a registered type.
//! - [`FromType`]: Builds a `TypeTrait` for a concrete type.
//! - [`TypeMeta`]: One registered type: its [`TypeRef`], flags, and
//!   `TypeTrait` table.
//! - [`TypeRegistry`]: The store of `TypeMeta`s, indexed by [`TypeId`],
//!   type path, and (unambiguous) short name.
//! - TypeTraits:
//!     - [`TypeTraitEncode`]: The element codec, which writes a type-erased value
//!       through its `serde` implementation.
//!     - [`TypeTraitDefault`]: Provides the type's default value, consumed
//!       by default-value suppression.
//!
//! The registry doubles as the engine's codec lookup service: when a
//! sequence element's codec cannot be resolved statically, the writer asks
//! [`TypeRegistry::encode_codec`] for the element's runtime type on a
//! dispatch-cache miss.
//!
//! [`TypeRef`]: crate::value::TypeRef
//! [`TypeId`]: core::any::TypeId

// -----------------------------------------------------------------------------
// Modules

mod from_type;
mod traits;
mod type_meta;
mod type_registry;
mod type_trait;

// -----------------------------------------------------------------------------
// Exports

pub use from_type::FromType;
pub use traits::{Encoded, TypeTraitDefault, TypeTraitEncode};
pub use type_meta::{TypeFlags, TypeMeta};
pub use type_registry::TypeRegistry;
pub use type_trait::TypeTrait;
