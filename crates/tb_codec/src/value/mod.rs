//! The type-erased value model the engine traverses.
//!
//! ## Menu
//!
//! - [`Value`]: The type-erased element trait. Everything a sequence can
//!   contain is a `dyn Value`.
//! - [`TypePath`]: Static type path information for a concrete type.
//! - [`TypeRef`]: A cheap, copyable handle naming a declared type.
//! - [`Null`]: The dedicated null value.
//! - [`Sequence`]: The capability interface for sequence-shaped containers
//!   (element count + element iterator).
//! - [`DynamicSequence`]: A heterogeneous sequence of boxed values.
//! - [`Iterable`]: Wrapper hiding a sequence's size, for count-unknown
//!   sources.
//! - [`MapEntry`]: A single-key map entry container.
//!
//! Elements are written by codecs resolved from the [registry], never by a
//! `Serialize` bound on the container itself: a `Vec<T>` is a sequence as
//! soon as `T` is a [`Value`], whether or not the registry knows `T` yet.
//! Resolution happens at write time (or earlier, during contextualization).
//!
//! [registry]: crate::registry

// -----------------------------------------------------------------------------
// Modules

mod impls;
mod map_entry;
mod sequence;
mod type_path;
mod value;

// -----------------------------------------------------------------------------
// Exports

pub use map_entry::MapEntry;
pub use sequence::{DynamicSequence, Elements, Iterable, Sequence};
pub use type_path::{TypePath, TypeRef};
pub use value::{Null, Value};
