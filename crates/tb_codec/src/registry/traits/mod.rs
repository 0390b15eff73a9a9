// -----------------------------------------------------------------------------
// Modules

mod default;
mod encode;

// -----------------------------------------------------------------------------
// Exports

pub use default::TypeTraitDefault;
pub use encode::{Encoded, TypeTraitEncode};
