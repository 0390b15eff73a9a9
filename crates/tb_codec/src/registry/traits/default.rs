use crate::registry::FromType;
use crate::value::Value;

// -----------------------------------------------------------------------------
// TypeTraitDefault

/// Provides [`Default`] support for a registered type.
///
/// Default-value suppression resolves the declared element type's default
/// once, through this capability, and compares elements against it during
/// traversal.
///
/// # Examples
///
/// ```
/// use tb_codec::registry::{TypeRegistry, TypeTraitDefault};
/// use core::any::TypeId;
///
/// let registry = TypeRegistry::new(); // `new` registers the primitive types
///
/// let provider = registry
///     .get_type_trait::<TypeTraitDefault>(TypeId::of::<i32>())
///     .unwrap();
///
/// assert_eq!(provider.default().downcast_ref::<i32>(), Some(&0));
/// ```
#[derive(Clone)]
pub struct TypeTraitDefault {
    func: fn() -> Box<dyn Value>,
}

impl TypeTraitDefault {
    /// Calls `T`'s [`Default`].
    ///
    /// `TypeTraitDefault` does not carry a type flag, but the function used
    /// internally is type specific.
    #[inline(always)]
    pub fn default(&self) -> Box<dyn Value> {
        (self.func)()
    }
}

impl<T: Default + Value> FromType<T> for TypeTraitDefault {
    fn from_type() -> Self {
        Self {
            func: || Box::<T>::default(),
        }
    }
}
