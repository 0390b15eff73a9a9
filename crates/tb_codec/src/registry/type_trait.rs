use core::any::Any;

// -----------------------------------------------------------------------------
// TypeTrait

/// A capability attached to a registered type.
///
/// A `TypeTrait` is an arbitrary piece of per-type data stored in a
/// [`TypeMeta`]'s trait table, typically a struct of function pointers
/// built by a [`FromType`] implementation, so that a capability of the
/// concrete type can be invoked through a type-erased value.
///
/// The trait is blanket-implemented for every `Clone + Send + Sync`
/// `'static` type, so capability structs only need to derive `Clone`.
///
/// [`TypeMeta`]: crate::registry::TypeMeta
/// [`FromType`]: crate::registry::FromType
pub trait TypeTrait: Any + Send + Sync {
    /// Clones this capability into a new box.
    fn clone_type_trait(&self) -> Box<dyn TypeTrait>;

    /// Returns the capability as a [`&dyn Any`](Any).
    fn as_any(&self) -> &dyn Any;

    /// Returns the capability as a [`&mut dyn Any`](Any).
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Send + Sync + Clone> TypeTrait for T {
    #[inline]
    fn clone_type_trait(&self) -> Box<dyn TypeTrait> {
        Box::new(self.clone())
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn TypeTrait {
    /// Returns a typed reference to this capability, or `None` if it is not
    /// a `T`.
    #[inline]
    pub fn downcast_ref<T: TypeTrait>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Returns a typed mutable reference to this capability, or `None` if it
    /// is not a `T`.
    #[inline]
    pub fn downcast_mut<T: TypeTrait>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}
