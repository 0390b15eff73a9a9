// -----------------------------------------------------------------------------
// FromType

/// Builds a [`TypeTrait`] for a concrete type.
///
/// Capability structs implement `FromType<T>` once, generically, and the
/// registry calls [`from_type`](FromType::from_type) at registration time to
/// bind the capability to `T`.
///
/// # Example
///
/// ```
/// use tb_codec::registry::{FromType, TypeMeta, TypeTraitDefault};
///
/// let mut meta = TypeMeta::of::<String>();
/// meta.insert_trait::<TypeTraitDefault>(FromType::<String>::from_type());
///
/// let provider = meta.get_trait::<TypeTraitDefault>().unwrap();
/// let value = provider.default();
///
/// assert_eq!(value.downcast_ref::<String>().unwrap(), "");
/// ```
///
/// [`TypeTrait`]: crate::registry::TypeTrait
pub trait FromType<T> {
    fn from_type() -> Self;
}
