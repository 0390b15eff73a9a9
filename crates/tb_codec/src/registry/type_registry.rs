use core::any::TypeId;

use serde_core::Serialize;
use tb_utils::TypeIdMap;
use tb_utils::hash::{FixedHashState, HashMap, HashSet};

use crate::registry::{FromType, TypeMeta, TypeTrait, TypeTraitDefault, TypeTraitEncode};
use crate::value::{Null, TypePath, Value};

// -----------------------------------------------------------------------------
// TypeRegistry

/// A registry of element types.
///
/// This struct is the central store for type information. [Registering] a
/// type generates a new [`TypeMeta`] entry holding the type's codec and any
/// additional capabilities, indexed by [`TypeId`], type path, and (when
/// unambiguous) short name.
///
/// The registry is also the engine's codec lookup service: contextualization
/// resolves statically-typed element codecs through it, and the dispatch
/// cache fills itself from it on a miss.
///
/// # Example
///
/// ```
/// use tb_codec::registry::{TypeRegistry, TypeTraitDefault};
///
/// let registry = TypeRegistry::new();
///
/// let provider = registry
///     .get_with_type_name("String").unwrap()
///     .get_trait::<TypeTraitDefault>().unwrap();
///
/// let value = provider.default();
/// assert_eq!(value.type_path(), "alloc::string::String");
/// ```
///
/// [Registering]: TypeRegistry::register
pub struct TypeRegistry {
    type_meta_table: TypeIdMap<TypeMeta>,
    type_path_to_id: HashMap<&'static str, TypeId>,
    type_name_to_id: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`] .
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates an empty `TypeRegistry`.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            type_meta_table: TypeIdMap::new(),
            type_path_to_id: HashMap::with_hasher(FixedHashState),
            type_name_to_id: HashMap::with_hasher(FixedHashState),
            ambiguous_names: HashSet::with_hasher(FixedHashState),
        }
    }

    /// Creates a type registry with default registrations for the primitive
    /// element types.
    ///
    /// - `()` `bool` `char`
    /// - `i8 - i128` `isize`
    /// - `u8 - u128` `usize`
    /// - `f32` `f64`
    /// - `String` `&'static str` (sharing the engine's string codec)
    /// - [`Null`]
    ///
    /// All of them except `char`, `&'static str` and [`Null`] also get a
    /// [`TypeTraitDefault`].
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_with_default::<()>();
        registry.register_with_default::<bool>();
        registry.register::<char>();
        registry.register_with_default::<u8>();
        registry.register_with_default::<u16>();
        registry.register_with_default::<u32>();
        registry.register_with_default::<u64>();
        registry.register_with_default::<u128>();
        registry.register_with_default::<usize>();
        registry.register_with_default::<i8>();
        registry.register_with_default::<i16>();
        registry.register_with_default::<i32>();
        registry.register_with_default::<i64>();
        registry.register_with_default::<i128>();
        registry.register_with_default::<isize>();
        registry.register_with_default::<f32>();
        registry.register_with_default::<f64>();
        registry.register::<Null>();

        // `String` and `&'static str` share the marked string codec, so the
        // writer's direct string fast path can recognize them by identity.
        registry.register_with_codec::<String>(TypeTraitEncode::string());
        registry.register_type_trait::<String, TypeTraitDefault>();
        registry.register_with_codec::<&'static str>(TypeTraitEncode::string());

        registry
    }

    // # Validity
    // The type must **not** already exist.
    fn add_new_type_indices(
        type_meta: &TypeMeta,
        type_path_to_id: &mut HashMap<&'static str, TypeId>,
        type_name_to_id: &mut HashMap<&'static str, TypeId>,
        ambiguous_names: &mut HashSet<&'static str>,
    ) {
        let ty = type_meta.ty();
        let type_name = ty.name();

        // Check for duplicate names.
        // The type should **not** already exist.
        if !ambiguous_names.contains(type_name) {
            if type_name_to_id.contains_key(type_name) {
                type_name_to_id.remove(type_name);
                ambiguous_names.insert(type_name);
            } else {
                type_name_to_id.insert(type_name, ty.id());
            }
        }

        // For a new type, assuming that the full path cannot be duplicated.
        type_path_to_id.insert(ty.path(), ty.id());
    }

    // - If the key [`TypeId`] already exists, does nothing and returns `false`.
    // - If the key [`TypeId`] does not exist, inserts and returns `true`.
    fn register_internal(
        &mut self,
        type_id: TypeId,
        get_type_meta: impl FnOnce() -> TypeMeta,
    ) -> bool {
        self.type_meta_table.try_insert(type_id, || {
            let meta = get_type_meta();
            Self::add_new_type_indices(
                &meta,
                &mut self.type_path_to_id,
                &mut self.type_name_to_id,
                &mut self.ambiguous_names,
            );
            meta
        })
    }

    /// Registers the type `T` with its element codec, if it has not been
    /// registered already.
    ///
    /// # Example
    ///
    /// ```
    /// # use core::any::TypeId;
    /// # use tb_codec::registry::TypeRegistry;
    /// let mut registry = TypeRegistry::empty();
    /// registry.register::<u32>();
    ///
    /// assert!(registry.contains(TypeId::of::<u32>()));
    /// assert!(registry.encode_codec(TypeId::of::<u32>()).is_some());
    /// ```
    pub fn register<T: Value + TypePath + Serialize>(&mut self) {
        self.register_internal(TypeId::of::<T>(), || {
            let mut meta = TypeMeta::of::<T>();
            meta.insert_trait::<TypeTraitEncode>(FromType::<T>::from_type());
            meta
        });
    }

    /// Registers the type `T` with an explicit element codec.
    ///
    /// Use this to install a codec with extra capabilities (an emptiness
    /// probe, the string marker) instead of the plain `serde`-derived one.
    pub fn register_with_codec<T: Value + TypePath>(&mut self, codec: TypeTraitEncode) {
        self.register_internal(TypeId::of::<T>(), || {
            let mut meta = TypeMeta::of::<T>();
            meta.insert_trait(codec);
            meta
        });
    }

    /// Registers the type `T` with its element codec and a
    /// [`TypeTraitDefault`].
    #[inline]
    pub fn register_with_default<T: Value + TypePath + Serialize + Default>(&mut self) {
        self.register::<T>();
        self.register_type_trait::<T, TypeTraitDefault>();
    }

    /// Registers the type trait `D` for the already-registered type `T`.
    ///
    /// In cases where you want to add a capability beyond the element codec
    /// (a default provider, a custom probe), this method inserts additional
    /// type traits into `T`'s registration.
    ///
    /// # Example
    /// ```
    /// use tb_codec::registry::{TypeRegistry, TypeTraitDefault};
    ///
    /// let mut registry = TypeRegistry::empty();
    /// registry.register::<u64>();
    /// registry.register_type_trait::<u64, TypeTraitDefault>();
    /// ```
    pub fn register_type_trait<T: TypePath, D: TypeTrait + FromType<T>>(&mut self) {
        match self.type_meta_table.get_mut(&TypeId::of::<T>()) {
            Some(type_meta) => type_meta.insert_trait(D::from_type()),
            None => panic!(
                "Called `TypeRegistry::register_type_trait`, but the type `{}` of type_trait `{}` without registering",
                T::type_path(),
                core::any::type_name::<D>(),
            ),
        }
    }

    /// Whether the type with the given [`TypeId`] has been registered.
    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.type_meta_table.contains(&type_id)
    }

    /// Returns a reference to the [`TypeMeta`] of the type with the given
    /// [`TypeId`].
    ///
    /// If the specified type has not been registered, returns `None`.
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeMeta> {
        self.type_meta_table.get(&type_id)
    }

    /// Returns a mutable reference to the [`TypeMeta`] of the type with the
    /// given [`TypeId`].
    ///
    /// If the specified type has not been registered, returns `None`.
    #[inline]
    pub fn get_mut(&mut self, type_id: TypeId) -> Option<&mut TypeMeta> {
        self.type_meta_table.get_mut(&type_id)
    }

    /// Returns a reference to the [`TypeMeta`] of the type with the given
    /// [type path](TypePath::type_path).
    ///
    /// If no type with the given type path has been registered, returns
    /// `None`.
    pub fn get_with_type_path(&self, type_path: &str) -> Option<&TypeMeta> {
        match self.type_path_to_id.get(type_path) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Returns a reference to the [`TypeMeta`] of the type with the given
    /// [type name](TypePath::type_name).
    ///
    /// If the type name is ambiguous, or if no type with the given name has
    /// been registered, returns `None`.
    pub fn get_with_type_name(&self, type_name: &str) -> Option<&TypeMeta> {
        match self.type_name_to_id.get(type_name) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Returns `true` if the given [type name](TypePath::type_name) matches
    /// multiple registered types.
    pub fn is_ambiguous(&self, type_name: &str) -> bool {
        self.ambiguous_names.contains(type_name)
    }

    /// Returns a reference to the [`TypeTrait`] of type `T` associated with
    /// the given [`TypeId`].
    ///
    /// If the specified type has not been registered, or if `T` is not
    /// present in its registration, returns `None`.
    pub fn get_type_trait<T: TypeTrait>(&self, type_id: TypeId) -> Option<&T> {
        match self.get(type_id) {
            Some(type_meta) => type_meta.get_trait::<T>(),
            None => None,
        }
    }

    /// Returns an iterator over the [`TypeMeta`]s of the registered types.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeMeta> {
        self.type_meta_table.values()
    }

    // -------------------------------------------------------------------------
    // Codec lookup service

    /// Looks up the element codec for a runtime type.
    ///
    /// This is the lookup the dispatch cache performs on a miss. The clone
    /// is cheap (function pointers).
    #[inline]
    pub fn encode_codec(&self, type_id: TypeId) -> Option<TypeTraitEncode> {
        self.get_type_trait::<TypeTraitEncode>(type_id).cloned()
    }

    /// Produces the default value of a registered type, if it has a
    /// [`TypeTraitDefault`].
    #[inline]
    pub fn default_value(&self, type_id: TypeId) -> Option<Box<dyn Value>> {
        self.get_type_trait::<TypeTraitDefault>(type_id)
            .map(TypeTraitDefault::default)
    }

    /// Whether values declared as this type are always of this type.
    ///
    /// Unregistered types are not final: nothing is known about them.
    #[inline]
    pub fn is_final(&self, type_id: TypeId) -> bool {
        self.get(type_id).is_some_and(|meta| meta.flags().final_type)
    }

    /// Whether values of this type form a closed, non-polymorphic domain,
    /// exempt from type-discriminator framing.
    #[inline]
    pub fn is_closed_domain(&self, type_id: TypeId) -> bool {
        self.get(type_id)
            .is_some_and(|meta| meta.flags().closed_domain)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::TypeRegistry;
    use crate::registry::{TypeMeta, TypeTraitEncode};
    use crate::value::{TypePath, Value};
    use core::any::TypeId;

    #[test]
    fn lookup_by_path_and_name() {
        let registry = TypeRegistry::new();

        let meta = registry.get_with_type_path("alloc::string::String").unwrap();
        assert_eq!(meta.type_id(), TypeId::of::<String>());
        assert_eq!(
            registry.get_with_type_name("String").unwrap().type_id(),
            TypeId::of::<String>(),
        );
    }

    #[test]
    fn duplicate_short_names_become_ambiguous() {
        struct A;
        struct B;

        impl TypePath for A {
            fn type_path() -> &'static str {
                "tests::a::Dup"
            }
            fn type_name() -> &'static str {
                "Dup"
            }
        }
        impl TypePath for B {
            fn type_path() -> &'static str {
                "tests::b::Dup"
            }
            fn type_name() -> &'static str {
                "Dup"
            }
        }

        let mut registry = TypeRegistry::empty();
        let mut insert = |meta: TypeMeta| {
            let id = meta.type_id();
            registry.register_internal(id, || meta);
        };
        insert(TypeMeta::of::<A>());
        insert(TypeMeta::of::<B>());

        assert!(registry.is_ambiguous("Dup"));
        assert!(registry.get_with_type_name("Dup").is_none());
        assert!(registry.get_with_type_path("tests::a::Dup").is_some());
    }

    #[test]
    fn string_registrations_share_the_string_codec() {
        let registry = TypeRegistry::new();

        let codec = registry.encode_codec(TypeId::of::<String>()).unwrap();
        assert!(codec.is_string());

        let str_codec = registry.encode_codec(TypeId::of::<&'static str>()).unwrap();
        assert!(str_codec.is_string());

        let value: &dyn Value = &String::from("hi");
        let out = serde_json::to_string(&crate::registry::Encoded::new(&codec, value)).unwrap();
        assert_eq!(out, "\"hi\"");
    }

    #[test]
    fn final_and_closed_domain_flags() {
        let mut registry = TypeRegistry::new();
        assert!(registry.is_final(TypeId::of::<i32>()));
        assert!(!registry.is_closed_domain(TypeId::of::<i32>()));
        // Unregistered types have no facts.
        struct Unregistered;
        assert!(!registry.is_final(TypeId::of::<Unregistered>()));

        registry
            .get_mut(TypeId::of::<i32>())
            .unwrap()
            .set_closed_domain(true);
        assert!(registry.is_closed_domain(TypeId::of::<i32>()));
    }

    #[test]
    fn register_with_codec_keeps_first_registration() {
        let mut registry = TypeRegistry::empty();
        registry.register::<String>();
        registry.register_with_codec::<String>(TypeTraitEncode::string());

        let codec = registry.encode_codec(TypeId::of::<String>()).unwrap();
        assert!(!codec.is_string());
    }
}
