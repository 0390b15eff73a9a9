use core::any::TypeId;
use core::ops::{Deref, DerefMut};

use tb_utils::TypeIdMap;

use crate::registry::TypeTrait;
use crate::ser::Inclusion;
use crate::value::{TypePath, TypeRef};

// -----------------------------------------------------------------------------
// TypeFlags

/// Dispatch-relevant facts about a registered type.
///
/// These feed two decisions during contextualization and traversal:
///
/// - `final_type`: the runtime type of a value declared as this type is
///   always this type, so its codec can be resolved eagerly. Concrete Rust
///   types are final; a registration standing for an open family of values
///   (resolved per element at runtime) clears the flag.
/// - `closed_domain`: values of this type come from a closed, non-polymorphic
///   domain, so type-discriminator framing is never needed for them even
///   when the container frames its elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeFlags {
    pub final_type: bool,
    pub closed_domain: bool,
}

impl Default for TypeFlags {
    #[inline]
    fn default() -> Self {
        Self {
            final_type: true,
            closed_domain: false,
        }
    }
}

// -----------------------------------------------------------------------------
// TypeMeta

/// Runtime storage for type metadata, registered into the [`TypeRegistry`].
///
/// This includes the type's [`TypeRef`], its [`TypeFlags`], an optional
/// type-level content-inclusion override, and a [`TypeTrait`] table.
///
/// # Example
///
/// ```
/// use tb_codec::registry::{FromType, TypeMeta, TypeTraitDefault};
///
/// let mut meta = TypeMeta::of::<u32>();
/// meta.insert_trait::<TypeTraitDefault>(FromType::<u32>::from_type());
///
/// let provider = meta.get_trait::<TypeTraitDefault>().unwrap();
/// assert_eq!(provider.default().downcast_ref::<u32>(), Some(&0));
/// ```
///
/// [`TypeRegistry`]: crate::registry::TypeRegistry
pub struct TypeMeta {
    ty: TypeRef,
    flags: TypeFlags,
    content_inclusion: Option<Inclusion>,
    trait_table: TypeIdMap<Box<dyn TypeTrait>>,
}

impl TypeMeta {
    /// Creates an empty `TypeMeta` for a type.
    #[inline]
    pub fn of<T: TypePath>() -> Self {
        Self {
            ty: TypeRef::of::<T>(),
            flags: TypeFlags::default(),
            content_inclusion: None,
            trait_table: TypeIdMap::new(),
        }
    }

    /// Returns the [`TypeRef`] of the registered type.
    #[inline(always)]
    pub const fn ty(&self) -> TypeRef {
        self.ty
    }

    /// Returns the [`TypeId`] of the registered type.
    #[inline]
    pub const fn type_id(&self) -> TypeId {
        self.ty.id()
    }

    /// Returns the type path of the registered type.
    #[inline]
    pub const fn type_path(&self) -> &'static str {
        self.ty.path()
    }

    /// Returns the [`TypeFlags`] of the registered type.
    #[inline(always)]
    pub const fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// Marks whether values declared as this type are always of this type.
    #[inline]
    pub const fn set_final(&mut self, final_type: bool) {
        self.flags.final_type = final_type;
    }

    /// Marks whether values of this type form a closed, non-polymorphic
    /// domain.
    #[inline]
    pub const fn set_closed_domain(&mut self, closed_domain: bool) {
        self.flags.closed_domain = closed_domain;
    }

    /// Returns the type-level content-inclusion override, if any.
    #[inline]
    pub const fn content_inclusion(&self) -> Option<&Inclusion> {
        self.content_inclusion.as_ref()
    }

    /// Sets the type-level content-inclusion override.
    ///
    /// When a container's declared element type carries one, it applies to
    /// every usage site that has no site-level override of its own.
    #[inline]
    pub fn set_content_inclusion(&mut self, inclusion: Option<Inclusion>) {
        self.content_inclusion = inclusion;
    }

    /// Inserts a new [`TypeTrait`].
    #[inline(always)]
    pub fn insert_trait<T: TypeTrait>(&mut self, data: T) {
        self.insert_trait_by_id(TypeId::of::<T>(), Box::new(data));
    }

    // Block code inline.
    #[inline(never)]
    fn insert_trait_by_id(&mut self, id: TypeId, val: Box<dyn TypeTrait>) {
        self.trait_table.insert(id, val);
    }

    /// Gets a [`TypeTrait`] reference, or returns `None` if it doesn't exist.
    #[inline]
    pub fn get_trait<T: TypeTrait>(&self) -> Option<&T> {
        self.get_trait_by_id(TypeId::of::<T>())
            .and_then(<dyn TypeTrait>::downcast_ref)
    }

    /// Gets a [`TypeTrait`] reference, or returns `None` if it doesn't exist.
    pub fn get_trait_by_id(&self, type_id: TypeId) -> Option<&dyn TypeTrait> {
        self.trait_table.get(&type_id).map(Deref::deref)
    }

    /// Gets a mutable [`TypeTrait`] reference, or returns `None` if it
    /// doesn't exist.
    #[inline]
    pub fn get_trait_mut<T: TypeTrait>(&mut self) -> Option<&mut T> {
        self.trait_table
            .get_mut(&TypeId::of::<T>())
            .map(DerefMut::deref_mut)
            .and_then(<dyn TypeTrait>::downcast_mut)
    }

    /// Returns `true` if the specific [`TypeTrait`] exists.
    #[inline]
    pub fn has_trait<T: TypeTrait>(&self) -> bool {
        self.trait_table.contains(&TypeId::of::<T>())
    }

    /// Returns the number of [`TypeTrait`]s.
    #[inline]
    pub fn trait_len(&self) -> usize {
        self.trait_table.len()
    }
}

impl Clone for TypeMeta {
    fn clone(&self) -> Self {
        let mut new_table = TypeIdMap::with_capacity(self.trait_len());
        for (id, type_trait) in self.trait_table.iter() {
            new_table.insert(*id, (**type_trait).clone_type_trait());
        }

        Self {
            ty: self.ty,
            flags: self.flags,
            content_inclusion: self.content_inclusion.clone(),
            trait_table: new_table,
        }
    }
}

impl core::fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeMeta")
            .field("ty", &self.ty)
            .field("flags", &self.flags)
            .field("traits", &self.trait_table.len())
            .finish()
    }
}
