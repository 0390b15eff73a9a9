use core::any::TypeId;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::registry::TypeTraitEncode;

// -----------------------------------------------------------------------------
// DispatchCache

/// Growth cap. Past this many distinct runtime types under one declared
/// element type, resolution falls back to uncached per-call lookups.
const CACHE_CAP: usize = 8;

/// An append-only, copy-on-write cache from runtime type to element codec.
///
/// This is the engine's polymorphic inline cache: a sequence whose declared
/// element type is erased still gets a monomorphic fast path once it has
/// only ever observed one concrete runtime shape, degrading gracefully to
/// per-element lookups when shapes vary.
///
/// Reads never block: they load the current snapshot. An insert swaps in a
/// whole new snapshot containing the prior entries plus one; concurrent
/// inserts for the same key are idempotent, and a lost insert just means a
/// future call repeats the (idempotent) lookup. No entry is ever removed.
///
/// # Examples
///
/// ```
/// use core::any::TypeId;
/// use tb_codec::registry::TypeTraitEncode;
/// use tb_codec::ser::DispatchCache;
///
/// let cache = DispatchCache::new();
/// let id = TypeId::of::<i32>();
///
/// assert!(cache.resolve(id).is_none());
///
/// cache.insert(id, TypeTraitEncode::of::<i32>());
/// assert!(cache.resolve(id).is_some());
/// ```
pub struct DispatchCache {
    map: ArcSwap<CodecMap>,
}

impl DispatchCache {
    /// Creates an empty cache.
    #[inline]
    pub fn new() -> Self {
        Self {
            map: ArcSwap::from_pointee(CodecMap::Empty),
        }
    }

    /// Looks up the codec cached for a runtime type.
    ///
    /// Lock-free and allocation-free on the lookup itself; the returned
    /// codec is a cheap clone (function pointers).
    pub fn resolve(&self, type_id: TypeId) -> Option<TypeTraitEncode> {
        self.map.load().get(type_id).cloned()
    }

    /// Caches the codec for a runtime type.
    ///
    /// A no-op when the type is already cached or the cache is at capacity.
    pub fn insert(&self, type_id: TypeId, codec: TypeTraitEncode) {
        self.map.rcu(|current| match current.grown(type_id, &codec) {
            Some(next) => Arc::new(next),
            None => Arc::clone(current),
        });
    }

    /// Resolves through the cache, performing `lookup` on a miss and caching
    /// its result.
    ///
    /// `lookup` is not invoked when the cache already holds the type.
    pub fn resolve_or_insert(
        &self,
        type_id: TypeId,
        lookup: impl FnOnce() -> Option<TypeTraitEncode>,
    ) -> Option<TypeTraitEncode> {
        if let Some(codec) = self.resolve(type_id) {
            return Some(codec);
        }
        let codec = lookup()?;
        self.insert(type_id, codec.clone());
        Some(codec)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.map.load().len()
    }
}

impl Default for DispatchCache {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchCache")
            .field("len", &self.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// CodecMap

/// One immutable cache snapshot.
///
/// The single- and double-entry forms keep the common cases flat; the `Many`
/// form is a small linear-scanned vector; at the capped sizes a scan beats
/// hashing.
enum CodecMap {
    Empty,
    Single(TypeId, TypeTraitEncode),
    Double([(TypeId, TypeTraitEncode); 2]),
    Many(Vec<(TypeId, TypeTraitEncode)>),
}

impl CodecMap {
    fn get(&self, type_id: TypeId) -> Option<&TypeTraitEncode> {
        match self {
            Self::Empty => None,
            Self::Single(id, codec) => (*id == type_id).then_some(codec),
            Self::Double(entries) => entries
                .iter()
                .find(|(id, _)| *id == type_id)
                .map(|(_, codec)| codec),
            Self::Many(entries) => entries
                .iter()
                .find(|(id, _)| *id == type_id)
                .map(|(_, codec)| codec),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(..) => 1,
            Self::Double(_) => 2,
            Self::Many(entries) => entries.len(),
        }
    }

    /// Returns the snapshot grown by one entry, or `None` when no growth is
    /// needed (already present) or allowed (at capacity).
    fn grown(&self, type_id: TypeId, codec: &TypeTraitEncode) -> Option<CodecMap> {
        if self.get(type_id).is_some() || self.len() >= CACHE_CAP {
            return None;
        }
        Some(match self {
            Self::Empty => Self::Single(type_id, codec.clone()),
            Self::Single(id, existing) => Self::Double([
                (*id, existing.clone()),
                (type_id, codec.clone()),
            ]),
            Self::Double(entries) => {
                let mut grown = Vec::with_capacity(entries.len() + 1);
                grown.extend(entries.iter().cloned());
                grown.push((type_id, codec.clone()));
                Self::Many(grown)
            }
            Self::Many(entries) => {
                let mut grown = Vec::with_capacity(entries.len() + 1);
                grown.extend(entries.iter().cloned());
                grown.push((type_id, codec.clone()));
                Self::Many(grown)
            }
        })
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{CACHE_CAP, DispatchCache};
    use crate::registry::TypeTraitEncode;
    use core::any::TypeId;

    #[test]
    fn second_resolution_skips_the_lookup() {
        let cache = DispatchCache::new();
        let mut lookups = 0;

        for _ in 0..2 {
            let codec = cache.resolve_or_insert(TypeId::of::<i32>(), || {
                lookups += 1;
                Some(TypeTraitEncode::of::<i32>())
            });
            assert!(codec.is_some());
        }

        assert_eq!(lookups, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn duplicate_inserts_are_idempotent() {
        let cache = DispatchCache::new();
        cache.insert(TypeId::of::<i32>(), TypeTraitEncode::of::<i32>());
        cache.insert(TypeId::of::<i32>(), TypeTraitEncode::of::<i32>());

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.resolve(TypeId::of::<i32>()),
            Some(TypeTraitEncode::of::<i32>()),
        );
    }

    #[test]
    fn growth_progression_and_cap() {
        let cache = DispatchCache::new();

        macro_rules! fill {
            ($($ty:ty),*) => {
                $(cache.insert(TypeId::of::<$ty>(), TypeTraitEncode::of::<$ty>());)*
            };
        }
        fill!(u8, u16, u32, u64, i8, i16, i32, i64);
        assert_eq!(cache.len(), CACHE_CAP);

        // Beyond the cap: the insert is dropped, resolution misses, and the
        // caller falls back to per-call lookups.
        cache.insert(TypeId::of::<bool>(), TypeTraitEncode::of::<bool>());
        assert_eq!(cache.len(), CACHE_CAP);
        assert!(cache.resolve(TypeId::of::<bool>()).is_none());
        assert!(cache.resolve(TypeId::of::<u8>()).is_some());

        let mut lookups = 0;
        for _ in 0..2 {
            cache.resolve_or_insert(TypeId::of::<bool>(), || {
                lookups += 1;
                Some(TypeTraitEncode::of::<bool>())
            });
        }
        assert_eq!(lookups, 2);
    }

    #[test]
    fn shared_across_threads() {
        use std::sync::Arc;

        let cache = Arc::new(DispatchCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.resolve_or_insert(TypeId::of::<i64>(), || {
                        Some(TypeTraitEncode::of::<i64>())
                    })
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert_eq!(cache.len(), 1);
    }
}
