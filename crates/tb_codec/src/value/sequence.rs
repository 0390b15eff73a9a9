use std::collections::VecDeque;

use crate::value::{Null, Value};

// -----------------------------------------------------------------------------
// Sequence

/// The capability interface for sequence-shaped containers.
///
/// A sequence exposes exactly the two capabilities the writer needs: a cheap
/// element count when one is known, and a borrowing iterator over its
/// elements. All container kinds (indexed lists, sized collections,
/// heterogeneous sequences, count-unknown iterables) flow through this one
/// interface; the writer's behavior is parameterized by it instead of by the
/// concrete container type.
///
/// Single-pass iterator sources deliberately do *not* implement `Sequence`:
/// they cannot restart `elements`, so they enter the engine through the
/// dedicated iterator driver instead.
///
/// # Contract
///
/// `elements` must be restartable: every call returns a fresh iterator over
/// the same elements, and [`size_hint`](Sequence::size_hint), when `Some`,
/// must equal the number of elements that iterator yields.
///
/// # Examples
///
/// ```
/// use tb_codec::value::Sequence;
///
/// let vec = vec![10_u32, 20, 30];
/// let seq: &dyn Sequence = &vec;
///
/// assert_eq!(seq.size_hint(), Some(3));
/// assert!(!seq.is_empty());
/// assert!(!seq.has_single_element());
///
/// let first = seq.elements().next().unwrap();
/// assert_eq!(first.downcast_ref::<u32>(), Some(&10));
/// ```
pub trait Sequence: Send + Sync {
    /// Returns the element count, if it is cheaply known.
    ///
    /// `None` means the count can only be learned by iterating.
    fn size_hint(&self) -> Option<usize>;

    /// Returns a fresh iterator over the elements.
    fn elements(&self) -> Elements<'_>;

    /// Returns `true` if the sequence contains no elements.
    ///
    /// For count-unknown sequences this peeks one element of a fresh
    /// iterator, which consumes nothing from the sequence itself.
    fn is_empty(&self) -> bool {
        match self.size_hint() {
            Some(len) => len == 0,
            None => self.elements().next().is_none(),
        }
    }

    /// Returns `true` if the sequence contains exactly one element.
    ///
    /// For count-unknown sequences this peeks at most two elements of a
    /// fresh iterator, which consumes nothing from the sequence itself.
    fn has_single_element(&self) -> bool {
        match self.size_hint() {
            Some(len) => len == 1,
            None => {
                let mut elements = self.elements();
                elements.next().is_some() && elements.next().is_none()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Elements iterator

/// A borrowing iterator over a [`Sequence`]'s elements.
pub struct Elements<'a> {
    inner: Box<dyn Iterator<Item = &'a dyn Value> + 'a>,
}

impl<'a> Elements<'a> {
    /// Wraps any iterator of type-erased element references.
    #[inline]
    pub fn new(inner: impl Iterator<Item = &'a dyn Value> + 'a) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = &'a dyn Value;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// -----------------------------------------------------------------------------
// Std container impls

impl<T: Value> Sequence for Vec<T> {
    #[inline]
    fn size_hint(&self) -> Option<usize> {
        Some(self.len())
    }

    #[inline]
    fn elements(&self) -> Elements<'_> {
        Elements::new(self.iter().map(|value| value as &dyn Value))
    }
}

impl<T: Value> Sequence for VecDeque<T> {
    #[inline]
    fn size_hint(&self) -> Option<usize> {
        Some(self.len())
    }

    #[inline]
    fn elements(&self) -> Elements<'_> {
        Elements::new(self.iter().map(|value| value as &dyn Value))
    }
}

// -----------------------------------------------------------------------------
// DynamicSequence

/// A heterogeneous sequence of boxed values.
///
/// This is the container for element sets whose types vary (or are unknown
/// at the declaration site): every element is a boxed [`Value`], and the
/// writer resolves a codec per runtime type through the dispatch cache.
///
/// # Examples
///
/// ```
/// use tb_codec::value::{DynamicSequence, Sequence};
///
/// let mut seq = DynamicSequence::new();
/// seq.push(1_i32);
/// seq.push(String::from("two"));
/// seq.push_null();
///
/// assert_eq!(seq.size_hint(), Some(3));
/// assert!(seq.elements().nth(2).unwrap().is_null());
/// ```
#[derive(Default)]
pub struct DynamicSequence {
    values: Vec<Box<dyn Value>>,
}

impl DynamicSequence {
    /// Creates an empty `DynamicSequence`.
    #[inline]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Creates an empty `DynamicSequence` with at least the specified
    /// capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends an already-boxed value to the end of the sequence.
    #[inline]
    pub fn push_boxed(&mut self, value: Box<dyn Value>) {
        self.values.push(value);
    }

    /// Appends a value to the end of the sequence.
    #[inline]
    pub fn push<T: Value>(&mut self, value: T) {
        self.push_boxed(Box::new(value));
    }

    /// Appends the null value to the end of the sequence.
    #[inline]
    pub fn push_null(&mut self) {
        self.push_boxed(Box::new(Null));
    }

    /// Returns the number of elements in the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl Sequence for DynamicSequence {
    #[inline]
    fn size_hint(&self) -> Option<usize> {
        Some(self.values.len())
    }

    #[inline]
    fn elements(&self) -> Elements<'_> {
        Elements::new(self.values.iter().map(|value| value.as_ref()))
    }
}

impl<T: Value> FromIterator<T> for DynamicSequence {
    fn from_iter<I: IntoIterator<Item = T>>(values: I) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|value| Box::new(value) as Box<dyn Value>)
                .collect(),
        }
    }
}

impl FromIterator<Box<dyn Value>> for DynamicSequence {
    fn from_iter<I: IntoIterator<Item = Box<dyn Value>>>(values: I) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

// -----------------------------------------------------------------------------
// Iterable

/// Wrapper that hides a sequence's size.
///
/// Some sources can be iterated repeatedly but cannot report a count without
/// a full pass. `Iterable` models them for testing and for callers whose
/// containers genuinely lack a cheap length: it delegates iteration and
/// reports no size, forcing the writer down its count-unknown paths.
///
/// # Examples
///
/// ```
/// use tb_codec::value::{Iterable, Sequence};
///
/// let seq = Iterable::new(vec![1_i32]);
///
/// assert_eq!(seq.size_hint(), None);
/// assert!(seq.has_single_element());
/// ```
pub struct Iterable<S>(S);

impl<S: Sequence> Iterable<S> {
    /// Wraps a sequence, hiding its size.
    #[inline]
    pub const fn new(sequence: S) -> Self {
        Self(sequence)
    }
}

impl<S: Sequence> Sequence for Iterable<S> {
    #[inline]
    fn size_hint(&self) -> Option<usize> {
        None
    }

    #[inline]
    fn elements(&self) -> Elements<'_> {
        self.0.elements()
    }
}

// -----------------------------------------------------------------------------
// Tests
