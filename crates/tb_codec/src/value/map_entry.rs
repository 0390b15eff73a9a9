use crate::value::{Null, Value};

// -----------------------------------------------------------------------------
// MapEntry

/// A single-key map entry container.
///
/// A `MapEntry` is the sequence-shaped view of one key/value pair: it is
/// written as a map with exactly one entry, and its value side participates
/// in the same suppression and framing machinery as a sequence element.
///
/// # Examples
///
/// ```
/// use tb_codec::value::MapEntry;
///
/// let entry = MapEntry::new(String::from("answer"), 42_i32);
///
/// assert_eq!(entry.key().downcast_ref::<String>().unwrap(), "answer");
/// assert_eq!(entry.value().downcast_ref::<i32>(), Some(&42));
/// ```
pub struct MapEntry {
    key: Box<dyn Value>,
    value: Box<dyn Value>,
}

impl MapEntry {
    /// Creates an entry from a key and a value.
    #[inline]
    pub fn new<K: Value, V: Value>(key: K, value: V) -> Self {
        Self {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Creates an entry whose value is the null value.
    #[inline]
    pub fn with_null_value<K: Value>(key: K) -> Self {
        Self::new(key, Null)
    }

    /// Creates an entry from already-boxed key and value.
    #[inline]
    pub fn from_boxed(key: Box<dyn Value>, value: Box<dyn Value>) -> Self {
        Self { key, value }
    }

    /// Returns the key.
    #[inline]
    pub fn key(&self) -> &dyn Value {
        self.key.as_ref()
    }

    /// Returns the value.
    #[inline]
    pub fn value(&self) -> &dyn Value {
        self.value.as_ref()
    }
}

impl core::fmt::Debug for MapEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MapEntry")
            .field("key", &self.key())
            .field("value", &self.value())
            .finish()
    }
}
