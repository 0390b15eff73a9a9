//! [`Value`] and [`TypePath`] implementations for the primitive element
//! types.

use core::any::Any;

use crate::value::{TypePath, Value};

// -----------------------------------------------------------------------------
// Impl macro

macro_rules! impl_value {
    ($ty:ty) => {
        impl_value!($ty, stringify!($ty), stringify!($ty));
    };
    ($ty:ty, $path:expr, $name:expr) => {
        impl TypePath for $ty {
            #[inline]
            fn type_path() -> &'static str {
                $path
            }

            #[inline]
            fn type_name() -> &'static str {
                $name
            }
        }

        impl Value for $ty {
            #[inline]
            fn type_path(&self) -> &'static str {
                <$ty as TypePath>::type_path()
            }

            #[inline]
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn partial_eq(&self, other: &dyn Value) -> Option<bool> {
                other.downcast_ref::<$ty>().map(|other| self == other)
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Primitives

impl_value!(());
impl_value!(bool);
impl_value!(char);

impl_value!(u8);
impl_value!(u16);
impl_value!(u32);
impl_value!(u64);
impl_value!(u128);
impl_value!(usize);

impl_value!(i8);
impl_value!(i16);
impl_value!(i32);
impl_value!(i64);
impl_value!(i128);
impl_value!(isize);

impl_value!(f32);
impl_value!(f64);

impl_value!(String, "alloc::string::String", "String");
impl_value!(&'static str, "&str", "&str");

// -----------------------------------------------------------------------------
// Tests
