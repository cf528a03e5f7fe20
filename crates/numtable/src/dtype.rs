//! Numeric element types.
//!
//! [`TypeTag`] names the primitive element kinds a table can store, and the
//! sealed [`Element`] trait connects each Rust primitive to its tag and to the
//! type-erased buffer enums in [`crate::buffer`].
//!
//! | Tag | Rust type | Width |
//! |-----|-----------|-------|
//! | `F32` | `f32` | 4 |
//! | `F64` | `f64` | 8 |
//! | `I32` | `i32` | 4 |
//! | `U32` | `u32` | 4 |
//! | `I64` | `i64` | 8 |
//! | `U64` | `u64` | 8 |

use std::fmt;

use crate::buffer::{NumSlice, NumSliceMut, NumVec};

/// Primitive element kind of a table, feature or buffer.
///
/// The discriminant order is the row/column order of the conversion
/// dispatch matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TypeTag {
    F32 = 0,
    F64 = 1,
    I32 = 2,
    U32 = 3,
    I64 = 4,
    U64 = 5,
}

impl TypeTag {
    /// Number of supported element kinds.
    pub const COUNT: usize = 6;

    /// All tags in dispatch order.
    pub const ALL: [TypeTag; Self::COUNT] = [
        TypeTag::F32,
        TypeTag::F64,
        TypeTag::I32,
        TypeTag::U32,
        TypeTag::I64,
        TypeTag::U64,
    ];

    /// Position of this tag in the dispatch matrix.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Size of one element in bytes.
    #[inline]
    pub const fn size_of(self) -> usize {
        match self {
            TypeTag::F32 | TypeTag::I32 | TypeTag::U32 => 4,
            TypeTag::F64 | TypeTag::I64 | TypeTag::U64 => 8,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, TypeTag::F32 | TypeTag::F64)
    }

    #[inline]
    pub const fn is_signed(self) -> bool {
        !matches!(self, TypeTag::U32 | TypeTag::U64)
    }

    /// Whether every value of `other` is exactly representable in `self`.
    pub const fn can_hold(self, other: TypeTag) -> bool {
        use TypeTag::*;
        self as usize == other as usize
            || matches!(
                (self, other),
                (F64, F32 | I32 | U32) | (I64, I32 | U32) | (U64, U32)
            )
    }

    /// Smallest tag able to carry values of both `self` and `other`.
    ///
    /// Floats promote to `F64`. A signed and a `U64` column promote to
    /// `I64`, whose `as` conversions wrap but still round-trip `u64` bits.
    pub const fn promote(self, other: TypeTag) -> TypeTag {
        use TypeTag::*;
        if self.can_hold(other) {
            return self;
        }
        if other.can_hold(self) {
            return other;
        }
        match (self, other) {
            (F32 | F64, _) | (_, F32 | F64) => F64,
            _ => I64,
        }
    }

    /// Short lowercase name (`"f32"`, `"u64"`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::I32 => "i32",
            TypeTag::U32 => "u32",
            TypeTag::I64 => "i64",
            TypeTag::U64 => "u64",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Sealed so the dispatch matrix stays exhaustive.
mod sealed {
    pub trait Sealed {}
}

/// A primitive type that can be stored in a table or requested in a block.
///
/// Implemented for `f32`, `f64`, `i32`, `u32`, `i64` and `u64`; sealed.
pub trait Element:
    sealed::Sealed
    + Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + Send
    + Sync
    + bytemuck::Pod
    + 'static
{
    /// Tag of this element type.
    const TAG: TypeTag;

    /// Downcast a type-erased slice to this element type.
    fn from_slice(buf: NumSlice<'_>) -> Option<&[Self]>;

    /// Downcast a type-erased mutable slice to this element type.
    fn from_slice_mut(buf: NumSliceMut<'_>) -> Option<&mut [Self]>;

    /// Erase the element type of a slice.
    fn wrap(values: &[Self]) -> NumSlice<'_>;

    /// Erase the element type of a mutable slice.
    fn wrap_mut(values: &mut [Self]) -> NumSliceMut<'_>;

    /// Erase the element type of an owned vector.
    fn into_num_vec(values: Vec<Self>) -> NumVec;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Element for $ty {
                const TAG: TypeTag = TypeTag::$variant;

                #[inline]
                fn from_slice(buf: NumSlice<'_>) -> Option<&[Self]> {
                    match buf {
                        NumSlice::$variant(s) => Some(s),
                        _ => None,
                    }
                }

                #[inline]
                fn from_slice_mut(buf: NumSliceMut<'_>) -> Option<&mut [Self]> {
                    match buf {
                        NumSliceMut::$variant(s) => Some(s),
                        _ => None,
                    }
                }

                #[inline]
                fn wrap(values: &[Self]) -> NumSlice<'_> {
                    NumSlice::$variant(values)
                }

                #[inline]
                fn wrap_mut(values: &mut [Self]) -> NumSliceMut<'_> {
                    NumSliceMut::$variant(values)
                }

                #[inline]
                fn into_num_vec(values: Vec<Self>) -> NumVec {
                    NumVec::$variant(values)
                }
            }
        )+
    };
}

impl_element!(f32 => F32, f64 => F64, i32 => I32, u32 => U32, i64 => I64, u64 => U64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_order_matches_discriminants() {
        for (i, tag) in TypeTag::ALL.iter().enumerate() {
            assert_eq!(tag.index(), i);
        }
    }

    #[test]
    fn element_tags() {
        assert_eq!(<f32 as Element>::TAG, TypeTag::F32);
        assert_eq!(<f64 as Element>::TAG, TypeTag::F64);
        assert_eq!(<i32 as Element>::TAG, TypeTag::I32);
        assert_eq!(<u32 as Element>::TAG, TypeTag::U32);
        assert_eq!(<i64 as Element>::TAG, TypeTag::I64);
        assert_eq!(<u64 as Element>::TAG, TypeTag::U64);
    }

    #[test]
    fn sizes_match_rust_types() {
        assert_eq!(TypeTag::F32.size_of(), std::mem::size_of::<f32>());
        assert_eq!(TypeTag::F64.size_of(), std::mem::size_of::<f64>());
        assert_eq!(TypeTag::U32.size_of(), std::mem::size_of::<u32>());
        assert_eq!(TypeTag::I64.size_of(), std::mem::size_of::<i64>());
    }

    #[test]
    fn wrap_and_unwrap() {
        let mut values = vec![1i64, 2, 3];
        assert_eq!(i64::from_slice(i64::wrap(&values)), Some(&[1i64, 2, 3][..]));
        assert!(f64::from_slice(i64::wrap(&values)).is_none());
        let s = i64::from_slice_mut(i64::wrap_mut(&mut values)).unwrap();
        s[0] = 7;
        assert_eq!(values[0], 7);
    }

    #[test]
    fn can_hold_is_exact_widening() {
        use TypeTag::*;
        assert!(F64.can_hold(F32));
        assert!(F64.can_hold(U32));
        assert!(I64.can_hold(I32));
        assert!(U64.can_hold(U32));
        assert!(!F32.can_hold(I32));
        assert!(!F64.can_hold(I64));
        assert!(!U64.can_hold(I32));
        assert!(!I32.can_hold(U32));
        for tag in TypeTag::ALL {
            assert!(tag.can_hold(tag));
        }
    }

    #[test]
    fn promotion() {
        use TypeTag::*;
        assert_eq!(I32.promote(I32), I32);
        assert_eq!(F32.promote(F64), F64);
        assert_eq!(F32.promote(I32), F64);
        assert_eq!(U64.promote(F32), F64);
        assert_eq!(I32.promote(U32), I64);
        assert_eq!(U32.promote(U64), U64);
        assert_eq!(I64.promote(U64), I64);
        for a in TypeTag::ALL {
            for b in TypeTag::ALL {
                assert_eq!(a.promote(b), b.promote(a), "{a} {b}");
            }
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(TypeTag::U32.to_string(), "u32");
        assert!(!TypeTag::U64.is_signed());
        assert!(TypeTag::F64.is_float());
    }
}
