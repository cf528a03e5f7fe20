//! Type-erased element buffers.
//!
//! Tables store elements of a runtime-selected [`TypeTag`], and callers ask
//! for blocks of another runtime-selected tag. The enums here carry a slice
//! (or vector) of one concrete primitive together with its tag:
//!
//! - [`NumSlice`]: shared slice, used as a conversion source
//! - [`NumSliceMut`]: mutable slice, used as a conversion destination
//! - [`NumVec`]: owned storage backing a table

use std::ops::Range;

use crate::convert::converter;
use crate::dtype::{Element, TypeTag};
use crate::error::Result;

/// Apply `$body` to the slice or vector inside any variant of `$enum`.
macro_rules! match_num {
    ($enum:ident, $value:expr, $bind:ident => $body:expr) => {
        match $value {
            $enum::F32($bind) => $body,
            $enum::F64($bind) => $body,
            $enum::I32($bind) => $body,
            $enum::U32($bind) => $body,
            $enum::I64($bind) => $body,
            $enum::U64($bind) => $body,
        }
    };
}

/// Like `match_num!`, but rewraps the result into the same variant of `$to`.
macro_rules! map_num {
    ($from:ident => $to:ident, $value:expr, $bind:ident => $body:expr) => {
        match $value {
            $from::F32($bind) => $to::F32($body),
            $from::F64($bind) => $to::F64($body),
            $from::I32($bind) => $to::I32($body),
            $from::U32($bind) => $to::U32($body),
            $from::I64($bind) => $to::I64($body),
            $from::U64($bind) => $to::U64($body),
        }
    };
}

// =============================================================================
// NumSlice
// =============================================================================

/// Shared slice of one primitive element type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumSlice<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
    I32(&'a [i32]),
    U32(&'a [u32]),
    I64(&'a [i64]),
    U64(&'a [u64]),
}

impl<'a> NumSlice<'a> {
    #[inline]
    pub fn tag(&self) -> TypeTag {
        match self {
            NumSlice::F32(_) => TypeTag::F32,
            NumSlice::F64(_) => TypeTag::F64,
            NumSlice::I32(_) => TypeTag::I32,
            NumSlice::U32(_) => TypeTag::U32,
            NumSlice::I64(_) => TypeTag::I64,
            NumSlice::U64(_) => TypeTag::U64,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match_num!(NumSlice, self, s => s.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sub-slice starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset > len()`.
    #[inline]
    pub fn tail(self, offset: usize) -> NumSlice<'a> {
        map_num!(NumSlice => NumSlice, self, s => &s[offset..])
    }

    /// Sub-slice covering `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    #[inline]
    pub fn slice(self, range: Range<usize>) -> NumSlice<'a> {
        map_num!(NumSlice => NumSlice, self, s => &s[range])
    }

    /// Raw bytes of the slice in native byte order.
    pub fn as_bytes(&self) -> &'a [u8] {
        match_num!(NumSlice, *self, s => bytemuck::cast_slice(s))
    }

    /// Convert every element into a fresh `Vec<T>`.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.len()];
        converter(self.tag(), T::TAG).upcast(self.len(), 0, *self, T::wrap_mut(&mut out))?;
        Ok(out)
    }
}

impl<'a, T: Element> From<&'a [T]> for NumSlice<'a> {
    fn from(values: &'a [T]) -> Self {
        T::wrap(values)
    }
}

impl<'a, T: Element> From<&'a Vec<T>> for NumSlice<'a> {
    fn from(values: &'a Vec<T>) -> Self {
        T::wrap(values)
    }
}

// =============================================================================
// NumSliceMut
// =============================================================================

/// Mutable slice of one primitive element type.
#[derive(Debug, PartialEq)]
pub enum NumSliceMut<'a> {
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
    I32(&'a mut [i32]),
    U32(&'a mut [u32]),
    I64(&'a mut [i64]),
    U64(&'a mut [u64]),
}

impl<'a> NumSliceMut<'a> {
    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.as_const().tag()
    }

    #[inline]
    pub fn len(&self) -> usize {
        match_num!(NumSliceMut, self, s => s.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shorter-lived mutable view of the same slice.
    #[inline]
    pub fn reborrow(&mut self) -> NumSliceMut<'_> {
        map_num!(NumSliceMut => NumSliceMut, self, s => &mut **s)
    }

    /// Mutable view starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset > len()`.
    #[inline]
    pub fn tail(&mut self, offset: usize) -> NumSliceMut<'_> {
        map_num!(NumSliceMut => NumSliceMut, self, s => &mut s[offset..])
    }

    /// Shared view of the same slice.
    #[inline]
    pub fn as_const(&self) -> NumSlice<'_> {
        map_num!(NumSliceMut => NumSlice, self, s => &**s)
    }

    /// Write zero into every element of `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    #[inline]
    pub fn fill_zero(&mut self, range: Range<usize>) {
        match_num!(NumSliceMut, self, s => s[range].fill(Default::default()))
    }
}

impl<'a, T: Element> From<&'a mut [T]> for NumSliceMut<'a> {
    fn from(values: &'a mut [T]) -> Self {
        T::wrap_mut(values)
    }
}

impl<'a, T: Element> From<&'a mut Vec<T>> for NumSliceMut<'a> {
    fn from(values: &'a mut Vec<T>) -> Self {
        T::wrap_mut(values)
    }
}

// =============================================================================
// NumVec
// =============================================================================

/// Owned vector of one primitive element type.
#[derive(Clone, Debug, PartialEq)]
pub enum NumVec {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
}

impl NumVec {
    /// Vector of `len` zeros of the given type.
    pub fn zeros(tag: TypeTag, len: usize) -> Self {
        match tag {
            TypeTag::F32 => NumVec::F32(vec![0.0; len]),
            TypeTag::F64 => NumVec::F64(vec![0.0; len]),
            TypeTag::I32 => NumVec::I32(vec![0; len]),
            TypeTag::U32 => NumVec::U32(vec![0; len]),
            TypeTag::I64 => NumVec::I64(vec![0; len]),
            TypeTag::U64 => NumVec::U64(vec![0; len]),
        }
    }

    /// Decode native-endian bytes into elements of `tag`.
    ///
    /// Trailing bytes that do not form a whole element are ignored.
    pub fn from_bytes(tag: TypeTag, bytes: &[u8]) -> Self {
        let whole = bytes.len() - bytes.len() % tag.size_of();
        let bytes = &bytes[..whole];
        match tag {
            TypeTag::F32 => NumVec::F32(bytemuck::pod_collect_to_vec(bytes)),
            TypeTag::F64 => NumVec::F64(bytemuck::pod_collect_to_vec(bytes)),
            TypeTag::I32 => NumVec::I32(bytemuck::pod_collect_to_vec(bytes)),
            TypeTag::U32 => NumVec::U32(bytemuck::pod_collect_to_vec(bytes)),
            TypeTag::I64 => NumVec::I64(bytemuck::pod_collect_to_vec(bytes)),
            TypeTag::U64 => NumVec::U64(bytemuck::pod_collect_to_vec(bytes)),
        }
    }

    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.as_slice().tag()
    }

    #[inline]
    pub fn len(&self) -> usize {
        match_num!(NumVec, self, v => v.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> NumSlice<'_> {
        map_num!(NumVec => NumSlice, self, v => v.as_slice())
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> NumSliceMut<'_> {
        map_num!(NumVec => NumSliceMut, self, v => v.as_mut_slice())
    }

    /// Raw bytes in native byte order.
    pub fn as_bytes(&self) -> &[u8] {
        self.as_slice().as_bytes()
    }

    /// Convert every element into a fresh `Vec<T>`.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.as_slice().to_vec()
    }
}

impl<T: Element> From<Vec<T>> for NumVec {
    fn from(values: Vec<T>) -> Self {
        T::into_num_vec(values)
    }
}
