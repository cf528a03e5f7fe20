//! Conversion dispatch matrix.
//!
//! Every pair of [`TypeTag`]s has a [`Converter`] in a `static` 6x6 table.
//! A converter copies elements between a *table-typed* array (the `src` tag)
//! and a *caller-typed* buffer (the `dst` tag) in either direction:
//!
//! - `upcast*`: table array → caller buffer
//! - `downcast*`: caller buffer → table array
//!
//! Each direction has four addressing modes. All of them are special cases
//! of the fully strided kernel:
//!
//! | Mode | Table side | Caller side |
//! |------|------------|-------------|
//! | plain | contiguous from offset | contiguous from 0 |
//! | `_strided` | strided from offset | contiguous from 0 |
//! | `_buffer_strided` | contiguous from offset | strided from offset |
//! | `_both_strided` | strided from offset | strided from offset |
//!
//! # Numeric semantics
//!
//! Elements are converted with Rust `as` casts (via [`AsPrimitive`]):
//!
//! - float → integer truncates toward zero; out-of-range values saturate and
//!   NaN becomes 0
//! - integer → integer keeps the low bits (wrapping)
//! - integer → float rounds to the nearest representable value
//!
//! None of these is reported as an error.
//!
//! # Exhaustiveness
//!
//! The table is built by a macro over all 36 pairs at compile time, so there
//! is no lookup that can miss. [`TableError::UnsupportedTypePair`] is only
//! returned when a converter is handed buffers of the wrong element types.

use num_traits::AsPrimitive;

use crate::buffer::{NumSlice, NumSliceMut};
use crate::dtype::{Element, TypeTag};
use crate::error::{Result, TableError};

/// Fully strided conversion kernel.
///
/// Arguments: `n, src_offset, dst_offset, src_step, dst_step, src, dst`.
type Kernel = fn(usize, usize, usize, usize, usize, NumSlice<'_>, NumSliceMut<'_>) -> Result<()>;

/// Conversion function object for one `(src, dst)` type pair.
///
/// `src` is the table's native element type, `dst` the caller's.
#[derive(Clone, Copy)]
pub struct Converter {
    src: TypeTag,
    dst: TypeTag,
    up: Kernel,
    down: Kernel,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .finish()
    }
}

impl Converter {
    const fn of<S, D>() -> Self
    where
        S: Element + AsPrimitive<D>,
        D: Element + AsPrimitive<S>,
    {
        Self {
            src: S::TAG,
            dst: D::TAG,
            up: convert_strided::<S, D>,
            down: convert_strided::<D, S>,
        }
    }

    /// Table-side element type.
    #[inline]
    pub fn src(&self) -> TypeTag {
        self.src
    }

    /// Caller-side element type.
    #[inline]
    pub fn dst(&self) -> TypeTag {
        self.dst
    }

    // =========================================================================
    // Upcast: table array -> caller buffer
    // =========================================================================

    /// Copy `n` contiguous elements from `src[src_offset..]` into `dst[..n]`.
    #[inline]
    pub fn upcast(
        &self,
        n: usize,
        src_offset: usize,
        src: NumSlice<'_>,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.up)(n, src_offset, 0, 1, 1, src, dst)
    }

    /// Copy `n` elements `src_step` apart into `dst[..n]`.
    ///
    /// Used for pulling one column out of row-major storage.
    #[inline]
    pub fn upcast_strided(
        &self,
        n: usize,
        src_offset: usize,
        src_step: usize,
        src: NumSlice<'_>,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.up)(n, src_offset, 0, src_step, 1, src, dst)
    }

    /// Copy `n` contiguous elements into `dst`, `dst_step` apart from
    /// `dst_offset`.
    ///
    /// Used for interleaving one feature array into a row-major block.
    #[inline]
    pub fn upcast_buffer_strided(
        &self,
        n: usize,
        src_offset: usize,
        dst_offset: usize,
        dst_step: usize,
        src: NumSlice<'_>,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.up)(n, src_offset, dst_offset, 1, dst_step, src, dst)
    }

    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub fn upcast_both_strided(
        &self,
        n: usize,
        src_offset: usize,
        dst_offset: usize,
        src_step: usize,
        dst_step: usize,
        src: NumSlice<'_>,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.up)(n, src_offset, dst_offset, src_step, dst_step, src, dst)
    }

    // =========================================================================
    // Downcast: caller buffer -> table array
    // =========================================================================

    /// Write `buf[..n]` into `native[offset..offset + n]`.
    #[inline]
    pub fn downcast(
        &self,
        n: usize,
        offset: usize,
        buf: NumSlice<'_>,
        native: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.down)(n, 0, offset, 1, 1, buf, native)
    }

    /// Write `buf[..n]` into `native`, `step` apart from `offset`.
    #[inline]
    pub fn downcast_strided(
        &self,
        n: usize,
        offset: usize,
        step: usize,
        buf: NumSlice<'_>,
        native: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.down)(n, 0, offset, 1, step, buf, native)
    }

    /// Gather `n` elements of `buf`, `buf_step` apart from `buf_offset`, into
    /// `native[offset..offset + n]`.
    #[inline]
    pub fn downcast_buffer_strided(
        &self,
        n: usize,
        offset: usize,
        buf_offset: usize,
        buf_step: usize,
        buf: NumSlice<'_>,
        native: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.down)(n, buf_offset, offset, buf_step, 1, buf, native)
    }

    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub fn downcast_both_strided(
        &self,
        n: usize,
        offset: usize,
        buf_offset: usize,
        step: usize,
        buf_step: usize,
        buf: NumSlice<'_>,
        native: NumSliceMut<'_>,
    ) -> Result<()> {
        (self.down)(n, buf_offset, offset, buf_step, step, buf, native)
    }
}

// =============================================================================
// Kernel
// =============================================================================

/// Elements needed to address `n > 0` items `step` apart from `offset`, or
/// `None` if that count overflows `usize`.
#[inline]
fn extent(n: usize, offset: usize, step: usize) -> Option<usize> {
    (n - 1).checked_mul(step)?.checked_add(offset)?.checked_add(1)
}

/// Fail unless a buffer of `actual` elements covers the addressed extent.
#[inline]
fn check_extent(n: usize, offset: usize, step: usize, actual: usize) -> Result<()> {
    match extent(n, offset, step) {
        Some(required) if required <= actual => Ok(()),
        required => Err(TableError::BufferCapacityMismatch {
            required: required.unwrap_or(usize::MAX),
            actual,
        }),
    }
}

fn convert_strided<S, D>(
    n: usize,
    src_offset: usize,
    dst_offset: usize,
    src_step: usize,
    dst_step: usize,
    src: NumSlice<'_>,
    dst: NumSliceMut<'_>,
) -> Result<()>
where
    S: Element + AsPrimitive<D>,
    D: Element,
{
    let pair = TableError::UnsupportedTypePair {
        src: src.tag(),
        dst: dst.tag(),
    };
    let (Some(src), Some(dst)) = (S::from_slice(src), D::from_slice_mut(dst)) else {
        return Err(pair);
    };
    if n == 0 {
        return Ok(());
    }

    check_extent(n, src_offset, src_step, src.len())?;
    check_extent(n, dst_offset, dst_step, dst.len())?;

    if src_step == 1 && dst_step == 1 {
        let src = &src[src_offset..src_offset + n];
        let dst = &mut dst[dst_offset..dst_offset + n];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s.as_();
        }
    } else {
        for i in 0..n {
            dst[dst_offset + i * dst_step] = src[src_offset + i * src_step].as_();
        }
    }
    Ok(())
}

// =============================================================================
// Dispatch matrix
// =============================================================================

macro_rules! converter_row {
    ($src:ty) => {
        [
            Converter::of::<$src, f32>(),
            Converter::of::<$src, f64>(),
            Converter::of::<$src, i32>(),
            Converter::of::<$src, u32>(),
            Converter::of::<$src, i64>(),
            Converter::of::<$src, u64>(),
        ]
    };
}

/// Rows are indexed by source tag, columns by destination tag, both in
/// [`TypeTag::ALL`] order.
static DISPATCH: [[Converter; TypeTag::COUNT]; TypeTag::COUNT] = [
    converter_row!(f32),
    converter_row!(f64),
    converter_row!(i32),
    converter_row!(u32),
    converter_row!(i64),
    converter_row!(u64),
];

/// Look up the converter between a table type and a caller type.
#[inline]
pub fn converter(src: TypeTag, dst: TypeTag) -> &'static Converter {
    &DISPATCH[src.index()][dst.index()]
}
