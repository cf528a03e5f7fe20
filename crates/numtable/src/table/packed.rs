//! Packed symmetric and triangular tables.
//!
//! Reading walks every requested cell through [`locate`]: stored cells are
//! converted, implicit triangular cells come out as zero. Each row's stored
//! run is copied in one call; the mirrored or zero cells are handled one by
//! one.
//!
//! Writing is a masked scatter over the same classification:
//!
//! - writes to implicit-zero cells of a triangular table are discarded
//!   without error (there is no storage for them)
//! - for symmetric tables `(r, c)` and `(c, r)` share storage; when a block
//!   holds both, cells are written row by row and the later write wins

use ndarray::ArrayView2;

use super::{NumericTable, StorageLayout};
use crate::buffer::{NumSlice, NumSliceMut, NumVec};
use crate::config::TableOptions;
use crate::convert::converter;
use crate::dtype::{Element, TypeTag};
use crate::error::{Result, TableError, check_capacity, check_column, check_rows};
use crate::packed::{Cell, PackedLayout, locate, packed_len, position, stored_run};
use crate::schema::TableSchema;

/// Square matrix stored as one packed triangle.
///
/// # Example
///
/// ```
/// use numtable::{NumericTable, PackedLayout, PackedTable};
///
/// // Upper triangle of [[1, 2, 3], [2, 4, 5], [3, 5, 6]]
/// let table = PackedTable::from_vec(PackedLayout::UpperSymmetric, 3, vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
///
/// let mut block = [0i32; 9];
/// table.read_rows(0, 3, (&mut block[..]).into()).unwrap();
/// assert_eq!(block, [1, 2, 3, 2, 4, 5, 3, 5, 6]);
/// ```
#[derive(Debug, Clone)]
pub struct PackedTable {
    data: NumVec,
    dim: usize,
    layout: PackedLayout,
    schema: TableSchema,
}

impl PackedTable {
    /// Create a table from a packed array of `dim * (dim + 1) / 2` elements.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if the array length does not match
    /// `dim`.
    pub fn new(layout: PackedLayout, dim: usize, data: NumVec) -> Result<Self> {
        Self::with_options(layout, dim, data, &TableOptions::default())
    }

    /// Create a table with explicit options.
    pub fn with_options(
        layout: PackedLayout,
        dim: usize,
        data: NumVec,
        options: &TableOptions,
    ) -> Result<Self> {
        let expected = dim
            .checked_add(1)
            .and_then(|d| d.checked_mul(dim))
            .map(|n| n / 2);
        if expected != Some(data.len()) {
            return Err(TableError::InvalidStructure(format!(
                "packed array of {} elements does not match dimension {}",
                data.len(),
                dim
            )));
        }
        let schema = TableSchema::from_types(
            std::iter::repeat_n(data.tag(), dim),
            options.feature_kind,
            options.features_equal,
        );
        Ok(Self {
            data,
            dim,
            layout,
            schema,
        })
    }

    /// Create a table from a typed packed vector.
    pub fn from_vec<T: Element>(layout: PackedLayout, dim: usize, data: Vec<T>) -> Result<Self> {
        Self::new(layout, dim, data.into())
    }

    /// Pack the stored triangle of a full square matrix.
    ///
    /// Cells outside the stored triangle are ignored.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if the matrix is not square.
    pub fn from_square<T: Element>(layout: PackedLayout, matrix: ArrayView2<'_, T>) -> Result<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(TableError::InvalidStructure(format!(
                "packed tables need a square matrix, got {rows}x{cols}"
            )));
        }
        let mut packed = vec![T::default(); packed_len(rows)];
        for ((r, c), &v) in matrix.indexed_iter() {
            if layout.in_stored_triangle(r, c) {
                packed[position(layout, r, c, rows)] = v;
            }
        }
        Self::from_vec(layout, rows, packed)
    }

    /// Matrix dimension (rows == columns).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn packed_layout(&self) -> PackedLayout {
        self.layout
    }

    /// Native element type.
    #[inline]
    pub fn dtype(&self) -> TypeTag {
        self.data.tag()
    }

    /// Raw packed storage.
    #[inline]
    pub fn as_slice(&self) -> NumSlice<'_> {
        self.data.as_slice()
    }

    /// Convert the whole packed array into `dst`.
    pub fn read_packed(&self, dst: NumSliceMut<'_>) -> Result<()> {
        let len = self.data.len();
        check_capacity(len, dst.len())?;
        converter(self.dtype(), dst.tag()).upcast(len, 0, self.data.as_slice(), dst)
    }

    /// Replace the whole packed array from `src`.
    pub fn write_packed(&mut self, src: NumSlice<'_>) -> Result<()> {
        let len = self.data.len();
        check_capacity(len, src.len())?;
        converter(self.dtype(), src.tag()).downcast(len, 0, src, self.data.as_mut_slice())
    }

    /// Expand one logical row into `dst[dst_offset..dst_offset + dim]`.
    fn read_row(&self, row: usize, dst_offset: usize, dst: &mut NumSliceMut<'_>) -> Result<()> {
        let conv = converter(self.dtype(), dst.tag());
        let src = self.data.as_slice();
        let (run, start) = stored_run(self.layout, row, self.dim);
        conv.upcast_buffer_strided(run.len(), start, dst_offset + run.start, 1, src, dst.reborrow())?;

        for column in (0..self.dim).filter(|c| !run.contains(c)) {
            match locate(self.layout, row, column, self.dim) {
                Cell::Stored(offset) => {
                    conv.upcast_buffer_strided(1, offset, dst_offset + column, 1, src, dst.reborrow())?
                }
                Cell::Zero => dst.fill_zero(dst_offset + column..dst_offset + column + 1),
            }
        }
        Ok(())
    }

    /// Scatter one logical row from `src[src_offset..src_offset + dim]`.
    ///
    /// Returns the number of discarded implicit-zero writes.
    fn write_row(&mut self, row: usize, src_offset: usize, src: NumSlice<'_>) -> Result<usize> {
        let conv = converter(self.dtype(), src.tag());
        let (run, start) = stored_run(self.layout, row, self.dim);
        let mut discarded = 0;
        for column in 0..self.dim {
            if column == run.start {
                conv.downcast_buffer_strided(
                    run.len(),
                    start,
                    src_offset + run.start,
                    1,
                    src,
                    self.data.as_mut_slice(),
                )?;
            }
            if run.contains(&column) {
                continue;
            }
            match locate(self.layout, row, column, self.dim) {
                Cell::Stored(offset) => conv.downcast_buffer_strided(
                    1,
                    offset,
                    src_offset + column,
                    1,
                    src,
                    self.data.as_mut_slice(),
                )?,
                Cell::Zero => discarded += 1,
            }
        }
        Ok(discarded)
    }
}

impl NumericTable for PackedTable {
    #[inline]
    fn n_rows(&self) -> usize {
        self.dim
    }

    #[inline]
    fn n_columns(&self) -> usize {
        self.dim
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::Packed(self.layout)
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn read_rows(&self, first_row: usize, n_rows: usize, mut dst: NumSliceMut<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.dim)?;
        check_capacity(n_rows * self.dim, dst.len())?;
        for i in 0..n_rows {
            self.read_row(first_row + i, i * self.dim, &mut dst)?;
        }
        Ok(())
    }

    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.dim)?;
        check_capacity(n_rows * self.dim, src.len())?;
        let mut discarded = 0;
        for i in 0..n_rows {
            discarded += self.write_row(first_row + i, i * self.dim, src)?;
        }
        if discarded > 0 {
            tracing::trace!(
                layout = %self.layout,
                discarded,
                "ignored writes to implicit zero cells"
            );
        }
        Ok(())
    }

    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        mut dst: NumSliceMut<'_>,
    ) -> Result<()> {
        check_column(column, self.dim)?;
        check_rows(first_row, n_rows, self.dim)?;
        check_capacity(n_rows, dst.len())?;
        let conv = converter(self.dtype(), dst.tag());
        for i in 0..n_rows {
            match locate(self.layout, first_row + i, column, self.dim) {
                Cell::Stored(offset) => conv.upcast_buffer_strided(
                    1,
                    offset,
                    i,
                    1,
                    self.data.as_slice(),
                    dst.reborrow(),
                )?,
                Cell::Zero => dst.fill_zero(i..i + 1),
            }
        }
        Ok(())
    }

    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()> {
        check_column(column, self.dim)?;
        check_rows(first_row, n_rows, self.dim)?;
        check_capacity(n_rows, src.len())?;
        let conv = converter(self.dtype(), src.tag());
        let mut discarded = 0usize;
        for i in 0..n_rows {
            match locate(self.layout, first_row + i, column, self.dim) {
                Cell::Stored(offset) => {
                    conv.downcast_buffer_strided(1, offset, i, 1, src, self.data.as_mut_slice())?
                }
                Cell::Zero => discarded += 1,
            }
        }
        if discarded > 0 {
            tracing::trace!(
                layout = %self.layout,
                column,
                discarded,
                "ignored writes to implicit zero cells"
            );
        }
        Ok(())
    }

    fn as_packed(&self) -> Option<&PackedTable> {
        Some(self)
    }

    fn as_packed_mut(&mut self) -> Option<&mut PackedTable> {
        Some(self)
    }
}
