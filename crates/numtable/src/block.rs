//! Owned block handles over any [`NumericTable`].
//!
//! A block is requested with an [`AccessMode`], worked on in the caller's
//! element type `D`, and released back to the table it came from:
//!
//! ```
//! use numtable::{AccessMode, RowMajorTable, block};
//!
//! let mut table = RowMajorTable::from_vec(vec![1i32, 2, 3, 4], 2, 2).unwrap();
//!
//! let mut rows = block::get_block_of_rows::<f64, _>(&table, 1, 1, AccessMode::ReadWrite).unwrap();
//! rows.as_mut_slice()[0] = 9.7;
//! block::release_block_of_rows(&mut table, &rows).unwrap();
//!
//! assert_eq!(table.as_slice().to_vec::<i32>().unwrap(), vec![1, 2, 9, 4]);
//! ```
//!
//! | Mode        | Acquire                         | Release       |
//! |-------------|---------------------------------|---------------|
//! | `Read`      | materializes table values       | no-op         |
//! | `Write`     | zero-filled, table not read     | writes back   |
//! | `ReadWrite` | materializes table values       | writes back   |
//!
//! Writes to cells a layout cannot store (implicit triangular cells, dense
//! edits of CSR tables) are dropped on release.

use ndarray::{ArrayView2, ArrayViewMut2};
use tracing::{debug, warn};

use crate::dtype::Element;
use crate::error::{Result, TableError, check_column, check_rows};
use crate::packed::packed_len;
use crate::table::{NumericTable, StorageLayout};

/// How a block will be used between acquire and release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AccessMode {
    #[default]
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    /// Whether acquiring materializes the table's values.
    #[inline]
    pub const fn reads(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    /// Whether releasing writes the block back.
    #[inline]
    pub const fn writes(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Rows,
    Column(usize),
    Packed,
}

/// Dense block of table values converted to `D`, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Block<D> {
    data: Vec<D>,
    first_row: usize,
    n_rows: usize,
    n_columns: usize,
    target: Target,
    mode: AccessMode,
}

impl<D: Element> Block<D> {
    #[inline]
    pub fn as_slice(&self) -> &[D] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [D] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<D> {
        self.data
    }

    #[inline]
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Columns per block row; 1 for column blocks, the packed length for
    /// packed arrays.
    #[inline]
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Source column, for blocks from [`get_block_of_column_values`].
    pub fn column(&self) -> Option<usize> {
        match self.target {
            Target::Column(c) => Some(c),
            _ => None,
        }
    }

    /// The block as an `n_rows x n_columns` array.
    pub fn view(&self) -> Result<ArrayView2<'_, D>> {
        ArrayView2::from_shape((self.n_rows, self.n_columns), &self.data)
            .map_err(|e| TableError::InvalidStructure(e.to_string()))
    }

    /// Mutable counterpart of [`view`](Self::view).
    pub fn view_mut(&mut self) -> Result<ArrayViewMut2<'_, D>> {
        ArrayViewMut2::from_shape((self.n_rows, self.n_columns), &mut self.data)
            .map_err(|e| TableError::InvalidStructure(e.to_string()))
    }

    fn expect_target(&self, target: Target) -> Result<()> {
        if self.target == target {
            Ok(())
        } else {
            Err(TableError::InvalidStructure(format!(
                "block acquired as {:?} released as {:?}",
                self.target, target
            )))
        }
    }
}

/// Sparse sub-block of a CSR table, values converted to `D`.
///
/// Indices are one-based; `row_offsets` has `n_rows + 1` entries starting at
/// 1. Only `values` may be modified before release.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseBlock<D> {
    pub values: Vec<D>,
    col_indices: Vec<usize>,
    row_offsets: Vec<usize>,
    first_row: usize,
    n_rows: usize,
    mode: AccessMode,
}

impl<D: Element> SparseBlock<D> {
    #[inline]
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    #[inline]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_indices.len()
    }

    #[inline]
    pub fn first_row(&self) -> usize {
        self.first_row
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

// =============================================================================
// Dense rows and columns
// =============================================================================

/// Acquire rows `[first_row, first_row + n_rows)`, all columns.
pub fn get_block_of_rows<D, T>(
    table: &T,
    first_row: usize,
    n_rows: usize,
    mode: AccessMode,
) -> Result<Block<D>>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    debug!(layout = %table.layout(), dtype = %D::TAG, first_row, n_rows, ?mode, "get block of rows");
    check_rows(first_row, n_rows, table.n_rows())?;
    let n_columns = table.n_columns();
    let mut data = vec![D::default(); n_rows * n_columns];
    if mode.reads() {
        table.read_rows(first_row, n_rows, (&mut data).into())?;
    }
    Ok(Block {
        data,
        first_row,
        n_rows,
        n_columns,
        target: Target::Rows,
        mode,
    })
}

/// Release a row block. Writes back unless it was acquired for reading only.
///
/// For CSR tables the write-back is a no-op.
pub fn release_block_of_rows<D, T>(table: &mut T, block: &Block<D>) -> Result<()>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    block.expect_target(Target::Rows)?;
    debug!(layout = %table.layout(), first_row = block.first_row, n_rows = block.n_rows, mode = ?block.mode, "release block of rows");
    if !block.mode.writes() {
        return Ok(());
    }
    warn_dense_csr_release(table.layout());
    table.write_rows(block.first_row, block.n_rows, block.as_slice().into())
}

/// Acquire rows `[first_row, first_row + n_rows)` of one column.
pub fn get_block_of_column_values<D, T>(
    table: &T,
    column: usize,
    first_row: usize,
    n_rows: usize,
    mode: AccessMode,
) -> Result<Block<D>>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    debug!(layout = %table.layout(), dtype = %D::TAG, column, first_row, n_rows, ?mode, "get block of column values");
    check_column(column, table.n_columns())?;
    check_rows(first_row, n_rows, table.n_rows())?;
    let mut data = vec![D::default(); n_rows];
    if mode.reads() {
        table.read_column(column, first_row, n_rows, (&mut data).into())?;
    }
    Ok(Block {
        data,
        first_row,
        n_rows,
        n_columns: 1,
        target: Target::Column(column),
        mode,
    })
}

/// Release a column block acquired by [`get_block_of_column_values`].
pub fn release_block_of_column_values<D, T>(table: &mut T, block: &Block<D>) -> Result<()>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    let Target::Column(column) = block.target else {
        return block.expect_target(Target::Column(0));
    };
    debug!(layout = %table.layout(), column, first_row = block.first_row, n_rows = block.n_rows, mode = ?block.mode, "release block of column values");
    if !block.mode.writes() {
        return Ok(());
    }
    warn_dense_csr_release(table.layout());
    table.write_column(column, block.first_row, block.n_rows, block.as_slice().into())
}

fn warn_dense_csr_release(layout: StorageLayout) {
    if layout == StorageLayout::Csr {
        warn!("dense block released to a CSR table in write mode; changes are discarded");
    }
}

// =============================================================================
// Sparse blocks
// =============================================================================

/// Acquire a CSR sub-block without densifying.
///
/// The structure is always extracted; values are zeroed in
/// [`AccessMode::Write`].
///
/// # Errors
///
/// [`TableError::LayoutMismatch`] if `table` is not a CSR table.
pub fn get_sparse_block<D, T>(
    table: &T,
    first_row: usize,
    n_rows: usize,
    mode: AccessMode,
) -> Result<SparseBlock<D>>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    debug!(layout = %table.layout(), dtype = %D::TAG, first_row, n_rows, ?mode, "get sparse block");
    let csr = table.as_csr().ok_or(TableError::LayoutMismatch {
        operation: "sparse block",
        layout: table.layout(),
    })?;
    let nnz = csr.block_nnz(first_row, n_rows)?;
    let mut values = vec![D::default(); nnz];
    let mut col_indices = vec![0; nnz];
    let mut row_offsets = vec![0; n_rows + 1];
    csr.read_sparse_rows(
        first_row,
        n_rows,
        (&mut values).into(),
        &mut col_indices,
        &mut row_offsets,
    )?;
    if !mode.reads() {
        values.fill(D::default());
    }
    Ok(SparseBlock {
        values,
        col_indices,
        row_offsets,
        first_row,
        n_rows,
        mode,
    })
}

/// Release a sparse block, writing its values back in write modes.
///
/// # Errors
///
/// [`TableError::BufferCapacityMismatch`] if `values` no longer matches the
/// stored entry count of the block's rows.
pub fn release_sparse_block<D, T>(table: &mut T, block: &SparseBlock<D>) -> Result<()>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    let layout = table.layout();
    debug!(%layout, first_row = block.first_row, n_rows = block.n_rows, mode = ?block.mode, "release sparse block");
    let csr = table.as_csr_mut().ok_or(TableError::LayoutMismatch {
        operation: "sparse block",
        layout,
    })?;
    if !block.mode.writes() {
        return Ok(());
    }
    csr.write_sparse_values(block.first_row, block.n_rows, block.values.as_slice().into())
}

// =============================================================================
// Packed arrays
// =============================================================================

/// Acquire the whole packed storage of a packed table, converted to `D`.
///
/// The block has one row of `dim * (dim + 1) / 2` elements.
///
/// # Errors
///
/// [`TableError::LayoutMismatch`] if `table` is not packed.
pub fn get_packed_array<D, T>(table: &T, mode: AccessMode) -> Result<Block<D>>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    debug!(layout = %table.layout(), dtype = %D::TAG, ?mode, "get packed array");
    let packed = table.as_packed().ok_or(TableError::LayoutMismatch {
        operation: "packed array",
        layout: table.layout(),
    })?;
    let len = packed_len(packed.dim());
    let mut data = vec![D::default(); len];
    if mode.reads() {
        packed.read_packed((&mut data).into())?;
    }
    Ok(Block {
        data,
        first_row: 0,
        n_rows: 1,
        n_columns: len,
        target: Target::Packed,
        mode,
    })
}

/// Release a packed array acquired by [`get_packed_array`].
pub fn release_packed_array<D, T>(table: &mut T, block: &Block<D>) -> Result<()>
where
    D: Element,
    T: NumericTable + ?Sized,
{
    block.expect_target(Target::Packed)?;
    let layout = table.layout();
    debug!(%layout, mode = ?block.mode, "release packed array");
    let packed = table.as_packed_mut().ok_or(TableError::LayoutMismatch {
        operation: "packed array",
        layout,
    })?;
    if !block.mode.writes() {
        return Ok(());
    }
    packed.write_packed(block.as_slice().into())
}
