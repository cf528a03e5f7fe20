//! Compressed sparse row (CSR) tables.
//!
//! # Structure
//!
//! Stored one-based, as three arrays:
//!
//! - `values`: stored entries, row by row
//! - `col_indices`: column (1-based) of each entry
//! - `row_offsets`: `n_rows + 1` entries; row `i` covers
//!   `values[row_offsets[i] - 1 .. row_offsets[i + 1] - 1]`
//!
//! # Access
//!
//! - Dense row blocks zero-fill the destination, then scatter the stored
//!   entries of each row.
//! - [`CsrTable::read_sparse_rows`] extracts a sub-block without densifying:
//!   values and column indices are sliced, row offsets rebased to start at 1.
//! - Dense writes are a no-op: the sparsity structure cannot absorb edits
//!   to arbitrary cells. Only the values of a sparse sub-block can be written
//!   back, via [`CsrTable::write_sparse_values`].

use ndarray::ArrayView2;

use super::{NumericTable, StorageLayout};
use crate::buffer::{NumSlice, NumSliceMut, NumVec};
use crate::config::TableOptions;
use crate::convert::converter;
use crate::dtype::{Element, TypeTag};
use crate::error::{Result, TableError, check_capacity, check_column, check_rows};
use crate::schema::TableSchema;

/// Base of the index arrays handed to a CSR constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CsrIndexing {
    /// Column indices and row offsets start at 1.
    #[default]
    OneBased,
    /// Column indices and row offsets start at 0; rebased on construction.
    ZeroBased,
}

/// Sparse table in one-based compressed sparse row format.
///
/// # Example
///
/// ```
/// use numtable::{CsrTable, NumericTable};
///
/// // [[10, 0, 0], [0, 0, 0], [0, 30, 20]]
/// let table = CsrTable::from_vecs(3, vec![10.0f64, 20.0, 30.0], vec![1, 3, 2], vec![1, 2, 2, 4]).unwrap();
///
/// let mut block = [0.0f32; 9];
/// table.read_rows(0, 3, (&mut block[..]).into()).unwrap();
/// assert_eq!(block, [10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 30.0, 20.0]);
/// ```
#[derive(Debug, Clone)]
pub struct CsrTable {
    values: NumVec,
    col_indices: Vec<usize>,
    row_offsets: Vec<usize>,
    n_columns: usize,
    schema: TableSchema,
}

impl CsrTable {
    /// Create a table from one-based CSR arrays.
    ///
    /// The row count is `row_offsets.len() - 1`.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] unless:
    /// - `row_offsets` is non-empty, starts at 1, is non-decreasing and ends
    ///   at `nnz + 1`
    /// - `values` and `col_indices` have the same length
    /// - every column index lies in `[1, n_columns]`
    pub fn new(
        n_columns: usize,
        values: NumVec,
        col_indices: Vec<usize>,
        row_offsets: Vec<usize>,
    ) -> Result<Self> {
        Self::with_options(n_columns, values, col_indices, row_offsets, &TableOptions::default())
    }

    /// Create a table with explicit options.
    ///
    /// With [`CsrIndexing::ZeroBased`] the index arrays are rebased to one
    /// before validation.
    pub fn with_options(
        n_columns: usize,
        values: NumVec,
        mut col_indices: Vec<usize>,
        mut row_offsets: Vec<usize>,
        options: &TableOptions,
    ) -> Result<Self> {
        if options.csr_indexing == CsrIndexing::ZeroBased {
            col_indices.iter_mut().for_each(|c| *c += 1);
            row_offsets.iter_mut().for_each(|o| *o += 1);
        }
        validate(n_columns, values.len(), &col_indices, &row_offsets)?;
        let schema = TableSchema::from_types(
            std::iter::repeat_n(values.tag(), n_columns),
            options.feature_kind,
            options.features_equal,
        );
        Ok(Self {
            values,
            col_indices,
            row_offsets,
            n_columns,
            schema,
        })
    }

    /// Create a table from typed one-based CSR vectors.
    pub fn from_vecs<T: Element>(
        n_columns: usize,
        values: Vec<T>,
        col_indices: Vec<usize>,
        row_offsets: Vec<usize>,
    ) -> Result<Self> {
        Self::new(n_columns, values.into(), col_indices, row_offsets)
    }

    /// Compress a dense matrix, storing every entry not equal to zero.
    pub fn from_dense<T: Element>(matrix: ArrayView2<'_, T>) -> Self {
        let (n_rows, n_columns) = matrix.dim();
        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_offsets = Vec::with_capacity(n_rows + 1);
        row_offsets.push(1);
        for row in matrix.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != T::default() {
                    values.push(v);
                    col_indices.push(c + 1);
                }
            }
            row_offsets.push(values.len() + 1);
        }
        Self {
            schema: TableSchema::from_types(
                std::iter::repeat_n(T::TAG, n_columns),
                Default::default(),
                true,
            ),
            values: values.into(),
            col_indices,
            row_offsets,
            n_columns,
        }
    }

    /// Native element type of the values.
    #[inline]
    pub fn dtype(&self) -> TypeTag {
        self.values.tag()
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored values.
    #[inline]
    pub fn values(&self) -> NumSlice<'_> {
        self.values.as_slice()
    }

    /// One-based column index of each stored value.
    #[inline]
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// One-based row offsets, `n_rows + 1` entries.
    #[inline]
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Zero-based entry range `[start, end)` covering rows
    /// `[first_row, first_row + n_rows)`.
    #[inline]
    fn entry_range(&self, first_row: usize, n_rows: usize) -> std::ops::Range<usize> {
        self.row_offsets[first_row] - 1..self.row_offsets[first_row + n_rows] - 1
    }

    /// Number of stored entries in rows `[first_row, first_row + n_rows)`.
    pub fn block_nnz(&self, first_row: usize, n_rows: usize) -> Result<usize> {
        check_rows(first_row, n_rows, self.n_rows())?;
        Ok(self.entry_range(first_row, n_rows).len())
    }

    /// Extract rows `[first_row, first_row + n_rows)` without densifying.
    ///
    /// Writes [`block_nnz`](Self::block_nnz) converted values and one-based
    /// column indices, and `n_rows + 1` row offsets rebased so the first is
    /// 1. Returns the number of entries written.
    pub fn read_sparse_rows(
        &self,
        first_row: usize,
        n_rows: usize,
        values: NumSliceMut<'_>,
        col_indices: &mut [usize],
        row_offsets: &mut [usize],
    ) -> Result<usize> {
        check_rows(first_row, n_rows, self.n_rows())?;
        let range = self.entry_range(first_row, n_rows);
        let nnz = range.len();
        check_capacity(nnz, values.len())?;
        check_capacity(nnz, col_indices.len())?;
        check_capacity(n_rows + 1, row_offsets.len())?;

        converter(self.dtype(), values.tag()).upcast(nnz, range.start, self.values.as_slice(), values)?;
        col_indices[..nnz].copy_from_slice(&self.col_indices[range.clone()]);
        for (dst, &offset) in row_offsets
            .iter_mut()
            .zip(&self.row_offsets[first_row..=first_row + n_rows])
        {
            *dst = offset - range.start;
        }
        Ok(nnz)
    }

    /// Write the values of a sparse sub-block back into storage.
    ///
    /// The sparsity structure is immutable; `values` must hold exactly the
    /// entries of rows `[first_row, first_row + n_rows)`.
    pub fn write_sparse_values(
        &mut self,
        first_row: usize,
        n_rows: usize,
        values: NumSlice<'_>,
    ) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows())?;
        let range = self.entry_range(first_row, n_rows);
        if values.len() != range.len() {
            return Err(TableError::BufferCapacityMismatch {
                required: range.len(),
                actual: values.len(),
            });
        }
        converter(self.dtype(), values.tag()).downcast(
            range.len(),
            range.start,
            values,
            self.values.as_mut_slice(),
        )
    }
}

fn validate(
    n_columns: usize,
    nnz: usize,
    col_indices: &[usize],
    row_offsets: &[usize],
) -> Result<()> {
    let invalid = |msg: String| Err(TableError::InvalidStructure(msg));
    if col_indices.len() != nnz {
        return invalid(format!(
            "{} column indices for {} values",
            col_indices.len(),
            nnz
        ));
    }
    match (row_offsets.first().copied(), row_offsets.last().copied()) {
        (Some(1), Some(last)) if last == nnz + 1 => {}
        (Some(first), Some(last)) => {
            return invalid(format!(
                "row offsets must run from 1 to {}, got {}..{}",
                nnz + 1,
                first,
                last
            ));
        }
        _ => return invalid("row offsets must have n_rows + 1 entries".into()),
    }
    if let Some(i) = row_offsets.windows(2).position(|w| w[0] > w[1]) {
        return invalid(format!("row offsets decrease at row {i}"));
    }
    if let Some(k) = col_indices.iter().position(|&c| c == 0 || c > n_columns) {
        return invalid(format!(
            "column index {} of entry {} outside [1, {}]",
            col_indices[k], k, n_columns
        ));
    }
    // Row index that last used each column.
    let mut last_row = vec![usize::MAX; n_columns + 1];
    for (row, w) in row_offsets.windows(2).enumerate() {
        for &c in &col_indices[w[0] - 1..w[1] - 1] {
            if last_row[c] == row {
                return invalid(format!("column index {c} repeated in row {row}"));
            }
            last_row[c] = row;
        }
    }
    Ok(())
}

impl NumericTable for CsrTable {
    #[inline]
    fn n_rows(&self) -> usize {
        self.row_offsets.len() - 1
    }

    #[inline]
    fn n_columns(&self) -> usize {
        self.n_columns
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::Csr
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn read_rows(&self, first_row: usize, n_rows: usize, mut dst: NumSliceMut<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows())?;
        let len = n_rows * self.n_columns;
        check_capacity(len, dst.len())?;
        dst.fill_zero(0..len);

        let conv = converter(self.dtype(), dst.tag());
        let values = self.values.as_slice();
        for i in 0..n_rows {
            for k in self.entry_range(first_row + i, 1) {
                let column = self.col_indices[k] - 1;
                conv.upcast_buffer_strided(1, k, i * self.n_columns + column, 1, values, dst.reborrow())?;
            }
        }
        Ok(())
    }

    /// No-op: dense edits cannot be folded back into the sparsity structure.
    ///
    /// Bounds and capacity are still checked. Use
    /// [`CsrTable::write_sparse_values`] to update stored values.
    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows())?;
        check_capacity(n_rows * self.n_columns, src.len())
    }

    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        mut dst: NumSliceMut<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns)?;
        check_rows(first_row, n_rows, self.n_rows())?;
        check_capacity(n_rows, dst.len())?;
        dst.fill_zero(0..n_rows);

        let conv = converter(self.dtype(), dst.tag());
        let values = self.values.as_slice();
        for i in 0..n_rows {
            let range = self.entry_range(first_row + i, 1);
            if let Some(k) = range.into_iter().find(|&k| self.col_indices[k] == column + 1) {
                conv.upcast_buffer_strided(1, k, i, 1, values, dst.reborrow())?;
            }
        }
        Ok(())
    }

    /// No-op, like [`write_rows`](NumericTable::write_rows).
    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns)?;
        check_rows(first_row, n_rows, self.n_rows())?;
        check_capacity(n_rows, src.len())
    }

    fn as_csr(&self) -> Option<&CsrTable> {
        Some(self)
    }

    fn as_csr_mut(&mut self) -> Option<&mut CsrTable> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn example() -> CsrTable {
        CsrTable::from_vecs(3, vec![10i32, 20, 30], vec![1, 3, 2], vec![1, 2, 2, 4]).unwrap()
    }

    #[test]
    fn densifies_rows() {
        let table = example();
        let mut block = vec![-1.0f64; 9];
        table.read_rows(0, 3, (&mut block).into()).unwrap();
        assert_eq!(block, vec![10.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 30.0, 20.0]);
    }

    #[test]
    fn densifies_partial_range() {
        let table = example();
        let mut block = vec![0u64; 6];
        table.read_rows(1, 2, (&mut block).into()).unwrap();
        assert_eq!(block, vec![0, 0, 0, 0, 30, 20]);
    }

    #[test]
    fn reads_column() {
        let table = example();
        let mut col = vec![5.0f32; 3];
        table.read_column(1, 0, 3, (&mut col).into()).unwrap();
        assert_eq!(col, vec![0.0, 0.0, 30.0]);
    }

    #[test]
    fn sparse_sub_block_is_rebased() {
        let table = example();
        assert_eq!(table.block_nnz(1, 2).unwrap(), 2);

        let mut values = vec![0.0f64; 2];
        let mut cols = vec![0usize; 2];
        let mut offsets = vec![0usize; 3];
        let nnz = table
            .read_sparse_rows(1, 2, (&mut values).into(), &mut cols, &mut offsets)
            .unwrap();
        assert_eq!(nnz, 2);
        assert_eq!(values, vec![20.0, 30.0]);
        assert_eq!(cols, vec![3, 2]);
        assert_eq!(offsets, vec![1, 1, 3]);
    }

    #[test]
    fn sparse_values_write_back() {
        let mut table = example();
        table.write_sparse_values(2, 1, (&vec![2.5f64, 3.5]).into()).unwrap();
        assert_eq!(table.values().to_vec::<i32>().unwrap(), vec![10, 2, 3]);

        let err = table.write_sparse_values(2, 1, (&vec![1.0f64]).into()).unwrap_err();
        assert_eq!(
            err,
            TableError::BufferCapacityMismatch {
                required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn dense_writes_are_no_ops() {
        let mut table = example();
        table.write_rows(0, 1, (&vec![1i32, 2, 3]).into()).unwrap();
        table.write_column(0, 0, 3, (&vec![7i32, 7, 7]).into()).unwrap();
        assert_eq!(table.values().to_vec::<i32>().unwrap(), vec![10, 20, 30]);
        assert!(table.write_rows(2, 2, (&vec![0i32; 6]).into()).is_err());
    }

    #[test]
    fn zero_based_input_is_rebased() {
        let options = TableOptions::builder()
            .csr_indexing(CsrIndexing::ZeroBased)
            .build();
        let table = CsrTable::with_options(
            3,
            NumVec::from(vec![10i32, 20, 30]),
            vec![0, 2, 1],
            vec![0, 1, 1, 3],
            &options,
        )
        .unwrap();
        assert_eq!(table.col_indices(), &[1, 3, 2]);
        assert_eq!(table.row_offsets(), &[1, 2, 2, 4]);
    }

    #[test]
    fn invalid_structures_are_rejected() {
        let bad = [
            (vec![1, 3, 2], vec![0, 2, 2, 4]),  // does not start at 1
            (vec![1, 3, 2], vec![1, 3, 2, 4]),  // decreasing
            (vec![1, 4, 2], vec![1, 2, 2, 4]),  // column out of range
            (vec![0, 3, 2], vec![1, 2, 2, 4]),  // zero column
            (vec![1, 3, 2], vec![1, 2, 2, 5]),  // last offset != nnz + 1
            (vec![1, 3], vec![1, 2, 2, 4]),     // index count mismatch
            (vec![1, 3, 2], vec![]),            // no offsets
            (vec![1, 2, 2], vec![1, 2, 2, 4]),  // column repeated within a row
        ];
        for (cols, offsets) in bad {
            let result = CsrTable::from_vecs(3, vec![10i32, 20, 30], cols.clone(), offsets.clone());
            assert!(
                matches!(result, Err(TableError::InvalidStructure(_))),
                "cols {cols:?} offsets {offsets:?}"
            );
        }
    }

    #[test]
    fn repeated_column_across_rows_is_allowed() {
        let table = CsrTable::from_vecs(2, vec![1i32, 2, 3], vec![2, 2, 2], vec![1, 2, 3, 4]).unwrap();
        let mut col = vec![0i32; 3];
        table.read_column(1, 0, 3, (&mut col).into()).unwrap();
        assert_eq!(col, vec![1, 2, 3]);

        let err = CsrTable::from_vecs(2, vec![1i32, 2], vec![2, 2], vec![1, 3]).unwrap_err();
        assert_eq!(
            err,
            TableError::InvalidStructure("column index 2 repeated in row 0".into())
        );
    }

    #[test]
    fn from_dense_round_trip() {
        let m = array![[0.0f32, 1.5, 0.0], [0.0, 0.0, 0.0], [2.0, 0.0, -3.0]];
        let table = CsrTable::from_dense(m.view());
        assert_eq!(table.nnz(), 3);
        assert_eq!(table.row_offsets(), &[1, 2, 2, 4]);

        let mut block = vec![0.0f32; 9];
        table.read_rows(0, 3, (&mut block).into()).unwrap();
        assert_eq!(block, m.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn empty_table() {
        let table = CsrTable::from_vecs::<f64>(4, vec![], vec![], vec![1]).unwrap();
        assert_eq!(table.n_rows(), 0);
        let mut block: Vec<f64> = vec![];
        table.read_rows(0, 0, (&mut block).into()).unwrap();
        assert!(table.read_rows(0, 1, (&mut block).into()).is_err());
    }
}
