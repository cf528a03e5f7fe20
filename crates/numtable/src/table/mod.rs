//! Numeric tables and their block materializers.
//!
//! Every storage layout implements [`NumericTable`], which reads and writes
//! rectangular row blocks and single-column row ranges through type-erased
//! caller buffers:
//!
//! - [`RowMajorTable`]: dense, rows contiguous (array of structures)
//! - [`ColumnMajorTable`]: dense, one array per feature (structure of arrays)
//! - [`CsrTable`]: compressed sparse rows, one-based
//! - [`PackedTable`]: packed symmetric or triangular square matrix
//! - [`ExternalTable`]: row-major over an opaque [`ByteStore`](crate::store::ByteStore)
//! - [`RowMergedTable`] / [`ColumnMergedTable`]: concatenations forwarding to
//!   constituent tables
//!
//! # Buffers
//!
//! Row blocks are written row-major: element `(i, c)` of a block starting at
//! `first_row` lands at `dst[i * n_columns + c]`. Column blocks are written
//! contiguously. Buffers may be longer than the block; the tail is left
//! untouched.
//!
//! # Concurrency
//!
//! Reads take `&self` and tables are `Sync`, so disjoint (or overlapping)
//! reads may run in parallel. Writes take `&mut self`; callers serialize them.

pub mod csr;
pub mod dense;
pub mod external;
pub mod merge;
pub mod packed;

use std::fmt;

use crate::buffer::{NumSlice, NumSliceMut};
use crate::dtype::TypeTag;
use crate::error::{Result, TableError, check_column};
use crate::packed::PackedLayout;
use crate::schema::TableSchema;

pub use csr::{CsrIndexing, CsrTable};
pub use dense::{ColumnMajorTable, RowMajorTable};
pub use external::ExternalTable;
pub use merge::{ColumnMergedTable, RowMergedTable};
pub use packed::PackedTable;

/// Physical storage layout of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StorageLayout {
    /// Dense, rows contiguous.
    RowMajor,
    /// Dense, one contiguous array per feature.
    ColumnMajor,
    /// Compressed sparse rows.
    Csr,
    /// Packed square matrix.
    Packed(PackedLayout),
    /// Rows of several tables stacked.
    RowMerged,
    /// Columns of several tables side by side.
    ColumnMerged,
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLayout::RowMajor => f.write_str("row-major"),
            StorageLayout::ColumnMajor => f.write_str("column-major"),
            StorageLayout::Csr => f.write_str("CSR"),
            StorageLayout::Packed(p) => p.fmt(f),
            StorageLayout::RowMerged => f.write_str("row-merged"),
            StorageLayout::ColumnMerged => f.write_str("column-merged"),
        }
    }
}

/// Uniform block access over a table of any layout and element type.
///
/// Implementations validate indices and buffer capacity before touching any
/// element, so an `Err` leaves both table and buffer unchanged.
pub trait NumericTable: Send + Sync {
    /// Number of rows.
    fn n_rows(&self) -> usize;

    /// Number of columns (features).
    fn n_columns(&self) -> usize;

    /// Physical layout.
    fn layout(&self) -> StorageLayout;

    /// Column metadata.
    fn schema(&self) -> &TableSchema;

    /// Native element type of `column`.
    fn element_type(&self, column: usize) -> Result<TypeTag> {
        check_column(column, self.n_columns())?;
        self.schema()
            .element_type(column)
            .ok_or(TableError::IndexOutOfRange {
                what: "column",
                index: column,
                bound: self.schema().n_features(),
            })
    }

    /// Materialize rows `[first_row, first_row + n_rows)`, all columns, into
    /// `dst` converted to `dst`'s element type.
    fn read_rows(&self, first_row: usize, n_rows: usize, dst: NumSliceMut<'_>) -> Result<()>;

    /// Write a row block from `src` back into the table's native type and
    /// layout.
    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()>;

    /// Materialize rows `[first_row, first_row + n_rows)` of one column.
    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        dst: NumSliceMut<'_>,
    ) -> Result<()>;

    /// Write a column block from `src` back into the table.
    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()>;

    /// This table as a CSR table, if it is one.
    fn as_csr(&self) -> Option<&CsrTable> {
        None
    }

    /// This table as a packed table, if it is one.
    fn as_packed(&self) -> Option<&PackedTable> {
        None
    }

    /// Mutable counterpart of [`as_csr`](Self::as_csr).
    fn as_csr_mut(&mut self) -> Option<&mut CsrTable> {
        None
    }

    /// Mutable counterpart of [`as_packed`](Self::as_packed).
    fn as_packed_mut(&mut self) -> Option<&mut PackedTable> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_display() {
        assert_eq!(StorageLayout::Csr.to_string(), "CSR");
        assert_eq!(
            StorageLayout::Packed(PackedLayout::LowerTriangular).to_string(),
            "packed lower-triangular"
        );
    }

    fn assert_send_sync<T: Send + Sync + ?Sized>() {}

    #[test]
    fn tables_are_send_sync() {
        assert_send_sync::<dyn NumericTable>();
        assert_send_sync::<RowMajorTable>();
        assert_send_sync::<CsrTable>();
        assert_send_sync::<PackedTable>();
    }
}
