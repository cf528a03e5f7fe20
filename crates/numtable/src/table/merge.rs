//! Composite tables over borrowed constituents.
//!
//! [`RowMergedTable`] stacks tables vertically, [`ColumnMergedTable`] places
//! them side by side. Both hold `&mut` borrows and forward every request to
//! the constituents owning the affected rows or columns, translating offsets.
//! Constituents keep their own layout and element types.
//!
//! # Failure
//!
//! A request spanning several constituents either completes or leaves the
//! composite as it was. Reads fill scratch buffers and copy into the caller's
//! buffer only once every constituent has answered. Writes first save the
//! affected cells of every constituent in its native element type; when a
//! later constituent fails, the ones already written are restored from the
//! saved cells before the error is returned.

use tracing::warn;

use super::{NumericTable, StorageLayout};
use crate::buffer::{NumSlice, NumSliceMut, NumVec};
use crate::convert::converter;
use crate::error::{Result, TableError, check_capacity, check_column, check_rows};
use crate::schema::TableSchema;

/// Index of the part containing `index`, given ascending part starts.
#[inline]
fn owner(starts: &[usize], index: usize) -> usize {
    starts.partition_point(|&s| s <= index) - 1
}

/// The share of a composite request served by one constituent.
#[derive(Clone, Copy, Debug)]
struct Piece {
    table: usize,
    /// First row, local to the constituent.
    first_row: usize,
    n_rows: usize,
    /// Rows of the request that precede this piece.
    before: usize,
}

/// Run `fill` on a scratch buffer of `dst`'s type, then copy the first `len`
/// elements into `dst`.
fn staged_read(
    len: usize,
    dst: NumSliceMut<'_>,
    fill: impl FnOnce(NumSliceMut<'_>) -> Result<()>,
) -> Result<()> {
    let mut scratch = NumVec::zeros(dst.tag(), len);
    fill(scratch.as_mut_slice())?;
    converter(dst.tag(), dst.tag()).upcast(len, 0, scratch.as_slice(), dst)
}

/// Native copies of the cells `piece` covers, for one column or all.
fn save(
    table: &dyn NumericTable,
    piece: &Piece,
    column: Option<usize>,
) -> Result<Vec<(usize, NumVec)>> {
    let columns = match column {
        Some(c) => c..c + 1,
        None => 0..table.n_columns(),
    };
    columns
        .map(|c| -> Result<(usize, NumVec)> {
            let mut cells = NumVec::zeros(table.element_type(c)?, piece.n_rows);
            table.read_column(c, piece.first_row, piece.n_rows, cells.as_mut_slice())?;
            Ok((c, cells))
        })
        .collect()
}

/// Apply `write` to every piece in order. If one fails, pieces already
/// written are restored and its error returned.
fn write_pieces<'a>(
    tables: &mut [&'a mut dyn NumericTable],
    pieces: &[Piece],
    column: Option<usize>,
    mut write: impl FnMut(&mut dyn NumericTable, &Piece) -> Result<()>,
) -> Result<()> {
    if let [piece] = pieces {
        return write(&mut *tables[piece.table], piece);
    }
    let saved = pieces
        .iter()
        .map(|p| save(&*tables[p.table], p, column))
        .collect::<Result<Vec<_>>>()?;

    for (done, piece) in pieces.iter().enumerate() {
        let Err(err) = write(&mut *tables[piece.table], piece) else {
            continue;
        };
        for (piece, cells) in pieces[..done].iter().zip(&saved).rev() {
            for (c, col) in cells {
                let table = &mut *tables[piece.table];
                let restored = table.write_column(*c, piece.first_row, piece.n_rows, col.as_slice());
                if let Err(e) = restored {
                    warn!(table = piece.table, column = *c, error = %e, "constituent not restored after a failed write");
                }
            }
        }
        return Err(err);
    }
    Ok(())
}

// =============================================================================
// RowMergedTable
// =============================================================================

/// Tables with equal column counts, stacked row-wise.
///
/// A column's element type is the promotion ([`TypeTag::promote`]) of that
/// column's type across all constituents.
///
/// [`TypeTag::promote`]: crate::TypeTag::promote
///
/// # Example
///
/// ```
/// use numtable::{NumericTable, RowMajorTable, RowMergedTable, TypeTag};
///
/// let mut top = RowMajorTable::from_vec(vec![1.0f32, 2.0], 1, 2).unwrap();
/// let mut bottom = RowMajorTable::from_vec(vec![3i32, 4, 5, 6], 2, 2).unwrap();
///
/// let parts = vec![&mut top as &mut dyn NumericTable, &mut bottom];
/// let merged = RowMergedTable::from_tables(parts).unwrap();
/// assert_eq!(merged.element_type(0).unwrap(), TypeTag::F64);
///
/// let mut block = [0.0f64; 4];
/// merged.read_rows(0, 2, (&mut block[..]).into()).unwrap();
/// assert_eq!(block, [1.0, 2.0, 3.0, 4.0]);
/// ```
pub struct RowMergedTable<'a> {
    tables: Vec<&'a mut dyn NumericTable>,
    /// First global row of each constituent, plus the total row count.
    row_starts: Vec<usize>,
    n_columns: usize,
    schema: TableSchema,
}

impl<'a> RowMergedTable<'a> {
    /// Empty composite; the first added table fixes the column count.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            row_starts: vec![0],
            n_columns: 0,
            schema: TableSchema::from_descriptors(Vec::new()),
        }
    }

    /// Composite over `tables`, in order.
    pub fn from_tables(tables: Vec<&'a mut dyn NumericTable>) -> Result<Self> {
        let mut merged = Self::new();
        for table in tables {
            merged.add(table)?;
        }
        Ok(merged)
    }

    /// Append a table below the current rows.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if its column count differs.
    pub fn add(&mut self, table: &'a mut dyn NumericTable) -> Result<()> {
        if self.tables.is_empty() {
            self.n_columns = table.n_columns();
            self.schema = table.schema().clone();
        } else if table.n_columns() != self.n_columns {
            return Err(TableError::InvalidStructure(format!(
                "cannot stack a table of {} columns under {} columns",
                table.n_columns(),
                self.n_columns
            )));
        } else {
            self.schema = TableSchema::stack(&self.schema, table.schema());
        }
        let end = self.n_rows() + table.n_rows();
        self.row_starts.push(end);
        self.tables.push(table);
        Ok(())
    }

    /// Number of constituents.
    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    /// Split `[first_row, first_row + n_rows)` into per-constituent pieces.
    fn pieces(&self, first_row: usize, n_rows: usize) -> Vec<Piece> {
        let end = first_row + n_rows;
        (0..self.tables.len())
            .filter_map(|t| {
                let (start, stop) = (self.row_starts[t], self.row_starts[t + 1]);
                let lo = first_row.max(start);
                let hi = end.min(stop);
                (lo < hi).then(|| Piece {
                    table: t,
                    first_row: lo - start,
                    n_rows: hi - lo,
                    before: lo - first_row,
                })
            })
            .collect()
    }
}

impl Default for RowMergedTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RowMergedTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowMergedTable")
            .field("n_tables", &self.tables.len())
            .field("row_starts", &self.row_starts)
            .field("n_columns", &self.n_columns)
            .finish()
    }
}

impl NumericTable for RowMergedTable<'_> {
    fn n_rows(&self) -> usize {
        self.row_starts.last().copied().unwrap_or(0)
    }

    fn n_columns(&self) -> usize {
        self.n_columns
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::RowMerged
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn read_rows(&self, first_row: usize, n_rows: usize, dst: NumSliceMut<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows())?;
        let len = n_rows * self.n_columns;
        check_capacity(len, dst.len())?;
        staged_read(len, dst, |mut scratch| {
            for p in self.pieces(first_row, n_rows) {
                let part = scratch.tail(p.before * self.n_columns);
                self.tables[p.table].read_rows(p.first_row, p.n_rows, part)?;
            }
            Ok(())
        })
    }

    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows())?;
        let n_columns = self.n_columns;
        check_capacity(n_rows * n_columns, src.len())?;
        let pieces = self.pieces(first_row, n_rows);
        write_pieces(&mut self.tables, &pieces, None, |table, p| {
            table.write_rows(p.first_row, p.n_rows, src.tail(p.before * n_columns))
        })
    }

    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns)?;
        check_rows(first_row, n_rows, self.n_rows())?;
        check_capacity(n_rows, dst.len())?;
        staged_read(n_rows, dst, |mut scratch| {
            for p in self.pieces(first_row, n_rows) {
                let part = scratch.tail(p.before);
                self.tables[p.table].read_column(column, p.first_row, p.n_rows, part)?;
            }
            Ok(())
        })
    }

    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns)?;
        check_rows(first_row, n_rows, self.n_rows())?;
        check_capacity(n_rows, src.len())?;
        let pieces = self.pieces(first_row, n_rows);
        write_pieces(&mut self.tables, &pieces, Some(column), |table, p| {
            table.write_column(column, p.first_row, p.n_rows, src.tail(p.before))
        })
    }
}

// =============================================================================
// ColumnMergedTable
// =============================================================================

/// Tables with equal row counts, placed side by side.
///
/// Row blocks are gathered from each constituent into a scratch buffer of
/// the destination type, then interleaved into place.
pub struct ColumnMergedTable<'a> {
    tables: Vec<&'a mut dyn NumericTable>,
    /// First global column of each constituent, plus the total column count.
    col_starts: Vec<usize>,
    n_rows: usize,
    schema: TableSchema,
}

impl<'a> ColumnMergedTable<'a> {
    /// Empty composite; the first added table fixes the row count.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            col_starts: vec![0],
            n_rows: 0,
            schema: TableSchema::from_descriptors(Vec::new()),
        }
    }

    /// Composite over `tables`, left to right.
    pub fn from_tables(tables: Vec<&'a mut dyn NumericTable>) -> Result<Self> {
        let mut merged = Self::new();
        for table in tables {
            merged.add(table)?;
        }
        Ok(merged)
    }

    /// Append a table to the right of the current columns.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if its row count differs.
    pub fn add(&mut self, table: &'a mut dyn NumericTable) -> Result<()> {
        if self.tables.is_empty() {
            self.n_rows = table.n_rows();
        } else if table.n_rows() != self.n_rows {
            return Err(TableError::InvalidStructure(format!(
                "cannot place a table of {} rows beside {} rows",
                table.n_rows(),
                self.n_rows
            )));
        }
        self.schema = TableSchema::concat([&self.schema, table.schema()]);
        let end = self.n_columns() + table.n_columns();
        self.col_starts.push(end);
        self.tables.push(table);
        Ok(())
    }

    /// Number of constituents.
    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }
}

impl Default for ColumnMergedTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ColumnMergedTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnMergedTable")
            .field("n_tables", &self.tables.len())
            .field("col_starts", &self.col_starts)
            .field("n_rows", &self.n_rows)
            .finish()
    }
}

impl NumericTable for ColumnMergedTable<'_> {
    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_columns(&self) -> usize {
        self.col_starts.last().copied().unwrap_or(0)
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::ColumnMerged
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn read_rows(&self, first_row: usize, n_rows: usize, mut dst: NumSliceMut<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let n_columns = self.n_columns();
        check_capacity(n_rows * n_columns, dst.len())?;

        let parts = self
            .tables
            .iter()
            .map(|table| -> Result<NumVec> {
                let mut part = NumVec::zeros(dst.tag(), n_rows * table.n_columns());
                table.read_rows(first_row, n_rows, part.as_mut_slice())?;
                Ok(part)
            })
            .collect::<Result<Vec<_>>>()?;

        let copy = converter(dst.tag(), dst.tag());
        for (t, part) in parts.iter().enumerate() {
            let (start, width) = (self.col_starts[t], self.tables[t].n_columns());
            for c in 0..width {
                copy.upcast_both_strided(
                    n_rows,
                    c,
                    start + c,
                    width,
                    n_columns,
                    part.as_slice(),
                    dst.reborrow(),
                )?;
            }
        }
        Ok(())
    }

    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let n_columns = self.n_columns();
        check_capacity(n_rows * n_columns, src.len())?;

        let copy = converter(src.tag(), src.tag());
        let mut parts = Vec::with_capacity(self.tables.len());
        for (t, table) in self.tables.iter().enumerate() {
            let (start, width) = (self.col_starts[t], table.n_columns());
            let mut part = NumVec::zeros(src.tag(), n_rows * width);
            for c in 0..width {
                copy.upcast_both_strided(
                    n_rows,
                    start + c,
                    c,
                    n_columns,
                    width,
                    src,
                    part.as_mut_slice(),
                )?;
            }
            parts.push(part);
        }

        let pieces: Vec<_> = (0..self.tables.len())
            .map(|table| Piece {
                table,
                first_row,
                n_rows,
                before: 0,
            })
            .collect();
        write_pieces(&mut self.tables, &pieces, None, |table, p| {
            table.write_rows(p.first_row, p.n_rows, parts[p.table].as_slice())
        })
    }

    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns())?;
        let t = owner(&self.col_starts, column);
        self.tables[t].read_column(column - self.col_starts[t], first_row, n_rows, dst)
    }

    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns())?;
        let t = owner(&self.col_starts, column);
        let local = column - self.col_starts[t];
        self.tables[t].write_column(local, first_row, n_rows, src)
    }
}
