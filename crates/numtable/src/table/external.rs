//! Row-major tables over an external [`ByteStore`].
//!
//! Elements are stored as native-endian bytes. Every request reads only the
//! byte span it touches, decodes it with `bytemuck` and converts through the
//! dispatch matrix. Column writes are read-modify-write over the span
//! between the first and last touched element.

use super::{NumericTable, StorageLayout};
use crate::buffer::{NumSlice, NumSliceMut, NumVec};
use crate::config::TableOptions;
use crate::convert::converter;
use crate::dtype::TypeTag;
use crate::error::{Result, TableError, check_capacity, check_column, check_rows};
use crate::schema::TableSchema;
use crate::store::ByteStore;

/// Homogeneous row-major table whose elements live in a [`ByteStore`].
///
/// # Example
///
/// ```
/// use numtable::{ExternalTable, MemoryByteStore, NumericTable, TypeTag};
///
/// let store = MemoryByteStore::from_elements(&[1.5f64, 2.5, 3.5, 4.5]);
/// let table = ExternalTable::new(store, TypeTag::F64, 2, 2).unwrap();
///
/// let mut col = [0i32; 2];
/// table.read_column(1, 0, 2, (&mut col[..]).into()).unwrap();
/// assert_eq!(col, [2, 4]);
/// ```
#[derive(Debug)]
pub struct ExternalTable<S> {
    store: S,
    dtype: TypeTag,
    n_rows: usize,
    n_columns: usize,
    schema: TableSchema,
}

impl<S: ByteStore> ExternalTable<S> {
    /// Wrap `store` as an `n_rows` x `n_columns` table of `dtype`.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if the store length is not exactly
    /// `n_rows * n_columns * dtype.size_of()` bytes.
    pub fn new(store: S, dtype: TypeTag, n_rows: usize, n_columns: usize) -> Result<Self> {
        Self::with_options(store, dtype, n_rows, n_columns, &TableOptions::default())
    }

    pub fn with_options(
        store: S,
        dtype: TypeTag,
        n_rows: usize,
        n_columns: usize,
        options: &TableOptions,
    ) -> Result<Self> {
        let expected = n_rows
            .checked_mul(n_columns)
            .and_then(|n| n.checked_mul(dtype.size_of()));
        if expected != Some(store.len()) {
            return Err(TableError::InvalidStructure(format!(
                "store of {} bytes cannot hold {}x{} {} elements",
                store.len(),
                n_rows,
                n_columns,
                dtype
            )));
        }
        let schema = TableSchema::from_types(
            std::iter::repeat_n(dtype, n_columns),
            options.feature_kind,
            options.features_equal,
        );
        Ok(Self {
            store,
            dtype,
            n_rows,
            n_columns,
            schema,
        })
    }

    #[inline]
    pub fn dtype(&self) -> TypeTag {
        self.dtype
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Decode `len` elements starting at element `offset`.
    fn load(&self, offset: usize, len: usize) -> Result<NumVec> {
        let size = self.dtype.size_of();
        let bytes = self.store.read_range(offset * size, len * size)?;
        Ok(NumVec::from_bytes(self.dtype, &bytes))
    }

    /// `(offset, len)` of the element span covering `n_rows` cells of
    /// `column` from `first_row`.
    #[inline]
    fn column_span(&self, column: usize, first_row: usize, n_rows: usize) -> (usize, usize) {
        let len = match n_rows {
            0 => 0,
            n => (n - 1) * self.n_columns + 1,
        };
        (first_row * self.n_columns + column, len)
    }
}

impl<S: ByteStore> NumericTable for ExternalTable<S> {
    #[inline]
    fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    fn n_columns(&self) -> usize {
        self.n_columns
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::RowMajor
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn read_rows(&self, first_row: usize, n_rows: usize, dst: NumSliceMut<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let len = n_rows * self.n_columns;
        check_capacity(len, dst.len())?;
        let native = self.load(first_row * self.n_columns, len)?;
        converter(self.dtype, dst.tag()).upcast(len, 0, native.as_slice(), dst)
    }

    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let len = n_rows * self.n_columns;
        check_capacity(len, src.len())?;
        let mut native = NumVec::zeros(self.dtype, len);
        converter(self.dtype, src.tag()).downcast(len, 0, src, native.as_mut_slice())?;
        let offset = first_row * self.n_columns * self.dtype.size_of();
        self.store.write_range(offset, native.as_bytes())
    }

    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns)?;
        check_rows(first_row, n_rows, self.n_rows)?;
        check_capacity(n_rows, dst.len())?;
        let (offset, len) = self.column_span(column, first_row, n_rows);
        let native = self.load(offset, len)?;
        converter(self.dtype, dst.tag()).upcast_strided(
            n_rows,
            0,
            self.n_columns,
            native.as_slice(),
            dst,
        )
    }

    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()> {
        check_column(column, self.n_columns)?;
        check_rows(first_row, n_rows, self.n_rows)?;
        check_capacity(n_rows, src.len())?;
        let (offset, len) = self.column_span(column, first_row, n_rows);
        let mut native = self.load(offset, len)?;
        converter(self.dtype, src.tag()).downcast_strided(
            n_rows,
            0,
            self.n_columns,
            src,
            native.as_mut_slice(),
        )?;
        self.store
            .write_range(offset * self.dtype.size_of(), native.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryByteStore;

    fn table() -> ExternalTable<MemoryByteStore> {
        let store = MemoryByteStore::from_elements(&[1i32, 2, 3, 4, 5, 6]);
        ExternalTable::new(store, TypeTag::I32, 3, 2).unwrap()
    }

    #[test]
    fn store_length_is_checked() {
        let store = MemoryByteStore::new(vec![0; 10]);
        assert!(matches!(
            ExternalTable::new(store, TypeTag::F32, 1, 3),
            Err(TableError::InvalidStructure(_))
        ));
    }

    #[test]
    fn reads_rows_and_columns() {
        let table = table();
        let mut block = vec![0.0f32; 4];
        table.read_rows(1, 2, (&mut block).into()).unwrap();
        assert_eq!(block, vec![3.0, 4.0, 5.0, 6.0]);

        let mut col = vec![0u64; 3];
        table.read_column(1, 0, 3, (&mut col).into()).unwrap();
        assert_eq!(col, vec![2, 4, 6]);
    }

    #[test]
    fn writes_reach_the_store() {
        let mut table = table();
        table.write_rows(0, 1, (&vec![-1.9f64, 7.2]).into()).unwrap();
        table.write_column(0, 1, 2, (&vec![30.0f32, 50.0]).into()).unwrap();

        let bytes = table.into_store().into_inner();
        let values: Vec<i32> = bytemuck::pod_collect_to_vec(&bytes);
        assert_eq!(values, vec![-1, 7, 30, 4, 50, 6]);
    }
}
