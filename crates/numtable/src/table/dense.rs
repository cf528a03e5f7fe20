//! Dense tables in row-major and column-major (structure of arrays) layout.
//!
//! - [`RowMajorTable`]: one array, rows contiguous. A row block is a single
//!   contiguous run; a column is a strided walk with step `n_columns`.
//! - [`ColumnMajorTable`]: one array per feature, each with its own element
//!   type. A column is a contiguous run; a row block interleaves every
//!   feature into the destination with step `n_columns`, looping features
//!   so each source read stays contiguous.

use ndarray::ArrayView2;

use super::{NumericTable, StorageLayout};
use crate::buffer::{NumSlice, NumSliceMut, NumVec};
use crate::config::TableOptions;
use crate::convert::converter;
use crate::dtype::{Element, TypeTag};
use crate::error::{Result, TableError, check_capacity, check_column, check_rows};
use crate::schema::TableSchema;

// =============================================================================
// RowMajorTable
// =============================================================================

/// Dense table with rows stored contiguously.
///
/// # Example
///
/// ```
/// use numtable::{NumericTable, RowMajorTable};
///
/// let table = RowMajorTable::from_vec(vec![1i32, 2, 3, 4, 5, 6], 3, 2).unwrap();
/// let mut col = [0.0f64; 3];
/// table.read_column(1, 0, 3, (&mut col[..]).into()).unwrap();
/// assert_eq!(col, [2.0, 4.0, 6.0]);
/// ```
#[derive(Debug, Clone)]
pub struct RowMajorTable {
    data: NumVec,
    n_rows: usize,
    n_columns: usize,
    schema: TableSchema,
}

impl RowMajorTable {
    /// Create a table from row-major data.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if `data.len() != n_rows * n_columns`.
    pub fn new(data: NumVec, n_rows: usize, n_columns: usize) -> Result<Self> {
        Self::with_options(data, n_rows, n_columns, &TableOptions::default())
    }

    /// Create a table from row-major data with explicit options.
    pub fn with_options(
        data: NumVec,
        n_rows: usize,
        n_columns: usize,
        options: &TableOptions,
    ) -> Result<Self> {
        if n_rows.checked_mul(n_columns) != Some(data.len()) {
            return Err(TableError::InvalidStructure(format!(
                "data length {} does not match dimensions {}x{}",
                data.len(),
                n_rows,
                n_columns
            )));
        }
        let schema = TableSchema::from_types(
            std::iter::repeat_n(data.tag(), n_columns),
            options.feature_kind,
            options.features_equal,
        );
        Ok(Self {
            data,
            n_rows,
            n_columns,
            schema,
        })
    }

    /// Create a table from a typed row-major vector.
    pub fn from_vec<T: Element>(data: Vec<T>, n_rows: usize, n_columns: usize) -> Result<Self> {
        Self::new(data.into(), n_rows, n_columns)
    }

    /// Copy a 2-D array (rows x columns) into a new table.
    pub fn from_array<T: Element>(array: ArrayView2<'_, T>) -> Self {
        let (n_rows, n_columns) = array.dim();
        let data: Vec<T> = array.iter().copied().collect();
        Self {
            schema: TableSchema::from_types(
                std::iter::repeat_n(T::TAG, n_columns),
                Default::default(),
                true,
            ),
            data: data.into(),
            n_rows,
            n_columns,
        }
    }

    /// Replace the schema, e.g. to mark columns categorical.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if the schema's width or element
    /// types disagree with the stored data.
    pub fn with_schema(mut self, schema: TableSchema) -> Result<Self> {
        if schema.n_features() != self.n_columns
            || schema.iter().any(|d| d.dtype != self.data.tag())
        {
            return Err(TableError::InvalidStructure(
                "schema does not describe the stored columns".into(),
            ));
        }
        self.schema = schema;
        Ok(self)
    }

    /// Native element type.
    #[inline]
    pub fn dtype(&self) -> TypeTag {
        self.data.tag()
    }

    /// Raw row-major storage.
    #[inline]
    pub fn as_slice(&self) -> NumSlice<'_> {
        self.data.as_slice()
    }

    /// Take back the storage.
    pub fn into_inner(self) -> NumVec {
        self.data
    }
}

impl NumericTable for RowMajorTable {
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
        converter(self.dtype(), dst.tag()).upcast(
            len,
            first_row * self.n_columns,
            self.data.as_slice(),
            dst,
        )
    }

    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let len = n_rows * self.n_columns;
        check_capacity(len, src.len())?;
        converter(self.dtype(), src.tag()).downcast(
            len,
            first_row * self.n_columns,
            src,
            self.data.as_mut_slice(),
        )
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
        converter(self.dtype(), dst.tag()).upcast_strided(
            n_rows,
            first_row * self.n_columns + column,
            self.n_columns,
            self.data.as_slice(),
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
        converter(self.dtype(), src.tag()).downcast_strided(
            n_rows,
            first_row * self.n_columns + column,
            self.n_columns,
            src,
            self.data.as_mut_slice(),
        )
    }
}

// =============================================================================
// ColumnMajorTable
// =============================================================================

/// Dense table storing one contiguous array per feature.
///
/// Features may have different element types.
///
/// # Example
///
/// ```
/// use numtable::{ColumnMajorTable, NumVec, NumericTable};
///
/// let table = ColumnMajorTable::new(vec![
///     NumVec::from(vec![1.5f32, 2.5]),
///     NumVec::from(vec![10i64, 20]),
/// ])
/// .unwrap();
///
/// let mut block = [0.0f64; 4];
/// table.read_rows(0, 2, (&mut block[..]).into()).unwrap();
/// assert_eq!(block, [1.5, 10.0, 2.5, 20.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ColumnMajorTable {
    columns: Vec<NumVec>,
    n_rows: usize,
    schema: TableSchema,
}

impl ColumnMajorTable {
    /// Create a table from per-feature arrays.
    ///
    /// # Errors
    ///
    /// [`TableError::InvalidStructure`] if the features differ in length.
    pub fn new(columns: Vec<NumVec>) -> Result<Self> {
        Self::with_options(columns, &TableOptions::default())
    }

    /// Create a table from per-feature arrays with explicit options.
    pub fn with_options(columns: Vec<NumVec>, options: &TableOptions) -> Result<Self> {
        let n_rows = columns.first().map_or(0, NumVec::len);
        if let Some((j, col)) = columns.iter().enumerate().find(|(_, c)| c.len() != n_rows) {
            return Err(TableError::InvalidStructure(format!(
                "feature {} has {} rows, expected {}",
                j,
                col.len(),
                n_rows
            )));
        }
        let schema = TableSchema::from_types(
            columns.iter().map(NumVec::tag),
            options.feature_kind,
            options.features_equal,
        );
        Ok(Self {
            columns,
            n_rows,
            schema,
        })
    }

    /// Copy a 2-D array (rows x columns) into per-feature arrays.
    pub fn from_array<T: Element>(array: ArrayView2<'_, T>) -> Self {
        let columns: Vec<NumVec> = array
            .columns()
            .into_iter()
            .map(|col| NumVec::from(col.to_vec()))
            .collect();
        Self {
            n_rows: array.nrows(),
            schema: TableSchema::from_types(
                std::iter::repeat_n(T::TAG, columns.len()),
                Default::default(),
                true,
            ),
            columns,
        }
    }

    /// Raw storage of one feature.
    pub fn feature(&self, column: usize) -> Option<NumSlice<'_>> {
        self.columns.get(column).map(NumVec::as_slice)
    }

    /// Take back the per-feature storage.
    pub fn into_inner(self) -> Vec<NumVec> {
        self.columns
    }

    fn column_storage(&self, column: usize) -> Result<&NumVec> {
        check_column(column, self.columns.len())?;
        Ok(&self.columns[column])
    }
}

impl NumericTable for ColumnMajorTable {
    #[inline]
    fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    fn n_columns(&self) -> usize {
        self.columns.len()
    }

    fn layout(&self) -> StorageLayout {
        StorageLayout::ColumnMajor
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn read_rows(&self, first_row: usize, n_rows: usize, mut dst: NumSliceMut<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let n_columns = self.columns.len();
        check_capacity(n_rows * n_columns, dst.len())?;
        for (j, col) in self.columns.iter().enumerate() {
            converter(col.tag(), dst.tag()).upcast_buffer_strided(
                n_rows,
                first_row,
                j,
                n_columns,
                col.as_slice(),
                dst.reborrow(),
            )?;
        }
        Ok(())
    }

    fn write_rows(&mut self, first_row: usize, n_rows: usize, src: NumSlice<'_>) -> Result<()> {
        check_rows(first_row, n_rows, self.n_rows)?;
        let n_columns = self.columns.len();
        check_capacity(n_rows * n_columns, src.len())?;
        for (j, col) in self.columns.iter_mut().enumerate() {
            converter(col.tag(), src.tag()).downcast_buffer_strided(
                n_rows,
                first_row,
                j,
                n_columns,
                src,
                col.as_mut_slice(),
            )?;
        }
        Ok(())
    }

    fn read_column(
        &self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        dst: NumSliceMut<'_>,
    ) -> Result<()> {
        let col = self.column_storage(column)?;
        check_rows(first_row, n_rows, self.n_rows)?;
        check_capacity(n_rows, dst.len())?;
        converter(col.tag(), dst.tag()).upcast(n_rows, first_row, col.as_slice(), dst)
    }

    fn write_column(
        &mut self,
        column: usize,
        first_row: usize,
        n_rows: usize,
        src: NumSlice<'_>,
    ) -> Result<()> {
        check_column(column, self.columns.len())?;
        check_rows(first_row, n_rows, self.n_rows)?;
        check_capacity(n_rows, src.len())?;
        let col = &mut self.columns[column];
        converter(col.tag(), src.tag()).downcast(n_rows, first_row, src, col.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn row_table() -> RowMajorTable {
        // 3 x 3
        RowMajorTable::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0], 3, 3)
            .unwrap()
    }

    #[test]
    fn row_major_rejects_bad_length() {
        let err = RowMajorTable::from_vec(vec![1.0f32; 5], 2, 3).unwrap_err();
        assert!(matches!(err, TableError::InvalidStructure(_)));
    }

    #[test]
    fn row_major_read_rows_converts() {
        let table = row_table();
        let mut block = vec![0i32; 6];
        table.read_rows(1, 2, (&mut block).into()).unwrap();
        assert_eq!(block, vec![4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn row_major_write_rows_round_trips() {
        let mut table = row_table();
        let block = vec![-1.0f32, -2.0, -3.0];
        table.write_rows(2, 1, (&block).into()).unwrap();
        assert_eq!(
            table.as_slice().to_vec::<f64>().unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, -1.0, -2.0, -3.0]
        );
    }

    #[test]
    fn row_major_column_round_trip() {
        let mut table = row_table();
        let mut col = vec![0u64; 2];
        table.read_column(2, 1, 2, (&mut col).into()).unwrap();
        assert_eq!(col, vec![6, 9]);

        table.write_column(0, 0, 2, (&vec![10u64, 20]).into()).unwrap();
        let mut first = vec![0.0f64; 3];
        table.read_column(0, 0, 3, (&mut first).into()).unwrap();
        assert_eq!(first, vec![10.0, 20.0, 7.0]);
    }

    #[test]
    fn row_major_errors_leave_buffer_untouched() {
        let table = row_table();
        let mut block = vec![42i32; 5];
        let err = table.read_rows(0, 2, (&mut block).into()).unwrap_err();
        assert_eq!(
            err,
            TableError::BufferCapacityMismatch {
                required: 6,
                actual: 5
            }
        );
        assert!(block.iter().all(|&v| v == 42));

        assert!(matches!(
            table.read_rows(2, 2, (&mut block).into()),
            Err(TableError::IndexOutOfRange { what: "row", .. })
        ));
        assert!(matches!(
            table.read_column(3, 0, 1, (&mut block).into()),
            Err(TableError::IndexOutOfRange { what: "column", .. })
        ));
    }

    #[test]
    fn row_major_from_array_keeps_logical_order() {
        let a = array![[1u32, 2], [3, 4], [5, 6]];
        let table = RowMajorTable::from_array(a.t());
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_columns(), 3);
        assert_eq!(table.as_slice().to_vec::<u32>().unwrap(), vec![1, 3, 5, 2, 4, 6]);
        assert!(table.schema().is_homogeneous());
    }

    #[test]
    fn column_major_rejects_ragged_features() {
        let err = ColumnMajorTable::new(vec![
            NumVec::from(vec![1.0f32, 2.0]),
            NumVec::from(vec![1i32]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::InvalidStructure(_)));
    }

    #[test]
    fn column_major_interleaves_features() {
        let table = ColumnMajorTable::new(vec![
            NumVec::from(vec![1.0f32, 2.0, 3.0]),
            NumVec::from(vec![10i64, 20, 30]),
            NumVec::from(vec![100u32, 200, 300]),
        ])
        .unwrap();
        assert!(!table.schema().is_homogeneous());
        assert_eq!(table.element_type(1).unwrap(), TypeTag::I64);

        let mut block = vec![0.0f64; 6];
        table.read_rows(1, 2, (&mut block).into()).unwrap();
        assert_eq!(block, vec![2.0, 20.0, 200.0, 3.0, 30.0, 300.0]);
    }

    #[test]
    fn column_major_write_rows_scatters_to_features() {
        let mut table = ColumnMajorTable::from_array(array![[1i32, 2], [3, 4]].view());
        table
            .write_rows(0, 2, (&vec![9.7f64, 8.2, 7.9, 6.1]).into())
            .unwrap();
        assert_eq!(table.feature(0).unwrap().to_vec::<i32>().unwrap(), vec![9, 7]);
        assert_eq!(table.feature(1).unwrap().to_vec::<i32>().unwrap(), vec![8, 6]);
    }

    #[test]
    fn column_major_column_access() {
        let mut table = ColumnMajorTable::from_array(array![[1.0f32, 2.0], [3.0, 4.0]].view());
        let mut col = vec![0i64; 2];
        table.read_column(1, 0, 2, (&mut col).into()).unwrap();
        assert_eq!(col, vec![2, 4]);

        table.write_column(1, 1, 1, (&vec![-5i64]).into()).unwrap();
        assert_eq!(
            table.feature(1).unwrap().to_vec::<f32>().unwrap(),
            vec![2.0, -5.0]
        );
    }

    #[test]
    fn column_major_without_features_is_empty() {
        let table = ColumnMajorTable::new(Vec::new()).unwrap();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_columns(), 0);
        table.read_rows(0, 0, (&mut Vec::<f32>::new()).into()).unwrap();
    }

    #[test]
    fn with_schema_checks_types() {
        use crate::schema::{FeatureDescriptor, FeatureKind};

        let table = row_table();
        let bad = TableSchema::homogeneous(3, FeatureDescriptor::continuous(TypeTag::F32));
        assert!(table.clone().with_schema(bad).is_err());

        let good = TableSchema::homogeneous(
            3,
            FeatureDescriptor::of_kind(TypeTag::F64, FeatureKind::Ordinal),
        );
        let table = table.with_schema(good).unwrap();
        assert_eq!(table.schema().get(0).unwrap().kind, FeatureKind::Ordinal);
    }
}
