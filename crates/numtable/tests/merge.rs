//! Composite tables and concurrent reads.

use ndarray::{Array2, s};
use rayon::prelude::*;
use rstest::rstest;

use numtable::block::{get_block_of_rows, release_block_of_rows};
use numtable::testing::{random_csr, random_dense, read_all};
use numtable::{
    AccessMode, ColumnMajorTable, ColumnMergedTable, CsrTable, NumericTable, PackedLayout,
    PackedTable, RowMajorTable, RowMergedTable, StorageLayout, TableError,
};

fn integer_dense(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    random_dense(rows, cols, seed, -100.0, 100.0).mapv(f64::trunc)
}

#[rstest]
#[case(0, 9)]
#[case(2, 3)]
#[case(3, 4)]
#[case(8, 1)]
#[case(9, 0)]
fn row_merge_matches_concatenation(#[case] first: usize, #[case] len: usize) {
    let top = integer_dense(4, 3, 1);
    let bottom = integer_dense(5, 3, 2);

    let mut a = RowMajorTable::from_array(top.view());
    let mut b = ColumnMajorTable::from_array(bottom.mapv(|v| v as i32).view());
    let merged = RowMergedTable::from_tables(vec![&mut a as &mut dyn NumericTable, &mut b]).unwrap();

    let expected = ndarray::concatenate(ndarray::Axis(0), &[top.view(), bottom.view()]).unwrap();
    let block = get_block_of_rows::<f64, _>(&merged, first, len, AccessMode::Read).unwrap();
    assert_eq!(block.view().unwrap(), expected.slice(s![first..first + len, ..]));
}

#[test]
fn column_merge_of_mixed_layouts() {
    let dense = integer_dense(6, 2, 3);
    let mut a = RowMajorTable::from_array(dense.mapv(|v| v as f32).view());
    let mut b = random_csr(6, 3, 0.5, 4);
    let sparse = read_all(&b).unwrap();
    let mut merged = ColumnMergedTable::new();
    merged.add(&mut a).unwrap();
    merged.add(&mut b).unwrap();
    assert_eq!(merged.layout(), StorageLayout::ColumnMerged);
    assert_eq!(merged.n_columns(), 5);

    let expected = ndarray::concatenate(ndarray::Axis(1), &[dense.view(), sparse.view()]).unwrap();
    assert_eq!(read_all(&merged).unwrap(), expected);
}

#[test]
fn nested_composites() {
    let mut a = RowMajorTable::from_vec(vec![1i32, 2], 1, 2).unwrap();
    let mut b = RowMajorTable::from_vec(vec![3i32, 4], 1, 2).unwrap();
    let mut c = PackedTable::from_vec(PackedLayout::LowerSymmetric, 2, vec![5.0f64, 6.0, 7.0]).unwrap();

    let mut stacked = RowMergedTable::from_tables(vec![&mut a as &mut dyn NumericTable, &mut b]).unwrap();
    let merged = ColumnMergedTable::from_tables(vec![&mut stacked as &mut dyn NumericTable, &mut c]).unwrap();
    assert_eq!(
        read_all(&merged).unwrap(),
        ndarray::array![[1.0, 2.0, 5.0, 6.0], [3.0, 4.0, 6.0, 7.0]]
    );
}

#[test]
fn release_through_composite_reaches_constituents() {
    let mut a = RowMajorTable::from_vec(vec![0.0f64; 4], 2, 2).unwrap();
    let mut b = RowMajorTable::from_vec(vec![0u32; 2], 1, 2).unwrap();
    {
        let mut merged = RowMergedTable::from_tables(vec![&mut a as &mut dyn NumericTable, &mut b]).unwrap();
        let mut block = get_block_of_rows::<f32, _>(&merged, 1, 2, AccessMode::Write).unwrap();
        block.as_mut_slice().copy_from_slice(&[1.0, 2.0, 3.5, 4.5]);
        release_block_of_rows(&mut merged, &block).unwrap();
    }
    assert_eq!(a.as_slice().to_vec::<f64>().unwrap(), vec![0.0, 0.0, 1.0, 2.0]);
    assert_eq!(b.as_slice().to_vec::<u32>().unwrap(), vec![3, 4]);
}

#[test]
fn shape_mismatch_is_rejected() {
    let mut a = RowMajorTable::from_vec(vec![0i32; 4], 2, 2).unwrap();
    let mut b = CsrTable::from_vecs::<f32>(3, vec![], vec![], vec![1, 1, 1]).unwrap();
    let result = RowMergedTable::from_tables(vec![&mut a as &mut dyn NumericTable, &mut b]);
    assert!(matches!(result, Err(TableError::InvalidStructure(_))));
}

#[test]
fn concurrent_reads_of_disjoint_blocks() {
    let data = integer_dense(256, 8, 5);
    let table = RowMajorTable::from_array(data.view());
    let csr = CsrTable::from_dense(data.view());

    let chunks: Vec<usize> = (0..256).step_by(16).collect();
    let blocks: Vec<(Vec<f64>, Vec<f64>)> = chunks
        .par_iter()
        .map(|&first| {
            let dense = get_block_of_rows::<f64, _>(&table, first, 16, AccessMode::Read).unwrap();
            let sparse = get_block_of_rows::<f64, _>(&csr, first, 16, AccessMode::Read).unwrap();
            (dense.into_vec(), sparse.into_vec())
        })
        .collect();

    for (&first, (dense, sparse)) in chunks.iter().zip(&blocks) {
        let expected: Vec<f64> = data.slice(s![first..first + 16, ..]).iter().copied().collect();
        assert_eq!(dense, &expected);
        assert_eq!(sparse, &expected);
    }
}
