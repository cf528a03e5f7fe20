//! Block materialization benchmarks.
//!
//! Measures row-block extraction with element conversion across layouts.
//!
//! Run with: `cargo bench --bench materialize`

mod common;

use common::criterion_config::default_criterion;

use numtable::testing::{random_csr, random_dense, random_packed};
use numtable::{
    ColumnMajorTable, CsrTable, NumericTable, PackedLayout, RowMajorTable, TypeTag, converter,
};

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const BLOCK_ROWS: usize = 256;

// =============================================================================
// Conversion kernels
// =============================================================================

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    let n = 1 << 16;
    let src: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
    group.throughput(Throughput::Elements(n as u64));

    for dst_tag in [TypeTag::F64, TypeTag::F32, TypeTag::I32] {
        let conv = converter(TypeTag::F64, dst_tag);
        let mut dst = numtable::NumVec::zeros(dst_tag, n);
        group.bench_function(BenchmarkId::new("contiguous", dst_tag), |b| {
            b.iter(|| conv.upcast(n, 0, black_box((&src).into()), dst.as_mut_slice()))
        });
        group.bench_function(BenchmarkId::new("strided", dst_tag), |b| {
            b.iter(|| conv.upcast_strided(n / 8, 0, 8, black_box((&src).into()), dst.as_mut_slice()))
        });
    }

    group.finish();
}

// =============================================================================
// Row blocks by layout
// =============================================================================

fn read_blocks(table: &dyn NumericTable, dst: &mut [f32]) {
    let n_rows = table.n_rows();
    for first in (0..n_rows).step_by(BLOCK_ROWS) {
        let len = BLOCK_ROWS.min(n_rows - first);
        let _ = table.read_rows(first, len, (&mut dst[..len * table.n_columns()]).into());
    }
}

fn bench_row_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_blocks");

    for n_features in [8usize, 64] {
        let n_rows = 16_384;
        let dense = random_dense(n_rows, n_features, 42, -1.0, 1.0);
        group.throughput(Throughput::Elements((n_rows * n_features) as u64));

        let row_major: Box<dyn NumericTable> = Box::new(RowMajorTable::from_array(dense.view()));
        let column_major: Box<dyn NumericTable> =
            Box::new(ColumnMajorTable::from_array(dense.view()));
        let csr: Box<dyn NumericTable> = Box::new(random_csr(n_rows, n_features, 0.1, 42));
        let tables = [
            ("row_major", row_major),
            ("column_major", column_major),
            ("csr_10pct", csr),
        ];

        let mut dst = vec![0.0f32; BLOCK_ROWS * n_features];
        for (name, table) in &tables {
            group.bench_with_input(BenchmarkId::new(*name, n_features), table, |b, table| {
                b.iter(|| read_blocks(black_box(&**table), &mut dst))
            });
        }
    }

    group.finish();
}

fn bench_packed(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed");

    for dim in [64usize, 512] {
        group.throughput(Throughput::Elements((dim * dim) as u64));
        let mut dst = vec![0.0f32; BLOCK_ROWS * dim];
        for layout in [PackedLayout::UpperSymmetric, PackedLayout::LowerTriangular] {
            let Ok(table) = random_packed(layout, dim, 7) else {
                continue;
            };
            group.bench_function(BenchmarkId::new(format!("{layout}"), dim), |b| {
                b.iter(|| read_blocks(black_box(&table as &dyn NumericTable), &mut dst))
            });
        }
    }

    group.finish();
}

fn bench_sparse_sub_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("csr_sparse");
    let csr: CsrTable = random_csr(16_384, 64, 0.05, 3);
    let mut values = vec![0.0f32; csr.nnz()];
    let mut cols = vec![0usize; csr.nnz()];
    let mut offsets = vec![0usize; BLOCK_ROWS + 1];

    group.throughput(Throughput::Elements(csr.nnz() as u64));
    group.bench_function("read_sparse_rows", |b| {
        b.iter(|| {
            for first in (0..csr.n_rows()).step_by(BLOCK_ROWS) {
                let _ = csr.read_sparse_rows(
                    first,
                    BLOCK_ROWS,
                    (&mut values[..]).into(),
                    &mut cols,
                    &mut offsets,
                );
            }
        })
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = default_criterion();
    targets = bench_convert, bench_row_blocks, bench_packed, bench_sparse_sub_blocks
}
criterion_main!(benches);
