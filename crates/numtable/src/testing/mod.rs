//! Seeded data generators and reference helpers for tests and benchmarks.

use ndarray::Array2;
use rand::prelude::*;

use crate::error::{Result, TableError};
use crate::packed::PackedLayout;
use crate::table::{CsrTable, NumericTable, PackedTable};

/// Random dense matrix with values uniform in `[min, max)`.
pub fn random_dense(rows: usize, cols: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max > min);
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(min..max))
}

/// Random integer-valued matrix in `[0, max)`, stored as `i64`.
pub fn random_dense_i64(rows: usize, cols: usize, seed: u64, max: i64) -> Array2<i64> {
    assert!(max > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(0..max))
}

/// Random CSR table of `f64` values; each cell is stored with probability
/// `density`. Stored values are integers in `[1, 100)`, so never zero.
pub fn random_csr(rows: usize, cols: usize, density: f64, seed: u64) -> CsrTable {
    assert!((0.0..=1.0).contains(&density));
    let mut rng = StdRng::seed_from_u64(seed);
    let dense = Array2::from_shape_fn((rows, cols), |_| {
        if rng.gen_bool(density) {
            rng.gen_range(1..100) as f64
        } else {
            0.0
        }
    });
    CsrTable::from_dense(dense.view())
}

/// Random symmetric `dim x dim` matrix with integer values in `[-50, 50)`.
pub fn random_symmetric(dim: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut m = Array2::zeros((dim, dim));
    for r in 0..dim {
        for c in r..dim {
            let v = rng.gen_range(-50..50) as f64;
            m[[r, c]] = v;
            m[[c, r]] = v;
        }
    }
    m
}

/// Random packed table of the given layout, built from
/// [`random_symmetric`].
pub fn random_packed(layout: PackedLayout, dim: usize, seed: u64) -> Result<PackedTable> {
    PackedTable::from_square(layout, random_symmetric(dim, seed).view())
}

/// Densify a CSR table directly from its raw arrays, without going through
/// the block materializers.
pub fn csr_to_dense(csr: &CsrTable) -> Result<Array2<f64>> {
    let values = csr.values().to_vec::<f64>()?;
    let offsets = csr.row_offsets();
    let mut dense = Array2::zeros((csr.n_rows(), csr.n_columns()));
    for r in 0..csr.n_rows() {
        for k in offsets[r] - 1..offsets[r + 1] - 1 {
            dense[[r, csr.col_indices()[k] - 1]] = values[k];
        }
    }
    Ok(dense)
}

/// Read a whole table through [`NumericTable::read_rows`] as `f64`.
pub fn read_all(table: &dyn NumericTable) -> Result<Array2<f64>> {
    let (rows, cols) = (table.n_rows(), table.n_columns());
    let mut data = vec![0.0f64; rows * cols];
    table.read_rows(0, rows, (&mut data).into())?;
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| TableError::InvalidStructure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_deterministic() {
        assert_eq!(random_dense(4, 3, 7, -1.0, 1.0), random_dense(4, 3, 7, -1.0, 1.0));
        assert_ne!(random_dense(4, 3, 7, -1.0, 1.0), random_dense(4, 3, 8, -1.0, 1.0));
    }

    #[test]
    fn symmetric_is_symmetric() {
        let m = random_symmetric(5, 1);
        assert_eq!(m, m.t());
    }

    #[test]
    fn csr_reference_matches_reader() {
        let csr = random_csr(6, 4, 0.3, 11);
        assert_eq!(csr_to_dense(&csr).unwrap(), read_all(&csr).unwrap());
    }
}
