//! Packed symmetric and triangular addressing.
//!
//! A packed `dim x dim` matrix keeps only one triangle (diagonal included) in
//! a linear array of [`packed_len`]`(dim)` elements, row by row:
//!
//! ```text
//! Upper, dim = 3:          Lower, dim = 3:
//! [0 1 2]                  [0 . .]
//! [. 3 4]                  [1 2 .]
//! [. . 5]                  [3 4 5]
//! ```
//!
//! Symmetric layouts mirror the missing triangle: `(r, c)` and `(c, r)` share
//! one offset. Triangular layouts treat the missing triangle as implicit
//! zeros with no storage at all; see [`locate`].

use std::fmt;

/// Which triangle is stored, and what the other triangle means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PackedLayout {
    /// Upper triangle stored, lower triangle mirrors it.
    UpperSymmetric,
    /// Lower triangle stored, upper triangle mirrors it.
    LowerSymmetric,
    /// Upper triangle stored, lower triangle is zero.
    UpperTriangular,
    /// Lower triangle stored, upper triangle is zero.
    LowerTriangular,
}

impl PackedLayout {
    pub const ALL: [PackedLayout; 4] = [
        PackedLayout::UpperSymmetric,
        PackedLayout::LowerSymmetric,
        PackedLayout::UpperTriangular,
        PackedLayout::LowerTriangular,
    ];

    #[inline]
    pub const fn is_upper(self) -> bool {
        matches!(
            self,
            PackedLayout::UpperSymmetric | PackedLayout::UpperTriangular
        )
    }

    #[inline]
    pub const fn is_symmetric(self) -> bool {
        matches!(
            self,
            PackedLayout::UpperSymmetric | PackedLayout::LowerSymmetric
        )
    }

    #[inline]
    pub const fn is_triangular(self) -> bool {
        !self.is_symmetric()
    }

    /// Whether `(row, column)` lies in the stored triangle without swapping.
    #[inline]
    pub const fn in_stored_triangle(self, row: usize, column: usize) -> bool {
        if self.is_upper() {
            row <= column
        } else {
            row >= column
        }
    }
}

impl fmt::Display for PackedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackedLayout::UpperSymmetric => "packed upper-symmetric",
            PackedLayout::LowerSymmetric => "packed lower-symmetric",
            PackedLayout::UpperTriangular => "packed upper-triangular",
            PackedLayout::LowerTriangular => "packed lower-triangular",
        })
    }
}

/// Classification of a logical cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// The cell's value lives at this offset of the packed array.
    Stored(usize),
    /// Implicit zero of a triangular layout; no storage exists.
    Zero,
}

/// Number of elements stored for a `dim x dim` packed matrix.
#[inline]
pub const fn packed_len(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

/// Offset of `(row, column)` in an upper packed array, `row <= column`.
#[inline]
const fn upper_offset(row: usize, column: usize, dim: usize) -> usize {
    // ((2*dim - (row - 1)) * row) / 2 + (column - row), kept in unsigned range
    (2 * dim + 1 - row) * row / 2 + (column - row)
}

/// Offset of `(row, column)` in a lower packed array, `row >= column`.
#[inline]
const fn lower_offset(row: usize, column: usize) -> usize {
    (row + 1) * row / 2 + column
}

/// Linear offset of `(row, column)` after swapping it into the stored
/// triangle.
///
/// For triangular layouts this is the offset of the *mirrored* cell; use
/// [`locate`] to tell stored cells from implicit zeros.
///
/// Requires `row < dim` and `column < dim`.
#[inline]
pub const fn position(layout: PackedLayout, row: usize, column: usize, dim: usize) -> usize {
    debug_assert!(row < dim && column < dim);
    if layout.is_upper() {
        if row > column {
            upper_offset(column, row, dim)
        } else {
            upper_offset(row, column, dim)
        }
    } else if row < column {
        lower_offset(column, row)
    } else {
        lower_offset(row, column)
    }
}

/// Resolve `(row, column)` to a stored offset or an implicit zero.
#[inline]
pub const fn locate(layout: PackedLayout, row: usize, column: usize, dim: usize) -> Cell {
    if layout.is_triangular() && !layout.in_stored_triangle(row, column) {
        Cell::Zero
    } else {
        Cell::Stored(position(layout, row, column, dim))
    }
}

/// Columns of `row` that are stored contiguously, with the offset of the
/// first one: `[row, dim)` for upper layouts and `[0, row]` for lower ones.
#[inline]
pub(crate) const fn stored_run(
    layout: PackedLayout,
    row: usize,
    dim: usize,
) -> (std::ops::Range<usize>, usize) {
    if layout.is_upper() {
        (row..dim, upper_offset(row, row, dim))
    } else {
        (0..row + 1, lower_offset(row, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_lengths() {
        assert_eq!(packed_len(0), 0);
        assert_eq!(packed_len(1), 1);
        assert_eq!(packed_len(3), 6);
        assert_eq!(packed_len(4), 10);
    }

    #[test]
    fn upper_offsets_row_by_row() {
        let layout = PackedLayout::UpperSymmetric;
        let expected = [[0, 1, 2], [1, 3, 4], [2, 4, 5]];
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(position(layout, r, c, 3), expected[r][c], "({r}, {c})");
            }
        }
    }

    #[test]
    fn lower_offsets_row_by_row() {
        let layout = PackedLayout::LowerSymmetric;
        let expected = [[0, 1, 3], [1, 2, 4], [3, 4, 5]];
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(position(layout, r, c, 3), expected[r][c], "({r}, {c})");
            }
        }
    }

    #[test]
    fn triangular_cells_outside_triangle_are_zero() {
        assert_eq!(locate(PackedLayout::UpperTriangular, 2, 0, 3), Cell::Zero);
        assert_eq!(locate(PackedLayout::UpperTriangular, 0, 2, 3), Cell::Stored(2));
        assert_eq!(locate(PackedLayout::LowerTriangular, 0, 2, 3), Cell::Zero);
        assert_eq!(locate(PackedLayout::LowerTriangular, 2, 0, 3), Cell::Stored(3));
    }

    #[test]
    fn symmetric_cells_are_always_stored() {
        for layout in [PackedLayout::UpperSymmetric, PackedLayout::LowerSymmetric] {
            for r in 0..4 {
                for c in 0..4 {
                    assert!(matches!(locate(layout, r, c, 4), Cell::Stored(_)));
                }
            }
        }
    }

    #[test]
    fn stored_runs_are_contiguous() {
        for layout in PackedLayout::ALL {
            for row in 0..5 {
                let (cols, start) = stored_run(layout, row, 5);
                for (k, c) in cols.enumerate() {
                    assert_eq!(position(layout, row, c, 5), start + k);
                }
            }
        }
    }

    #[test]
    fn layout_predicates() {
        assert!(PackedLayout::UpperTriangular.is_upper());
        assert!(PackedLayout::UpperTriangular.is_triangular());
        assert!(!PackedLayout::LowerSymmetric.is_upper());
        assert!(PackedLayout::LowerSymmetric.is_symmetric());
    }
}
