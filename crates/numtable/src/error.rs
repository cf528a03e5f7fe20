//! Error types for table access.
//!
//! Every fallible operation in the crate returns [`TableError`]. Checks run
//! before any element is written, so a failed call leaves both the table and
//! the caller buffer untouched.
//!
//! Lossy numeric conversion (float to integer truncation, integer wrapping,
//! saturation of out-of-range floats) is never reported as an error.

use crate::dtype::TypeTag;
use crate::table::StorageLayout;

/// Errors raised by conversion, materialization and table construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// A converter was handed buffers whose element types do not match
    /// the `(src, dst)` pair it was built for.
    #[error("unsupported conversion pair: {src} -> {dst}")]
    UnsupportedTypePair { src: TypeTag, dst: TypeTag },

    /// The operation is not available for the table's storage layout.
    #[error("{operation} is not supported for {layout} tables")]
    LayoutMismatch {
        operation: &'static str,
        layout: StorageLayout,
    },

    /// A row, column or feature index lies outside the table bounds.
    #[error("{what} index {index} out of range (bound {bound})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        bound: usize,
    },

    /// A buffer is too small for the requested block.
    #[error("buffer holds {actual} elements, block requires {required}")]
    BufferCapacityMismatch { required: usize, actual: usize },

    /// The arrays handed to a constructor do not describe a valid table.
    #[error("invalid table structure: {0}")]
    InvalidStructure(String),

    /// The backing byte store rejected a read or write.
    #[error("byte store error: {0}")]
    Store(String),

    /// A builder produced an invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from validating builder-produced descriptors and options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Categorical features must declare how many categories they have.
    #[error("categorical feature requires a positive category count")]
    MissingCategoryCount,

    /// Only categorical and ordinal features carry a category count.
    #[error("continuous feature cannot declare {0} categories")]
    UnexpectedCategoryCount(usize),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TableError>;

// =============================================================================
// Bounds helpers
// =============================================================================

/// Check that rows `[first_row, first_row + n_rows)` lie within `bound` rows.
#[inline]
pub(crate) fn check_rows(first_row: usize, n_rows: usize, bound: usize) -> Result<()> {
    match first_row.checked_add(n_rows) {
        Some(end) if end <= bound => Ok(()),
        _ if first_row > bound => Err(TableError::IndexOutOfRange {
            what: "row",
            index: first_row,
            bound,
        }),
        _ => Err(TableError::IndexOutOfRange {
            what: "row",
            index: first_row.saturating_add(n_rows),
            bound,
        }),
    }
}

/// Check that `column` names an existing column.
#[inline]
pub(crate) fn check_column(column: usize, n_columns: usize) -> Result<()> {
    if column < n_columns {
        Ok(())
    } else {
        Err(TableError::IndexOutOfRange {
            what: "column",
            index: column,
            bound: n_columns,
        })
    }
}

/// Check that a buffer of `actual` elements can hold `required`.
#[inline]
pub(crate) fn check_capacity(required: usize, actual: usize) -> Result<()> {
    if actual >= required {
        Ok(())
    } else {
        Err(TableError::BufferCapacityMismatch { required, actual })
    }
}
