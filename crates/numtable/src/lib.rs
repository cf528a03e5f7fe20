//! numtable: block access over heterogeneous numeric tables.
//!
//! Tables store numeric data in one of several physical layouts and element
//! types. Consumers request rectangular blocks of rows, or ranges of one
//! column, in whatever element type they compute in; the table converts on
//! the way out and back on the way in.
//!
//! # Key Types
//!
//! - [`NumericTable`] - the uniform block interface every layout implements
//! - [`RowMajorTable`] / [`ColumnMajorTable`] - dense storage
//! - [`CsrTable`] - compressed sparse rows, one-based
//! - [`PackedTable`] - packed symmetric / triangular square matrices
//! - [`RowMergedTable`] / [`ColumnMergedTable`] - composites
//! - [`ExternalTable`] - row-major over a [`ByteStore`]
//! - [`converter`] - the any-to-any element conversion matrix
//!
//! # Blocks
//!
//! [`NumericTable::read_rows`] and friends fill caller-owned buffers. The
//! [`block`] module wraps them in owned [`Block`] handles with an
//! [`AccessMode`]:
//!
//! ```
//! use numtable::{AccessMode, CsrTable, block};
//!
//! let csr = CsrTable::from_vecs(3, vec![10i32, 20, 30], vec![1, 3, 2], vec![1, 2, 2, 4]).unwrap();
//! let rows = block::get_block_of_rows::<f32, _>(&csr, 0, 3, AccessMode::Read).unwrap();
//! assert_eq!(rows.view().unwrap()[[2, 1]], 30.0);
//! ```
//!
//! # Feature Flags
//!
//! - `serde` (default): `Serialize`/`Deserialize` for tags, layouts and
//!   feature descriptors.

pub mod block;
pub mod buffer;
pub mod config;
pub mod convert;
pub mod dtype;
pub mod error;
pub mod packed;
pub mod schema;
pub mod store;
pub mod table;
pub mod testing;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Tables
pub use table::{
    ColumnMajorTable, ColumnMergedTable, CsrIndexing, CsrTable, ExternalTable, NumericTable,
    PackedTable, RowMajorTable, RowMergedTable, StorageLayout,
};

// Elements and buffers
pub use buffer::{NumSlice, NumSliceMut, NumVec};
pub use convert::{Converter, converter};
pub use dtype::{Element, TypeTag};
pub use packed::PackedLayout;

// Blocks
pub use block::{AccessMode, Block, SparseBlock};

// Metadata and configuration
pub use config::TableOptions;
pub use schema::{FeatureDescriptor, FeatureKind, TableSchema};
pub use store::{ByteStore, MemoryByteStore};

pub use error::{ConfigError, Result, TableError};
