//! Table construction options.
//!
//! [`TableOptions`] collects the knobs shared by the table constructors that
//! take a `with_options` variant. Built with `bon`:
//!
//! ```
//! use numtable::{CsrIndexing, FeatureKind, TableOptions};
//!
//! let options = TableOptions::builder()
//!     .csr_indexing(CsrIndexing::ZeroBased)
//!     .feature_kind(FeatureKind::Ordinal)
//!     .build();
//! assert!(options.features_equal);
//! ```

use bon::Builder;

use crate::schema::FeatureKind;
use crate::table::csr::CsrIndexing;

/// Options applied when constructing a table.
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
#[builder(derive(Clone, Debug))]
pub struct TableOptions {
    /// Collapse the schema to one shared descriptor when all columns have
    /// the same element type. Default: `true`.
    #[builder(default = true)]
    pub features_equal: bool,

    /// Base of the index arrays handed to CSR constructors. Storage is always
    /// one-based; zero-based input is rebased. Default: one-based.
    #[builder(default)]
    pub csr_indexing: CsrIndexing,

    /// Kind recorded in generated feature descriptors. Default: continuous.
    #[builder(default)]
    pub feature_kind: FeatureKind,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
