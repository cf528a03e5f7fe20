//! Feature descriptors and table schemas.
//!
//! A [`TableSchema`] holds one [`FeatureDescriptor`] per column, or a single
//! shared descriptor when every column has the same element type and kind.

use bon::Builder;

use crate::dtype::TypeTag;
use crate::error::ConfigError;

/// How a feature's values are interpreted by consumers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FeatureKind {
    /// Unordered category IDs `0..n_categories`.
    Categorical,
    /// Ordered discrete levels.
    Ordinal,
    /// Real-valued measurement.
    #[default]
    Continuous,
}

impl FeatureKind {
    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatureKind::Categorical)
    }
}

/// Metadata for a single column.
///
/// # Example
///
/// ```
/// use numtable::{FeatureDescriptor, FeatureKind, TypeTag};
///
/// let color = FeatureDescriptor::builder()
///     .dtype(TypeTag::I32)
///     .kind(FeatureKind::Categorical)
///     .n_categories(5)
///     .name("color")
///     .build()
///     .unwrap();
/// assert_eq!(color.n_categories, 5);
///
/// // Categorical features must say how many categories they have
/// assert!(FeatureDescriptor::builder()
///     .dtype(TypeTag::I32)
///     .kind(FeatureKind::Categorical)
///     .build()
///     .is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureDescriptor {
    /// Element type of the column.
    pub dtype: TypeTag,

    /// Interpretation of the values. Default: continuous.
    #[builder(default)]
    pub kind: FeatureKind,

    /// Number of categories; zero for continuous features.
    #[builder(default)]
    pub n_categories: usize,

    /// Optional column name.
    #[builder(into)]
    pub name: Option<String>,
}

impl<S: feature_descriptor_builder::IsComplete> FeatureDescriptorBuilder<S> {
    /// Build and validate the descriptor.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingCategoryCount`] for a categorical feature with
    ///   `n_categories == 0`
    /// - [`ConfigError::UnexpectedCategoryCount`] for a continuous feature
    ///   with categories
    pub fn build(self) -> Result<FeatureDescriptor, ConfigError> {
        let descriptor = self.__build_internal();
        descriptor.validate()?;
        Ok(descriptor)
    }
}

impl FeatureDescriptor {
    /// Continuous feature of the given element type.
    pub fn continuous(dtype: TypeTag) -> Self {
        Self {
            dtype,
            kind: FeatureKind::Continuous,
            n_categories: 0,
            name: None,
        }
    }

    /// Plain descriptor of the given element type and kind.
    ///
    /// Categorical kinds get a category count of one until set otherwise.
    pub fn of_kind(dtype: TypeTag, kind: FeatureKind) -> Self {
        Self {
            dtype,
            kind,
            n_categories: usize::from(kind.is_categorical()),
            name: None,
        }
    }

    /// Set the column name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            FeatureKind::Categorical if self.n_categories == 0 => {
                Err(ConfigError::MissingCategoryCount)
            }
            FeatureKind::Continuous if self.n_categories != 0 => {
                Err(ConfigError::UnexpectedCategoryCount(self.n_categories))
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// TableSchema
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
enum Descriptors {
    /// One descriptor shared by every column.
    Shared(FeatureDescriptor),
    /// One descriptor per column.
    PerColumn(Vec<FeatureDescriptor>),
}

/// Per-column metadata of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    n_features: usize,
    descriptors: Descriptors,
}

impl TableSchema {
    /// Schema where every column shares `descriptor`.
    pub fn homogeneous(n_features: usize, descriptor: FeatureDescriptor) -> Self {
        Self {
            n_features,
            descriptors: Descriptors::Shared(descriptor),
        }
    }

    /// Schema with one descriptor per column.
    pub fn from_descriptors(descriptors: Vec<FeatureDescriptor>) -> Self {
        Self {
            n_features: descriptors.len(),
            descriptors: Descriptors::PerColumn(descriptors),
        }
    }

    /// Schema of continuous columns with the given element types.
    ///
    /// Collapses to a shared descriptor when `features_equal` is set and all
    /// types agree.
    pub fn from_types(
        types: impl IntoIterator<Item = TypeTag>,
        kind: FeatureKind,
        features_equal: bool,
    ) -> Self {
        let descriptors: Vec<_> = types
            .into_iter()
            .map(|t| FeatureDescriptor::of_kind(t, kind))
            .collect();
        match descriptors.first() {
            Some(first) if features_equal && descriptors.iter().all(|d| d == first) => {
                Self::homogeneous(descriptors.len(), first.clone())
            }
            _ => Self::from_descriptors(descriptors),
        }
    }

    /// Schema of the columns of `parts` placed side by side.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a TableSchema>) -> Self {
        Self::from_descriptors(parts.into_iter().flat_map(|s| s.iter().cloned()).collect())
    }

    /// Schema of `lower` stacked under `upper`.
    ///
    /// Each column keeps the upper descriptor, with its element type promoted
    /// by [`TypeTag::promote`] so it can carry values of both parts.
    pub fn stack(upper: &TableSchema, lower: &TableSchema) -> Self {
        let promoted = |u: &FeatureDescriptor, l: &FeatureDescriptor| FeatureDescriptor {
            dtype: u.dtype.promote(l.dtype),
            ..u.clone()
        };
        match (&upper.descriptors, &lower.descriptors) {
            (Descriptors::Shared(u), Descriptors::Shared(l)) => {
                Self::homogeneous(upper.n_features, promoted(u, l))
            }
            _ => Self::from_descriptors(
                upper
                    .iter()
                    .zip(lower.iter())
                    .map(|(u, l)| promoted(u, l))
                    .collect(),
            ),
        }
    }

    /// Number of columns described.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Whether all columns share one descriptor.
    #[inline]
    pub fn is_homogeneous(&self) -> bool {
        matches!(self.descriptors, Descriptors::Shared(_))
    }

    /// Descriptor of column `index`.
    pub fn get(&self, index: usize) -> Option<&FeatureDescriptor> {
        if index >= self.n_features {
            return None;
        }
        match &self.descriptors {
            Descriptors::Shared(d) => Some(d),
            Descriptors::PerColumn(ds) => ds.get(index),
        }
    }

    /// Element type of column `index`.
    pub fn element_type(&self, index: usize) -> Option<TypeTag> {
        self.get(index).map(|d| d.dtype)
    }

    /// Check if any column is categorical.
    pub fn has_categorical(&self) -> bool {
        self.iter().any(|d| d.kind.is_categorical())
    }

    /// Index of the first column with the given name.
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.iter().position(|d| d.name.as_deref() == Some(name))
    }

    /// Iterate descriptors column by column.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureDescriptor> {
        (0..self.n_features).filter_map(move |i| self.get(i))
    }

    /// Replace the descriptor of one column, splitting a shared schema.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, descriptor: FeatureDescriptor) -> bool {
        if index >= self.n_features {
            return false;
        }
        if let Descriptors::Shared(shared) = &self.descriptors {
            self.descriptors = Descriptors::PerColumn(vec![shared.clone(); self.n_features]);
        }
        if let Descriptors::PerColumn(ds) = &mut self.descriptors {
            ds[index] = descriptor;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_kind_default_is_continuous() {
        assert_eq!(FeatureKind::default(), FeatureKind::Continuous);
    }

    #[test]
    fn builder_validates_categories() {
        let err = FeatureDescriptor::builder()
            .dtype(TypeTag::F64)
            .n_categories(3)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnexpectedCategoryCount(3));

        let ordinal = FeatureDescriptor::builder()
            .dtype(TypeTag::U32)
            .kind(FeatureKind::Ordinal)
            .n_categories(4)
            .build()
            .unwrap();
        assert_eq!(ordinal.kind, FeatureKind::Ordinal);
    }

    #[test]
    fn homogeneous_schema_answers_every_column() {
        let schema = TableSchema::homogeneous(3, FeatureDescriptor::continuous(TypeTag::F32));
        assert!(schema.is_homogeneous());
        assert_eq!(schema.element_type(2), Some(TypeTag::F32));
        assert_eq!(schema.element_type(3), None);
        assert_eq!(schema.iter().count(), 3);
    }

    #[test]
    fn from_types_collapses_equal_types() {
        let schema = TableSchema::from_types(
            [TypeTag::I32, TypeTag::I32],
            FeatureKind::Continuous,
            true,
        );
        assert!(schema.is_homogeneous());

        let schema = TableSchema::from_types(
            [TypeTag::I32, TypeTag::F64],
            FeatureKind::Continuous,
            true,
        );
        assert!(!schema.is_homogeneous());
        assert_eq!(schema.element_type(1), Some(TypeTag::F64));
    }

    #[test]
    fn set_splits_shared_schema() {
        let mut schema = TableSchema::homogeneous(2, FeatureDescriptor::continuous(TypeTag::F32));
        assert!(schema.set(1, FeatureDescriptor::continuous(TypeTag::I64).with_name("count")));
        assert!(!schema.is_homogeneous());
        assert_eq!(schema.element_type(0), Some(TypeTag::F32));
        assert_eq!(schema.element_type(1), Some(TypeTag::I64));
        assert_eq!(schema.feature_index("count"), Some(1));
        assert!(!schema.set(2, FeatureDescriptor::continuous(TypeTag::F32)));
    }

    #[test]
    fn concat_joins_columns() {
        let a = TableSchema::homogeneous(2, FeatureDescriptor::continuous(TypeTag::F32));
        let b = TableSchema::from_descriptors(vec![FeatureDescriptor::of_kind(
            TypeTag::I32,
            FeatureKind::Categorical,
        )]);
        let joined = TableSchema::concat([&a, &b]);
        assert_eq!(joined.n_features(), 3);
        assert!(joined.has_categorical());
        assert_eq!(joined.element_type(2), Some(TypeTag::I32));
    }

    #[test]
    fn stack_promotes_element_types() {
        let upper = TableSchema::from_descriptors(vec![
            FeatureDescriptor::continuous(TypeTag::I32).with_name("age"),
            FeatureDescriptor::continuous(TypeTag::F32),
        ]);
        let lower = TableSchema::homogeneous(2, FeatureDescriptor::continuous(TypeTag::U32));
        let stacked = TableSchema::stack(&upper, &lower);
        assert_eq!(stacked.element_type(0), Some(TypeTag::I64));
        assert_eq!(stacked.element_type(1), Some(TypeTag::F64));
        assert_eq!(stacked.feature_index("age"), Some(0));

        let shared = TableSchema::stack(&lower, &lower);
        assert!(shared.is_homogeneous());
        assert_eq!(shared.element_type(1), Some(TypeTag::U32));
    }
}
