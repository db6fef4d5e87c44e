//! FILENAME: model/src/dimension.rs
//! PURPOSE: Grouping dimensions and the index that declares them.
//! CONTEXT: A dimension is a categorical factor with an ordered set of levels.
//! The level sequence is the canonical sort order. Dimensions never change
//! after declaration; growing a dimension produces a new index so any Grid
//! computed against the old one stays valid.

use crate::error::ModelError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// A level of a dimension.
pub type Label = String;

// ============================================================================
// DIMENSION
// ============================================================================

/// Serialized shape of a dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDef {
    pub name: String,
    pub levels: Vec<Label>,
}

/// A grouping factor with its canonical level order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DimensionDef", into = "DimensionDef")]
pub struct Dimension {
    name: String,
    levels: Vec<Label>,
    /// Reverse lookup: label -> canonical rank.
    rank: FxHashMap<Label, usize>,
}

impl Dimension {
    pub fn new<I, L>(name: impl Into<String>, levels: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let name = name.into();
        let levels: Vec<Label> = levels.into_iter().map(Into::into).collect();
        let mut rank = FxHashMap::default();
        for (i, label) in levels.iter().enumerate() {
            if rank.insert(label.clone(), i).is_some() {
                return Err(ModelError::DuplicateLevel {
                    dimension: name,
                    label: label.clone(),
                });
            }
        }
        Ok(Dimension { name, levels, rank })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Levels in canonical order.
    pub fn levels(&self) -> &[Label] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.rank.contains_key(label)
    }

    /// Canonical rank of a level.
    pub fn rank(&self, label: &str) -> Option<usize> {
        self.rank.get(label).copied()
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.levels == other.levels
    }
}

impl Eq for Dimension {}

impl TryFrom<DimensionDef> for Dimension {
    type Error = ModelError;

    fn try_from(def: DimensionDef) -> Result<Self, Self::Error> {
        Dimension::new(def.name, def.levels)
    }
}

impl From<Dimension> for DimensionDef {
    fn from(dim: Dimension) -> Self {
        DimensionDef {
            name: dim.name,
            levels: dim.levels,
        }
    }
}

// ============================================================================
// DIMENSION INDEX
// ============================================================================

/// The ordered set of dimensions declared for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Dimension>", into = "Vec<Dimension>")]
pub struct DimensionIndex {
    /// Dimensions in declaration order. Shared so extended indexes reuse them.
    dimensions: Vec<Arc<Dimension>>,
    by_name: FxHashMap<String, usize>,
}

impl DimensionIndex {
    pub fn new() -> Self {
        DimensionIndex::default()
    }

    /// Declares a new dimension with its canonical level order.
    pub fn declare<I, L>(&mut self, name: impl Into<String>, levels: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let dimension = Dimension::new(name, levels)?;
        self.push(dimension)
    }

    /// Builder form of [`declare`](Self::declare).
    pub fn with_dimension<I, L>(mut self, name: impl Into<String>, levels: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.declare(name, levels)?;
        Ok(self)
    }

    fn push(&mut self, dimension: Dimension) -> Result<(), ModelError> {
        if self.by_name.contains_key(dimension.name()) {
            return Err(ModelError::DuplicateDimension(dimension.name().to_string()));
        }
        self.by_name.insert(dimension.name().to_string(), self.dimensions.len());
        self.dimensions.push(Arc::new(dimension));
        Ok(())
    }

    /// Returns a new index where `name` gains `extra_levels` after its existing
    /// levels. The receiver is left untouched.
    pub fn extended<I, L>(&self, name: &str, extra_levels: I) -> Result<DimensionIndex, ModelError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        let position = self.position(name)?;
        let current = &self.dimensions[position];
        let levels = current
            .levels()
            .iter()
            .cloned()
            .chain(extra_levels.into_iter().map(Into::into));
        let replacement = Dimension::new(name, levels)?;

        let mut next = self.clone();
        next.dimensions[position] = Arc::new(replacement);
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Declaration position of a dimension.
    pub fn position(&self, name: &str) -> Result<usize, ModelError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::UnknownDimension(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.by_name.get(name).map(|&i| self.dimensions[i].as_ref())
    }

    /// Like [`get`](Self::get) but fails with `UnknownDimension`.
    pub fn dimension(&self, name: &str) -> Result<&Dimension, ModelError> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownDimension(name.to_string()))
    }

    /// Canonical rank of `label` within `dimension`.
    pub fn order(&self, dimension: &str, label: &str) -> Result<usize, ModelError> {
        self.dimension(dimension)?
            .rank(label)
            .ok_or_else(|| ModelError::UnknownLabel {
                dimension: dimension.to_string(),
                label: label.to_string(),
            })
    }

    /// Compares two labels of the same dimension by canonical rank.
    pub fn compare(&self, dimension: &str, a: &str, b: &str) -> Result<Ordering, ModelError> {
        Ok(self.order(dimension, a)?.cmp(&self.order(dimension, b)?))
    }

    /// Dimension names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.dimensions.iter().map(|d| d.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dimension> + '_ {
        self.dimensions.iter().map(|d| d.as_ref())
    }
}

impl TryFrom<Vec<Dimension>> for DimensionIndex {
    type Error = ModelError;

    fn try_from(dimensions: Vec<Dimension>) -> Result<Self, Self::Error> {
        let mut index = DimensionIndex::new();
        for dimension in dimensions {
            index.push(dimension)?;
        }
        Ok(index)
    }
}

impl From<DimensionIndex> for Vec<Dimension> {
    fn from(index: DimensionIndex) -> Self {
        index.dimensions.iter().map(|d| d.as_ref().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> DimensionIndex {
        DimensionIndex::new()
            .with_dimension("Class", ["1st", "2nd", "3rd", "Crew"])
            .unwrap()
            .with_dimension("Sex", ["Male", "Female"])
            .unwrap()
    }

    #[test]
    fn test_declare_rejects_duplicates() {
        let mut index = sample_index();
        let err = index.declare("Sex", ["M", "F"]).unwrap_err();
        assert_eq!(err, ModelError::DuplicateDimension("Sex".to_string()));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_duplicate_level_is_rejected() {
        let err = Dimension::new("Age", ["Child", "Adult", "Child"]).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateLevel { .. }));
    }

    #[test]
    fn test_order_uses_declaration_rank() {
        let index = sample_index();
        assert_eq!(index.order("Class", "3rd").unwrap(), 2);
        assert_eq!(index.compare("Sex", "Female", "Male").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_order_unknown_label_and_dimension() {
        let index = sample_index();
        assert!(matches!(
            index.order("Class", "4th"),
            Err(ModelError::UnknownLabel { .. })
        ));
        assert_eq!(
            index.order("Age", "Child"),
            Err(ModelError::UnknownDimension("Age".to_string()))
        );
    }

    #[test]
    fn test_extended_leaves_original_untouched() {
        let index = sample_index();
        let grown = index.extended("Sex", ["Other"]).unwrap();

        assert_eq!(grown.dimension("Sex").unwrap().len(), 3);
        assert_eq!(index.dimension("Sex").unwrap().len(), 2);
        assert!(index.order("Sex", "Other").is_err());
        assert_eq!(grown.order("Sex", "Other").unwrap(), 2);
    }

    #[test]
    fn test_serde_roundtrip_preserves_order() {
        let index = sample_index();
        let json = serde_json::to_string(&index).unwrap();
        let back: DimensionIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(back, index);
        assert_eq!(back.names().collect::<Vec<_>>(), vec!["Class", "Sex"]);
    }
}
