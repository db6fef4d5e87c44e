//! FILENAME: model/src/assignment.rs
//! PURPOSE: Dimension assignments: which level of each dimension a cell describes.
//! CONTEXT: Full assignments tag cells; partial assignments act as filters
//! (`CellStore::cells_matching`). The `All` coordinate is the aggregate-over
//! marker carried by margin cells.

use crate::dimension::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The position of an assignment along one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Coordinate {
    /// A concrete level.
    Level(Label),
    /// Aggregated over every level of the dimension.
    All,
}

impl Coordinate {
    pub fn level(label: impl Into<Label>) -> Self {
        Coordinate::Level(label.into())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Coordinate::All)
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Coordinate::Level(l) => Some(l),
            Coordinate::All => None,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Level(l) => f.write_str(l),
            Coordinate::All => f.write_str("*"),
        }
    }
}

/// Mapping dimension name -> coordinate. Ordered by dimension name so that
/// equality, hashing and iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    entries: BTreeMap<String, Coordinate>,
}

impl Assignment {
    pub fn new() -> Self {
        Assignment::default()
    }

    /// Builder: assigns a concrete level.
    pub fn with(mut self, dimension: impl Into<String>, label: impl Into<Label>) -> Self {
        self.entries.insert(dimension.into(), Coordinate::Level(label.into()));
        self
    }

    /// Builder: marks a dimension as aggregated over.
    pub fn with_all(mut self, dimension: impl Into<String>) -> Self {
        self.entries.insert(dimension.into(), Coordinate::All);
        self
    }

    pub fn set(&mut self, dimension: impl Into<String>, coordinate: Coordinate) {
        self.entries.insert(dimension.into(), coordinate);
    }

    pub fn get(&self, dimension: &str) -> Option<&Coordinate> {
        self.entries.get(dimension)
    }

    /// The concrete label for `dimension`, if assigned to a level.
    pub fn label(&self, dimension: &str) -> Option<&str> {
        self.entries.get(dimension).and_then(Coordinate::label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Coordinate)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// True when no coordinate is the aggregate-over marker.
    pub fn is_concrete(&self) -> bool {
        self.entries.values().all(|c| !c.is_all())
    }

    /// Dimensions carrying the aggregate-over marker, in name order.
    pub fn aggregated_dimensions(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(|(_, c)| c.is_all())
            .map(|(k, _)| k.as_str())
    }

    /// True if every entry of `partial` is present here with the same coordinate.
    pub fn matches(&self, partial: &Assignment) -> bool {
        partial
            .entries
            .iter()
            .all(|(dim, coord)| self.entries.get(dim) == Some(coord))
    }

    /// A copy holding only the given dimensions.
    pub fn restricted_to<'a, I>(&self, dimensions: I) -> Assignment
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut restricted = Assignment::new();
        for dim in dimensions {
            if let Some(coord) = self.entries.get(dim) {
                restricted.entries.insert(dim.to_string(), coord.clone());
            }
        }
        restricted
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (dim, coord)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", dim, coord)?;
        }
        f.write_str("}")
    }
}

impl<K, V> FromIterator<(K, V)> for Assignment
where
    K: Into<String>,
    V: Into<Label>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let entries = iter
            .into_iter()
            .map(|(k, v)| (k.into(), Coordinate::Level(v.into())))
            .collect();
        Assignment { entries }
    }
}
