//! FILENAME: tabula/src/document.rs
//! PURPOSE: JSON table documents.
//! CONTEXT: A TableDocument is the serializable form of a Table: declared
//! dimensions, the cells, the arrangement, the theme and the metadata.
//! Aggregator functions cannot be serialized; documents only carry the
//! rules that name them, and callers supply the functions through
//! `TableDocument::into_table_with`.

use crate::error::TableError;
use crate::table::Table;
use arrangement_engine::{AggregatorRegistry, ArrangementSpec};
use model::{Assignment, Cell, CellStore, CellValue, Coordinate, DimensionDef, DimensionIndex, Metadata, Theme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One cell as it appears in a document. A `null` coordinate marks a
/// dimension the cell aggregates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub coordinates: BTreeMap<String, Option<String>>,
    pub summarizer: String,
    #[serde(default)]
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub margin: bool,
}

impl CellRecord {
    pub fn into_cell(self) -> Cell {
        let assignment = self
            .coordinates
            .into_iter()
            .fold(Assignment::new(), |assignment, (dim, label)| match label {
                Some(label) => assignment.with(dim, label),
                None => assignment.with_all(dim),
            });
        Cell {
            assignment,
            summarizer: self.summarizer,
            value: self.value,
            is_margin: self.margin,
        }
    }
}

impl From<&Cell> for CellRecord {
    fn from(cell: &Cell) -> Self {
        CellRecord {
            coordinates: cell
                .assignment
                .iter()
                .map(|(dim, coordinate)| (dim.to_string(), coordinate.label().map(str::to_string)))
                .collect(),
            summarizer: cell.summarizer.clone(),
            value: cell.value.clone(),
            margin: cell.is_margin,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDocument {
    pub dimensions: Vec<DimensionDef>,
    pub cells: Vec<CellRecord>,
    pub arrangement: ArrangementSpec,
    pub theme: Theme,
    pub metadata: Metadata,
}

impl TableDocument {
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Declares the dimensions and inserts the cells, in document order.
    pub fn to_store(&self) -> Result<CellStore, TableError> {
        let mut index = DimensionIndex::new();
        for dimension in &self.dimensions {
            index.declare(dimension.name.clone(), dimension.levels.iter().cloned())?;
        }
        let cells = self.cells.iter().cloned().map(CellRecord::into_cell);
        Ok(CellStore::from_cells(Arc::new(index), cells)?)
    }

    pub fn into_table(self) -> Result<Table, TableError> {
        self.into_table_with(AggregatorRegistry::new())
    }

    pub fn into_table_with(self, aggregators: AggregatorRegistry) -> Result<Table, TableError> {
        let store = self.to_store()?;
        Table::new_with_aggregators(store, self.arrangement, self.theme, self.metadata, aggregators)
    }
}

impl Table {
    /// The document that rebuilds this table.
    pub fn to_document(&self) -> TableDocument {
        let store = self.store();
        TableDocument {
            dimensions: store
                .index()
                .iter()
                .map(|d| DimensionDef {
                    name: d.name().to_string(),
                    levels: d.levels().to_vec(),
                })
                .collect(),
            cells: store.iter().map(|cell| CellRecord::from(cell.as_ref())).collect(),
            arrangement: self.spec().clone(),
            theme: self.theme().clone(),
            metadata: self.metadata().clone(),
        }
    }
}

/// Coordinates of a record, for callers building documents by hand.
pub fn coordinates<I, K>(entries: I) -> BTreeMap<String, Option<String>>
where
    I: IntoIterator<Item = (K, Coordinate)>,
    K: Into<String>,
{
    entries
        .into_iter()
        .map(|(dim, coordinate)| (dim.into(), coordinate.label().map(str::to_string)))
        .collect()
}
