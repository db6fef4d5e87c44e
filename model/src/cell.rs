//! FILENAME: model/src/cell.rs
//! PURPOSE: Defines the summarized cell and the store that owns them.
//! CONTEXT: A Cell is one summarized value tagged with its dimension
//! assignment and the summarizer that produced it. The CellStore enforces
//! the content-level invariants at insertion time; once handed to a table it
//! is only ever read. Cells are kept behind `Arc` so grids reference them
//! instead of copying values.

use crate::assignment::{Assignment, Coordinate};
use crate::dimension::DimensionIndex;
use crate::error::ModelError;
use crate::value::CellValue;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::slice;
use std::sync::Arc;

/// Identifier of the summary function that produced a cell (e.g. "count").
pub type SummarizerId = String;

/// Position of a cell inside its store (insertion order).
pub type CellId = usize;

// ============================================================================
// CELL
// ============================================================================

/// The atomic unit of a summarized table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub assignment: Assignment,
    pub summarizer: SummarizerId,
    pub value: CellValue,
    /// Margin cells aggregate over every level of their `All` dimensions.
    #[serde(default)]
    pub is_margin: bool,
}

impl Cell {
    /// Creates a plain (non-margin) cell.
    pub fn new(
        assignment: Assignment,
        summarizer: impl Into<SummarizerId>,
        value: impl Into<CellValue>,
    ) -> Self {
        Cell {
            assignment,
            summarizer: summarizer.into(),
            value: value.into(),
            is_margin: false,
        }
    }

    /// Creates a margin cell. The assignment should mark the aggregated
    /// dimensions with `Coordinate::All`.
    pub fn margin(
        assignment: Assignment,
        summarizer: impl Into<SummarizerId>,
        value: impl Into<CellValue>,
    ) -> Self {
        Cell {
            assignment,
            summarizer: summarizer.into(),
            value: value.into(),
            is_margin: true,
        }
    }
}

// ============================================================================
// CELL STORE
// ============================================================================

/// An unordered collection of cells sharing one dimension index.
#[derive(Debug, Clone)]
pub struct CellStore {
    index: Arc<DimensionIndex>,
    cells: Vec<Arc<Cell>>,
    /// Reverse lookup: assignment -> summarizer -> cell id.
    by_assignment: FxHashMap<Assignment, FxHashMap<SummarizerId, CellId>>,
    /// Summarizers in order of first appearance.
    summarizers: Vec<SummarizerId>,
}

impl CellStore {
    pub fn new(index: Arc<DimensionIndex>) -> Self {
        CellStore {
            index,
            cells: Vec::new(),
            by_assignment: FxHashMap::default(),
            summarizers: Vec::new(),
        }
    }

    /// Builds a store from an iterator of cells, failing on the first invalid one.
    pub fn from_cells<I>(index: Arc<DimensionIndex>, cells: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut store = CellStore::new(index);
        for cell in cells {
            store.insert(cell)?;
        }
        Ok(store)
    }

    /// Validates and inserts a cell.
    pub fn insert(&mut self, cell: Cell) -> Result<CellId, ModelError> {
        self.validate(&cell)?;

        let id = self.cells.len();
        self.by_assignment
            .entry(cell.assignment.clone())
            .or_default()
            .insert(cell.summarizer.clone(), id);
        if !self.summarizers.contains(&cell.summarizer) {
            self.summarizers.push(cell.summarizer.clone());
        }
        self.cells.push(Arc::new(cell));
        Ok(id)
    }

    fn validate(&self, cell: &Cell) -> Result<(), ModelError> {
        let assignment = &cell.assignment;

        // Exact coverage of the declared dimensions
        if let Some(extra) = assignment.dimensions().find(|d| !self.index.contains(d)) {
            return Err(ModelError::DimensionMismatch(format!(
                "'{}' is not a declared dimension",
                extra
            )));
        }
        if let Some(missing) = self.index.names().find(|d| assignment.get(d).is_none()) {
            return Err(ModelError::DimensionMismatch(format!(
                "no level assigned for dimension '{}'",
                missing
            )));
        }

        for (dim, coord) in assignment.iter() {
            if let Coordinate::Level(label) = coord {
                self.index.order(dim, label)?;
            }
        }

        if cell.is_margin && assignment.is_concrete() {
            return Err(ModelError::DimensionMismatch(format!(
                "margin cell {} does not aggregate over any dimension",
                assignment
            )));
        }
        if !cell.is_margin && !assignment.is_concrete() {
            return Err(ModelError::DimensionMismatch(format!(
                "plain cell {} uses the aggregate marker",
                assignment
            )));
        }

        if self.lookup(assignment, &cell.summarizer).is_some() {
            return Err(ModelError::DuplicateCell {
                assignment: assignment.to_string(),
                summarizer: cell.summarizer.clone(),
            });
        }
        Ok(())
    }

    pub fn index(&self) -> &Arc<DimensionIndex> {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: CellId) -> Option<&Arc<Cell>> {
        self.cells.get(id)
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<Cell>> {
        self.cells.iter()
    }

    /// Finds the cell for an exact (assignment, summarizer) pair.
    pub fn lookup(&self, assignment: &Assignment, summarizer: &str) -> Option<&Arc<Cell>> {
        self.by_assignment
            .get(assignment)
            .and_then(|by_summarizer| by_summarizer.get(summarizer))
            .map(|&id| &self.cells[id])
    }

    /// Summarizer ids in order of first appearance.
    pub fn summarizers(&self) -> &[SummarizerId] {
        &self.summarizers
    }

    /// Lazily yields every cell whose assignment agrees with `partial`.
    /// The iterator is cheap to clone, so callers can restart it.
    pub fn cells_matching<'a>(&'a self, partial: &'a Assignment) -> CellsMatching<'a> {
        CellsMatching {
            cells: self.cells.iter(),
            partial,
        }
    }
}

/// Iterator returned by [`CellStore::cells_matching`].
#[derive(Debug, Clone)]
pub struct CellsMatching<'a> {
    cells: slice::Iter<'a, Arc<Cell>>,
    partial: &'a Assignment,
}

impl<'a> Iterator for CellsMatching<'a> {
    type Item = &'a Arc<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        let partial = self.partial;
        self.cells.by_ref().find(|c| c.assignment.matches(partial))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.cells.len()))
    }
}
