//! FILENAME: arrangement-engine/src/view.rs
//! Grid View - The positioned output of an arrangement.
//!
//! A Grid is a sequence of facets; each facet is a rows x columns matrix of
//! cell references plus the axis entries that label its rows and columns.
//! It carries no styling and no formatted text: renderers turn it into
//! output together with a theme and metadata.

use crate::definition::ArrangementSpec;
use model::{Assignment, Cell, CellValue, Coordinate, SummarizerId};
use smallvec::SmallVec;
use std::sync::Arc;

// ============================================================================
// AXIS ENTRIES
// ============================================================================

/// Whether an axis entry holds ordinary levels or an aggregate-over marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Data,
    Margin,
}

/// One row, column or facet of a grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisEntry {
    /// One coordinate per axis dimension, outermost first.
    pub coordinates: SmallVec<[Coordinate; 4]>,

    /// The summarizer pseudo-level, set on entries of the summarizer axis.
    pub summarizer: Option<SummarizerId>,

    pub kind: EntryKind,

    /// Header text requested by the margin that produced this entry.
    pub margin_label: Option<String>,
}

impl AxisEntry {
    pub fn data(coordinates: SmallVec<[Coordinate; 4]>) -> Self {
        AxisEntry {
            coordinates,
            summarizer: None,
            kind: EntryKind::Data,
            margin_label: None,
        }
    }

    pub fn is_margin(&self) -> bool {
        self.kind == EntryKind::Margin
    }

    /// The entry's coordinates as a partial assignment over `dimensions`.
    pub fn assignment(&self, dimensions: &[String]) -> Assignment {
        let mut assignment = Assignment::new();
        for (dim, coord) in dimensions.iter().zip(self.coordinates.iter()) {
            assignment.set(dim.clone(), coord.clone());
        }
        assignment
    }

    /// Dimensions this entry aggregates over.
    pub fn aggregated<'a>(&'a self, dimensions: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        dimensions
            .iter()
            .zip(self.coordinates.iter())
            .filter(|(_, c)| c.is_all())
            .map(|(d, _)| d.as_str())
    }

    /// Coordinate labels followed by the summarizer when `with_summarizer`.
    /// `All` prints as `*`.
    pub fn labels(&self, with_summarizer: bool) -> Vec<String> {
        let mut labels: Vec<String> = self.coordinates.iter().map(|c| c.to_string()).collect();
        if with_summarizer {
            if let Some(s) = &self.summarizer {
                labels.push(s.clone());
            }
        }
        labels
    }
}

/// The ordered entries of one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    /// Dimensions on this axis, outermost first.
    pub dimensions: Vec<String>,
    pub entries: Vec<AxisEntry>,
    /// Whether the summarizer pseudo-level gets its own header level.
    pub shows_summarizer: bool,
}

impl Axis {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of header levels (dimensions plus the summarizer level).
    pub fn depth(&self) -> usize {
        self.dimensions.len() + usize::from(self.shows_summarizer)
    }

    pub fn entry(&self, index: usize) -> Option<&AxisEntry> {
        self.entries.get(index)
    }
}

// ============================================================================
// FACET GRID
// ============================================================================

/// One independent sub-table.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetGrid {
    /// Facet coordinates (empty when the arrangement has no facet dimensions).
    pub key: AxisEntry,
    pub rows: Axis,
    pub columns: Axis,
    /// Row-major matrix; `None` marks a position without any cell.
    pub cells: Vec<Vec<Option<Arc<Cell>>>>,
}

impl FacetGrid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Arc<Cell>> {
        self.cells.get(row).and_then(|r| r.get(column)).and_then(Option::as_ref)
    }

    pub fn row_labels(&self) -> Vec<Vec<String>> {
        let shows = self.rows.shows_summarizer;
        self.rows.entries.iter().map(|e| e.labels(shows)).collect()
    }

    pub fn column_labels(&self) -> Vec<Vec<String>> {
        let shows = self.columns.shows_summarizer;
        self.columns.entries.iter().map(|e| e.labels(shows)).collect()
    }

    /// True when the facet is an aggregate over one or more facet dimensions.
    pub fn is_margin(&self) -> bool {
        self.key.is_margin()
    }

    /// Iterates over every occupied position as `(row, column, cell)`.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, &Arc<Cell>)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.as_ref().map(|cell| (r, c, cell)))
        })
    }
}

// ============================================================================
// GRID
// ============================================================================

/// A cell reference together with its position in the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<'a> {
    pub facet: usize,
    pub row: usize,
    pub column: usize,
    pub cell: &'a Arc<Cell>,
}

/// The complete positioned output of an arrangement.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub spec: ArrangementSpec,
    pub facet_dimensions: Vec<String>,
    pub facets: Vec<FacetGrid>,
}

impl Grid {
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn facet(&self, index: usize) -> Option<&FacetGrid> {
        self.facets.get(index)
    }

    /// Every occupied position, facet by facet in row-major order.
    pub fn positions(&self) -> Vec<Placement<'_>> {
        self.facets
            .iter()
            .enumerate()
            .flat_map(|(f, facet)| {
                facet.occupied().map(move |(row, column, cell)| Placement {
                    facet: f,
                    row,
                    column,
                    cell,
                })
            })
            .collect()
    }

    /// Positions holding margin cells.
    pub fn margin_cells(&self) -> Vec<Placement<'_>> {
        self.positions().into_iter().filter(|p| p.cell.is_margin).collect()
    }

    /// Non-margin cells in grid order.
    pub fn data_cells(&self) -> Vec<&Arc<Cell>> {
        self.positions()
            .into_iter()
            .filter(|p| !p.cell.is_margin)
            .map(|p| p.cell)
            .collect()
    }

    /// Values of the non-margin cells in grid order.
    pub fn data_values(&self) -> Vec<&CellValue> {
        self.data_cells().into_iter().map(|c| &c.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn entry(labels: &[&str]) -> AxisEntry {
        AxisEntry::data(labels.iter().map(|l| Coordinate::level(*l)).collect())
    }

    #[test]
    fn test_entry_labels() {
        let mut e = entry(&["A"]);
        e.summarizer = Some("n".to_string());
        assert_eq!(e.labels(false), vec!["A"]);
        assert_eq!(e.labels(true), vec!["A", "n"]);

        let margin = AxisEntry {
            coordinates: smallvec![Coordinate::All, Coordinate::level("C")],
            summarizer: None,
            kind: EntryKind::Margin,
            margin_label: None,
        };
        let dims = vec!["V1".to_string(), "V2".to_string()];
        assert_eq!(margin.labels(false), vec!["*", "C"]);
        assert_eq!(margin.aggregated(&dims).collect::<Vec<_>>(), vec!["V1"]);
        assert_eq!(
            margin.assignment(&dims),
            Assignment::new().with_all("V1").with("V2", "C")
        );
    }

    #[test]
    fn test_grid_positions() {
        let cell = |v: f64, margin: bool| {
            let a = Assignment::new().with("V1", "A");
            Some(Arc::new(if margin { Cell::margin(a, "n", v) } else { Cell::new(a, "n", v) }))
        };
        let axis = |entries: Vec<AxisEntry>| Axis {
            dimensions: vec!["V1".to_string()],
            entries,
            shows_summarizer: false,
        };
        let facet = FacetGrid {
            key: AxisEntry::data(SmallVec::new()),
            rows: axis(vec![entry(&["A"]), entry(&["B"])]),
            columns: axis(vec![entry(&["C"]), entry(&["D"])]),
            cells: vec![vec![cell(1.0, false), None], vec![cell(2.0, false), cell(3.0, true)]],
        };
        let grid = Grid {
            spec: ArrangementSpec::default(),
            facet_dimensions: Vec::new(),
            facets: vec![facet],
        };

        assert_eq!(grid.positions().len(), 3);
        assert_eq!(grid.data_values(), vec![&CellValue::Number(1.0), &CellValue::Number(2.0)]);
        let margins = grid.margin_cells();
        assert_eq!((margins[0].row, margins[0].column), (1, 1));
        assert!(grid.facets[0].cell(0, 1).is_none());
    }
}
