//! FILENAME: tabula/tests/common/mod.rs
//! Fixtures shared by the Tabula integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use tabula::{ArrangementSpec, Assignment, Cell, CellStore, CellValue, DimensionIndex, Grid, Metadata, Table, Theme};

/// The 2x2 example: V1 in {A, B}, V2 in {C, D}, counts 1..4.
pub fn two_by_two() -> CellStore {
    let index = DimensionIndex::new()
        .with_dimension("V1", ["A", "B"])
        .unwrap()
        .with_dimension("V2", ["C", "D"])
        .unwrap();
    let cells = [("A", "C", 1.0), ("A", "D", 2.0), ("B", "C", 3.0), ("B", "D", 4.0)]
        .into_iter()
        .map(|(v1, v2, n)| Cell::new(Assignment::new().with("V1", v1).with("V2", v2), "n", n));
    CellStore::from_cells(Arc::new(index), cells).unwrap()
}

/// Titanic passenger counts by Class, Sex and Survived, with a second
/// summarizer `pct` holding the survival share within each class and sex.
pub fn titanic() -> CellStore {
    let index = DimensionIndex::new()
        .with_dimension("Class", ["1st", "2nd", "3rd", "Crew"])
        .unwrap()
        .with_dimension("Sex", ["Male", "Female"])
        .unwrap()
        .with_dimension("Survived", ["No", "Yes"])
        .unwrap();

    let counts = [
        ("1st", "Male", 118.0, 62.0),
        ("1st", "Female", 4.0, 141.0),
        ("2nd", "Male", 154.0, 25.0),
        ("2nd", "Female", 13.0, 93.0),
        ("3rd", "Male", 422.0, 88.0),
        ("3rd", "Female", 106.0, 90.0),
        ("Crew", "Male", 670.0, 192.0),
        ("Crew", "Female", 3.0, 20.0),
    ];

    let mut store = CellStore::new(Arc::new(index));
    for (class, sex, died, lived) in counts {
        let total = died + lived;
        for (survived, n) in [("No", died), ("Yes", lived)] {
            let assignment = Assignment::new()
                .with("Class", class)
                .with("Sex", sex)
                .with("Survived", survived);
            store.insert(Cell::new(assignment.clone(), "n", n)).unwrap();
            store.insert(Cell::new(assignment, "pct", n / total)).unwrap();
        }
    }
    store
}

pub fn two_by_two_spec() -> ArrangementSpec {
    ArrangementSpec::new().with_rows(["V1"]).with_columns(["V2"])
}

pub fn table(store: CellStore, spec: ArrangementSpec) -> Table {
    Table::new(store, spec, Theme::new(), Metadata::new()).unwrap()
}

/// Numeric value at (facet, row, column), if any.
pub fn number(grid: &Grid, facet: usize, row: usize, column: usize) -> Option<f64> {
    grid.facet(facet)?
        .cell(row, column)
        .and_then(|c| c.value.as_number())
}

/// Every non-margin value, sorted, for multiset comparisons.
pub fn sorted_data_values(grid: &Grid) -> Vec<f64> {
    let mut values: Vec<f64> = grid
        .data_values()
        .into_iter()
        .filter_map(CellValue::as_number)
        .collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

pub fn flat_labels(labels: Vec<Vec<String>>) -> Vec<String> {
    labels.into_iter().map(|l| l.join("/")).collect()
}
