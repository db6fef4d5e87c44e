//! FILENAME: arrangement-engine/src/engine.rs
//! Arrangement Engine - Positions the cells of a store into a Grid.
//!
//! This module takes an ArrangementSpec (configuration) and a CellStore
//! (content) and produces a Grid (facets of positioned cell references).
//!
//! Algorithm:
//! 1. Validate that the axes partition the declared dimensions
//! 2. Resolve the effective level order of every dimension
//! 3. Build the facet, row and column axes: Cartesian products of levels
//!    plus the aggregate entries requested by margins, in a stable order
//! 4. Per facet: place every non-margin cell at its unique position
//! 5. Fill margin positions from store-supplied margin cells or by applying
//!    the margin's aggregation rule
//! 6. Drop empty data rows, columns and facets if the layout asks for it

use crate::aggregate::AggregatorRegistry;
use crate::definition::{
    AggregationRule, ArrangementSpec, LevelOrder, MarginPlacement, MarginSpec, SummarizerAxis,
};
use crate::error::{ArrangeError, Infeasibility};
use crate::view::{Axis, AxisEntry, EntryKind, FacetGrid, Grid};
use model::{Assignment, Cell, CellStore, CellValue, Coordinate, DimensionIndex, Label, SummarizerId};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

type Coordinates = SmallVec<[Coordinate; 4]>;

/// Lookup from (coordinates, summarizer) to the index of a data entry.
type EntryLookup = FxHashMap<(Coordinates, Option<SummarizerId>), usize>;

/// Values a margin aggregates, keyed by the concrete coordinates left after
/// removing the margin's dimensions, and by summarizer.
type MarginInputs<'a> = FxHashMap<(Assignment, SummarizerId), Vec<&'a CellValue>>;

// ============================================================================
// VALIDATION
// ============================================================================

/// Checks that `spec` can be realized against the store's dimension index
/// and that every aggregation rule it names is available.
pub fn validate(
    store: &CellStore,
    spec: &ArrangementSpec,
    registry: &AggregatorRegistry,
) -> Result<(), ArrangeError> {
    let index = store.index();

    let mut placed: FxHashSet<&str> = FxHashSet::default();
    for dim in spec.axis_dimensions() {
        if !index.contains(dim) {
            return Err(Infeasibility::UnknownDimension(dim.to_string()).into());
        }
        if !placed.insert(dim) {
            return Err(Infeasibility::RepeatedDimension(dim.to_string()).into());
        }
    }
    if let Some(unplaced) = index.names().find(|d| !placed.contains(d)) {
        return Err(Infeasibility::UnplacedDimension(unplaced.to_string()).into());
    }

    let mut margin_sets: FxHashSet<&BTreeSet<String>> = FxHashSet::default();
    for (i, margin) in spec.margins.iter().enumerate() {
        if margin.dimensions.is_empty() {
            return Err(Infeasibility::EmptyMargin(i).into());
        }
        if let Some(unknown) = margin.dimensions.iter().find(|d| !index.contains(d)) {
            return Err(Infeasibility::UnknownDimension(unknown.clone()).into());
        }
        if !margin_sets.insert(&margin.dimensions) {
            return Err(Infeasibility::DuplicateMargin(describe_set(&margin.dimensions)).into());
        }
        match &margin.rule {
            AggregationRule::Summarizer => {
                for summarizer in store.summarizers() {
                    registry.check(&margin.rule, summarizer)?;
                }
            }
            rule => registry.check(rule, "")?,
        }
    }

    for dim in spec.level_orders.keys() {
        effective_levels(index, spec, dim)?;
    }
    Ok(())
}

/// The level sequence of `dimension` under the arrangement's order override.
pub fn effective_levels(
    index: &DimensionIndex,
    spec: &ArrangementSpec,
    dimension: &str,
) -> Result<Vec<Label>, ArrangeError> {
    let canonical = index
        .get(dimension)
        .ok_or_else(|| Infeasibility::UnknownDimension(dimension.to_string()))?
        .levels();

    let levels = match spec.level_order(dimension) {
        LevelOrder::Canonical => canonical.to_vec(),
        LevelOrder::Reversed => canonical.iter().rev().cloned().collect(),
        LevelOrder::Custom(first) => {
            let mut listed: FxHashSet<&str> = FxHashSet::default();
            for label in first {
                index.order(dimension, label)?;
                if !listed.insert(label.as_str()) {
                    return Err(Infeasibility::RepeatedOrderLabel {
                        dimension: dimension.to_string(),
                        label: label.clone(),
                    }
                    .into());
                }
            }
            first
                .iter()
                .chain(canonical.iter().filter(|l| !listed.contains(l.as_str())))
                .cloned()
                .collect()
        }
    };
    Ok(levels)
}

fn describe_set(dimensions: &BTreeSet<String>) -> String {
    let names: Vec<&str> = dimensions.iter().map(String::as_str).collect();
    format!("{{{}}}", names.join(", "))
}

// ============================================================================
// ARRANGEMENT CALCULATOR
// ============================================================================

/// An axis entry before the summarizer pseudo-level is expanded.
#[derive(Debug, Clone)]
struct PlannedEntry {
    coordinates: Coordinates,
    kind: EntryKind,
    placement: MarginPlacement,
    label: Option<String>,
}

/// The calculation engine for arrangements.
pub struct ArrangementCalculator<'a> {
    store: &'a CellStore,
    spec: &'a ArrangementSpec,
    registry: &'a AggregatorRegistry,

    /// Effective level order per dimension.
    levels: FxHashMap<String, Vec<Label>>,

    /// Effective rank of each label per dimension.
    ranks: FxHashMap<String, FxHashMap<Label, usize>>,

    /// Summarizer pseudo-levels; a single `None` when the store is empty.
    summarizers: Vec<Option<SummarizerId>>,

    /// Margins keyed by their exact dimension set.
    margins: FxHashMap<&'a BTreeSet<String>, &'a MarginSpec>,

    /// Non-margin values bucketed per margin, filled once before placement.
    margin_inputs: FxHashMap<&'a BTreeSet<String>, MarginInputs<'a>>,

    row_lookup: EntryLookup,
    column_lookup: EntryLookup,
}

impl<'a> ArrangementCalculator<'a> {
    pub fn new(
        store: &'a CellStore,
        spec: &'a ArrangementSpec,
        registry: &'a AggregatorRegistry,
    ) -> Self {
        ArrangementCalculator {
            store,
            spec,
            registry,
            levels: FxHashMap::default(),
            ranks: FxHashMap::default(),
            summarizers: Vec::new(),
            margins: spec.margins.iter().map(|m| (&m.dimensions, m)).collect(),
            margin_inputs: FxHashMap::default(),
            row_lookup: EntryLookup::default(),
            column_lookup: EntryLookup::default(),
        }
    }

    /// Executes the full calculation and returns the positioned grid.
    pub fn calculate(&mut self) -> Result<Grid, ArrangeError> {
        // Step 1: Validate the partition and the margins
        validate(self.store, self.spec, self.registry)?;

        // Step 2: Resolve level and summarizer orders
        self.resolve_level_orders()?;
        self.resolve_summarizers();
        self.bucket_margin_inputs();

        // Step 3: Build the axes
        let on_rows = self.spec.summarizer_axis == SummarizerAxis::Rows;
        let facet_axis = self.build_axis(&self.spec.facets, false);
        let row_axis = self.build_axis(&self.spec.rows, on_rows);
        let column_axis = self.build_axis(&self.spec.columns, !on_rows);
        self.row_lookup = entry_lookup(&row_axis);
        self.column_lookup = entry_lookup(&column_axis);

        // Steps 4-5: Place cells facet by facet
        let facets = self.build_facets(&facet_axis, &row_axis, &column_axis)?;

        // Step 6: Apply layout options
        let facets: Vec<FacetGrid> = facets
            .into_iter()
            .filter(|f| !self.spec.layout.drop_empty_facets || f.is_margin() || self.facet_has_data(f))
            .map(|f| self.drop_empty_entries(f))
            .collect();

        log::debug!(
            "arranged {} cells into {} facet(s) of {} x {} entries",
            self.store.len(),
            facets.len(),
            row_axis.len(),
            column_axis.len()
        );

        Ok(Grid {
            spec: self.spec.clone(),
            facet_dimensions: self.spec.facets.clone(),
            facets,
        })
    }

    fn resolve_level_orders(&mut self) -> Result<(), ArrangeError> {
        let index = self.store.index();
        for name in index.names() {
            let levels = effective_levels(index, self.spec, name)?;
            let ranks = levels
                .iter()
                .enumerate()
                .map(|(rank, label)| (label.clone(), rank))
                .collect();
            self.levels.insert(name.to_string(), levels);
            self.ranks.insert(name.to_string(), ranks);
        }
        Ok(())
    }

    /// Listed summarizers first, then the rest in store order.
    fn resolve_summarizers(&mut self) {
        let present = self.store.summarizers();
        let mut ordered: Vec<SummarizerId> = Vec::with_capacity(present.len());
        for id in self.spec.summarizer_order.iter().chain(present.iter()) {
            if present.contains(id) && !ordered.contains(id) {
                ordered.push(id.clone());
            }
        }
        self.summarizers = if ordered.is_empty() {
            vec![None]
        } else {
            ordered.into_iter().map(Some).collect()
        };
    }

    // ========================================================================
    // AXES
    // ========================================================================

    fn build_axis(&self, dimensions: &[String], with_summarizer: bool) -> Axis {
        let mut planned = self.data_entries(dimensions);
        planned.extend(self.margin_entries(dimensions));
        planned.sort_by_cached_key(|entry| self.sort_key(dimensions, entry));

        let unlabeled = [None];
        let summarizers: &[Option<SummarizerId>] = if with_summarizer {
            &self.summarizers
        } else {
            &unlabeled
        };
        let entries = planned
            .into_iter()
            .flat_map(|p| {
                summarizers.iter().map(move |s| AxisEntry {
                    coordinates: p.coordinates.clone(),
                    summarizer: s.clone(),
                    kind: p.kind,
                    margin_label: p.label.clone(),
                })
            })
            .collect();

        Axis {
            dimensions: dimensions.to_vec(),
            entries,
            shows_summarizer: with_summarizer && self.summarizers.len() > 1,
        }
    }

    fn data_entries(&self, dimensions: &[String]) -> Vec<PlannedEntry> {
        let columns: Vec<Vec<Coordinate>> = dimensions.iter().map(|d| self.level_coordinates(d)).collect();
        cartesian(&columns)
            .into_iter()
            .map(|coordinates| PlannedEntry {
                coordinates,
                kind: EntryKind::Data,
                placement: MarginPlacement::Trailing,
                label: None,
            })
            .collect()
    }

    /// Aggregate entries, deduplicated; the first margin producing an entry
    /// decides its placement and label.
    fn margin_entries(&self, dimensions: &[String]) -> Vec<PlannedEntry> {
        let mut seen: FxHashSet<Coordinates> = FxHashSet::default();
        let mut planned = Vec::new();

        for margin in &self.spec.margins {
            if !dimensions.iter().any(|d| margin.dimensions.contains(d)) {
                continue;
            }
            let columns: Vec<Vec<Coordinate>> = dimensions
                .iter()
                .map(|d| {
                    if margin.dimensions.contains(d) {
                        vec![Coordinate::All]
                    } else {
                        self.level_coordinates(d)
                    }
                })
                .collect();

            for coordinates in cartesian(&columns) {
                if seen.insert(coordinates.clone()) {
                    planned.push(PlannedEntry {
                        coordinates,
                        kind: EntryKind::Margin,
                        placement: margin.placement,
                        label: margin.label.clone(),
                    });
                }
            }
        }
        planned
    }

    fn level_coordinates(&self, dimension: &str) -> Vec<Coordinate> {
        self.levels
            .get(dimension)
            .map(|levels| levels.iter().map(|l| Coordinate::Level(l.clone())).collect())
            .unwrap_or_default()
    }

    /// Lexicographic key: levels by effective rank, `All` before every level
    /// for leading margins and after every level for trailing ones.
    fn sort_key(&self, dimensions: &[String], entry: &PlannedEntry) -> SmallVec<[(u8, usize); 4]> {
        dimensions
            .iter()
            .zip(entry.coordinates.iter())
            .map(|(dim, coord)| match coord {
                Coordinate::Level(label) => {
                    let rank = self
                        .ranks
                        .get(dim)
                        .and_then(|r| r.get(label))
                        .copied()
                        .unwrap_or(usize::MAX);
                    (1, rank)
                }
                Coordinate::All => match entry.placement {
                    MarginPlacement::Leading => (0, 0),
                    MarginPlacement::Trailing => (2, 0),
                },
            })
            .collect()
    }

    // ========================================================================
    // FACETS
    // ========================================================================

    #[cfg(feature = "parallel")]
    fn build_facets(
        &self,
        facet_axis: &Axis,
        rows: &Axis,
        columns: &Axis,
    ) -> Result<Vec<FacetGrid>, ArrangeError> {
        facet_axis
            .entries
            .par_iter()
            .enumerate()
            .map(|(i, key)| self.build_facet(i, key, rows, columns))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn build_facets(
        &self,
        facet_axis: &Axis,
        rows: &Axis,
        columns: &Axis,
    ) -> Result<Vec<FacetGrid>, ArrangeError> {
        facet_axis
            .entries
            .iter()
            .enumerate()
            .map(|(i, key)| self.build_facet(i, key, rows, columns))
            .collect()
    }

    fn build_facet(
        &self,
        facet: usize,
        key: &AxisEntry,
        rows: &Axis,
        columns: &Axis,
    ) -> Result<FacetGrid, ArrangeError> {
        let mut cells: Vec<Vec<Option<Arc<Cell>>>> = vec![vec![None; columns.len()]; rows.len()];

        if !key.is_margin() {
            self.place_data_cells(facet, key, rows, columns, &mut cells)?;
        }
        self.place_margin_cells(key, rows, columns, &mut cells)?;

        Ok(FacetGrid {
            key: key.clone(),
            rows: rows.clone(),
            columns: columns.clone(),
            cells,
        })
    }

    fn place_data_cells(
        &self,
        facet: usize,
        key: &AxisEntry,
        rows: &Axis,
        columns: &Axis,
        cells: &mut [Vec<Option<Arc<Cell>>>],
    ) -> Result<(), ArrangeError> {
        let on_rows = self.spec.summarizer_axis == SummarizerAxis::Rows;
        let filter = key.assignment(&self.spec.facets);

        for cell in self.store.cells_matching(&filter).filter(|c| !c.is_margin) {
            let row_key = (
                project(&cell.assignment, &rows.dimensions),
                on_rows.then(|| cell.summarizer.clone()),
            );
            let column_key = (
                project(&cell.assignment, &columns.dimensions),
                (!on_rows).then(|| cell.summarizer.clone()),
            );
            // Axes hold every level, so a validated store always resolves
            let (Some(&row), Some(&column)) =
                (self.row_lookup.get(&row_key), self.column_lookup.get(&column_key))
            else {
                continue;
            };

            let slot = &mut cells[row][column];
            if slot.is_some() {
                return Err(ArrangeError::AmbiguousPlacement { facet, row, column });
            }
            *slot = Some(Arc::clone(cell));
        }
        Ok(())
    }

    /// Groups every non-margin value under each margin's key in one pass
    /// over the store, in store order.
    fn bucket_margin_inputs(&mut self) {
        let (store, spec) = (self.store, self.spec);
        let index = store.index();
        for margin in &spec.margins {
            let kept: Vec<&str> = index
                .names()
                .filter(|d| !margin.dimensions.contains(*d))
                .collect();
            let mut buckets = MarginInputs::default();
            for cell in store.iter().filter(|c| !c.is_margin) {
                let key = (
                    cell.assignment.restricted_to(kept.iter().copied()),
                    cell.summarizer.clone(),
                );
                buckets.entry(key).or_default().push(&cell.value);
            }
            self.margin_inputs.insert(&margin.dimensions, buckets);
        }
    }

    fn place_margin_cells(
        &self,
        key: &AxisEntry,
        rows: &Axis,
        columns: &Axis,
        cells: &mut [Vec<Option<Arc<Cell>>>],
    ) -> Result<(), ArrangeError> {
        if self.margins.is_empty() {
            return Ok(());
        }
        for (r, row) in rows.entries.iter().enumerate() {
            for (c, column) in columns.entries.iter().enumerate() {
                if !(key.is_margin() || row.is_margin() || column.is_margin()) {
                    continue;
                }
                cells[r][c] = self.margin_cell(key, row, rows, column, columns)?;
            }
        }
        Ok(())
    }

    /// The cell at an aggregate position, or `None` when no margin covers
    /// exactly the position's aggregated dimensions.
    fn margin_cell(
        &self,
        key: &AxisEntry,
        row: &AxisEntry,
        rows: &Axis,
        column: &AxisEntry,
        columns: &Axis,
    ) -> Result<Option<Arc<Cell>>, ArrangeError> {
        let aggregated: BTreeSet<String> = key
            .aggregated(&self.spec.facets)
            .chain(row.aggregated(&rows.dimensions))
            .chain(column.aggregated(&columns.dimensions))
            .map(str::to_string)
            .collect();
        let Some(margin) = self.margins.get(&aggregated) else {
            return Ok(None);
        };
        let Some(summarizer) = row.summarizer.as_ref().or(column.summarizer.as_ref()) else {
            return Ok(None);
        };

        let mut assignment = key.assignment(&self.spec.facets);
        extend_assignment(&mut assignment, &rows.dimensions, row);
        extend_assignment(&mut assignment, &columns.dimensions, column);

        if let Some(supplied) = self.store.lookup(&assignment, summarizer) {
            return Ok(Some(Arc::clone(supplied)));
        }

        let concrete: Assignment = assignment
            .iter()
            .filter_map(|(dim, coord)| coord.label().map(|label| (dim, label)))
            .collect();
        let values = self
            .margin_inputs
            .get(&margin.dimensions)
            .and_then(|buckets| buckets.get(&(concrete, summarizer.clone())))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let value = self.registry.apply(&margin.rule, summarizer, values)?;

        Ok(Some(Arc::new(Cell::margin(assignment, summarizer.clone(), value))))
    }

    // ========================================================================
    // LAYOUT
    // ========================================================================

    /// True if any non-margin cell of the store falls inside `filter`.
    fn has_data(&self, filter: &Assignment, summarizer: Option<&str>) -> bool {
        self.store
            .cells_matching(filter)
            .any(|c| !c.is_margin && summarizer.map_or(true, |s| c.summarizer == s))
    }

    fn facet_has_data(&self, facet: &FacetGrid) -> bool {
        self.has_data(&facet.key.assignment(&self.spec.facets), None)
    }

    /// Drops data entries without any underlying non-margin cell.
    /// Margin entries always survive.
    fn drop_empty_entries(&self, mut facet: FacetGrid) -> FacetGrid {
        let layout = self.spec.layout;
        if !layout.drop_empty_rows && !layout.drop_empty_columns {
            return facet;
        }
        let facet_filter = facet.key.assignment(&self.spec.facets);
        let keep = |axis: &Axis, enabled: bool| -> Vec<bool> {
            axis.entries
                .iter()
                .map(|entry| {
                    if !enabled || entry.is_margin() {
                        return true;
                    }
                    let mut filter = facet_filter.clone();
                    extend_assignment(&mut filter, &axis.dimensions, entry);
                    let concrete: Assignment = filter
                        .iter()
                        .filter_map(|(dim, coord)| coord.label().map(|label| (dim, label)))
                        .collect();
                    self.has_data(&concrete, entry.summarizer.as_deref())
                })
                .collect()
        };
        let keep_rows = keep(&facet.rows, layout.drop_empty_rows);
        let keep_columns = keep(&facet.columns, layout.drop_empty_columns);

        facet.rows.entries = retain_flagged(std::mem::take(&mut facet.rows.entries), &keep_rows);
        facet.columns.entries =
            retain_flagged(std::mem::take(&mut facet.columns.entries), &keep_columns);
        facet.cells = retain_flagged(std::mem::take(&mut facet.cells), &keep_rows)
            .into_iter()
            .map(|row| retain_flagged(row, &keep_columns))
            .collect();
        facet
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Ordered Cartesian product; the first column varies slowest.
fn cartesian(columns: &[Vec<Coordinate>]) -> Vec<Coordinates> {
    let mut product: Vec<Coordinates> = vec![SmallVec::new()];
    for column in columns {
        let mut next = Vec::with_capacity(product.len() * column.len());
        for prefix in &product {
            for coordinate in column {
                let mut tuple = prefix.clone();
                tuple.push(coordinate.clone());
                next.push(tuple);
            }
        }
        product = next;
    }
    product
}

fn entry_lookup(axis: &Axis) -> EntryLookup {
    axis.entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_margin())
        .map(|(i, e)| ((e.coordinates.clone(), e.summarizer.clone()), i))
        .collect()
}

fn project(assignment: &Assignment, dimensions: &[String]) -> Coordinates {
    dimensions
        .iter()
        .map(|d| assignment.get(d).cloned().unwrap_or(Coordinate::All))
        .collect()
}

fn extend_assignment(assignment: &mut Assignment, dimensions: &[String], entry: &AxisEntry) {
    for (dim, coord) in dimensions.iter().zip(entry.coordinates.iter()) {
        assignment.set(dim.clone(), coord.clone());
    }
}

fn retain_flagged<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep.iter())
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Arranges the cells of `store` according to `spec`.
/// This is the main entry point for the arrangement engine.
pub fn arrange(
    store: &CellStore,
    spec: &ArrangementSpec,
    registry: &AggregatorRegistry,
) -> Result<Grid, ArrangeError> {
    let mut calculator = ArrangementCalculator::new(store, spec, registry);
    calculator.calculate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregationType, LayoutOptions};
    use model::{CellValue, ModelError};

    fn two_by_two() -> CellStore {
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

    fn value(grid: &Grid, facet: usize, row: usize, column: usize) -> Option<f64> {
        grid.facets[facet].cell(row, column).and_then(|c| c.value.as_number())
    }

    fn labels(rows: Vec<Vec<String>>) -> Vec<String> {
        rows.into_iter().map(|l| l.join("/")).collect()
    }

    fn arrange_default(store: &CellStore, spec: &ArrangementSpec) -> Result<Grid, ArrangeError> {
        arrange(store, spec, &AggregatorRegistry::new())
    }

    #[test]
    fn test_two_by_two_grid() {
        let store = two_by_two();
        let spec = ArrangementSpec::new().with_rows(["V1"]).with_columns(["V2"]);
        let grid = arrange_default(&store, &spec).unwrap();

        assert_eq!(grid.facet_count(), 1);
        let facet = &grid.facets[0];
        assert_eq!(labels(facet.row_labels()), vec!["A", "B"]);
        assert_eq!(labels(facet.column_labels()), vec!["C", "D"]);
        assert_eq!(value(&grid, 0, 0, 0), Some(1.0));
        assert_eq!(value(&grid, 0, 0, 1), Some(2.0));
        assert_eq!(value(&grid, 0, 1, 0), Some(3.0));
        assert_eq!(value(&grid, 0, 1, 1), Some(4.0));
    }

    #[test]
    fn test_swapped_axes() {
        let store = two_by_two();
        let spec = ArrangementSpec::new().with_rows(["V2"]).with_columns(["V1"]);
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(labels(facet.row_labels()), vec!["C", "D"]);
        assert_eq!(labels(facet.column_labels()), vec!["A", "B"]);
        assert_eq!(value(&grid, 0, 0, 1), Some(3.0));
        assert_eq!(value(&grid, 0, 1, 0), Some(2.0));
    }

    #[test]
    fn test_row_margin_sums_over_v1() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::sum(["V1"]));
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(facet.row_count(), 3);
        assert!(facet.rows.entries[2].is_margin());
        assert_eq!(value(&grid, 0, 2, 0), Some(4.0));
        assert_eq!(value(&grid, 0, 2, 1), Some(6.0));
        assert!(facet.cell(2, 0).unwrap().is_margin);
        assert_eq!(grid.margin_cells().len(), 2);
    }

    #[test]
    fn test_leading_margin_and_grand_total() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::sum(["V1"]).leading())
            .with_margin(MarginSpec::sum(["V2"]))
            .with_margin(MarginSpec::sum(["V1", "V2"]));
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(labels(facet.row_labels()), vec!["*", "A", "B"]);
        assert_eq!(labels(facet.column_labels()), vec!["C", "D", "*"]);
        assert_eq!(value(&grid, 0, 0, 0), Some(4.0));
        assert_eq!(value(&grid, 0, 1, 2), Some(3.0));
        assert_eq!(value(&grid, 0, 2, 2), Some(7.0));
        assert_eq!(value(&grid, 0, 0, 2), Some(10.0));
    }

    #[test]
    fn test_missing_grand_total_leaves_corner_empty() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::sum(["V1"]))
            .with_margin(MarginSpec::sum(["V2"]));
        let grid = arrange_default(&store, &spec).unwrap();
        assert!(grid.facets[0].cell(2, 2).is_none());
    }

    #[test]
    fn test_nested_subtotals_follow_their_group() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V1", "V2"])
            .with_margin(MarginSpec::sum(["V2"]))
            .with_margin(MarginSpec::sum(["V1"]))
            .with_margin(MarginSpec::sum(["V1", "V2"]));
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(
            labels(facet.row_labels()),
            vec!["A/C", "A/D", "A/*", "B/C", "B/D", "B/*", "*/C", "*/D", "*/*"]
        );
        let column: Vec<Option<f64>> = (0..facet.row_count()).map(|r| value(&grid, 0, r, 0)).collect();
        assert_eq!(
            column,
            vec![Some(1.0), Some(2.0), Some(3.0), Some(3.0), Some(4.0), Some(7.0), Some(4.0), Some(6.0), Some(10.0)]
        );
    }

    #[test]
    fn test_facets_and_aggregate_facet() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V2"])
            .with_facets(["V1"])
            .with_margin(MarginSpec::over(["V1"], AggregationRule::Builtin(AggregationType::Max)));
        let grid = arrange_default(&store, &spec).unwrap();

        assert_eq!(grid.facet_count(), 3);
        assert_eq!(grid.facets[0].key.labels(false), vec!["A"]);
        assert!(grid.facets[2].is_margin());
        assert_eq!(value(&grid, 1, 1, 0), Some(4.0));
        assert_eq!(value(&grid, 2, 0, 0), Some(3.0));
        assert_eq!(value(&grid, 2, 1, 0), Some(4.0));
    }

    #[test]
    fn test_store_supplied_margin_takes_precedence() {
        let mut store = two_by_two();
        store
            .insert(Cell::margin(Assignment::new().with_all("V1").with("V2", "C"), "n", 40.0))
            .unwrap();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::sum(["V1"]));
        let grid = arrange_default(&store, &spec).unwrap();

        assert_eq!(value(&grid, 0, 2, 0), Some(40.0));
        assert_eq!(value(&grid, 0, 2, 1), Some(6.0));
        // Supplied margins never appear at data positions
        assert_eq!(grid.data_values().len(), 4);
    }

    #[test]
    fn test_margin_over_empty_input_is_no_data() {
        let index = DimensionIndex::new()
            .with_dimension("V1", ["A", "B"])
            .unwrap()
            .with_dimension("V2", ["C", "D"])
            .unwrap();
        let store = CellStore::from_cells(
            Arc::new(index),
            vec![Cell::new(Assignment::new().with("V1", "A").with("V2", "C"), "n", 1.0)],
        )
        .unwrap();
        let registry = AggregatorRegistry::new().with("first", |values| values[0].clone());
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::over(["V1"], AggregationRule::Named("first".into())));

        let grid = arrange(&store, &spec, &registry).unwrap();
        assert_eq!(value(&grid, 0, 2, 0), Some(1.0));
        assert_eq!(grid.facets[0].cell(2, 1).unwrap().value, CellValue::NoData);
    }

    #[test]
    fn test_summarizer_pseudo_level() {
        let mut store = two_by_two();
        store
            .insert(Cell::new(Assignment::new().with("V1", "A").with("V2", "C"), "pct", 0.1))
            .unwrap();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_summarizer_order(["pct"]);
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert!(facet.columns.shows_summarizer);
        assert_eq!(labels(facet.column_labels()), vec!["C/pct", "C/n", "D/pct", "D/n"]);
        assert_eq!(value(&grid, 0, 0, 0), Some(0.1));
        assert_eq!(value(&grid, 0, 0, 1), Some(1.0));
        assert!(facet.cell(1, 0).is_none());
    }

    #[test]
    fn test_custom_level_order() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_level_order("V1", LevelOrder::Reversed)
            .with_level_order("V2", LevelOrder::Custom(vec!["D".to_string()]));
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(labels(facet.row_labels()), vec!["B", "A"]);
        assert_eq!(labels(facet.column_labels()), vec!["D", "C"]);
        assert_eq!(value(&grid, 0, 0, 0), Some(4.0));
        // The shared index keeps its canonical order
        assert_eq!(store.index().order("V1", "A").unwrap(), 0);
    }

    #[test]
    fn test_infeasible_arrangements() {
        let store = two_by_two();
        let cases = [
            (ArrangementSpec::new().with_rows(["V1"]), Infeasibility::UnplacedDimension("V2".into())),
            (
                ArrangementSpec::new().with_rows(["V1", "V2"]).with_columns(["V1"]),
                Infeasibility::RepeatedDimension("V1".into()),
            ),
            (
                ArrangementSpec::new().with_rows(["V1", "V2", "V3"]),
                Infeasibility::UnknownDimension("V3".into()),
            ),
            (
                ArrangementSpec::new()
                    .with_rows(["V1", "V2"])
                    .with_margin(MarginSpec::sum(["V1"]))
                    .with_margin(MarginSpec::sum(["V1"]).leading()),
                Infeasibility::DuplicateMargin("{V1}".into()),
            ),
            (
                ArrangementSpec::new()
                    .with_rows(["V1", "V2"])
                    .with_margin(MarginSpec::sum(Vec::<String>::new())),
                Infeasibility::EmptyMargin(0),
            ),
        ];
        for (spec, expected) in cases {
            assert_eq!(
                arrange_default(&store, &spec).unwrap_err(),
                ArrangeError::ArrangementInfeasible(expected)
            );
        }
    }

    #[test]
    fn test_invalid_level_orders() {
        let store = two_by_two();
        let base = ArrangementSpec::new().with_rows(["V1"]).with_columns(["V2"]);

        let unknown = base.clone().with_level_order("V1", LevelOrder::Custom(vec!["Z".into()]));
        assert!(matches!(
            arrange_default(&store, &unknown),
            Err(ArrangeError::Model(ModelError::UnknownLabel { .. }))
        ));

        let repeated =
            base.with_level_order("V1", LevelOrder::Custom(vec!["A".into(), "A".into()]));
        assert!(matches!(
            arrange_default(&store, &repeated),
            Err(ArrangeError::ArrangementInfeasible(Infeasibility::RepeatedOrderLabel { .. }))
        ));
    }

    #[test]
    fn test_unknown_aggregator_is_reported() {
        let store = two_by_two();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::over(["V1"], AggregationRule::Named("median".into())));
        assert_eq!(
            arrange_default(&store, &spec).unwrap_err(),
            ArrangeError::UnknownAggregator("median".into())
        );
    }

    #[test]
    fn test_drop_empty_rows_keeps_margins() {
        let index = Arc::new(
            DimensionIndex::new()
                .with_dimension("V1", ["A", "B", "E"])
                .unwrap()
                .with_dimension("V2", ["C", "D"])
                .unwrap(),
        );
        let store = CellStore::from_cells(
            index,
            vec![
                Cell::new(Assignment::new().with("V1", "A").with("V2", "C"), "n", 1.0),
                Cell::new(Assignment::new().with("V1", "B").with("V2", "C"), "n", 2.0),
            ],
        )
        .unwrap();
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::sum(["V1"]))
            .with_layout(LayoutOptions {
                drop_empty_rows: true,
                drop_empty_columns: true,
                ..LayoutOptions::default()
            });
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(labels(facet.row_labels()), vec!["A", "B", "*"]);
        assert_eq!(labels(facet.column_labels()), vec!["C"]);
        assert_eq!(value(&grid, 0, 2, 0), Some(3.0));
    }

    #[test]
    fn test_empty_axis_yields_single_entry() {
        let store = two_by_two();
        let spec = ArrangementSpec::new().with_rows(["V1", "V2"]);
        let grid = arrange_default(&store, &spec).unwrap();

        let facet = &grid.facets[0];
        assert_eq!(facet.column_count(), 1);
        assert_eq!(facet.row_count(), 4);
        assert_eq!(value(&grid, 0, 3, 0), Some(4.0));
    }

    #[test]
    fn test_drop_empty_facets_keeps_aggregate_facet() {
        let index = Arc::new(
            DimensionIndex::new()
                .with_dimension("V1", ["A", "B", "E"])
                .unwrap()
                .with_dimension("V2", ["C", "D"])
                .unwrap(),
        );
        let store = CellStore::from_cells(index, two_by_two().iter().map(|c| c.as_ref().clone())).unwrap();
        let spec = ArrangementSpec::new()
            .with_rows(["V2"])
            .with_facets(["V1"])
            .with_margin(MarginSpec::sum(["V1"]));

        let full = arrange_default(&store, &spec).unwrap();
        let keys: Vec<String> = full.facets.iter().map(|f| f.key.labels(false).join("/")).collect();
        assert_eq!(keys, vec!["A", "B", "E", "*"]);

        let dropping = spec.with_layout(LayoutOptions {
            drop_empty_facets: true,
            ..LayoutOptions::default()
        });
        let grid = arrange_default(&store, &dropping).unwrap();
        let keys: Vec<String> = grid.facets.iter().map(|f| f.key.labels(false).join("/")).collect();
        assert_eq!(keys, vec!["A", "B", "*"]);
        assert!(grid.facets[2].is_margin());
        assert_eq!(value(&grid, 2, 0, 0), Some(4.0));
        assert_eq!(value(&grid, 2, 1, 0), Some(6.0));
    }

    #[test]
    fn test_margins_match_a_full_scan() {
        let index = DimensionIndex::new()
            .with_dimension("R", ["r0", "r1", "r2", "r3"])
            .unwrap()
            .with_dimension("P", ["p0", "p1", "p2"])
            .unwrap()
            .with_dimension("Q", ["q0", "q1"])
            .unwrap();
        let mut store = CellStore::new(Arc::new(index));
        for (r, region) in ["r0", "r1", "r2", "r3"].into_iter().enumerate() {
            for (p, product) in ["p0", "p1", "p2"].into_iter().enumerate() {
                for (q, quarter) in ["q0", "q1"].into_iter().enumerate() {
                    if (r + p + q) % 5 == 0 {
                        continue;
                    }
                    let assignment = Assignment::new()
                        .with("R", region)
                        .with("P", product)
                        .with("Q", quarter);
                    let n = (r * 100 + p * 10 + q) as f64;
                    store.insert(Cell::new(assignment.clone(), "n", n)).unwrap();
                    store.insert(Cell::new(assignment, "half", n / 2.0)).unwrap();
                }
            }
        }
        let spec = ArrangementSpec::new()
            .with_rows(["R", "P"])
            .with_columns(["Q"])
            .with_margin(MarginSpec::sum(["P"]))
            .with_margin(MarginSpec::sum(["R", "P"]))
            .with_margin(MarginSpec::sum(["Q"]))
            .with_margin(MarginSpec::sum(["R", "P", "Q"]));
        let grid = arrange_default(&store, &spec).unwrap();

        let margins = grid.margin_cells();
        assert!(!margins.is_empty());
        for placement in margins {
            let cell = placement.cell;
            let concrete: Assignment = cell
                .assignment
                .iter()
                .filter_map(|(dim, coord)| coord.label().map(|label| (dim, label)))
                .collect();
            let expected: f64 = store
                .iter()
                .filter(|c| !c.is_margin && c.summarizer == cell.summarizer && c.assignment.matches(&concrete))
                .filter_map(|c| c.value.as_number())
                .sum();
            assert_eq!(cell.value, CellValue::Number(expected), "at {}", cell.assignment);
        }
    }
}
