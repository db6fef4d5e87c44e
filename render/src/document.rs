//! FILENAME: render/src/document.rs
//! Render Document - The format-neutral layout of a grid.
//!
//! Every backend consumes the same document: one table per facet, each made
//! of header rows and body rows of cells that already carry their display
//! text and their resolved, capability-filtered style. Backends only decide
//! syntax; positions come from the grid and are never reordered here.
//!
//! Layout of one table (row header width w, column header depth h):
//! - h header rows: w corner cells, then one cell per column entry
//! - one body row per row entry: w row header cells, then one cell per column
//! Adjacent column headers with the same outer labels are merged with
//! `col_span`; the cells they cover stay in place with `covered` set.

use crate::output::{RenderOptions, UnsupportedStyleWarning};
use crate::renderer::Renderer;
use arrangement_engine::{Axis, AxisEntry, FacetGrid, Grid};
use model::{attr, format_value, Assignment, CellValue, Coordinate, Metadata, Scope, SelectorPath, Style, SummarizerId, Theme};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

// ============================================================================
// DOCUMENT TYPES
// ============================================================================

/// Text with its resolved style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledText {
    pub text: String,
    pub style: Style,
}

/// The role of a cell in the laid-out table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Top-left area above the row headers.
    Corner,
    ColumnHeader,
    RowHeader,
    Data,
    Margin,
    /// A body position without any cell.
    Empty,
}

impl CellKind {
    pub fn is_header(&self) -> bool {
        matches!(self, CellKind::Corner | CellKind::ColumnHeader | CellKind::RowHeader)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCell {
    /// Display text, not yet escaped.
    pub text: String,
    pub kind: CellKind,
    pub style: Style,
    /// Number of columns this cell spans (1 for ordinary cells).
    pub col_span: usize,
    /// True when a spanning cell to the left covers this position.
    pub covered: bool,
    /// The underlying value for data and margin cells.
    pub value: Option<CellValue>,
}

impl RenderCell {
    fn new(text: String, kind: CellKind, style: Style) -> Self {
        RenderCell {
            text,
            kind,
            style,
            col_span: 1,
            covered: false,
            value: None,
        }
    }
}

/// One facet, laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTable {
    /// Facet description such as `Region = North`; `None` without facet dimensions.
    pub caption: Option<StyledText>,
    pub header_rows: Vec<Vec<RenderCell>>,
    pub body_rows: Vec<Vec<RenderCell>>,
    /// Number of leading row header columns.
    pub row_header_width: usize,
    /// True for facets aggregating over facet dimensions.
    pub is_margin: bool,
}

impl RenderTable {
    pub fn column_count(&self) -> usize {
        self.header_rows
            .first()
            .or_else(|| self.body_rows.first())
            .map_or(0, Vec::len)
    }

    /// Header rows followed by body rows.
    pub fn rows(&self) -> impl Iterator<Item = &Vec<RenderCell>> + '_ {
        self.header_rows.iter().chain(self.body_rows.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderDocument {
    pub title: Option<StyledText>,
    pub subtitle: Option<StyledText>,
    pub notes: Vec<StyledText>,
    pub identifiers: BTreeMap<String, String>,
    pub tables: Vec<RenderTable>,
}

impl RenderDocument {
    /// Lays out `grid` for `renderer`, resolving and filtering every style.
    pub fn build<R: Renderer + ?Sized>(
        grid: &Grid,
        theme: &Theme,
        metadata: &Metadata,
        renderer: &R,
    ) -> (RenderDocument, Vec<UnsupportedStyleWarning>) {
        let mut builder = DocumentBuilder {
            renderer,
            theme,
            options: renderer.options(),
            warnings: Vec::new(),
            warning_index: FxHashMap::default(),
        };

        let title = metadata
            .title
            .as_ref()
            .map(|t| builder.styled(t, SelectorPath::new([Scope::Table, Scope::Title])));
        let subtitle = metadata
            .subtitle
            .as_ref()
            .map(|t| builder.styled(t, SelectorPath::new([Scope::Table, Scope::Subtitle])));
        let notes = metadata
            .notes
            .iter()
            .map(|t| builder.styled(t, SelectorPath::new([Scope::Table, Scope::Note])))
            .collect();
        let tables = grid
            .facets
            .iter()
            .map(|facet| builder.table(&grid.facet_dimensions, facet))
            .collect();

        let document = RenderDocument {
            title,
            subtitle,
            notes,
            identifiers: metadata.identifiers.clone(),
            tables,
        };
        (document, builder.warnings)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

struct DocumentBuilder<'a, R: Renderer + ?Sized> {
    renderer: &'a R,
    theme: &'a Theme,
    options: &'a RenderOptions,
    warnings: Vec<UnsupportedStyleWarning>,
    warning_index: FxHashMap<String, usize>,
}

impl<'a, R: Renderer + ?Sized> DocumentBuilder<'a, R> {
    fn styled(&mut self, text: &str, path: SelectorPath) -> StyledText {
        let style = self.resolve(&path);
        StyledText {
            text: text.to_string(),
            style,
        }
    }

    /// Resolves the theme for `path` and keeps what the renderer can express.
    fn resolve(&mut self, path: &SelectorPath) -> Style {
        let resolved = self.theme.resolve(path);
        let mut kept = Style::new();
        let mut substitutes = Vec::new();

        for (name, value) in resolved.iter() {
            // Number attributes are applied to the text itself
            if attr::NUMBER_FORMAT.contains(&name) || self.renderer.supports_style(name) {
                kept.set(name, value.clone());
                continue;
            }
            match self.renderer.fallback_style(name, value) {
                Some((substitute, value)) if self.renderer.supports_style(&substitute) => {
                    substitutes.push((substitute, value));
                }
                _ => self.record_unsupported(name),
            }
        }
        for (name, value) in substitutes {
            if !kept.contains(&name) {
                kept.set(name, value);
            }
        }
        kept
    }

    fn record_unsupported(&mut self, attribute: &str) {
        match self.warning_index.get(attribute) {
            Some(&i) => self.warnings[i].occurrences += 1,
            None => {
                self.warning_index.insert(attribute.to_string(), self.warnings.len());
                self.warnings.push(UnsupportedStyleWarning {
                    format: self.renderer.format(),
                    attribute: attribute.to_string(),
                    occurrences: 1,
                });
            }
        }
    }

    fn table(&mut self, facet_dimensions: &[String], facet: &FacetGrid) -> RenderTable {
        let facet_coordinates = facet.key.assignment(facet_dimensions);
        let caption = self.caption(facet_dimensions, facet, &facet_coordinates);
        let row_header_width = facet.rows.depth();

        RenderTable {
            caption,
            header_rows: self.header_rows(facet, &facet_coordinates, row_header_width),
            body_rows: self.body_rows(facet, &facet_coordinates, row_header_width),
            row_header_width,
            is_margin: facet.is_margin(),
        }
    }

    fn caption(
        &mut self,
        facet_dimensions: &[String],
        facet: &FacetGrid,
        coordinates: &Assignment,
    ) -> Option<StyledText> {
        if facet_dimensions.is_empty() {
            return None;
        }
        let parts: Vec<String> = facet_dimensions
            .iter()
            .enumerate()
            .map(|(level, dim)| format!("{} = {}", dim, self.total_or_label(&facet.key, level)))
            .collect();
        let mut scopes = vec![Scope::Table, Scope::Facet];
        if facet.is_margin() {
            scopes.push(Scope::Margin);
        }
        let path = SelectorPath::new(scopes).with_coordinates(coordinates.clone());
        Some(self.styled(&parts.join(", "), path))
    }

    fn header_rows(
        &mut self,
        facet: &FacetGrid,
        facet_coordinates: &Assignment,
        width: usize,
    ) -> Vec<Vec<RenderCell>> {
        let columns = &facet.columns;
        let depth = columns.depth().max(1);
        let mut header_rows = Vec::with_capacity(depth);

        for level in 0..depth {
            let mut row = Vec::with_capacity(width + columns.len());

            for corner in 0..width {
                let text = if level + 1 == depth {
                    facet.rows.dimensions.get(corner).cloned().unwrap_or_default()
                } else {
                    String::new()
                };
                let style = self.resolve(&SelectorPath::new([Scope::Table, Scope::Header]));
                row.push(RenderCell::new(text, CellKind::Corner, style));
            }

            let mut c = 0;
            while c < columns.len() {
                let entry = &columns.entries[c];
                let prefix = span_prefix(columns, entry, level);
                let span = columns.entries[c..]
                    .iter()
                    .take_while(|other| span_prefix(columns, other, level) == prefix)
                    .count();

                let path = self.axis_path(Scope::Column, columns, entry, facet_coordinates);
                let style = self.resolve(&path);
                let mut cell = RenderCell::new(self.header_label(columns, entry, level), CellKind::ColumnHeader, style);
                cell.col_span = span;
                row.push(cell.clone());

                for _ in 1..span {
                    let mut covered = cell.clone();
                    covered.text = String::new();
                    covered.col_span = 1;
                    covered.covered = true;
                    row.push(covered);
                }
                c += span;
            }
            header_rows.push(row);
        }
        header_rows
    }

    fn body_rows(
        &mut self,
        facet: &FacetGrid,
        facet_coordinates: &Assignment,
        width: usize,
    ) -> Vec<Vec<RenderCell>> {
        let rows = &facet.rows;
        let columns = &facet.columns;
        let mut body = Vec::with_capacity(rows.len());

        for (r, entry) in rows.entries.iter().enumerate() {
            let mut row = Vec::with_capacity(width + columns.len());
            let path = self.axis_path(Scope::Row, rows, entry, facet_coordinates);
            let header_style = self.resolve(&path);

            for level in 0..width {
                let repeated = r > 0
                    && !self.options.repeat_row_labels
                    && span_prefix(rows, &rows.entries[r - 1], level) == span_prefix(rows, entry, level);
                let text = if repeated {
                    String::new()
                } else {
                    self.header_label(rows, entry, level)
                };
                row.push(RenderCell::new(text, CellKind::RowHeader, header_style.clone()));
            }

            for (c, column) in columns.entries.iter().enumerate() {
                row.push(self.body_cell(facet, facet_coordinates, r, entry, c, column));
            }
            body.push(row);
        }
        body
    }

    fn body_cell(
        &mut self,
        facet: &FacetGrid,
        facet_coordinates: &Assignment,
        r: usize,
        row: &AxisEntry,
        c: usize,
        column: &AxisEntry,
    ) -> RenderCell {
        let cell = facet.cell(r, c);
        let is_margin = cell.map_or(false, |c| c.is_margin)
            || facet.is_margin()
            || row.is_margin()
            || column.is_margin();

        let mut scopes = vec![Scope::Table, Scope::Body, Scope::Row, Scope::Column];
        if cell.is_some() {
            scopes.push(Scope::Cell);
        }
        if is_margin {
            scopes.push(Scope::Margin);
        }
        let coordinates = match cell {
            Some(cell) => cell.assignment.clone(),
            None => {
                let mut coordinates = facet_coordinates.clone();
                merge_entry(&mut coordinates, &facet.rows, row);
                merge_entry(&mut coordinates, &facet.columns, column);
                coordinates
            }
        };
        let summarizer: Option<SummarizerId> = row.summarizer.clone().or_else(|| column.summarizer.clone());
        let path = SelectorPath::new(scopes)
            .with_coordinates(coordinates)
            .with_summarizer(summarizer);

        let style = self.resolve(&path);
        match cell {
            Some(cell) => {
                let kind = if cell.is_margin { CellKind::Margin } else { CellKind::Data };
                let text = format_value(&cell.value, &style, &self.options.no_data_text);
                let mut rendered = RenderCell::new(text, kind, style);
                rendered.value = Some(cell.value.clone());
                rendered
            }
            None => RenderCell::new(self.options.empty_text.clone(), CellKind::Empty, style),
        }
    }

    fn axis_path(
        &self,
        scope: Scope,
        axis: &Axis,
        entry: &AxisEntry,
        facet_coordinates: &Assignment,
    ) -> SelectorPath {
        let mut scopes = vec![Scope::Table, Scope::Header, scope];
        if entry.is_margin() {
            scopes.push(Scope::Margin);
        }
        let mut coordinates = facet_coordinates.clone();
        merge_entry(&mut coordinates, axis, entry);
        SelectorPath::new(scopes)
            .with_coordinates(coordinates)
            .with_summarizer(entry.summarizer.clone())
    }

    /// Header text of `entry` at header `level` (dimensions, then the summarizer).
    fn header_label(&self, axis: &Axis, entry: &AxisEntry, level: usize) -> String {
        if level < axis.dimensions.len() {
            self.total_or_label(entry, level)
        } else {
            entry.summarizer.clone().unwrap_or_default()
        }
    }

    /// The level label, or the margin label at the outermost aggregated level.
    fn total_or_label(&self, entry: &AxisEntry, level: usize) -> String {
        match entry.coordinates.get(level) {
            Some(Coordinate::Level(label)) => label.clone(),
            Some(Coordinate::All) if entry.coordinates[..level].iter().any(Coordinate::is_all) => {
                String::new()
            }
            Some(Coordinate::All) => entry
                .margin_label
                .clone()
                .unwrap_or_else(|| self.options.total_label.clone()),
            None => String::new(),
        }
    }
}

/// Identity of an entry's header up to and including `level`.
fn span_prefix<'e>(axis: &Axis, entry: &'e AxisEntry, level: usize) -> (&'e [Coordinate], Option<&'e str>) {
    let dims = axis.dimensions.len();
    let coordinates = &entry.coordinates[..(level + 1).min(dims)];
    let summarizer = if level >= dims {
        entry.summarizer.as_deref()
    } else {
        None
    };
    (coordinates, summarizer)
}

fn merge_entry(assignment: &mut Assignment, axis: &Axis, entry: &AxisEntry) {
    for (dim, coord) in axis.dimensions.iter().zip(entry.coordinates.iter()) {
        assignment.set(dim.clone(), coord.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::MarkdownRenderer;
    use arrangement_engine::{arrange, AggregatorRegistry, ArrangementSpec, MarginSpec};
    use model::{Cell, CellStore, DimensionIndex, Selector};
    use std::sync::Arc;

    fn store() -> CellStore {
        let index = DimensionIndex::new()
            .with_dimension("V1", ["A", "B"])
            .unwrap()
            .with_dimension("V2", ["C", "D"])
            .unwrap();
        let cells = [("A", "C", 1.0), ("A", "D", 2.0), ("B", "C", 3.0), ("B", "D", 4.0)]
            .into_iter()
            .flat_map(|(v1, v2, n)| {
                let a = Assignment::new().with("V1", v1).with("V2", v2);
                [Cell::new(a.clone(), "n", n), Cell::new(a, "pct", n / 10.0)]
            });
        CellStore::from_cells(Arc::new(index), cells).unwrap()
    }

    fn texts(row: &[RenderCell]) -> Vec<&str> {
        row.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_headers_span_outer_levels() {
        let spec = ArrangementSpec::new()
            .with_rows(["V1"])
            .with_columns(["V2"])
            .with_margin(MarginSpec::sum(["V1"]));
        let grid = arrange(&store(), &spec, &AggregatorRegistry::new()).unwrap();
        let renderer = MarkdownRenderer::default();
        let (document, warnings) = RenderDocument::build(&grid, &Theme::new(), &Metadata::new(), &renderer);
        assert!(warnings.is_empty());

        let table = &document.tables[0];
        assert!(table.caption.is_none());
        assert_eq!(table.row_header_width, 1);
        assert_eq!(table.header_rows.len(), 2);
        assert_eq!(texts(&table.header_rows[0]), vec!["", "C", "", "D", ""]);
        assert_eq!(table.header_rows[0][1].col_span, 2);
        assert!(table.header_rows[0][2].covered);
        assert_eq!(texts(&table.header_rows[1]), vec!["V1", "n", "pct", "n", "pct"]);

        assert_eq!(texts(&table.body_rows[2]), vec!["Total", "4", "0.4", "6", "0.6"]);
        assert_eq!(table.body_rows[2][1].kind, CellKind::Margin);
        assert_eq!(table.body_rows[0][1].value, Some(CellValue::Number(1.0)));
    }

    #[test]
    fn test_styles_are_filtered_and_warned_once() {
        let spec = ArrangementSpec::new().with_rows(["V1"]).with_columns(["V2"]);
        let grid = arrange(&store(), &spec, &AggregatorRegistry::new()).unwrap();
        let theme = Theme::new()
            .rule(Selector::scope(Scope::Cell), Style::new().with_font_size(9).with_decimals(2))
            .rule(Selector::scope(Scope::Margin), Style::new().with_bold(true))
            .rule(Selector::scope(Scope::Header), Style::new().with_underline(true));
        let (document, warnings) =
            RenderDocument::build(&grid, &theme, &Metadata::new(), &MarkdownRenderer::default());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].attribute, "font_size");
        assert_eq!(warnings[0].occurrences, 8);

        let table = &document.tables[0];
        assert_eq!(table.body_rows[0][1].text, "1.00");
        assert!(table.body_rows[0][1].style.decimals().is_some());
        // Underline falls back to italic in Markdown
        assert!(table.header_rows[0][1].style.is_italic());
        assert!(!table.header_rows[0][1].style.contains("underline"));
    }

    #[test]
    fn test_facet_captions_and_repeated_row_labels() {
        let spec = ArrangementSpec::new()
            .with_rows(["V2"])
            .with_facets(["V1"])
            .with_margin(MarginSpec::sum(["V1"]).with_label("Both"));
        let grid = arrange(&store(), &spec, &AggregatorRegistry::new()).unwrap();
        let (document, _) =
            RenderDocument::build(&grid, &Theme::new(), &Metadata::new(), &MarkdownRenderer::default());

        let captions: Vec<&str> = document
            .tables
            .iter()
            .map(|t| t.caption.as_ref().map_or("", |c| c.text.as_str()))
            .collect();
        assert_eq!(captions, vec!["V1 = A", "V1 = B", "V1 = Both"]);
        assert!(document.tables[2].is_margin);

        let nested = ArrangementSpec::new().with_rows(["V1", "V2"]);
        let grid = arrange(&store(), &nested, &AggregatorRegistry::new()).unwrap();
        let (document, _) =
            RenderDocument::build(&grid, &Theme::new(), &Metadata::new(), &MarkdownRenderer::default());
        let body = &document.tables[0].body_rows;
        assert_eq!(texts(&body[0])[..2], ["A", "C"]);
        assert_eq!(texts(&body[1])[..2], ["", "D"]);
    }
}
