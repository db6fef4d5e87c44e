//! FILENAME: tabula/src/table.rs
//! PURPOSE: The Table facade.
//! CONTEXT: A Table always holds a complete, consistent set of inputs: the
//! cell store, an arrangement, a theme and metadata. Every `with_*` method
//! returns a new Table that shares the store; the grid is only computed when
//! something is rendered and is cached per distinct arrangement.

use crate::cache::GridCache;
use crate::error::TableError;
use arrangement_engine::{arrange, validate, AggregatorRegistry, ArrangementSpec, Grid};
use model::{CellStore, Metadata, Theme};
use render::{renderer_for, RenderFormat, RenderOptions, RenderOutput, Renderer};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct Table {
    store: Arc<CellStore>,
    spec: Arc<ArrangementSpec>,
    theme: Arc<Theme>,
    metadata: Arc<Metadata>,
    aggregators: Arc<AggregatorRegistry>,
    cache: Arc<GridCache>,
}

impl Table {
    /// Creates a table, checking the arrangement against the store's
    /// dimensions up front.
    pub fn new(
        store: impl Into<Arc<CellStore>>,
        spec: ArrangementSpec,
        theme: Theme,
        metadata: Metadata,
    ) -> Result<Self, TableError> {
        Table::new_with_aggregators(store, spec, theme, metadata, AggregatorRegistry::new())
    }

    /// Like `new`, for arrangements whose margins use registered aggregators.
    pub fn new_with_aggregators(
        store: impl Into<Arc<CellStore>>,
        spec: ArrangementSpec,
        theme: Theme,
        metadata: Metadata,
        aggregators: AggregatorRegistry,
    ) -> Result<Self, TableError> {
        let store = store.into();
        validate(&store, &spec, &aggregators)?;
        Ok(Table {
            store,
            spec: Arc::new(spec),
            theme: Arc::new(theme),
            metadata: Arc::new(metadata),
            aggregators: Arc::new(aggregators),
            cache: Arc::new(GridCache::new()),
        })
    }

    /// A table with the default arrangement: every dimension on the rows,
    /// in declaration order.
    pub fn from_store(store: impl Into<Arc<CellStore>>) -> Result<Self, TableError> {
        let store = store.into();
        let rows: Vec<String> = store.index().names().map(str::to_string).collect();
        Table::new(store, ArrangementSpec::new().with_rows(rows), Theme::new(), Metadata::new())
    }

    // ========================================================================
    // DERIVED TABLES
    // ========================================================================

    pub fn with_arrangement(&self, spec: ArrangementSpec) -> Result<Table, TableError> {
        validate(&self.store, &spec, &self.aggregators)?;
        Ok(Table {
            spec: Arc::new(spec),
            ..self.clone()
        })
    }

    pub fn with_theme(&self, theme: Theme) -> Table {
        Table {
            theme: Arc::new(theme),
            ..self.clone()
        }
    }

    pub fn with_metadata(&self, metadata: Metadata) -> Table {
        Table {
            metadata: Arc::new(metadata),
            ..self.clone()
        }
    }

    /// Replaces the margin aggregators. Margin values may change, so the
    /// new table starts with an empty grid cache.
    pub fn with_aggregators(&self, aggregators: AggregatorRegistry) -> Result<Table, TableError> {
        validate(&self.store, &self.spec, &aggregators)?;
        Ok(Table {
            aggregators: Arc::new(aggregators),
            cache: Arc::new(GridCache::new()),
            ..self.clone()
        })
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn store(&self) -> &Arc<CellStore> {
        &self.store
    }

    pub fn spec(&self) -> &ArrangementSpec {
        &self.spec
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn aggregators(&self) -> &AggregatorRegistry {
        &self.aggregators
    }

    /// The grid cache shared with every table derived from this one.
    pub fn cache(&self) -> &GridCache {
        &self.cache
    }

    // ========================================================================
    // GRID AND RENDERING
    // ========================================================================

    /// The arranged grid, computed on first use.
    pub fn grid(&self) -> Result<Arc<Grid>, TableError> {
        let grid = self
            .cache
            .get_or_compute(&self.spec, || arrange(&self.store, &self.spec, &self.aggregators))?;
        Ok(grid)
    }

    pub fn render(&self, format: RenderFormat) -> Result<RenderOutput, TableError> {
        self.render_with_options(format, RenderOptions::default())
    }

    pub fn render_with_options(
        &self,
        format: RenderFormat,
        options: RenderOptions,
    ) -> Result<RenderOutput, TableError> {
        let renderer = renderer_for(format, options);
        self.render_with(renderer.as_ref())
    }

    /// Renders with any backend, including ones defined outside this workspace.
    pub fn render_with(&self, renderer: &dyn Renderer) -> Result<RenderOutput, TableError> {
        let grid = self.grid()?;
        let output = renderer.render(&grid, &self.theme, &self.metadata)?;
        Ok(output)
    }

    /// Renders every format independently. A failing format does not stop
    /// the others; results come back in the order of `formats`.
    pub fn render_all(&self, formats: &[RenderFormat]) -> Vec<(RenderFormat, Result<RenderOutput, TableError>)> {
        // Arrange once up front so the renderers share the cached grid
        if let Err(e) = self.grid() {
            log::debug!("Arrangement failed before rendering: {}", e);
        }

        #[cfg(feature = "parallel")]
        let results = formats
            .par_iter()
            .map(|&format| (format, self.render(format)))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results = formats
            .iter()
            .map(|&format| (format, self.render(format)))
            .collect();

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrangement_engine::{ArrangeError, Infeasibility, MarginSpec};
    use model::{Assignment, Cell, DimensionIndex};

    fn store() -> CellStore {
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

    fn spec() -> ArrangementSpec {
        ArrangementSpec::new().with_rows(["V1"]).with_columns(["V2"])
    }

    #[test]
    fn test_new_validates_eagerly() {
        let result = Table::new(
            store(),
            ArrangementSpec::new().with_rows(["V1"]),
            Theme::new(),
            Metadata::new(),
        );
        assert!(matches!(
            result,
            Err(TableError::Arrange(ArrangeError::ArrangementInfeasible(
                Infeasibility::UnplacedDimension(_)
            )))
        ));
    }

    #[test]
    fn test_derived_tables_share_store_and_cache() {
        let table = Table::new(store(), spec(), Theme::new(), Metadata::new()).unwrap();
        let swapped = table
            .with_arrangement(ArrangementSpec::new().with_rows(["V2"]).with_columns(["V1"]))
            .unwrap();
        assert!(Arc::ptr_eq(table.store(), swapped.store()));

        let first = table.grid().unwrap();
        swapped.grid().unwrap();
        assert_eq!(table.cache().len(), 2);

        // Same arrangement again: served from the shared cache
        let back = swapped.with_arrangement(spec()).unwrap();
        assert!(Arc::ptr_eq(&first, &back.grid().unwrap()));

        let themed = table.with_theme(Theme::new());
        assert!(Arc::ptr_eq(&first, &themed.grid().unwrap()));
    }

    #[test]
    fn test_with_aggregators_starts_fresh_cache() {
        let table = Table::new(store(), spec(), Theme::new(), Metadata::new()).unwrap();
        table.grid().unwrap();
        let other = table.with_aggregators(AggregatorRegistry::new()).unwrap();
        assert!(other.cache().is_empty());
        assert_eq!(table.cache().len(), 1);
    }

    #[test]
    fn test_from_store_puts_dimensions_on_rows() {
        let table = Table::from_store(store()).unwrap();
        assert_eq!(table.spec().rows, vec!["V1", "V2"]);
        assert_eq!(table.grid().unwrap().facet(0).unwrap().row_count(), 4);
    }

    #[test]
    fn test_render_all_isolates_failures() {
        let table = Table::new(
            store(),
            spec().with_margin(MarginSpec::sum(["V1"])),
            Theme::new(),
            Metadata::new().with_identifier("id", "bad id"),
        )
        .unwrap();
        let results = table.render_all(&[RenderFormat::Html, RenderFormat::Markdown]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, RenderFormat::Html);
        assert!(results[0].1.is_err());
        assert!(results[1].1.as_ref().unwrap().text().unwrap().contains("Total"));
    }
}
