//! FILENAME: tabula/src/lib.rs
//! Tabula - a grammar of tables.
//!
//! Cells arrive pre-summarized, tagged with one level per dimension. A Table
//! pairs them with an arrangement (which dimensions go on rows, columns and
//! facets, with which margins), a theme and metadata, and renders the result
//! to any of the built-in formats. Re-arranging never touches the content:
//! every derived Table shares the same cell store.
//!
//! Layers:
//! - `model`: Dimensions, cells, themes, metadata (WHAT the table says)
//! - `arrangement_engine`: Positions cells into a Grid (WHERE it goes)
//! - `render`: Backends turning a Grid into an artifact (HOW it looks)
//! - this crate: The Table facade, its grid cache and JSON documents
//!
//! ```
//! use tabula::{ArrangementSpec, Assignment, Cell, CellStore, DimensionIndex, MarginSpec};
//! use tabula::{Metadata, RenderFormat, Table, Theme};
//! use std::sync::Arc;
//!
//! let index = DimensionIndex::new()
//!     .with_dimension("Class", ["1st", "2nd"])?
//!     .with_dimension("Survived", ["No", "Yes"])?;
//! let cells = [("1st", "No", 122.0), ("1st", "Yes", 203.0), ("2nd", "No", 167.0), ("2nd", "Yes", 118.0)]
//!     .into_iter()
//!     .map(|(c, s, n)| Cell::new(Assignment::new().with("Class", c).with("Survived", s), "n", n));
//! let store = CellStore::from_cells(Arc::new(index), cells)?;
//!
//! let spec = ArrangementSpec::new()
//!     .with_rows(["Class"])
//!     .with_columns(["Survived"])
//!     .with_margin(MarginSpec::sum(["Class"]));
//! let table = Table::new(store, spec, Theme::new(), Metadata::new())?;
//! let markdown = table.render(RenderFormat::Markdown)?;
//! assert!(markdown.text().unwrap().contains("| Total | 289 | 321 |"));
//! # Ok::<(), tabula::TableError>(())
//! ```

pub mod cache;
pub mod document;
pub mod error;
pub mod table;

pub use cache::GridCache;
pub use document::{coordinates, CellRecord, TableDocument};
pub use error::TableError;
pub use table::Table;

// Re-export the layers so most callers only depend on this crate
pub use arrangement_engine::{
    AggregationRule, AggregationType, AggregatorRegistry, ArrangeError, ArrangementSpec, Grid,
    Infeasibility, LayoutOptions, LevelOrder, MarginPlacement, MarginSpec, SummarizerAxis,
};
pub use model::{
    Assignment, Cell, CellStore, CellValue, Color, Coordinate, DimensionIndex, Metadata, ModelError,
    Scope, Selector, Style, TextAlign, Theme,
};
pub use render::{
    renderer_for, Artifact, RenderError, RenderFormat, RenderOptions, RenderOutput, Renderer,
    UnsupportedStyleWarning,
};
