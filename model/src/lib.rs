//! FILENAME: model/src/lib.rs
//! PURPOSE: Content model for Tabula, the grammar-of-tables workspace.
//! CONTEXT: Everything a table SAYS lives here (dimensions, cells, the cell
//! store) together with the format-independent description of how it LOOKS
//! (themes) and what surrounds it (metadata). Arrangement and rendering live
//! in their own crates and only read these types.

pub mod assignment;
pub mod cell;
pub mod dimension;
pub mod error;
pub mod metadata;
pub mod number_format;
pub mod theme;
pub mod value;

// Re-export commonly used types at the crate root
pub use assignment::{Assignment, Coordinate};
pub use cell::{Cell, CellId, CellStore, CellsMatching, SummarizerId};
pub use dimension::{Dimension, DimensionDef, DimensionIndex, Label};
pub use error::ModelError;
pub use metadata::Metadata;
pub use number_format::{format_number, format_value};
pub use theme::{
    attr, Color, Scope, Selector, SelectorPath, Style, StyleValue, TextAlign, Theme, ThemeRule,
};
pub use value::CellValue;
