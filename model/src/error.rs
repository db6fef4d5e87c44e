//! FILENAME: model/src/error.rs

use thiserror::Error;

/// Errors raised while declaring dimensions or inserting cells.
/// All of them are construction-time failures: nothing is arranged or
/// rendered until the content model is consistent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("dimension '{0}' is already declared")]
    DuplicateDimension(String),

    #[error("dimension '{dimension}' lists level '{label}' more than once")]
    DuplicateLevel { dimension: String, label: String },

    #[error("dimension '{0}' is not declared")]
    UnknownDimension(String),

    #[error("label '{label}' is not a level of dimension '{dimension}'")]
    UnknownLabel { dimension: String, label: String },

    #[error("assignment does not match the declared dimensions: {0}")]
    DimensionMismatch(String),

    #[error("a cell for {assignment} with summarizer '{summarizer}' already exists")]
    DuplicateCell { assignment: String, summarizer: String },
}
