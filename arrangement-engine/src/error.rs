//! FILENAME: arrangement-engine/src/error.rs

use model::ModelError;
use thiserror::Error;

/// Why an arrangement cannot be realized against a dimension index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Infeasibility {
    #[error("dimension '{0}' is not declared")]
    UnknownDimension(String),

    #[error("dimension '{0}' is placed on more than one axis position")]
    RepeatedDimension(String),

    #[error("dimension '{0}' is not placed on any axis")]
    UnplacedDimension(String),

    #[error("margin #{0} does not aggregate over any dimension")]
    EmptyMargin(usize),

    #[error("margin over {0} is declared more than once")]
    DuplicateMargin(String),

    #[error("custom order for '{dimension}' lists '{label}' more than once")]
    RepeatedOrderLabel { dimension: String, label: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrangeError {
    #[error("arrangement infeasible: {0}")]
    ArrangementInfeasible(#[from] Infeasibility),

    #[error("cells collide at facet {facet}, row {row}, column {column}")]
    AmbiguousPlacement {
        facet: usize,
        row: usize,
        column: usize,
    },

    #[error("unknown aggregator: {0}")]
    UnknownAggregator(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
