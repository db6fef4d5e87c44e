//! FILENAME: arrangement-engine/src/lib.rs
//! Arrangement subsystem for Tabula.
//!
//! This crate turns a store of pre-summarized cells into a positioned Grid.
//! It depends on `model` only for shared types (CellStore, Assignment,
//! DimensionIndex).
//!
//! Layers:
//! - `definition`: Serializable configuration (what the arrangement IS)
//! - `aggregate`: Margin aggregation (built-ins and caller-supplied functions)
//! - `view`: Positioned output for renderers (WHAT we display)
//! - `engine`: Arrangement engine (HOW we position)

pub mod definition;
pub mod aggregate;
pub mod view;
pub mod engine;
pub mod error;

pub use definition::*;
pub use aggregate::{aggregate_builtin, AggregateAccumulator, Aggregator, AggregatorRegistry};
pub use view::*;
pub use engine::{arrange, effective_levels, validate, ArrangementCalculator};
pub use error::{ArrangeError, Infeasibility};
