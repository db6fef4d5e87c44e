//! FILENAME: arrangement-engine/src/definition.rs
//! Arrangement Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE an arrangement:
//! which dimensions go to rows, columns and facets, in what nesting order,
//! how levels are ordered, and which margins are synthesized.
//! These structures are designed to be:
//! - Serializable (for table documents)
//! - Hashable (the table facade caches one Grid per distinct spec)
//! - Immutable snapshots of user intent

use model::{Label, SummarizerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// AGGREGATION
// ============================================================================

/// Built-in aggregation functions for margin cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AggregationType {
    #[default]
    Sum,
    Count,
    Average,
    Min,
    Max,
    CountNumbers,
    StdDev,
    StdDevP,
    Var,
    VarP,
    Product,
}

/// How a margin's value is computed from the cells it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationRule {
    /// One of the built-in functions.
    Builtin(AggregationType),
    /// A function registered by name in the `AggregatorRegistry`.
    Named(String),
    /// The function registered for the covered cells' summarizer.
    Summarizer,
}

impl Default for AggregationRule {
    fn default() -> Self {
        AggregationRule::Builtin(AggregationType::Sum)
    }
}

// ============================================================================
// MARGINS
// ============================================================================

/// Where margin entries go relative to the levels they aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MarginPlacement {
    /// After the levels (totals at the bottom/right).
    #[default]
    Trailing,
    /// Before the levels (totals at the top/left).
    Leading,
}

/// A request to synthesize cells aggregating over every level of `dimensions`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarginSpec {
    /// The dimensions aggregated over. May span several axes; a margin over
    /// every row and column dimension is the grand total.
    pub dimensions: BTreeSet<String>,

    #[serde(default)]
    pub rule: AggregationRule,

    #[serde(default)]
    pub placement: MarginPlacement,

    /// Header text for the margin entries (renderers default to "Total").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MarginSpec {
    pub fn over<I, S>(dimensions: I, rule: AggregationRule) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MarginSpec {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            rule,
            placement: MarginPlacement::Trailing,
            label: None,
        }
    }

    /// A trailing margin that sums over `dimensions`.
    pub fn sum<I, S>(dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MarginSpec::over(dimensions, AggregationRule::Builtin(AggregationType::Sum))
    }

    pub fn leading(mut self) -> Self {
        self.placement = MarginPlacement::Leading;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// LEVEL ORDER
// ============================================================================

/// Per-arrangement override of a dimension's level order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LevelOrder {
    /// The order the levels were declared in.
    #[default]
    Canonical,
    Reversed,
    /// Listed labels first, the rest in canonical order.
    Custom(Vec<Label>),
}

/// Axis that carries the summarizer as its innermost pseudo-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SummarizerAxis {
    #[default]
    Columns,
    Rows,
}

impl SummarizerAxis {
    pub fn flipped(self) -> Self {
        match self {
            SummarizerAxis::Columns => SummarizerAxis::Rows,
            SummarizerAxis::Rows => SummarizerAxis::Columns,
        }
    }
}

// ============================================================================
// LAYOUT OPTIONS
// ============================================================================

/// Controls which empty entries survive into the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct LayoutOptions {
    /// Drop data rows that hold no cell at all.
    #[serde(default)]
    pub drop_empty_rows: bool,

    /// Drop data columns that hold no cell at all.
    #[serde(default)]
    pub drop_empty_columns: bool,

    /// Drop facets without any non-margin cell.
    #[serde(default)]
    pub drop_empty_facets: bool,
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// The complete, serializable description of an arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ArrangementSpec {
    /// Dimensions on the row axis (ordered from outer to inner).
    #[serde(default)]
    pub rows: Vec<String>,

    /// Dimensions on the column axis (ordered from outer to inner).
    #[serde(default)]
    pub columns: Vec<String>,

    /// Dimensions that split the table into facets (ordered from outer to inner).
    #[serde(default)]
    pub facets: Vec<String>,

    /// Margins, in declaration order. The first margin that produces an
    /// axis entry decides that entry's placement and label.
    #[serde(default)]
    pub margins: Vec<MarginSpec>,

    /// Arrangement-local level orders. Never mutate the dimension index.
    #[serde(default)]
    pub level_orders: BTreeMap<String, LevelOrder>,

    #[serde(default)]
    pub summarizer_axis: SummarizerAxis,

    /// Summarizers listed here come first; the rest follow in store order.
    #[serde(default)]
    pub summarizer_order: Vec<SummarizerId>,

    #[serde(default)]
    pub layout: LayoutOptions,
}

impl ArrangementSpec {
    pub fn new() -> Self {
        ArrangementSpec::default()
    }

    pub fn with_rows<I, S>(mut self, dims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows = dims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_columns<I, S>(mut self, dims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = dims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_facets<I, S>(mut self, dims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facets = dims.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_margin(mut self, margin: MarginSpec) -> Self {
        self.margins.push(margin);
        self
    }

    pub fn with_level_order(mut self, dimension: impl Into<String>, order: LevelOrder) -> Self {
        self.level_orders.insert(dimension.into(), order);
        self
    }

    pub fn with_summarizer_axis(mut self, axis: SummarizerAxis) -> Self {
        self.summarizer_axis = axis;
        self
    }

    pub fn with_summarizer_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SummarizerId>,
    {
        self.summarizer_order = order.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_layout(mut self, layout: LayoutOptions) -> Self {
        self.layout = layout;
        self
    }

    /// Swaps the row and column axes, including the summarizer axis.
    pub fn transposed(&self) -> Self {
        let mut spec = self.clone();
        std::mem::swap(&mut spec.rows, &mut spec.columns);
        spec.summarizer_axis = spec.summarizer_axis.flipped();
        let layout = spec.layout;
        spec.layout.drop_empty_rows = layout.drop_empty_columns;
        spec.layout.drop_empty_columns = layout.drop_empty_rows;
        spec
    }

    /// Every dimension named on any axis, rows then columns then facets.
    pub fn axis_dimensions(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .chain(self.columns.iter())
            .chain(self.facets.iter())
            .map(String::as_str)
    }

    /// Effective order for one dimension (canonical when not overridden).
    pub fn level_order(&self, dimension: &str) -> &LevelOrder {
        static CANONICAL: LevelOrder = LevelOrder::Canonical;
        self.level_orders.get(dimension).unwrap_or(&CANONICAL)
    }
}
