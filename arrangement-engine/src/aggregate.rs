//! FILENAME: arrangement-engine/src/aggregate.rs
//! Margin aggregation: built-in accumulators and caller-supplied aggregators.
//!
//! Ordinary cells arrive pre-summarized; aggregation only ever runs when a
//! margin cell is synthesized. Callers plug in their own summary functions
//! as plain function values, registered by name or by summarizer id.

use crate::definition::{AggregationRule, AggregationType};
use crate::error::ArrangeError;
use model::{CellValue, SummarizerId};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A caller-supplied aggregation function.
/// Never invoked with an empty slice.
pub type Aggregator = Arc<dyn Fn(&[&CellValue]) -> CellValue + Send + Sync>;

// ============================================================================
// AGGREGATE ACCUMULATOR
// ============================================================================

/// Accumulator for computing aggregates incrementally.
/// Stores intermediate state needed for all aggregation types.
#[derive(Debug, Clone, Default)]
pub struct AggregateAccumulator {
    pub sum: f64,
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub product: Option<f64>,
    /// For variance/stddev: sum of squared differences from mean.
    /// Using Welford's algorithm for numerical stability.
    pub m2: f64,
    pub mean: f64,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        AggregateAccumulator::default()
    }

    pub fn add(&mut self, value: &CellValue) {
        match value {
            CellValue::NoData => {}
            CellValue::Number(n) => self.add_number(*n),
            CellValue::Text(_) | CellValue::Boolean(_) => self.add_non_number(),
        }
    }

    /// Adds a numeric value to the accumulator.
    pub fn add_number(&mut self, value: f64) {
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;

        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.product = Some(self.product.map_or(value, |p| p * value));

        // Welford's algorithm for variance
        let delta = value - self.mean;
        self.mean += delta / (self.count_numbers as f64);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Adds a non-numeric value (only increments count).
    pub fn add_non_number(&mut self) {
        self.count += 1;
    }

    /// Computes the final aggregate value. Numeric aggregations over inputs
    /// without any number yield `NoData`.
    pub fn compute(&self, aggregation: AggregationType) -> CellValue {
        let n = self.count_numbers as f64;
        let numeric = |value: Option<f64>| value.map_or(CellValue::NoData, CellValue::Number);

        match aggregation {
            AggregationType::Count => CellValue::Number(self.count as f64),
            AggregationType::CountNumbers => CellValue::Number(n),
            _ if self.count_numbers == 0 => CellValue::NoData,
            AggregationType::Sum => CellValue::Number(self.sum),
            AggregationType::Average => CellValue::Number(self.sum / n),
            AggregationType::Min => numeric(self.min),
            AggregationType::Max => numeric(self.max),
            AggregationType::Product => numeric(self.product),
            AggregationType::Var => numeric((self.count_numbers > 1).then(|| self.m2 / (n - 1.0))),
            AggregationType::VarP => CellValue::Number(self.m2 / n),
            AggregationType::StdDev => {
                numeric((self.count_numbers > 1).then(|| (self.m2 / (n - 1.0)).sqrt()))
            }
            AggregationType::StdDevP => CellValue::Number((self.m2 / n).sqrt()),
        }
    }
}

/// Runs a built-in aggregation over a set of values.
pub fn aggregate_builtin(aggregation: AggregationType, values: &[&CellValue]) -> CellValue {
    let mut acc = AggregateAccumulator::new();
    for value in values {
        acc.add(value);
    }
    acc.compute(aggregation)
}

// ============================================================================
// AGGREGATOR REGISTRY
// ============================================================================

/// Caller-supplied aggregation functions, keyed by name or by summarizer.
#[derive(Clone, Default)]
pub struct AggregatorRegistry {
    named: FxHashMap<String, Aggregator>,
    by_summarizer: FxHashMap<SummarizerId, Aggregator>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        AggregatorRegistry::default()
    }

    /// Registers a function usable through `AggregationRule::Named`.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[&CellValue]) -> CellValue + Send + Sync + 'static,
    {
        self.named.insert(name.into(), Arc::new(f));
    }

    /// Registers the function used by `AggregationRule::Summarizer` for
    /// cells produced by `summarizer`.
    pub fn register_for_summarizer<F>(&mut self, summarizer: impl Into<SummarizerId>, f: F)
    where
        F: Fn(&[&CellValue]) -> CellValue + Send + Sync + 'static,
    {
        self.by_summarizer.insert(summarizer.into(), Arc::new(f));
    }

    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[&CellValue]) -> CellValue + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn with_summarizer<F>(mut self, summarizer: impl Into<SummarizerId>, f: F) -> Self
    where
        F: Fn(&[&CellValue]) -> CellValue + Send + Sync + 'static,
    {
        self.register_for_summarizer(summarizer, f);
        self
    }

    pub fn named(&self, name: &str) -> Option<&Aggregator> {
        self.named.get(name)
    }

    pub fn for_summarizer(&self, summarizer: &str) -> Option<&Aggregator> {
        self.by_summarizer.get(summarizer)
    }

    /// Checks that a rule can be applied to cells of `summarizer`.
    pub fn check(&self, rule: &AggregationRule, summarizer: &str) -> Result<(), ArrangeError> {
        match rule {
            AggregationRule::Builtin(_) => Ok(()),
            AggregationRule::Named(name) => self
                .named(name)
                .map(|_| ())
                .ok_or_else(|| ArrangeError::UnknownAggregator(name.clone())),
            AggregationRule::Summarizer => self
                .for_summarizer(summarizer)
                .map(|_| ())
                .ok_or_else(|| ArrangeError::UnknownAggregator(format!("summarizer '{}'", summarizer))),
        }
    }

    /// Applies a rule. Empty input short-circuits to `NoData` without
    /// invoking the rule.
    pub fn apply(
        &self,
        rule: &AggregationRule,
        summarizer: &str,
        values: &[&CellValue],
    ) -> Result<CellValue, ArrangeError> {
        self.check(rule, summarizer)?;
        if values.is_empty() {
            return Ok(CellValue::NoData);
        }
        let value = match rule {
            AggregationRule::Builtin(aggregation) => aggregate_builtin(*aggregation, values),
            AggregationRule::Named(name) => match self.named(name) {
                Some(f) => f(values),
                None => return Err(ArrangeError::UnknownAggregator(name.clone())),
            },
            AggregationRule::Summarizer => match self.for_summarizer(summarizer) {
                Some(f) => f(values),
                None => {
                    return Err(ArrangeError::UnknownAggregator(format!(
                        "summarizer '{}'",
                        summarizer
                    )))
                }
            },
        };
        Ok(value)
    }
}

impl fmt::Debug for AggregatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<&String> = self.named.keys().collect();
        named.sort();
        let mut by_summarizer: Vec<&String> = self.by_summarizer.keys().collect();
        by_summarizer.sort();
        f.debug_struct("AggregatorRegistry")
            .field("named", &named)
            .field("by_summarizer", &by_summarizer)
            .finish()
    }
}
