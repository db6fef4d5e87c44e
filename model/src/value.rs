//! FILENAME: model/src/value.rs
//! PURPOSE: Defines the value carried by a summarized cell.
//! CONTEXT: Cell values arrive pre-summarized from an external summarizer;
//! the only values this workspace ever creates itself are margin aggregates
//! and the `NoData` sentinel for margins with nothing to aggregate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The scalar or text payload of a cell.
///
/// Serialized untagged so documents read naturally:
/// `null`, `12.5`, `true` and `"text"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// The "no data" sentinel.
    #[default]
    NoData,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Returns the numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, CellValue::NoData)
    }

    /// Returns the display value of the cell as a String.
    /// Formatting driven by a theme lives in `number_format`; this is the
    /// unstyled representation.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::NoData => String::new(),
            CellValue::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}
