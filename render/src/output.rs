//! FILENAME: render/src/output.rs
//! Output formats, render options and render results.

use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FORMATS
// ============================================================================

/// The built-in output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Markdown,
    Html,
    Latex,
    Rtf,
    Xlsx,
}

impl RenderFormat {
    pub const ALL: [RenderFormat; 5] = [
        RenderFormat::Markdown,
        RenderFormat::Html,
        RenderFormat::Latex,
        RenderFormat::Rtf,
        RenderFormat::Xlsx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderFormat::Markdown => "markdown",
            RenderFormat::Html => "html",
            RenderFormat::Latex => "latex",
            RenderFormat::Rtf => "rtf",
            RenderFormat::Xlsx => "xlsx",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            RenderFormat::Markdown => "md",
            RenderFormat::Html => "html",
            RenderFormat::Latex => "tex",
            RenderFormat::Rtf => "rtf",
            RenderFormat::Xlsx => "xlsx",
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, RenderFormat::Xlsx)
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(RenderFormat::Markdown),
            "html" | "htm" => Ok(RenderFormat::Html),
            "latex" | "tex" => Ok(RenderFormat::Latex),
            "rtf" => Ok(RenderFormat::Rtf),
            "xlsx" => Ok(RenderFormat::Xlsx),
            _ => Err(RenderError::UnknownFormat(s.to_string())),
        }
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Text choices shared by every renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Header text for margin entries without their own label.
    pub total_label: String,
    /// Text for cells holding the no-data sentinel.
    pub no_data_text: String,
    /// Text for positions without any cell.
    pub empty_text: String,
    /// Repeat outer row labels on every row instead of only the first of a group.
    pub repeat_row_labels: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            total_label: "Total".to_string(),
            no_data_text: "-".to_string(),
            empty_text: String::new(),
            repeat_row_labels: false,
        }
    }
}

impl RenderOptions {
    pub fn with_total_label(mut self, label: impl Into<String>) -> Self {
        self.total_label = label.into();
        self
    }

    pub fn with_no_data_text(mut self, text: impl Into<String>) -> Self {
        self.no_data_text = text.into();
        self
    }

    pub fn with_empty_text(mut self, text: impl Into<String>) -> Self {
        self.empty_text = text.into();
        self
    }

    pub fn with_repeat_row_labels(mut self, repeat: bool) -> Self {
        self.repeat_row_labels = repeat;
        self
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// A style attribute a renderer could neither apply nor substitute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedStyleWarning {
    pub format: RenderFormat,
    pub attribute: String,
    /// How many rendered elements carried the attribute.
    pub occurrences: usize,
}

impl fmt::Display for UnsupportedStyleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} output does not support style attribute '{}' (dropped on {} element(s))",
            self.format, self.attribute, self.occurrences
        )
    }
}

/// The rendered bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Text(String),
    Binary(Vec<u8>),
}

impl Artifact {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Artifact::Text(s) => Some(s),
            Artifact::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Artifact::Text(s) => s.as_bytes(),
            Artifact::Binary(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Artifact::Text(s) => s.into_bytes(),
            Artifact::Binary(b) => b,
        }
    }
}

/// A successful render: the artifact plus the non-fatal warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub format: RenderFormat,
    pub artifact: Artifact,
    pub warnings: Vec<UnsupportedStyleWarning>,
}

impl RenderOutput {
    pub fn text(&self) -> Option<&str> {
        self.artifact.as_text()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_round_trip() {
        for format in RenderFormat::ALL {
            assert_eq!(format.to_string().parse::<RenderFormat>().unwrap(), format);
        }
        assert_eq!("MD".parse::<RenderFormat>().unwrap(), RenderFormat::Markdown);
        assert!(matches!(
            "docx".parse::<RenderFormat>(),
            Err(RenderError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: RenderOptions = serde_json::from_str(r#"{"total_label": "All"}"#).unwrap();
        assert_eq!(options.total_label, "All");
        assert_eq!(options.no_data_text, "-");
        assert!(!options.repeat_row_labels);
    }
}
