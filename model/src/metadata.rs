//! FILENAME: model/src/metadata.rs
//! Table metadata: title, subtitle, notes and free-form identifiers.
//! Opaque to the arrangement engine; only renderers read it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,

    /// Footnotes, rendered in order below the table.
    #[serde(default)]
    pub notes: Vec<String>,

    /// Renderer-specific identifiers (e.g. an HTML `id`, a LaTeX `label`).
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Metadata::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_identifier(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.identifiers.insert(name.into(), value.into());
        self
    }

    pub fn identifier(&self, name: &str) -> Option<&str> {
        self.identifiers.get(name).map(String::as_str)
    }
}
