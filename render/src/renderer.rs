//! FILENAME: render/src/renderer.rs
//! The contract every output backend implements.
//!
//! A backend declares its escaping table and which style attributes it can
//! express; the shared `render` implementation resolves the theme, filters
//! styles through those capabilities and hands the positioned document to
//! `emit_structure`.

use crate::document::RenderDocument;
use crate::error::RenderError;
use crate::output::{Artifact, RenderFormat, RenderOptions, RenderOutput};
use arrangement_engine::Grid;
use model::{Metadata, StyleValue, Theme};

pub trait Renderer: Send + Sync {
    fn format(&self) -> RenderFormat;

    fn options(&self) -> &RenderOptions;

    /// Encodes plain text for this format's grammar.
    fn escape_text(&self, text: &str) -> String;

    fn supports_style(&self, attribute: &str) -> bool;

    /// An equivalent supported attribute for one this format cannot express.
    fn fallback_style(&self, _attribute: &str, _value: &StyleValue) -> Option<(String, StyleValue)> {
        None
    }

    /// Writes a laid-out document. Text in the document is unescaped.
    fn emit_structure(&self, document: &RenderDocument) -> Result<Artifact, RenderError>;

    fn render(
        &self,
        grid: &Grid,
        theme: &Theme,
        metadata: &Metadata,
    ) -> Result<RenderOutput, RenderError> {
        let (document, warnings) = RenderDocument::build(grid, theme, metadata, self);
        for warning in &warnings {
            log::warn!("{}", warning);
        }
        let artifact = self.emit_structure(&document)?;
        Ok(RenderOutput {
            format: self.format(),
            artifact,
            warnings,
        })
    }
}
