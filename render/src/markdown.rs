//! FILENAME: render/src/markdown.rs
//! Markdown pipe tables.
//!
//! Facets are blank-line separated blocks headed by `### caption`. Pipe
//! tables have a single header line, so deeper column header levels follow
//! the delimiter row as ordinary rows. Column alignment comes from the
//! innermost header cell of each column.

use crate::document::{RenderCell, RenderDocument, RenderTable};
use crate::error::RenderError;
use crate::output::{Artifact, RenderFormat, RenderOptions};
use crate::renderer::Renderer;
use model::{attr, Style, StyleValue, TextAlign};
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    options: RenderOptions,
}

impl MarkdownRenderer {
    pub fn new(options: RenderOptions) -> Self {
        MarkdownRenderer { options }
    }

    fn write_table(&self, out: &mut String, table: &RenderTable) -> Result<(), RenderError> {
        if let Some(caption) = &table.caption {
            writeln!(out, "### {}", self.decorate(&caption.text, &caption.style))?;
            writeln!(out)?;
        }

        let mut rows = table.rows();
        let Some(first) = rows.next() else {
            return Ok(());
        };
        self.write_row(out, first)?;

        let alignments = table.header_rows.last().unwrap_or(first);
        out.push('|');
        for cell in alignments {
            let delimiter = match cell.style.align() {
                Some(TextAlign::Left) => ":---",
                Some(TextAlign::Center) => ":---:",
                Some(TextAlign::Right) => "---:",
                _ => "---",
            };
            write!(out, " {} |", delimiter)?;
        }
        out.push('\n');

        for row in rows {
            self.write_row(out, row)?;
        }
        Ok(())
    }

    fn write_row(&self, out: &mut String, row: &[RenderCell]) -> Result<(), RenderError> {
        out.push('|');
        for cell in row {
            if cell.covered {
                out.push_str("  |");
            } else {
                write!(out, " {} |", self.decorate(&cell.text, &cell.style))?;
            }
        }
        out.push('\n');
        Ok(())
    }

    /// Escapes `text` and wraps it in emphasis markers.
    fn decorate(&self, text: &str, style: &Style) -> String {
        let mut text = self.escape_text(text);
        if text.is_empty() {
            return text;
        }
        if style.is_strikethrough() {
            text = format!("~~{}~~", text);
        }
        if style.is_italic() {
            text = format!("*{}*", text);
        }
        if style.is_bold() {
            text = format!("**{}**", text);
        }
        text
    }
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Markdown
    }

    fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn escape_text(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' | '|' | '*' | '_' | '`' | '[' | ']' | '<' | '>' | '#' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                '\r' => {}
                '\n' => escaped.push_str("<br>"),
                _ => escaped.push(c),
            }
        }
        escaped
    }

    fn supports_style(&self, attribute: &str) -> bool {
        matches!(
            attribute,
            attr::BOLD | attr::ITALIC | attr::STRIKETHROUGH | attr::ALIGN
        )
    }

    fn fallback_style(&self, attribute: &str, value: &StyleValue) -> Option<(String, StyleValue)> {
        match attribute {
            attr::UNDERLINE => Some((attr::ITALIC.to_string(), value.clone())),
            _ => None,
        }
    }

    fn emit_structure(&self, document: &RenderDocument) -> Result<Artifact, RenderError> {
        let mut blocks: Vec<String> = Vec::new();

        if let Some(title) = &document.title {
            blocks.push(format!("## {}\n", self.decorate(&title.text, &title.style)));
        }
        if let Some(subtitle) = &document.subtitle {
            let style = subtitle.style.clone().with_italic(true);
            blocks.push(format!("{}\n", self.decorate(&subtitle.text, &style)));
        }
        for table in &document.tables {
            let mut block = String::new();
            self.write_table(&mut block, table)?;
            blocks.push(block);
        }
        for note in &document.notes {
            blocks.push(format!("{}\n", self.decorate(&note.text, &note.style)));
        }

        Ok(Artifact::Text(blocks.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_reserved_characters() {
        let renderer = MarkdownRenderer::default();
        assert_eq!(renderer.escape_text("a|b"), "a\\|b");
        assert_eq!(renderer.escape_text("*x* _y_ #1"), "\\*x\\* \\_y\\_ \\#1");
        assert_eq!(renderer.escape_text("line\nbreak"), "line<br>break");
        assert_eq!(renderer.escape_text("<b>"), "\\<b\\>");
    }

    #[test]
    fn test_decorate() {
        let renderer = MarkdownRenderer::default();
        let style = Style::new().with_bold(true).with_italic(true);
        assert_eq!(renderer.decorate("x", &style), "***x***");
        assert_eq!(renderer.decorate("", &style), "");
    }

    #[test]
    fn test_underline_falls_back_to_italic() {
        let renderer = MarkdownRenderer::default();
        assert!(!renderer.supports_style(attr::UNDERLINE));
        let (name, value) = renderer
            .fallback_style(attr::UNDERLINE, &StyleValue::Bool(true))
            .unwrap();
        assert_eq!(name, attr::ITALIC);
        assert_eq!(value, StyleValue::Bool(true));
        assert!(renderer.fallback_style(attr::FONT_SIZE, &StyleValue::Integer(9)).is_none());
    }
}
