//! FILENAME: render/src/html.rs
//! HTML tables with inline CSS.
//!
//! The document is one `<div class="tabula">` holding the title, one
//! `<table>` per facet and the notes. Margin cells and headers carry the
//! `margin` class so stylesheets can single them out.

use crate::document::{CellKind, RenderCell, RenderDocument, RenderTable, StyledText};
use crate::error::RenderError;
use crate::output::{Artifact, RenderFormat, RenderOptions};
use crate::renderer::Renderer;
use model::{attr, Style, TextAlign};
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    options: RenderOptions,
}

/// Valid HTML id token: a letter, then letters, digits, `-`, `_`, `:` or `.`.
fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

/// Inline CSS declarations for a resolved style.
pub fn style_to_css(style: &Style) -> String {
    let mut css = Vec::new();
    if style.is_bold() {
        css.push("font-weight: bold".to_string());
    }
    if style.is_italic() {
        css.push("font-style: italic".to_string());
    }
    let decorations: Vec<&str> = [
        (style.is_underline(), "underline"),
        (style.is_strikethrough(), "line-through"),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, d)| *d)
    .collect();
    if !decorations.is_empty() {
        css.push(format!("text-decoration: {}", decorations.join(" ")));
    }
    if let Some(color) = style.color() {
        css.push(format!("color: {}", color.to_css()));
    }
    if let Some(background) = style.background() {
        css.push(format!("background-color: {}", background.to_css()));
    }
    match style.align() {
        Some(TextAlign::General) | None => {}
        Some(align) => css.push(format!("text-align: {}", align.as_str())),
    }
    if let Some(family) = style.font_family() {
        css.push(format!("font-family: {}", family));
    }
    if let Some(size) = style.font_size() {
        css.push(format!("font-size: {}pt", size));
    }
    if style.has_border_top() {
        css.push("border-top: 1px solid".to_string());
    }
    if style.has_border_bottom() {
        css.push("border-bottom: 1px solid".to_string());
    }
    css.join("; ")
}

impl HtmlRenderer {
    pub fn new(options: RenderOptions) -> Self {
        HtmlRenderer { options }
    }

    /// ` style="..."` or nothing.
    fn style_attr(&self, style: &Style) -> String {
        let css = style_to_css(style);
        if css.is_empty() {
            String::new()
        } else {
            format!(" style=\"{}\"", self.escape_text(&css))
        }
    }

    fn write_styled(&self, out: &mut String, tag: &str, class: &str, text: &StyledText) -> Result<(), RenderError> {
        writeln!(
            out,
            "<{tag} class=\"{class}\"{}>{}</{tag}>",
            self.style_attr(&text.style),
            self.escape_text(&text.text),
        )?;
        Ok(())
    }

    fn write_table(&self, out: &mut String, table: &RenderTable) -> Result<(), RenderError> {
        let class = if table.is_margin { "tabula-facet margin" } else { "tabula-facet" };
        writeln!(out, "<table class=\"{}\">", class)?;
        if let Some(caption) = &table.caption {
            writeln!(
                out,
                "<caption{}>{}</caption>",
                self.style_attr(&caption.style),
                self.escape_text(&caption.text)
            )?;
        }

        out.push_str("<thead>\n");
        for row in &table.header_rows {
            self.write_row(out, row)?;
        }
        out.push_str("</thead>\n<tbody>\n");
        for row in &table.body_rows {
            self.write_row(out, row)?;
        }
        out.push_str("</tbody>\n</table>\n");
        Ok(())
    }

    fn write_row(&self, out: &mut String, row: &[RenderCell]) -> Result<(), RenderError> {
        out.push_str("<tr>");
        for cell in row.iter().filter(|c| !c.covered) {
            let (tag, scope) = match cell.kind {
                CellKind::Corner => ("td", ""),
                CellKind::ColumnHeader => ("th", " scope=\"col\""),
                CellKind::RowHeader => ("th", " scope=\"row\""),
                CellKind::Data | CellKind::Margin | CellKind::Empty => ("td", ""),
            };
            let class = match cell.kind {
                CellKind::Margin => " class=\"margin\"",
                CellKind::Empty => " class=\"empty\"",
                _ => "",
            };
            let span = if cell.col_span > 1 {
                format!(" colspan=\"{}\"", cell.col_span)
            } else {
                String::new()
            };
            write!(
                out,
                "<{tag}{scope}{class}{span}{}>{}</{tag}>",
                self.style_attr(&cell.style),
                self.escape_text(&cell.text),
            )?;
        }
        out.push_str("</tr>\n");
        Ok(())
    }
}

impl Renderer for HtmlRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Html
    }

    fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn escape_text(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&#39;"),
                _ => escaped.push(c),
            }
        }
        escaped
    }

    fn supports_style(&self, attribute: &str) -> bool {
        matches!(
            attribute,
            attr::BOLD
                | attr::ITALIC
                | attr::UNDERLINE
                | attr::STRIKETHROUGH
                | attr::COLOR
                | attr::BACKGROUND
                | attr::ALIGN
                | attr::FONT_FAMILY
                | attr::FONT_SIZE
                | attr::BORDER_TOP
                | attr::BORDER_BOTTOM
        )
    }

    fn emit_structure(&self, document: &RenderDocument) -> Result<Artifact, RenderError> {
        let id = match document.identifiers.get("id") {
            Some(id) if is_valid_id(id) => format!(" id=\"{}\"", id),
            Some(id) => {
                return Err(RenderError::InvalidMetadata(format!(
                    "'{}' is not a valid HTML id",
                    id
                )))
            }
            None => String::new(),
        };

        let mut out = String::new();
        writeln!(out, "<div class=\"tabula\"{}>", id)?;
        if let Some(title) = &document.title {
            self.write_styled(&mut out, "h2", "title", title)?;
        }
        if let Some(subtitle) = &document.subtitle {
            self.write_styled(&mut out, "p", "subtitle", subtitle)?;
        }
        for table in &document.tables {
            self.write_table(&mut out, table)?;
        }
        for note in &document.notes {
            self.write_styled(&mut out, "p", "note", note)?;
        }
        out.push_str("</div>\n");
        Ok(Artifact::Text(out))
    }
}
