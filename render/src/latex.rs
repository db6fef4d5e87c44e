//! FILENAME: render/src/latex.rs
//! LaTeX `table` environments.
//!
//! Each facet becomes one `tabular` inside a single floating `table`. Row
//! header columns are left aligned and value columns right aligned; column
//! header spans use `\multicolumn`. Colors need `xcolor` loaded with the
//! `table` option in the preamble.

use crate::document::{RenderCell, RenderDocument, RenderTable, StyledText};
use crate::error::RenderError;
use crate::output::{Artifact, RenderFormat, RenderOptions};
use crate::renderer::Renderer;
use model::{attr, Style, TextAlign};
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct LatexRenderer {
    options: RenderOptions,
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '\\' | '%'))
}

fn align_letter(align: TextAlign) -> Option<char> {
    match align {
        TextAlign::Left => Some('l'),
        TextAlign::Center => Some('c'),
        TextAlign::Right => Some('r'),
        TextAlign::General => None,
    }
}

impl LatexRenderer {
    pub fn new(options: RenderOptions) -> Self {
        LatexRenderer { options }
    }

    /// Escapes `text` and wraps it in the commands for its style.
    fn decorate(&self, text: &str, style: &Style) -> String {
        let mut text = self.escape_text(text);
        if text.is_empty() {
            return text;
        }
        if style.is_bold() {
            text = format!("\\textbf{{{}}}", text);
        }
        if style.is_italic() {
            text = format!("\\textit{{{}}}", text);
        }
        if style.is_underline() {
            text = format!("\\underline{{{}}}", text);
        }
        if let Some(color) = style.color() {
            text = format!("\\textcolor[HTML]{{{}}}{{{}}}", color.to_hex_digits(), text);
        }
        text
    }

    fn styled_line(&self, text: &StyledText) -> String {
        self.decorate(&text.text, &text.style)
    }

    fn cell(&self, cell: &RenderCell) -> String {
        let mut content = self.decorate(&cell.text, &cell.style);
        if let Some(background) = cell.style.background() {
            content = format!("\\cellcolor[HTML]{{{}}}{}", background.to_hex_digits(), content);
        }
        let explicit = cell.style.align().and_then(align_letter);
        if cell.col_span > 1 || explicit.is_some() {
            let letter = explicit.unwrap_or('c');
            content = format!("\\multicolumn{{{}}}{{{}}}{{{}}}", cell.col_span, letter, content);
        }
        content
    }

    fn write_row(&self, out: &mut String, row: &[RenderCell]) -> Result<(), RenderError> {
        let cells: Vec<String> = row.iter().filter(|c| !c.covered).map(|c| self.cell(c)).collect();
        writeln!(out, "{} \\\\", cells.join(" & "))?;
        Ok(())
    }

    fn write_table(&self, out: &mut String, table: &RenderTable) -> Result<(), RenderError> {
        if let Some(caption) = &table.caption {
            writeln!(out, "{}\\par", self.styled_line(caption))?;
        }
        let columns: String = (0..table.column_count())
            .map(|c| if c < table.row_header_width { 'l' } else { 'r' })
            .collect();
        writeln!(out, "\\begin{{tabular}}{{{}}}", columns)?;
        out.push_str("\\hline\n");
        for row in &table.header_rows {
            self.write_row(out, row)?;
        }
        out.push_str("\\hline\n");

        // Border styles add rules between body rows; the frame is always drawn
        let last = table.body_rows.len().saturating_sub(1);
        let mut ruled = true;
        for (i, row) in table.body_rows.iter().enumerate() {
            if i > 0 && !ruled && row.iter().any(|c| c.style.has_border_top()) {
                out.push_str("\\hline\n");
            }
            self.write_row(out, row)?;
            ruled = false;
            if i < last && row.iter().any(|c| c.style.has_border_bottom()) {
                out.push_str("\\hline\n");
                ruled = true;
            }
        }
        out.push_str("\\hline\n\\end{tabular}\n");
        Ok(())
    }
}

impl Renderer for LatexRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Latex
    }

    fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn escape_text(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' => escaped.push_str("\\textbackslash{}"),
                '~' => escaped.push_str("\\textasciitilde{}"),
                '^' => escaped.push_str("\\textasciicircum{}"),
                '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                '\r' => {}
                '\n' => escaped.push(' '),
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
                | attr::COLOR
                | attr::BACKGROUND
                | attr::ALIGN
                | attr::BORDER_TOP
                | attr::BORDER_BOTTOM
        )
    }

    fn emit_structure(&self, document: &RenderDocument) -> Result<Artifact, RenderError> {
        let label = match document.identifiers.get("label") {
            Some(label) if is_valid_label(label) => Some(label),
            Some(label) => {
                return Err(RenderError::InvalidMetadata(format!(
                    "'{}' is not a valid LaTeX label",
                    label
                )))
            }
            None => None,
        };

        let mut out = String::new();
        out.push_str("\\begin{table}[htbp]\n\\centering\n");
        if let Some(title) = &document.title {
            writeln!(out, "\\caption{{{}}}", self.styled_line(title))?;
        }
        if let Some(label) = label {
            writeln!(out, "\\label{{{}}}", label)?;
        }
        if let Some(subtitle) = &document.subtitle {
            let style = subtitle.style.clone().with_italic(true);
            writeln!(out, "{}\\par", self.decorate(&subtitle.text, &style))?;
        }

        for (i, table) in document.tables.iter().enumerate() {
            if i > 0 {
                out.push_str("\\medskip\n");
            }
            self.write_table(&mut out, table)?;
        }

        if !document.notes.is_empty() {
            out.push_str("\\par\\smallskip\n");
            for note in &document.notes {
                writeln!(out, "{{\\footnotesize {}}}\\par", self.styled_line(note))?;
            }
        }
        out.push_str("\\end{table}\n");
        Ok(Artifact::Text(out))
    }
}
