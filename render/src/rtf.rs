//! FILENAME: render/src/rtf.rs
//! Rich Text Format tables.
//!
//! Every facet is a run of `\trowd` rows with fixed-width cells. Colors are
//! collected into the document color table before any row is written, so
//! the output is produced in two passes over the document.

use crate::document::{CellKind, RenderCell, RenderDocument, RenderTable, StyledText};
use crate::error::RenderError;
use crate::output::{Artifact, RenderFormat, RenderOptions};
use crate::renderer::Renderer;
use model::{attr, Color, Style, TextAlign};
use std::fmt::Write;

/// Width of one table column.
const COLUMN_TWIPS: usize = 1440;

/// Default font size in half-points.
const DEFAULT_HALF_POINTS: i64 = 20;

#[derive(Debug, Clone, Default)]
pub struct RtfRenderer {
    options: RenderOptions,
}

/// `\colortbl` entries. Index 0 is the automatic color.
#[derive(Debug, Default)]
struct ColorTable {
    colors: Vec<Color>,
}

impl ColorTable {
    fn collect(document: &RenderDocument) -> Self {
        let mut table = ColorTable::default();
        let texts = document
            .title
            .iter()
            .chain(document.subtitle.iter())
            .chain(document.notes.iter())
            .map(|t| &t.style);
        let captions = document
            .tables
            .iter()
            .filter_map(|t| t.caption.as_ref())
            .map(|c| &c.style);
        let cells = document
            .tables
            .iter()
            .flat_map(|t| t.rows())
            .flatten()
            .map(|c| &c.style);

        for style in texts.chain(captions).chain(cells) {
            for color in [style.color(), style.background()].into_iter().flatten() {
                table.index_of(color);
            }
        }
        table
    }

    fn index_of(&mut self, color: Color) -> usize {
        let opaque = Color::new(color.r, color.g, color.b);
        match self.colors.iter().position(|c| *c == opaque) {
            Some(i) => i + 1,
            None => {
                self.colors.push(opaque);
                self.colors.len()
            }
        }
    }

    fn get(&self, color: Color) -> usize {
        let opaque = Color::new(color.r, color.g, color.b);
        self.colors
            .iter()
            .position(|c| *c == opaque)
            .map_or(0, |i| i + 1)
    }

    fn write(&self, out: &mut String) -> Result<(), RenderError> {
        out.push_str("{\\colortbl;");
        for color in &self.colors {
            write!(out, "\\red{}\\green{}\\blue{};", color.r, color.g, color.b)?;
        }
        out.push_str("}\n");
        Ok(())
    }
}

impl RtfRenderer {
    pub fn new(options: RenderOptions) -> Self {
        RtfRenderer { options }
    }

    /// Character formatting group around escaped text.
    fn run(&self, text: &str, style: &Style, colors: &ColorTable) -> String {
        let escaped = self.escape_text(text);
        let mut controls = String::new();
        if style.is_bold() {
            controls.push_str("\\b");
        }
        if style.is_italic() {
            controls.push_str("\\i");
        }
        if style.is_underline() {
            controls.push_str("\\ul");
        }
        if style.is_strikethrough() {
            controls.push_str("\\strike");
        }
        if let Some(color) = style.color() {
            controls.push_str(&format!("\\cf{}", colors.get(color)));
        }
        if let Some(size) = style.font_size() {
            controls.push_str(&format!("\\fs{}", size * 2));
        }
        if controls.is_empty() {
            escaped
        } else {
            format!("{{{} {}}}", controls, escaped)
        }
    }

    fn paragraph(&self, out: &mut String, text: &StyledText, colors: &ColorTable) -> Result<(), RenderError> {
        writeln!(
            out,
            "\\pard\\plain{} {}\\par",
            alignment(text.style.align(), false),
            self.run(&text.text, &text.style, colors)
        )?;
        Ok(())
    }

    fn write_table(&self, out: &mut String, table: &RenderTable, colors: &ColorTable) -> Result<(), RenderError> {
        if let Some(caption) = &table.caption {
            self.paragraph(out, caption, colors)?;
        }
        for row in table.rows() {
            self.write_row(out, row, colors)?;
        }
        out.push_str("\\pard\\par\n");
        Ok(())
    }

    fn write_row(&self, out: &mut String, row: &[RenderCell], colors: &ColorTable) -> Result<(), RenderError> {
        out.push_str("\\trowd\\trgaph108");
        let mut spanning = 0;
        for (i, cell) in row.iter().enumerate() {
            if cell.covered && spanning > 0 {
                out.push_str("\\clmrg");
                spanning -= 1;
            } else if cell.col_span > 1 {
                out.push_str("\\clmgf");
                spanning = cell.col_span - 1;
            }
            if cell.style.has_border_top() {
                out.push_str("\\clbrdrt\\brdrs\\brdrw10");
            }
            if cell.style.has_border_bottom() {
                out.push_str("\\clbrdrb\\brdrs\\brdrw10");
            }
            if let Some(background) = cell.style.background() {
                write!(out, "\\clcbpat{}", colors.get(background))?;
            }
            write!(out, "\\cellx{}", (i + 1) * COLUMN_TWIPS)?;
        }
        out.push('\n');

        for cell in row {
            let numeric = matches!(cell.kind, CellKind::Data | CellKind::Margin);
            let text = if cell.covered { "" } else { cell.text.as_str() };
            writeln!(
                out,
                "\\pard\\intbl{} {}\\cell",
                alignment(cell.style.align(), numeric),
                self.run(text, &cell.style, colors)
            )?;
        }
        out.push_str("\\row\n");
        Ok(())
    }
}

fn alignment(align: Option<TextAlign>, numeric: bool) -> &'static str {
    match align {
        Some(TextAlign::Left) => "\\ql",
        Some(TextAlign::Center) => "\\qc",
        Some(TextAlign::Right) => "\\qr",
        Some(TextAlign::General) | None if numeric => "\\qr",
        Some(TextAlign::General) | None => "\\ql",
    }
}

impl Renderer for RtfRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Rtf
    }

    fn options(&self) -> &RenderOptions {
        &self.options
    }

    fn escape_text(&self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' | '{' | '}' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                '\r' => {}
                '\n' => escaped.push_str("\\line "),
                c if c.is_ascii() => escaped.push(c),
                c => {
                    // RTF \u takes a signed 16-bit value per UTF-16 unit
                    let mut units = [0u16; 2];
                    for unit in c.encode_utf16(&mut units) {
                        escaped.push_str(&format!("\\u{}?", *unit as i16));
                    }
                }
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
                | attr::FONT_SIZE
                | attr::BORDER_TOP
                | attr::BORDER_BOTTOM
        )
    }

    fn emit_structure(&self, document: &RenderDocument) -> Result<Artifact, RenderError> {
        let colors = ColorTable::collect(document);

        let mut out = String::new();
        out.push_str("{\\rtf1\\ansi\\deff0\n{\\fonttbl{\\f0 Helvetica;}}\n");
        colors.write(&mut out)?;
        writeln!(out, "\\f0\\fs{}", DEFAULT_HALF_POINTS)?;

        if let Some(title) = &document.title {
            let style = title.style.clone().with_bold(true);
            let title = StyledText {
                text: title.text.clone(),
                style,
            };
            self.paragraph(&mut out, &title, &colors)?;
        }
        if let Some(subtitle) = &document.subtitle {
            self.paragraph(&mut out, subtitle, &colors)?;
        }
        for table in &document.tables {
            self.write_table(&mut out, table, &colors)?;
        }
        for note in &document.notes {
            self.paragraph(&mut out, note, &colors)?;
        }
        out.push_str("}\n");
        Ok(Artifact::Text(out))
    }
}
