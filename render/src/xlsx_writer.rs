//! FILENAME: render/src/xlsx_writer.rs
//! XLSX workbooks via rust_xlsxwriter.
//!
//! One worksheet per facet. Values keep their type: numbers are written as
//! numbers with an Excel number format derived from the style, so the
//! spreadsheet shows the same digits as the text formats while keeping
//! full precision in the cell.

use crate::document::{CellKind, RenderCell, RenderDocument, RenderTable, StyledText};
use crate::error::RenderError;
use crate::output::{Artifact, RenderFormat, RenderOptions};
use crate::renderer::Renderer;
use model::{attr, CellValue, Color, Style, TextAlign};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, FormatUnderline, Workbook, Worksheet};
use rustc_hash::FxHashSet;

const MAX_SHEET_NAME: usize = 31;
const MIN_COLUMN_WIDTH: f64 = 8.0;
const MAX_COLUMN_WIDTH: f64 = 60.0;

#[derive(Debug, Clone, Default)]
pub struct XlsxRenderer {
    options: RenderOptions,
}

impl XlsxRenderer {
    pub fn new(options: RenderOptions) -> Self {
        XlsxRenderer { options }
    }

    fn write_sheet(
        &self,
        worksheet: &mut Worksheet,
        document: &RenderDocument,
        table: &RenderTable,
    ) -> Result<(), RenderError> {
        let mut row: u32 = 0;

        if let Some(title) = &document.title {
            let style = title.style.clone().with_bold(true);
            worksheet.write_string_with_format(row, 0, &title.text, &convert_style_to_format(&style))?;
            row += 1;
        }
        if let Some(subtitle) = &document.subtitle {
            write_styled(worksheet, row, subtitle)?;
            row += 1;
        }
        if let Some(caption) = &table.caption {
            write_styled(worksheet, row, caption)?;
            row += 1;
        }
        if row > 0 {
            row += 1;
        }

        for cells in table.rows() {
            for (col, cell) in cells.iter().enumerate() {
                self.write_cell(worksheet, row, col as u16, cell)?;
            }
            row += 1;
        }

        if !document.notes.is_empty() {
            row += 1;
            for note in &document.notes {
                write_styled(worksheet, row, note)?;
                row += 1;
            }
        }

        for (col, width) in column_widths(table).into_iter().enumerate() {
            worksheet.set_column_width(col as u16, width)?;
        }
        Ok(())
    }

    fn write_cell(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        cell: &RenderCell,
    ) -> Result<(), RenderError> {
        if cell.covered {
            return Ok(());
        }
        let format = convert_style_to_format(&cell.style);

        if cell.col_span > 1 {
            let last = col + (cell.col_span - 1) as u16;
            worksheet.merge_range(row, col, row, last, &cell.text, &format)?;
            return Ok(());
        }

        match (&cell.value, cell.kind) {
            (Some(CellValue::Number(n)), CellKind::Data | CellKind::Margin) if n.is_finite() => {
                // General grouping prints integers without a trailing point
                if n.fract() == 0.0 && is_general_grouping(&cell.style) {
                    let whole = convert_style_to_format(&cell.style.clone().with_decimals(0));
                    worksheet.write_number_with_format(row, col, *n, &whole)?;
                } else {
                    worksheet.write_number_with_format(row, col, *n, &format)?;
                }
            }
            (Some(CellValue::Boolean(b)), CellKind::Data | CellKind::Margin) => {
                worksheet.write_boolean_with_format(row, col, *b, &format)?;
            }
            _ if cell.text.is_empty() => {
                if !cell.style.is_empty() {
                    worksheet.write_blank(row, col, &format)?;
                }
            }
            _ => {
                worksheet.write_string_with_format(row, col, &cell.text, &format)?;
            }
        }
        Ok(())
    }
}

fn write_styled(worksheet: &mut Worksheet, row: u32, text: &StyledText) -> Result<(), RenderError> {
    worksheet.write_string_with_format(row, 0, &text.text, &convert_style_to_format(&text.style))?;
    Ok(())
}

/// Width per column from its longest text, in Excel character units.
fn column_widths(table: &RenderTable) -> Vec<f64> {
    let mut widths = vec![MIN_COLUMN_WIDTH; table.column_count()];
    for cells in table.rows() {
        for (col, cell) in cells.iter().enumerate() {
            if cell.col_span > 1 || col >= widths.len() {
                continue;
            }
            let width = (cell.text.chars().count() as f64 + 2.0).min(MAX_COLUMN_WIDTH);
            if width > widths[col] {
                widths[col] = width;
            }
        }
    }
    widths
}

/// Builds a cell format from a resolved style.
pub fn convert_style_to_format(style: &Style) -> Format {
    let mut format = Format::new();

    // Font settings
    if style.is_bold() {
        format = format.set_bold();
    }
    if style.is_italic() {
        format = format.set_italic();
    }
    if style.is_underline() {
        format = format.set_underline(FormatUnderline::Single);
    }
    if style.is_strikethrough() {
        format = format.set_font_strikethrough();
    }
    if let Some(size) = style.font_size() {
        format = format.set_font_size(size as f64);
    }
    if let Some(family) = style.font_family() {
        format = format.set_font_name(family);
    }

    // Colors
    if let Some(color) = style.color() {
        format = format.set_font_color(color_to_xlsx(&color));
    }
    if let Some(background) = style.background() {
        format = format.set_background_color(color_to_xlsx(&background));
    }

    // Horizontal alignment
    if let Some(align) = style.align() {
        format = format.set_align(match align {
            TextAlign::Left => FormatAlign::Left,
            TextAlign::Center => FormatAlign::Center,
            TextAlign::Right => FormatAlign::Right,
            TextAlign::General => FormatAlign::General,
        });
    }

    if style.has_border_top() {
        format = format.set_border_top(FormatBorder::Thin);
    }
    if style.has_border_bottom() {
        format = format.set_border_bottom(FormatBorder::Thin);
    }

    // Number format
    let num_format = convert_number_format(style);
    if !num_format.is_empty() {
        format = format.set_num_format(&num_format);
    }

    format
}

/// Excel number format code for the style's number attributes.
fn convert_number_format(style: &Style) -> String {
    let decimals = style.decimals();
    if decimals.is_none() && !style.thousands() && !style.percent() {
        return String::new();
    }
    let decimal_part = match decimals {
        Some(places) if places > 0 => format!(".{}", "0".repeat(places as usize)),
        Some(_) => String::new(),
        // Up to ten optional places, matching the general text format
        None if is_general_grouping(style) => ".##########".to_string(),
        None => String::new(),
    };
    let integer_part = if style.thousands() { "#,##0" } else { "0" };
    if style.percent() {
        format!("{}{}%", integer_part, decimal_part)
    } else {
        format!("{}{}", integer_part, decimal_part)
    }
}

/// Grouped digits with no fixed number of places.
fn is_general_grouping(style: &Style) -> bool {
    style.thousands() && style.decimals().is_none() && !style.percent()
}

fn color_to_xlsx(color: &Color) -> rust_xlsxwriter::Color {
    rust_xlsxwriter::Color::RGB(((color.r as u32) << 16) | ((color.g as u32) << 8) | (color.b as u32))
}

/// A worksheet name Excel accepts, unique among `taken` (case-insensitive).
fn sheet_name(base: &str, taken: &mut FxHashSet<String>) -> String {
    let cleaned: String = base
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let cleaned = if cleaned.is_empty() { "Table" } else { cleaned };

    let mut candidate: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    let mut n = 2;
    while taken.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = cleaned.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    taken.insert(candidate.to_lowercase());
    candidate
}

impl Renderer for XlsxRenderer {
    fn format(&self) -> RenderFormat {
        RenderFormat::Xlsx
    }

    fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Cell text is stored verbatim.
    fn escape_text(&self, text: &str) -> String {
        text.to_string()
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
        let mut workbook = Workbook::new();
        let mut taken = FxHashSet::default();

        for table in &document.tables {
            let base = table.caption.as_ref().map_or("Table", |c| c.text.as_str());
            let name = sheet_name(base, &mut taken);
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(&name)?;
            self.write_sheet(worksheet, document, table)?;
        }
        if document.tables.is_empty() {
            workbook.add_worksheet().set_name("Table")?;
        }

        log::debug!("Writing XLSX workbook with {} sheet(s)", document.tables.len());
        let bytes = workbook.save_to_buffer()?;
        Ok(Artifact::Binary(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_are_sanitized_and_unique() {
        let mut taken = FxHashSet::default();
        assert_eq!(sheet_name("Region = North/East", &mut taken), "Region = NorthEast");
        assert_eq!(sheet_name("Region = North/East", &mut taken), "Region = NorthEast (2)");
        assert_eq!(sheet_name("region = north[east]", &mut taken), "region = northeast (3)");
        assert_eq!(sheet_name("???", &mut taken), "Table");

        let long = "A very long facet caption that overflows";
        let first = sheet_name(long, &mut taken);
        assert_eq!(first.chars().count(), MAX_SHEET_NAME);
        let second = sheet_name(long, &mut taken);
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn test_number_format_codes() {
        assert_eq!(convert_number_format(&Style::new()), "");
        assert_eq!(convert_number_format(&Style::new().with_decimals(2)), "0.00");
        assert_eq!(
            convert_number_format(&Style::new().with_decimals(2).with_thousands(true)),
            "#,##0.00"
        );
        assert_eq!(
            convert_number_format(&Style::new().with_percent(true).with_decimals(1)),
            "0.0%"
        );
    }

    #[test]
    fn test_thousands_without_decimals_keeps_fraction() {
        let grouped = Style::new().with_thousands(true);
        assert_eq!(convert_number_format(&grouped), "#,##0.##########");
        assert_eq!(convert_number_format(&grouped.clone().with_decimals(0)), "#,##0");
        assert!(is_general_grouping(&grouped));
        assert!(!is_general_grouping(&grouped.with_percent(true)));
    }
}
