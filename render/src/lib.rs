//! FILENAME: render/src/lib.rs
//! Output backends for Tabula.
//!
//! A renderer turns an arranged Grid, a Theme and Metadata into one
//! artifact. The shared pipeline lives in `renderer` and `document`; each
//! backend module only knows its own syntax.
//!
//! Layers:
//! - `output`: Formats, options and results (WHAT comes out)
//! - `document`: Format-neutral layout with resolved styles
//! - `renderer`: The backend contract and the shared render pipeline
//! - `markdown`, `html`, `latex`, `rtf`, `xlsx_writer`: The backends

pub mod document;
pub mod error;
pub mod html;
pub mod latex;
pub mod markdown;
pub mod output;
pub mod renderer;
pub mod rtf;
pub mod xlsx_writer;

pub use document::{CellKind, RenderCell, RenderDocument, RenderTable, StyledText};
pub use error::RenderError;
pub use html::HtmlRenderer;
pub use latex::LatexRenderer;
pub use markdown::MarkdownRenderer;
pub use output::{Artifact, RenderFormat, RenderOptions, RenderOutput, UnsupportedStyleWarning};
pub use renderer::Renderer;
pub use rtf::RtfRenderer;
pub use xlsx_writer::XlsxRenderer;

/// The built-in renderer for `format`.
pub fn renderer_for(format: RenderFormat, options: RenderOptions) -> Box<dyn Renderer> {
    match format {
        RenderFormat::Markdown => Box::new(MarkdownRenderer::new(options)),
        RenderFormat::Html => Box::new(HtmlRenderer::new(options)),
        RenderFormat::Latex => Box::new(LatexRenderer::new(options)),
        RenderFormat::Rtf => Box::new(RtfRenderer::new(options)),
        RenderFormat::Xlsx => Box::new(XlsxRenderer::new(options)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrangement_engine::{arrange, AggregatorRegistry, ArrangementSpec, Grid, MarginSpec};
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use model::{Assignment, Cell, CellStore, DimensionIndex, Metadata, Scope, Selector, Style, Theme};
    use std::io::Cursor;
    use std::sync::Arc;

    fn grid(spec: &ArrangementSpec) -> Grid {
        let index = DimensionIndex::new()
            .with_dimension("V1", ["A", "B"])
            .unwrap()
            .with_dimension("V2", ["C", "D"])
            .unwrap();
        let cells = [("A", "C", 1.0), ("A", "D", 2.0), ("B", "C", 3.0), ("B", "D", 4.0)]
            .into_iter()
            .map(|(v1, v2, n)| Cell::new(Assignment::new().with("V1", v1).with("V2", v2), "n", n));
        let store = CellStore::from_cells(Arc::new(index), cells).unwrap();
        arrange(&store, spec, &AggregatorRegistry::new()).unwrap()
    }

    fn plain() -> ArrangementSpec {
        ArrangementSpec::new().with_rows(["V1"]).with_columns(["V2"])
    }

    #[test]
    fn test_markdown_document() {
        let metadata = Metadata::new().with_title("Survival").with_note("Source: test");
        let output = MarkdownRenderer::default()
            .render(&grid(&plain()), &Theme::new(), &metadata)
            .unwrap();
        assert_eq!(
            output.text().unwrap(),
            "## Survival\n\n\
             | V1 | C | D |\n\
             | --- | --- | --- |\n\
             | A | 1 | 2 |\n\
             | B | 3 | 4 |\n\
             \n\
             Source: test\n"
        );
        assert!(!output.has_warnings());
    }

    #[test]
    fn test_every_format_renders() {
        let spec = plain().with_margin(MarginSpec::sum(["V1"]));
        let grid = grid(&spec);
        for format in RenderFormat::ALL {
            let renderer = renderer_for(format, RenderOptions::default());
            let output = renderer.render(&grid, &Theme::new(), &Metadata::new()).unwrap();
            assert_eq!(output.format, format);
            assert_eq!(output.text().is_none(), format.is_binary());
            if let Some(text) = output.text() {
                assert!(text.contains("Total"), "{} output lacks the margin row", format);
            }
        }
    }

    #[test]
    fn test_html_structure() {
        let theme = Theme::new().rule(Selector::scope(Scope::Margin), Style::new().with_bold(true));
        let metadata = Metadata::new().with_title("A & B").with_identifier("id", "t1");
        let output = HtmlRenderer::default()
            .render(&grid(&plain().with_margin(MarginSpec::sum(["V2"]))), &theme, &metadata)
            .unwrap();
        let html = output.text().unwrap();
        assert!(html.starts_with("<div class=\"tabula\" id=\"t1\">"));
        assert!(html.contains("<h2 class=\"title\">A &amp; B</h2>"));
        assert!(html.contains("<th scope=\"col\">C</th>"));
        assert!(html.contains("<td class=\"margin\" style=\"font-weight: bold\">3</td>"));
        assert!(html.ends_with("</div>\n"));
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        let grid = grid(&plain());
        let bad_id = Metadata::new().with_identifier("id", "not valid");
        assert!(matches!(
            HtmlRenderer::default().render(&grid, &Theme::new(), &bad_id),
            Err(RenderError::InvalidMetadata(_))
        ));
        let bad_label = Metadata::new().with_identifier("label", "tab{1}");
        assert!(matches!(
            LatexRenderer::default().render(&grid, &Theme::new(), &bad_label),
            Err(RenderError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_unsupported_styles_warn_per_format() {
        let theme = Theme::new().rule(
            Selector::scope(Scope::Cell),
            Style::new().with_font_family("Courier").with_font_size(9),
        );
        let grid = grid(&plain());

        let latex = LatexRenderer::default().render(&grid, &theme, &Metadata::new()).unwrap();
        let attributes: Vec<&str> = latex.warnings.iter().map(|w| w.attribute.as_str()).collect();
        assert_eq!(attributes, vec!["font_family", "font_size"]);
        assert!(latex.warnings.iter().all(|w| w.occurrences == 4));

        let rtf = RtfRenderer::default().render(&grid, &theme, &Metadata::new()).unwrap();
        assert_eq!(rtf.warnings.len(), 1);
        assert_eq!(rtf.warnings[0].attribute, "font_family");

        let html = HtmlRenderer::default().render(&grid, &theme, &Metadata::new()).unwrap();
        assert!(!html.has_warnings());
    }

    #[test]
    fn test_latex_table() {
        let metadata = Metadata::new().with_title("50% done").with_identifier("label", "tab:x");
        let output = LatexRenderer::default()
            .render(&grid(&plain()), &Theme::new(), &metadata)
            .unwrap();
        let latex = output.text().unwrap();
        assert!(latex.contains("\\caption{50\\% done}\n\\label{tab:x}\n"));
        assert!(latex.contains("\\begin{tabular}{lrr}\n\\hline\nV1 & C & D \\\\\n\\hline\nA & 1 & 2 \\\\\n"));
        assert!(latex.ends_with("\\end{table}\n"));
    }

    #[test]
    fn test_rtf_document() {
        let output = RtfRenderer::default()
            .render(&grid(&plain()), &Theme::new(), &Metadata::new().with_title("Café"))
            .unwrap();
        let rtf = output.text().unwrap();
        assert!(rtf.starts_with("{\\rtf1\\ansi"));
        assert!(rtf.contains("Caf\\u233?"));
        assert_eq!(rtf.matches("\\row").count(), 3);
        assert!(rtf.ends_with("}\n"));
    }

    #[test]
    fn test_xlsx_reads_back() {
        let spec = plain().with_facets(["V2"]).with_columns(Vec::<String>::new());
        let metadata = Metadata::new().with_title("Counts");
        let output = XlsxRenderer::default()
            .render(&grid(&spec), &Theme::new(), &metadata)
            .unwrap();
        let bytes = output.artifact.into_bytes();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["V2 = C".to_string(), "V2 = D".to_string()]);

        let range = workbook.worksheet_range("V2 = D").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Counts".to_string())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::String("V2 = D".to_string())));
        // Header row, then one row per V1 level with the count in column 1
        assert_eq!(range.get_value((3, 0)), Some(&Data::String("V1".to_string())));
        assert_eq!(range.get_value((4, 0)), Some(&Data::String("A".to_string())));
        assert_eq!(range.get_value((4, 1)), Some(&Data::Float(2.0)));
        assert_eq!(range.get_value((5, 1)), Some(&Data::Float(4.0)));
    }
}
