//! FILENAME: render/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}
