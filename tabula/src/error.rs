//! FILENAME: tabula/src/error.rs

use arrangement_engine::ArrangeError;
use model::ModelError;
use render::RenderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Arrange(#[from] ArrangeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
