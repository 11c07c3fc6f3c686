//! Error types for resume-forge.

use std::io;
use thiserror::Error;

/// Result type alias for resume-forge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the export pipeline, the CLI and the FFI layer.
///
/// Color resolution never produces one of these: every failure there falls
/// back to a caller-supplied color.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading inputs or writing the PDF.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed resume or config JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another export on the same exporter has not finished yet.
    #[error("An export is already in progress")]
    ExportInProgress,

    /// The raster capture failed.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// The capture produced an image with a zero dimension.
    #[error("Captured image is empty ({width}x{height} px)")]
    EmptyCapture { width: u32, height: u32 },

    /// Taffy rejected the layout tree.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Encoding the captured raster (or a slice of it) failed.
    #[error("Image encoding error: {0}")]
    ImageEncode(String),

    /// printpdf rejected the document or one of its images.
    #[error("PDF composition error: {0}")]
    Pdf(String),

    /// A font file could not be parsed.
    #[error("Font loading error: {0}")]
    Font(String),

    /// The capture is too tall for its width to paginate.
    #[error("Capture would need {pages} pages (at most {max} allowed)")]
    TooManyPages { pages: u64, max: usize },

    /// Page geometry with a non-positive side.
    #[error("Invalid page geometry: {width_mm}x{height_mm} mm")]
    InvalidPage { width_mm: f32, height_mm: f32 },
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageEncode(err.to_string())
    }
}
