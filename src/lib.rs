//! # resume-forge – resume editor core
//!
//! An editing session holds profile, skills, experience and education data
//! and renders a live preview in a controlled HTML subset. Exporting turns
//! that preview into a paginated A4 PDF:
//!
//! 1. **Edit** – session state and design choices ([`editor`], [`model`])
//! 2. **Preview** – session → HTML for one of three layouts ([`templates`]),
//!    parsed into a document tree ([`dom`])
//! 3. **Capture** – style ([`style`]), lay out with Taffy ([`layout`]) and
//!    rasterize the preview root at 2x ([`capture`])
//! 4. **Paginate** – slide the raster across A4 pages ([`pagination`],
//!    [`page_layout`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! User-supplied colors are normalized to `#rrggbb` by [`color`]. The
//! [`pipeline`] module ties capture, pagination and rendering together.
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod capture;
pub mod color;
pub mod dom;
pub mod editor;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod layout;
pub mod model;
pub mod page_layout;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod style;
pub mod templates;

// Re-exports for convenience
pub use capture::{CaptureOptions, CapturedImage, Capturer, RasterCapturer};
pub use color::{resolve_color, ColorProbe, CssColorProbe, DocumentProbe, HexColor};
pub use editor::ResumeEditor;
pub use error::{Error, Result};
pub use pipeline::{sanitize_file_name, ExportConfig, ExportedPdf, Exporter};
