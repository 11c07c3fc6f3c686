//! Pipeline – ties together capture, PNG encoding, pagination and PDF
//! rendering into a single export call.

use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::capture::{CaptureOptions, CapturedImage, Capturer, RasterCapturer};
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::fonts::FontManager;
use crate::page_layout::{PaginatedDocument, Slicing};
use crate::pagination::{plan_pages, Orientation, PageGeometry};
use crate::render::render_pdf;
use crate::templates::PREVIEW_ROOT_ID;

/// File name used when the profile name is blank.
pub const DEFAULT_FILE_NAME: &str = "resume.pdf";

/// Configuration for the export pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// `id` of the element to capture (default: "resume-preview").
    pub root_id: String,
    /// Page size in mm (default: A4).
    pub page: PageGeometry,
    pub orientation: Orientation,
    pub slicing: Slicing,
    /// Device pixels per CSS pixel (default: 2.0).
    pub scale: f32,
    pub use_cors: bool,
    /// Per-box capture tracing.
    pub capture_logging: bool,
    /// Extra TTF/OTF files loaded before the system fonts.
    pub font_files: Vec<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root_id: PREVIEW_ROOT_ID.to_string(),
            page: PageGeometry::A4,
            orientation: Orientation::Portrait,
            slicing: Slicing::Slide,
            scale: 2.0,
            use_cors: true,
            capture_logging: false,
            font_files: Vec::new(),
        }
    }
}

impl ExportConfig {
    /// Load a JSON config file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Page geometry after applying orientation.
    pub fn geometry(&self) -> PageGeometry {
        self.page.oriented(self.orientation)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            scale: self.scale,
            use_cors: self.use_cors,
            logging: self.capture_logging,
        }
    }
}

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportedPdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub plan: PaginatedDocument,
}

impl ExportedPdf {
    /// Write the PDF into `dir` under its file name.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Output file name for a profile name: whitespace runs replaced by `_`,
/// `.pdf` appended. Path separators are replaced as well.
///
/// Leading and trailing whitespace is dropped instead of becoming `_`, so
/// `" Ivan"` gives `Ivan.pdf` and a blank name gives [`DEFAULT_FILE_NAME`]
/// rather than `_.pdf`.
pub fn sanitize_file_name(name: &str) -> String {
    let joined = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace(|c: char| c == '/' || c == '\\', "_");
    if joined.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        format!("{joined}.pdf")
    }
}

fn document_title(base_name: &str) -> &str {
    match base_name.trim() {
        "" => "Resume",
        name => name,
    }
}

/// Clears the in-flight flag on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| Error::ExportInProgress)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Forces the capture root's background to white and puts the root's
/// original `style` attribute back, byte for byte, on drop.
pub struct BackgroundOverride<'a> {
    document: &'a mut Document,
    root_id: &'a str,
    original_style: Option<String>,
}

impl<'a> BackgroundOverride<'a> {
    /// `None` if the document has no element with `root_id`.
    pub fn new(document: &'a mut Document, root_id: &'a str) -> Option<Self> {
        let root = document.element_by_id_mut(root_id)?;
        let original_style = root.attributes.get("style").cloned();
        root.set_style_property("background-color", Some("#ffffff"));
        Some(Self {
            document,
            root_id,
            original_style,
        })
    }
}

impl Deref for BackgroundOverride<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        &*self.document
    }
}

impl Drop for BackgroundOverride<'_> {
    fn drop(&mut self) {
        if let Some(root) = self.document.element_by_id_mut(self.root_id) {
            match self.original_style.take() {
                Some(style) => root.attributes.insert("style".to_string(), style),
                None => root.attributes.remove("style"),
            };
        }
    }
}

/// Captures a document element and turns it into a paginated PDF.
///
/// An exporter runs one export at a time; a call made while another is in
/// flight fails with [`Error::ExportInProgress`].
pub struct Exporter<C: Capturer = RasterCapturer> {
    capturer: C,
    config: ExportConfig,
    in_flight: AtomicBool,
}

impl Exporter<RasterCapturer> {
    /// Exporter with the raster capturer, loading `config.font_files` and
    /// then the system fonts.
    pub fn new(config: ExportConfig) -> Result<Self> {
        let mut fonts = FontManager::new();
        for path in &config.font_files {
            fonts.load_file(path)?;
        }
        let system = fonts.load_system_fonts();
        debug!("Exporter fonts: {} explicit, {system} system", config.font_files.len());
        Ok(Self::with_capturer(RasterCapturer::with_fonts(fonts), config))
    }
}

impl<C: Capturer> Exporter<C> {
    pub fn with_capturer(capturer: C, config: ExportConfig) -> Self {
        Self {
            capturer,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn capturer(&self) -> &C {
        &self.capturer
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Export the configured root element of `document`.
    ///
    /// Returns `Ok(None)` when the document has no such element. The root's
    /// inline background is restored before this returns, on every path.
    pub fn export(&self, document: &mut Document, base_name: &str) -> Result<Option<ExportedPdf>> {
        let _in_flight = InFlight::acquire(&self.in_flight)?;
        let root_id = self.config.root_id.as_str();

        let captured = {
            let Some(target) = BackgroundOverride::new(document, root_id) else {
                debug!("No element with id {root_id:?}; nothing to export");
                return Ok(None);
            };
            self.capturer.capture(&target, root_id, &self.config.capture_options())
        };
        let capture = captured?;

        let plan = plan_pages(
            capture.width(),
            capture.height(),
            self.config.geometry(),
            self.config.slicing,
            document_title(base_name),
        )?;
        let bytes = render_pdf(&plan, &capture)?;

        let file_name = sanitize_file_name(base_name);
        info!(
            "Exported {file_name}: {} page(s), {}x{} px capture, {} bytes",
            plan.page_count(),
            capture.width(),
            capture.height(),
            bytes.len()
        );
        Ok(Some(ExportedPdf {
            file_name,
            page_count: plan.page_count(),
            bytes,
            plan,
        }))
    }

    /// Export an already captured raster (no document involved).
    pub fn export_capture(&self, capture: &CapturedImage, base_name: &str) -> Result<ExportedPdf> {
        let _in_flight = InFlight::acquire(&self.in_flight)?;
        let plan = plan_pages(
            capture.width(),
            capture.height(),
            self.config.geometry(),
            self.config.slicing,
            document_title(base_name),
        )?;
        let bytes = render_pdf(&plan, capture)?;
        Ok(ExportedPdf {
            file_name: sanitize_file_name(base_name),
            page_count: plan.page_count(),
            bytes,
            plan,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::resolve_style;

    #[test]
    fn file_names() {
        assert_eq!(sanitize_file_name("Ivan Petrov"), "Ivan_Petrov.pdf");
        assert_eq!(sanitize_file_name("  Ivan \t  Petrov  "), "Ivan_Petrov.pdf");
        assert_eq!(sanitize_file_name(""), "resume.pdf");
        assert_eq!(sanitize_file_name("   "), "resume.pdf");
        assert_eq!(sanitize_file_name("a/b"), "a_b.pdf");
        assert_eq!(sanitize_file_name(" Ivan"), "Ivan.pdf");
    }

    #[test]
    fn background_override_restores_original() {
        let mut doc = Document::parse(r#"<div id="r" style="background-color: #eeeeee; color: red"></div>"#);
        {
            let guard = BackgroundOverride::new(&mut doc, "r").unwrap();
            let root = guard.element_by_id("r").unwrap();
            assert_eq!(root.style_property("background-color").as_deref(), Some("#ffffff"));
        }
        let root = doc.element_by_id("r").unwrap();
        assert_eq!(root.style_property("background-color").as_deref(), Some("#eeeeee"));
        assert_eq!(root.style_property("color").as_deref(), Some("red"));
    }

    #[test]
    fn background_override_keeps_declaration_order() {
        let style = "background-color: #ff0000; background: #0000ff";
        let mut doc = Document::parse(&format!(r#"<div id="r" style="{style}"></div>"#));
        let before = resolve_style(doc.element_by_id("r").unwrap(), None).background_color();
        assert_eq!(before.map(|c| c.to_rgba8()), Some([0, 0, 255, 255]));
        {
            let guard = BackgroundOverride::new(&mut doc, "r").unwrap();
            let during = resolve_style(guard.element_by_id("r").unwrap(), None).background_color();
            assert_eq!(during.map(|c| c.to_rgba8()), Some([255, 255, 255, 255]));
        }
        let root = doc.element_by_id("r").unwrap();
        assert_eq!(root.inline_style(), Some(style));
        assert_eq!(resolve_style(root, None).background_color(), before);
    }

    #[test]
    fn background_override_removes_when_absent() {
        let mut doc = Document::parse(r#"<div id="r"></div>"#);
        drop(BackgroundOverride::new(&mut doc, "r"));
        assert_eq!(doc.element_by_id("r").unwrap().inline_style(), None);
        assert!(BackgroundOverride::new(&mut doc, "missing").is_none());
    }

    #[test]
    fn config_defaults_from_partial_json() {
        let cfg: ExportConfig = serde_json::from_str(r#"{"slicing": "crop", "orientation": "landscape"}"#).unwrap();
        assert_eq!(cfg.slicing, Slicing::Crop);
        assert_eq!(cfg.root_id, "resume-preview");
        assert_eq!(cfg.scale, 2.0);
        assert_eq!(cfg.geometry().width_mm, 297.0);
    }

    #[test]
    fn in_flight_flag_is_released() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlight::acquire(&flag).unwrap();
            assert!(matches!(InFlight::acquire(&flag), Err(Error::ExportInProgress)));
        }
        assert!(InFlight::acquire(&flag).is_ok());
    }

    #[test]
    fn export_capture_names_and_paginates() {
        let exporter = Exporter::with_capturer(
            RasterCapturer::with_fonts(FontManager::new()),
            ExportConfig::default(),
        );
        let capture = CapturedImage::from_rgba(10, 30, vec![255; 10 * 30 * 4], 2.0).unwrap();
        let pdf = exporter.export_capture(&capture, "Ada Lovelace").unwrap();
        assert_eq!(pdf.file_name, "Ada_Lovelace.pdf");
        // 30 px at 21 mm/px = 630 mm -> 3 pages.
        assert_eq!(pdf.page_count, 3);
        assert_eq!(&pdf.bytes[..5], b"%PDF-");
    }
}
