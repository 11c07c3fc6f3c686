//! Integration tests for the resume-forge pipeline.
//!
//! These tests validate:
//! - Color normalization across hex, rgb() and probed values
//! - Page planning for captures of various heights
//! - Output file naming
//! - Editor scenarios through to a valid PDF
//! - Export guards: background restore and re-entrancy

use std::sync::{mpsc, Mutex};
use std::thread;

use sha2::{Digest, Sha256};

use resume_forge::capture::{CaptureOptions, CapturedImage, Capturer, RasterCapturer};
use resume_forge::color::{resolve_color, CssColorProbe, DocumentProbe, HexColor};
use resume_forge::dom::Document;
use resume_forge::editor::ResumeEditor;
use resume_forge::error::{Error, Result};
use resume_forge::fonts::FontManager;
use resume_forge::model::{ExperienceField, ProfileField, Template};
use resume_forge::page_layout::Slicing;
use resume_forge::pagination::{plan_pages, PageGeometry};
use resume_forge::pipeline::{sanitize_file_name, ExportConfig, Exporter};
use resume_forge::templates::PREVIEW_ROOT_ID;

// =====================================================================
// Helpers
// =====================================================================

fn fallback() -> HexColor {
    HexColor::default_accent()
}

/// Exporter that never touches system fonts, so pixels do not depend on
/// the machine running the tests.
fn heuristic_exporter(config: ExportConfig) -> Exporter<RasterCapturer> {
    Exporter::with_capturer(RasterCapturer::with_fonts(FontManager::new()), config)
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn pixel_hash(image: &CapturedImage) -> Vec<u8> {
    Sha256::digest(image.image.as_raw()).to_vec()
}

// =====================================================================
// Color resolution
// =====================================================================

#[test]
fn short_hex_expands() {
    assert_eq!(resolve_color("#abc", &fallback(), None).as_str(), "#aabbcc");
    assert_eq!(resolve_color("  #ABC ", &fallback(), None).as_str(), "#aabbcc");
}

#[test]
fn long_hex_is_lowercased() {
    assert_eq!(resolve_color("#0EA5A4", &fallback(), None).as_str(), "#0ea5a4");
}

#[test]
fn rgb_functions_ignore_alpha() {
    assert_eq!(resolve_color("rgb(255, 0, 0)", &fallback(), None).as_str(), "#ff0000");
    assert_eq!(resolve_color("rgba(255, 0, 0, 0.5)", &fallback(), None).as_str(), "#ff0000");
    assert_eq!(resolve_color("RGB(1,2,3)", &fallback(), None).as_str(), "#010203");
}

#[test]
fn out_of_range_channels_clamp() {
    assert_eq!(resolve_color("rgb(300, 0, 0)", &fallback(), None).as_str(), "#ff0000");
}

#[test]
fn unresolvable_values_fall_back() {
    let custom = HexColor::parse("#123456").unwrap();
    for input in ["", "   ", "rgb(red)", "not-a-color", "#12", "#abcd"] {
        assert_eq!(resolve_color(input, &custom, None), custom, "input {input:?}");
    }
    assert_eq!(
        resolve_color("not-a-color", &custom, Some(&mut CssColorProbe)),
        custom
    );
}

#[test]
fn hex_output_is_a_fixed_point() {
    for input in ["#abc", "rgb(12, 200, 7)", "#FfFfFf", "rgba(0,0,0,0)"] {
        let once = resolve_color(input, &fallback(), None);
        let twice = resolve_color(once.as_str(), &fallback(), None);
        assert_eq!(once, twice);
    }
}

#[test]
fn named_colors_go_through_the_probe() {
    assert_eq!(
        resolve_color("rebeccapurple", &fallback(), Some(&mut CssColorProbe)).as_str(),
        "#663399"
    );
    assert_eq!(resolve_color("rebeccapurple", &fallback(), None), fallback());
}

#[test]
fn document_probe_leaves_no_trace() {
    let editor = ResumeEditor::new();
    let mut doc = editor.preview_document();
    let before = doc.to_html();
    let resolved = resolve_color("teal", &fallback(), Some(&mut DocumentProbe::new(&mut doc)));
    assert_eq!(resolved.as_str(), "#008080");
    assert_eq!(doc.to_html(), before);

    let rejected = resolve_color("red; width: 10px", &fallback(), Some(&mut DocumentProbe::new(&mut doc)));
    assert_eq!(rejected, fallback());
    assert_eq!(doc.to_html(), before);
}

// =====================================================================
// Page planning
// =====================================================================

#[test]
fn page_count_follows_scaled_height() {
    // height_mm = h * 210 / 1560
    for (h, expected) in [(1000, 1), (2206, 1), (2207, 2), (5000, 3), (8824, 4)] {
        let plan = plan_pages(1560, h, PageGeometry::A4, Slicing::Slide, "t").unwrap();
        let height_mm = h as f64 * 210.0 / 1560.0;
        assert_eq!(plan.page_count(), expected, "h={h} ({height_mm:.2} mm)");
        assert_eq!(plan.page_count(), (height_mm / 297.0).ceil() as usize);
    }
}

#[test]
fn page_offsets_step_by_page_height() {
    let plan = plan_pages(1560, 8824, PageGeometry::A4, Slicing::Slide, "t").unwrap();
    for (i, page) in plan.pages.iter().enumerate() {
        assert_eq!(page.page_index, i);
        assert!((page.y_offset_mm + i as f32 * 297.0).abs() < 1e-3);
    }
    assert_eq!(plan.image_width_mm, 210.0);
}

#[test]
fn crop_slices_tile_the_capture() {
    let plan = plan_pages(1587, 9999, PageGeometry::A4, Slicing::Crop, "t").unwrap();
    let total: u32 = plan.pages.iter().map(|p| p.src_height_px).sum();
    assert_eq!(total, 9999);
    assert!(plan.pages.windows(2).all(|w| w[0].src_y_px + w[0].src_height_px == w[1].src_y_px));
}

// =====================================================================
// File names
// =====================================================================

#[test]
fn file_name_from_profile_name() {
    assert_eq!(sanitize_file_name("Ivan Petrov"), "Ivan_Petrov.pdf");
    assert_eq!(sanitize_file_name("Jean  Luc\tPicard"), "Jean_Luc_Picard.pdf");
    assert_eq!(sanitize_file_name(""), "resume.pdf");
}

// =====================================================================
// Editor scenarios
// =====================================================================

#[test]
fn skill_round_trip() {
    let mut editor = ResumeEditor::new();
    let before = editor.skills().to_vec();
    let idx = editor.add_skill("Go").unwrap();
    assert!(editor.preview_html().contains("Go"));
    editor.remove_skill(idx);
    assert_eq!(editor.skills(), before.as_slice());
}

#[test]
fn edits_show_up_in_preview() {
    let mut editor = ResumeEditor::empty();
    editor.update_profile(ProfileField::Name, "Ada <Lovelace>");
    let id = editor.add_experience();
    editor.update_experience(id, ExperienceField::Company, "Analytical Engines");

    let html = editor.preview_html();
    assert!(html.contains("Ada &lt;Lovelace&gt;"));
    assert!(html.contains("Analytical Engines"));
    assert!(html.contains(&format!(r#"id="{PREVIEW_ROOT_ID}""#)));
}

#[test]
fn resume_json_loads_with_fresh_ids() {
    let json = r#"{
        "profile": {"name": "Grace Hopper", "title": "Rear Admiral"},
        "skills": ["COBOL", "  ", "Compilers"],
        "experience": [{"role": "Programmer", "company": "Harvard"}, {"role": "Director"}],
        "design": {"template": "modern", "primary_color": "rgb(10, 20, 30)"}
    }"#;
    let editor = ResumeEditor::from_json(json).unwrap();
    assert_eq!(editor.profile().name, "Grace Hopper");
    assert_eq!(editor.skills(), ["COBOL".to_string(), "Compilers".to_string()]);
    assert_ne!(editor.experience()[0].id, editor.experience()[1].id);
    assert_eq!(editor.design().template, Template::Modern);
    assert_eq!(editor.accent().as_str(), "#0a141e");

    assert!(matches!(ResumeEditor::from_json("{"), Err(Error::Json(_))));
}

#[test]
fn unparseable_color_keeps_default_accent() {
    let mut editor = ResumeEditor::new();
    editor.set_primary_color("sparkly", None);
    assert_eq!(editor.accent().as_str(), "#0ea5a4");
}

// =====================================================================
// End-to-end export
// =====================================================================

#[test]
fn sample_resume_exports_to_pdf() {
    let mut editor = ResumeEditor::new();
    editor.update_profile(ProfileField::Name, "Ivan Petrov");
    let exporter = heuristic_exporter(ExportConfig::default());

    let pdf = editor.export(&exporter).unwrap().expect("preview root present");
    assert_eq!(pdf.file_name, "Ivan_Petrov.pdf");
    assert!(pdf.page_count >= 1);
    assert_eq!(pdf.page_count, pdf.plan.page_count());
    // 780 CSS px at 2x.
    assert_eq!(pdf.plan.image_width_px, 1560);
    assert_valid_pdf(&pdf.bytes);
    assert!(!exporter.is_exporting());
}

#[test]
fn crop_mode_exports_to_pdf() {
    let editor = ResumeEditor::new();
    let config = ExportConfig {
        slicing: Slicing::Crop,
        ..ExportConfig::default()
    };
    let pdf = editor.export(&heuristic_exporter(config)).unwrap().unwrap();
    assert_valid_pdf(&pdf.bytes);
}

#[test]
fn missing_root_is_not_an_error() {
    let exporter = heuristic_exporter(ExportConfig::default());
    let mut doc = Document::parse("<div>nothing to see</div>");
    assert!(exporter.export(&mut doc, "x").unwrap().is_none());
    assert!(!exporter.is_exporting());
}

#[test]
fn background_is_restored_after_export() {
    let exporter = heuristic_exporter(ExportConfig::default());

    let mut doc = ResumeEditor::new().preview_document();
    exporter.export(&mut doc, "a").unwrap();
    let root = doc.element_by_id(PREVIEW_ROOT_ID).unwrap();
    assert_eq!(root.style_property("background-color"), None);

    let mut doc = Document::parse(
        r#"<div id="resume-preview" style="width: 100px; height: 40px; background-color: #fafafa"></div>"#,
    );
    exporter.export(&mut doc, "b").unwrap();
    let root = doc.element_by_id(PREVIEW_ROOT_ID).unwrap();
    assert_eq!(root.style_property("background-color").as_deref(), Some("#fafafa"));
}

/// Records the root background seen during capture, then fails.
struct FailingCapturer {
    seen: Mutex<Option<String>>,
}

impl Capturer for FailingCapturer {
    fn capture(&self, document: &Document, root_id: &str, _options: &CaptureOptions) -> Result<CapturedImage> {
        let root = document.element_by_id(root_id).unwrap();
        *self.seen.lock().unwrap() = root.style_property("background-color");
        Err(Error::Capture("simulated failure".into()))
    }
}

#[test]
fn background_is_restored_when_capture_fails() {
    let exporter = Exporter::with_capturer(
        FailingCapturer {
            seen: Mutex::new(None),
        },
        ExportConfig::default(),
    );
    let mut doc = Document::parse(r#"<div id="resume-preview" style="background-color: navy"></div>"#);

    let err = exporter.export(&mut doc, "x").unwrap_err();
    assert!(matches!(err, Error::Capture(_)));
    assert_eq!(exporter.capturer().seen.lock().unwrap().as_deref(), Some("#ffffff"));
    let root = doc.element_by_id(PREVIEW_ROOT_ID).unwrap();
    assert_eq!(root.style_property("background-color").as_deref(), Some("navy"));
    assert!(!exporter.is_exporting());
}

/// Blocks inside `capture` until released, so a second export can be
/// attempted while the first is in flight.
struct BlockingCapturer {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl Capturer for BlockingCapturer {
    fn capture(&self, _document: &Document, _root_id: &str, options: &CaptureOptions) -> Result<CapturedImage> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(CapturedImage::from_rgba(10, 30, vec![255; 10 * 30 * 4], options.scale).unwrap())
    }
}

#[test]
fn concurrent_export_is_rejected() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let exporter = Exporter::with_capturer(
        BlockingCapturer {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        },
        ExportConfig::default(),
    );

    thread::scope(|s| {
        let first = s.spawn(|| {
            let mut doc = Document::parse(r#"<div id="resume-preview"></div>"#);
            exporter.export(&mut doc, "First Export")
        });

        entered_rx.recv().unwrap();
        assert!(exporter.is_exporting());

        let mut doc = Document::parse(r#"<div id="resume-preview"></div>"#);
        assert!(matches!(
            exporter.export(&mut doc, "second"),
            Err(Error::ExportInProgress)
        ));
        assert_eq!(doc.element_by_id(PREVIEW_ROOT_ID).unwrap().inline_style(), None);

        release_tx.send(()).unwrap();
        let pdf = first.join().unwrap().unwrap().unwrap();
        assert_eq!(pdf.file_name, "First_Export.pdf");
        assert_eq!(pdf.page_count, 3);
    });

    assert!(!exporter.is_exporting());
}

#[test]
fn capture_is_deterministic() {
    let capturer = RasterCapturer::with_fonts(FontManager::new());
    let options = CaptureOptions::default();

    let mut editor = ResumeEditor::new();
    editor.set_template(Template::Modern);
    let doc = editor.preview_document();
    let a = capturer.capture(&doc, PREVIEW_ROOT_ID, &options).unwrap();
    let b = capturer.capture(&doc, PREVIEW_ROOT_ID, &options).unwrap();
    assert_eq!(pixel_hash(&a), pixel_hash(&b));

    // The modern header gradient starts at the accent.
    editor.set_primary_color("#ff0000", None);
    let c = capturer
        .capture(&editor.preview_document(), PREVIEW_ROOT_ID, &options)
        .unwrap();
    assert_ne!(pixel_hash(&a), pixel_hash(&c));
}

#[test]
fn exported_pdf_is_saved_under_its_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut editor = ResumeEditor::new();
    editor.update_profile(ProfileField::Name, "  Ivan   Petrov ");
    let pdf = editor
        .export(&heuristic_exporter(ExportConfig::default()))
        .unwrap()
        .unwrap();

    let path = pdf.save_to(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("Ivan_Petrov.pdf"));
    let bytes = std::fs::read(&path).unwrap();
    assert_valid_pdf(&bytes);
}
