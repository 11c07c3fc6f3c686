//! Raster capture – paints the preview root element into an RGBA image.
//!
//! The capture is the pipeline's only contact with the preview markup: it
//! styles and lays out the root subtree, then paints it depth-first with
//! tiny-skia at `CaptureOptions::scale` device pixels per CSS pixel.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{ImageFormat, RgbaImage};
use log::{debug, warn};
use tiny_skia::{
    FillRule, GradientStop, LinearGradient as SkiaGradient, Paint, PathBuilder, Pixmap, Point, Rect, SpreadMode,
    Transform,
};

use crate::dom::{Document, DomNode};
use crate::error::{Error, Result};
use crate::fonts::FontManager;
use crate::layout::{compute_layout, font_key, BoxContent, PositionedBox};
use crate::style::{build_styled_tree, Background, Color, ComputedStyle, Dimension, LinearGradient, TextAlign};

/// Width used when the root element has no fixed pixel width: A4 at 96 dpi.
pub const DEFAULT_CAPTURE_WIDTH_PX: f32 = 794.0;

/// Capture settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Device pixels per CSS pixel.
    pub scale: f32,
    /// Allow cross-origin resources. Kept for parity with browser capturers;
    /// the raster capturer never fetches anything.
    pub use_cors: bool,
    /// Per-box tracing at debug level.
    pub logging: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            use_cors: true,
            logging: false,
        }
    }
}

/// A captured raster, straight (non-premultiplied) RGBA.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub image: RgbaImage,
    pub scale: f32,
}

impl CapturedImage {
    pub fn new(image: RgbaImage, scale: f32) -> Self {
        Self { image, scale }
    }

    /// Wrap raw RGBA bytes; `None` when the buffer length does not match.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>, scale: f32) -> Option<Self> {
        RgbaImage::from_raw(width, height, rgba).map(|image| Self { image, scale })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Lossless PNG encoding of the whole capture.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }
}

pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Turns a document element into pixels.
pub trait Capturer: Send + Sync {
    fn capture(&self, document: &Document, root_id: &str, options: &CaptureOptions) -> Result<CapturedImage>;
}

/// Capturer built on the crate's style resolver, Taffy layout and tiny-skia.
pub struct RasterCapturer {
    fonts: FontManager,
    warned_no_fonts: AtomicBool,
}

impl Default for RasterCapturer {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterCapturer {
    /// Capturer using the installed system fonts.
    pub fn new() -> Self {
        Self::with_fonts(FontManager::with_system_fonts())
    }

    pub fn with_fonts(fonts: FontManager) -> Self {
        Self {
            fonts,
            warned_no_fonts: AtomicBool::new(false),
        }
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }
}

impl Capturer for RasterCapturer {
    fn capture(&self, document: &Document, root_id: &str, options: &CaptureOptions) -> Result<CapturedImage> {
        let root = document
            .element_by_id(root_id)
            .ok_or_else(|| Error::Capture(format!("no element with id {root_id:?}")))?;

        let styled = build_styled_tree(&[DomNode::Element(root.clone())], None);
        let styled_root = styled
            .first()
            .ok_or_else(|| Error::Capture(format!("element {root_id:?} is not rendered")))?;

        let width = match styled_root.style().width {
            Dimension::Px(w) => w,
            _ => DEFAULT_CAPTURE_WIDTH_PX,
        };
        let layout = compute_layout(styled_root, width, &self.fonts)?;

        let scale = options.scale;
        let px_w = (layout.width * scale).ceil().max(0.0) as u32;
        let px_h = (layout.height * scale).ceil().max(0.0) as u32;
        if px_w == 0 || px_h == 0 {
            return Err(Error::EmptyCapture {
                width: px_w,
                height: px_h,
            });
        }
        let mut pixmap = Pixmap::new(px_w, px_h)
            .ok_or_else(|| Error::Capture(format!("cannot allocate a {px_w}x{px_h} pixmap")))?;
        pixmap.fill(tiny_skia::Color::WHITE);

        if !self.fonts.has_real_fonts() && !self.warned_no_fonts.swap(true, Ordering::Relaxed) {
            warn!("No system fonts found; text is laid out but not painted");
        }

        debug!(
            "Capturing #{root_id}: {} boxes, {:.1}x{:.1} css px -> {px_w}x{px_h} px",
            layout.count(),
            layout.width,
            layout.height
        );

        let mut painter = Painter {
            pixmap: &mut pixmap,
            fonts: &self.fonts,
            scale,
            logging: options.logging,
        };
        painter.paint_box(&layout);

        Ok(CapturedImage::new(pixmap_to_rgba(&pixmap)?, scale))
    }
}

fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut raw = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        raw.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), raw)
        .ok_or_else(|| Error::Capture("pixel buffer size mismatch".to_string()))
}

fn skia_color(c: Color) -> tiny_skia::Color {
    let [r, g, b, a] = c.to_rgba8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

fn solid_paint(c: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(c));
    paint.anti_alias = true;
    paint
}

struct Painter<'a> {
    pixmap: &'a mut Pixmap,
    fonts: &'a FontManager,
    scale: f32,
    logging: bool,
}

impl Painter<'_> {
    fn paint_box(&mut self, b: &PositionedBox) {
        if self.logging {
            debug!("box at ({:.1}, {:.1}) size {:.1}x{:.1}", b.x, b.y, b.width, b.height);
        }

        self.paint_background(b);
        self.paint_borders(b);
        if let BoxContent::Text { lines } = &b.content {
            self.paint_text(b, lines);
        }
        for child in &b.children {
            self.paint_box(child);
        }
    }

    fn device_rect(&self, x: f32, y: f32, w: f32, h: f32) -> Option<Rect> {
        Rect::from_xywh(x * self.scale, y * self.scale, w * self.scale, h * self.scale)
    }

    fn paint_background(&mut self, b: &PositionedBox) {
        let Some(rect) = self.device_rect(b.x, b.y, b.width, b.height) else {
            return;
        };
        match &b.style.background {
            Background::None => {}
            Background::Solid(c) if c.is_transparent() => {}
            Background::Solid(c) => {
                self.pixmap.fill_rect(rect, &solid_paint(*c), Transform::identity(), None);
            }
            Background::LinearGradient(g) => {
                if let Some(paint) = gradient_paint(g, rect) {
                    self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
        }
    }

    fn paint_borders(&mut self, b: &PositionedBox) {
        let s = &b.style;
        if !s.has_border() || s.border_color.is_transparent() {
            return;
        }
        let [top, right, bottom, left] = s.border_widths;
        let sides = [
            (b.x, b.y, b.width, top),
            (b.x + b.width - right, b.y, right, b.height),
            (b.x, b.y + b.height - bottom, b.width, bottom),
            (b.x, b.y, left, b.height),
        ];
        let paint = solid_paint(s.border_color);
        for (x, y, w, h) in sides {
            if w <= 0.0 || h <= 0.0 {
                continue;
            }
            if let Some(rect) = self.device_rect(x, y, w, h) {
                self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }
    }

    fn paint_text(&mut self, b: &PositionedBox, lines: &[String]) {
        let s = &b.style;
        if !self.fonts.has_real_fonts() || s.color.is_transparent() {
            return;
        }
        let key = font_key(s);
        let line_h = self.fonts.line_height_px(s.font_size, s.line_height);
        let ascender = self.fonts.ascender_px(s.font_size, &key);
        let descender = self.fonts.descender_px(s.font_size, &key);
        let units_per_em = self.fonts.units_per_em(&key);

        let (content_x, content_y, content_w) = content_box(b, s);
        let paint = solid_paint(s.color);
        let glyph_scale = s.font_size / units_per_em * self.scale;

        for (i, line) in lines.iter().enumerate() {
            let Some(run) = self.fonts.shape(line, s.font_size, &key) else {
                continue;
            };
            let offset = match s.text_align {
                TextAlign::Left => 0.0,
                TextAlign::Center => ((content_w - run.width) / 2.0).max(0.0),
                TextAlign::Right => (content_w - run.width).max(0.0),
            };
            let line_top = content_y + i as f32 * line_h;
            let baseline = line_top + (line_h - (ascender - descender)) / 2.0 + ascender;

            for glyph in &run.glyphs {
                let mut converter = PathConverter {
                    builder: PathBuilder::new(),
                    scale: glyph_scale,
                    x: (content_x + offset + glyph.x) * self.scale,
                    y: (baseline + glyph.y) * self.scale,
                };
                if !self.fonts.outline_glyph(&key, glyph.glyph_id, &mut converter) {
                    continue;
                }
                if let Some(path) = converter.builder.finish() {
                    self.pixmap
                        .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
                }
            }
        }
    }
}

/// `(x, y, width)` of the content box inside padding and borders.
fn content_box(b: &PositionedBox, s: &ComputedStyle) -> (f32, f32, f32) {
    let [top, right, _, left] = s.border_widths;
    (
        b.x + s.padding_left + left,
        b.y + s.padding_top + top,
        b.width - s.padding_left - s.padding_right - left - right,
    )
}

/// Shader for a CSS `linear-gradient` over `rect` (device pixels).
fn gradient_paint(g: &LinearGradient, rect: Rect) -> Option<Paint<'static>> {
    let angle = g.angle_deg.to_radians();
    let (dx, dy) = (angle.sin(), -angle.cos());
    // CSS gradient line length: the box corners project onto its ends.
    let half_len = (rect.width() * dx.abs() + rect.height() * dy.abs()) / 2.0;
    let (cx, cy) = (rect.x() + rect.width() / 2.0, rect.y() + rect.height() / 2.0);
    let start = Point::from_xy(cx - dx * half_len, cy - dy * half_len);
    let end = Point::from_xy(cx + dx * half_len, cy + dy * half_len);

    let last = g.stops.len().saturating_sub(1).max(1) as f32;
    let stops = g
        .stops
        .iter()
        .enumerate()
        .map(|(i, c)| GradientStop::new(i as f32 / last, skia_color(*c)))
        .collect();

    let shader = SkiaGradient::new(start, end, stops, SpreadMode::Pad, Transform::identity())?;
    let mut paint = Paint::default();
    paint.shader = shader;
    paint.anti_alias = true;
    Some(paint)
}

/// Feeds ttf-parser outlines into a tiny-skia path, flipping the y axis.
struct PathConverter {
    builder: PathBuilder,
    scale: f32,
    x: f32,
    y: f32,
}

impl ttf_parser::OutlineBuilder for PathConverter {
    fn move_to(&mut self, px: f32, py: f32) {
        self.builder.move_to(self.x + px * self.scale, self.y - py * self.scale);
    }

    fn line_to(&mut self, px: f32, py: f32) {
        self.builder.line_to(self.x + px * self.scale, self.y - py * self.scale);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, px: f32, py: f32) {
        self.builder.quad_to(
            self.x + x1 * self.scale,
            self.y - y1 * self.scale,
            self.x + px * self.scale,
            self.y - py * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, px: f32, py: f32) {
        self.builder.cubic_to(
            self.x + x1 * self.scale,
            self.y - y1 * self.scale,
            self.x + x2 * self.scale,
            self.y - y2 * self.scale,
            self.x + px * self.scale,
            self.y - py * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capturer() -> RasterCapturer {
        RasterCapturer::with_fonts(FontManager::new())
    }

    #[test]
    fn captures_at_double_density() {
        let doc = Document::parse(r#"<div id="root" style="width: 100px; height: 50px"></div>"#);
        let img = capturer().capture(&doc, "root", &CaptureOptions::default()).unwrap();
        assert_eq!((img.width(), img.height()), (200, 100));
        assert_eq!(img.image.get_pixel(10, 10).0, [255, 255, 255, 255]);
    }

    #[test]
    fn paints_solid_background_and_border() {
        let doc = Document::parse(
            r#"<div id="root" class="border-b-2" style="width: 20px; height: 10px; background-color: #ff0000; border-color: #0000ff"></div>"#,
        );
        let img = capturer()
            .capture(&doc, "root", &CaptureOptions { scale: 1.0, ..Default::default() })
            .unwrap();
        assert_eq!(img.image.get_pixel(5, 2).0, [255, 0, 0, 255]);
        assert_eq!(img.image.get_pixel(5, 9).0, [0, 0, 255, 255]);
    }

    #[test]
    fn gradient_runs_left_to_right() {
        let doc = Document::parse(
            r#"<div id="root" style="width: 100px; height: 4px; background: linear-gradient(90deg, #000000, #ffffff)"></div>"#,
        );
        let img = capturer()
            .capture(&doc, "root", &CaptureOptions { scale: 1.0, ..Default::default() })
            .unwrap();
        let left = img.image.get_pixel(2, 2).0[0];
        let right = img.image.get_pixel(97, 2).0[0];
        assert!(left < 32 && right > 223, "left={left} right={right}");
    }

    #[test]
    fn missing_root_is_an_error() {
        let doc = Document::parse("<div></div>");
        assert!(matches!(
            capturer().capture(&doc, "root", &CaptureOptions::default()),
            Err(Error::Capture(_))
        ));
    }

    #[test]
    fn zero_height_root_is_empty() {
        let doc = Document::parse(r#"<div id="root" style="width: 100px"></div>"#);
        assert!(matches!(
            capturer().capture(&doc, "root", &CaptureOptions::default()),
            Err(Error::EmptyCapture { width: 200, height: 0 })
        ));
    }

    #[test]
    fn png_encoding_has_signature() {
        let img = CapturedImage::from_rgba(2, 2, vec![255; 16], 1.0).unwrap();
        let png = img.encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert!(CapturedImage::from_rgba(2, 2, vec![0; 3], 1.0).is_none());
    }
}
