//! Font loading, text measurement and shaping.
//!
//! Faces are grouped by [`FontClass`] so that the CSS family lists produced by
//! the font picker ("Inter, ui-sans-serif, system-ui", "Georgia, serif", ...)
//! resolve to whatever real face of that class is installed. When nothing is
//! loaded, measurement falls back to Helvetica-like heuristic metrics and the
//! capture skips glyph painting.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};

/// Broad typeface class a CSS `font-family` list resolves to.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum FontClass {
    Sans,
    Serif,
    Mono,
}

impl FontClass {
    /// Classify a CSS `font-family` list by its first recognisable entry.
    pub fn from_css_family(family: &str) -> Self {
        for name in family.split(',') {
            let name = name.trim().trim_matches(|c| c == '"' || c == '\'').to_ascii_lowercase();
            if name.contains("mono") || name.contains("courier") || name == "consolas" {
                return FontClass::Mono;
            }
            if name == "serif" || name.contains("georgia") || name.contains("times") {
                return FontClass::Serif;
            }
            if name.contains("sans") || name == "inter" || name.contains("system-ui") {
                return FontClass::Sans;
            }
        }
        FontClass::Sans
    }

    /// Guess class and style from a font file name such as `DejaVuSerif-Bold.ttf`.
    pub fn from_file_name(name: &str) -> (Self, bool, bool) {
        let lower = name.to_ascii_lowercase();
        let class = if lower.contains("mono") || lower.contains("courier") {
            FontClass::Mono
        } else if (lower.contains("serif") && !lower.contains("sans"))
            || lower.contains("georgia")
            || lower.contains("times")
        {
            FontClass::Serif
        } else {
            FontClass::Sans
        };
        let bold = lower.contains("bold");
        let italic = lower.contains("italic") || lower.contains("oblique");
        (class, bold, italic)
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub class: FontClass,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            class: FontClass::from_css_family(family),
            bold,
            italic,
        }
    }
}

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes. Empty for the heuristic face.
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

impl FontData {
    fn heuristic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
            line_gap: 0.0,
        }
    }

    pub fn is_real(&self) -> bool {
        !self.bytes.is_empty()
    }
}

/// One shaped glyph, in px relative to the run origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub glyph_id: u16,
    pub x: f32,
    pub y: f32,
}

/// Glyph run produced by [`FontManager::shape`].
#[derive(Debug, Clone, Default)]
pub struct ShapedRun {
    pub glyphs: Vec<ShapedGlyph>,
    pub width: f32,
}

/// Well-known file names probed by [`FontManager::load_system_fonts`].
const SYSTEM_FONT_FILES: &[&str] = &[
    "DejaVuSans.ttf",
    "DejaVuSans-Bold.ttf",
    "DejaVuSans-Oblique.ttf",
    "DejaVuSerif.ttf",
    "DejaVuSerif-Bold.ttf",
    "DejaVuSerif-Italic.ttf",
    "DejaVuSansMono.ttf",
    "DejaVuSansMono-Bold.ttf",
    "LiberationSans-Regular.ttf",
    "LiberationSans-Bold.ttf",
    "LiberationSans-Italic.ttf",
    "LiberationSerif-Regular.ttf",
    "LiberationSerif-Bold.ttf",
    "LiberationSerif-Italic.ttf",
    "LiberationMono-Regular.ttf",
    "LiberationMono-Bold.ttf",
    "Arial.ttf",
    "Georgia.ttf",
    "Courier New.ttf",
];

fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/Library/Fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("C:\\Windows\\Fonts"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(&home).join(".fonts"));
        dirs.push(PathBuf::from(home).join(".local/share/fonts"));
    }
    dirs
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: BTreeMap<FontKey, FontData>,
    heuristic: FontData,
}

impl FontManager {
    /// A manager with no real faces: heuristic metrics only.
    pub fn new() -> Self {
        Self {
            fonts: BTreeMap::new(),
            heuristic: FontData::heuristic(),
        }
    }

    /// A manager preloaded with whatever well-known system faces exist.
    pub fn with_system_fonts() -> Self {
        let mut mgr = Self::new();
        let loaded = mgr.load_system_fonts();
        debug!("Loaded {loaded} system font faces");
        mgr
    }

    /// Load a TTF/OTF font from bytes.
    pub fn load_font(&mut self, class: FontClass, bold: bool, italic: bool, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| Error::Font(format!("Failed to parse font: {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };

        self.fonts.insert(FontKey { class, bold, italic }, data);
        Ok(())
    }

    /// Load a font file, deriving class and style from its file name.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (class, bold, italic) = FontClass::from_file_name(&name);
        let bytes = fs::read(path)?;
        self.load_font(class, bold, italic, bytes)?;
        debug!("Loaded font {} as {class:?} bold={bold} italic={italic}", path.display());
        Ok(())
    }

    /// Scan the usual system font directories for well-known faces. Returns
    /// the number of faces loaded; faces already present are kept.
    pub fn load_system_fonts(&mut self) -> usize {
        let mut found = Vec::new();
        for dir in system_font_dirs() {
            collect_font_files(&dir, 0, &mut found);
        }

        let mut loaded = 0;
        for path in found {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (class, bold, italic) = FontClass::from_file_name(&name);
            if self.fonts.contains_key(&FontKey { class, bold, italic }) {
                continue;
            }
            match self.load_file(&path) {
                Ok(()) => loaded += 1,
                Err(e) => warn!("Skipping font {}: {e}", path.display()),
            }
        }
        loaded
    }

    /// Best face for a key: exact match, then the same class without the
    /// italic or bold variant, then regular sans, then any loaded face.
    pub fn get(&self, key: &FontKey) -> &FontData {
        let upright = FontKey { italic: false, ..*key };
        let regular = FontKey {
            bold: false,
            italic: false,
            ..*key
        };
        let sans = FontKey {
            class: FontClass::Sans,
            bold: false,
            italic: false,
        };
        self.fonts
            .get(key)
            .or_else(|| self.fonts.get(&upright))
            .or_else(|| self.fonts.get(&regular))
            .or_else(|| self.fonts.get(&sans))
            .or_else(|| self.fonts.values().next())
            .unwrap_or(&self.heuristic)
    }

    /// True if at least one real face is loaded.
    pub fn has_real_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    /// Measure the width of a string at a given font size (in px).
    pub fn measure_text_width(&self, text: &str, font_size: f32, key: &FontKey) -> f32 {
        let data = self.get(key);
        if !data.is_real() {
            return heuristic_width(text, font_size, key);
        }
        match self.shape(text, font_size, key) {
            Some(run) => run.width,
            None => heuristic_width(text, font_size, key),
        }
    }

    /// Shape `text` with rustybuzz. `None` when no real face is available.
    pub fn shape(&self, text: &str, font_size: f32, key: &FontKey) -> Option<ShapedRun> {
        let data = self.get(key);
        if !data.is_real() {
            return None;
        }
        let face = rustybuzz::Face::from_slice(&data.bytes, 0)?;
        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.push_str(text);
        let output = rustybuzz::shape(&face, &[], buffer);

        let scale = font_size / data.units_per_em;
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::with_capacity(output.len());
        for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
            glyphs.push(ShapedGlyph {
                glyph_id: info.glyph_id as u16,
                x: pen_x + pos.x_offset as f32 * scale,
                y: -(pos.y_offset as f32) * scale,
            });
            pen_x += pos.x_advance as f32 * scale;
        }
        Some(ShapedRun { glyphs, width: pen_x })
    }

    /// Feed the outline of a glyph to `builder`, in font units.
    pub fn outline_glyph(
        &self,
        key: &FontKey,
        glyph_id: u16,
        builder: &mut dyn ttf_parser::OutlineBuilder,
    ) -> bool {
        let data = self.get(key);
        if !data.is_real() {
            return false;
        }
        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => face
                .outline_glyph(ttf_parser::GlyphId(glyph_id), builder)
                .is_some(),
            Err(_) => false,
        }
    }

    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Ascender in px for the face chosen for `key`.
    pub fn ascender_px(&self, font_size: f32, key: &FontKey) -> f32 {
        let data = self.get(key);
        data.ascender * font_size / data.units_per_em
    }

    /// Descender in px (negative below the baseline).
    pub fn descender_px(&self, font_size: f32, key: &FontKey) -> f32 {
        let data = self.get(key);
        data.descender * font_size / data.units_per_em
    }

    pub fn units_per_em(&self, key: &FontKey) -> f32 {
        self.get(key).units_per_em
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Average advance per char; bold is about 10 % wider, monospace fixed at 0.6 em.
fn heuristic_width(text: &str, font_size: f32, key: &FontKey) -> f32 {
    let avg = match (key.class, key.bold) {
        (FontClass::Mono, _) => 0.6,
        (_, true) => 0.55,
        (_, false) => 0.5,
    };
    text.chars().count() as f32 * font_size * avg
}

fn collect_font_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > 4 {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, depth + 1, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if SYSTEM_FONT_FILES.contains(&name) {
                out.push(path);
            }
        }
    }
}

/// Word-wrap text to fit within `max_width` pixels. Returns a vec of lines.
pub fn wrap_text(text: &str, font_size: f32, key: &FontKey, max_width: f32, fonts: &FontManager) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            let w = fonts.measure_text_width(&candidate, font_size, key);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
