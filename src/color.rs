//! Color resolver – normalizes a user-supplied CSS color value into a
//! canonical lowercase `#rrggbb` string.
//!
//! Hex and `rgb()`/`rgba()` inputs are handled directly. Everything else
//! (named colors, `hsl()`, ...) is handed to a [`ColorProbe`], which asks a
//! style engine for the computed color. Resolution never fails: any input
//! that cannot be resolved yields the caller's fallback.

use std::fmt;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, DomNode, ElementNode, Tag};
use crate::style::{resolve_style, Color};

/// Accent used when the user's primary color cannot be resolved.
pub const DEFAULT_ACCENT: &str = "#0ea5a4";

/// A canonical `#rrggbb` color, lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Parse a 3- or 6-digit hex literal (surrounding whitespace allowed).
    pub fn parse(value: &str) -> Option<Self> {
        let caps = hex_regex()?.captures(value.trim())?;
        let digits = caps.get(1)?.as_str().to_ascii_lowercase();
        let expanded = if digits.len() == 3 {
            digits.chars().flat_map(|c| [c, c]).collect()
        } else {
            digits
        };
        Some(Self(format!("#{expanded}")))
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{r:02x}{g:02x}{b:02x}"))
    }

    pub fn default_accent() -> Self {
        Self(DEFAULT_ACCENT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        let channel = |i: usize| u8::from_str_radix(&self.0[i..i + 2], 16).unwrap_or(0);
        [channel(1), channel(3), channel(5)]
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self::default_accent()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a hex color: {value:?}"))
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

fn hex_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^#([0-9a-f]{3}|[0-9a-f]{6})$").ok())
        .as_ref()
}

fn rgb_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)rgba?\((\d+),\s*(\d+),\s*(\d+)").ok())
        .as_ref()
}

/// Parse the three leading integer channels of an `rgb()`/`rgba()` value.
/// Alpha is ignored; channels above 255 clamp.
pub fn parse_rgb_function(value: &str) -> Option<HexColor> {
    let caps = rgb_regex()?.captures(value)?;
    let channel = |i: usize| -> Option<u8> {
        let digits = caps.get(i)?.as_str();
        // Overlong digit runs overflow u32; they are still "above 255".
        Some(digits.parse::<u32>().map_or(255, |v| v.min(255)) as u8)
    };
    Some(HexColor::from_rgb(channel(1)?, channel(2)?, channel(3)?))
}

fn starts_with_rgb(value: &str) -> bool {
    value
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("rgb"))
}

/// Something that can compute the color a CSS value resolves to.
pub trait ColorProbe {
    /// Computed color as `rgb(r, g, b)` or `rgba(r, g, b, a)`, or `None` if
    /// the value is not a color.
    fn computed_color(&mut self, value: &str) -> Option<String>;
}

/// Probe backed by a standalone CSS color grammar (named colors, `hsl()`,
/// `hwb()`, ...). Used when no document is at hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct CssColorProbe;

impl ColorProbe for CssColorProbe {
    fn computed_color(&mut self, value: &str) -> Option<String> {
        Color::parse_css(value).map(|c| c.to_css_rgb())
    }
}

const PROBE_ID: &str = "__color-probe";

/// Probe that inserts an invisible element into a live document, reads back
/// its computed background and removes it again.
pub struct DocumentProbe<'a> {
    document: &'a mut Document,
}

impl<'a> DocumentProbe<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        Self { document }
    }
}

/// Detaches the probe element on drop. The probe is always the last
/// top-level node, so an unrelated element that happens to share its id is
/// never touched.
struct ProbeGuard<'a> {
    document: &'a mut Document,
}

impl ProbeGuard<'_> {
    fn probe(&self) -> Option<&ElementNode> {
        match self.document.nodes.last() {
            Some(DomNode::Element(e)) if e.id() == Some(PROBE_ID) => Some(e),
            _ => None,
        }
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.probe().is_some() {
            self.document.nodes.pop();
        }
    }
}

impl ColorProbe for DocumentProbe<'_> {
    fn computed_color(&mut self, value: &str) -> Option<String> {
        // A `;` would smuggle extra declarations into the probe's style.
        if value.contains(';') {
            return None;
        }
        let probe = ElementNode::new(Tag::Div).with_attr("id", PROBE_ID).with_attr(
            "style",
            &format!("position: fixed; left: -9999px; width: 1px; height: 1px; background: {value}"),
        );
        self.document.append(probe);
        let guard = ProbeGuard {
            document: &mut *self.document,
        };

        let computed = resolve_style(guard.probe()?, None)
            .background_color()
            .map(|c| c.to_css_rgb());
        computed
    }
}

/// Resolve `input` to a canonical hex color, or `fallback`.
pub fn resolve_color(input: &str, fallback: &HexColor, probe: Option<&mut dyn ColorProbe>) -> HexColor {
    let value = input.trim();
    if value.is_empty() {
        return fallback.clone();
    }

    if let Some(hex) = HexColor::parse(value) {
        return hex;
    }

    if starts_with_rgb(value) {
        return parse_rgb_function(value).unwrap_or_else(|| fallback.clone());
    }

    let Some(probe) = probe else {
        debug!("No color probe available for {value:?}; using fallback {fallback}");
        return fallback.clone();
    };
    match probe.computed_color(value) {
        Some(computed) => parse_rgb_function(&computed).unwrap_or_else(|| fallback.clone()),
        None => {
            debug!("Unresolvable color {value:?}; using fallback {fallback}");
            fallback.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> HexColor {
        HexColor::default_accent()
    }

    #[test]
    fn short_hex_expands() {
        assert_eq!(resolve_color("#abc", &fallback(), None).as_str(), "#aabbcc");
        assert_eq!(resolve_color("  #ABC ", &fallback(), None).as_str(), "#aabbcc");
    }

    #[test]
    fn long_hex_is_lowercased() {
        assert_eq!(resolve_color("#1A2B3C", &fallback(), None).as_str(), "#1a2b3c");
    }

    #[test]
    fn rgb_and_rgba_ignore_alpha() {
        assert_eq!(resolve_color("rgb(255, 0, 0)", &fallback(), None).as_str(), "#ff0000");
        assert_eq!(resolve_color("rgba(255, 0, 0, 0.5)", &fallback(), None).as_str(), "#ff0000");
        assert_eq!(resolve_color("RGB(1,2,3)", &fallback(), None).as_str(), "#010203");
    }

    #[test]
    fn rgb_channels_clamp() {
        assert_eq!(resolve_color("rgb(300, 0, 999999999999)", &fallback(), None).as_str(), "#ff00ff");
    }

    #[test]
    fn malformed_rgb_falls_back_without_probe() {
        let mut probe = CssColorProbe;
        assert_eq!(resolve_color("rgb(10%, 0, 0)", &fallback(), Some(&mut probe)), fallback());
    }

    #[test]
    fn empty_and_garbage_fall_back() {
        let mut probe = CssColorProbe;
        assert_eq!(resolve_color("", &fallback(), None), fallback());
        assert_eq!(resolve_color("   ", &fallback(), Some(&mut probe)), fallback());
        assert_eq!(resolve_color("notacolor", &fallback(), Some(&mut probe)), fallback());
        assert_eq!(resolve_color("#abcd", &fallback(), None), fallback());
    }

    #[test]
    fn named_colors_need_a_probe() {
        assert_eq!(resolve_color("teal", &fallback(), None), fallback());
        let mut probe = CssColorProbe;
        assert_eq!(resolve_color("teal", &fallback(), Some(&mut probe)).as_str(), "#008080");
        assert_eq!(resolve_color("hsl(120, 100%, 50%)", &fallback(), Some(&mut probe)).as_str(), "#00ff00");
    }

    #[test]
    fn resolution_is_idempotent() {
        for input in ["#abc", "#0EA5A4", "rgb(1, 2, 3)"] {
            let once = resolve_color(input, &fallback(), None);
            let twice = resolve_color(once.as_str(), &fallback(), None);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn document_probe_resolves_and_cleans_up() {
        let mut doc = Document::parse(r#"<div id="resume-preview"><p>Hi</p></div>"#);
        let before = doc.clone();
        {
            let mut probe = DocumentProbe::new(&mut doc);
            assert_eq!(resolve_color("rebeccapurple", &fallback(), Some(&mut probe)).as_str(), "#663399");
            assert_eq!(resolve_color("bogus", &fallback(), Some(&mut probe)), fallback());
        }
        assert_eq!(doc, before);
    }

    #[test]
    fn document_probe_leaves_same_id_element_alone() {
        let mut doc = Document::parse(
            r#"<div id="__color-probe" style="background: #00ff00">mine</div><div id="resume-preview"></div>"#,
        );
        let before = doc.clone();
        {
            let mut probe = DocumentProbe::new(&mut doc);
            assert_eq!(resolve_color("navy", &fallback(), Some(&mut probe)).as_str(), "#000080");
        }
        assert_eq!(doc, before);
        assert_eq!(doc.element_by_id(PROBE_ID).unwrap().text_content(), "mine");
    }

    #[test]
    fn document_probe_rejects_injection() {
        let mut doc = Document::default();
        let mut probe = DocumentProbe::new(&mut doc);
        assert_eq!(probe.computed_color("red; color: blue"), None);
    }

    #[test]
    fn hex_color_serde() {
        let c: HexColor = serde_json::from_str("\"#ABC\"").unwrap();
        assert_eq!(c.as_str(), "#aabbcc");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#aabbcc\"");
        assert!(serde_json::from_str::<HexColor>("\"red\"").is_err());
        assert_eq!(c.to_rgb(), [0xaa, 0xbb, 0xcc]);
    }
}
