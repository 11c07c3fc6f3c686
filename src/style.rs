//! Style resolver – maps inline CSS and the Tailwind utility classes used by
//! the resume layouts to a flat [`ComputedStyle`] consumed by the layout
//! engine and the raster capture.
//!
//! Base element styles follow Tailwind's preflight: headings and paragraphs
//! carry no intrinsic size or margin, so every layout decision comes from the
//! classes and inline declarations of the preview markup.

use crate::dom::{DomNode, ElementNode, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Grid
    pub grid_columns: u16,
    pub column_span: u16,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub max_width: Dimension,

    // Spacing (px)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border (px, per side: top, right, bottom, left)
    pub border_widths: [f32; 4],
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiple of the font size.
    pub line_height: f32,
    pub font_style: FontStyle,
    pub text_transform: TextTransform,

    // Background
    pub background: Background,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            grid_columns: 1,
            column_span: 1,
            width: Dimension::Auto,
            height: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_widths: [0.0; 4],
            border_color: Color::from_hex("#e5e7eb").unwrap_or(Color::BLACK),
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_family: "sans-serif".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.5,
            font_style: FontStyle::Normal,
            text_transform: TextTransform::None,
            background: Background::None,
        }
    }
}

impl ComputedStyle {
    pub fn has_border(&self) -> bool {
        self.border_widths.iter().any(|w| *w > 0.0)
    }

    /// The solid background color, if the background is a plain color.
    pub fn background_color(&self) -> Option<Color> {
        match &self.background {
            Background::Solid(c) => Some(*c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Grid,
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

/// Box background.
#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    None,
    Solid(Color),
    LinearGradient(LinearGradient),
}

/// `linear-gradient(<angle>, <color>, <color>, ...)` with evenly spaced stops.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    /// CSS angle: 0deg points up, 90deg points right.
    pub angle_deg: f32,
    pub stops: Vec<Color>,
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self {
            r: rgba[0] as f32 / 255.0,
            g: rgba[1] as f32 / 255.0,
            b: rgba[2] as f32 / 255.0,
            a: rgba[3] as f32 / 255.0,
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::from_rgba8([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            ])),
            3 => Some(Self::from_rgba8([
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
                255,
            ])),
            _ => None,
        }
    }

    /// Parse any CSS color value: hex, `rgb()`, `hsl()`, named colors, ...
    pub fn parse_css(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        csscolorparser::parse(value)
            .ok()
            .map(|c| Self::from_rgba8(c.to_rgba8()))
    }

    /// Serialise the way a browser reports a computed color:
    /// `rgb(r, g, b)`, or `rgba(r, g, b, a)` when not fully opaque.
    pub fn to_css_rgb(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("rgb({r}, {g}, {b})")
        } else {
            let alpha = (self.a.clamp(0.0, 1.0) * 100.0).round() / 100.0;
            format!("rgba({r}, {g}, {b}, {alpha})")
        }
    }
}

/// Tailwind v3 palette subset used by the resume layouts.
fn tailwind_color(name: &str) -> Option<Color> {
    let hex = match name {
        "white" => "#ffffff",
        "black" => "#000000",
        "gray-50" => "#f9fafb",
        "gray-100" => "#f3f4f6",
        "gray-200" => "#e5e7eb",
        "gray-300" => "#d1d5db",
        "gray-400" => "#9ca3af",
        "gray-500" => "#6b7280",
        "gray-600" => "#4b5563",
        "gray-700" => "#374151",
        "gray-800" => "#1f2937",
        "gray-900" => "#111827",
        "slate-900" => "#0f172a",
        "cyan-500" => "#06b6d4",
        "emerald-500" => "#10b981",
        "red-500" => "#ef4444",
        _ => return None,
    };
    Color::from_hex(hex)
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(element: &ElementNode, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = ComputedStyle::default();

    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.font_weight = p.font_weight;
        style.font_family = p.font_family.clone();
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
        style.font_style = p.font_style;
        style.text_transform = p.text_transform;
    }

    apply_tag_defaults(&mut style, &element.tag);

    // Font-size utilities set a paired line height; `leading-*` must win
    // regardless of class order, as it does in Tailwind's generated CSS.
    let classes = element.classes();
    for class in classes.iter().filter(|c| font_size_class(c).is_some()) {
        apply_tailwind_class(&mut style, class);
    }
    for class in classes.iter().filter(|c| font_size_class(c).is_none()) {
        apply_tailwind_class(&mut style, class);
    }

    if let Some(inline) = element.inline_style() {
        apply_inline_style(&mut style, inline);
    }

    style
}

fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    if tag.is_inline() {
        s.display = Display::Inline;
    }
    match tag {
        Tag::Strong => s.font_weight = FontWeight::Bold,
        Tag::Em => s.font_style = FontStyle::Italic,
        Tag::Head | Tag::Unknown(_) => s.display = Display::None,
        _ => {}
    }
}

/// `(font_size, line_height_px)` for Tailwind's `text-{size}` utilities.
fn font_size_class(class: &str) -> Option<(f32, f32)> {
    match class {
        "text-xs" => Some((12.0, 16.0)),
        "text-sm" => Some((14.0, 20.0)),
        "text-base" => Some((16.0, 24.0)),
        "text-lg" => Some((18.0, 28.0)),
        "text-xl" => Some((20.0, 28.0)),
        "text-2xl" => Some((24.0, 32.0)),
        "text-3xl" => Some((30.0, 36.0)),
        "text-4xl" => Some((36.0, 40.0)),
        _ => None,
    }
}

/// Apply a single Tailwind utility class.
fn apply_tailwind_class(s: &mut ComputedStyle, class: &str) {
    if let Some((size, line)) = font_size_class(class) {
        s.font_size = size;
        s.line_height = line / size;
        return;
    }

    match class {
        // Display
        "flex" => s.display = Display::Flex,
        "grid" => s.display = Display::Grid,
        "block" => s.display = Display::Block,
        "inline" => s.display = Display::Inline,
        "hidden" => s.display = Display::None,

        "flex-row" => s.flex_direction = FlexDirection::Row,
        "flex-col" => s.flex_direction = FlexDirection::Column,
        "flex-wrap" => s.flex_wrap = FlexWrap::Wrap,
        "flex-1" => {
            s.flex_grow = 1.0;
            s.flex_shrink = 1.0;
        }

        "justify-start" => s.justify_content = JustifyContent::Start,
        "justify-end" => s.justify_content = JustifyContent::End,
        "justify-center" => s.justify_content = JustifyContent::Center,
        "justify-between" => s.justify_content = JustifyContent::SpaceBetween,

        "items-start" => s.align_items = AlignItems::Start,
        "items-end" => s.align_items = AlignItems::End,
        "items-center" => s.align_items = AlignItems::Center,
        "items-stretch" => s.align_items = AlignItems::Stretch,

        // Typography
        "font-bold" | "font-semibold" => s.font_weight = FontWeight::Bold,
        "font-normal" | "font-medium" => s.font_weight = FontWeight::Normal,
        "italic" => s.font_style = FontStyle::Italic,
        "not-italic" => s.font_style = FontStyle::Normal,
        "uppercase" => s.text_transform = TextTransform::Uppercase,
        "normal-case" => s.text_transform = TextTransform::None,
        "text-left" => s.text_align = TextAlign::Left,
        "text-center" => s.text_align = TextAlign::Center,
        "text-right" => s.text_align = TextAlign::Right,
        "leading-tight" => s.line_height = 1.25,
        "leading-normal" => s.line_height = 1.5,
        "leading-relaxed" => s.line_height = 1.625,

        // Borders
        "border" => s.border_widths = [1.0; 4],
        "border-t" => s.border_widths[0] = 1.0,
        "border-r" => s.border_widths[1] = 1.0,
        "border-b" => s.border_widths[2] = 1.0,
        "border-l" => s.border_widths[3] = 1.0,

        "w-full" => s.width = Dimension::Percent(100.0),
        "w-auto" => s.width = Dimension::Auto,

        _ => {
            try_parse_spacing_class(s, class);
            try_parse_color_class(s, class);
            try_parse_border_width_class(s, class);
            try_parse_gap_class(s, class);
            try_parse_grid_class(s, class);
        }
    }
}

fn try_parse_spacing_class(s: &mut ComputedStyle, class: &str) {
    // p-{n}, px-{n}, mt-{n}, ...  (1 unit = 4px)
    let Some((prefix, value)) = class.rsplit_once('-') else {
        return;
    };
    let Ok(units) = value.parse::<f32>() else {
        return;
    };
    let v = units * 4.0;

    match prefix {
        "p" => {
            s.padding_top = v;
            s.padding_right = v;
            s.padding_bottom = v;
            s.padding_left = v;
        }
        "px" => {
            s.padding_left = v;
            s.padding_right = v;
        }
        "py" => {
            s.padding_top = v;
            s.padding_bottom = v;
        }
        "pt" => s.padding_top = v,
        "pr" => s.padding_right = v,
        "pb" => s.padding_bottom = v,
        "pl" => s.padding_left = v,
        "m" => {
            s.margin_top = v;
            s.margin_right = v;
            s.margin_bottom = v;
            s.margin_left = v;
        }
        "mx" => {
            s.margin_left = v;
            s.margin_right = v;
        }
        "my" => {
            s.margin_top = v;
            s.margin_bottom = v;
        }
        "mt" => s.margin_top = v,
        "mr" => s.margin_right = v,
        "mb" => s.margin_bottom = v,
        "ml" => s.margin_left = v,
        "w" => s.width = Dimension::Px(v),
        "h" => s.height = Dimension::Px(v),
        _ => {}
    }
}

fn try_parse_color_class(s: &mut ComputedStyle, class: &str) {
    if let Some(color) = class.strip_prefix("text-").and_then(tailwind_color) {
        s.color = color;
    } else if let Some(color) = class.strip_prefix("bg-").and_then(tailwind_color) {
        s.background = Background::Solid(color);
    } else if let Some(color) = class.strip_prefix("border-").and_then(tailwind_color) {
        s.border_color = color;
    } else if class == "bg-transparent" {
        s.background = Background::None;
    }
}

fn try_parse_border_width_class(s: &mut ComputedStyle, class: &str) {
    // border-{n}, border-b-{n}, ...
    let Some(rest) = class.strip_prefix("border-") else {
        return;
    };
    let (sides, width): (&[usize], &str) = match rest.split_once('-') {
        Some(("t", w)) => (&[0], w),
        Some(("r", w)) => (&[1], w),
        Some(("b", w)) => (&[2], w),
        Some(("l", w)) => (&[3], w),
        None => (&[0, 1, 2, 3], rest),
        _ => return,
    };
    if let Ok(px) = width.parse::<f32>() {
        for side in sides {
            s.border_widths[*side] = px;
        }
    }
}

fn try_parse_gap_class(s: &mut ComputedStyle, class: &str) {
    if let Some(v) = class.strip_prefix("gap-").and_then(|r| r.parse::<f32>().ok()) {
        s.gap = v * 4.0;
    }
}

fn try_parse_grid_class(s: &mut ComputedStyle, class: &str) {
    if let Some(n) = class.strip_prefix("grid-cols-").and_then(|r| r.parse::<u16>().ok()) {
        s.grid_columns = n.max(1);
    } else if let Some(n) = class.strip_prefix("col-span-").and_then(|r| r.parse::<u16>().ok()) {
        s.column_span = n.max(1);
    }
}

// ---------------------------------------------------------------------------
// Inline style parsing
// ---------------------------------------------------------------------------

fn apply_inline_style(s: &mut ComputedStyle, style_str: &str) {
    for (prop, val) in crate::dom::style_declarations(style_str) {
        apply_css_property(s, &prop, &val);
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    match prop {
        "display" => {
            s.display = match val {
                "flex" => Display::Flex,
                "grid" => Display::Grid,
                "block" => Display::Block,
                "inline" => Display::Inline,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "font-size" => {
            if let Some(px) = parse_px(val) {
                s.font_size = px;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "font-family" => {
            if !val.is_empty() {
                s.font_family = val.to_string();
            }
        }
        "text-transform" => {
            s.text_transform = match val {
                "uppercase" => TextTransform::Uppercase,
                _ => TextTransform::None,
            }
        }
        "color" => {
            if let Some(c) = Color::parse_css(val) {
                s.color = c;
            }
        }
        "background-color" => {
            if let Some(c) = Color::parse_css(val) {
                s.background = Background::Solid(c);
            }
        }
        // An unparseable value leaves the previous background in place, the
        // way a browser drops an invalid declaration.
        "background" => {
            if let Some(bg) = parse_background(val) {
                s.background = bg;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "width" => s.width = parse_dimension(val),
        "height" => s.height = parse_dimension(val),
        "max-width" => s.max_width = parse_dimension(val),
        "margin" => apply_shorthand_spacing(
            val,
            &mut s.margin_top,
            &mut s.margin_right,
            &mut s.margin_bottom,
            &mut s.margin_left,
        ),
        "margin-top" => set_px(&mut s.margin_top, val),
        "margin-right" => set_px(&mut s.margin_right, val),
        "margin-bottom" => set_px(&mut s.margin_bottom, val),
        "margin-left" => set_px(&mut s.margin_left, val),
        "padding" => apply_shorthand_spacing(
            val,
            &mut s.padding_top,
            &mut s.padding_right,
            &mut s.padding_bottom,
            &mut s.padding_left,
        ),
        "padding-top" => set_px(&mut s.padding_top, val),
        "padding-right" => set_px(&mut s.padding_right, val),
        "padding-bottom" => set_px(&mut s.padding_bottom, val),
        "padding-left" => set_px(&mut s.padding_left, val),
        "border" => apply_border_shorthand(s, &[0, 1, 2, 3], val),
        "border-top" => apply_border_shorthand(s, &[0], val),
        "border-right" => apply_border_shorthand(s, &[1], val),
        "border-bottom" => apply_border_shorthand(s, &[2], val),
        "border-left" => apply_border_shorthand(s, &[3], val),
        "border-width" => {
            if let Some(px) = parse_px(val) {
                s.border_widths = [px; 4];
            }
        }
        "border-color" => {
            if let Some(c) = Color::parse_css(val) {
                s.border_color = c;
            }
        }
        "line-height" => {
            if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(px) = parse_px(val) {
                s.line_height = px / s.font_size;
            }
        }
        "gap" => set_px(&mut s.gap, val),
        _ => {}
    }
}

/// Parse a `background` shorthand value: a color or a `linear-gradient()`.
pub fn parse_background(val: &str) -> Option<Background> {
    let val = val.trim();
    if val.eq_ignore_ascii_case("none") {
        return Some(Background::None);
    }
    if let Some(inner) = val
        .strip_prefix("linear-gradient(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_linear_gradient(inner).map(Background::LinearGradient);
    }
    Color::parse_css(val).map(Background::Solid)
}

fn parse_linear_gradient(inner: &str) -> Option<LinearGradient> {
    let args = split_top_level(inner);
    let mut iter = args.iter().peekable();

    let mut angle_deg = 180.0;
    if let Some(first) = iter.peek() {
        if let Some(deg) = first.strip_suffix("deg").and_then(|d| d.trim().parse::<f32>().ok()) {
            angle_deg = deg;
            iter.next();
        } else if let Some(dir) = first.strip_prefix("to ") {
            angle_deg = match dir.trim() {
                "top" => 0.0,
                "right" => 90.0,
                "bottom" => 180.0,
                "left" => 270.0,
                _ => return None,
            };
            iter.next();
        }
    }

    let stops = iter
        .map(|stop| {
            // Drop a trailing position such as `50%`.
            let color = match stop.rsplit_once(' ') {
                Some((c, pos)) if pos.ends_with('%') => c,
                _ => stop.as_str(),
            };
            Color::parse_css(color)
        })
        .collect::<Option<Vec<_>>>()?;

    if stops.len() < 2 {
        return None;
    }
    Some(LinearGradient { angle_deg, stops })
}

/// Split a comma-separated argument list, ignoring commas nested in parens.
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn apply_border_shorthand(s: &mut ComputedStyle, sides: &[usize], val: &str) {
    // `1px solid #e5e7eb` in any order; `none` clears.
    if val == "none" || val == "0" {
        for side in sides {
            s.border_widths[*side] = 0.0;
        }
        return;
    }
    for token in val.split_whitespace() {
        if let Some(px) = parse_px(token) {
            for side in sides {
                s.border_widths[*side] = px;
            }
        } else if let Some(c) = Color::parse_css(token) {
            s.border_color = c;
        }
    }
}

fn set_px(target: &mut f32, val: &str) {
    if let Some(px) = parse_px(val) {
        *target = px;
    }
}

fn parse_px(s: &str) -> Option<f32> {
    let s = s.trim();
    if let Some(mm) = s.strip_suffix("mm") {
        // CSS reference pixel: 96 per inch.
        return mm.trim().parse::<f32>().ok().map(|v| v * 96.0 / 25.4);
    }
    s.trim_end_matches("px").parse().ok()
}

fn parse_dimension(s: &str) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        Dimension::Auto
    } else if let Some(p) = s.strip_suffix('%') {
        p.parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_px(s).map(Dimension::Px).unwrap_or(Dimension::Auto)
    }
}

fn apply_shorthand_spacing(
    val: &str,
    top: &mut f32,
    right: &mut f32,
    bottom: &mut f32,
    left: &mut f32,
) {
    let parts: Vec<f32> = val.split_whitespace().filter_map(parse_px).collect();
    match parts.as_slice() {
        [all] => {
            *top = *all;
            *right = *all;
            *bottom = *all;
            *left = *all;
        }
        [vertical, horizontal] => {
            *top = *vertical;
            *bottom = *vertical;
            *right = *horizontal;
            *left = *horizontal;
        }
        [t, h, b] => {
            *top = *t;
            *right = *h;
            *left = *h;
            *bottom = *b;
        }
        [t, r, b, l] => {
            *top = *t;
            *right = *r;
            *bottom = *b;
            *left = *l;
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style);
                let children = build_styled_tree(&e.children, Some(&style));
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                });
            }
            DomNode::Text(text) if !text.trim().is_empty() => {
                // Text runs inherit typography only; box properties stay on
                // the enclosing element.
                let parent = parent_style.cloned().unwrap_or_default();
                let style = ComputedStyle {
                    font_size: parent.font_size,
                    font_weight: parent.font_weight,
                    font_family: parent.font_family,
                    color: parent.color,
                    text_align: parent.text_align,
                    line_height: parent.line_height,
                    font_style: parent.font_style,
                    text_transform: parent.text_transform,
                    display: Display::Inline,
                    ..ComputedStyle::default()
                };
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style,
                });
            }
            DomNode::Text(_) => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn style_of(html: &str) -> ComputedStyle {
        let doc = Document::parse(html);
        let DomNode::Element(e) = &doc.nodes[0] else {
            panic!("expected element");
        };
        resolve_style(e, None)
    }

    #[test]
    fn tailwind_padding_and_margin() {
        let s = style_of(r#"<div class="p-4 mb-2"></div>"#);
        assert_eq!(s.padding_top, 16.0);
        assert_eq!(s.padding_left, 16.0);
        assert_eq!(s.margin_bottom, 8.0);
    }

    #[test]
    fn leading_wins_over_font_size_regardless_of_order() {
        let s = style_of(r#"<p class="leading-relaxed text-sm"></p>"#);
        assert_eq!(s.font_size, 14.0);
        assert!((s.line_height - 1.625).abs() < 1e-6);
    }

    #[test]
    fn inline_style_font_size_and_color() {
        let s = style_of(r#"<div style="font-size: 24px; color: #ff0000"></div>"#);
        assert_eq!(s.font_size, 24.0);
        assert!((s.color.r - 1.0).abs() < 0.01);
    }

    #[test]
    fn named_and_hsl_colors_parse() {
        assert_eq!(Color::parse_css("tomato").map(|c| c.to_rgba8()), Some([255, 99, 71, 255]));
        assert_eq!(
            Color::parse_css("hsl(0, 100%, 50%)").map(|c| c.to_rgba8()),
            Some([255, 0, 0, 255])
        );
        assert!(Color::parse_css("definitely-not-a-color").is_none());
    }

    #[test]
    fn computed_color_serialisation() {
        assert_eq!(Color::from_rgba8([14, 165, 164, 255]).to_css_rgb(), "rgb(14, 165, 164)");
        assert_eq!(Color::TRANSPARENT.to_css_rgb(), "rgba(0, 0, 0, 0)");
    }

    #[test]
    fn gradient_background() {
        let bg = parse_background("linear-gradient(90deg, #0ea5a4, rgba(6, 182, 212, 1))");
        let Some(Background::LinearGradient(g)) = bg else {
            panic!("expected gradient, got {bg:?}");
        };
        assert_eq!(g.angle_deg, 90.0);
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[0].to_rgba8(), [14, 165, 164, 255]);
    }

    #[test]
    fn invalid_gradient_stop_drops_declaration() {
        let s = style_of(r#"<div class="bg-white" style="background: linear-gradient(90deg, nope, #06b6d4)"></div>"#);
        assert_eq!(s.background, Background::Solid(Color::WHITE));
    }

    #[test]
    fn border_bottom_classes() {
        let s = style_of(r#"<div class="border-b-2 border-gray-100"></div>"#);
        assert_eq!(s.border_widths, [0.0, 0.0, 2.0, 0.0]);
        assert_eq!(s.border_color, Color::from_hex("#f3f4f6").unwrap());
    }

    #[test]
    fn grid_span_classes() {
        let s = style_of(r#"<div class="grid grid-cols-3 gap-6"></div>"#);
        assert_eq!(s.display, Display::Grid);
        assert_eq!(s.grid_columns, 3);
        assert_eq!(s.gap, 24.0);
        assert_eq!(style_of(r#"<div class="col-span-2"></div>"#).column_span, 2);
    }

    #[test]
    fn text_properties_inherit() {
        let doc = Document::parse(r#"<div class="uppercase text-right" style="font-family: Georgia, serif"><span>x</span></div>"#);
        let styled = build_styled_tree(&doc.nodes, None);
        let StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected element");
        };
        let span = children[0].style();
        assert_eq!(span.text_transform, TextTransform::Uppercase);
        assert_eq!(span.text_align, TextAlign::Right);
        assert_eq!(span.font_family, "Georgia, serif");
    }

    #[test]
    fn millimetre_width() {
        let s = style_of(r#"<div style="width: 210mm"></div>"#);
        let Dimension::Px(px) = s.width else {
            panic!("expected px width");
        };
        assert!((px - 793.7).abs() < 0.1);
    }
}
