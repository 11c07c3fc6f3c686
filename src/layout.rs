//! Layout engine – uses Taffy to compute flexbox / grid layout from a styled
//! DOM tree, then converts the result into a tree of positioned boxes in CSS
//! pixels, with the root at the origin.

use std::collections::HashMap;
use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::{Error, Result};
use crate::fonts::{wrap_text, FontKey, FontManager};
use crate::style::{self, ComputedStyle, FontStyle as CssFontStyle, FontWeight, StyledNode, TextAlign, TextTransform};

/// A positioned box in capture coordinates.
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

impl PositionedBox {
    /// Number of boxes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(PositionedBox::count).sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { lines: Vec<String> },
}

fn layout_err(e: taffy::TaffyError) -> Error {
    Error::Layout(e.to_string())
}

pub(crate) fn font_key(style: &ComputedStyle) -> FontKey {
    FontKey::new(
        &style.font_family,
        style.font_weight == FontWeight::Bold,
        style.font_style == CssFontStyle::Italic,
    )
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
        }
    }

    /// Collect all text content from an inline subtree (spans, text nodes).
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { tag: Tag::Br, .. } => "\n".to_string(),
            StyledNode::Element { children, .. } => children.iter().map(Self::collect_inline_text).collect(),
        }
    }

    /// True when every child is a text node or an inline element with inline
    /// descendants only.
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                style,
                children: gc,
                ..
            } => style.display == style::Display::Inline && Self::all_inline(gc),
        })
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> Result<NodeId> {
        match styled {
            StyledNode::Text { text, style } => self.build_text_node(text, style, None, parent_width),
            StyledNode::Element { tag, style, children } => self.build_element_node(tag, style, children, parent_width),
        }
    }

    /// Build a wrapped text leaf. `block` carries the box properties of an
    /// enclosing text block whose inline content was merged into this leaf.
    fn build_text_node(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        block: Option<&ComputedStyle>,
        parent_width: f32,
    ) -> Result<NodeId> {
        let key = font_key(style);
        let font_size = style.font_size;
        let line_height_px = self.fonts.line_height_px(font_size, style.line_height);

        let text = match style.text_transform {
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::None => text.to_string(),
        };

        let (box_h, box_v) = block
            .map(|b| {
                (
                    b.padding_left + b.padding_right + b.border_widths[1] + b.border_widths[3],
                    b.padding_top + b.padding_bottom + b.border_widths[0] + b.border_widths[2],
                )
            })
            .unwrap_or((0.0, 0.0));
        let max_w = match block.map(|b| b.width) {
            Some(style::Dimension::Px(w)) => w - box_h,
            _ => parent_width - box_h,
        };
        let lines = wrap_text(text.trim(), font_size, &key, max_w, self.fonts);

        let text_width = lines
            .iter()
            .map(|l| self.fonts.measure_text_width(l, font_size, &key))
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height_px;

        let mut taffy_style = Style {
            size: Size {
                width: Dimension::Length(text_width + box_h),
                height: Dimension::Length(text_height + box_v),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };
        // Aligned text stretches to its container so the painter can offset
        // each line inside the full line box.
        match block.map(|b| b.width) {
            Some(style::Dimension::Px(w)) => taffy_style.size.width = Dimension::Length(w),
            _ if style.text_align != TextAlign::Left => {
                taffy_style.size.width = Dimension::Auto;
                taffy_style.min_size.width = Dimension::Length(text_width + box_h);
                taffy_style.align_self = Some(taffy::AlignSelf::Stretch);
            }
            _ => {}
        }
        if let Some(b) = block {
            taffy_style.margin = margin_rect(b);
            taffy_style.padding = padding_rect(b);
            taffy_style.border = border_rect(b);
            taffy_style.grid_column = column_span(b);
        }

        let node = self.taffy.new_leaf(taffy_style).map_err(layout_err)?;
        self.node_styles.insert(node, block.unwrap_or(style).clone());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        parent_width: f32,
    ) -> Result<NodeId> {
        // Text blocks whose children are all inline get their text merged
        // into a single wrapped leaf so spans flow on the same line.
        if tag.is_text_block() && !children.is_empty() && Self::all_inline(children) {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            let combined = raw
                .split('\n')
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n");
            if !combined.trim().is_empty() {
                return self.build_text_node(&combined, style, Some(style), parent_width);
            }
        }

        let my_width = match style.width {
            style::Dimension::Px(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width,
        };
        let inner_width = my_width
            - style.padding_left
            - style.padding_right
            - style.border_widths[1]
            - style.border_widths[3];

        let elem_child_count = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .count()
            .max(1);

        // Estimate per-child width so text is wrapped to its column at build time.
        let child_widths: Vec<f32> = children
            .iter()
            .map(|child| match style.display {
                style::Display::Flex if style.flex_direction == style::FlexDirection::Row => {
                    let gap_total = style.gap * elem_child_count.saturating_sub(1) as f32;
                    ((inner_width - gap_total) / elem_child_count as f32).max(1.0)
                }
                style::Display::Grid => {
                    let cols = style.grid_columns.max(1) as f32;
                    let span = (child.style().column_span as f32).min(cols);
                    let track = (inner_width - style.gap * (cols - 1.0)) / cols;
                    (track * span + style.gap * (span - 1.0)).max(1.0)
                }
                _ => inner_width,
            })
            .collect();

        let mut child_nodes = Vec::with_capacity(children.len());
        for (child, width) in children.iter().zip(child_widths) {
            child_nodes.push(self.build_node(child, width)?);
        }

        let taffy_style = self.computed_to_taffy(style);
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(layout_err)?;
        self.node_styles.insert(node, style.clone());
        Ok(node)
    }

    fn computed_to_taffy(&self, s: &ComputedStyle) -> Style {
        let mut ts = Style::default();

        match s.display {
            style::Display::Flex => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.flex_wrap = match s.flex_wrap {
                    style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                    style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                };
                ts.justify_content = Some(match s.justify_content {
                    style::JustifyContent::Start => taffy::JustifyContent::Start,
                    style::JustifyContent::End => taffy::JustifyContent::End,
                    style::JustifyContent::Center => taffy::JustifyContent::Center,
                    style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                });
                ts.align_items = Some(match s.align_items {
                    style::AlignItems::Start => taffy::AlignItems::Start,
                    style::AlignItems::End => taffy::AlignItems::End,
                    style::AlignItems::Center => taffy::AlignItems::Center,
                    style::AlignItems::Stretch => taffy::AlignItems::Stretch,
                });
            }
            style::Display::Grid => {
                ts.display = taffy::Display::Grid;
                ts.grid_template_columns =
                    vec![taffy::TrackSizingFunction::from_flex(1.0); s.grid_columns.max(1) as usize];
            }
            style::Display::Block => {
                // Block-level elements stack vertically.
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
            }
            style::Display::Inline => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.flex_wrap = taffy::FlexWrap::Wrap;
            }
            style::Display::None => {
                ts.display = taffy::Display::None;
            }
        }

        ts.size = Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        };
        ts.min_size = Size {
            width: if s.flex_grow > 0.0 {
                Dimension::Length(0.0)
            } else {
                Dimension::Auto
            },
            height: Dimension::Auto,
        };
        ts.max_size = Size {
            width: dim_to_taffy(s.max_width),
            height: Dimension::Auto,
        };

        ts.flex_grow = s.flex_grow;
        ts.flex_shrink = s.flex_shrink;
        ts.margin = margin_rect(s);
        ts.padding = padding_rect(s);
        ts.border = border_rect(s);
        ts.gap = Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        };
        ts.grid_column = column_span(s);

        ts
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_err)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self.node_content.get(&node).cloned().unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_err)?
            .iter()
            .map(|&child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            content,
            children,
        })
    }
}

fn dim_to_taffy(d: style::Dimension) -> Dimension {
    match d {
        style::Dimension::Auto => Dimension::Auto,
        style::Dimension::Px(v) => Dimension::Length(v),
        style::Dimension::Percent(v) => Dimension::Percent(v / 100.0),
    }
}

fn margin_rect(s: &ComputedStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(s.margin_top),
        right: LengthPercentageAuto::Length(s.margin_right),
        bottom: LengthPercentageAuto::Length(s.margin_bottom),
        left: LengthPercentageAuto::Length(s.margin_left),
    }
}

fn padding_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(s.padding_top),
        right: LengthPercentage::Length(s.padding_right),
        bottom: LengthPercentage::Length(s.padding_bottom),
        left: LengthPercentage::Length(s.padding_left),
    }
}

fn border_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    let [top, right, bottom, left] = s.border_widths;
    Rect {
        top: LengthPercentage::Length(top),
        right: LengthPercentage::Length(right),
        bottom: LengthPercentage::Length(bottom),
        left: LengthPercentage::Length(left),
    }
}

fn column_span(s: &ComputedStyle) -> taffy::geometry::Line<taffy::style::GridPlacement> {
    if s.column_span > 1 {
        taffy::geometry::Line {
            start: taffy::style::GridPlacement::Span(s.column_span),
            end: taffy::style::GridPlacement::Auto,
        }
    } else {
        taffy::geometry::Line {
            start: taffy::style::GridPlacement::Auto,
            end: taffy::style::GridPlacement::Auto,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out a single styled root at `width` CSS pixels. The returned root box
/// sits at the origin; its height is the full content height.
pub fn compute_layout(root: &StyledNode, width: f32, fonts: &FontManager) -> Result<PositionedBox> {
    let mut builder = LayoutBuilder::new(fonts);
    let root_id = builder.build_node(root, width)?;

    // The root's own margins do not offset the capture.
    let mut root_style = builder.taffy.style(root_id).map_err(layout_err)?.clone();
    root_style.margin = Rect {
        top: LengthPercentageAuto::Length(0.0),
        right: LengthPercentageAuto::Length(0.0),
        bottom: LengthPercentageAuto::Length(0.0),
        left: LengthPercentageAuto::Length(0.0),
    };
    if matches!(root_style.size.width, Dimension::Auto) {
        root_style.size.width = Dimension::Length(width);
    }
    builder.taffy.set_style(root_id, root_style).map_err(layout_err)?;

    builder
        .taffy
        .compute_layout(
            root_id,
            Size {
                width: AvailableSpace::Definite(width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_err)?;

    builder.extract(root_id, 0.0, 0.0)
}
