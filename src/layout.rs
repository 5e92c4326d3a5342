//! Layout engine – uses Taffy to compute flexbox / grid layout from a styled
//! DOM tree, then converts the result into a tree of positioned boxes in
//! document coordinates (CSS px, origin at the top-left of the first page).

use std::collections::HashMap;
use taffy::prelude::*;
use taffy::TaffyError;

use crate::dom::Tag;
use crate::fonts::{wrap_text, FontManager};
use crate::style::{self, ComputedStyle, FontStyle as CssFontStyle, FontWeight, StyledNode};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
    pub keep_with_next: bool,
}

impl PositionedBox {
    /// Lowest y reached by any descendant, in document coordinates.
    pub fn content_bottom(&self) -> f32 {
        self.children
            .iter()
            .map(|c| c.content_bottom().max(c.y + c.height))
            .fold(self.y, f32::max)
    }
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text {
        text: String,
        lines: Vec<String>,
    },
    Image {
        src: String,
    },
    /// List item marker
    ListItem {
        marker: String,
    },
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    available_width: f32,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, available_width: f32) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            available_width,
        }
    }

    /// Collect all text content from an inline subtree (spans, text nodes).
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { children, .. } => children
                .iter()
                .map(Self::collect_inline_text)
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Return true when every child is a text node or a display:inline element
    /// (no block-level children).
    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                style,
                children: gc,
                ..
            } => {
                matches!(
                    style.display,
                    style::Display::Inline | style::Display::InlineBlock
                ) && Self::all_inline(gc)
            }
        })
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> Result<NodeId, TaffyError> {
        match styled {
            StyledNode::Text { text, style } => self.build_text_node(text, style, parent_width),
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    /// Like build_text_node but also applies paragraph-level margin from the
    /// enclosing block style so that headings keep their spacing.
    fn build_text_node_with_para_style(
        &mut self,
        text: &str,
        block_style: &ComputedStyle,
        parent_width: f32,
    ) -> Result<NodeId, TaffyError> {
        let node = self.build_text_node(text, block_style, parent_width)?;
        let current = self.taffy.style(node)?.clone();
        let updated = Style {
            margin: Rect {
                top: LengthPercentageAuto::Length(block_style.margin_top),
                right: LengthPercentageAuto::Length(block_style.margin_right),
                bottom: LengthPercentageAuto::Length(block_style.margin_bottom),
                left: LengthPercentageAuto::Length(block_style.margin_left),
            },
            ..current
        };
        self.taffy.set_style(node, updated)?;
        Ok(node)
    }

    fn build_text_node(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> Result<NodeId, TaffyError> {
        let bold = style.font_weight == FontWeight::Bold;
        let italic = style.font_style == CssFontStyle::Italic;
        let family = &style.font_family;
        let font_size = style.font_size;
        let line_height_px = self.fonts.line_height_px(font_size, style.line_height);

        let max_w = if parent_width > 0.0 {
            parent_width
        } else {
            self.available_width
        };
        let lines = wrap_text(
            text.trim(),
            font_size,
            bold,
            italic,
            family,
            max_w,
            self.fonts,
        );

        let text_width = lines
            .iter()
            .map(|l| {
                self.fonts
                    .measure_text_width(l, font_size, bold, italic, family)
            })
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height_px;

        // Aligned text spans its container so the renderer can offset lines.
        let width = if style.text_align == style::TextAlign::Left {
            taffy::Dimension::Length(text_width)
        } else {
            taffy::Dimension::Percent(1.0)
        };
        let taffy_style = Style {
            size: Size {
                width,
                height: taffy::Dimension::Length(text_height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };

        let node = self.taffy.new_leaf(taffy_style)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Text {
                text: text.trim().to_string(),
                lines,
            },
        );
        Ok(node)
    }

    /// Width each child is word-wrapped to at build time. Taffy only learns
    /// the final column widths after layout, so this mirrors its outcome for
    /// the container kinds the template uses.
    fn child_widths(tag: &Tag, style: &ComputedStyle, children: &[StyledNode], inner: f32) -> Vec<f32> {
        let elements: Vec<&ComputedStyle> = children
            .iter()
            .map(|c| match c {
                StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
            })
            .collect();

        if style.display == style::Display::Grid && *tag != Tag::Table {
            let cols = style.grid_template_columns.len().max(1);
            let gap_total = style.gap * cols.saturating_sub(1) as f32;
            let fr_total: f32 = style
                .grid_template_columns
                .iter()
                .map(|t| match t {
                    style::GridTrack::Fr(f) => *f,
                    style::GridTrack::Px(_) => 0.0,
                })
                .sum();
            let px_total: f32 = style
                .grid_template_columns
                .iter()
                .map(|t| match t {
                    style::GridTrack::Px(p) => *p,
                    style::GridTrack::Fr(_) => 0.0,
                })
                .sum();
            let free = (inner - gap_total - px_total).max(1.0);
            return (0..elements.len())
                .map(|i| match style.grid_template_columns.get(i % cols) {
                    Some(style::GridTrack::Px(p)) => *p,
                    Some(style::GridTrack::Fr(f)) if fr_total > 0.0 => free * f / fr_total,
                    _ => (inner - gap_total) / cols as f32,
                })
                .collect();
        }

        let is_flex_row =
            style.display == style::Display::Flex && style.flex_direction == style::FlexDirection::Row;
        if is_flex_row || *tag == Tag::Tr {
            // Fixed-width children keep their width; the rest share what is left.
            let count = elements.len().max(1);
            let gap_total = style.gap * count.saturating_sub(1) as f32;
            let fixed: f32 = elements
                .iter()
                .filter_map(|s| match s.width {
                    style::Dimension::Px(w) => Some(w + s.margin_left + s.margin_right),
                    _ => None,
                })
                .sum();
            let flexible = elements
                .iter()
                .filter(|s| !matches!(s.width, style::Dimension::Px(_)))
                .count()
                .max(1);
            let share = ((inner - gap_total - fixed) / flexible as f32).max(1.0);
            return elements
                .iter()
                .map(|s| match s.width {
                    style::Dimension::Px(w) => w,
                    style::Dimension::Percent(p) => inner * p / 100.0,
                    style::Dimension::Auto => share,
                })
                .collect();
        }

        vec![inner; elements.len()]
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> Result<NodeId, TaffyError> {
        // Paragraph-like block elements whose children are all inline get their
        // text merged into a single wrapped text node so spans flow correctly.
        let is_paragraph = matches!(tag, Tag::P) || tag.is_heading();
        if is_paragraph && !children.is_empty() && Self::all_inline(children) {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            // Normalise runs of whitespace/newlines to single spaces.
            let combined: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if !combined.is_empty() {
                let width = parent_width - style.margin_left - style.margin_right;
                return self.build_text_node_with_para_style(&combined, style, width);
            }
        }

        let my_width = match style.width {
            style::Dimension::Px(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width - style.margin_left - style.margin_right,
        };
        let inner_width = my_width
            - style.padding_left
            - style.padding_right
            - 2.0 * style.border_width;
        let widths = Self::child_widths(tag, style, children, inner_width);

        let mut child_nodes = Vec::new();
        let mut list_counter = 0u32;

        for (child, width) in children.iter().zip(widths) {
            // Markers are numbered per list element; nothing carries over
            // from one list to the next.
            let li_marker: Option<String> = match child {
                StyledNode::Element { tag: Tag::Li, .. } => {
                    list_counter += 1;
                    Some(if *tag == Tag::Ol {
                        format!("{}. ", list_counter)
                    } else {
                        "\u{2022} ".to_string()
                    })
                }
                _ => None,
            };

            let child_id = self.build_node(child, width)?;

            if let Some(marker) = li_marker {
                self.node_content
                    .insert(child_id, BoxContent::ListItem { marker });
            }

            child_nodes.push(child_id);
        }

        // For <img> elements, resolve Auto width/height to concrete pixel
        // dimensions using the image's intrinsic size from its data URI.
        let style_override: Option<ComputedStyle> = if *tag == Tag::Img
            && (matches!(style.width, style::Dimension::Auto)
                || matches!(style.height, style::Dimension::Auto))
        {
            let src = attrs.get("src").map(|s| s.as_str()).unwrap_or("");
            resolve_img_auto_dimensions(src, style, parent_width)
        } else {
            None
        };

        let effective_style = style_override.as_ref().unwrap_or(style);
        let taffy_style = self.computed_to_taffy(effective_style, tag);
        let node = self.taffy.new_with_children(taffy_style, &child_nodes)?;
        self.node_styles.insert(node, effective_style.clone());

        if *tag == Tag::Img {
            let src = attrs.get("src").cloned().unwrap_or_default();
            self.node_content.insert(node, BoxContent::Image { src });
        }

        Ok(node)
    }

    fn spacing(s: &ComputedStyle) -> (Rect<LengthPercentageAuto>, Rect<LengthPercentage>) {
        (
            Rect {
                top: LengthPercentageAuto::Length(s.margin_top),
                right: LengthPercentageAuto::Length(s.margin_right),
                bottom: LengthPercentageAuto::Length(s.margin_bottom),
                left: LengthPercentageAuto::Length(s.margin_left),
            },
            Rect {
                top: LengthPercentage::Length(s.padding_top),
                right: LengthPercentage::Length(s.padding_right),
                bottom: LengthPercentage::Length(s.padding_bottom),
                left: LengthPercentage::Length(s.padding_left),
            },
        )
    }

    fn computed_to_taffy(&self, s: &ComputedStyle, tag: &Tag) -> Style {
        let mut ts = Style::default();
        let (margin, padding) = Self::spacing(s);
        let border = Rect {
            top: LengthPercentage::Length(s.border_width),
            right: LengthPercentage::Length(s.border_width),
            bottom: LengthPercentage::Length(s.border_width),
            left: LengthPercentage::Length(s.border_width),
        };

        // HTML table model: always flex regardless of computed display.
        match tag {
            Tag::Table => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
                ts.size.width = self.dim_to_taffy(s.width);
                ts.size.height = self.dim_to_taffy(s.height);
                ts.min_size.width = taffy::Dimension::Length(0.0);
                ts.padding = padding;
                ts.margin = margin;
                return ts;
            }
            Tag::Tr => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.align_items = Some(taffy::AlignItems::Stretch);
                ts.size.width = taffy::Dimension::Percent(1.0);
                ts.min_size.width = taffy::Dimension::Length(0.0);
                ts.margin = margin;
                return ts;
            }
            Tag::Td | Tag::Th => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
                ts.flex_grow = 1.0;
                ts.flex_shrink = 1.0;
                ts.flex_basis = taffy::Dimension::Length(0.0); // equal columns
                ts.min_size.width = taffy::Dimension::Length(0.0);
                ts.padding = padding;
                ts.border = border;
                return ts;
            }
            _ => {}
        }

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
                    style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                    style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
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
                ts.grid_template_columns = if s.grid_template_columns.is_empty() {
                    vec![TrackSizingFunction::from_flex(1.0)]
                } else {
                    s.grid_template_columns
                        .iter()
                        .map(|t| match *t {
                            style::GridTrack::Fr(f) => TrackSizingFunction::from_flex(f),
                            style::GridTrack::Px(p) => TrackSizingFunction::from_length(p),
                        })
                        .collect()
                };
            }
            style::Display::Block
            | style::Display::ListItem
            | style::Display::TableRow
            | style::Display::TableCell
            | style::Display::InlineBlock => {
                // Use flex column for block-level elements (vertical stacking)
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
            width: self.dim_to_taffy(s.width),
            height: self.dim_to_taffy(s.height),
        };
        // Allow flex/shrink items to compress below their natural content size
        ts.min_size = Size {
            width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
                taffy::Dimension::Length(0.0)
            } else {
                self.dim_to_taffy(s.min_width)
            },
            height: taffy::Dimension::Auto,
        };
        ts.max_size = Size {
            width: self.dim_to_taffy(s.max_width),
            height: taffy::Dimension::Auto,
        };

        ts.flex_grow = s.flex_grow;
        // Explicitly sized boxes (page containers, badges) never shrink.
        ts.flex_shrink = if matches!(s.height, style::Dimension::Px(_))
            || matches!(s.width, style::Dimension::Px(_))
        {
            0.0
        } else {
            s.flex_shrink
        };

        ts.margin = margin;
        ts.padding = padding;
        ts.border = border;
        ts.gap = Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        };

        ts
    }

    fn dim_to_taffy(&self, d: style::Dimension) -> taffy::Dimension {
        match d {
            style::Dimension::Auto => taffy::Dimension::Auto,
            style::Dimension::Px(v) => taffy::Dimension::Length(v),
            style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
        }
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox, TaffyError> {
        let layout = self.taffy.layout(node)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)?
            .iter()
            .map(|&child| self.extract(child, x, y))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            page_break_before: style.page_break_before,
            page_break_after: style.page_break_after,
            page_break_inside_avoid: style.page_break_inside_avoid,
            keep_with_next: style.keep_with_next,
            style,
            content,
            children,
        })
    }
}

// ---------------------------------------------------------------------------
// Image intrinsic-size helper
// ---------------------------------------------------------------------------

/// Attempt to decode a base64 data-URI image and return a cloned
/// [`ComputedStyle`] with any `Auto` width/height replaced by concrete pixel
/// values derived from the image's intrinsic dimensions.
///
/// Returns `None` when the src is not a parseable base64 data URI, when image
/// decoding fails, or when both dimensions are already specified.
fn resolve_img_auto_dimensions(
    src: &str,
    style: &ComputedStyle,
    parent_width: f32,
) -> Option<ComputedStyle> {
    use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

    if !src.starts_with("data:") || !src.contains(";base64,") {
        return None;
    }
    let comma = src.find(',')?;
    let bytes = BASE64_STD.decode(src[comma + 1..].trim()).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (px_w, px_h) = (img.width() as f32, img.height() as f32);
    if px_w == 0.0 || px_h == 0.0 {
        return None;
    }
    let aspect = px_w / px_h;

    let known_w: Option<f32> = match style.width {
        style::Dimension::Px(v) => Some(v),
        style::Dimension::Percent(p) => Some(parent_width * p / 100.0),
        style::Dimension::Auto => None,
    };
    let known_h: Option<f32> = match style.height {
        style::Dimension::Px(v) => Some(v),
        _ => None,
    };

    let mut s = style.clone();
    match (known_w, known_h) {
        (Some(w), None) => s.height = style::Dimension::Px((w / aspect).max(1.0)),
        (None, Some(h)) => s.width = style::Dimension::Px((h * aspect).max(1.0)),
        (None, None) => {
            s.width = style::Dimension::Px(px_w);
            s.height = style::Dimension::Px(px_h);
        }
        (Some(_), Some(_)) => return None,
    }
    Some(s)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned boxes
/// in document coordinates.
///
/// Engine margins are always zero; any visual margin comes from padding on
/// the page containers themselves.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page_width: f32,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>, TaffyError> {
    let content_width = page_width;
    let mut builder = LayoutBuilder::new(fonts, content_width);

    let child_ids = styled_nodes
        .iter()
        .map(|node| builder.build_node(node, content_width))
        .collect::<Result<Vec<_>, _>>()?;

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(content_width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };

    let root = builder.taffy.new_with_children(root_style, &child_ids)?;

    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    let root_box = builder.extract(root, 0.0, 0.0)?;
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::build_styled_tree;

    fn layout(html: &str, width: f32) -> Vec<PositionedBox> {
        let dom = parse_html(html).unwrap();
        let styled = build_styled_tree(&dom, None);
        let fonts = FontManager::default();
        compute_layout(&styled, width, &fonts).unwrap()
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", 595.0);
        assert!(!boxes.is_empty(), "Should produce at least one box");
        let first = &boxes[0];
        assert!(first.width > 0.0, "Box should have width");
        assert!(first.height > 0.0, "Box should have height");
    }

    #[test]
    fn fixed_height_sections_stack() {
        let html = r#"<section style="height: 720px">A</section><section style="height: 720px">B</section>"#;
        let boxes = layout(html, 1280.0);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].height, 720.0);
        assert_eq!(boxes[1].y, 720.0);
    }

    #[test]
    fn grid_columns_split_width() {
        let html = r#"<div style="display: grid; grid-template-columns: repeat(3, 1fr); gap: 20px">
            <div>One</div><div>Two</div><div>Three</div></div>"#;
        let boxes = layout(html, 680.0);
        let grid = &boxes[0];
        assert_eq!(grid.children.len(), 3);
        for cell in &grid.children {
            assert!((cell.width - 213.33).abs() < 1.0, "cell width {}", cell.width);
        }
    }

    #[test]
    fn ordered_list_markers_restart_per_list() {
        let html = "<ol><li>a</li><li>b</li></ol><ol><li>c</li></ol>";
        let boxes = layout(html, 595.0);
        let marker = |b: &PositionedBox| match &b.content {
            BoxContent::ListItem { marker } => marker.clone(),
            _ => String::new(),
        };
        assert_eq!(marker(&boxes[0].children[1]), "2. ");
        assert_eq!(marker(&boxes[1].children[0]), "1. ");
    }
}
