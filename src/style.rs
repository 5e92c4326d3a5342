//! Style resolver – maps inline CSS declarations and the template's
//! structural classes to a flat [`ComputedStyle`] consumed by the layout
//! engine.
//!
//! Only inline `style` attributes are read; the `<style>` element in the
//! document head exists for browser engines and is ignored here. The content
//! template therefore inlines every declaration a block needs.

use crate::canvas::{PX_PER_MM, PX_TO_PT};
use crate::dom::{DomNode, ElementNode, Tag};

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
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
    pub grid_template_columns: Vec<GridTrack>,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
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

    // Border
    pub border_width: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub font_style: FontStyle,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
    /// `break-after: avoid` – the box must share a page with its successor.
    pub keep_with_next: bool,
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
            grid_template_columns: Vec::new(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_width: 0.0,
            border_color: Color::BLACK,
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_family: "Helvetica".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            text_decoration: TextDecoration::None,
            font_style: FontStyle::Normal,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
            keep_with_next: false,
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
    InlineBlock,
    ListItem,
    TableRow,
    TableCell,
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
    SpaceAround,
    SpaceEvenly,
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
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridTrack {
    Px(f32),
    Fr(f32),
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
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(element: &ElementNode, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = base_style_for_tag(&element.tag);

    // Inherit text properties from parent
    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.font_family = p.font_family.clone();
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
        style.font_style = p.font_style;
        if !element.tag.is_heading() && element.tag != Tag::Th {
            style.font_weight = p.font_weight;
        }
    }

    for class in element.classes() {
        apply_structural_class(&mut style, class);
    }

    if let Some(inline) = element.inline_style() {
        apply_inline_style(&mut style, inline);
    }

    style
}

/// Default styles based on tag semantics.
fn base_style_for_tag(tag: &Tag) -> ComputedStyle {
    let mut s = ComputedStyle::default();
    match tag {
        Tag::H1 | Tag::H2 | Tag::H3 => {
            s.font_size = match tag {
                Tag::H1 => 32.0,
                Tag::H2 => 24.0,
                _ => 20.0,
            };
            s.font_weight = FontWeight::Bold;
            s.margin_bottom = 10.0;
            // Same as a browser UA sheet: never strand a heading.
            s.keep_with_next = true;
            s.page_break_inside_avoid = true;
        }
        Tag::P => {
            s.margin_bottom = 10.0;
        }
        Tag::Ul | Tag::Ol => {
            s.margin_bottom = 10.0;
            s.padding_left = 24.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin_bottom = 4.0;
        }
        Tag::Table => {
            s.display = Display::Grid;
            s.border_width = 1.0;
        }
        Tag::Tr => {
            s.display = Display::TableRow;
            s.page_break_inside_avoid = true;
        }
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding_top = 4.0;
            s.padding_right = 8.0;
            s.padding_bottom = 4.0;
            s.padding_left = 8.0;
            s.border_width = 1.0;
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
                s.background_color = Color {
                    r: 0.93,
                    g: 0.93,
                    b: 0.93,
                    a: 1.0,
                };
            }
        }
        Tag::Span => {
            s.display = Display::Inline;
        }
        Tag::Img => {
            s.display = Display::InlineBlock;
        }
        Tag::Section | Tag::Footer | Tag::Div | Tag::Body | Tag::Html => {}
        Tag::Head | Tag::Style | Tag::Title | Tag::Meta | Tag::Br | Tag::Unknown(_) => {
            s.display = Display::None;
        }
    }
    s
}

/// Apply one of the structural classes the content template emits.
///
/// Visual classes (`r-callout`, `tone-warning`, ...) only carry meaning for
/// browser engines and fall through untouched.
fn apply_structural_class(s: &mut ComputedStyle, class: &str) {
    match class {
        "page" => {
            s.page_break_after = true;
            s.page_break_inside_avoid = true;
        }
        "last" => s.page_break_after = false,
        "keep" => s.page_break_inside_avoid = true,
        "keep-with-next" => s.keep_with_next = true,
        "hidden" => s.display = Display::None,
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Inline style parsing (limited subset)
// ---------------------------------------------------------------------------

fn apply_inline_style(s: &mut ComputedStyle, style_str: &str) {
    for decl in style_str.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let mut parts = decl.splitn(2, ':');
        let prop = match parts.next() {
            Some(p) => p.trim(),
            None => continue,
        };
        let val = match parts.next() {
            Some(v) => v.trim(),
            None => continue,
        };
        apply_css_property(s, prop, val);
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
                "inline-block" => Display::InlineBlock,
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
        "flex-wrap" => {
            s.flex_wrap = match val {
                "wrap" => FlexWrap::Wrap,
                _ => FlexWrap::NoWrap,
            }
        }
        "flex" => {
            // `flex: <grow> [<shrink> [<basis>]]`
            let mut nums = val.split_whitespace().map(|p| p.parse::<f32>());
            if let Some(Ok(grow)) = nums.next() {
                s.flex_grow = grow;
            }
            if let Some(Ok(shrink)) = nums.next() {
                s.flex_shrink = shrink;
            }
        }
        "flex-grow" => {
            if let Ok(v) = val.parse() {
                s.flex_grow = v;
            }
        }
        "flex-shrink" => {
            if let Ok(v) = val.parse() {
                s.flex_shrink = v;
            }
        }
        "justify-content" => {
            s.justify_content = match val {
                "flex-start" | "start" => JustifyContent::Start,
                "flex-end" | "end" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" => AlignItems::Stretch,
                _ => s.align_items,
            }
        }
        "grid-template-columns" => {
            s.grid_template_columns = parse_grid_tracks(val);
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
                "italic" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "font-family" => {
            if let Some(first) = val.split(',').next() {
                s.font_family = first.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
            }
        }
        "text-decoration" => {
            s.text_decoration = match val {
                "underline" => TextDecoration::Underline,
                _ => TextDecoration::None,
            }
        }
        "color" => {
            if let Some(c) = Color::from_hex(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::from_hex(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "width" => s.width = parse_dimension(val),
        "height" => s.height = parse_dimension(val),
        "min-width" => s.min_width = parse_dimension(val),
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
        "border" => {
            // `border: <width> <style> <color>` in any order.
            for part in val.split_whitespace() {
                if let Some(px) = parse_px(part) {
                    s.border_width = px;
                } else if let Some(c) = Color::from_hex(part) {
                    s.border_color = c;
                } else if part == "none" {
                    s.border_width = 0.0;
                }
            }
        }
        "border-width" => set_px(&mut s.border_width, val),
        "border-color" => {
            if let Some(c) = Color::from_hex(val) {
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
        "break-before" | "page-break-before" => {
            s.page_break_before = val == "always" || val == "page";
        }
        "break-after" | "page-break-after" => {
            s.page_break_after = val == "always" || val == "page";
            s.keep_with_next = val == "avoid" || val == "avoid-page";
        }
        "break-inside" | "page-break-inside" => {
            s.page_break_inside_avoid = val == "avoid" || val == "avoid-page";
        }
        _ => {}
    }
}

fn set_px(slot: &mut f32, val: &str) {
    if let Some(px) = parse_px(val) {
        *slot = px;
    }
}

/// Lengths in `px`, `mm` or `pt`, returned in px. Unitless numbers are px.
pub(crate) fn parse_px(s: &str) -> Option<f32> {
    let s = s.trim();
    if let Some(mm) = s.strip_suffix("mm") {
        return mm.trim().parse::<f32>().ok().map(|v| v * PX_PER_MM);
    }
    if let Some(pt) = s.strip_suffix("pt") {
        return pt.trim().parse::<f32>().ok().map(|v| v / PX_TO_PT);
    }
    s.trim_end_matches("px").parse().ok()
}

fn parse_dimension(s: &str) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        Dimension::Auto
    } else if s.ends_with('%') {
        s.trim_end_matches('%')
            .parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_px(s).map(Dimension::Px).unwrap_or(Dimension::Auto)
    }
}

/// `repeat(3, 1fr)`, `1fr 2fr`, `120px 1fr`.
fn parse_grid_tracks(val: &str) -> Vec<GridTrack> {
    if let Some(inner) = val
        .trim()
        .strip_prefix("repeat(")
        .and_then(|r| r.strip_suffix(')'))
    {
        let mut parts = inner.splitn(2, ',');
        let count = parts.next().and_then(|c| c.trim().parse::<usize>().ok());
        let track = parts.next().and_then(|t| parse_track(t.trim()));
        return match (count, track) {
            (Some(n), Some(t)) => vec![t; n],
            _ => Vec::new(),
        };
    }
    val.split_whitespace().filter_map(parse_track).collect()
}

fn parse_track(t: &str) -> Option<GridTrack> {
    if let Some(fr) = t.strip_suffix("fr") {
        fr.parse().ok().map(GridTrack::Fr)
    } else {
        parse_px(t).map(GridTrack::Px)
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
    match parts.len() {
        1 => {
            *top = parts[0];
            *right = parts[0];
            *bottom = parts[0];
            *left = parts[0];
        }
        2 => {
            *top = parts[0];
            *bottom = parts[0];
            *right = parts[1];
            *left = parts[1];
        }
        3 => {
            *top = parts[0];
            *right = parts[1];
            *left = parts[1];
            *bottom = parts[2];
        }
        4 => {
            *top = parts[0];
            *right = parts[1];
            *bottom = parts[2];
            *left = parts[3];
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
        /// Original attributes (for images src, etc.)
        attrs: std::collections::HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
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
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if !text.trim().is_empty() {
                    let mut style = parent_style.cloned().unwrap_or_default();
                    // Text nodes render inline – clear every box-model and
                    // pagination property that must not be inherited.
                    style.border_width = 0.0;
                    style.background_color = Color::TRANSPARENT;
                    style.margin_top = 0.0;
                    style.margin_right = 0.0;
                    style.margin_bottom = 0.0;
                    style.margin_left = 0.0;
                    style.padding_top = 0.0;
                    style.padding_right = 0.0;
                    style.padding_bottom = 0.0;
                    style.padding_left = 0.0;
                    style.width = Dimension::Auto;
                    style.height = Dimension::Auto;
                    style.page_break_before = false;
                    style.page_break_after = false;
                    style.keep_with_next = false;
                    result.push(StyledNode::Text {
                        text: text.clone(),
                        style,
                    });
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn inline_style_font_size() {
        let mut s = ComputedStyle::default();
        apply_inline_style(&mut s, "font-size: 24px; color: #ff0000");
        assert_eq!(s.font_size, 24.0);
        assert!((s.color.r - 1.0).abs() < 0.01);
    }

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert!(Color::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn break_after_avoid_keeps_with_next() {
        let mut s = ComputedStyle::default();
        apply_inline_style(&mut s, "break-after: avoid");
        assert!(s.keep_with_next);
        assert!(!s.page_break_after);
    }

    #[test]
    fn page_class_forces_break_unless_last() {
        let nodes = parse_html(r#"<section class="page">a</section>"#).unwrap();
        let styled = build_styled_tree(&nodes, None);
        match &styled[0] {
            StyledNode::Element { style, .. } => assert!(style.page_break_after),
            _ => panic!("Expected element"),
        }

        let nodes = parse_html(r#"<section class="page last">a</section>"#).unwrap();
        let styled = build_styled_tree(&nodes, None);
        match &styled[0] {
            StyledNode::Element { style, .. } => {
                assert!(!style.page_break_after);
                assert!(style.page_break_inside_avoid);
            }
            _ => panic!("Expected element"),
        }
    }

    #[test]
    fn grid_repeat_tracks() {
        assert_eq!(
            parse_grid_tracks("repeat(3, 1fr)"),
            vec![GridTrack::Fr(1.0); 3]
        );
        assert_eq!(
            parse_grid_tracks("120px 1fr"),
            vec![GridTrack::Px(120.0), GridTrack::Fr(1.0)]
        );
    }

    #[test]
    fn physical_lengths_convert_to_px() {
        let mut s = ComputedStyle::default();
        apply_inline_style(&mut s, "height: 297mm; margin-top: 12pt");
        assert_eq!(s.height, Dimension::Px(297.0 * PX_PER_MM));
        assert_eq!(s.margin_top, 16.0);
    }

    #[test]
    fn border_shorthand_reads_width_and_colour() {
        let mut s = ComputedStyle::default();
        apply_inline_style(&mut s, "border: 2px solid #3366cc");
        assert_eq!(s.border_width, 2.0);
        assert!((s.border_color.b - 0.8).abs() < 0.01);
    }

    #[test]
    fn headings_keep_with_next_by_default() {
        let nodes = parse_html("<h2>Title</h2>").unwrap();
        let styled = build_styled_tree(&nodes, None);
        match &styled[0] {
            StyledNode::Element { style, .. } => {
                assert!(style.keep_with_next);
                assert!(style.page_break_inside_avoid);
            }
            _ => panic!("Expected element"),
        }
    }
}
