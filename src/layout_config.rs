//! Layout config – the intermediate representation between pagination and PDF
//! rendering. This is the "frozen" structure that encodes exactly what goes on
//! each page, and can be dumped to JSON for inspection.

use serde::{Deserialize, Serialize};

use crate::canvas::PX_TO_PT;

/// Unit of every coordinate in a [`LayoutConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Units {
    /// CSS pixels, as produced by layout and pagination.
    #[default]
    Px,
    /// PDF points, as consumed by the renderer.
    Pt,
}

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    #[serde(default)]
    pub units: Units,
    pub page_width: f32,
    pub page_height: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    /// Content (mutually exclusive in practice)
    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    /// The box asked not to be split across pages.
    #[serde(default)]
    pub avoid_break_inside: bool,
    /// The box asked to share a page with its successor.
    #[serde(default)]
    pub keep_with_next: bool,

    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub underline: bool,
    /// List bullet/number prefix (e.g. "• " or "1. ")
    pub list_marker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box (for alignment)
    pub x_offset: f32,
    /// Y offset from the top of the text content area
    pub y_offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    /// An empty layout with the given page size in CSS px.
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            title: Self::default_title(),
            units: Units::Px,
            page_width,
            page_height,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "folio output".to_string()
    }

    /// Convert every coordinate to PDF points. A no-op for configs already
    /// in points.
    pub fn to_points(&self) -> LayoutConfig {
        if self.units == Units::Pt {
            return self.clone();
        }
        let k = PX_TO_PT;
        LayoutConfig {
            title: self.title.clone(),
            units: Units::Pt,
            page_width: self.page_width * k,
            page_height: self.page_height * k,
            pages: self
                .pages
                .iter()
                .map(|p| PageLayout {
                    page_index: p.page_index,
                    boxes: p.boxes.iter().map(|b| b.scaled(k)).collect(),
                })
                .collect(),
        }
    }

    /// All text lines on a page, in paint order.
    pub fn page_text(&self, page: usize) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(p) = self.pages.get(page) {
            for b in &p.boxes {
                b.visit(&mut |lb| {
                    if let Some(t) = &lb.text {
                        out.extend(t.lines.iter().map(|l| l.text.clone()));
                    }
                });
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            avoid_break_inside: false,
            keep_with_next: false,
            children: Vec::new(),
        }
    }

    /// Depth-first visit of this box and all descendants.
    pub fn visit(&self, f: &mut dyn FnMut(&LayoutBox)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    fn scaled(&self, k: f32) -> LayoutBox {
        LayoutBox {
            x: self.x * k,
            y: self.y * k,
            width: self.width * k,
            height: self.height * k,
            background_color: self.background_color,
            border: self.border.as_ref().map(|b| BorderStyle {
                width: b.width * k,
                color: b.color,
            }),
            text: self.text.as_ref().map(|t| TextContent {
                lines: t
                    .lines
                    .iter()
                    .map(|l| TextLine {
                        text: l.text.clone(),
                        x_offset: l.x_offset * k,
                        y_offset: l.y_offset * k,
                    })
                    .collect(),
                font_family: t.font_family.clone(),
                font_size: t.font_size * k,
                bold: t.bold,
                italic: t.italic,
                color: t.color,
                line_height: t.line_height * k,
                underline: t.underline,
                list_marker: t.list_marker.clone(),
            }),
            image: self.image.as_ref().map(|i| ImageContent {
                src: i.src.clone(),
                width: i.width * k,
                height: i.height * k,
            }),
            avoid_break_inside: self.avoid_break_inside,
            keep_with_next: self.keep_with_next,
            children: self.children.iter().map(|c| c.scaled(k)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_points_scales_geometry_and_type() {
        let mut config = LayoutConfig::new(1280.0, 720.0);
        let mut b = LayoutBox::new(40.0, 80.0, 400.0, 20.0);
        b.text = Some(TextContent {
            lines: vec![TextLine {
                text: "Hi".into(),
                x_offset: 4.0,
                y_offset: 0.0,
            }],
            font_family: "Helvetica".into(),
            font_size: 16.0,
            bold: false,
            italic: false,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 20.0,
            underline: false,
            list_marker: None,
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![b],
        });

        let pt = config.to_points();
        assert_eq!(pt.units, Units::Pt);
        assert_eq!(pt.page_width, 960.0);
        assert_eq!(pt.page_height, 540.0);
        let text = pt.pages[0].boxes[0].text.as_ref().unwrap();
        assert_eq!(text.font_size, 12.0);
        assert_eq!(text.lines[0].x_offset, 3.0);

        // Converting twice must not scale twice.
        assert_eq!(pt.to_points().page_width, 960.0);
    }

    #[test]
    fn json_keeps_break_flags() {
        let mut config = LayoutConfig::new(100.0, 100.0);
        let mut b = LayoutBox::new(0.0, 0.0, 10.0, 10.0);
        b.keep_with_next = true;
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![b],
        });
        let parsed = LayoutConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert!(parsed.pages[0].boxes[0].keep_with_next);
        assert_eq!(parsed.units, Units::Px);
    }
}
