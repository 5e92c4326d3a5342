//! Pipeline – the builtin engine's stages, and a one-call convenience that
//! runs them all.
//!
//! 1. **Parse** – markup → DOM tree ([`crate::dom`])
//! 2. **Style** – inline declarations and structural classes ([`crate::style`])
//! 3. **Layout** – flexbox/grid layout with Taffy ([`crate::layout`])
//! 4. **Paginate** – split at forced breaks, honour break avoidance
//!    ([`crate::pagination`])
//! 5. **Render** – PDF bytes via printpdf ([`crate::render`])

use crate::canvas::Canvas;
use crate::dom::{body_children, parse_html, DomNode};
use crate::error::EngineError;
use crate::fonts::FontManager;
use crate::layout::{compute_layout, PositionedBox};
use crate::layout_config::LayoutConfig;
use crate::pagination::paginate;
use crate::render::render_pdf;
use crate::style::build_styled_tree;

/// Configuration for the builtin pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub canvas: Canvas,
    /// Paint background colours. When false, backgrounds are dropped.
    pub print_background: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: "folio output".to_string(),
            canvas: Canvas::a4(),
            print_background: true,
        }
    }
}

impl PipelineConfig {
    pub fn for_canvas(canvas: Canvas) -> Self {
        Self {
            canvas,
            ..Self::default()
        }
    }
}

/// Stage 1: parse markup and return the children of `<body>`.
pub fn parse(html: &str) -> Result<Vec<DomNode>, EngineError> {
    let dom = parse_html(html).map_err(|e| EngineError::Load(e.to_string()))?;
    Ok(body_children(&dom))
}

/// Stages 2–3: resolve styles and compute document-space boxes.
pub fn lay_out(
    dom: &[DomNode],
    canvas: &Canvas,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>, EngineError> {
    let styled = build_styled_tree(dom, None);
    compute_layout(&styled, canvas.width_px(), fonts)
        .map_err(|e| EngineError::Rasterize(format!("layout failed: {e}")))
}

/// Stage 4: split boxes into pages.
pub fn paginate_boxes(
    boxes: &[PositionedBox],
    config: &PipelineConfig,
    fonts: &FontManager,
) -> LayoutConfig {
    let mut layout = paginate(
        boxes,
        config.canvas.width_px(),
        config.canvas.height_px(),
        fonts,
    );
    layout.title = config.title.clone();
    if !config.print_background {
        for page in &mut layout.pages {
            for b in &mut page.boxes {
                strip_backgrounds(b);
            }
        }
    }
    layout
}

fn strip_backgrounds(lbox: &mut crate::layout_config::LayoutBox) {
    lbox.background_color = None;
    for child in &mut lbox.children {
        strip_backgrounds(child);
    }
}

/// Full pipeline: markup → PDF bytes plus the frozen layout.
pub fn typeset(html: &str, config: &PipelineConfig) -> Result<(Vec<u8>, LayoutConfig), EngineError> {
    let layout = layout_config(html, config)?;
    let pdf = render_pdf(&layout);
    Ok((pdf, layout))
}

/// Stages 1–4 only – useful for inspecting where text landed.
pub fn layout_config(html: &str, config: &PipelineConfig) -> Result<LayoutConfig, EngineError> {
    let fonts = FontManager::default();
    let dom = parse(html)?;
    let boxes = lay_out(&dom, &config.canvas, &fonts)?;
    Ok(paginate_boxes(&boxes, config, &fonts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_basic() {
        let html = "<h1>Hello</h1><p>World</p>";
        let (bytes, config) = typeset(html, &PipelineConfig::default()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(config.pages.len(), 1);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn malformed_markup_fails_to_load() {
        let err = typeset("<div><p>open</div>", &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Load(_)), "{err:?}");
    }

    #[test]
    fn backgrounds_can_be_dropped() {
        let html = r#"<div style="height: 40px; background-color: #ff0000">x</div>"#;
        let mut config = PipelineConfig::for_canvas(Canvas::widescreen());
        let kept = layout_config(html, &config).unwrap();
        assert!(kept.pages[0].boxes[0].background_color.is_some());

        config.print_background = false;
        let dropped = layout_config(html, &config).unwrap();
        assert!(dropped.pages[0].boxes[0].background_color.is_none());
    }
}
