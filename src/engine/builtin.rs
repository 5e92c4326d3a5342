//! The in-process engine: the parse → style → layout → paginate → render
//! pipeline behind the session interface.

use std::time::{Duration, Instant};

use crate::canvas::Canvas;
use crate::dom::DomNode;
use crate::engine::{EngineSession, LayoutEngine, PrintOptions};
use crate::error::EngineError;
use crate::fonts::FontManager;
use crate::layout::PositionedBox;
use crate::pipeline::{self, PipelineConfig};
use crate::render::render_pdf;
use crate::style::parse_px;

/// In-process typesetter. Always available.
#[derive(Clone, Default)]
pub struct BuiltinEngine {
    fonts: FontManager,
}

impl BuiltinEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutEngine for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        log::debug!("builtin: session opened");
        Ok(Box::new(BuiltinSession {
            fonts: &self.fonts,
            state: State::Empty,
        }))
    }
}

enum State {
    Empty,
    Loaded(Vec<DomNode>),
    Stable(Vec<PositionedBox>),
}

struct BuiltinSession<'a> {
    fonts: &'a FontManager,
    state: State,
}

impl EngineSession for BuiltinSession<'_> {
    fn load(&mut self, markup: &str) -> Result<(), EngineError> {
        let dom = pipeline::parse(markup)?;
        log::debug!("builtin: loaded {} top-level node(s)", dom.len());
        self.state = State::Loaded(dom);
        Ok(())
    }

    fn wait_until_stable(&mut self, timeout: Duration) -> Result<(), EngineError> {
        let State::Loaded(dom) = &self.state else {
            return Err(EngineError::Sequence("wait_until_stable called before load"));
        };

        // Page containers carry their own width; the viewport only sizes
        // anything outside them.
        let viewport = Canvas::Fixed {
            width_px: declared_width(dom).unwrap_or_else(|| Canvas::a4().width_px()),
            height_px: 0.0,
        };

        let started = Instant::now();
        let boxes = pipeline::lay_out(dom, &viewport, self.fonts)?;
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(EngineError::Timeout(timeout));
        }
        log::debug!("builtin: layout settled in {elapsed:?}");

        self.state = State::Stable(boxes);
        Ok(())
    }

    fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        let State::Stable(boxes) = &self.state else {
            return Err(EngineError::Sequence("print called before layout was stable"));
        };

        check_overflow(boxes)?;

        let config = PipelineConfig {
            title: options.title.clone(),
            canvas: options.canvas,
            print_background: options.print_background,
        };
        let layout = pipeline::paginate_boxes(boxes, &config, self.fonts);
        log::debug!("builtin: {} page(s) after pagination", layout.pages.len());
        Ok(render_pdf(&layout))
    }
}

impl Drop for BuiltinSession<'_> {
    fn drop(&mut self) {
        log::debug!("builtin: session released");
    }
}

/// Inline `width` of the first top-level element that declares one.
fn declared_width(dom: &[DomNode]) -> Option<f32> {
    dom.iter().find_map(|node| match node {
        DomNode::Element(e) => e.inline_style()?.split(';').find_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            if prop.trim() == "width" {
                parse_px(val)
            } else {
                None
            }
        }),
        DomNode::Text(_) => None,
    })
}

/// Fail on the first top-level container whose content runs past its
/// bottom edge. Anything there would be drawn off the page.
fn check_overflow(boxes: &[PositionedBox]) -> Result<(), EngineError> {
    for (i, pbox) in boxes.iter().enumerate() {
        let by_px = pbox.content_bottom() - (pbox.y + pbox.height);
        if by_px > 0.5 {
            return Err(EngineError::Overflow { page: i + 1, by_px });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<section class="page" style="width: 1280px; height: 720px"><p>Hi</p></section>"#;

    fn options() -> PrintOptions {
        PrintOptions {
            canvas: Canvas::widescreen(),
            print_background: true,
            title: "t".into(),
        }
    }

    #[test]
    fn session_runs_in_order() {
        let engine = BuiltinEngine::new();
        let mut session = engine.open_session().unwrap();
        session.load(PAGE).unwrap();
        session.wait_until_stable(Duration::from_secs(30)).unwrap();
        let pdf = session.print(&options()).unwrap();
        assert_eq!(&pdf[0..5], b"%PDF-");
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let engine = BuiltinEngine::new();
        let mut session = engine.open_session().unwrap();
        assert!(matches!(
            session.wait_until_stable(Duration::from_secs(1)),
            Err(EngineError::Sequence(_))
        ));
        session.load(PAGE).unwrap();
        assert!(matches!(session.print(&options()), Err(EngineError::Sequence(_))));
    }

    #[test]
    fn zero_timeout_expires() {
        let engine = BuiltinEngine::new();
        let mut session = engine.open_session().unwrap();
        session.load(PAGE).unwrap();
        let err = session.wait_until_stable(Duration::ZERO).unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)), "{err:?}");
    }

    #[test]
    fn overfull_page_is_an_error() {
        let paragraphs = "<p>Line</p>".repeat(60);
        let markup = format!(
            r#"<section class="page" style="width: 1280px; height: 720px">{paragraphs}<h2>Stranded</h2></section>"#
        );
        let engine = BuiltinEngine::new();
        let mut session = engine.open_session().unwrap();
        session.load(&markup).unwrap();
        session.wait_until_stable(Duration::from_secs(30)).unwrap();
        match session.print(&options()) {
            Err(EngineError::Overflow { page, by_px }) => {
                assert_eq!(page, 1);
                assert!(by_px > 0.5, "{by_px}");
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn reads_declared_width() {
        let dom = pipeline::parse(PAGE).unwrap();
        assert_eq!(declared_width(&dom), Some(1280.0));
        let dom = pipeline::parse("<p>x</p>").unwrap();
        assert_eq!(declared_width(&dom), None);
    }
}
