//! Drives one document through a layout engine and checks the result.

use std::path::{Path, PathBuf};

use crate::config::RenderConfig;
use crate::content::{compose, Document};
use crate::engine::{LayoutEngine, PrintOptions};
use crate::error::{Error, Result};
use crate::inspect::{page_geometry, PageGeometry};
use crate::writer::OutputWriter;

/// MediaBox tolerance in points.
const GEOMETRY_TOLERANCE_PT: f32 = 0.5;

/// A verified rendering.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub pdf: Vec<u8>,
    /// The markup handed to the engine.
    pub markup: String,
    pub pages: Vec<PageGeometry>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Compose `document`, lay it out with `engine` in a single session, print
/// it, and verify page count and page geometry against the document.
pub fn render(
    engine: &dyn LayoutEngine,
    document: &Document,
    config: &RenderConfig,
) -> Result<RenderedDocument> {
    let name = engine.name();
    document.validate()?;
    let markup = compose(document)?;
    log::debug!(
        "{}: composed {} page(s), {} bytes of markup",
        document.title(),
        document.page_count(),
        markup.len()
    );

    let canvas = document.canvas();
    let pdf = {
        let mut session = engine
            .open_session()
            .map_err(|e| Error::from_engine(name, e))?;
        session
            .load(&markup)
            .map_err(|e| Error::from_engine(name, e))?;
        session
            .wait_until_stable(config.stabilization_timeout)
            .map_err(|e| Error::from_engine(name, e))?;
        session
            .print(&PrintOptions {
                canvas,
                print_background: true,
                title: document.title().to_string(),
            })
            .map_err(|e| Error::from_engine(name, e))?
    };

    let pages = page_geometry(&pdf)?;
    if pages.len() != document.page_count() {
        return Err(Error::PageCountMismatch {
            declared: document.page_count(),
            rendered: pages.len(),
        });
    }
    let (expected_w, expected_h) = (canvas.width_pt(), canvas.height_pt());
    if let Some((i, page)) = pages
        .iter()
        .enumerate()
        .find(|(_, p)| !p.matches(expected_w, expected_h, GEOMETRY_TOLERANCE_PT))
    {
        return Err(Error::GeometryMismatch {
            page: i + 1,
            expected_w,
            expected_h,
            actual_w: page.width_pt,
            actual_h: page.height_pt,
        });
    }

    log::debug!("{name}: rendered {} page(s), {} bytes", pages.len(), pdf.len());
    Ok(RenderedDocument { pdf, markup, pages })
}

/// [`render`], then write the PDF to `relative` under the configured anchor.
/// Nothing is written when rendering fails.
pub fn render_to_file(
    engine: &dyn LayoutEngine,
    document: &Document,
    config: &RenderConfig,
    relative: impl AsRef<Path>,
) -> Result<PathBuf> {
    let rendered = render(engine, document, config)?;
    let path = OutputWriter::new(&config.anchor).write(relative, &rendered.pdf)?;
    log::info!(
        "wrote {} ({} pages, {} bytes)",
        path.display(),
        rendered.page_count(),
        rendered.pdf.len()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::content::{Block, BlockKind, Page, StyleRule, Stylesheet, Typography, PAGE_RULES};
    use crate::engine::{BuiltinEngine, EngineSession};
    use crate::error::EngineError;
    use crate::layout_config::{LayoutConfig, PageLayout};
    use crate::render::render_pdf;
    use std::time::Duration;

    fn doc(pages: usize) -> Document {
        let mut sheet = Stylesheet::new(Typography::default()).token("ink", "#111111");
        for rule in PAGE_RULES.iter().chain(BlockKind::Paragraph.rules()) {
            sheet = sheet.rule(*rule, StyleRule::new());
        }
        let mut builder = Document::builder("Driver", Canvas::widescreen(), sheet);
        for i in 0..pages {
            builder = builder.page(
                Page::body(&format!("Section {i}"))
                    .block(Block::Paragraph(format!("Body {i}")))
                    .without_footer(),
            );
        }
        builder.build().unwrap()
    }

    /// Prints a fixed number of pages at a fixed size, whatever it loads.
    struct Canned {
        pages: usize,
        width_px: f32,
    }

    impl LayoutEngine for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn open_session(&self) -> std::result::Result<Box<dyn EngineSession + '_>, EngineError> {
            Ok(Box::new(CannedSession(self)))
        }
    }

    struct CannedSession<'a>(&'a Canned);

    impl EngineSession for CannedSession<'_> {
        fn load(&mut self, _markup: &str) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn wait_until_stable(&mut self, _timeout: Duration) -> std::result::Result<(), EngineError> {
            Ok(())
        }

        fn print(&mut self, _options: &PrintOptions) -> std::result::Result<Vec<u8>, EngineError> {
            let mut layout = LayoutConfig::new(self.0.width_px, 720.0);
            for i in 0..self.0.pages {
                layout.pages.push(PageLayout {
                    page_index: i,
                    boxes: Vec::new(),
                });
            }
            Ok(render_pdf(&layout))
        }
    }

    #[test]
    fn renders_with_builtin_engine() {
        let rendered = render(&BuiltinEngine::new(), &doc(3), &RenderConfig::default()).unwrap();
        assert_eq!(rendered.page_count(), 3);
        assert!(rendered.markup.contains("Body 2"));
    }

    #[test]
    fn page_count_mismatch_is_reported() {
        let engine = Canned {
            pages: 2,
            width_px: 1280.0,
        };
        let err = render(&engine, &doc(3), &RenderConfig::default()).unwrap_err();
        assert!(
            matches!(err, Error::PageCountMismatch { declared: 3, rendered: 2 }),
            "{err:?}"
        );
    }

    #[test]
    fn geometry_mismatch_is_reported() {
        let engine = Canned {
            pages: 2,
            width_px: 1000.0,
        };
        let err = render(&engine, &doc(2), &RenderConfig::default()).unwrap_err();
        assert!(matches!(err, Error::GeometryMismatch { page: 1, .. }), "{err:?}");
    }
}
