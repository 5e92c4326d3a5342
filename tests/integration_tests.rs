//! Integration tests for the folio pipeline, run against the builtin engine.
//!
//! These tests validate:
//! - Both documents render with one page per declared page
//! - Page geometry matches the canvas regime
//! - Title, closing and footer treatment
//! - Failure paths leave no output behind

use std::cell::Cell;
use std::fs;
use std::time::Duration;

use sha2::{Digest, Sha256};

use folio::canvas::Canvas;
use folio::content::{compose, Block, BlockKind, Document, Page, StyleRule, Stylesheet, Typography, PAGE_RULES};
use folio::engine::{BuiltinEngine, EngineSession, LayoutEngine, PrintOptions};
use folio::error::EngineError;
use folio::layout_config::LayoutConfig;
use folio::pipeline::{layout_config, PipelineConfig};
use folio::{render, render_to_file, templates, EngineKind, Error, RenderConfig};

const YEAR: i32 = 2031;

// =====================================================================
// Helpers
// =====================================================================

fn config() -> RenderConfig {
    RenderConfig::default().with_engine(EngineKind::Builtin)
}

fn frozen_layout(doc: &Document) -> LayoutConfig {
    let markup = compose(doc).unwrap();
    let config = PipelineConfig {
        title: doc.title().to_string(),
        ..PipelineConfig::for_canvas(doc.canvas())
    };
    layout_config(&markup, &config).unwrap()
}

fn digest(text: &str) -> Vec<u8> {
    Sha256::digest(text.as_bytes()).to_vec()
}

fn headings(doc: &Document) -> Vec<String> {
    doc.pages()
        .iter()
        .flat_map(|p| &p.blocks)
        .filter_map(|b| match b {
            Block::Heading(text) => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Text lines of a page without its footer.
fn body_text(layout: &LayoutConfig, doc: &Document, page: usize) -> Vec<String> {
    let total = doc.page_count();
    layout
        .page_text(page)
        .into_iter()
        .filter(|line| line != doc.title() && !line.ends_with(&format!(" / {total}")))
        .collect()
}

/// An engine that cannot be started; counts attempts.
struct Unstartable {
    attempts: Cell<usize>,
}

impl LayoutEngine for Unstartable {
    fn name(&self) -> &str {
        "unstartable"
    }

    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(EngineError::Unavailable {
            engine: "unstartable".into(),
            reason: "no browser installed".into(),
        })
    }
}

/// Wraps the builtin engine and counts sessions opened and released.
#[derive(Default)]
struct Counting {
    inner: BuiltinEngine,
    opened: Cell<usize>,
    released: Cell<usize>,
}

struct CountingSession<'a> {
    inner: Box<dyn EngineSession + 'a>,
    released: &'a Cell<usize>,
}

impl LayoutEngine for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        self.opened.set(self.opened.get() + 1);
        Ok(Box::new(CountingSession {
            inner: self.inner.open_session()?,
            released: &self.released,
        }))
    }
}

impl EngineSession for CountingSession<'_> {
    fn load(&mut self, markup: &str) -> Result<(), EngineError> {
        self.inner.load(markup)
    }

    fn wait_until_stable(&mut self, timeout: Duration) -> Result<(), EngineError> {
        self.inner.wait_until_stable(timeout)
    }

    fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        self.inner.print(options)
    }
}

impl Drop for CountingSession<'_> {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

// =====================================================================
// Page count and geometry
// =====================================================================

#[test]
fn deck_renders_nine_widescreen_pages() {
    let doc = templates::deck(YEAR).unwrap();
    let rendered = render(&BuiltinEngine::new(), &doc, &config()).unwrap();
    assert_eq!(rendered.page_count(), 9);
    for page in &rendered.pages {
        assert!(page.matches(960.0, 540.0, 0.5), "{page:?}");
    }
}

#[test]
fn manual_renders_eight_a4_pages() {
    let doc = templates::manual(YEAR).unwrap();
    let rendered = render(&BuiltinEngine::new(), &doc, &config()).unwrap();
    assert_eq!(rendered.page_count(), 8);
    for page in &rendered.pages {
        // 210 x 297 mm
        assert!(page.matches(595.28, 841.89, 0.5), "{page:?}");
    }
}

#[test]
fn one_session_per_render_and_it_is_released() {
    let engine = Counting::default();
    let doc = templates::manual(YEAR).unwrap();
    render(&engine, &doc, &config()).unwrap();
    assert_eq!(engine.opened.get(), 1);
    assert_eq!(engine.released.get(), 1);
}

// =====================================================================
// Scenarios
// =====================================================================

#[test]
fn deck_is_framed_by_title_and_closing_backgrounds() {
    let doc = templates::deck(YEAR).unwrap();
    let layout = frozen_layout(&doc);
    assert_eq!(layout.pages.len(), 9);

    let background = |page: usize| layout.pages[page].boxes[0].background_color;
    let body = background(2);
    assert!(background(0).is_some());
    assert!(background(8).is_some());
    assert_ne!(background(0), body);
    assert_ne!(background(8), body);
    assert_ne!(background(0), background(8));

    assert!(layout.page_text(0).iter().any(|l| l.contains("Folio Platform Review")));
    assert!(layout.page_text(8).iter().any(|l| l == "Thank you"));
}

#[test]
fn year_appears_on_the_manual_title_page_only() {
    let doc = templates::manual(YEAR).unwrap();
    let layout = frozen_layout(&doc);
    assert_eq!(layout.pages.len(), 8);

    let year = YEAR.to_string();
    assert!(layout.page_text(0).iter().any(|l| l.contains(&year)));
    for page in 1..layout.pages.len() {
        assert!(
            !layout.page_text(page).iter().any(|l| l.contains(&year)),
            "year leaked onto page {}",
            page + 1
        );
    }
}

#[test]
fn body_pages_carry_numbered_footers() {
    let doc = templates::deck(YEAR).unwrap();
    let layout = frozen_layout(&doc);
    assert!(layout.page_text(1).iter().any(|l| l == "2 / 9"));
    assert!(layout.page_text(7).iter().any(|l| l == "8 / 9"));
    assert!(!layout.page_text(0).iter().any(|l| l.ends_with("/ 9")));
    assert!(!layout.page_text(8).iter().any(|l| l.ends_with("/ 9")));
}

#[test]
fn unavailable_engine_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = Unstartable {
        attempts: Cell::new(0),
    };
    let doc = templates::deck(YEAR).unwrap();
    let config = config().with_anchor(tmp.path());

    let err = render_to_file(&engine, &doc, &config, "out/deck.pdf").unwrap_err();
    match &err {
        Error::EngineUnavailable { engine, reason } => {
            assert_eq!(engine, "unstartable");
            assert!(reason.contains("no browser"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(engine.attempts.get(), 1);
    assert!(!tmp.path().join("out/deck.pdf").exists());
}

#[test]
fn failed_write_leaves_no_partial_file() {
    let tmp = tempfile::tempdir().unwrap();
    // `out` is a file, so the destination directory cannot be created.
    fs::write(tmp.path().join("out"), b"placeholder").unwrap();
    let doc = templates::manual(YEAR).unwrap();
    let config = config().with_anchor(tmp.path());

    let err = render_to_file(&BuiltinEngine::new(), &doc, &config, "out/manual.pdf").unwrap_err();
    assert!(matches!(err, Error::Write { .. }), "{err:?}");
    assert_eq!(fs::read(tmp.path().join("out")).unwrap(), b"placeholder");
    assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
}

#[test]
fn render_to_file_writes_under_the_anchor() {
    let tmp = tempfile::tempdir().unwrap();
    let doc = templates::deck(YEAR).unwrap();
    let config = config().with_anchor(tmp.path());

    let path = render_to_file(&BuiltinEngine::new(), &doc, &config, &config.deck_output).unwrap();
    assert_eq!(path, tmp.path().join("out/deck.pdf"));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..5], b"%PDF-");
}

#[test]
fn overfull_page_fails_and_writes_nothing() {
    let mut sheet = Stylesheet::new(Typography::default()).token("ink", "#111111");
    for rule in PAGE_RULES
        .iter()
        .chain(BlockKind::Paragraph.rules())
        .chain(BlockKind::Heading.rules())
    {
        sheet = sheet.rule(*rule, StyleRule::new());
    }
    let mut page = Page::body("Crowded");
    for i in 0..60 {
        page = page.block(Block::Paragraph(format!("Paragraph {i}")));
    }
    let page = page.block(Block::Heading("Stranded heading".into()));
    let doc = Document::builder("Crowded", Canvas::widescreen(), sheet)
        .page(page)
        .build()
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let config = config().with_anchor(tmp.path());
    let err = render_to_file(&BuiltinEngine::new(), &doc, &config, "out/crowded.pdf").unwrap_err();
    match err {
        Error::PageOverflow { page, by_px, .. } => {
            assert_eq!(page, 1);
            assert!(by_px > 0.5, "{by_px}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!tmp.path().join("out/crowded.pdf").exists());
}

#[test]
fn step_lists_number_from_one() {
    let doc = templates::manual(YEAR).unwrap();
    let markup = compose(&doc).unwrap();
    let numbers: Vec<u32> = markup
        .split("data-step=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next()?.parse().ok())
        .collect();
    // Getting started has four steps, then two lists of three.
    assert_eq!(numbers, vec![1, 2, 3, 4, 1, 2, 3, 1, 2, 3]);
}

// =====================================================================
// Break rules and stability
// =====================================================================

#[test]
fn no_heading_ends_a_page() {
    for doc in [templates::deck(YEAR).unwrap(), templates::manual(YEAR).unwrap()] {
        let layout = frozen_layout(&doc);
        let headings = headings(&doc);
        for page in 0..layout.pages.len() {
            if let Some(last) = body_text(&layout, &doc, page).last() {
                assert!(
                    !headings.contains(last),
                    "{}: page {} ends with heading '{last}'",
                    doc.title(),
                    page + 1
                );
            }
        }
    }
}

#[test]
fn rendering_twice_is_stable() {
    let doc = templates::deck(YEAR).unwrap();
    let first = render(&BuiltinEngine::new(), &doc, &config()).unwrap();
    let second = render(&BuiltinEngine::new(), &doc, &config()).unwrap();

    assert_eq!(digest(&first.markup), digest(&second.markup));
    assert_eq!(first.page_count(), second.page_count());
    let (a, b) = (first.pdf.len() as f64, second.pdf.len() as f64);
    assert!((a - b).abs() / a < 0.01, "{a} vs {b} bytes");
}

#[test]
fn layout_config_json_roundtrip() {
    let doc = templates::deck(YEAR).unwrap();
    let layout = frozen_layout(&doc);
    let json = layout.to_json().unwrap();
    let back = LayoutConfig::from_json(&json).unwrap();
    assert_eq!(back.pages.len(), layout.pages.len());
    assert_eq!(back.page_text(3), layout.page_text(3));
}
