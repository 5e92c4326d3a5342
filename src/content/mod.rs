//! Content model: documents, pages and blocks.
//!
//! A [`Document`] is assembled with a [`DocumentBuilder`], validated once in
//! [`DocumentBuilder::build`], and is immutable afterwards. Composition into
//! markup lives in [`compose`].

pub mod compose;
pub mod counters;
pub mod stylesheet;

use crate::canvas::Canvas;
use crate::error::ContentError;

pub use compose::compose;
pub use counters::{Counter, Counters};
pub use stylesheet::{StyleRule, Stylesheet, Typography};

/// Rules every document must declare, independent of its blocks.
pub const PAGE_RULES: [&str; 4] = ["page", "page-content", "footer", "footer-text"];

/// Background treatment of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTreatment {
    Body,
    Title,
    Closing,
}

impl PageTreatment {
    /// Style rule layered over `page` for this treatment.
    pub fn rule(self) -> Option<&'static str> {
        match self {
            PageTreatment::Body => None,
            PageTreatment::Title => Some("page-title"),
            PageTreatment::Closing => Some("page-closing"),
        }
    }

    pub fn class(self) -> &'static str {
        match self {
            PageTreatment::Body => "body",
            PageTreatment::Title => "title",
            PageTreatment::Closing => "closing",
        }
    }
}

/// Callout flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Note,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatTile {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: String,
    pub body: String,
}

/// One structural content unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Display title used on title and closing pages.
    Title { text: String, subtitle: Option<String> },
    Heading(String),
    Paragraph(String),
    BulletList(Vec<String>),
    /// Ordered steps, numbered from 1 within the block.
    StepList(Vec<Step>),
    Callout { tone: Tone, title: String, body: String },
    StatRow(Vec<StatTile>),
    CardGrid { columns: u8, cards: Vec<Card> },
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
    /// Table of contents over every page with a section name.
    Contents,
    /// A data-URI image.
    Image { src: String, width_px: f32, alt: String },
}

/// Block discriminant, used for rule lookup and atomicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockKind {
    Title,
    Heading,
    Paragraph,
    BulletList,
    StepList,
    Callout,
    StatRow,
    CardGrid,
    Table,
    Contents,
    Image,
}

impl BlockKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Title => "title",
            BlockKind::Heading => "heading",
            BlockKind::Paragraph => "paragraph",
            BlockKind::BulletList => "bullet-list",
            BlockKind::StepList => "step-list",
            BlockKind::Callout => "callout",
            BlockKind::StatRow => "stat-row",
            BlockKind::CardGrid => "card-grid",
            BlockKind::Table => "table",
            BlockKind::Contents => "contents",
            BlockKind::Image => "image",
        }
    }

    /// Whether the whole block must stay on one page. Step lists, card grids
    /// and tables are not atomic as a whole; their items and rows are.
    pub fn is_atomic(self) -> bool {
        matches!(
            self,
            BlockKind::Title
                | BlockKind::Heading
                | BlockKind::Callout
                | BlockKind::StatRow
                | BlockKind::Image
        )
    }

    /// Style rules composition reads for this kind.
    pub fn rules(self) -> &'static [&'static str] {
        match self {
            BlockKind::Title => &["title", "subtitle"],
            BlockKind::Heading => &["heading"],
            BlockKind::Paragraph => &["paragraph"],
            BlockKind::BulletList => &["bullets", "bullet"],
            BlockKind::StepList => &["steps", "step", "step-badge", "step-title", "step-detail"],
            BlockKind::Callout => &["callout-note", "callout-warning", "callout-title", "callout-body"],
            BlockKind::StatRow => &["stats", "stat", "stat-value", "stat-label"],
            BlockKind::CardGrid => &["cards", "card", "card-title", "card-body"],
            BlockKind::Table => &["table", "table-head", "table-cell"],
            BlockKind::Contents => &["contents", "contents-entry"],
            BlockKind::Image => &["image"],
        }
    }
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Title { .. } => BlockKind::Title,
            Block::Heading(_) => BlockKind::Heading,
            Block::Paragraph(_) => BlockKind::Paragraph,
            Block::BulletList(_) => BlockKind::BulletList,
            Block::StepList(_) => BlockKind::StepList,
            Block::Callout { .. } => BlockKind::Callout,
            Block::StatRow(_) => BlockKind::StatRow,
            Block::CardGrid { .. } => BlockKind::CardGrid,
            Block::Table { .. } => BlockKind::Table,
            Block::Contents => BlockKind::Contents,
            Block::Image { .. } => BlockKind::Image,
        }
    }

    /// Every user-visible string in the block. Image sources are not text.
    fn texts_mut(&mut self) -> Vec<&mut String> {
        match self {
            Block::Title { text, subtitle } => {
                let mut v = vec![text];
                v.extend(subtitle.as_mut());
                v
            }
            Block::Heading(t) | Block::Paragraph(t) => vec![t],
            Block::BulletList(items) => items.iter_mut().collect(),
            Block::StepList(steps) => steps
                .iter_mut()
                .flat_map(|s| [&mut s.title, &mut s.detail])
                .collect(),
            Block::Callout { title, body, .. } => vec![title, body],
            Block::StatRow(tiles) => tiles
                .iter_mut()
                .flat_map(|t| [&mut t.value, &mut t.label])
                .collect(),
            Block::CardGrid { cards, .. } => cards
                .iter_mut()
                .flat_map(|c| [&mut c.title, &mut c.body])
                .collect(),
            Block::Table { header, rows } => header
                .iter_mut()
                .chain(rows.iter_mut().flatten())
                .collect(),
            Block::Contents => Vec::new(),
            Block::Image { alt, .. } => vec![alt],
        }
    }
}

/// One forced-pagination unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub treatment: PageTreatment,
    /// Section name listed in the table of contents.
    pub section: Option<String>,
    pub blocks: Vec<Block>,
    /// Whether the page carries the numbered footer.
    pub footer: bool,
}

impl Page {
    /// A body page with a numbered footer.
    pub fn body(section: &str) -> Self {
        Self {
            treatment: PageTreatment::Body,
            section: Some(section.to_string()),
            blocks: Vec::new(),
            footer: true,
        }
    }

    pub fn title() -> Self {
        Self {
            treatment: PageTreatment::Title,
            section: None,
            blocks: Vec::new(),
            footer: false,
        }
    }

    pub fn closing() -> Self {
        Self {
            treatment: PageTreatment::Closing,
            section: None,
            blocks: Vec::new(),
            footer: false,
        }
    }

    pub fn block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn without_footer(mut self) -> Self {
        self.footer = false;
        self
    }

    fn texts_mut(&mut self) -> Vec<&mut String> {
        let mut texts: Vec<&mut String> = self.section.as_mut().into_iter().collect();
        for block in &mut self.blocks {
            texts.extend(block.texts_mut());
        }
        texts
    }
}

/// A validated, immutable document.
#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    canvas: Canvas,
    stylesheet: Stylesheet,
    pages: Vec<Page>,
    /// Numbering state as of construction; never advanced in place.
    counters: Counters,
}

impl Document {
    pub fn builder(title: &str, canvas: Canvas, stylesheet: Stylesheet) -> DocumentBuilder {
        DocumentBuilder {
            title: title.to_string(),
            canvas,
            stylesheet,
            pages: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// A copy of the document's counters in their construction state.
    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// The final page never forces a break after itself.
    pub fn is_final(&self, index: usize) -> bool {
        index + 1 == self.pages.len()
    }

    /// Check the document against its stylesheet. Page numbers in errors
    /// are 1-based.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.pages.is_empty() {
            return Err(ContentError::NoPages(self.title.clone()));
        }
        self.stylesheet.validate()?;

        for (i, page) in self.pages.iter().enumerate() {
            let number = i + 1;
            if page.blocks.is_empty() {
                return Err(ContentError::EmptyPage { page: number });
            }

            let required = PAGE_RULES
                .iter()
                .copied()
                .chain(page.treatment.rule())
                .chain(page.blocks.iter().flat_map(|b| b.kind().rules().iter().copied()));
            for rule in required {
                if !self.stylesheet.has_rule(rule) {
                    return Err(ContentError::MissingStyleRule { page: number, kind: rule });
                }
            }

            // `texts_mut` needs a mutable page; scan a scratch copy.
            let mut scratch = page.clone();
            for text in scratch.texts_mut() {
                if let Some(placeholder) = find_placeholder(text) {
                    return Err(ContentError::UnresolvedPlaceholder {
                        page: number,
                        placeholder,
                    });
                }
            }
        }
        Ok(())
    }
}

/// The first `{{name}}` in `text`, if any.
fn find_placeholder(text: &str) -> Option<String> {
    let start = text.find("{{")?;
    let len = text[start..].find("}}").map(|end| end + 2).unwrap_or(text.len() - start);
    Some(text[start..start + len].to_string())
}

/// Assembles pages in order and substitutes bound values on `build`.
#[derive(Debug)]
pub struct DocumentBuilder {
    title: String,
    canvas: Canvas,
    stylesheet: Stylesheet,
    pages: Vec<Page>,
    bindings: Vec<(String, String)>,
}

impl DocumentBuilder {
    pub fn page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    /// Bind `{{name}}` to `value`. Substitution is verbatim.
    pub fn bind(mut self, name: &str, value: impl Into<String>) -> Self {
        self.bindings.push((format!("{{{{{name}}}}}"), value.into()));
        self
    }

    /// Substitute bindings, then validate.
    pub fn build(mut self) -> Result<Document, ContentError> {
        for page in &mut self.pages {
            for text in page.texts_mut() {
                for (placeholder, value) in &self.bindings {
                    if text.contains(placeholder.as_str()) {
                        *text = text.replace(placeholder.as_str(), value);
                    }
                }
            }
        }

        let counters = Counters::new(self.pages.len());
        let doc = Document {
            title: self.title,
            canvas: self.canvas,
            stylesheet: self.stylesheet,
            pages: self.pages,
            counters,
        };
        doc.validate()?;
        log::debug!("built document '{}' with {} page(s)", doc.title, doc.pages.len());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> Stylesheet {
        let mut sheet = Stylesheet::new(Typography::default()).token("ink", "#111111");
        for rule in PAGE_RULES
            .iter()
            .chain(BlockKind::Heading.rules())
            .chain(BlockKind::Paragraph.rules())
        {
            sheet = sheet.rule(*rule, StyleRule::new());
        }
        sheet
    }

    #[test]
    fn builds_and_substitutes() {
        let doc = Document::builder("t", Canvas::widescreen(), sheet())
            .page(Page::body("One").block(Block::Paragraph("Edition {{year}}".into())))
            .bind("year", "2031")
            .build()
            .unwrap();
        assert_eq!(doc.pages()[0].blocks[0], Block::Paragraph("Edition 2031".into()));
        assert!(doc.is_final(0));
    }

    #[test]
    fn counters_start_fresh_and_survive_composition() {
        let doc = Document::builder("t", Canvas::widescreen(), sheet())
            .page(Page::body("One").block(Block::Paragraph("a".into())))
            .page(Page::body("Two").block(Block::Paragraph("b".into())))
            .build()
            .unwrap();
        compose(&doc).unwrap();
        let counters = doc.counters();
        assert_eq!(counters.page.current(), 0);
        assert_eq!(counters.contents.current(), 0);
        assert_eq!(counters.total_pages(), 2);
    }

    #[test]
    fn unbound_placeholder_is_rejected() {
        let err = Document::builder("t", Canvas::widescreen(), sheet())
            .page(Page::body("One").block(Block::Paragraph("Hi".into())))
            .page(Page::body("Two").block(Block::Heading("For {{customer}}".into())))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ContentError::UnresolvedPlaceholder {
                page: 2,
                placeholder: "{{customer}}".into()
            }
        );
    }

    #[test]
    fn block_without_rule_is_rejected() {
        let err = Document::builder("t", Canvas::widescreen(), sheet())
            .page(Page::body("One").block(Block::BulletList(vec!["a".into()])))
            .build()
            .unwrap_err();
        assert_eq!(err, ContentError::MissingStyleRule { page: 1, kind: "bullets" });
    }

    #[test]
    fn treatment_rule_is_required() {
        let err = Document::builder("t", Canvas::widescreen(), sheet())
            .page(Page::title().block(Block::Heading("Hi".into())))
            .build()
            .unwrap_err();
        assert_eq!(err, ContentError::MissingStyleRule { page: 1, kind: "page-title" });
    }

    #[test]
    fn empty_documents_and_pages_are_rejected() {
        let err = Document::builder("empty", Canvas::a4(), sheet()).build().unwrap_err();
        assert_eq!(err, ContentError::NoPages("empty".into()));

        let err = Document::builder("t", Canvas::a4(), sheet())
            .page(Page::body("One"))
            .build()
            .unwrap_err();
        assert_eq!(err, ContentError::EmptyPage { page: 1 });
    }

    #[test]
    fn atomicity_by_kind() {
        assert!(BlockKind::Heading.is_atomic());
        assert!(BlockKind::Callout.is_atomic());
        assert!(!BlockKind::Paragraph.is_atomic());
        assert!(!BlockKind::StepList.is_atomic());
    }
}
