//! Composition: [`Document`] → self-contained HTML.
//!
//! Every element carries its resolved declarations inline, because the
//! builtin engine reads nothing else. The `<style>` head only holds what a
//! browser engine needs on top: the `@page` rule, colour-exact printing and
//! the break rules behind the structural classes.
//!
//! Structural classes understood by both engines:
//!
//! | class            | meaning                                  |
//! |------------------|------------------------------------------|
//! | `page`           | forced break after, never split          |
//! | `last`           | cancels the forced break of the final page |
//! | `keep`           | never split across pages                 |
//! | `keep-with-next` | never the last box on a page             |

use crate::content::counters::Counters;
use crate::content::{Block, Document, Page, PageTreatment, Tone};
use crate::error::ContentError;

/// Compose a validated document into markup. Output is deterministic: the
/// same document always yields byte-identical markup.
pub fn compose(doc: &Document) -> Result<String, ContentError> {
    let mut composer = Composer {
        doc,
        counters: doc.counters(),
        out: String::with_capacity(16 * 1024),
        page: 0,
    };
    composer.document()?;
    log::debug!(
        "composed '{}': {} page(s), {} bytes of markup",
        doc.title(),
        doc.page_count(),
        composer.out.len()
    );
    Ok(composer.out)
}

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

struct Composer<'a> {
    doc: &'a Document,
    counters: Counters,
    out: String,
    /// 1-based number of the page being composed.
    page: usize,
}

impl<'a> Composer<'a> {
    fn document(&mut self) -> Result<(), ContentError> {
        let doc = self.doc;
        let canvas = doc.canvas();
        self.out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        self.out
            .push_str(&format!("<title>{}</title>\n", escape(doc.title())));
        self.out.push_str("<style>\n");
        self.out.push_str(&canvas.css_page_rule());
        self.out.push_str(HEAD_CSS);
        self.out.push_str("</style>\n</head>\n<body>\n");

        for (index, page) in doc.pages().iter().enumerate() {
            self.page = index + 1;
            self.counters.page.next();
            self.page_section(page, doc.is_final(index))?;
        }

        self.out.push_str("</body>\n</html>\n");
        Ok(())
    }

    /// Resolved declarations of `rule`, followed by `extra`.
    fn style(&self, rule: &'static str, extra: &[&str]) -> Result<String, ContentError> {
        let mut decls = self
            .doc
            .stylesheet()
            .declarations(rule)
            .unwrap_or_else(|| {
                Err(ContentError::MissingStyleRule {
                    page: self.page,
                    kind: rule,
                })
            })?;
        for e in extra {
            if !decls.is_empty() {
                decls.push_str("; ");
            }
            decls.push_str(e);
        }
        Ok(decls)
    }

    /// Write an opening tag with class `r-<rule>` plus `classes`.
    fn open(&mut self, tag: &str, rule: &'static str, classes: &str, extra: &[&str]) -> Result<(), ContentError> {
        let style = self.style(rule, extra)?;
        let class = if classes.is_empty() {
            format!("r-{rule}")
        } else {
            format!("r-{rule} {classes}")
        };
        self.out
            .push_str(&format!("<{tag} class=\"{class}\" style=\"{}\">", escape(&style)));
        Ok(())
    }

    fn close(&mut self, tag: &str) {
        self.out.push_str(&format!("</{tag}>\n"));
    }

    fn text(&mut self, tag: &str, rule: &'static str, classes: &str, extra: &[&str], text: &str) -> Result<(), ContentError> {
        self.open(tag, rule, classes, extra)?;
        self.out.push_str(&escape(text));
        self.close(tag);
        Ok(())
    }

    fn page_section(&mut self, page: &Page, last: bool) -> Result<(), ContentError> {
        let canvas = self.doc.canvas();
        let (width, height) = match canvas {
            crate::canvas::Canvas::Fixed {
                width_px,
                height_px,
            } => (format!("{width_px}px"), format!("{height_px}px")),
            crate::canvas::Canvas::Paper { size, .. } => {
                let (w, h) = size.size_mm();
                (format!("{w}mm"), format!("{h}mm"))
            }
        };

        let mut style = self.doc.stylesheet().base_declarations()?;
        style.push_str("; ");
        style.push_str(&self.style("page", &[])?);
        if let Some(rule) = page.treatment.rule() {
            style.push_str("; ");
            style.push_str(&self.style(rule, &[])?);
        }
        style.push_str(&format!(
            "; width: {width}; height: {height}; padding: {}px; display: flex; flex-direction: column",
            canvas.page_padding_px()
        ));

        let mut class = format!("page {}", page.treatment.class());
        if last {
            class.push_str(" last");
        }
        self.out.push_str(&format!(
            "<section class=\"{class}\" data-page=\"{}\" style=\"{}\">\n",
            self.page,
            escape(&style)
        ));

        let centered: &[&str] = match page.treatment {
            PageTreatment::Body => &[],
            PageTreatment::Title | PageTreatment::Closing => &["justify-content: center"],
        };
        self.open("div", "page-content", "", centered)?;
        self.out.push('\n');
        for block in &page.blocks {
            self.block(block)?;
        }
        self.close("div");

        if page.footer {
            let doc = self.doc;
            let label = self.counters.page_label();
            self.open("footer", "footer", "", &[])?;
            self.text("p", "footer-text", "", &[], doc.title())?;
            self.text("p", "footer-text", "", &[], &label)?;
            self.close("footer");
        }

        self.close("section");
        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<(), ContentError> {
        match block {
            Block::Title { text, subtitle } => {
                self.text("h1", "title", "keep keep-with-next", &[], text)?;
                if let Some(sub) = subtitle {
                    self.text("p", "subtitle", "", &[], sub)?;
                }
            }
            Block::Heading(text) => self.text("h2", "heading", "keep keep-with-next", &[], text)?,
            Block::Paragraph(text) => self.text("p", "paragraph", "", &[], text)?,
            Block::BulletList(items) => {
                self.open("ul", "bullets", "", &[])?;
                for item in items {
                    self.text("li", "bullet", "keep", &[], item)?;
                }
                self.close("ul");
            }
            Block::StepList(steps) => {
                // Each list owns its counter, so numbering restarts at 1.
                let mut counter = self.counters.step_counter();
                self.open("div", "steps", "", &[])?;
                for step in steps {
                    let n = counter.next();
                    let style = self.style("step", &[])?;
                    self.out.push_str(&format!(
                        "<div class=\"r-step keep\" data-step=\"{n}\" style=\"{}\">",
                        escape(&style)
                    ));
                    self.text("div", "step-badge", "", &[], &n.to_string())?;
                    self.out.push_str("<div class=\"step-body\" style=\"flex-grow: 1; flex-shrink: 1\">");
                    self.text("p", "step-title", "", &[], &step.title)?;
                    self.text("p", "step-detail", "", &[], &step.detail)?;
                    self.close("div");
                    self.close("div");
                }
                self.close("div");
            }
            Block::Callout { tone, title, body } => {
                let rule = match tone {
                    Tone::Note => "callout-note",
                    Tone::Warning => "callout-warning",
                };
                self.open("div", rule, "keep", &[])?;
                self.text("p", "callout-title", "", &[], title)?;
                self.text("p", "callout-body", "", &[], body)?;
                self.close("div");
            }
            Block::StatRow(tiles) => {
                self.open("div", "stats", "keep", &[])?;
                for tile in tiles {
                    self.open("div", "stat", "", &[])?;
                    self.text("p", "stat-value", "", &[], &tile.value)?;
                    self.text("p", "stat-label", "", &[], &tile.label)?;
                    self.close("div");
                }
                self.close("div");
            }
            Block::CardGrid { columns, cards } => {
                let tracks = format!("grid-template-columns: repeat({}, 1fr)", (*columns).max(1));
                self.open("div", "cards", "", &[&tracks])?;
                for card in cards {
                    self.open("div", "card", "keep", &[])?;
                    self.text("p", "card-title", "", &[], &card.title)?;
                    self.text("p", "card-body", "", &[], &card.body)?;
                    self.close("div");
                }
                self.close("div");
            }
            Block::Table { header, rows } => {
                self.open("table", "table", "", &[])?;
                self.out.push_str("<tr class=\"keep\">");
                for cell in header {
                    self.text("th", "table-head", "", &[], cell)?;
                }
                self.close("tr");
                for row in rows {
                    self.out.push_str("<tr class=\"keep\">");
                    for cell in row {
                        self.text("td", "table-cell", "", &[], cell)?;
                    }
                    self.close("tr");
                }
                self.close("table");
            }
            Block::Contents => self.contents()?,
            Block::Image { src, width_px, alt } => {
                let style = self.style("image", &[&format!("width: {width_px}px")])?;
                self.out.push_str(&format!(
                    "<img class=\"r-image keep\" src=\"{}\" alt=\"{}\" style=\"{}\">\n",
                    escape(src),
                    escape(alt),
                    escape(&style)
                ));
            }
        }
        Ok(())
    }

    /// One numbered entry per page that names a section, with its page number.
    fn contents(&mut self) -> Result<(), ContentError> {
        let entries: Vec<(usize, String)> = self
            .doc
            .pages()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.section.clone().map(|s| (i + 1, s)))
            .collect();

        self.open("div", "contents", "", &[])?;
        for (page_number, section) in entries {
            let n = self.counters.contents.next();
            self.open("div", "contents-entry", "keep", &[])?;
            self.out.push_str(&format!(
                "<p style=\"margin: 0\">{}. {}</p><p style=\"margin: 0\">{page_number}</p>",
                n,
                escape(&section)
            ));
            self.close("div");
        }
        self.close("div");
        Ok(())
    }
}

/// Browser-only rules. The builtin engine reads the same intent from the
/// structural classes.
const HEAD_CSS: &str = r#"
html, body { margin: 0; padding: 0; }
* { box-sizing: border-box; -webkit-print-color-adjust: exact; print-color-adjust: exact; }
.page { overflow: hidden; break-after: page; break-inside: avoid; }
.page.last { break-after: auto; }
.keep { break-inside: avoid; }
.keep-with-next { break-after: avoid; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::content::{BlockKind, Step, StyleRule, Stylesheet, Typography, PAGE_RULES};

    fn sheet() -> Stylesheet {
        let mut sheet = Stylesheet::new(Typography::default())
            .token("ink", "#111111")
            .token("night", "#0b1f3a");
        let kinds = [
            BlockKind::Title,
            BlockKind::Heading,
            BlockKind::Paragraph,
            BlockKind::StepList,
            BlockKind::Contents,
        ];
        for rule in PAGE_RULES
            .iter()
            .chain(kinds.iter().flat_map(|k| k.rules()))
        {
            sheet = sheet.rule(*rule, StyleRule::new().set("margin", "0"));
        }
        sheet.rule("page-title", StyleRule::new().color("background-color", "night"))
    }

    fn steps(titles: &[&str]) -> Block {
        Block::StepList(
            titles
                .iter()
                .map(|t| Step {
                    title: t.to_string(),
                    detail: "detail".to_string(),
                })
                .collect(),
        )
    }

    fn doc() -> Document {
        Document::builder("Guide & Co", Canvas::widescreen(), sheet())
            .page(Page::title().block(Block::Title {
                text: "Guide".into(),
                subtitle: None,
            }))
            .page(Page::body("Setup").block(steps(&["a", "b", "c"])))
            .page(Page::body("Usage").block(steps(&["d", "e"])).block(Block::Contents))
            .build()
            .unwrap()
    }

    #[test]
    fn only_the_final_page_is_marked_last() {
        let html = compose(&doc()).unwrap();
        assert_eq!(html.matches("class=\"page ").count(), 3);
        assert_eq!(html.matches(" last\"").count(), 1);
        let last = html.rfind("<section").unwrap();
        assert!(html[last..].starts_with("<section class=\"page body last\""));
    }

    #[test]
    fn step_numbers_restart_per_list() {
        let html = compose(&doc()).unwrap();
        let numbers: Vec<&str> = html
            .split("data-step=\"")
            .skip(1)
            .map(|s| &s[..s.find('"').unwrap()])
            .collect();
        assert_eq!(numbers, ["1", "2", "3", "1", "2"]);
    }

    #[test]
    fn footers_count_pages() {
        let html = compose(&doc()).unwrap();
        assert!(html.contains(">2 / 3</p>"));
        assert!(html.contains(">3 / 3</p>"));
        assert!(!html.contains(">1 / 3</p>"), "title page has no footer");
    }

    #[test]
    fn contents_lists_sections_with_page_numbers() {
        let html = compose(&doc()).unwrap();
        assert!(html.contains(">1. Setup</p>"));
        assert!(html.contains(">2. Usage</p>"));
    }

    #[test]
    fn text_is_escaped_and_geometry_inlined() {
        let html = compose(&doc()).unwrap();
        assert!(html.contains("<title>Guide &amp; Co</title>"));
        assert!(html.contains("@page { size: 1280px 720px; margin: 0; }"));
        assert!(html.contains("width: 1280px; height: 720px"));
        assert!(html.contains("background-color: #0b1f3a"));
    }

    #[test]
    fn composition_is_deterministic() {
        let d = doc();
        assert_eq!(compose(&d).unwrap(), compose(&d).unwrap());
    }
}
