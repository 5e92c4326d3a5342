//! The two fixed documents: a widescreen deck and an A4 manual.
//!
//! Both share one palette and one rule set, scaled per canvas. The current
//! year is the only dynamic value; it is bound to `{{year}}`, which appears
//! once, on the title page.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use chrono::Datelike;

use crate::canvas::Canvas;
use crate::content::{
    Block, Card, Document, Page, StatTile, Step, StyleRule, Stylesheet, Tone, Typography,
};
use crate::error::ContentError;

/// The current local year.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Type sizes in px for one canvas.
struct Scale {
    body: f32,
    small: f32,
    heading: f32,
    title: f32,
    stat: f32,
    gap: f32,
}

const DECK_SCALE: Scale = Scale {
    body: 20.0,
    small: 16.0,
    heading: 36.0,
    title: 64.0,
    stat: 48.0,
    gap: 20.0,
};

const MANUAL_SCALE: Scale = Scale {
    body: 15.0,
    small: 13.0,
    heading: 24.0,
    title: 44.0,
    stat: 32.0,
    gap: 14.0,
};

fn px(v: f32) -> String {
    format!("{v}px")
}

fn text_rule(size: f32, line_height: f32, margin: &str) -> StyleRule {
    StyleRule::new()
        .set("margin", margin)
        .set("font-size", px(size))
        .set("line-height", line_height.to_string())
}

fn stylesheet(scale: &Scale) -> Stylesheet {
    let s = scale;
    let gap = px(s.gap);
    let bottom = format!("0 0 {} 0", px(s.gap));

    Stylesheet::new(Typography {
        base_size_px: s.body,
        ..Typography::default()
    })
    .token("ink", "#1f2933")
    .token("muted", "#52606d")
    .token("accent", "#2f6fed")
    .token("night", "#0b1f3a")
    .token("paper", "#ffffff")
    .token("mist", "#eef2f7")
    .token("line", "#c7d2de")
    .token("warn", "#b7791f")
    .token("warn-bg", "#fff8e6")
    .token("inverse", "#ffffff")
    // Pages
    .rule("page", StyleRule::new().color("background-color", "paper"))
    .rule(
        "page-title",
        StyleRule::new()
            .color("background-color", "night")
            .color("color", "inverse"),
    )
    .rule(
        "page-closing",
        StyleRule::new()
            .color("background-color", "accent")
            .color("color", "inverse"),
    )
    .rule(
        "page-content",
        StyleRule::new()
            .set("flex-grow", "1")
            .set("display", "flex")
            .set("flex-direction", "column"),
    )
    .rule(
        "footer",
        StyleRule::new()
            .set("display", "flex")
            .set("flex-direction", "row")
            .set("justify-content", "space-between")
            .set("padding-top", px(s.gap / 2.0)),
    )
    .rule("footer-text", text_rule(s.small, 1.4, "0").color("color", "muted"))
    // Titles
    .rule(
        "title",
        text_rule(s.title, 1.1, &format!("0 0 {} 0", px(s.gap)))
            .set("font-weight", "bold")
            .color("color", "inverse"),
    )
    .rule("subtitle", text_rule(s.body * 1.2, 1.4, "0").color("color", "inverse"))
    .rule(
        "heading",
        text_rule(s.heading, 1.2, &bottom)
            .set("font-weight", "bold")
            .color("color", "night"),
    )
    .rule("paragraph", text_rule(s.body, 1.5, &format!("0 0 {} 0", px(s.gap * 0.8))))
    // Lists
    .rule(
        "bullets",
        StyleRule::new()
            .set("margin", bottom.clone())
            .set("padding", format!("0 0 0 {}", px(s.body * 1.4))),
    )
    .rule("bullet", text_rule(s.body, 1.5, &format!("0 0 {} 0", px(s.gap * 0.4))))
    .rule("steps", StyleRule::new().set("margin", bottom.clone()))
    .rule(
        "step",
        StyleRule::new()
            .set("display", "flex")
            .set("flex-direction", "row")
            .set("gap", px(s.gap * 0.8))
            .set("margin", format!("0 0 {} 0", px(s.gap * 0.7))),
    )
    .rule(
        "step-badge",
        StyleRule::new()
            .set("width", px(s.body * 1.8))
            .set("height", px(s.body * 1.8))
            .set("flex-shrink", "0")
            .set("font-size", px(s.body * 0.9))
            .set("line-height", px(s.body * 1.8))
            .set("font-weight", "bold")
            .set("text-align", "center")
            .color("background-color", "accent")
            .color("color", "inverse"),
    )
    .rule("step-title", text_rule(s.body, 1.4, "0").set("font-weight", "bold"))
    .rule("step-detail", text_rule(s.body * 0.9, 1.4, "0").color("color", "muted"))
    // Callouts
    .rule(
        "callout-note",
        StyleRule::new()
            .set("margin", bottom.clone())
            .set("padding", format!("{} {}", px(s.gap * 0.8), px(s.gap)))
            .color("background-color", "mist")
            .color_in("border", "2px solid {}", "accent"),
    )
    .rule(
        "callout-warning",
        StyleRule::new()
            .set("margin", bottom.clone())
            .set("padding", format!("{} {}", px(s.gap * 0.8), px(s.gap)))
            .color("background-color", "warn-bg")
            .color_in("border", "2px solid {}", "warn"),
    )
    .rule(
        "callout-title",
        text_rule(s.body, 1.4, &format!("0 0 {} 0", px(s.gap * 0.3))).set("font-weight", "bold"),
    )
    .rule("callout-body", text_rule(s.body * 0.9, 1.5, "0"))
    // Stats and cards
    .rule(
        "stats",
        StyleRule::new()
            .set("display", "flex")
            .set("flex-direction", "row")
            .set("gap", gap.clone())
            .set("margin", bottom.clone()),
    )
    .rule(
        "stat",
        StyleRule::new()
            .set("flex-grow", "1")
            .set("padding", gap.clone())
            .color("background-color", "mist"),
    )
    .rule(
        "stat-value",
        text_rule(s.stat, 1.1, "0")
            .set("font-weight", "bold")
            .color("color", "accent"),
    )
    .rule(
        "stat-label",
        text_rule(s.small, 1.4, &format!("{} 0 0 0", px(s.gap * 0.2))).color("color", "muted"),
    )
    .rule(
        "cards",
        StyleRule::new()
            .set("display", "grid")
            .set("gap", gap.clone())
            .set("margin", bottom.clone()),
    )
    .rule(
        "card",
        StyleRule::new()
            .set("padding", gap.clone())
            .color("background-color", "mist"),
    )
    .rule(
        "card-title",
        text_rule(s.body, 1.3, &format!("0 0 {} 0", px(s.gap * 0.4)))
            .set("font-weight", "bold")
            .color("color", "night"),
    )
    .rule("card-body", text_rule(s.small, 1.5, "0"))
    // Tables and contents
    .rule(
        "table",
        StyleRule::new()
            .set("width", "100%")
            .set("border-collapse", "collapse")
            .set("margin", bottom.clone()),
    )
    .rule(
        "table-head",
        StyleRule::new()
            .set("padding", format!("{} {}", px(s.gap * 0.4), px(s.gap * 0.6)))
            .set("font-size", px(s.small))
            .set("font-weight", "bold")
            .set("text-align", "left")
            .color("background-color", "mist")
            .color_in("border", "1px solid {}", "line"),
    )
    .rule(
        "table-cell",
        StyleRule::new()
            .set("padding", format!("{} {}", px(s.gap * 0.4), px(s.gap * 0.6)))
            .set("font-size", px(s.small))
            .set("text-align", "left")
            .color_in("border", "1px solid {}", "line"),
    )
    .rule("contents", StyleRule::new().set("margin", bottom))
    .rule(
        "contents-entry",
        StyleRule::new()
            .set("display", "flex")
            .set("flex-direction", "row")
            .set("justify-content", "space-between")
            .set("padding", format!("{} 0", px(s.gap * 0.4)))
            .set("font-size", px(s.body * 1.1))
            .set("line-height", "1.4"),
    )
    .rule("image", StyleRule::new().set("margin", format!("0 0 {} 0", px(s.gap * 1.2))))
}

/// A small generated brand mark as a PNG data URI. `None` if encoding fails.
fn brand_mark() -> Option<String> {
    const SIZE: u32 = 96;
    let mark = image::RgbImage::from_fn(SIZE, SIZE, |x, y| {
        let c = SIZE as f32 / 2.0;
        let d = ((x as f32 - c).powi(2) + (y as f32 - c).powi(2)).sqrt();
        if (26.0..38.0).contains(&d) {
            image::Rgb([255, 255, 255])
        } else {
            image::Rgb([47, 111, 237])
        }
    });
    let mut png = Vec::new();
    if let Err(e) = mark.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png) {
        log::warn!("brand mark not encoded: {e}");
        return None;
    }
    Some(format!("data:image/png;base64,{}", BASE64_STD.encode(&png)))
}

fn step(title: &str, detail: &str) -> Step {
    Step {
        title: title.to_string(),
        detail: detail.to_string(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn card(title: &str, body: &str) -> Card {
    Card {
        title: title.to_string(),
        body: body.to_string(),
    }
}

fn stat(value: &str, label: &str) -> StatTile {
    StatTile {
        value: value.to_string(),
        label: label.to_string(),
    }
}

/// The nine-page widescreen deck.
pub fn deck(year: i32) -> Result<Document, ContentError> {
    let mut title = Page::title();
    if let Some(src) = brand_mark() {
        title = title.block(Block::Image {
            src,
            width_px: 96.0,
            alt: "Folio mark".to_string(),
        });
    }
    let title = title.block(Block::Title {
        text: "Folio Platform Review".to_string(),
        subtitle: Some("Quarterly briefing, {{year}}".to_string()),
    });

    Document::builder("Folio Platform Review", Canvas::widescreen(), stylesheet(&DECK_SCALE))
        .page(title)
        .page(
            Page::body("Agenda")
                .block(Block::Heading("Agenda".into()))
                .block(Block::Contents),
        )
        .page(
            Page::body("The problem")
                .block(Block::Heading("The problem".into()))
                .block(Block::Paragraph(
                    "Every team assembles printed material by hand. Layouts drift between \
                     releases, page breaks land in the middle of tables and nobody can say \
                     which copy is current."
                        .into(),
                ))
                .block(Block::BulletList(strings(&[
                    "Reports are rebuilt from scratch for every review cycle",
                    "Headings are stranded at the bottom of pages",
                    "Brand colours disappear when documents are printed",
                ]))),
        )
        .page(
            Page::body("Our approach")
                .block(Block::Heading("Our approach".into()))
                .block(Block::Paragraph(
                    "Documents are described once as typed pages and blocks, then rendered \
                     through a layout engine with explicit break rules."
                        .into(),
                ))
                .block(Block::StepList(vec![
                    step("Describe", "Pages, blocks and a stylesheet of named rules."),
                    step("Validate", "Missing rules and unbound placeholders fail early."),
                    step("Compose", "Markup with inline declarations and break classes."),
                    step("Print", "One engine session per run, verified page by page."),
                ])),
        )
        .page(
            Page::body("Results")
                .block(Block::Heading("Results".into()))
                .block(Block::StatRow(vec![
                    stat("9 / 9", "pages match the declared layout"),
                    stat("0", "stranded headings"),
                    stat("1", "engine session per run"),
                ]))
                .block(Block::Paragraph(
                    "Output geometry is checked after every render, so a drifting page size \
                     is reported instead of shipped."
                        .into(),
                )),
        )
        .page(
            Page::body("Capabilities")
                .block(Block::Heading("Capabilities".into()))
                .block(Block::CardGrid {
                    columns: 3,
                    cards: vec![
                        card("Fixed canvas", "Slide-sized pages with pixel-exact geometry."),
                        card("Paper canvas", "A4 and Letter with padding instead of margins."),
                        card("Step lists", "Numbering restarts for every list."),
                        card("Callouts", "Highlighted boxes that never split."),
                        card("Contents", "Section index with page numbers."),
                        card("Two engines", "A headless browser or the builtin typesetter."),
                    ],
                }),
        )
        .page(
            Page::body("Rollout plan")
                .block(Block::Heading("Rollout plan".into()))
                .block(Block::StepList(vec![
                    step("Pilot", "Move the weekly status deck to the new pipeline."),
                    step("Expand", "Convert the operator manual and its appendices."),
                    step("Retire", "Remove the hand-maintained layout files."),
                ]))
                .block(Block::Callout {
                    tone: Tone::Note,
                    title: "Decision needed".into(),
                    body: "Approve the pilot so the first converted deck ships with the next review."
                        .into(),
                }),
        )
        .page(
            Page::body("Comparison")
                .block(Block::Heading("Comparison".into()))
                .block(Block::Table {
                    header: strings(&["Concern", "Manual layout", "Folio"]),
                    rows: vec![
                        strings(&["Page breaks", "Adjusted by hand", "Declared per block"]),
                        strings(&["Numbering", "Typed in", "Counted at composition"]),
                        strings(&["Backgrounds", "Often lost in print", "Always preserved"]),
                        strings(&["Verification", "Visual check", "Page count and size checked"]),
                    ],
                }),
        )
        .page(Page::closing().block(Block::Title {
            text: "Thank you".into(),
            subtitle: Some("Questions and next steps".into()),
        }))
        .bind("year", year.to_string())
        .build()
}

/// The eight-page A4 manual.
pub fn manual(year: i32) -> Result<Document, ContentError> {
    Document::builder("Folio Operator Manual", Canvas::a4(), stylesheet(&MANUAL_SCALE))
        .page(Page::title().block(Block::Title {
            text: "Folio Operator Manual".into(),
            subtitle: Some("Edition {{year}}".into()),
        }))
        .page(
            Page::body("Contents")
                .block(Block::Heading("Contents".into()))
                .block(Block::Contents),
        )
        .page(
            Page::body("Getting started")
                .block(Block::Heading("Getting started".into()))
                .block(Block::Paragraph(
                    "Folio turns a fixed set of document templates into print-ready PDF files. \
                     Each run builds one document, renders it through a layout engine and \
                     writes a single file."
                        .into(),
                ))
                .block(Block::StepList(vec![
                    step("Install a browser", "Chrome or Chromium must be on the PATH, or set CHROME_PATH."),
                    step("Pick an engine", "Set FOLIO_ENGINE to chrome or builtin."),
                    step("Run a binary", "folio-deck or folio-manual, without arguments."),
                    step("Collect the output", "Files are written below the out directory."),
                ]))
                .block(Block::Callout {
                    tone: Tone::Note,
                    title: "Logging".into(),
                    body: "Set RUST_LOG=debug to trace every stage of a run.".into(),
                }),
        )
        .page(
            Page::body("Configuration")
                .block(Block::Heading("Configuration".into()))
                .block(Block::Paragraph(
                    "Only collaborator settings are read from the environment. Document \
                     content and geometry are fixed."
                        .into(),
                ))
                .block(Block::Table {
                    header: strings(&["Variable", "Default", "Effect"]),
                    rows: vec![
                        strings(&["FOLIO_ENGINE", "chrome", "Selects the layout engine"]),
                        strings(&["CHROME_PATH", "searched", "Browser binary to launch"]),
                        strings(&["RUST_LOG", "unset", "Log filter for all stages"]),
                    ],
                })
                .block(Block::Callout {
                    tone: Tone::Warning,
                    title: "Sandboxed hosts".into(),
                    body: "Containers without user namespaces need the browser sandbox disabled \
                           by the host configuration."
                        .into(),
                }),
        )
        .page(
            Page::body("Daily workflows")
                .block(Block::Heading("Daily workflows".into()))
                .block(Block::Paragraph(
                    "Two routines cover almost every day of operation.".into(),
                ))
                .block(Block::Heading("Refreshing the deck".into()))
                .block(Block::StepList(vec![
                    step("Update content", "Edit the deck template and review the wording."),
                    step("Render", "Run folio-deck and wait for the written path."),
                    step("Check", "Open the file and page through it once."),
                ]))
                .block(Block::Heading("Publishing the manual".into()))
                .block(Block::StepList(vec![
                    step("Render", "Run folio-manual with the builtin engine for a quick proof."),
                    step("Proof", "Render again with the browser engine for final output."),
                    step("Share", "Copy the file to the shared documentation folder."),
                ])),
        )
        .page(
            Page::body("Troubleshooting")
                .block(Block::Heading("Troubleshooting".into()))
                .block(Block::BulletList(strings(&[
                    "Engine unavailable: install a browser or point CHROME_PATH at one.",
                    "Stabilisation timeout: remove remote resources from the template.",
                    "Page overflow: a page holds more than fits; shorten its content.",
                    "Write failure: check permissions on the out directory.",
                ])))
                .block(Block::Callout {
                    tone: Tone::Warning,
                    title: "Partial files".into(),
                    body: "A failed run never leaves a partial file behind. An older copy at \
                           the destination stays untouched."
                        .into(),
                })
                .block(Block::Paragraph(
                    "Every error names the stage that failed and, for writes, the path.".into(),
                )),
        )
        .page(
            Page::body("Reference")
                .block(Block::Heading("Reference".into()))
                .block(Block::CardGrid {
                    columns: 2,
                    cards: vec![
                        card("Deck", "Nine widescreen pages at 1280 by 720 pixels."),
                        card("Manual", "Eight A4 pages with in-page padding."),
                        card("Footers", "Body pages show the page number and total."),
                        card("Step lists", "Every list counts from one."),
                    ],
                })
                .block(Block::Paragraph(
                    "Title and closing pages carry their own background and no footer.".into(),
                )),
        )
        .page(Page::closing().block(Block::Title {
            text: "Need help?".into(),
            subtitle: Some("Contact the platform team".into()),
        }))
        .bind("year", year.to_string())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PageTreatment;

    #[test]
    fn deck_has_nine_pages_framed_by_title_and_closing() {
        let doc = deck(2031).unwrap();
        assert_eq!(doc.page_count(), 9);
        assert_eq!(doc.pages()[0].treatment, PageTreatment::Title);
        assert_eq!(doc.pages()[8].treatment, PageTreatment::Closing);
        assert_eq!(doc.canvas(), Canvas::widescreen());
    }

    #[test]
    fn manual_has_eight_a4_pages() {
        let doc = manual(2031).unwrap();
        assert_eq!(doc.page_count(), 8);
        assert_eq!(doc.canvas(), Canvas::a4());
    }

    #[test]
    fn year_is_substituted_on_the_title_page() {
        let doc = manual(2031).unwrap();
        assert_eq!(
            doc.pages()[0].blocks[0],
            Block::Title {
                text: "Folio Operator Manual".into(),
                subtitle: Some("Edition 2031".into()),
            }
        );
    }

    #[test]
    fn brand_mark_is_a_png_data_uri() {
        let src = brand_mark().unwrap();
        assert!(src.starts_with("data:image/png;base64,"));
    }
}
