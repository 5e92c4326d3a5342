//! Pagination – splits a list of positioned boxes into fixed-size pages.
//!
//! Handles:
//! - Page boundaries for any canvas (engine margin is always zero)
//! - `break-before` / `break-after` forced breaks, with no trailing blank page
//! - `break-inside: avoid`: an overflowing atomic box moves whole
//! - `break-after: avoid`: a heading run never ends a page when the box it
//!   introduces moves on
//! - Table row splitting across pages

use crate::fonts::FontManager;
use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::*;
use crate::style;

/// Recursively expand any pure-container box whose height exceeds a single
/// page so its children can be split across pages individually. Atomic
/// containers are never expanded.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
            && !pbox.page_break_inside_avoid
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

struct Paginator<'a> {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start_doc_y: f32,
    content_height: f32,
    fonts: &'a FontManager,
}

impl<'a> Paginator<'a> {
    fn break_page(&mut self, next_start_y: f32) {
        let next = PageLayout {
            page_index: self.config.pages.len() + 1,
            boxes: Vec::new(),
        };
        self.config
            .pages
            .push(std::mem::replace(&mut self.current, next));
        self.page_start_doc_y = next_start_y;
    }

    fn y_on_page(&self, pbox: &PositionedBox) -> f32 {
        (pbox.y - self.page_start_doc_y).max(0.0)
    }

    fn overflows(&self, pbox: &PositionedBox) -> bool {
        self.y_on_page(pbox) + pbox.height > self.content_height
    }

    fn place(&mut self, pbox: &PositionedBox) {
        let y = self.y_on_page(pbox);
        let lb = build_layout_box(pbox, pbox.x, y, self.fonts);
        self.current.boxes.push(lb);
    }
}

/// Convert positioned boxes into a paginated [`LayoutConfig`] (CSS px).
pub fn paginate(
    boxes: &[PositionedBox],
    page_width: f32,
    page_height: f32,
    fonts: &FontManager,
) -> LayoutConfig {
    let content_height = page_height;
    let flat = flatten_for_pagination(boxes, content_height);

    let mut p = Paginator {
        config: LayoutConfig::new(page_width, page_height),
        current: PageLayout {
            page_index: 0,
            boxes: Vec::new(),
        },
        page_start_doc_y: 0.0,
        content_height,
        fonts,
    };

    for (i, pbox) in flat.iter().enumerate() {
        if pbox.page_break_before && !p.current.boxes.is_empty() {
            p.break_page(pbox.y);
        }

        if p.overflows(pbox) && !p.current.boxes.is_empty() {
            if is_table_like(pbox) && !pbox.page_break_inside_avoid {
                split_table_box(pbox, &mut p);
                continue;
            }
            p.break_page(pbox.y);
        } else if pbox.keep_with_next && !p.current.boxes.is_empty() {
            // Find the end of the keep-with-next run and the box it introduces.
            let run_end = flat[i..]
                .iter()
                .position(|b| !b.keep_with_next)
                .map(|off| i + off);
            if let Some(next) = run_end.and_then(|j| flat.get(j)) {
                let forced = flat[i..run_end.unwrap_or(i)]
                    .iter()
                    .any(|b| b.page_break_after)
                    || next.page_break_before;
                if !forced && p.overflows(next) {
                    log::debug!("moving heading at y={} to keep it with its content", pbox.y);
                    p.break_page(pbox.y);
                }
            }
        }

        p.place(pbox);

        if pbox.page_break_after {
            p.break_page(pbox.y + pbox.height);
        }
    }

    let Paginator {
        mut config,
        current,
        ..
    } = p;
    // A forced break after the final box leaves an empty page behind; it is
    // dropped rather than emitted as a trailing blank page.
    if !current.boxes.is_empty() || config.pages.is_empty() {
        config.pages.push(current);
    }
    for (i, page) in config.pages.iter_mut().enumerate() {
        page.page_index = i;
    }
    config
}

fn is_table_like(pbox: &PositionedBox) -> bool {
    pbox.style.display == style::Display::Grid && !pbox.children.is_empty()
}

fn split_table_box(pbox: &PositionedBox, p: &mut Paginator<'_>) {
    for child in &pbox.children {
        if p.overflows(child) && !p.current.boxes.is_empty() {
            p.break_page(child.y);
        }
        p.place(child);
    }
}

/// Recursively build a LayoutBox tree where every box carries *page-absolute*
/// x/y coordinates (origin = top-left of the physical page).
///
/// For each child, its absolute y is derived by:
///   `child_abs_y = parent_abs_y + (child.y − parent.y)`
/// because PositionedBox.y values are document-space absolutes.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32, fonts: &FontManager) -> LayoutBox {
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);
    lb.avoid_break_inside = pbox.page_break_inside_avoid;
    lb.keep_with_next = pbox.keep_with_next;

    if !pbox.style.background_color.is_transparent() {
        let c = &pbox.style.background_color;
        lb.background_color = Some([c.r, c.g, c.b, c.a]);
    }

    if pbox.style.border_width > 0.5 {
        let c = &pbox.style.border_color;
        lb.border = Some(BorderStyle {
            width: pbox.style.border_width,
            color: [c.r, c.g, c.b, c.a],
        });
    }

    let s = &pbox.style;
    let bold = s.font_weight == style::FontWeight::Bold;
    let italic = s.font_style == style::FontStyle::Italic;
    let line_height = fonts.line_height_px(s.font_size, s.line_height);
    let color = [s.color.r, s.color.g, s.color.b, s.color.a];

    match &pbox.content {
        BoxContent::Text { lines, .. } => {
            let text_lines: Vec<TextLine> = lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let w = fonts.measure_text_width(line, s.font_size, bold, italic, &s.font_family);
                    let x_offset = match s.text_align {
                        style::TextAlign::Left => 0.0,
                        style::TextAlign::Center => ((pbox.width - w) / 2.0).max(0.0),
                        style::TextAlign::Right => (pbox.width - w).max(0.0),
                    };
                    TextLine {
                        text: line.clone(),
                        x_offset,
                        y_offset: i as f32 * line_height,
                    }
                })
                .collect();

            lb.text = Some(TextContent {
                lines: text_lines,
                font_family: s.font_family.clone(),
                font_size: s.font_size,
                bold,
                italic,
                color,
                line_height,
                underline: s.text_decoration == style::TextDecoration::Underline,
                list_marker: None,
            });
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::ListItem { marker } => {
            // `lines` is empty – the marker is drawn in the left gutter while
            // the li's own text comes from its child boxes.
            lb.text = Some(TextContent {
                lines: vec![],
                font_family: s.font_family.clone(),
                font_size: s.font_size,
                bold,
                italic: false,
                color,
                line_height,
                underline: false,
                list_marker: Some(marker.clone()),
            });
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        lb.children
            .push(build_layout_box(child, child.x, child_abs_y, fonts));
    }

    lb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::layout::compute_layout;
    use crate::style::build_styled_tree;

    fn paginate_html(html: &str, w: f32, h: f32) -> LayoutConfig {
        let dom = parse_html(html).unwrap();
        let styled = build_styled_tree(&dom, None);
        let fonts = FontManager::default();
        let boxes = compute_layout(&styled, w, &fonts).unwrap();
        paginate(&boxes, w, h, &fonts)
    }

    #[test]
    fn single_page() {
        let config = paginate_html("<p>Short text</p>", 595.0, 842.0);
        assert_eq!(config.pages.len(), 1);
    }

    #[test]
    fn multiple_pages() {
        let mut html = String::new();
        for i in 0..60 {
            html.push_str(&format!("<p>Paragraph {} with some text</p>", i));
        }
        let config = paginate_html(&html, 595.0, 842.0);
        assert!(config.pages.len() > 1, "got {}", config.pages.len());
    }

    #[test]
    fn forced_breaks_without_trailing_blank_page() {
        let html = r#"<section class="page" style="height: 300px">A</section>
            <section class="page" style="height: 300px">B</section>
            <section class="page" style="height: 300px">C</section>"#;
        // The final section still forces a break; no blank page may follow.
        let config = paginate_html(html, 400.0, 300.0);
        assert_eq!(config.pages.len(), 3);
        assert_eq!(config.page_text(2), vec!["C".to_string()]);
    }

    #[test]
    fn heading_moves_with_its_content() {
        // 100px page: filler ends at 70, heading (~34px) fits, paragraph does not.
        let html = r#"<div style="height: 70px">filler</div>
            <h2 style="font-size: 20px; margin-bottom: 0px; line-height: 1.2">Section</h2>
            <div class="keep" style="height: 60px">body</div>"#;
        let config = paginate_html(html, 400.0, 100.0);
        assert_eq!(config.pages.len(), 2);
        let last_on_first = config.pages[0].boxes.last().unwrap();
        assert!(!last_on_first.keep_with_next, "heading stranded at page end");
        assert_eq!(config.page_text(1)[0], "Section");
    }

    #[test]
    fn atomic_box_moves_whole() {
        let html = r#"<div style="height: 80px">filler</div>
            <div class="keep" style="height: 50px"><p>one</p><p>two</p></div>"#;
        let config = paginate_html(html, 400.0, 100.0);
        assert_eq!(config.pages.len(), 2);
        assert_eq!(config.page_text(1), vec!["one".to_string(), "two".to_string()]);
    }
}
