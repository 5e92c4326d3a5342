//! Text measurement for the builtin engine.
//!
//! The renderer draws every family with the PDF base-14 Helvetica faces, so
//! layout measures with their AFM advance widths.

/// Helvetica advance widths (1/1000 em) for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths (1/1000 em) for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the tables (bullets, accents, ...).
const FALLBACK_ADVANCE: u16 = 556;

/// Measures text for layout. Italic faces share the upright advances, and
/// the family is ignored because every family prints as Helvetica.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontManager;

impl FontManager {
    pub fn new() -> Self {
        Self
    }

    /// Width of `text` in px at `font_size` px.
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool, _italic: bool, _family: &str) -> f32 {
        let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
        let units: u32 = text
            .chars()
            .map(|ch| {
                let code = ch as u32;
                if (0x20..=0x7E).contains(&code) {
                    table[(code - 0x20) as usize] as u32
                } else if ch == '\u{00A0}' {
                    table[0] as u32
                } else {
                    FALLBACK_ADVANCE as u32
                }
            })
            .sum();
        units as f32 * font_size / 1000.0
    }

    /// Height of one line box in px.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }
}

/// Word-wrap text to fit within `max_width` pixels. Returns a vec of lines.
///
/// A single word wider than `max_width` stays on its own line unbroken.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    family: &str,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            let w = fonts.measure_text_width(&candidate, font_size, bold, italic, family);
            if w > max_width && !current_line.is_empty() {
                lines.push(std::mem::replace(&mut current_line, word.to_string()));
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_advances() {
        let mgr = FontManager::default();
        // H(722) e(556) l(222) l(222) o(556) = 2278 units
        let w = mgr.measure_text_width("Hello", 10.0, false, false, "Helvetica");
        assert!((w - 22.78).abs() < 0.01, "got {w}");
        let bold = mgr.measure_text_width("Hello", 10.0, true, false, "Helvetica");
        assert!(bold > w);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 16.0, false, false, "Helvetica", 60.0, &mgr);
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
        assert!(lines.iter().all(|l| !l.starts_with(' ')));
    }

    #[test]
    fn long_word_is_not_split() {
        let mgr = FontManager::default();
        let lines = wrap_text("a supercalifragilistic b", 16.0, false, false, "Helvetica", 40.0, &mgr);
        assert!(lines.contains(&"supercalifragilistic".to_string()));
    }

    #[test]
    fn every_family_measures_as_helvetica() {
        let mgr = FontManager::new();
        let helvetica = mgr.measure_text_width("Folio", 16.0, false, false, "Helvetica");
        let other = mgr.measure_text_width("Folio", 16.0, false, false, "Georgia");
        assert_eq!(helvetica, other);
    }
}
