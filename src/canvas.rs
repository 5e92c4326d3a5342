//! Canvas regimes – the page geometry contract shared by every page of a
//! document.
//!
//! All layout happens in CSS pixels (96 per inch). Conversion to PDF points
//! (72 per inch) is a fixed factor applied once, at rasterization.

use serde::{Deserialize, Serialize};

/// CSS px → PDF pt.
pub const PX_TO_PT: f32 = 0.75;

/// CSS px per millimetre.
pub const PX_PER_MM: f32 = 96.0 / 25.4;

/// Standard physical paper formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    Letter,
}

impl PaperSize {
    /// Paper dimensions in millimetres (portrait).
    pub fn size_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::Letter => (215.9, 279.4),
        }
    }

    /// The keyword used in a CSS `@page { size: ... }` rule.
    pub fn css_keyword(self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::Letter => "letter",
        }
    }
}

/// Page-dimension contract for a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Canvas {
    /// A fixed pixel canvas, e.g. a 16:9 slide.
    Fixed { width_px: f32, height_px: f32 },
    /// A physical paper size. The engine margin is always zero; the visual
    /// margin is produced by `padding_px` inside each page container.
    Paper { size: PaperSize, padding_px: f32 },
}

impl Canvas {
    /// 1280×720 widescreen canvas.
    pub fn widescreen() -> Self {
        Canvas::Fixed {
            width_px: 1280.0,
            height_px: 720.0,
        }
    }

    /// A4 portrait with ~18 mm of in-page padding.
    pub fn a4() -> Self {
        Canvas::Paper {
            size: PaperSize::A4,
            padding_px: 68.0,
        }
    }

    /// Page width in CSS px.
    pub fn width_px(&self) -> f32 {
        match *self {
            Canvas::Fixed { width_px, .. } => width_px,
            Canvas::Paper { size, .. } => size.size_mm().0 * PX_PER_MM,
        }
    }

    /// Page height in CSS px.
    pub fn height_px(&self) -> f32 {
        match *self {
            Canvas::Fixed { height_px, .. } => height_px,
            Canvas::Paper { size, .. } => size.size_mm().1 * PX_PER_MM,
        }
    }

    pub fn width_pt(&self) -> f32 {
        self.width_px() * PX_TO_PT
    }

    pub fn height_pt(&self) -> f32 {
        self.height_px() * PX_TO_PT
    }

    /// Padding applied inside each page container.
    pub fn page_padding_px(&self) -> f32 {
        match *self {
            Canvas::Fixed { .. } => 56.0,
            Canvas::Paper { padding_px, .. } => padding_px,
        }
    }

    /// The `@page` rule for browser engines. Margins are always zero.
    pub fn css_page_rule(&self) -> String {
        match *self {
            Canvas::Fixed {
                width_px,
                height_px,
            } => format!("@page {{ size: {width_px}px {height_px}px; margin: 0; }}"),
            Canvas::Paper { size, .. } => {
                format!("@page {{ size: {}; margin: 0; }}", size.css_keyword())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widescreen_is_960_by_540_points() {
        let c = Canvas::widescreen();
        assert_eq!(c.width_pt(), 960.0);
        assert_eq!(c.height_pt(), 540.0);
    }

    #[test]
    fn a4_matches_iso_points() {
        let c = Canvas::a4();
        assert!((c.width_pt() - 595.28).abs() < 0.1);
        assert!((c.height_pt() - 841.89).abs() < 0.1);
    }

    #[test]
    fn page_rule_has_zero_margin() {
        assert_eq!(
            Canvas::widescreen().css_page_rule(),
            "@page { size: 1280px 720px; margin: 0; }"
        );
        assert!(Canvas::a4().css_page_rule().contains("size: A4"));
    }
}
