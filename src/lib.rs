//! # folio – fixed-layout documents printed to PDF
//!
//! Documents are described as pages of structural blocks ([`content`]),
//! composed into styled markup, handed to a layout engine ([`engine`]) and
//! verified page by page once printed ([`driver`]).
//!
//! Two engines are provided. [`engine::ChromeEngine`] drives headless
//! Chrome. [`engine::BuiltinEngine`] runs the in-process pipeline:
//!
//! 1. **Parse** – markup → DOM tree ([`dom`])
//! 2. **Style** – inline declarations and structural classes ([`style`])
//! 3. **Layout** – flexbox/grid layout with Taffy ([`layout`])
//! 4. **Paginate** – split into canvas-sized pages ([`pagination`])
//! 5. **Render** – emit PDF bytes via printpdf ([`render`])

pub mod canvas;
pub mod config;
pub mod content;
pub mod dom;
pub mod driver;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod inspect;
pub mod layout;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod style;
pub mod templates;
pub mod writer;

// Re-exports for convenience
pub use canvas::{Canvas, PaperSize};
pub use config::RenderConfig;
pub use content::{Block, Document, Page};
pub use driver::{render, render_to_file, RenderedDocument};
pub use engine::{EngineKind, LayoutEngine};
pub use error::{Error, Result};
