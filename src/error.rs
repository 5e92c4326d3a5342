//! Error types for the folio pipeline.
//!
//! Authoring mistakes are reported as [`ContentError`] before anything is
//! rendered. Everything that goes wrong after the markup leaves the content
//! template surfaces as a variant of [`Error`] that names the failing stage.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A content-authoring error caught while validating a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    /// The document declares no pages at all.
    #[error("document '{0}' has no pages")]
    NoPages(String),

    /// A page carries no blocks.
    #[error("page {page} has no blocks")]
    EmptyPage { page: usize },

    /// A page or block needs a style rule the stylesheet does not declare.
    #[error("page {page}: style rule '{kind}' is not declared")]
    MissingStyleRule { page: usize, kind: &'static str },

    /// A style rule references a colour token that was never declared.
    #[error("style rule '{rule}' references undeclared colour token '{token}'")]
    UnknownColorToken { rule: String, token: String },

    /// Text still contains a `{{...}}` placeholder after substitution.
    #[error("page {page}: unresolved placeholder '{placeholder}'")]
    UnresolvedPlaceholder { page: usize, placeholder: String },
}

/// A failure reported by a layout engine session.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be started or reached.
    #[error("{engine} is unavailable: {reason}")]
    Unavailable { engine: String, reason: String },

    /// The markup could not be loaded.
    #[error("markup failed to load: {0}")]
    Load(String),

    /// Layout did not settle before the deadline.
    #[error("layout did not stabilise within {0:?}")]
    Timeout(Duration),

    /// A session call was made out of order (e.g. print before load).
    #[error("session misuse: {0}")]
    Sequence(&'static str),

    /// Content runs past the bottom edge of its page.
    #[error("page {page} overflows by {by_px:.1}px")]
    Overflow { page: usize, by_px: f32 },

    /// Rasterization failed after layout settled.
    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An engine name that is neither `chrome` nor `builtin`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown engine '{0}' (expected chrome or builtin)")]
pub struct UnknownEngine(pub String);

/// A failure reading rendered bytes back as a PDF.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("not a readable PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("page {page} has a malformed MediaBox")]
    MediaBox { page: usize },
}

/// Top-level pipeline error.
#[derive(Error, Debug)]
pub enum Error {
    /// The document failed construction-time validation.
    #[error("content error: {0}")]
    Content(#[from] ContentError),

    /// The rendering engine could not be started.
    #[error("engine unavailable ({engine}): {reason}")]
    EngineUnavailable { engine: String, reason: String },

    /// The engine rejected the markup.
    #[error("load failed ({engine}): {reason}")]
    LoadFailed { engine: String, reason: String },

    /// Layout never reached a quiescent state.
    #[error("stabilisation timed out after {waited:?} ({engine})")]
    StabilizationTimeout { engine: String, waited: Duration },

    /// Rasterization failed or the session was driven incorrectly.
    #[error("rasterize failed ({engine}): {reason}")]
    Rasterize { engine: String, reason: String },

    /// A page holds more content than fits on it; printing would lose it.
    #[error("page {page} overflows its canvas by {by_px:.1}px ({engine})")]
    PageOverflow {
        engine: String,
        page: usize,
        by_px: f32,
    },

    /// The rasterized document does not have one page per declared page.
    #[error("page count mismatch: declared {declared}, rendered {rendered}")]
    PageCountMismatch { declared: usize, rendered: usize },

    /// A rendered page does not match the canvas regime.
    #[error(
        "page {page} is {actual_w:.1}x{actual_h:.1} pt, expected {expected_w:.1}x{expected_h:.1} pt"
    )]
    GeometryMismatch {
        page: usize,
        expected_w: f32,
        expected_h: f32,
        actual_w: f32,
        actual_h: f32,
    },

    /// The rasterized bytes could not be parsed back as a PDF.
    #[error("could not inspect rendered PDF: {0}")]
    Inspect(#[from] InspectError),

    /// The output file could not be written.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Map a session error to the pipeline stage it belongs to.
    pub(crate) fn from_engine(engine: &str, err: EngineError) -> Self {
        let engine = engine.to_string();
        match err {
            EngineError::Unavailable { engine, reason } => Error::EngineUnavailable { engine, reason },
            EngineError::Load(reason) => Error::LoadFailed { engine, reason },
            EngineError::Timeout(waited) => Error::StabilizationTimeout { engine, waited },
            EngineError::Sequence(reason) => Error::Rasterize {
                engine,
                reason: reason.to_string(),
            },
            EngineError::Overflow { page, by_px } => Error::PageOverflow { engine, page, by_px },
            EngineError::Rasterize(reason) => Error::Rasterize { engine, reason },
            EngineError::Io(e) => Error::Rasterize {
                engine,
                reason: e.to_string(),
            },
        }
    }
}
