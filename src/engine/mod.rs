//! Layout engines: the collaborator that turns styled markup into pages.
//!
//! A session is driven in a fixed order: `load`, `wait_until_stable`,
//! `print`. Dropping the session releases everything it holds.

pub mod builtin;
pub mod chrome;

use std::time::Duration;

use crate::canvas::Canvas;
use crate::error::{EngineError, UnknownEngine};

pub use builtin::BuiltinEngine;
pub use chrome::ChromeEngine;

/// Options for rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub canvas: Canvas,
    /// Keep background colours and images in the output.
    pub print_background: bool,
    /// Title for the output's metadata.
    pub title: String,
}

/// A layout engine that can open independent sessions.
pub trait LayoutEngine {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Start a fresh session. Fails with [`EngineError::Unavailable`] when
    /// the engine cannot be started.
    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError>;
}

/// One exclusive use of an engine.
pub trait EngineSession {
    /// Load markup. Malformed markup fails with [`EngineError::Load`].
    fn load(&mut self, markup: &str) -> Result<(), EngineError>;

    /// Block until layout is quiescent, or fail with
    /// [`EngineError::Timeout`] once `timeout` has elapsed.
    fn wait_until_stable(&mut self, timeout: Duration) -> Result<(), EngineError>;

    /// Rasterize the stable layout to PDF bytes.
    fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError>;
}

/// Which engine a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    Chrome,
    Builtin,
}

impl std::str::FromStr for EngineKind {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(EngineKind::Chrome),
            "builtin" => Ok(EngineKind::Builtin),
            other => Err(UnknownEngine(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parses() {
        assert_eq!("Chrome".parse::<EngineKind>(), Ok(EngineKind::Chrome));
        assert_eq!(" builtin ".parse::<EngineKind>(), Ok(EngineKind::Builtin));
        let err = "WebKit".parse::<EngineKind>().unwrap_err();
        assert_eq!(err, UnknownEngine("webkit".into()));
        assert_eq!(err.to_string(), "unknown engine 'webkit' (expected chrome or builtin)");
    }
}
