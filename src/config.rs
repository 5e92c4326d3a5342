//! Run configuration shared by the binaries and the driver.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{BuiltinEngine, ChromeEngine, EngineKind, LayoutEngine};

/// Settings for one rendering run.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Which layout engine to drive.
    pub engine: EngineKind,
    /// Explicit browser binary. Discovered on `PATH` when unset.
    pub chrome_path: Option<PathBuf>,
    /// Extra browser arguments, e.g. `--no-sandbox`.
    pub chrome_args: Vec<String>,
    /// Upper bound on waiting for layout to settle.
    pub stabilization_timeout: Duration,
    /// Directory that output paths are resolved against.
    pub anchor: PathBuf,
    pub deck_output: PathBuf,
    pub manual_output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Chrome,
            chrome_path: None,
            chrome_args: Vec::new(),
            stabilization_timeout: Duration::from_secs(30),
            anchor: PathBuf::from(env!("CARGO_MANIFEST_DIR")),
            deck_output: PathBuf::from("out/deck.pdf"),
            manual_output: PathBuf::from("out/manual.pdf"),
        }
    }
}

impl RenderConfig {
    /// Defaults overridden by `FOLIO_ENGINE` and `CHROME_PATH`. An
    /// unrecognised engine name is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(name) = env::var("FOLIO_ENGINE") {
            match name.parse() {
                Ok(kind) => config.engine = kind,
                Err(e) => log::warn!("ignoring FOLIO_ENGINE: {e}"),
            }
        }
        if let Some(path) = env::var_os("CHROME_PATH").filter(|p| !p.is_empty()) {
            config.chrome_path = Some(PathBuf::from(path));
        }
        config
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<PathBuf>) -> Self {
        self.anchor = anchor.into();
        self
    }

    /// Instantiate the configured engine.
    pub fn build_engine(&self) -> Box<dyn LayoutEngine> {
        match self.engine {
            EngineKind::Builtin => Box::new(BuiltinEngine::new()),
            EngineKind::Chrome => {
                let chrome = match &self.chrome_path {
                    Some(path) => ChromeEngine::new(path),
                    None => ChromeEngine::discover(),
                };
                Box::new(chrome.with_args(&self.chrome_args))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.engine, EngineKind::Chrome);
        assert_eq!(config.stabilization_timeout, Duration::from_secs(30));
        assert!(config.anchor.join("Cargo.toml").is_file());
        assert_eq!(config.deck_output, PathBuf::from("out/deck.pdf"));
    }

    #[test]
    fn builds_requested_engine() {
        let config = RenderConfig::default().with_engine(EngineKind::Builtin);
        assert_eq!(config.build_engine().name(), "builtin");

        let config = RenderConfig {
            chrome_path: Some(PathBuf::from("/opt/chrome")),
            ..RenderConfig::default()
        };
        assert_eq!(config.build_engine().name(), "chrome");
    }
}
