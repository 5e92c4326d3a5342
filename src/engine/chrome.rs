//! Headless Chrome/Chromium as a layout engine.
//!
//! Each session gets its own scratch directory. The markup is written there,
//! the browser prints it with `--print-to-pdf`, and the directory goes away
//! with the session. Page size and zero margins come from the markup's
//! `@page` rule; backgrounds are kept through `print-color-adjust: exact`.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use crate::engine::{EngineSession, LayoutEngine, PrintOptions};
use crate::error::EngineError;

/// Executable names tried, in order, when no path is configured.
const CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A headless Chrome installation.
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    executable: Option<PathBuf>,
    extra_args: Vec<OsString>,
}

impl ChromeEngine {
    /// Use the browser at `executable`.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(executable.into()),
            extra_args: Vec::new(),
        }
    }

    /// Look for a browser via `CHROME_PATH`, then on `PATH`. Discovery
    /// failures surface when a session is opened.
    pub fn discover() -> Self {
        Self {
            executable: resolve_executable(env::var_os("CHROME_PATH")),
            extra_args: Vec::new(),
        }
    }

    /// Extra command-line arguments, e.g. `--no-sandbox` inside containers.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    fn unavailable(&self, reason: impl Into<String>) -> EngineError {
        EngineError::Unavailable {
            engine: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl LayoutEngine for ChromeEngine {
    fn name(&self) -> &str {
        "chrome"
    }

    fn open_session(&self) -> Result<Box<dyn EngineSession + '_>, EngineError> {
        let executable = self.executable.as_deref().ok_or_else(|| {
            self.unavailable(format!(
                "no browser found; set CHROME_PATH or install one of: {}",
                CANDIDATES.join(", ")
            ))
        })?;
        if !executable.is_file() {
            return Err(self.unavailable(format!("'{}' is not a file", executable.display())));
        }
        let scratch = tempfile::Builder::new()
            .prefix("folio-chrome-")
            .tempdir()
            .map_err(|e| self.unavailable(format!("cannot create scratch directory: {e}")))?;
        log::debug!(
            "chrome: session opened with {} in {}",
            executable.display(),
            scratch.path().display()
        );
        Ok(Box::new(ChromeSession {
            engine: self,
            executable,
            scratch,
            page: None,
            child: None,
            stable: false,
        }))
    }
}

struct ChromeSession<'a> {
    engine: &'a ChromeEngine,
    executable: &'a Path,
    scratch: TempDir,
    page: Option<PathBuf>,
    /// The browser while it is running; killed if the session drops first.
    child: Option<Child>,
    stable: bool,
}

impl ChromeSession<'_> {
    fn output_path(&self) -> PathBuf {
        self.scratch.path().join("out.pdf")
    }

    fn log_path(&self) -> PathBuf {
        self.scratch.path().join("chrome.log")
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            // The process may already have exited on its own.
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn spawn(&self, page: &Path, timeout: Duration) -> Result<Child, EngineError> {
        let mut print_to = OsString::from("--print-to-pdf=");
        print_to.push(self.output_path());
        let mut url = OsString::from("file://");
        url.push(page);
        let log = fs::File::create(self.log_path())?;

        Command::new(self.executable)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg("--run-all-compositor-stages-before-draw")
            .arg(format!("--virtual-time-budget={}", timeout.as_millis()))
            .args(&self.engine.extra_args)
            .arg(print_to)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    self.engine.unavailable(e.to_string())
                }
                _ => EngineError::Io(e),
            })
    }
}

impl EngineSession for ChromeSession<'_> {
    fn load(&mut self, markup: &str) -> Result<(), EngineError> {
        let page = self.scratch.path().join("index.html");
        fs::write(&page, markup)?;
        log::debug!("chrome: wrote {} bytes of markup", markup.len());
        self.page = Some(page);
        Ok(())
    }

    fn wait_until_stable(&mut self, timeout: Duration) -> Result<(), EngineError> {
        let Some(page) = self.page.clone() else {
            return Err(EngineError::Sequence("wait_until_stable called before load"));
        };

        let deadline = Instant::now() + timeout;
        let spawned = self.spawn(&page, timeout)?;
        let child = self.child.insert(spawned);
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                log::warn!("chrome: no result after {timeout:?}, killing the browser");
                self.kill_child();
                return Err(EngineError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };
        self.child = None;

        if !status.success() {
            let stderr = fs::read_to_string(self.log_path()).unwrap_or_default();
            let last = stderr.lines().last().unwrap_or("no output");
            return Err(EngineError::Load(format!("browser exited with {status}: {last}")));
        }
        self.stable = true;
        Ok(())
    }

    fn print(&mut self, options: &PrintOptions) -> Result<Vec<u8>, EngineError> {
        if !self.stable {
            return Err(EngineError::Sequence("print called before layout was stable"));
        }
        if !options.print_background {
            log::warn!("chrome: backgrounds are controlled by the markup and will still print");
        }
        let bytes = fs::read(self.output_path()).map_err(|e| {
            EngineError::Rasterize(format!("browser produced no PDF: {e}"))
        })?;
        log::debug!("chrome: printed {} bytes for '{}'", bytes.len(), options.title);
        Ok(bytes)
    }
}

impl Drop for ChromeSession<'_> {
    fn drop(&mut self) {
        self.kill_child();
        log::debug!("chrome: session released");
    }
}

/// An explicit, non-empty path wins; otherwise the first candidate on `PATH`.
fn resolve_executable(configured: Option<OsString>) -> Option<PathBuf> {
    configured
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| CANDIDATES.iter().find_map(|name| find_on_path(name)))
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
