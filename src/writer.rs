//! Atomic output writes.
//!
//! Bytes land in a temporary file next to the destination and are renamed
//! into place only after they are synced. A failed write never leaves a
//! partial file, and an existing destination survives untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Writes files under a fixed anchor directory.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    anchor: PathBuf,
}

impl OutputWriter {
    pub fn new(anchor: impl Into<PathBuf>) -> Self {
        Self {
            anchor: anchor.into(),
        }
    }

    pub fn anchor(&self) -> &Path {
        &self.anchor
    }

    /// Write `bytes` to `relative` (resolved against the anchor) and return
    /// the absolute destination.
    pub fn write(&self, relative: impl AsRef<Path>, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.anchor.join(relative);
        let fail = |source| Error::Write {
            path: path.clone(),
            source,
        };

        let dir = path.parent().unwrap_or(&self.anchor);
        fs::create_dir_all(dir).map_err(fail)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(fail)?;
        tmp.write_all(bytes).map_err(fail)?;
        tmp.as_file().sync_all().map_err(fail)?;
        tmp.persist(&path).map_err(|e| fail(e.error))?;

        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn creates_parents_and_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(tmp.path());
        let path = writer.write("out/nested/file.pdf", b"%PDF-1.7").unwrap();
        assert_eq!(path, tmp.path().join("out/nested/file.pdf"));
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.7");
        assert_eq!(entries(&tmp.path().join("out/nested")), vec!["file.pdf"]);
    }

    #[test]
    fn replaces_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(tmp.path());
        writer.write("a.pdf", b"old").unwrap();
        writer.write("a.pdf", b"new").unwrap();
        assert_eq!(fs::read(tmp.path().join("a.pdf")).unwrap(), b"new");
    }

    #[test]
    fn failed_write_leaves_destination_alone() {
        let tmp = tempfile::tempdir().unwrap();
        // The destination is an occupied directory, so the rename fails.
        let dest = tmp.path().join("out.pdf");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep"), b"x").unwrap();

        let err = OutputWriter::new(tmp.path()).write("out.pdf", b"data").unwrap_err();
        match err {
            Error::Write { path, .. } => assert_eq!(path, dest),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(dest.is_dir());
        assert_eq!(entries(tmp.path()), vec!["out.pdf"]);
    }

    #[test]
    fn parent_that_is_a_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("out"), b"not a dir").unwrap();
        let err = OutputWriter::new(tmp.path()).write("out/deck.pdf", b"data").unwrap_err();
        assert!(matches!(err, Error::Write { .. }), "{err:?}");
        assert_eq!(fs::read(tmp.path().join("out")).unwrap(), b"not a dir");
    }
}
