//! Source → destination path mapping.
//!
//! The destination tree mirrors the source tree exactly: `public/a/b.html`
//! under a source root of `public/` lands at `rendered-public/a/b.html`
//! under a destination root of `rendered-public/`.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct DirectoryMirror {
    source_root: PathBuf,
    dest_root: PathBuf,
}

impl DirectoryMirror {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
        }
    }

    /// Swap the source-root prefix of `source` for the destination root.
    ///
    /// Prefixes match whole components. A path outside the source root is
    /// handed to `Path::join` as-is, so an absolute one comes back unchanged;
    /// walking the source root never produces one.
    pub fn target_path_for(&self, source: &Path) -> PathBuf {
        match source.strip_prefix(&self.source_root) {
            Ok(relative) => self.dest_root.join(relative),
            Err(_) => self.dest_root.join(source),
        }
    }

    /// Relative form of `source`, for display.
    pub fn relative<'a>(&self, source: &'a Path) -> &'a Path {
        source.strip_prefix(&self.source_root).unwrap_or(source)
    }

    /// Create `path` and any missing ancestors. No-op when it already exists.
    pub fn ensure_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}
