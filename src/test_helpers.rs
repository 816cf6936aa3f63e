//! Shared test utilities.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = setup_fixtures();
//! run(&site.source, &site.dest, ...);
//! assert_eq!(relative_files(&site.dest), vec!["index.html", ...]);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// An isolated copy of `fixtures/site/` plus an empty destination.
pub struct Site {
    /// Keeps the directory alive for the duration of the test.
    _tmp: TempDir,
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Copy `fixtures/site/public/` into a temp directory.
///
/// Paths are canonical so they compare equal to what the pipeline stores,
/// even where the temp dir sits behind a symlink.
pub fn setup_fixtures() -> Site {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site/public");
    let source = root.join("public");
    std::fs::create_dir_all(&source).unwrap();
    copy_dir_recursive(&fixtures, &source).unwrap();
    Site {
        _tmp: tmp,
        source,
        dest: root.join("rendered-public"),
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Sorted `/`-separated paths of every file under `root`.
pub fn relative_files(root: &Path) -> Vec<String> {
    snapshot(root).into_keys().collect()
}

/// Every file under `root`, relative path → contents.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap();
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (key, std::fs::read(entry.path()).unwrap())
        })
        .collect()
}
