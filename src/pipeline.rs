//! The incremental mirror run.
//!
//! [`run`] walks the source tree once, in order (parents before children,
//! siblings sorted by name), and for every entry:
//!
//! ```text
//! directory            → create it in the destination        MKDIR
//! stale sidecar marker → ignored, not counted
//! unchanged file       → nothing                             SKIP
//! changed HTML file    → transform (render or byte-copy)     RENDER / COPY
//! other changed file   → byte-copy                           COPY
//! ```
//!
//! ## Failure isolation
//!
//! A file that cannot be hashed, read, or written is reported as a
//! [`PipelineEvent::Failed`] and the run moves on. Its fingerprint is not
//! recorded, so the next run tries it again. Only problems with the roots
//! themselves or with the cache file abort the run.
//!
//! ## Cache persistence
//!
//! The cache is written once, after the walk. A run that aborts early never
//! leaves a half-updated cache behind.

use crate::cache::{CacheError, CacheStore, ChangeCache, Freshness};
use crate::config::RenderConfig;
use crate::mirror::DirectoryMirror;
use crate::substitute::Substitution;
use crate::transform::{self, Outcome, TransformError};
use crate::typeset::Typesetter;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Destination {dest} is inside source {source_root}")]
    DestinationInsideSource { dest: PathBuf, source_root: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Cannot walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Why a single entry could not be mirrored.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Transform(#[from] TransformError),
    #[error("{0}")]
    Walk(#[from] walkdir::Error),
    #[error("would be overwritten by the change cache at {}", .0.display())]
    CacheCollision(PathBuf),
}

/// Options for one run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Treat every file as changed.
    pub force: bool,
    pub config: RenderConfig,
}

/// Per-entry progress, in walk order. Paths are relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    DirectoryCreated { path: PathBuf },
    Rendered { path: PathBuf, expressions: usize },
    Copied { path: PathBuf },
    Skipped { path: PathBuf },
    Failed { path: PathBuf, error: String },
}

/// Counters for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub directories_created: u32,
    pub rendered: u32,
    pub copied: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunStats {
    /// Files considered (sidecars excluded).
    pub fn total(&self) -> u32 {
        self.rendered + self.copied + self.skipped + self.failed
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} copied, {} skipped",
            self.rendered, self.copied, self.skipped
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        let files = self.total();
        let dirs = self.directories_created;
        write!(
            f,
            " ({} {}, {} {})",
            files,
            if files == 1 { "file" } else { "files" },
            dirs,
            if dirs == 1 { "directory" } else { "directories" }
        )
    }
}

/// A file that could not be mirrored.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: FileError,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub failures: Vec<Failure>,
    /// Where the cache was written.
    pub cache_path: PathBuf,
}

/// What happened to one file.
enum FileAction {
    Skipped,
    Rendered(Substitution),
    Copied,
}

/// Mirror `source_root` into `dest_root`.
///
/// `on_event` is called once per reported entry, in walk order.
pub fn run(
    source_root: &Path,
    dest_root: &Path,
    options: &RunOptions,
    typesetter: &dyn Typesetter,
    on_event: &mut dyn FnMut(&PipelineEvent),
) -> Result<RunReport, PipelineError> {
    let (source_root, dest_root) = resolve_roots(source_root, dest_root)?;
    let cache_path = dest_root.join(&options.config.cache_file);
    let store = CacheStore::load(&cache_path)?;
    tracing::debug!(entries = store.len(), path = %cache_path.display(), "loaded cache");

    let mut cache = ChangeCache::new(store, options.force);
    let mirror = DirectoryMirror::new(&source_root, &dest_root);
    let mut stats = RunStats::default();
    let mut failures = Vec::new();

    // Linked directories are mirrored as real ones; walkdir reports link loops
    let walker = WalkDir::new(&source_root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // The root itself being unreadable is fatal
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                let path = e.path().unwrap_or(source_root.as_path()).to_path_buf();
                fail(&mirror, &mut stats, &mut failures, on_event, path, e.into());
                continue;
            }
        };
        let path = entry.path();
        let relative = mirror.relative(path).to_path_buf();

        if entry.file_type().is_dir() {
            let target = mirror.target_path_for(path);
            match mirror.ensure_dir(&target) {
                Ok(()) => {
                    stats.directories_created += 1;
                    on_event(&PipelineEvent::DirectoryCreated { path: relative });
                }
                Err(e) => {
                    let path = path.to_path_buf();
                    fail(&mirror, &mut stats, &mut failures, on_event, path, e.into());
                }
            }
            continue;
        }

        if options.config.is_sidecar(path) {
            tracing::debug!(path = %relative.display(), "ignoring sidecar");
            continue;
        }

        if mirror.target_path_for(path) == cache_path {
            let error = FileError::CacheCollision(cache_path.clone());
            fail(&mirror, &mut stats, &mut failures, on_event, path.to_path_buf(), error);
            continue;
        }

        match process_file(path, &mut cache, &mirror, options, typesetter) {
            Ok(FileAction::Skipped) => {
                stats.skipped += 1;
                on_event(&PipelineEvent::Skipped { path: relative });
            }
            Ok(FileAction::Rendered(substitution)) => {
                stats.rendered += 1;
                on_event(&PipelineEvent::Rendered {
                    path: relative,
                    expressions: substitution.rendered,
                });
            }
            Ok(FileAction::Copied) => {
                stats.copied += 1;
                on_event(&PipelineEvent::Copied { path: relative });
            }
            Err(e) => {
                let path = path.to_path_buf();
                fail(&mirror, &mut stats, &mut failures, on_event, path, e);
            }
        }
    }

    cache.into_store().save(&cache_path)?;
    tracing::debug!(path = %cache_path.display(), "saved cache");

    Ok(RunReport {
        stats,
        failures,
        cache_path,
    })
}

/// Check the roots and turn them into absolute, canonical paths.
///
/// Creates the destination root. Rejects a destination inside the source,
/// which would make the walk mirror its own output.
fn resolve_roots(
    source_root: &Path,
    dest_root: &Path,
) -> Result<(PathBuf, PathBuf), PipelineError> {
    if !source_root.exists() {
        return Err(PipelineError::SourceNotFound(source_root.to_path_buf()));
    }
    if !source_root.is_dir() {
        return Err(PipelineError::NotADirectory(source_root.to_path_buf()));
    }
    let source = source_root.canonicalize()?;
    let inside = |dest: &Path| dest.starts_with(&source);

    if inside(&std::path::absolute(dest_root)?) {
        return Err(PipelineError::DestinationInsideSource {
            dest: dest_root.to_path_buf(),
            source_root: source,
        });
    }
    fs::create_dir_all(dest_root)?;
    let dest = dest_root.canonicalize()?;
    if inside(&dest) {
        return Err(PipelineError::DestinationInsideSource {
            dest,
            source_root: source,
        });
    }
    Ok((source, dest))
}

/// Mirror one file. The fingerprint is recorded only after success.
fn process_file(
    path: &Path,
    cache: &mut ChangeCache,
    mirror: &DirectoryMirror,
    options: &RunOptions,
    typesetter: &dyn Typesetter,
) -> Result<FileAction, FileError> {
    let fingerprint = match cache.check(path)? {
        Freshness::Unchanged => return Ok(FileAction::Skipped),
        Freshness::Changed { fingerprint } => fingerprint,
    };

    let target = mirror.target_path_for(path);
    if let Some(parent) = target.parent() {
        mirror.ensure_dir(parent)?;
    }

    let action = if options.config.is_html(path) {
        match transform::transform(path, &target, typesetter, &options.config.math)? {
            Outcome::Rendered(substitution) => FileAction::Rendered(substitution),
            Outcome::Copied => FileAction::Copied,
        }
    } else {
        fs::copy(path, &target)?;
        FileAction::Copied
    };

    cache.record(path, fingerprint);
    Ok(action)
}

fn fail(
    mirror: &DirectoryMirror,
    stats: &mut RunStats,
    failures: &mut Vec<Failure>,
    on_event: &mut dyn FnMut(&PipelineEvent),
    path: PathBuf,
    error: FileError,
) {
    tracing::warn!(path = %path.display(), error = %error, "failed to mirror entry");
    stats.failed += 1;
    on_event(&PipelineEvent::Failed {
        path: mirror.relative(&path).to_path_buf(),
        error: error.to_string(),
    });
    failures.push(Failure { path, error });
}
