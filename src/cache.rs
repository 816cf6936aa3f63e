//! Content-fingerprint cache for incremental runs.
//!
//! Rendering math is the slow part of a run, and almost every file in a
//! site is untouched between two builds. This module remembers a SHA-256
//! fingerprint for every source file that was processed successfully, so the
//! next run can skip files whose bytes have not changed.
//!
//! # Design
//!
//! Keys are absolute source paths; values are hex SHA-256 digests of the
//! file contents. Content-based rather than mtime-based so the cache survives
//! `git checkout` (which resets modification times).
//!
//! Checking and recording are separate steps. [`ChangeCache::check`] computes
//! the fingerprint and compares; the pipeline calls [`ChangeCache::record`]
//! only once the file has been mirrored successfully, so a file that failed
//! is retried on the next run. [`ChangeCache::is_unchanged`] does both in one
//! call for callers that do not need that distinction.
//!
//! Entries for deleted source files are never pruned. They are harmless: a
//! path that reappears is simply compared against its old fingerprint.
//!
//! ## Storage
//!
//! The store is a flat, pretty-printed JSON object written inside the
//! destination root (`.render-cache.json` by default):
//!
//! ```json
//! {
//!   "/site/public/index.html": "9f86d081884c7d65..."
//! }
//! ```
//!
//! It is loaded once at start and rewritten in full once at the end of a run.
//!
//! ## Bypassing the cache
//!
//! With `--force` every file is reported as changed. Fingerprints are still
//! recorded, so the following normal run skips everything that was rebuilt.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode cache: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted mapping from source path to content fingerprint.
///
/// A `BTreeMap` keeps the written file sorted, so two runs over the same
/// tree produce byte-identical cache files.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CacheStore {
    pub entries: BTreeMap<String, String>,
}

impl CacheStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file yields an empty store; a file that
    /// is not a valid store is discarded with a warning (everything gets
    /// rebuilt once and the cache heals). Any other read failure is fatal.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::empty()),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        match serde_json::from_str(&content) {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cache");
                Ok(Self::empty())
            }
        }
    }

    /// Overwrite `path` with the pretty-printed store.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, source: &Path) -> Option<&str> {
        self.entries.get(&cache_key(source)).map(String::as_str)
    }

    pub fn insert(&mut self, source: &Path, fingerprint: String) {
        self.entries.insert(cache_key(source), fingerprint);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(source: &Path) -> String {
    source.to_string_lossy().into_owned()
}

/// Result of comparing a file against its stored fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Same bytes as the last successful run.
    Unchanged,
    /// New or modified (or `--force`). Carries the fresh fingerprint to
    /// [`ChangeCache::record`] after processing.
    Changed { fingerprint: String },
}

/// Change detection over a [`CacheStore`] for the duration of one run.
#[derive(Debug)]
pub struct ChangeCache {
    store: CacheStore,
    force: bool,
}

impl ChangeCache {
    pub fn new(store: CacheStore, force: bool) -> Self {
        Self { store, force }
    }

    /// Fingerprint `path` and compare with the stored value. Does not touch
    /// the store.
    pub fn check(&self, path: &Path) -> io::Result<Freshness> {
        let fingerprint = hash_file(path)?;
        if !self.force && self.store.get(path) == Some(fingerprint.as_str()) {
            return Ok(Freshness::Unchanged);
        }
        Ok(Freshness::Changed { fingerprint })
    }

    /// Commit a fingerprint for `path`.
    pub fn record(&mut self, path: &Path, fingerprint: String) {
        self.store.insert(path, fingerprint);
    }

    /// Check and record in one step: returns `true` when `path` matches its
    /// stored fingerprint, and stores the fresh fingerprint otherwise.
    pub fn is_unchanged(&mut self, path: &Path) -> io::Result<bool> {
        match self.check(path)? {
            Freshness::Unchanged => Ok(true),
            Freshness::Changed { fingerprint } => {
                self.record(path, fingerprint);
                Ok(false)
            }
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn into_store(self) -> CacheStore {
        self.store
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}
