//! # mathmirror
//!
//! Incrementally mirrors a static site tree, pre-rendering TeX math embedded
//! in HTML pages so the published site needs no client-side math renderer.
//!
//! # Architecture
//!
//! ```text
//! public/  ──walk──▶  change cache  ──changed──▶  HTML?  ──yes──▶  transform  ──▶  rendered-public/
//!                          │                        │                  │
//!                          └──unchanged: SKIP       └──no: byte copy   └──typesetter (TeX → MathML)
//! ```
//!
//! A run walks the source tree once, in order. Every file is fingerprinted;
//! files that match the fingerprint stored by the previous run are skipped.
//! Changed HTML files are parsed, math in the body is replaced with rendered
//! markup, and the page is re-serialized. Pages without math are copied
//! byte-for-byte so untouched files keep their exact formatting.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Walks the source tree, consults the cache, dispatches entries, counts outcomes |
//! | [`cache`] | SHA-256 content fingerprints persisted between runs |
//! | [`mirror`] | Source → destination path mapping and directory creation |
//! | [`transform`] | One HTML file: parse, substitute, inject stylesheet, serialize or copy |
//! | [`substitute`] | Tree walk that swaps math for rendered nodes, skipping code regions |
//! | [`notation`] | Linear scanner for `$$…$$` and `$…$` spans |
//! | [`typeset`] | [`Typesetter`](typeset::Typesetter) trait and the MathML implementation |
//! | [`config`] | Optional `render.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Whole-file granularity
//!
//! The cache decides per file. A changed page is rendered in full; there is
//! no attempt to reuse rendered fragments from a previous run.
//!
//! ## Explicit state
//!
//! The cache, the counters, the settings, and the typesetter are plain values
//! handed to [`pipeline::run`]. Nothing lives in globals, so tests can run
//! several pipelines side by side with a mock typesetter.
//!
//! ## MathML output
//!
//! Every current browser renders MathML natively. The injected stylesheet is
//! a handful of layout rules; pages ship no fonts and no JavaScript.

pub mod cache;
pub mod config;
pub mod mirror;
pub mod notation;
pub mod output;
pub mod pipeline;
pub mod substitute;
pub mod transform;
pub mod typeset;

#[cfg(test)]
pub(crate) mod test_helpers;
