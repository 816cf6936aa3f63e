//! Single-file HTML transformation.
//!
//! [`transform`] reads one HTML file, substitutes math in its `<body>`, and
//! writes the result. Files without any rendered math are byte-copied
//! instead of re-serialized, so untouched pages keep their exact formatting.
//!
//! Rendered pages get exactly one `<style id="math-stylesheet">` (id from
//! [`MathConfig::stylesheet_id`]) appended to `<head>`. Any element already
//! carrying that id is removed first, so rendering an already-rendered page
//! never stacks stylesheets.

use crate::config::MathConfig;
use crate::substitute::{self, Substitution};
use crate::typeset::Typesetter;
use scraper::{Html, Selector};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));
static HEAD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head").expect("valid selector"));

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to one HTML file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Math was rendered; the re-serialized document was written.
    Rendered(Substitution),
    /// Nothing rendered; the source bytes were copied.
    Copied,
}

/// Transform `source` into `dest`.
///
/// The caller makes sure `dest`'s parent directory exists.
pub fn transform(
    source: &Path,
    dest: &Path,
    typesetter: &dyn Typesetter,
    rules: &MathConfig,
) -> Result<Outcome, TransformError> {
    let bytes = fs::read(source)?;
    let Ok(html) = std::str::from_utf8(&bytes) else {
        tracing::debug!(path = %source.display(), "not UTF-8, copying as-is");
        fs::write(dest, &bytes)?;
        return Ok(Outcome::Copied);
    };

    match render_document(html, typesetter, rules) {
        Some((rendered, substitution)) => {
            fs::write(dest, rendered)?;
            Ok(Outcome::Rendered(substitution))
        }
        None => {
            fs::write(dest, &bytes)?;
            Ok(Outcome::Copied)
        }
    }
}

/// Parse, substitute, and serialize one document.
///
/// Returns `None` when nothing was rendered.
pub fn render_document(
    html: &str,
    typesetter: &dyn Typesetter,
    rules: &MathConfig,
) -> Option<(String, Substitution)> {
    let mut document = Html::parse_document(html);
    if !document.errors.is_empty() {
        tracing::debug!(errors = document.errors.len(), "tolerated HTML parse errors");
    }

    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .map(|body| body.id())
        .unwrap_or_else(|| document.tree.root().id());
    let substitution = substitute::substitute(&mut document, root, typesetter, rules);
    if !substitution.changed() {
        return None;
    }

    inject_stylesheet(&mut document, typesetter.stylesheet(), &rules.stylesheet_id);
    Some((document.html(), substitution))
}

/// Replace any stylesheet with `id` by a fresh one at the end of `<head>`.
fn inject_stylesheet(document: &mut Html, css: &str, id: &str) {
    let stale: Vec<_> = document
        .tree
        .nodes()
        .filter(|node| {
            node.value()
                .as_element()
                .is_some_and(|element| element.id() == Some(id))
        })
        .map(|node| node.id())
        .collect();
    for node_id in stale {
        if let Some(mut node) = document.tree.get_mut(node_id) {
            node.detach();
        }
    }

    // html5ever always synthesizes a <head> for a parsed document
    let Some(head) = document.select(&HEAD_SELECTOR).next().map(|head| head.id()) else {
        return;
    };
    substitute::append_fragment(document, head, &format!("<style id=\"{id}\">{css}</style>"));
}
