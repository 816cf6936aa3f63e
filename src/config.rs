//! Render configuration.
//!
//! Handles loading, validating, and merging the optional `render.toml`
//! settings file. Every key has a stock default, so the file only needs the
//! values it wants to override.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! cache_file = ".render-cache.json"   # Written inside the destination root
//! html_extensions = ["html", "htm"]   # Files routed through the math renderer
//! sidecar_suffixes = [".hash"]        # Legacy per-file markers, never mirrored
//!
//! [math]
//! block_class = "math-block"          # Whole-element display math marker
//! opaque_tags = ["script", "style", "code", "pre", "textarea"]
//! stylesheet_id = "math-stylesheet"   # id of the injected <style> element
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings for one `render` run.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// File name of the change cache, relative to the destination root.
    pub cache_file: String,
    /// Extensions (without the dot, case-insensitive) treated as HTML.
    pub html_extensions: Vec<String>,
    /// File-name suffixes of stale sidecar artifacts that are ignored entirely.
    pub sidecar_suffixes: Vec<String>,
    /// Rules for the math substitution engine.
    pub math: MathConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_file: ".render-cache.json".to_string(),
            html_extensions: vec!["html".to_string(), "htm".to_string()],
            sidecar_suffixes: vec![".hash".to_string()],
            math: MathConfig::default(),
        }
    }
}

/// Math detection and injection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MathConfig {
    /// Class marking an element whose whole text is one display expression.
    pub block_class: String,
    /// Elements whose contents are never scanned for math.
    pub opaque_tags: Vec<String>,
    /// `id` of the injected stylesheet, so reruns replace instead of stacking.
    pub stylesheet_id: String,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            block_class: "math-block".to_string(),
            opaque_tags: ["script", "style", "code", "pre", "textarea"]
                .into_iter()
                .map(String::from)
                .collect(),
            stylesheet_id: "math-stylesheet".to_string(),
        }
    }
}

impl RenderConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache_file = Path::new(&self.cache_file);
        if self.cache_file.is_empty()
            || cache_file.components().count() != 1
            || cache_file.file_name().is_none()
        {
            return Err(ConfigError::Validation(
                "cache_file must be a plain file name".into(),
            ));
        }
        if self.html_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "html_extensions must not be empty".into(),
            ));
        }
        if self.sidecar_suffixes.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "sidecar_suffixes entries must not be empty".into(),
            ));
        }
        if !is_token(&self.math.block_class) {
            return Err(ConfigError::Validation(
                "math.block_class must be a single non-empty class name".into(),
            ));
        }
        if !is_token(&self.math.stylesheet_id) {
            return Err(ConfigError::Validation(
                "math.stylesheet_id must be a single non-empty id".into(),
            ));
        }
        Ok(())
    }

    /// Whether `path` should go through the HTML transformer.
    pub fn is_html(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.html_extensions
                    .iter()
                    .any(|html| html.eq_ignore_ascii_case(ext))
            })
    }

    /// Whether `path` is a legacy sidecar marker that must not be mirrored.
    pub fn is_sidecar(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| {
                self.sidecar_suffixes
                    .iter()
                    .any(|suffix| name.ends_with(suffix.as_str()))
            })
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(RenderConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a settings file and merge it over the stock defaults.
///
/// `None` yields the validated defaults.
pub fn load_config(path: Option<&Path>) -> Result<RenderConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            let overlay: toml::Value = toml::from_str(&content)?;
            merge_toml(base, overlay)
        }
        None => base,
    };
    let config: RenderConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}
