//! Typesetter trait and shared types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesetError {
    #[error("cannot typeset `{notation}`: {reason}")]
    InvalidNotation { notation: String, reason: String },
}

/// Converts math notation into markup that can be inserted into a page.
pub trait Typesetter {
    /// Render one expression. `display` selects block rather than inline
    /// layout. The returned string is an HTML fragment.
    fn render(&self, notation: &str, display: bool) -> Result<String, TypesetError>;

    /// CSS rules every page containing rendered math must carry.
    fn stylesheet(&self) -> &str;
}
