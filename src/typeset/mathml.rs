//! TeX → MathML typesetter.
//!
//! MathML is rendered natively by every current browser, so pages need no
//! JavaScript and no web fonts: the stylesheet only has to lay out display
//! blocks.

use super::backend::{TypesetError, Typesetter};
use latex2mathml::{DisplayStyle, latex_to_mathml};

/// Layout rules for rendered MathML.
const MATHML_STYLESHEET: &str = "\
math[display=\"block\"] {
    display: block;
    margin: 1em 0;
    text-align: center;
    overflow-x: auto;
    overflow-y: hidden;
}
math {
    font-family: \"Latin Modern Math\", \"STIX Two Math\", math;
}";

/// Production typesetter backed by `latex2mathml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathMlTypesetter;

impl MathMlTypesetter {
    pub fn new() -> Self {
        Self
    }
}

impl Typesetter for MathMlTypesetter {
    fn render(&self, notation: &str, display: bool) -> Result<String, TypesetError> {
        let style = if display {
            DisplayStyle::Block
        } else {
            DisplayStyle::Inline
        };
        latex_to_mathml(notation.trim(), style).map_err(|e| TypesetError::InvalidNotation {
            notation: notation.to_string(),
            reason: e.to_string(),
        })
    }

    fn stylesheet(&self) -> &str {
        MATHML_STYLESHEET
    }
}
