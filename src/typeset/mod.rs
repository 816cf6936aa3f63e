//! Math typesetting.
//!
//! The substitution engine never renders notation itself: it hands each
//! expression to a [`Typesetter`] and splices back whatever markup comes out.
//!
//! | Piece | Role |
//! |---|---|
//! | [`Typesetter`] | `render(notation, display)` + the stylesheet rendered pages need |
//! | [`MathMlTypesetter`] | production implementation: TeX → MathML via `latex2mathml` |
//!
//! One typesetter is built in `main` and passed down by reference for the
//! whole run.

pub mod backend;
pub mod mathml;

pub use backend::{TypesetError, Typesetter};
pub use mathml::MathMlTypesetter;
