//! Delimiter scanning for TeX-style math embedded in prose.
//!
//! Two span forms are recognised inside a run of text:
//!
//! - **Display**: `$$ ... $$`. The closing `$$` is the nearest one, so two
//!   display spans in the same run are matched independently. Line breaks
//!   inside are allowed.
//! - **Inline**: `$ ... $` with at least one character between the
//!   delimiters.
//!
//! A `$` directly preceded by a backslash never opens a span; the escaped
//! text is left exactly as written (`\$5` stays `\$5`).
//!
//! Display spans are resolved over the whole run first, and only the text
//! between them is scanned for inline spans, so `$$a$$` can never be read as
//! two adjacent inline spans.
//!
//! The scanner is a linear walk over the bytes of the run. Both delimiters
//! and the escape marker are ASCII, so every index it slices at is a char
//! boundary.

/// One piece of a scanned text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text, exactly as it appeared.
    Text(String),
    /// A math span, delimiters stripped.
    Math(MathSpan),
}

/// A located math expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    /// Notation between the delimiters.
    pub notation: String,
    /// Block (`$$`) or inline (`$`) form.
    pub display: bool,
}

impl MathSpan {
    /// The span as it was written, delimiters included.
    pub fn source(&self) -> String {
        let delimiter = if self.display { "$$" } else { "$" };
        format!("{delimiter}{}{delimiter}", self.notation)
    }
}

/// Split `text` into plain and math segments.
///
/// Adjacent plain text is merged, and the result is a single
/// `Segment::Text` when the run contains no math.
pub fn scan(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    for piece in split_display(text) {
        match piece {
            Segment::Text(t) => split_inline(&t, &mut plain, &mut segments),
            math => {
                flush(&mut plain, &mut segments);
                segments.push(math);
            }
        }
    }
    flush(&mut plain, &mut segments);
    segments
}

fn flush(plain: &mut String, segments: &mut Vec<Segment>) {
    if !plain.is_empty() {
        segments.push(Segment::Text(std::mem::take(plain)));
    }
}

fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    pos > 0 && bytes[pos - 1] == b'\\'
}

/// First pass: carve out `$$ ... $$` spans.
fn split_display(text: &str) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'$' && !is_escaped(bytes, i) {
            // Closing pair must leave at least one character inside
            let body = i + 2;
            let first = text[body..].chars().next().map_or(1, char::len_utf8);
            if let Some(offset) = text.get(body + first..).and_then(|rest| rest.find("$$")) {
                let close = body + first + offset;
                if start < i {
                    pieces.push(Segment::Text(text[start..i].to_string()));
                }
                pieces.push(Segment::Math(MathSpan {
                    notation: text[body..close].to_string(),
                    display: true,
                }));
                i = close + 2;
                start = i;
                continue;
            }
        }
        i += 1;
    }
    if start < bytes.len() {
        pieces.push(Segment::Text(text[start..].to_string()));
    }
    pieces
}

/// Second pass: carve `$ ... $` spans out of text between display spans.
fn split_inline(text: &str, plain: &mut String, segments: &mut Vec<Segment>) {
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && !is_escaped(bytes, i) {
            let body = i + 1;
            match text[body..].find('$') {
                Some(offset) if offset > 0 => {
                    let close = body + offset;
                    plain.push_str(&text[start..i]);
                    flush(plain, segments);
                    segments.push(Segment::Math(MathSpan {
                        notation: text[body..close].to_string(),
                        display: false,
                    }));
                    i = close + 1;
                    start = i;
                    continue;
                }
                // No closing delimiter anywhere: nothing further can match
                None => break,
                // `$$` left over from the display pass; the first `$` is literal
                Some(_) => {}
            }
        }
        i += 1;
    }
    plain.push_str(&text[start..]);
}
