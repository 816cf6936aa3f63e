//! Math substitution over a parsed document tree.
//!
//! [`substitute`] walks the subtree under a node depth-first and replaces
//! every math occurrence with markup from the [`Typesetter`]. Three kinds of
//! node matter:
//!
//! 1. **Opaque containers** (`script`, `code`, `pre`, ... per
//!    [`MathConfig::opaque_tags`]) are never entered, however deeply they are
//!    nested. Math-looking text in code samples stays literal.
//! 2. **Math blocks**: elements carrying [`MathConfig::block_class`]. Their
//!    whole text content is one display expression; the element is replaced
//!    by the rendered nodes and its inside is never scanned for delimiters.
//! 3. **Text nodes** anywhere else are scanned with [`notation::scan`]. If at
//!    least one span renders, the text node is replaced by the nodes of the
//!    re-parsed fragment (plain text escaped, math markup as-is).
//!
//! Nodes without a successful render are left exactly as they were.
//!
//! The walk uses an explicit stack of node ids rather than recursion over
//! borrowed children, so a node can be swapped out while its siblings are
//! still pending.

use crate::config::MathConfig;
use crate::notation::{self, Segment};
use crate::typeset::Typesetter;
use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node};

/// What a substitution pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    /// Expressions rendered and spliced in.
    pub rendered: usize,
    /// Expressions the typesetter rejected; left as literal text.
    pub failed: usize,
}

impl Substitution {
    /// Whether the tree was modified.
    pub fn changed(&self) -> bool {
        self.rendered > 0
    }
}

/// What to do with the node at the top of the stack.
enum Visit {
    Skip,
    Descend(Vec<NodeId>),
    Block(String),
    Text(Vec<Segment>),
}

/// Replace all math under `root`.
pub fn substitute(
    document: &mut Html,
    root: NodeId,
    typesetter: &dyn Typesetter,
    rules: &MathConfig,
) -> Substitution {
    let mut report = Substitution::default();
    let mut pending = vec![root];

    while let Some(id) = pending.pop() {
        let visit = match document.tree.get(id) {
            Some(node) => classify(node, rules),
            None => continue,
        };
        match visit {
            Visit::Skip => {}
            Visit::Descend(children) => pending.extend(children.into_iter().rev()),
            Visit::Block(notation) => match typesetter.render(&notation, true) {
                Ok(markup) => {
                    replace_with_fragment(document, id, &markup);
                    report.rendered += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "leaving math block unrendered");
                    report.failed += 1;
                }
            },
            Visit::Text(segments) => {
                if let Some(markup) = render_segments(segments, typesetter, &mut report) {
                    replace_with_fragment(document, id, &markup);
                }
            }
        }
    }

    report
}

fn classify(node: NodeRef<'_, Node>, rules: &MathConfig) -> Visit {
    match node.value() {
        Node::Element(element) => {
            let name = element.name();
            if rules
                .opaque_tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(name))
            {
                return Visit::Skip;
            }
            if element.classes().any(|class| class == rules.block_class) {
                return Visit::Block(text_content(node).trim().to_string());
            }
            Visit::Descend(node.children().map(|child| child.id()).collect())
        }
        Node::Document | Node::Fragment => {
            Visit::Descend(node.children().map(|child| child.id()).collect())
        }
        Node::Text(text) => {
            let segments = notation::scan(text);
            if segments.iter().any(|s| matches!(s, Segment::Math(_))) {
                Visit::Text(segments)
            } else {
                Visit::Skip
            }
        }
        _ => Visit::Skip,
    }
}

/// Concatenated text of every text node under `node`.
pub(crate) fn text_content(node: NodeRef<'_, Node>) -> String {
    node.descendants()
        .filter_map(|n| n.value().as_text())
        .map(|text| &**text)
        .collect()
}

/// Build the replacement fragment for a text run. `None` when nothing
/// rendered, so the original node stays put.
fn render_segments(
    segments: Vec<Segment>,
    typesetter: &dyn Typesetter,
    report: &mut Substitution,
) -> Option<String> {
    let mut markup = String::new();
    let mut any_rendered = false;

    for segment in segments {
        match segment {
            Segment::Text(text) => escape_text_into(&mut markup, &text),
            Segment::Math(span) => match typesetter.render(&span.notation, span.display) {
                Ok(rendered) => {
                    markup.push_str(&rendered);
                    report.rendered += 1;
                    any_rendered = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "leaving math span unrendered");
                    report.failed += 1;
                    escape_text_into(&mut markup, &span.source());
                }
            },
        }
    }

    any_rendered.then_some(markup)
}

fn escape_text_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

/// Parse `markup` as a body fragment and put its nodes where `target` is.
pub(crate) fn replace_with_fragment(document: &mut Html, target: NodeId, markup: &str) {
    let fragment = Html::parse_fragment(markup);
    for child in fragment.root_element().children() {
        graft_before(&mut document.tree, target, child);
    }
    if let Some(mut node) = document.tree.get_mut(target) {
        node.detach();
    }
}

/// Append the nodes of `markup` as the last children of `parent`.
pub(crate) fn append_fragment(document: &mut Html, parent: NodeId, markup: &str) {
    let fragment = Html::parse_fragment(markup);
    for child in fragment.root_element().children() {
        graft_into(&mut document.tree, parent, child);
    }
}

/// Deep-copy `source` (from another tree) in front of `anchor`.
fn graft_before(tree: &mut Tree<Node>, anchor: NodeId, source: NodeRef<'_, Node>) {
    let Some(mut anchor) = tree.get_mut(anchor) else {
        return;
    };
    let id = anchor.insert_before(source.value().clone()).id();
    graft_children(tree, id, source);
}

/// Deep-copy `source` as the last child of `parent`.
fn graft_into(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) {
    let Some(mut parent) = tree.get_mut(parent) else {
        return;
    };
    let id = parent.append(source.value().clone()).id();
    graft_children(tree, id, source);
}

fn graft_children(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) {
    for child in source.children() {
        graft_into(tree, parent, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeset::backend::tests::MockTypesetter;
    use scraper::Selector;

    fn body_id(document: &Html) -> NodeId {
        let selector = Selector::parse("body").unwrap();
        document.select(&selector).next().unwrap().id()
    }

    /// Parse `body` into a document, substitute, return (report, html).
    fn run(body: &str, mock: &MockTypesetter) -> (Substitution, String) {
        let mut document = Html::parse_document(&format!(
            "<!DOCTYPE html><html><head></head><body>{body}</body></html>"
        ));
        let root = body_id(&document);
        let report = substitute(&mut document, root, mock, &MathConfig::default());
        (report, document.html())
    }

    fn calls(mock: &MockTypesetter) -> Vec<(String, bool)> {
        mock.rendered()
    }

    fn owned(items: &[(&str, bool)]) -> Vec<(String, bool)> {
        items.iter().map(|(n, d)| (n.to_string(), *d)).collect()
    }

    #[test]
    fn inline_math_is_replaced_with_markup() {
        let mock = MockTypesetter::new();
        let (report, html) = run("<p>let $x$ be</p>", &mock);

        assert!(report.changed());
        assert_eq!(report.rendered, 1);
        assert!(html.contains(r#"<p>let <span class="mock-math inline">x</span> be</p>"#));
        assert!(!html.contains("$x$"));
    }

    #[test]
    fn display_resolved_before_inline() {
        let mock = MockTypesetter::new();
        let (report, _) = run("<p>$$a+b$$ and $c$</p>", &mock);

        assert_eq!(report.rendered, 2);
        assert_eq!(calls(&mock), owned(&[("a+b", true), ("c", false)]));
    }

    #[test]
    fn escaped_delimiter_stays_literal() {
        let mock = MockTypesetter::new();
        let (_, html) = run(r"<p>price is \$5 and $x$</p>", &mock);

        assert_eq!(calls(&mock), owned(&[("x", false)]));
        assert!(html.contains(r"price is \$5 and <span"));
    }

    #[test]
    fn opaque_containers_are_never_scanned() {
        let mock = MockTypesetter::new();
        let (report, html) = run(
            r#"<p>$a$</p>
               <pre>$b$</pre>
               <div><span><code>$c$</code></span></div>
               <script>var s = "$d$";</script>"#,
            &mock,
        );

        assert_eq!(report.rendered, 1);
        assert_eq!(calls(&mock), owned(&[("a", false)]));
        assert!(html.contains("<pre>$b$</pre>"));
        assert!(html.contains("<code>$c$</code>"));
        assert!(html.contains(r#"var s = "$d$";"#));
    }

    #[test]
    fn opaque_tag_match_is_case_insensitive() {
        let mock = MockTypesetter::new();
        let rules = MathConfig {
            opaque_tags: vec!["PRE".into()],
            ..MathConfig::default()
        };
        let mut document = Html::parse_document("<body><pre>$b$</pre></body>");
        let root = body_id(&document);

        assert!(!substitute(&mut document, root, &mock, &rules).changed());
        assert!(mock.get_calls().is_empty());
    }

    #[test]
    fn math_block_rendered_whole_and_replaced() {
        let mock = MockTypesetter::new();
        let (report, html) = run(
            "<div class=\"note math-block\">\n  x $y$ <em>z</em>\n</div><p>after</p>",
            &mock,
        );

        assert_eq!(report.rendered, 1);
        assert_eq!(calls(&mock), owned(&[("x $y$ z", true)]));
        assert!(!html.contains("math-block"));
        assert!(html.contains(r#"<span class="mock-math display">x $y$ z</span><p>after</p>"#));
    }

    #[test]
    fn nested_math_found_in_document_order() {
        let mock = MockTypesetter::new();
        run(
            "<ul><li>$a$</li><li><em>$b$</em> and $c$</li></ul><p>$$d$$</p>",
            &mock,
        );

        assert_eq!(
            calls(&mock),
            owned(&[("a", false), ("b", false), ("c", false), ("d", true)])
        );
    }

    #[test]
    fn untouched_document_is_unchanged() {
        let mock = MockTypesetter::new();
        let body = "<p>plain <b>bold</b> costs $5</p>";
        let expected = Html::parse_document(&format!(
            "<!DOCTYPE html><html><head></head><body>{body}</body></html>"
        ))
        .html();
        let (report, html) = run(body, &mock);

        assert!(!report.changed());
        assert_eq!(html, expected);
        assert!(mock.get_calls().is_empty());
    }

    #[test]
    fn surrounding_text_is_reescaped() {
        let mock = MockTypesetter::new();
        let (_, html) = run("<p>a &lt; b &amp; $x$</p>", &mock);
        assert!(html.contains("<p>a &lt; b &amp; <span"));
    }

    #[test]
    fn failed_span_left_literal_others_rendered() {
        let mock = MockTypesetter::failing_on(&["bad"]);
        let (report, html) = run("<p>$bad$ and $good$</p>", &mock);

        assert_eq!(report, Substitution { rendered: 1, failed: 1 });
        assert!(html.contains(r#"<p>$bad$ and <span class="mock-math inline">good</span></p>"#));
    }

    #[test]
    fn only_failures_leave_node_untouched() {
        let mock = MockTypesetter::failing_on(&["bad"]);
        let (report, html) = run("<p>$bad$</p><div class=\"math-block\">bad</div>", &mock);

        assert_eq!(report, Substitution { rendered: 0, failed: 2 });
        assert!(!report.changed());
        assert!(html.contains("<p>$bad$</p>"));
        assert!(html.contains("math-block"));
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let document = Html::parse_fragment("<div>a<b>b</b><i>c<u>d</u></i></div>");
        let div = document
            .select(&Selector::parse("div").unwrap())
            .next()
            .unwrap();
        assert_eq!(text_content(*div), "abcd");
    }

    #[test]
    fn append_fragment_adds_last_children() {
        let mut document = Html::parse_document("<head><title>t</title></head><body></body>");
        let head = document
            .select(&Selector::parse("head").unwrap())
            .next()
            .unwrap()
            .id();
        append_fragment(&mut document, head, "<style id=\"s\">p{}</style>");

        assert!(document.html().contains("<title>t</title><style id=\"s\">p{}</style></head>"));
    }
}
