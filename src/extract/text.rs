use scraper::node::Node;
use scraper::{ElementRef, Selector};

/// Elements that start a new line in rendered text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "figcaption", "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main",
    "ol", "p", "pre", "section", "summary", "table", "td", "th", "tr", "ul",
];

/// Collapses whitespace the way rendered article text reads
///
/// Runs of spaces/tabs become one space, runs of newlines (including lines
/// that only hold whitespace) become one newline, and the result is trimmed.
///
/// # Examples
///
/// ```
/// use news_harvester::extract::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("Hello\n\n\n   World  \t\n"), "Hello\nWorld");
/// ```
pub fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collects the normalized text under `root`, skipping denylisted subtrees
///
/// The document itself is never modified; skipped subtrees are simply not
/// visited.
pub(crate) fn clean_text(root: ElementRef<'_>, denylist: &[Selector]) -> String {
    let mut raw = String::new();
    collect_text(root, denylist, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, denylist: &[Selector], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                if denylist.iter().any(|selector| selector.matches(&child_ref)) {
                    continue;
                }

                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_text(child_ref, denylist, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
