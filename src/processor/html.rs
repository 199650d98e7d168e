use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

// Secondary pass: anything that still looks like a tag after parsing is
// malformed or double-encoded markup and gets dropped.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Subtrees that contribute no prose: script/style are removed outright,
/// table/pre/code bodies belong to the dedicated extractors.
const SKIPPED: &[&str] = &["script", "style", "table", "pre", "code"];

/// Strip markup down to clean prose text.
///
/// Never fails: empty or unparseable input degrades to an empty string, and
/// plain text passes through unchanged (the operation is idempotent).
pub fn normalize(markup: &str) -> String {
    if markup.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(markup);
    let mut parts: Vec<String> = Vec::new();
    collect_text(document.root_element(), &mut parts);

    let text = parts.join(" ");
    let text = TAG_RE.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef, parts: &mut Vec<String>) {
    if SKIPPED.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, parts);
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_elements_join_with_single_spaces() {
        let out = normalize("<p>Test content</p><div>More content</div>");
        assert_eq!(out, "Test content More content");
    }

    #[test]
    fn script_and_style_are_removed_entirely() {
        let out = normalize(
            "<p>Keep</p><script>var x = 1;</script><style>p { color: red; }</style><p>this</p>",
        );
        assert_eq!(out, "Keep this");
    }

    #[test]
    fn table_and_code_bodies_are_left_to_their_extractors() {
        let out = normalize(
            "<p>Hello</p><table><tr><th>A</th></tr><tr><td>1</td></tr></table><pre>let x = 1;</pre>",
        );
        assert_eq!(out, "Hello");
    }

    #[test]
    fn escaped_tags_do_not_survive_the_second_pass() {
        let out = normalize("<p>before &lt;script&gt;alert(1)&lt;/script&gt; after</p>");
        assert_eq!(out, "before alert(1) after");
    }

    #[test]
    fn whitespace_runs_collapse() {
        let out = normalize("<p>  a \n\n b\t\tc  </p>");
        assert_eq!(out, "a b c");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n  "), "");
    }

    #[test]
    fn idempotent_on_plain_text() {
        let plain = "Already normalized text with no markup.";
        let once = normalize(plain);
        assert_eq!(once, plain);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(normalize("<p>a &amp; b</p>"), "a & b");
    }
}
