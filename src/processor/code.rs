use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::models::CodeBlock;

static CODE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("code, pre").unwrap());

const DEFAULT_LANGUAGE: &str = "text";

/// Collect `<code>` and `<pre>` fragments in document order.
///
/// The language tag is the element's first class token when present,
/// `"text"` otherwise. A page without code yields an empty list; there is
/// no failure path.
pub fn extract(markup: &str) -> Vec<CodeBlock> {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(markup);
    document
        .select(&CODE_SEL)
        .map(|element| {
            let language = element
                .value()
                .attr("class")
                .and_then(|classes| classes.split_whitespace().next())
                .unwrap_or(DEFAULT_LANGUAGE)
                .to_string();
            CodeBlock {
                language,
                content: element.text().collect::<String>().trim().to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_yields_empty_list() {
        assert!(extract("").is_empty());
        assert!(extract("<p>prose only</p>").is_empty());
    }

    #[test]
    fn class_token_becomes_language() {
        let blocks = extract(r#"<code class="rust highlight">let x = 1;</code>"#);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "rust");
        assert_eq!(blocks[0].content, "let x = 1;");
    }

    #[test]
    fn missing_class_defaults_to_text() {
        let blocks = extract("<code>print()</code>");
        assert_eq!(blocks[0].language, "text");
    }

    #[test]
    fn empty_class_defaults_to_text() {
        let blocks = extract(r#"<code class="">print()</code>"#);
        assert_eq!(blocks[0].language, "text");
    }

    #[test]
    fn nested_pre_code_yields_both_elements() {
        let blocks = extract(r#"<pre><code class="python">x = 1</code></pre>"#);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "text"); // the pre itself
        assert_eq!(blocks[1].language, "python");
        assert!(blocks.iter().all(|b| b.content == "x = 1"));
    }

    #[test]
    fn inner_newlines_survive() {
        let blocks = extract("<pre>line one\nline two</pre>");
        assert_eq!(blocks[0].content, "line one\nline two");
    }
}
