//! File export: JSONL/JSON for processed output, CSV for raw page dumps,
//! and a standalone HTML rendering of a single processed document.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{ProcessedDocument, RawPage};

/// One processed document per line.
pub fn write_jsonl(path: &Path, documents: &[ProcessedDocument]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for document in documents {
        serde_json::to_writer(&mut out, document)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Read a JSONL file written by [`write_jsonl`]. Blank lines are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<ProcessedDocument>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut documents = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str(&line)?);
    }
    Ok(documents)
}

/// Pretty-printed JSON of any serializable report or document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Raw page dump as CSV: id, title, content, url, version, last_modified.
pub fn write_raw_csv(path: &Path, pages: &[RawPage]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "id,title,content,url,version,last_modified")?;
    for page in pages {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            csv_field(&page.id),
            csv_field(&page.title),
            csv_field(&page.content),
            csv_field(&page.url),
            page.version,
            csv_field(&page.last_modified),
        )?;
    }
    out.flush()?;
    Ok(())
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

pub fn write_html(path: &Path, document: &ProcessedDocument) -> Result<()> {
    std::fs::write(path, render_html(document))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Standalone HTML page: metadata header, content, then tables, code
/// blocks, and comments when present.
pub fn render_html(document: &ProcessedDocument) -> String {
    let meta = &document.metadata;
    let title = if meta.title.is_empty() {
        "Untitled"
    } else {
        meta.title.as_str()
    };

    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>{title}</title>
<style>
  body {{ font-family: Arial, sans-serif; line-height: 1.6; margin: 2rem; }}
  .metadata {{ background: #f5f5f5; padding: 1rem; margin-bottom: 1rem; }}
  table {{ border-collapse: collapse; width: 100%; }}
  th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
  .code-block {{ background: #f8f8f8; padding: 1rem; margin: 1rem 0; }}
  .comment {{ margin: 1rem 0; padding: 1rem; background: #f9f9f9; }}
</style>
</head>
<body>
<div class="metadata">
<h1>{title}</h1>
<p>Last modified: {modified}</p>
<p>URL: <a href="{url}">{url}</a></p>
</div>
<div class="content">{content}</div>
"#,
        title = escape(title),
        modified = escape(&meta.last_modified),
        url = escape(&meta.url),
        content = escape(&document.content),
    );

    if !document.tables.is_empty() {
        html.push_str("<div class=\"tables\"><h2>Tables</h2>\n");
        for table in &document.tables {
            html.push_str("<table><thead><tr>");
            for header in &table.headers {
                html.push_str(&format!("<th>{}</th>", escape(header)));
            }
            html.push_str("</tr></thead><tbody>");
            for row in &table.data {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str(&format!("<td>{}</td>", escape(cell)));
                }
                html.push_str("</tr>");
            }
            html.push_str("</tbody></table>\n");
        }
        html.push_str("</div>\n");
    }

    if !document.code_blocks.is_empty() {
        html.push_str("<div class=\"code-blocks\"><h2>Code Blocks</h2>\n");
        for block in &document.code_blocks {
            html.push_str(&format!(
                "<div class=\"code-block\"><code class=\"language-{}\">{}</code></div>\n",
                escape(&block.language),
                escape(&block.content)
            ));
        }
        html.push_str("</div>\n");
    }

    if !document.comments.is_empty() {
        html.push_str("<div class=\"comments\"><h2>Comments</h2>\n");
        for comment in &document.comments {
            html.push_str(&format!(
                "<div class=\"comment\"><p><strong>{}</strong> - {}</p><p>{}</p></div>\n",
                escape(&comment.author),
                escape(&comment.created),
                escape(&comment.content)
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CodeBlock, Comment, Metadata, Table};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("confluence_rag_{}_{}", std::process::id(), name))
    }

    fn sample_document() -> ProcessedDocument {
        ProcessedDocument {
            content: "Hello world".into(),
            metadata: Metadata {
                id: "1".into(),
                title: "Sample".into(),
                url: "http://wiki/1".into(),
                version: 2,
                last_modified: "2024-01-01T00:00:00".into(),
                source: "confluence".into(),
                processed_at: "2024-05-05T00:00:00Z".into(),
            },
            tables: vec![Table {
                headers: vec!["A".into()],
                data: vec![vec!["1".into()]],
                shape: (1, 1),
            }],
            code_blocks: vec![CodeBlock {
                language: "rust".into(),
                content: "let x = 1;".into(),
            }],
            attachments: Vec::new(),
            comments: vec![Comment {
                id: "c1".into(),
                author: "Ada".into(),
                created: "2024-01-02".into(),
                content: "nice".into(),
            }],
        }
    }

    #[test]
    fn jsonl_round_trip() {
        let path = temp_path("roundtrip.jsonl");
        let docs = vec![sample_document(), ProcessedDocument::default()];
        write_jsonl(&path, &docs).unwrap();
        let loaded = read_jsonl(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "Hello world");
        assert_eq!(loaded[0].tables[0].shape, (1, 1));
        assert_eq!(loaded[1].content, "");
    }

    #[test]
    fn csv_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn html_render_includes_all_sections() {
        let html = render_html(&sample_document());
        assert!(html.contains("<title>Sample</title>"));
        assert!(html.contains("Hello world"));
        assert!(html.contains("<th>A</th>"));
        assert!(html.contains("language-rust"));
        assert!(html.contains("<strong>Ada</strong>"));
    }

    #[test]
    fn html_render_escapes_markup_in_values() {
        let mut doc = sample_document();
        doc.content = "a <script> b".into();
        let html = render_html(&doc);
        assert!(html.contains("a &lt;script&gt; b"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn untitled_fallback() {
        let html = render_html(&ProcessedDocument::default());
        assert!(html.contains("<title>Untitled</title>"));
    }
}
