//! Page processing: fan one raw page out to the extractors, merge the
//! results with per-stage failure isolation, return one canonical document.

pub mod code;
pub mod html;
pub mod meta;
pub mod notes;
pub mod tables;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::models::{ProcessedDocument, RawPage};

/// Orchestrates the six extraction stages for a single page.
///
/// Stages share no mutable state and run as independent blocking tasks
/// joined under a barrier; there is no completion order. A stage that
/// panics or exceeds the timeout resolves to its typed empty default and a
/// warn log, so one bad extractor never sinks the document. The processor
/// itself holds no per-page state and is safe to share across tasks.
pub struct PageProcessor {
    metrics: Option<Arc<Metrics>>,
    stage_timeout: Duration,
}

impl PageProcessor {
    pub fn new(stage_timeout: Duration) -> Self {
        PageProcessor {
            metrics: None,
            stage_timeout,
        }
    }

    /// Attach a metrics collaborator. Without one, every metrics call site
    /// is a no-op.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process one page into exactly one document.
    ///
    /// The only error out of here is assembly-level (the join barrier
    /// itself broke, e.g. runtime teardown cancelled a stage); individual
    /// extractor failures are recovered locally.
    pub async fn process_page(&self, page: RawPage) -> Result<ProcessedDocument> {
        let started = Instant::now();
        let page_id = if page.id.is_empty() {
            "unknown".to_string()
        } else {
            page.id.clone()
        };
        let page = Arc::new(page);

        let text_stage = self.stage(&page_id, "text", String::new(), {
            let p = Arc::clone(&page);
            move || html::normalize(&p.content)
        });
        let tables_stage = self.stage(&page_id, "tables", Vec::new(), {
            let p = Arc::clone(&page);
            let id = page_id.clone();
            move || tables::extract(&id, &p.content)
        });
        let code_stage = self.stage(&page_id, "code", Vec::new(), {
            let p = Arc::clone(&page);
            move || code::extract(&p.content)
        });
        let metadata_stage = self.stage(&page_id, "metadata", Default::default(), {
            let p = Arc::clone(&page);
            move || meta::extract(&p)
        });
        let attachments_stage = self.stage(&page_id, "attachments", Vec::new(), {
            let p = Arc::clone(&page);
            move || notes::normalize_attachments(&p.attachments)
        });
        let comments_stage = self.stage(&page_id, "comments", Vec::new(), {
            let p = Arc::clone(&page);
            move || notes::normalize_comments(&p.comments)
        });

        let (content, tables, code_blocks, metadata, attachments, comments) = tokio::join!(
            text_stage,
            tables_stage,
            code_stage,
            metadata_stage,
            attachments_stage,
            comments_stage,
        );

        let document = ProcessedDocument {
            content: content?,
            metadata: metadata?,
            tables: tables?,
            code_blocks: code_blocks?,
            attachments: attachments?,
            comments: comments?,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_duration("page", started.elapsed().as_secs_f64());
        }

        Ok(document)
    }

    /// Run one extractor on the blocking pool under the stage timeout.
    async fn stage<T, F>(&self, page_id: &str, name: &'static str, default: T, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.stage_timeout, handle).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) if join_error.is_panic() => {
                warn!("Stage {} failed for page {}: {}", name, page_id, join_error);
                if let Some(metrics) = &self.metrics {
                    metrics.record_error("extractor_failure");
                }
                Ok(default)
            }
            Ok(Err(join_error)) => Err(Error::Processing {
                page_id: page_id.to_string(),
                message: format!("{} stage cancelled before assembly: {}", name, join_error),
            }),
            Err(_) => {
                warn!(
                    "Stage {} timed out for page {} after {:?}",
                    name, page_id, self.stage_timeout
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_error("extractor_timeout");
                }
                Ok(default)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> PageProcessor {
        PageProcessor::new(Duration::from_secs(5))
    }

    fn sample_page() -> RawPage {
        RawPage {
            id: "1".into(),
            title: "T".into(),
            content: "<p>Hello</p><table><tr><th>A</th></tr><tr><td>1</td></tr></table>".into(),
            url: "u".into(),
            version: 1,
            last_modified: "2024-01-01T00:00:00".into(),
            ..RawPage::default()
        }
    }

    #[tokio::test]
    async fn end_to_end_single_page() {
        let doc = processor().process_page(sample_page()).await.unwrap();
        assert_eq!(doc.content, "Hello");
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].headers, vec!["A"]);
        assert_eq!(doc.tables[0].data, vec![vec!["1"]]);
        assert_eq!(doc.metadata.source, "confluence");
        assert_eq!(doc.metadata.id, "1");
        assert!(doc.code_blocks.is_empty());
        assert!(doc.attachments.is_empty());
        assert!(doc.comments.is_empty());
    }

    #[tokio::test]
    async fn empty_page_yields_typed_defaults() {
        let doc = processor().process_page(RawPage::default()).await.unwrap();
        assert_eq!(doc.content, "");
        assert!(doc.tables.is_empty());
        assert!(doc.code_blocks.is_empty());
        assert!(doc.attachments.is_empty());
        assert!(doc.comments.is_empty());
        // metadata extraction still ran: source tag and timestamp present
        assert_eq!(doc.metadata.source, "confluence");
        assert!(!doc.metadata.processed_at.is_empty());
    }

    #[tokio::test]
    async fn panicked_stage_resolves_to_its_default() {
        let value = processor()
            .stage("1", "tables", Vec::new(), || -> Vec<i32> { panic!("boom") })
            .await
            .unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn timed_out_stage_resolves_to_its_default() {
        let slow = PageProcessor::new(Duration::from_millis(20));
        let value = slow
            .stage("1", "text", String::from("fallback"), || {
                std::thread::sleep(Duration::from_millis(500));
                String::from("too late")
            })
            .await
            .unwrap();
        assert_eq!(value, "fallback");
    }

    #[tokio::test]
    async fn duration_is_recorded_when_metrics_attached() {
        let metrics = Arc::new(Metrics::new());
        let processor = processor().with_metrics(Arc::clone(&metrics));
        processor.process_page(sample_page()).await.unwrap();
        let lines = metrics.snapshot();
        assert!(lines.iter().any(|l| l.starts_with("page: 1 observations")));
    }

    #[tokio::test]
    async fn fixture_page_processes_cleanly() {
        let markup = std::fs::read_to_string("tests/fixtures/payments_runbook.html").unwrap();
        let page = RawPage {
            id: "9001".into(),
            title: "Payments Service Runbook".into(),
            content: markup,
            url: "https://wiki/pages/9001".into(),
            version: 12,
            last_modified: "2024-04-01T09:30:00".into(),
            ..RawPage::default()
        };
        let doc = processor().process_page(page).await.unwrap();

        assert!(doc.content.starts_with("Payments Service Runbook"));
        assert!(doc.content.contains("rollback procedure"));
        // script/style bodies and structured content stay out of the prose
        assert!(!doc.content.contains("console.log"));
        assert!(!doc.content.contains("/api/v1/charge"));
        assert!(!doc.content.contains("helm rollback"));

        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].headers, vec!["Route", "Method", "Auth"]);
        assert_eq!(doc.tables[0].shape, (2, 3));

        // the pre and its nested code both match
        assert_eq!(doc.code_blocks.len(), 2);
        assert_eq!(doc.code_blocks[1].language, "bash");
        assert_eq!(doc.code_blocks[1].content, "helm rollback payments 42");
    }

    #[tokio::test]
    async fn comments_pass_through_the_text_normalizer() {
        let mut page = sample_page();
        page.comments = vec![crate::models::RawComment {
            id: "c1".into(),
            author: "Ada".into(),
            created: "2024-01-02T00:00:00".into(),
            content: "<p>nice <em>page</em></p>".into(),
        }];
        let doc = processor().process_page(page).await.unwrap();
        assert_eq!(doc.comments[0].content, "nice page");
    }
}
