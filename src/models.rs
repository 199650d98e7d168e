//! Record types flowing through the pipeline: raw API shapes in, processed
//! documents out, corpus-level reports at the end.

use serde::{Deserialize, Serialize};

/// Page as delivered by the Confluence API, before processing.
///
/// Every field defaults so a sparse API payload deserializes instead of
/// erroring; the processor owns turning absence into typed empties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
    #[serde(default)]
    pub comments: Vec<RawComment>,
}

/// Attachment record from the child-content endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAttachment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub url: String,
}

/// Comment record from the child-content endpoint. `content` is raw markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub content: String,
}

/// One fully processed page. Every field is present with a typed default
/// even when its extractor failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub content: String,
    pub metadata: Metadata,
    pub tables: Vec<Table>,
    pub code_blocks: Vec<CodeBlock>,
    pub attachments: Vec<Attachment>,
    pub comments: Vec<Comment>,
}

/// Canonical page identity. `processed_at` is stamped at processing time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub processed_at: String,
}

impl Metadata {
    /// A defaulted record (failed extractor) carries no identity at all.
    pub fn is_populated(&self) -> bool {
        !(self.id.is_empty()
            && self.title.is_empty()
            && self.url.is_empty()
            && self.version == 0
            && self.last_modified.is_empty())
    }
}

/// Structured table: header row + row-major cells + (rows, cols).
/// Rows may be ragged when the source markup was.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
    pub shape: (usize, usize),
}

/// Labeled code fragment. `language` falls back to `"text"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub content: String,
}

/// Normalized attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub size: i64,
    pub media_type: String,
}

/// Normalized comment; `content` has been through the HTML normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub created: String,
    pub content: String,
}

/// Aggregate counts over a processed corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub total_pages: usize,
    pub total_words: usize,
    pub total_tables: usize,
    pub total_code_blocks: usize,
    pub total_comments: usize,
    pub averages: SummaryAverages,
    pub date_range: Option<DateRange>,
    pub generated_at: String,
}

/// Per-page averages, rounded to two decimals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryAverages {
    pub words_per_page: f64,
    pub tables_per_page: f64,
    pub code_blocks_per_page: f64,
    pub comments_per_page: f64,
}

/// Oldest/newest `last_modified` among pages with a parseable date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub oldest_page: String,
    pub newest_page: String,
}

/// Quality report: per-page score arrays, corpus means and ranges, and the
/// overall score (mean of the four means).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityReport {
    pub scores: QualityScores,
    pub averages: QualityAverages,
    pub ranges: QualityRanges,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityScores {
    pub readability: Vec<f64>,
    pub content_completeness: Vec<f64>,
    pub metadata_completeness: Vec<f64>,
    pub formatting_quality: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityAverages {
    pub readability: f64,
    pub content_completeness: f64,
    pub metadata_completeness: f64,
    pub formatting_quality: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityRanges {
    pub readability: (f64, f64),
    pub content_completeness: (f64, f64),
    pub metadata_completeness: (f64, f64),
    pub formatting_quality: (f64, f64),
}
