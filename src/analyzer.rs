//! Corpus analytics over processed documents: aggregate counts and a
//! four-part content-quality score.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rayon::prelude::*;
use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{
    CorpusSummary, DateRange, ProcessedDocument, QualityAverages, QualityRanges, QualityReport,
    QualityScores, SummaryAverages,
};

static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

// Simplified Flesch Reading Ease constants.
const FLESCH_BASE: f64 = 206.835;
const FLESCH_SENTENCE_WEIGHT: f64 = 1.015;

const CONTENT_FIELDS: usize = 5;
const METADATA_FIELDS: usize = 5;
const FORMATTING_INDICATORS: [&str; 5] = ["<h1>", "<h2>", "<p>", "<table>", "<code>"];

/// Aggregate counts, per-page averages, and the modification-date range.
///
/// An empty corpus is a valid input and yields a zeroed summary with no
/// date range. Unparseable `last_modified` values are excluded from the
/// range, not errors.
pub fn summarize(documents: &[ProcessedDocument]) -> Result<CorpusSummary> {
    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let total_pages = documents.len();
    if total_pages == 0 {
        return Ok(CorpusSummary {
            generated_at,
            ..CorpusSummary::default()
        });
    }

    let total_words: usize = documents.iter().map(|d| word_count(&d.content)).sum();
    let total_tables: usize = documents.iter().map(|d| d.tables.len()).sum();
    let total_code_blocks: usize = documents.iter().map(|d| d.code_blocks.len()).sum();
    let total_comments: usize = documents.iter().map(|d| d.comments.len()).sum();

    let pages = total_pages as f64;
    let averages = SummaryAverages {
        words_per_page: round2(total_words as f64 / pages),
        tables_per_page: round2(total_tables as f64 / pages),
        code_blocks_per_page: round2(total_code_blocks as f64 / pages),
        comments_per_page: round2(total_comments as f64 / pages),
    };

    let mut dates: Vec<DateTime<Utc>> = documents
        .iter()
        .filter_map(|d| parse_timestamp(&d.metadata.last_modified))
        .collect();
    dates.sort();
    let date_range = match (dates.first(), dates.last()) {
        (Some(oldest), Some(newest)) => Some(DateRange {
            oldest_page: oldest.to_rfc3339_opts(SecondsFormat::Secs, true),
            newest_page: newest.to_rfc3339_opts(SecondsFormat::Secs, true),
        }),
        _ => None,
    };

    Ok(CorpusSummary {
        total_pages,
        total_words,
        total_tables,
        total_code_blocks,
        total_comments,
        averages,
        date_range,
        generated_at,
    })
}

/// Score every document on readability, content completeness, metadata
/// completeness, and formatting quality, then aggregate.
///
/// An empty corpus yields an all-zero report rather than an error.
pub fn analyze_quality(documents: &[ProcessedDocument]) -> Result<QualityReport> {
    if documents.is_empty() {
        return Ok(QualityReport::default());
    }

    let per_page: Vec<PageScores> = documents.par_iter().map(score_page).collect();

    let scores = QualityScores {
        readability: per_page.iter().map(|s| s.readability).collect(),
        content_completeness: per_page.iter().map(|s| s.content_completeness).collect(),
        metadata_completeness: per_page.iter().map(|s| s.metadata_completeness).collect(),
        formatting_quality: per_page.iter().map(|s| s.formatting_quality).collect(),
    };

    let averages = QualityAverages {
        readability: mean(&scores.readability),
        content_completeness: mean(&scores.content_completeness),
        metadata_completeness: mean(&scores.metadata_completeness),
        formatting_quality: mean(&scores.formatting_quality),
    };

    let ranges = QualityRanges {
        readability: range(&scores.readability, documents.len())?,
        content_completeness: range(&scores.content_completeness, documents.len())?,
        metadata_completeness: range(&scores.metadata_completeness, documents.len())?,
        formatting_quality: range(&scores.formatting_quality, documents.len())?,
    };

    let quality_score = mean(&[
        averages.readability,
        averages.content_completeness,
        averages.metadata_completeness,
        averages.formatting_quality,
    ]);

    Ok(QualityReport {
        scores,
        averages,
        ranges,
        quality_score,
    })
}

struct PageScores {
    readability: f64,
    content_completeness: f64,
    metadata_completeness: f64,
    formatting_quality: f64,
}

fn score_page(document: &ProcessedDocument) -> PageScores {
    let content = &document.content;

    let words = word_count(content);
    let sentences = SENTENCE_RE
        .split(content)
        .filter(|s| !s.trim().is_empty())
        .count();
    let words_per_sentence = words as f64 / sentences.max(1) as f64;
    let readability =
        (FLESCH_BASE - FLESCH_SENTENCE_WEIGHT * words_per_sentence).clamp(0.0, 100.0);

    let present = [
        !content.is_empty(),
        document.metadata.is_populated(),
        !document.tables.is_empty(),
        !document.code_blocks.is_empty(),
        !document.comments.is_empty(),
    ]
    .iter()
    .filter(|&&p| p)
    .count();
    let content_completeness = present as f64 / CONTENT_FIELDS as f64 * 100.0;

    let meta = &document.metadata;
    let meta_present = [
        !meta.id.is_empty(),
        !meta.title.is_empty(),
        !meta.url.is_empty(),
        meta.version != 0,
        !meta.last_modified.is_empty(),
    ]
    .iter()
    .filter(|&&p| p)
    .count();
    let metadata_completeness = meta_present as f64 / METADATA_FIELDS as f64 * 100.0;

    // Checks the normalized content for literal markup tags. Normalization
    // already stripped them, so well-formed pages score near zero here;
    // kept as documented behavior.
    let indicators = FORMATTING_INDICATORS
        .iter()
        .filter(|tag| content.contains(*tag))
        .count();
    let formatting_quality = indicators as f64 / FORMATTING_INDICATORS.len() as f64 * 100.0;

    PageScores {
        readability,
        content_completeness,
        metadata_completeness,
        formatting_quality,
    }
}

fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn range(values: &[f64], pages: usize) -> Result<(f64, f64)> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() {
        Ok((min, max))
    } else {
        Err(Error::Analysis {
            pages,
            message: "score range undefined for non-empty corpus".to_string(),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lenient timestamp parse: RFC 3339, then naive datetime, then bare date.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}
