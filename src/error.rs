use thiserror::Error;

/// Errors surfaced by the extraction and analytics pipeline.
///
/// Per-stage extractor failures never appear here: the processor recovers
/// them locally with typed defaults and a warn log. Only whole-document,
/// whole-corpus, and collaborator failures propagate.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid environment configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The sliding window for this operation is exhausted.
    #[error("rate limit exceeded for {operation}")]
    RateLimited { operation: String },

    /// Confluence REST call failed (transport or unexpected payload).
    #[error("confluence api error: {0}")]
    Api(String),

    /// Assembling a processed document failed after the extractor join.
    #[error("failed to process page {page_id}: {message}")]
    Processing { page_id: String, message: String },

    /// Corpus aggregation broke an internal invariant.
    #[error("analysis failed over {pages} pages: {message}")]
    Analysis { pages: usize, message: String },
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Api(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
