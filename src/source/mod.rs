//! Record source: spreadsheet export fetching and payload parsing.

pub mod gviz;
pub mod loader;

pub use gviz::parse_records;
pub use loader::{load_file, SheetSource};

use thiserror::Error;

/// Errors raised while obtaining records.
///
/// Any of these is terminal for the run; nothing is retried and no
/// partial data is kept.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("spreadsheet export returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid export URL: {0}")]
    InvalidUrl(String),
}
