//! Error taxonomy for the collection pipeline.
//!
//! Every component-level operation returns either a usable (possibly empty)
//! result or a [`CollectError`]; nothing panics across a component boundary.
//! Fetch and parse failures are absorbed at page/record granularity by the
//! callers (skip and continue), persistence failures surface to the top-level
//! run, and missing collaborator configuration is not an error at all; the
//! feature is simply disabled.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("HTTP request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("page structure missing: {0}")]
    Parse(String),

    #[error("artifact IO failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("summarizer call failed: {0}")]
    Summarize(String),

    #[error("durable store rejected record: {0}")]
    Store(String),

    #[error("no data obtained for {0}")]
    NoData(String),
}

pub type CollectResult<T> = Result<T, CollectError>;
