//! Error taxonomy.
//!
//! Every per-source failure ends up as a [`SourceError`], whose `Display`
//! output is the `error` string reported for that website. Cache errors never
//! leave the cache module except as log lines.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Transport failure while fetching a source page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, DNS or timeout failure.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body could not be read.
    #[error("failed to read body from {url}: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request { .. } | FetchError::Body { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// The fetched page did not have the structure an adapter expects.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not find `{selector}` on the page")]
    MissingSection { selector: String },

    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Why a single source produced no articles.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("timed out after {after:?}")]
    TimedOut { after: Duration },

    /// The worker running the source panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Cache read or write problems. Logged, never surfaced to callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("corrupt cache entry {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to persist cache entry {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid source registry configuration, detected at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate source id `{0}`")]
    DuplicateId(String),

    #[error("source `{website}` names unknown adapter `{adapter}`")]
    UnknownAdapter { website: String, adapter: String },

    #[error("source `{website}` has an invalid url: {reason}")]
    InvalidUrl { website: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid sources file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A failure of the orchestrator itself, as opposed to any single source.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no async runtime available to schedule source workers")]
    NoRuntime,
}
