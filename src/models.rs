//! Data models shared by the adapters, the orchestrator and the HTTP layer.
//!
//! - [`ArticleRecord`]: one scraped article summary
//! - [`SourceOutcome`]: what one source produced during a run
//! - [`AggregateResult`] / [`WebsiteResult`]: the `/articles` response body

use serde::{Deserialize, Serialize};

/// A single article summary scraped from a source page.
///
/// Every field is optional; missing values serialize as `null`. Adapters only
/// emit records for which [`ArticleRecord::is_retainable`] holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// The article headline.
    pub title: Option<String>,
    /// Absolute URL of the article.
    pub link: Option<String>,
    /// Absolute URL of the thumbnail image.
    pub image: Option<String>,
    /// Teaser text shown under the headline.
    pub summary: Option<String>,
}

impl ArticleRecord {
    /// A record is worth keeping only if it can be shown or followed.
    pub fn is_retainable(&self) -> bool {
        self.title.is_some() || self.link.is_some()
    }
}

/// The result of running one source through the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// The source id (website name).
    pub id: String,
    /// Articles produced, empty when `error` is set.
    pub value: Vec<ArticleRecord>,
    /// Human-readable failure message.
    pub error: Option<String>,
}

impl SourceOutcome {
    pub fn success(id: impl Into<String>, value: Vec<ArticleRecord>) -> Self {
        Self { id: id.into(), value, error: None }
    }

    pub fn failure(id: impl Into<String>, error: impl ToString) -> Self {
        Self { id: id.into(), value: Vec::new(), error: Some(error.to_string()) }
    }
}

/// One website's entry in the aggregated response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebsiteResult {
    pub website: String,
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /articles`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AggregateResult {
    pub results: Vec<WebsiteResult>,
}
