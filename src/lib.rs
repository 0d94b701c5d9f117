//! # News Scraper API
//!
//! Scrapes the latest article summaries from a small set of news and blog
//! sites and serves them as one aggregated JSON document.
//!
//! ## Architecture
//!
//! 1. **Registry**: the ordered list of sources, built once at startup
//! 2. **Cache**: one JSON file per source, valid for two hours by default
//! 3. **Orchestrator**: scrapes every enabled source concurrently through the
//!    cache; one source failing never affects the others
//! 4. **Aggregate**: shapes the outcomes into the `/articles` response
//! 5. **API**: the axum router around all of the above

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod scrapers;
pub mod utils;

pub use cache::{CacheKey, CacheStore};
pub use error::{FetchError, OrchestratorError, ParseError, SourceError};
pub use fetch::{Fetcher, HttpFetcher, RetryFetch};
pub use models::{AggregateResult, ArticleRecord, SourceOutcome, WebsiteResult};
pub use orchestrator::Orchestrator;
pub use registry::{Registry, SourceDescriptor};
