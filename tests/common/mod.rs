//! Fakes shared by the integration tests: a scripted fetcher and a JSON adapter.

#![allow(dead_code)]

use async_trait::async_trait;
use news_scraper_api::error::{FetchError, ParseError};
use news_scraper_api::models::ArticleRecord;
use news_scraper_api::registry::{Registry, SourceDescriptor};
use news_scraper_api::scrapers::Extractor;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Parses the page body as a JSON array of records, dropping unretainable ones
/// the same way the real adapters do.
#[derive(Debug)]
pub struct JsonExtractor;

impl Extractor for JsonExtractor {
    fn name(&self) -> &'static str {
        "json"
    }

    fn home(&self) -> &'static str {
        "https://example.com/"
    }

    fn extract(&self, html: &str, _page_url: &Url) -> Result<Vec<ArticleRecord>, ParseError> {
        let records: Vec<ArticleRecord> =
            serde_json::from_str(html).map_err(|_| ParseError::MissingSection {
                selector: "json".to_string(),
            })?;
        Ok(records.into_iter().filter(ArticleRecord::is_retainable).collect())
    }
}

pub enum Page {
    Body(String),
    Status(u16),
}

/// Serves canned pages keyed by URL after a per-page delay, counting calls.
pub struct FakeFetcher {
    pages: HashMap<String, (Duration, Page)>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self { pages: HashMap::new(), calls: AtomicUsize::new(0) }
    }

    pub fn page(mut self, id: &str, delay: Duration, page: Page) -> Self {
        self.pages.insert(url_for(id).to_string(), (delay, page));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl news_scraper_api::fetch::Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _headers: &[(String, String)]) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some((delay, page)) = self.pages.get(url) else {
            return Err(FetchError::Status { url: url.to_string(), status: 404 });
        };
        tokio::time::sleep(*delay).await;
        match page {
            Page::Body(body) => Ok(body.clone()),
            Page::Status(status) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}

pub fn url_for(id: &str) -> Url {
    Url::parse(&format!("https://{id}.example/")).expect("valid test url")
}

pub fn json_source(id: &str) -> SourceDescriptor {
    SourceDescriptor {
        id: id.to_string(),
        url: url_for(id),
        user_agent: None,
        enabled: true,
        extractor: Arc::new(JsonExtractor),
    }
}

pub fn registry(ids: &[&str]) -> Arc<Registry> {
    let sources = ids.iter().map(|id| json_source(id)).collect();
    Arc::new(Registry::from_descriptors(sources).expect("unique ids"))
}

pub fn record(title: &str, link: &str) -> ArticleRecord {
    ArticleRecord {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        image: None,
        summary: None,
    }
}

pub fn body(records: &[ArticleRecord]) -> String {
    serde_json::to_string(records).expect("serialize records")
}
