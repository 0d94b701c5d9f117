//! Concurrent fan-out over every enabled source.
//!
//! Each source runs as its own tokio task: the page fetch is async I/O and the
//! HTML parse runs on the blocking pool, wrapped by the cache so a fresh entry
//! skips both. [`Orchestrator::run_all`] joins every task before returning and
//! turns each failure (fetch, parse, timeout, panic) into that source's
//! outcome. Outcomes come back in registry order regardless of which task
//! finished first.

use crate::cache::{CacheKey, CacheStore};
use crate::error::{OrchestratorError, SourceError};
use crate::fetch::Fetcher;
use crate::models::{ArticleRecord, SourceOutcome};
use crate::registry::{Registry, SourceDescriptor};
use crate::utils::truncate_for_log;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{error, info, instrument, warn};

/// Default bound on a single source's fetch-and-parse.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(60);

/// Bytes of page body included in a parse-failure log line.
const PAGE_LOG_LIMIT: usize = 200;

/// Cache key for a source's scrape result.
pub fn cache_key(source: &SourceDescriptor) -> CacheKey {
    CacheKey::nullary(format!("sources.{}", source.id))
}

/// Fetch a source page and run its adapter on the blocking pool.
#[instrument(level = "info", skip_all, fields(source = %source.id, url = %source.url))]
pub async fn scrape(
    source: &SourceDescriptor,
    fetcher: &dyn Fetcher,
) -> Result<Vec<ArticleRecord>, SourceError> {
    let html = fetcher.fetch(source.url.as_str(), &source.headers()).await?;

    let extractor = Arc::clone(&source.extractor);
    let page_url = source.url.clone();
    let (parsed, html) = tokio::task::spawn_blocking(move || {
        let parsed = extractor.extract(&html, &page_url);
        (parsed, html)
    })
    .await
    .map_err(|e| SourceError::Worker(e.to_string()))?;

    let records = parsed.inspect_err(|e| {
        warn!(
            error = %e,
            bytes = html.len(),
            page = %truncate_for_log(&html, PAGE_LOG_LIMIT),
            "Page did not match the adapter"
        );
    })?;

    info!(count = records.len(), "Scraped source");
    Ok(records)
}

async fn run_source(
    source: SourceDescriptor,
    cache: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    timeout: Option<Duration>,
) -> Result<Vec<ArticleRecord>, SourceError> {
    let key = cache_key(&source);
    let work = cache.get_or_compute(&key, || scrape(&source, fetcher.as_ref()));
    match timeout {
        Some(after) => tokio::time::timeout(after, work)
            .await
            .map_err(|_| SourceError::TimedOut { after })?,
        None => work.await,
    }
}

/// Runs every enabled source through the cache, concurrently.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<Registry>,
    cache: CacheStore,
    fetcher: Arc<dyn Fetcher>,
    source_timeout: Option<Duration>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("sources", &self.registry.list_sources().len())
            .field("cache_root", &self.cache.root())
            .field("source_timeout", &self.source_timeout)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>, cache: CacheStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            registry,
            cache,
            fetcher,
            source_timeout: Some(DEFAULT_SOURCE_TIMEOUT),
        }
    }

    /// Bound each source's work; `None` lets a hung source stall the run.
    pub fn with_source_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Scrape every enabled source concurrently and wait for all of them.
    ///
    /// Returns one outcome per enabled source, in registry order. Individual
    /// source failures are reported inside their outcome; only a failure to
    /// schedule work at all is returned as an error.
    #[instrument(level = "info", skip_all)]
    pub async fn run_all(&self) -> Result<Vec<SourceOutcome>, OrchestratorError> {
        let runtime = Handle::try_current().map_err(|_| OrchestratorError::NoRuntime)?;
        let t0 = Instant::now();

        let (ids, handles): (Vec<String>, Vec<_>) = self
            .registry
            .enabled_sources()
            .map(|source| {
                let task = run_source(
                    source.clone(),
                    self.cache.clone(),
                    Arc::clone(&self.fetcher),
                    self.source_timeout,
                );
                (source.id.clone(), runtime.spawn(task))
            })
            .unzip();

        info!(sources = ids.len(), "Dispatched source workers");

        // join_all yields results in input order, not completion order.
        let joined = join_all(handles).await;

        let outcomes: Vec<SourceOutcome> = ids
            .into_iter()
            .zip(joined)
            .map(|(id, joined)| match joined {
                Ok(Ok(articles)) => SourceOutcome::success(id, articles),
                Ok(Err(e)) => {
                    warn!(source = %id, error = %e, "Source failed");
                    SourceOutcome::failure(id, e)
                }
                Err(join_error) => {
                    let e = SourceError::Worker(join_error.to_string());
                    error!(source = %id, error = %e, "Source worker died");
                    SourceOutcome::failure(id, e)
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        info!(
            sources = outcomes.len(),
            failed,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Completed source fan-out"
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ParseError};
    use crate::scrapers::Extractor;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// Reads the page body as a JSON array of records.
    #[derive(Debug)]
    struct JsonExtractor;

    impl Extractor for JsonExtractor {
        fn name(&self) -> &'static str {
            "json"
        }

        fn home(&self) -> &'static str {
            "https://example.com/"
        }

        fn extract(&self, html: &str, _page_url: &Url) -> Result<Vec<ArticleRecord>, ParseError> {
            if html == "panic" {
                panic!("adapter blew up");
            }
            serde_json::from_str(html).map_err(|_| ParseError::MissingSection {
                selector: "json".to_string(),
            })
        }
    }

    enum Page {
        Body(&'static str),
        Status(u16),
    }

    struct FakeFetcher {
        pages: HashMap<String, (Duration, Page)>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn new(pages: Vec<(&str, Duration, Page)>) -> Self {
            let pages = pages
                .into_iter()
                .map(|(id, delay, page)| (format!("https://{id}.example/"), (delay, page)))
                .collect();
            Self { pages, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str, _headers: &[(String, String)]) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (delay, page) = self.pages.get(url).expect("unknown url");
            tokio::time::sleep(*delay).await;
            match page {
                Page::Body(body) => Ok(body.to_string()),
                Page::Status(status) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
            }
        }
    }

    fn descriptor(id: &str, enabled: bool) -> SourceDescriptor {
        SourceDescriptor {
            id: id.to_string(),
            url: Url::parse(&format!("https://{id}.example/")).unwrap(),
            user_agent: None,
            enabled,
            extractor: Arc::new(JsonExtractor),
        }
    }

    fn orchestrator(
        tmp: &tempfile::TempDir,
        sources: Vec<SourceDescriptor>,
        fetcher: Arc<FakeFetcher>,
    ) -> Orchestrator {
        let registry = Arc::new(Registry::from_descriptors(sources).unwrap());
        Orchestrator::new(registry, CacheStore::with_default_ttl(tmp.path()), fetcher)
    }

    const TWO: &str = r#"[{"title":"a","link":null,"image":null,"summary":null},
                          {"title":"b","link":null,"image":null,"summary":null}]"#;

    #[tokio::test]
    async fn test_scrape_reports_parse_failure_on_large_page() {
        let page: &'static str = Box::leak(format!("<html>{}</html>", "鉄".repeat(500)).into_boxed_str());
        let fetcher = FakeFetcher::new(vec![("big", Duration::ZERO, Page::Body(page))]);

        let err = scrape(&descriptor("big", true), &fetcher).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(ParseError::MissingSection { .. })));
        assert!(page.len() > PAGE_LOG_LIMIT);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(vec![
            ("a", Duration::ZERO, Page::Body(TWO)),
            ("b", Duration::ZERO, Page::Status(503)),
            ("c", Duration::ZERO, Page::Body("<html>not json</html>")),
            ("d", Duration::ZERO, Page::Body("panic")),
        ]));
        let orch = orchestrator(
            &tmp,
            vec![
                descriptor("a", true),
                descriptor("b", true),
                descriptor("c", true),
                descriptor("d", true),
            ],
            fetcher,
        );

        let outcomes = orch.run_all().await.unwrap();
        assert_eq!(outcomes.len(), 4);

        assert_eq!(outcomes[0].error, None);
        assert_eq!(outcomes[0].value.len(), 2);

        assert_eq!(
            outcomes[1].error.as_deref(),
            Some("https://b.example/ returned HTTP 503")
        );
        assert!(outcomes[2].error.as_deref().unwrap().contains("could not find"));
        assert!(outcomes[3].error.as_deref().unwrap().starts_with("worker failed"));
        assert!(outcomes[1..].iter().all(|o| o.value.is_empty()));
    }

    #[tokio::test]
    async fn test_order_follows_registry_not_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(vec![
            ("slow", Duration::from_millis(120), Page::Body("[]")),
            ("medium", Duration::from_millis(60), Page::Body("[]")),
            ("fast", Duration::ZERO, Page::Body("[]")),
        ]));
        let orch = orchestrator(
            &tmp,
            vec![
                descriptor("slow", true),
                descriptor("medium", true),
                descriptor("fast", true),
            ],
            fetcher,
        );

        let ids: Vec<String> = orch.run_all().await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["slow", "medium", "fast"]);
    }

    #[tokio::test]
    async fn test_sources_run_concurrently() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(vec![
            ("a", Duration::from_millis(200), Page::Body("[]")),
            ("b", Duration::from_millis(200), Page::Body("[]")),
            ("c", Duration::from_millis(200), Page::Body("[]")),
        ]));
        let orch = orchestrator(
            &tmp,
            vec![descriptor("a", true), descriptor("b", true), descriptor("c", true)],
            fetcher,
        );

        let t0 = Instant::now();
        orch.run_all().await.unwrap();
        assert!(t0.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_disabled_sources_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(vec![("on", Duration::ZERO, Page::Body("[]"))]));
        let orch = orchestrator(
            &tmp,
            vec![descriptor("off", false), descriptor("on", true)],
            Arc::clone(&fetcher),
        );

        let outcomes = orch.run_all().await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].id, "on");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(vec![
            ("a", Duration::ZERO, Page::Body(TWO)),
            ("b", Duration::ZERO, Page::Status(500)),
        ]));
        let orch = orchestrator(
            &tmp,
            vec![descriptor("a", true), descriptor("b", true)],
            Arc::clone(&fetcher),
        );

        let first = orch.run_all().await.unwrap();
        let second = orch.run_all().await.unwrap();
        assert_eq!(first, second);
        // "a" is fetched once; the failing "b" is retried on every run.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert!(tmp.path().join(cache_key(&descriptor("a", true)).file_name()).exists());
        assert!(!tmp.path().join(cache_key(&descriptor("b", true)).file_name()).exists());
    }

    #[tokio::test]
    async fn test_slow_source_times_out_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new(vec![
            ("hung", Duration::from_secs(30), Page::Body("[]")),
            ("ok", Duration::ZERO, Page::Body(TWO)),
        ]));
        let orch = orchestrator(
            &tmp,
            vec![descriptor("hung", true), descriptor("ok", true)],
            fetcher,
        )
        .with_source_timeout(Some(Duration::from_millis(50)));

        let outcomes = orch.run_all().await.unwrap();
        assert_eq!(outcomes[0].error.as_deref(), Some("timed out after 50ms"));
        assert_eq!(outcomes[1].error, None);
        assert_eq!(outcomes[1].value.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_registry_yields_no_outcomes() {
        let tmp = tempfile::tempdir().unwrap();
        let orch = orchestrator(&tmp, vec![], Arc::new(FakeFetcher::new(vec![])));
        assert!(orch.run_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_run_all_without_runtime_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let orch = orchestrator(&tmp, vec![descriptor("a", true)], Arc::new(FakeFetcher::new(vec![])));
        let result = futures::executor::block_on(orch.run_all());
        assert!(matches!(result, Err(OrchestratorError::NoRuntime)));
    }
}
