//! # News Scraper API
//!
//! HTTP server that scrapes article summaries from several sites in parallel
//! and returns them grouped by website.
//!
//! ## Usage
//!
//! ```sh
//! news_scraper_api --port 8000 --cache-dir .cache
//! curl localhost:8000/articles
//! ```

use clap::Parser;
use news_scraper_api::api::{self, AppState};
use news_scraper_api::cache::CacheStore;
use news_scraper_api::fetch::{HttpFetcher, RetryFetch};
use news_scraper_api::orchestrator::Orchestrator;
use news_scraper_api::registry::Registry;
use news_scraper_api::utils::ensure_writable_dir;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Sources ----
    let registry = match &args.sources {
        Some(path) => Registry::from_yaml_file(path)?,
        None => Registry::builtin(),
    };
    for source in registry.list_sources() {
        info!(
            website = %source.id,
            adapter = source.extractor.name(),
            url = %source.url,
            enabled = source.enabled,
            "Registered source"
        );
    }

    // ---- Cache ----
    // Caching is best-effort, so an unwritable directory is only worth a warning.
    if let Err(e) = ensure_writable_dir(&args.cache_dir).await {
        warn!(
            path = %args.cache_dir.display(),
            error = %e,
            "Cache directory is not writable; results will not be cached"
        );
    }
    let cache = CacheStore::new(&args.cache_dir, args.cache_ttl());

    // ---- Transport ----
    let http = HttpFetcher::new(args.request_timeout())?;
    let fetcher = Arc::new(RetryFetch::new(http, args.max_retries, Duration::from_secs(1)));

    let orchestrator = Orchestrator::new(Arc::new(registry), cache, fetcher)
        .with_source_timeout(args.source_timeout());

    let app = api::router(AppState::new(orchestrator, &args.static_dir));

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "News Article Scraper API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
