//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Serve aggregated article summaries scraped from news and blog sites.
///
/// # Examples
///
/// ```sh
/// # Defaults: 0.0.0.0:8000, cache in ./.cache, built-in sources
/// news_scraper_api
///
/// # Custom sources file and a one-hour cache
/// news_scraper_api --sources sources.yaml --cache-ttl-secs 3600
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "SCRAPER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SCRAPER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory holding cached scrape results
    #[arg(long, env = "SCRAPER_CACHE_DIR", default_value = ".cache")]
    pub cache_dir: PathBuf,

    /// Seconds before a cached result is scraped again
    #[arg(long, env = "SCRAPER_CACHE_TTL_SECS", default_value_t = 7200)]
    pub cache_ttl_secs: u64,

    /// Optional YAML file listing the sources to scrape
    #[arg(short, long, env = "SCRAPER_SOURCES_FILE")]
    pub sources: Option<PathBuf>,

    /// Directory containing index.html and the static/ assets folder
    #[arg(long, env = "SCRAPER_STATIC_DIR", default_value = ".")]
    pub static_dir: PathBuf,

    /// Per-request HTTP timeout, in seconds
    #[arg(long, env = "SCRAPER_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Upper bound on one source's fetch and parse, in seconds (0 disables)
    #[arg(long, env = "SCRAPER_SOURCE_TIMEOUT_SECS", default_value_t = 60)]
    pub source_timeout_secs: u64,

    /// Retries for transient fetch failures
    #[arg(long, env = "SCRAPER_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: usize,
}

impl Cli {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn source_timeout(&self) -> Option<Duration> {
        (self.source_timeout_secs > 0).then(|| Duration::from_secs(self.source_timeout_secs))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
