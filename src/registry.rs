//! The set of sources fanned out on every request.
//!
//! The registry is built once at startup, either from the built-in defaults or
//! from a YAML sources file, and is read-only afterwards:
//!
//! ```yaml
//! - website: tetsudo
//!   adapter: tetsudo
//! - website: sorae
//!   adapter: sorae
//!   user_agent: "Mozilla/5.0 ..."
//! - website: wired
//!   adapter: wired
//!   url: https://wired.jp/science
//!   enabled: false
//! ```
//!
//! Entry order is response order. Disabled entries stay in the registry so that
//! switching a source off is a data change.

use crate::error::RegistryError;
use crate::fetch::DEFAULT_USER_AGENT;
use crate::scrapers::{self, BUILTIN_ADAPTERS, Extractor};
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;

/// One row of the sources file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    pub website: String,
    pub adapter: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// A registered source, ready to be scraped.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub id: String,
    pub url: Url,
    pub user_agent: Option<String>,
    pub enabled: bool,
    pub extractor: Arc<dyn Extractor>,
}

impl SourceDescriptor {
    /// Request headers to send when fetching this source.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.user_agent
            .iter()
            .map(|ua| ("User-Agent".to_string(), ua.clone()))
            .collect()
    }
}

/// Ordered, immutable list of sources.
#[derive(Debug, Clone)]
pub struct Registry {
    sources: Vec<SourceDescriptor>,
}

impl Registry {
    /// The default sources: tetsudo, sorae and wired, all enabled.
    pub fn builtin() -> Self {
        let sources = BUILTIN_ADAPTERS
            .iter()
            .filter_map(|name| {
                let extractor = scrapers::builtin(name)?;
                let url = Url::parse(extractor.home()).ok()?;
                Some(SourceDescriptor {
                    id: name.to_string(),
                    url,
                    // tetsudo answers fine without a browser User-Agent
                    user_agent: (*name != "tetsudo").then(|| DEFAULT_USER_AGENT.to_string()),
                    enabled: true,
                    extractor,
                })
            })
            .collect();
        Self { sources }
    }

    /// Build a registry from configuration rows, validating ids, adapters and URLs.
    pub fn from_entries(
        entries: impl IntoIterator<Item = SourceEntry>,
    ) -> Result<Self, RegistryError> {
        let sources = entries
            .into_iter()
            .map(|entry| {
                let extractor = scrapers::builtin(&entry.adapter).ok_or_else(|| {
                    RegistryError::UnknownAdapter {
                        website: entry.website.clone(),
                        adapter: entry.adapter.clone(),
                    }
                })?;
                let raw_url = entry.url.as_deref().unwrap_or(extractor.home());
                let url = Url::parse(raw_url).map_err(|e| RegistryError::InvalidUrl {
                    website: entry.website.clone(),
                    reason: e.to_string(),
                })?;
                Ok(SourceDescriptor {
                    id: entry.website,
                    url,
                    user_agent: entry.user_agent,
                    enabled: entry.enabled,
                    extractor,
                })
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;

        Self::from_descriptors(sources)
    }

    /// Wrap already-built descriptors, rejecting duplicate ids.
    pub fn from_descriptors(sources: Vec<SourceDescriptor>) -> Result<Self, RegistryError> {
        if let Some(dup) = sources.iter().map(|s| s.id.as_str()).duplicates().next() {
            return Err(RegistryError::DuplicateId(dup.to_string()));
        }
        Ok(Self { sources })
    }

    /// Parse a YAML sources file.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let entries: Vec<SourceEntry> = serde_yaml::from_str(yaml)?;
        Self::from_entries(entries)
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, RegistryError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_yaml_str(&yaml)?;
        info!(
            total = registry.sources.len(),
            enabled = registry.enabled_sources().count(),
            "Loaded sources file"
        );
        Ok(registry)
    }

    /// Every registered source, enabled or not, in registration order.
    pub fn list_sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Sources that take part in a run, in registration order.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter().filter(|s| s.enabled)
    }
}
