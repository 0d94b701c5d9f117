//! Disk-backed, TTL-expiring result cache.
//!
//! Each [`CacheKey`] maps to one JSON file under the cache root:
//!
//! ```text
//! .cache/
//! ├── sources.tetsudo.4f53cda18c2baa0c.json
//! ├── sources.sorae.4f53cda18c2baa0c.json
//! └── sources.wired.4f53cda18c2baa0c.json
//! ```
//!
//! A file holds `{function, stored_at, value}`. Entries older than the TTL are
//! recomputed and overwritten; entries that fail to parse are deleted and
//! treated as misses. Caching is best-effort: a failed write is logged and the
//! freshly computed value is still returned.

use crate::error::CacheError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Default entry lifetime: two hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60 * 60);

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifies one cached computation: its qualified name plus a hash of its
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    arg_hash: String,
}

impl CacheKey {
    /// Build a key from a computation name and its (serializable) arguments.
    ///
    /// The argument hash is the first 16 hex chars of SHA-256 over the JSON
    /// encoding of `args`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Serialize`] when `args` has no JSON encoding (for
    /// example a map with non-string keys).
    pub fn new<A: Serialize + ?Sized>(name: impl Into<String>, args: &A) -> Result<Self, CacheError> {
        let encoded = serde_json::to_string(args)?;
        Ok(Self::from_encoded(name, &encoded))
    }

    /// Key for a computation that takes no arguments.
    pub fn nullary(name: impl Into<String>) -> Self {
        Self::from_encoded(name, "[]")
    }

    fn from_encoded(name: impl Into<String>, encoded: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(encoded.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self {
            name: name.into(),
            arg_hash: digest[..16].to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arg_hash(&self) -> &str {
        &self.arg_hash
    }

    /// File name of the entry, with the name sanitized for the file system.
    pub fn file_name(&self) -> String {
        let safe: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        format!("{}.{}.json", safe, self.arg_hash)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct CacheEntry<T> {
    function: String,
    stored_at: DateTime<Utc>,
    value: T,
}

enum Lookup<T> {
    Fresh(T),
    Stale,
    Missing,
}

/// File-per-key cache with a fixed time-to-live.
///
/// Cloning is cheap; clones share the same directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { root: root.into(), ttl }
    }

    pub fn with_default_ttl(root: impl Into<PathBuf>) -> Self {
        Self::new(root, DEFAULT_TTL)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Return the cached value for `key`, or run `compute` and persist its
    /// successful result.
    ///
    /// Errors from `compute` are returned unchanged and nothing is stored.
    /// Cache read and write problems never reach the caller.
    #[instrument(level = "debug", skip_all, fields(key = %key.name()))]
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.read_entry::<T>(key).await {
            Lookup::Fresh(value) => {
                info!(key = %key.name(), "Cache hit");
                return Ok(value);
            }
            Lookup::Stale => info!(key = %key.name(), "Cache expired"),
            Lookup::Missing => info!(key = %key.name(), "Cache miss"),
        }

        let value = compute().await?;

        if let Err(e) = self.store(key, &value).await {
            warn!(key = %key.name(), error = %e, "Failed to save cache entry");
        }
        Ok(value)
    }

    /// Read a fresh value for `key` without computing anything.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.read_entry(key).await {
            Lookup::Fresh(value) => Some(value),
            Lookup::Stale | Lookup::Missing => None,
        }
    }

    /// Persist `value` under `key`, stamped with the current time.
    ///
    /// The entry is written to a temporary file in the cache root and renamed
    /// into place.
    pub async fn store<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        let entry = CacheEntry {
            function: key.name().to_string(),
            stored_at: Utc::now(),
            value,
        };
        let bytes = serde_json::to_vec(&entry)?;
        let path = self.path_for(key);

        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| CacheError::Persist { path: self.root.clone(), source })?;

        let tmp = self.root.join(format!(
            ".{}.{}.{}.tmp",
            key.file_name(),
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(source) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::Persist { path: tmp, source });
        }
        if let Err(source) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::Persist { path, source });
        }
        debug!(path = %path.display(), bytes = bytes.len(), "Stored cache entry");
        Ok(())
    }

    fn is_expired(&self, stored_at: DateTime<Utc>) -> bool {
        // A negative age (entry stamped in the future) counts as fresh.
        match Utc::now().signed_duration_since(stored_at).to_std() {
            Ok(age) => age >= self.ttl,
            Err(_) => false,
        }
    }

    async fn read_entry<T: DeserializeOwned>(&self, key: &CacheKey) -> Lookup<T> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::Missing,
            Err(e) => {
                self.discard(&path, e.to_string()).await;
                return Lookup::Missing;
            }
        };

        match serde_json::from_slice::<CacheEntry<T>>(&bytes) {
            Ok(entry) if self.is_expired(entry.stored_at) => Lookup::Stale,
            Ok(entry) => Lookup::Fresh(entry.value),
            Err(e) => {
                self.discard(&path, e.to_string()).await;
                Lookup::Missing
            }
        }
    }

    async fn discard(&self, path: &Path, reason: String) {
        let err = CacheError::Corrupt { path: path.to_path_buf(), reason };
        warn!(error = %err, "Cache read error; removing entry");
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove corrupt cache entry");
            }
        }
    }
}
