//! Utility functions for text cleanup, URL resolution, logging and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Whitespace normalization for scraped text
//! - Resolving scraped `href`/`src` values against the page URL
//! - String truncation for log fields
//! - Writable-directory probing for the cache root

use once_cell::sync::Lazy;
use regex::Regex;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Collapse runs of whitespace and trim.
///
/// Returns `None` when nothing but whitespace is left, so callers can treat
/// empty elements the same as missing ones.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  a \n\t b "), Some("a b".to_string()));
/// assert_eq!(clean_text(" \n "), None);
/// ```
pub fn clean_text(s: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(s.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Resolve a possibly-relative URL found in a page against that page's URL.
///
/// Blank values and values that do not form a valid URL yield `None`.
pub fn absolutize(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok().map(|u| u.to_string())
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backed off to a char boundary)
/// with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then writes and removes a
/// probe file.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created or is
/// not writable.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Directory is writable");
    Ok(())
}
