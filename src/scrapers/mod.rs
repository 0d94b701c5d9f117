//! Site adapters that turn a fetched page into [`ArticleRecord`]s.
//!
//! Each adapter is a pure function of the page HTML: fetching and caching are
//! handled by the orchestrator. Adapters keep at most [`MAX_ARTICLES`] items and
//! silently drop items that have neither a title nor a link.
//!
//! # Supported Sources
//!
//! | Source | Module | Page | Container |
//! |--------|--------|------|-----------|
//! | Tetsudo.com | [`tetsudo`] | `/column` | `ul.topics-list` |
//! | sorae | [`sorae`] | `/astronomy` | `section.wrap-post-box` |
//! | WIRED.jp | [`wired`] | `/science` | `div.SummaryCollectionGridItems-TvFTI` |
//!
//! A missing container is a [`ParseError::MissingSection`]: the layout changed
//! or the page is not what we expected, which is different from "no articles".

use crate::error::ParseError;
use crate::models::ArticleRecord;
use crate::utils::clean_text;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::Arc;
use url::Url;

pub mod sorae;
pub mod tetsudo;
pub mod wired;

/// Articles kept per source.
pub const MAX_ARTICLES: usize = 4;

/// Site-specific extraction logic.
pub trait Extractor: Send + Sync + fmt::Debug {
    /// Adapter name as used in the sources file.
    fn name(&self) -> &'static str;

    /// The page scraped when the sources file does not override it.
    fn home(&self) -> &'static str;

    /// Extract article summaries from `html`, fetched from `page_url`.
    fn extract(&self, html: &str, page_url: &Url) -> Result<Vec<ArticleRecord>, ParseError>;
}

/// Look up a built-in adapter by name.
pub fn builtin(adapter: &str) -> Option<Arc<dyn Extractor>> {
    match adapter {
        "tetsudo" => Some(Arc::new(tetsudo::Tetsudo)),
        "sorae" => Some(Arc::new(sorae::Sorae)),
        "wired" => Some(Arc::new(wired::Wired)),
        _ => None,
    }
}

/// Names accepted by [`builtin`], in default registry order.
pub const BUILTIN_ADAPTERS: [&str; 3] = ["tetsudo", "sorae", "wired"];

pub(crate) fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("{css}: {e}")))
}

/// First element in `document` matching `css`, or a `MissingSection` error.
pub(crate) fn container<'a>(document: &'a Html, css: &str) -> Result<ElementRef<'a>, ParseError> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .next()
        .ok_or_else(|| ParseError::MissingSection { selector: css.to_string() })
}

/// Direct element children of `parent` with tag `tag` and, optionally, a class.
pub(crate) fn children<'a>(
    parent: ElementRef<'a>,
    tag: &'a str,
    class: Option<&'a str>,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == tag)
        .filter(move |el| class.is_none_or(|c| el.value().classes().any(|have| have == c)))
}

pub(crate) fn first<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    el.select(sel).next()
}

/// Normalized text content of an element.
///
/// Each text node is trimmed and the pieces are concatenated without a
/// separator, so inline markup inside Japanese text adds no spaces.
pub(crate) fn text_of(el: ElementRef<'_>) -> Option<String> {
    clean_text(&el.text().map(str::trim).collect::<String>())
}

/// Non-blank attribute value.
pub(crate) fn attr<'a>(el: ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

/// Drop records that cannot be shown or followed.
pub(crate) fn retain(records: impl IntoIterator<Item = ArticleRecord>) -> Vec<ArticleRecord> {
    records.into_iter().filter(ArticleRecord::is_retainable).collect()
}
