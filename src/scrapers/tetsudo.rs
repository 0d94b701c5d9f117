//! Tetsudo.com column scraper.
//!
//! Scrapes the column listing at <https://www.tetsudo.com/column>. Each entry
//! is an `li.clearfix` anywhere inside `ul.topics-list`, with the headline
//! link in an `h3`, a thumbnail in `figure.topics-image` and a teaser in
//! `p.topics-summary`. Links on the page are site-relative.

use super::{Extractor, MAX_ARTICLES, attr, container, first, retain, selector, text_of};
use crate::error::ParseError;
use crate::models::ArticleRecord;
use crate::utils::absolutize;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Clone, Copy, Default)]
pub struct Tetsudo;

impl Extractor for Tetsudo {
    fn name(&self) -> &'static str {
        "tetsudo"
    }

    fn home(&self) -> &'static str {
        "https://www.tetsudo.com/column"
    }

    #[instrument(level = "debug", skip_all, fields(%page_url))]
    fn extract(&self, html: &str, page_url: &Url) -> Result<Vec<ArticleRecord>, ParseError> {
        let document = Html::parse_document(html);
        let list = container(&document, "ul.topics-list")?;

        let entry = selector("li.clearfix")?;
        let headline = selector("h3 a")?;
        let image = selector("figure.topics-image img")?;
        let summary = selector("p.topics-summary")?;

        // Items may sit below wrapper elements, so search all descendants.
        let records = list
            .select(&entry)
            .take(MAX_ARTICLES)
            .map(|item| {
                let anchor = first(item, &headline);
                ArticleRecord {
                    title: anchor.and_then(text_of),
                    link: anchor
                        .and_then(|a| attr(a, "href"))
                        .and_then(|href| absolutize(page_url, href)),
                    image: first(item, &image)
                        .and_then(|img| attr(img, "src"))
                        .and_then(|src| absolutize(page_url, src)),
                    summary: first(item, &summary).and_then(text_of),
                }
            });

        let records = retain(records);
        debug!(count = records.len(), "Parsed tetsudo articles");
        Ok(records)
    }
}
