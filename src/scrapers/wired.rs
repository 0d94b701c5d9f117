//! WIRED.jp science section scraper.
//!
//! Scrapes <https://wired.jp/science>, whose article grid is rendered as
//! `div.summary-item` children of a hashed-class container.

use super::{Extractor, MAX_ARTICLES, attr, children, container, first, retain, selector, text_of};
use crate::error::ParseError;
use crate::models::ArticleRecord;
use crate::utils::absolutize;
use scraper::Html;
use tracing::{debug, instrument};
use url::Url;

// The class suffix is generated by the site's build and changes on redesigns.
const GRID: &str = "div.SummaryCollectionGridItems-TvFTI";

#[derive(Debug, Clone, Copy, Default)]
pub struct Wired;

impl Extractor for Wired {
    fn name(&self) -> &'static str {
        "wired"
    }

    fn home(&self) -> &'static str {
        "https://wired.jp/science"
    }

    #[instrument(level = "debug", skip_all, fields(%page_url))]
    fn extract(&self, html: &str, page_url: &Url) -> Result<Vec<ArticleRecord>, ParseError> {
        let document = Html::parse_document(html);
        let grid = container(&document, GRID)?;

        let headline = selector("h2.summary-item__hed")?;
        let link = selector("a.summary-item__hed-link")?;
        let image = selector("img.responsive-image__image")?;
        let dek = selector("div.summary-item__dek")?;

        let records = children(grid, "div", Some("summary-item"))
            .take(MAX_ARTICLES)
            .map(|item| ArticleRecord {
                title: first(item, &headline).and_then(text_of),
                link: first(item, &link)
                    .and_then(|a| attr(a, "href"))
                    .and_then(|href| absolutize(page_url, href)),
                image: first(item, &image)
                    .and_then(|img| attr(img, "src"))
                    .and_then(|src| absolutize(page_url, src)),
                summary: first(item, &dek).and_then(text_of),
            });

        let records = retain(records);
        debug!(count = records.len(), "Parsed wired articles");
        Ok(records)
    }
}
