//! sorae astronomy news scraper.
//!
//! Scrapes <https://sorae.info/astronomy>. Articles are the direct `article`
//! children of `section.wrap-post-box`.
//!
//! The markup has a few quirks handled here:
//! - the canonical link lives in `div.post-box-contents[data-href]`; the title
//!   anchor's `href` is only a fallback
//! - the full headline is in the anchor's `title` attribute, the anchor text
//!   may be shortened
//! - lazy-loaded thumbnails carry a `data:image` placeholder in `src` and the
//!   real URL in `data-src`

use super::{Extractor, MAX_ARTICLES, attr, children, container, first, retain, selector, text_of};
use crate::error::ParseError;
use crate::models::ArticleRecord;
use crate::utils::absolutize;
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sorae;

fn thumbnail(img: ElementRef<'_>) -> Option<&str> {
    match attr(img, "src") {
        Some(src) if !src.contains("data:image") => Some(src),
        _ => attr(img, "data-src"),
    }
}

impl Extractor for Sorae {
    fn name(&self) -> &'static str {
        "sorae"
    }

    fn home(&self) -> &'static str {
        "https://sorae.info/astronomy"
    }

    #[instrument(level = "debug", skip_all, fields(%page_url))]
    fn extract(&self, html: &str, page_url: &Url) -> Result<Vec<ArticleRecord>, ParseError> {
        let document = Html::parse_document(html);
        let section = container(&document, "section.wrap-post-box")?;

        let contents = selector("div.post-box-contents")?;
        let title_anchor = selector("div.post-title a")?;
        let image = selector("figure.post_thumbnail img")?;
        let summary = selector("div.post-substr")?;

        let records = children(section, "article", None)
            .take(MAX_ARTICLES)
            .map(|article| {
                let anchor = first(article, &title_anchor);
                let title = anchor.and_then(|a| {
                    attr(a, "title")
                        .and_then(crate::utils::clean_text)
                        .or_else(|| text_of(a))
                });
                let link = first(article, &contents)
                    .and_then(|div| attr(div, "data-href"))
                    .or_else(|| anchor.and_then(|a| attr(a, "href")))
                    .and_then(|href| absolutize(page_url, href));

                ArticleRecord {
                    title,
                    link,
                    image: first(article, &image)
                        .and_then(thumbnail)
                        .and_then(|src| absolutize(page_url, src)),
                    summary: first(article, &summary).and_then(text_of),
                }
            });

        let records = retain(records);
        debug!(count = records.len(), "Parsed sorae articles");
        Ok(records)
    }
}
