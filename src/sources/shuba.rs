//! 69shuba (www.69shuba.com) source.

use super::{NEXT_CHAPTER_LABEL, Source, find_anchor_by_text, resolve_on_host, site, stem};
use crate::error::SourceError;
use crate::models::SourceSite;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static COVER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.bookimg2 > img[src]").unwrap());

/// Source for 69shuba.
///
/// Novel URLs look like `https://www.69shuba.com/book/36573.htm` and chapter
/// URLs like `https://www.69shuba.com/txt/36573/40179619`.
pub struct ShubaSource;

impl Source for ShubaSource {
    fn tag(&self) -> &'static str {
        "69shuba"
    }

    fn site(&self) -> SourceSite {
        site(self.tag(), "https://www.69shuba.com", "chinese")
    }

    fn novel_id(&self, novel_url: &str) -> String {
        let parts: Vec<&str> = novel_url.split('/').collect();
        if parts.len() < 5 {
            return String::new();
        }
        parts
            .last()
            .and_then(|last| stem(last))
            .unwrap_or_default()
            .to_string()
    }

    fn chapter_id(&self, chapter_url: &str) -> String {
        let parts: Vec<&str> = chapter_url.split('/').collect();
        if parts.len() < 6 {
            return String::new();
        }
        parts.last().copied().unwrap_or_default().to_string()
    }

    fn next_chapter_url(&self, content: &str, current_url: &str) -> Result<String, SourceError> {
        let doc = Html::parse_document(content);
        let href = find_anchor_by_text(&doc, NEXT_CHAPTER_LABEL)
            .ok_or_else(|| SourceError::NotFound("next chapter link".to_string()))?;
        resolve_on_host(current_url, &href)
    }

    fn cover_image_url(&self, content: &str) -> Result<String, SourceError> {
        let doc = Html::parse_document(content);
        doc.select(&COVER_SELECTOR)
            .filter_map(|img| img.value().attr("src"))
            .next()
            .map(str::to_string)
            .ok_or_else(|| SourceError::NotFound("book image".to_string()))
    }
}
