//! Twkan (twkan.com) source.
//!
//! Shares 69shuba's URL layout but publishes its cover through `og:image`.

use super::{NEXT_CHAPTER_LABEL, Source, find_anchor_by_text, meta_og_image, resolve_on_host, site, stem};
use crate::error::SourceError;
use crate::models::SourceSite;
use scraper::Html;

pub struct TwkanSource;

impl Source for TwkanSource {
    fn tag(&self) -> &'static str {
        "twkan"
    }

    fn site(&self) -> SourceSite {
        site(self.tag(), "https://twkan.com", "chinese")
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
        meta_og_image(&Html::parse_document(content))
            .ok_or_else(|| SourceError::NotFound("og:image".to_string()))
    }
}
