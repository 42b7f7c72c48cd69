//! Doupo (doupo.935666.xyz) source.

use super::{NEXT_CHAPTER_LABEL, Source, find_anchor_by_text, meta_og_image, resolve_on_host, site, stem};
use crate::error::SourceError;
use crate::models::SourceSite;
use scraper::Html;

/// Source for doupo.
///
/// Novel URLs look like `https://doupo.935666.xyz/b/5217/` and chapter URLs
/// like `https://doupo.935666.xyz/b/5217/3861075.html`.
pub struct DoupoSource;

impl Source for DoupoSource {
    fn tag(&self) -> &'static str {
        "doupo"
    }

    fn site(&self) -> SourceSite {
        site(self.tag(), "https://doupo.935666.xyz", "chinese")
    }

    fn novel_id(&self, novel_url: &str) -> String {
        novel_url.split('/').nth(4).unwrap_or_default().to_string()
    }

    fn chapter_id(&self, chapter_url: &str) -> String {
        chapter_url
            .split('/')
            .nth(5)
            .and_then(stem)
            .unwrap_or_default()
            .to_string()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        let source = DoupoSource;
        assert_eq!(source.novel_id("https://doupo.935666.xyz/b/5217/"), "5217");
        assert_eq!(source.novel_id("https://doupo.935666.xyz/"), "");
        assert_eq!(
            source.chapter_id("https://doupo.935666.xyz/b/5217/3861075.html"),
            "3861075"
        );
        assert_eq!(source.chapter_id("https://doupo.935666.xyz/b/5217/3861075"), "");
    }

    #[test]
    fn test_next_chapter_url() {
        let source = DoupoSource;
        let html = r#"<div class="bottem"><a href="/b/5217/">目录</a><a href="/b/5217/3861076.html">下一章</a></div>"#;
        assert_eq!(
            source
                .next_chapter_url(html, "https://doupo.935666.xyz/b/5217/3861075.html")
                .unwrap(),
            "https://doupo.935666.xyz/b/5217/3861076.html"
        );
    }
}
