//! Shuhaige (m.shuhaige.net) source.
//!
//! The mobile site splits long chapters into pages, so the next link may be
//! labelled "next page" rather than "next chapter".

use super::{NEXT_CHAPTER_LABEL, Source, resolve_on_host, scan_marker_href, site, stem};
use crate::error::SourceError;
use crate::models::SourceSite;

const NEXT_PAGE_LABEL: &str = "下一页";
const COVER_MARKER: &str = r#"<div class="detail"><img src=""#;

/// Source for shuhaige.
///
/// Novel URLs look like `https://m.shuhaige.net/345462` and chapter URLs like
/// `https://m.shuhaige.net/345462/121268892.html`.
pub struct ShuhaigeSource;

impl Source for ShuhaigeSource {
    fn tag(&self) -> &'static str {
        "shuhaige"
    }

    fn site(&self) -> SourceSite {
        site(self.tag(), "https://m.shuhaige.net", "chinese")
    }

    fn novel_id(&self, novel_url: &str) -> String {
        novel_url.split('/').nth(3).unwrap_or_default().to_string()
    }

    fn chapter_id(&self, chapter_url: &str) -> String {
        chapter_url
            .split('/')
            .nth(4)
            .and_then(stem)
            .unwrap_or_default()
            .to_string()
    }

    fn next_chapter_url(&self, content: &str, current_url: &str) -> Result<String, SourceError> {
        let href = scan_marker_href(content, &[NEXT_CHAPTER_LABEL, NEXT_PAGE_LABEL])
            .ok_or_else(|| SourceError::NotFound("next chapter link".to_string()))?;
        resolve_on_host(current_url, href)
    }

    fn cover_image_url(&self, content: &str) -> Result<String, SourceError> {
        let start = content
            .find(COVER_MARKER)
            .map(|idx| idx + COVER_MARKER.len())
            .ok_or_else(|| SourceError::NotFound("cover image".to_string()))?;
        let len = content[start..]
            .find('"')
            .ok_or_else(|| SourceError::NotFound("cover image".to_string()))?;
        Ok(content[start..start + len].to_string())
    }
}
