//! 69yue (www.69yue.top) source.
//!
//! Chapter pages are script-heavy and don't parse into a useful tree, so the
//! next link is found by scanning the raw markup.

use super::{NEXT_CHAPTER_LABEL, Source, resolve_on_host, scan_marker_href, site, stem};
use crate::error::SourceError;
use crate::models::SourceSite;

pub struct YueSource;

impl YueSource {
    fn last_stem(url: &str) -> String {
        let parts: Vec<&str> = url.split('/').collect();
        if parts.len() < 5 {
            return String::new();
        }
        parts
            .last()
            .and_then(|last| stem(last))
            .unwrap_or_default()
            .to_string()
    }
}

impl Source for YueSource {
    fn tag(&self) -> &'static str {
        "69yue"
    }

    fn site(&self) -> SourceSite {
        site(self.tag(), "https://www.69yue.top", "chinese")
    }

    fn novel_id(&self, novel_url: &str) -> String {
        Self::last_stem(novel_url)
    }

    fn chapter_id(&self, chapter_url: &str) -> String {
        Self::last_stem(chapter_url)
    }

    fn next_chapter_url(&self, content: &str, current_url: &str) -> Result<String, SourceError> {
        let href = scan_marker_href(content, &[NEXT_CHAPTER_LABEL])
            .ok_or_else(|| SourceError::NotFound("next chapter link".to_string()))?;
        resolve_on_host(current_url, href)
    }

    fn cover_image_url(&self, _content: &str) -> Result<String, SourceError> {
        Err(SourceError::NotFound("cover image".to_string()))
    }
}
