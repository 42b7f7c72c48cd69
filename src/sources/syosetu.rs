//! Syosetu (ncode.syosetu.com) source.
//!
//! Chapters are numbered in the URL, so the next chapter is computed rather
//! than scraped.

use super::{Source, site};
use crate::error::SourceError;
use crate::models::SourceSite;

const HOST: &str = "ncode.syosetu.com";

/// Source for Syosetu.
///
/// Novel URLs look like `https://ncode.syosetu.com/n1514kj/` and chapter URLs
/// like `https://ncode.syosetu.com/n1514kj/1/`.
pub struct SyosetuSource;

impl SyosetuSource {
    /// Returns the path segments following the host.
    fn segments(url: &str) -> Vec<&str> {
        url.split('/')
            .skip_while(|part| *part != HOST)
            .skip(1)
            .filter(|part| !part.is_empty())
            .collect()
    }
}

impl Source for SyosetuSource {
    fn tag(&self) -> &'static str {
        "syosetu"
    }

    fn site(&self) -> SourceSite {
        site(self.tag(), "https://syosetu.com/", "japanese")
    }

    fn novel_id(&self, novel_url: &str) -> String {
        Self::segments(novel_url)
            .first()
            .copied()
            .unwrap_or_default()
            .to_string()
    }

    fn chapter_id(&self, chapter_url: &str) -> String {
        match Self::segments(chapter_url)[..] {
            [ncode, number, ..] => format!("{}{}", ncode, number),
            _ => String::new(),
        }
    }

    fn next_chapter_url(&self, _content: &str, current_url: &str) -> Result<String, SourceError> {
        let [ncode, number, ..] = Self::segments(current_url)[..] else {
            return Err(SourceError::InvalidUrl(current_url.to_string()));
        };

        let number: u64 = number
            .parse()
            .map_err(|_| SourceError::InvalidUrl(format!("{}: chapter number", current_url)))?;

        let next = number
            .checked_add(1)
            .ok_or_else(|| SourceError::InvalidUrl(format!("{}: chapter number", current_url)))?;

        Ok(format!("https://{}/{}/{}/", HOST, ncode, next))
    }

    fn cover_image_url(&self, _content: &str) -> Result<String, SourceError> {
        Err(SourceError::NotFound("cover image".to_string()))
    }
}
