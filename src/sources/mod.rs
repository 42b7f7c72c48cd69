//! Source trait and registry for supported novel sites.
//!
//! Each source knows how to derive stable ids from its URLs, where the
//! "next chapter" link lives in a chapter page, and where the cover image
//! lives on a novel's landing page. Sources are pure functions of their
//! input; all network access happens in the fetcher.

mod doupo;
mod shuba;
mod shuhaige;
mod syosetu;
mod twkan;
mod yue;

pub use doupo::DoupoSource;
pub use shuba::ShubaSource;
pub use shuhaige::ShuhaigeSource;
pub use syosetu::SyosetuSource;
pub use twkan::TwkanSource;
pub use yue::YueSource;

use crate::error::SourceError;
use crate::models::SourceSite;
use scraper::{Html, Selector};
use std::sync::LazyLock;

/// Visible text of the "next chapter" link on Chinese sites.
pub(crate) const NEXT_CHAPTER_LABEL: &str = "下一章";

/// Per-site extraction strategy.
pub trait Source: Send + Sync {
    /// Returns the tag this source is registered under.
    fn tag(&self) -> &'static str;

    /// Returns the display name, home page and language of the site.
    fn site(&self) -> SourceSite;

    /// Derives the novel id from a novel URL, or an empty string if the URL
    /// doesn't have this site's shape.
    fn novel_id(&self, novel_url: &str) -> String;

    /// Derives the chapter id from a chapter URL, or an empty string if the
    /// URL doesn't have this site's shape.
    fn chapter_id(&self, chapter_url: &str) -> String;

    /// Locates the URL of the chapter following `current_url`.
    fn next_chapter_url(&self, content: &str, current_url: &str) -> Result<String, SourceError>;

    /// Locates the cover image on a novel landing page.
    fn cover_image_url(&self, content: &str) -> Result<String, SourceError>;
}

/// Registry of available sources, keyed by tag.
pub struct SourceRegistry {
    sources: Vec<Box<dyn Source>>,
}

impl SourceRegistry {
    /// Creates a new registry with all supported sources.
    pub fn new() -> Self {
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(ShubaSource),
            Box::new(YueSource),
            Box::new(ShuhaigeSource),
            Box::new(TwkanSource),
            Box::new(DoupoSource),
            Box::new(SyosetuSource),
        ];

        Self { sources }
    }

    /// Looks up a source by tag.
    pub fn get(&self, tag: &str) -> Option<&dyn Source> {
        self.sources
            .iter()
            .find(|s| s.tag() == tag)
            .map(|s| s.as_ref())
    }

    /// Returns the sites of all registered sources, in registration order.
    pub fn sites(&self) -> Vec<SourceSite> {
        self.sources.iter().map(|s| s.site()).collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// CSS selectors shared by the tree-walking sources.
struct Selectors {
    anchor: Selector,
    og_image: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    anchor: Selector::parse("a[href]").unwrap(),
    og_image: Selector::parse(r#"meta[property="og:image"]"#).unwrap(),
});

/// Builds the [`SourceSite`] description of a site.
pub(crate) fn site(tag: &str, url: &str, language: &str) -> SourceSite {
    SourceSite {
        id: tag.to_string(),
        name: tag.to_string(),
        url: url.to_string(),
        language: language.to_string(),
    }
}

/// Finds the `href` of the first anchor whose trimmed text equals `label`.
pub(crate) fn find_anchor_by_text(doc: &Html, label: &str) -> Option<String> {
    doc.select(&SELECTORS.anchor)
        .find(|a| a.text().map(str::trim).collect::<String>() == label)
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

/// Returns the `content` of the `og:image` meta tag.
pub(crate) fn meta_og_image(doc: &Html) -> Option<String> {
    doc.select(&SELECTORS.og_image)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

/// Scans raw markup for the first of `markers` and returns the `href` of the
/// closest `<a ` tag opened before it.
pub(crate) fn scan_marker_href<'a>(content: &'a str, markers: &[&str]) -> Option<&'a str> {
    let marker_idx = markers.iter().find_map(|m| content.find(m))?;

    let tag_start = content[..marker_idx].rfind("<a ")?;
    let tag_end = tag_start + content[tag_start..].find('>')?;
    let tag = &content[tag_start..tag_end];

    let href_start = tag.find("href=\"")? + "href=\"".len();
    let href_len = tag[href_start..].find('"')?;
    Some(&tag[href_start..href_start + href_len])
}

/// Resolves `href` against the scheme and host of `current_url`.
///
/// Absolute hrefs are returned unchanged. Relative ones are rooted at the
/// host whether or not they start with `/`.
pub(crate) fn resolve_on_host(current_url: &str, href: &str) -> Result<String, SourceError> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }

    let base = url::Url::parse(current_url)
        .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", current_url, e)))?;
    let host = base
        .host_str()
        .ok_or_else(|| SourceError::InvalidUrl(format!("{}: missing host", current_url)))?;

    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let path = if href.starts_with('/') {
        href.to_string()
    } else {
        format!("/{}", href)
    };

    Ok(format!("{}://{}{}", base.scheme(), authority, path))
}

/// Returns the part of `segment` before its extension, requiring one.
pub(crate) fn stem(segment: &str) -> Option<&str> {
    let (stem, _) = segment.split_once('.')?;
    Some(stem)
}
