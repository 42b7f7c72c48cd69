//! Domain records, provider payloads and request bodies.
//!
//! Field names on the serialized forms are part of the HTTP contract and
//! must not change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status of a novel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NovelStatus {
    Ongoing,
    Completed,
    #[default]
    Unknown,
}

impl NovelStatus {
    /// Returns the canonical string form stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            NovelStatus::Ongoing => "Ongoing",
            NovelStatus::Completed => "Completed",
            NovelStatus::Unknown => "Unknown",
        }
    }

    /// Classifies free text reported by a model or stored by an older
    /// version into one of the three statuses.
    pub fn classify(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        const ONGOING: &[&str] = &["ongoing", "serializing", "serialising", "in progress", "连载", "連載"];
        const COMPLETED: &[&str] = &["completed", "complete", "finished", "ended", "完结", "完結", "完本"];

        if ONGOING.iter().any(|word| lower.contains(word)) {
            NovelStatus::Ongoing
        } else if COMPLETED.iter().any(|word| lower.contains(word)) {
            NovelStatus::Completed
        } else {
            NovelStatus::Unknown
        }
    }
}

impl fmt::Display for NovelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NovelStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::classify(s))
    }
}

/// A novel as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Novel {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub original_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cover: String,
    pub source: String,
    pub url: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default)]
    pub status: NovelStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub chapters_count: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_read_chapter_number: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_read_timestamp: i64,
    pub last_updated: i64,
    pub date_added: i64,
}

/// A translated chapter.
///
/// `next_chapter_url` is the forward pointer to the following chapter; an
/// empty string means it hasn't been discovered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub novel_id: String,
    pub number: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub original_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    pub date_translated: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub word_count: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_chapter_url: String,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Novel landing-page details as returned by a translation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NovelDetails {
    pub title_original: String,
    pub title_translated: String,
    pub summary_translated: String,
    pub author_translated: String,
    pub genres: Vec<String>,
    pub number_of_chapters: i64,
    pub status: NovelStatus,
}

/// A chapter translation as returned by a translation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedChapter {
    pub title_translated: String,
    pub title_original: String,
    pub content_translated: String,
    pub new_genres: Vec<String>,
}

/// Body of `POST /novels/translate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NovelExtractionRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub html_content: Option<String>,
}

/// Body of the two chapter translation endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChapterTranslationRequest {
    #[serde(default)]
    pub novel_id: String,
    #[serde(default)]
    pub chapter_url: String,
    #[serde(default)]
    pub html_content: Option<String>,
}

/// Body of `POST /novels/refresh`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NovelRefreshRequest {
    #[serde(default)]
    pub novel_id: String,
    #[serde(default)]
    pub html_content: Option<String>,
}

/// A supported source website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSite {
    pub id: String,
    pub name: String,
    pub url: String,
    pub language: String,
}

/// Library-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub novel_count: i64,
    pub chapter_count: i64,
}
