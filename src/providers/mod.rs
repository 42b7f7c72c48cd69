//! Translation providers.
//!
//! A provider turns raw page content into structured, translated records.
//! Backends differ only in how they talk to their model; every response goes
//! through the same validation in this module before it reaches the
//! pipeline, so malformed output is an error rather than a partial record.

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::{Config, ProviderBackend};
use crate::error::ProviderError;
use crate::models::{NovelDetails, NovelStatus, TranslatedChapter};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};

/// Two-operation contract the pipeline depends on.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Returns the backend name, for logs.
    fn name(&self) -> &'static str;

    /// Extracts and translates the details on a novel landing page.
    async fn translate_novel_details(&self, raw_content: &str) -> Result<NovelDetails, ProviderError>;

    /// Translates one chapter, reporting only genres absent from `known_genres`.
    async fn translate_novel_chapter(
        &self,
        known_genres: &[String],
        raw_content: &str,
    ) -> Result<TranslatedChapter, ProviderError>;
}

/// Builds the provider selected in the configuration.
pub fn build_provider(config: &Config) -> Result<Arc<dyn TranslationProvider>, ProviderError> {
    let provider: Arc<dyn TranslationProvider> = match config.provider.backend {
        ProviderBackend::Gemini => Arc::new(GeminiProvider::new(
            config.gemini.clone(),
            config.provider.clone(),
            config.prompts.clone(),
        )?),
        ProviderBackend::OpenAi => Arc::new(OpenAiProvider::new(
            config.openai.clone(),
            config.provider.clone(),
            config.prompts.clone(),
        )?),
    };
    Ok(provider)
}

/// Refusal phrases that indicate the model declined to translate.
static REFUSAL_PHRASES: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    vec![
        "i'm sorry",
        "i cannot",
        "i can't",
        "i am unable",
        "as an ai",
        "my apologies",
        "i am not programmed",
        "i do not have the ability",
    ]
});

/// Matches output wrapped in a Markdown code fence.
static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").unwrap());

static FIRST_INTEGER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Shape of a field in a structured-output schema.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldKind {
    String,
    Integer,
    StringArray,
}

/// One property of a structured-output schema.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SchemaField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

pub(crate) const NOVEL_DETAILS_FIELDS: &[SchemaField] = &[
    SchemaField {
        name: "novel_title_original",
        kind: FieldKind::String,
        description: "Original title in the source language",
    },
    SchemaField {
        name: "novel_title_translated",
        kind: FieldKind::String,
        description: "Translated title in English",
    },
    SchemaField {
        name: "novel_summary_translated",
        kind: FieldKind::String,
        description: "Translated summary in English as HTML paragraphs",
    },
    SchemaField {
        name: "novel_author_name_translated",
        kind: FieldKind::String,
        description: "Author name in English",
    },
    SchemaField {
        name: "possible_novel_genres",
        kind: FieldKind::StringArray,
        description: "List of possible genres for the novel",
    },
    SchemaField {
        name: "number_of_chapters",
        kind: FieldKind::Integer,
        description: "Total number of chapters in the original",
    },
    SchemaField {
        name: "status",
        kind: FieldKind::String,
        description: "One of Ongoing, Completed or Unknown",
    },
];

pub(crate) const CHAPTER_FIELDS: &[SchemaField] = &[
    SchemaField {
        name: "translated_chapter_title",
        kind: FieldKind::String,
        description: "The translated title of the chapter",
    },
    SchemaField {
        name: "original_chapter_title",
        kind: FieldKind::String,
        description: "The original title in the source language",
    },
    SchemaField {
        name: "translated_chapter_contents",
        kind: FieldKind::String,
        description: "The full translated chapter as HTML paragraphs",
    },
    SchemaField {
        name: "possible_new_genres",
        kind: FieldKind::StringArray,
        description: "Genres detected that aren't already known, empty if none",
    },
];

/// Renders an object schema. Gemini spells types in upper case, JSON Schema
/// in lower case.
pub(crate) fn object_schema(fields: &[SchemaField], upper_case_types: bool) -> Value {
    let ty = |name: &str| {
        if upper_case_types {
            name.to_uppercase()
        } else {
            name.to_string()
        }
    };

    let mut properties = serde_json::Map::new();
    for field in fields {
        let property = match field.kind {
            FieldKind::String => json!({ "type": ty("string"), "description": field.description }),
            FieldKind::Integer => json!({ "type": ty("integer"), "description": field.description }),
            FieldKind::StringArray => json!({
                "type": ty("array"),
                "description": field.description,
                "items": { "type": ty("string") },
            }),
        };
        properties.insert(field.name.to_string(), property);
    }

    let required: Vec<&str> = fields.iter().map(|f| f.name).collect();
    json!({
        "type": ty("object"),
        "properties": properties,
        "required": required,
    })
}

/// Builds the user message for a chapter translation.
pub(crate) fn chapter_user_message(known_genres: &[String], raw_content: &str) -> String {
    let known = if known_genres.is_empty() {
        "(none)".to_string()
    } else {
        known_genres.join(", ")
    };
    format!(
        "Currently known novel genres: {}\n\nChapter content in the source language:\n{}",
        known, raw_content
    )
}

/// Chapter count as models report it: a number or free text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChapterCount {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Default for ChapterCount {
    fn default() -> Self {
        ChapterCount::Integer(0)
    }
}

impl ChapterCount {
    fn coerce(self) -> i64 {
        match self {
            ChapterCount::Integer(n) => n.max(0),
            ChapterCount::Float(f) if f.is_finite() && f > 0.0 => f as i64,
            ChapterCount::Float(_) => 0,
            ChapterCount::Text(text) => FIRST_INTEGER_REGEX
                .find(&text)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNovelDetails {
    novel_title_original: String,
    novel_title_translated: String,
    novel_summary_translated: String,
    #[serde(default)]
    novel_author_name_translated: String,
    #[serde(default)]
    possible_novel_genres: Vec<String>,
    #[serde(default)]
    number_of_chapters: ChapterCount,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawTranslatedChapter {
    translated_chapter_title: String,
    #[serde(default)]
    original_chapter_title: String,
    translated_chapter_contents: String,
    #[serde(default)]
    possible_new_genres: Vec<String>,
}

/// Strips a surrounding Markdown code fence, if any.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    CODE_FENCE_REGEX
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed)
}

/// Rejects empty output and output that opens with a refusal.
fn check_refusal(text: &str) -> Result<(), ProviderError> {
    if text.is_empty() {
        return Err(ProviderError::Refused("Empty response".to_string()));
    }

    let lower = text.to_lowercase();
    for phrase in REFUSAL_PHRASES.iter() {
        if lower.starts_with(phrase) {
            return Err(ProviderError::Refused(format!(
                "Response starts with refusal phrase: {}",
                phrase
            )));
        }
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ProviderError> {
    if value.trim().is_empty() {
        return Err(ProviderError::MalformedOutput(format!("{} is empty", field)));
    }
    Ok(())
}

fn clean_genres(genres: Vec<String>) -> Vec<String> {
    genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect()
}

/// Validates model output for a novel landing page.
pub(crate) fn parse_novel_details(output: &str) -> Result<NovelDetails, ProviderError> {
    let body = strip_code_fence(output);
    check_refusal(body)?;

    let raw: RawNovelDetails = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedOutput(format!("novel details: {}", e)))?;

    require_non_empty("novel_title_translated", &raw.novel_title_translated)?;

    Ok(NovelDetails {
        title_original: raw.novel_title_original.trim().to_string(),
        title_translated: raw.novel_title_translated.trim().to_string(),
        summary_translated: raw.novel_summary_translated,
        author_translated: raw.novel_author_name_translated.trim().to_string(),
        genres: clean_genres(raw.possible_novel_genres),
        number_of_chapters: raw.number_of_chapters.coerce(),
        status: NovelStatus::classify(&raw.status),
    })
}

/// Validates model output for a chapter, dropping genres already known.
pub(crate) fn parse_translated_chapter(
    output: &str,
    known_genres: &[String],
) -> Result<TranslatedChapter, ProviderError> {
    let body = strip_code_fence(output);
    check_refusal(body)?;

    let raw: RawTranslatedChapter = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedOutput(format!("chapter: {}", e)))?;

    require_non_empty("translated_chapter_title", &raw.translated_chapter_title)?;
    require_non_empty("translated_chapter_contents", &raw.translated_chapter_contents)?;

    let new_genres = clean_genres(raw.possible_new_genres)
        .into_iter()
        .filter(|g| !known_genres.contains(g))
        .collect();

    Ok(TranslatedChapter {
        title_translated: raw.translated_chapter_title.trim().to_string(),
        title_original: raw.original_chapter_title.trim().to_string(),
        content_translated: raw.translated_chapter_contents,
        new_genres,
    })
}
