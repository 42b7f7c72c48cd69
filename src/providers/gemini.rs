//! Gemini backend using the `generateContent` REST endpoint with a response
//! schema.

use super::{
    CHAPTER_FIELDS, NOVEL_DETAILS_FIELDS, TranslationProvider, chapter_user_message, object_schema,
    parse_novel_details, parse_translated_chapter,
};
use crate::config::{ApiConfig, PromptsConfig, ProviderConfig};
use crate::error::ProviderError;
use crate::models::{NovelDetails, TranslatedChapter};
use crate::utils::{check_response_status, preview};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const RESPONSE_MIME_TYPE: &str = "application/json";

/// Finish reasons that mean the model stopped for policy reasons.
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenates the text of the first candidate.
    fn into_text(self) -> Result<String, ProviderError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Refused(format!("prompt blocked: {}", reason)));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedOutput("no candidates in response".to_string()))?;

        if let Some(reason) = candidate.finish_reason.as_deref()
            && BLOCKED_FINISH_REASONS.contains(&reason)
        {
            return Err(ProviderError::Refused(format!("generation stopped: {}", reason)));
        }

        Ok(candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<String>())
    }
}

/// Translation provider backed by Google's Gemini API.
pub struct GeminiProvider {
    client: Client,
    api: ApiConfig,
    settings: ProviderConfig,
    prompts: PromptsConfig,
}

impl GeminiProvider {
    /// Creates a provider. Blank base URL or model fall back to Gemini's
    /// defaults.
    pub fn new(
        api: ApiConfig,
        settings: ProviderConfig,
        prompts: PromptsConfig,
    ) -> Result<Self, ProviderError> {
        if !api.is_configured() {
            return Err(ProviderError::InvalidConfig("Gemini API key is not set".to_string()));
        }

        let defaults = ApiConfig::gemini_default();
        let api = ApiConfig {
            base_url: if api.base_url.trim().is_empty() {
                defaults.base_url
            } else {
                api.base_url.trim_end_matches('/').to_string()
            },
            model: if api.model.trim().is_empty() {
                defaults.model
            } else {
                api.model
            },
            key: api.key,
        };

        let mut builder = Client::builder();
        if settings.timeout_sec > 0 {
            builder = builder.timeout(Duration::from_secs(settings.timeout_sec));
        }

        Ok(Self {
            client: builder.build()?,
            api,
            settings,
            prompts,
        })
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_message: String,
        schema: Value,
    ) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: user_message }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
                response_mime_type: RESPONSE_MIME_TYPE,
                response_schema: schema,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.api.base_url, self.api.model
        );
        debug!(model = %self.api.model, "sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api.key)
            .json(&request)
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let body: GenerateResponse = response.json().await?;
        let text = body.into_text()?;
        debug!(output = %preview(&text, 200), "Gemini response");
        Ok(text)
    }
}

#[async_trait]
impl TranslationProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn translate_novel_details(&self, raw_content: &str) -> Result<NovelDetails, ProviderError> {
        info!(chars = raw_content.chars().count(), "translating novel details");
        let output = self
            .generate(
                &self.prompts.novel_details,
                format!("Page content:\n{}", raw_content),
                object_schema(NOVEL_DETAILS_FIELDS, true),
            )
            .await?;
        parse_novel_details(&output)
    }

    async fn translate_novel_chapter(
        &self,
        known_genres: &[String],
        raw_content: &str,
    ) -> Result<TranslatedChapter, ProviderError> {
        info!(chars = raw_content.chars().count(), "translating chapter");
        let output = self
            .generate(
                &self.prompts.chapter,
                chapter_user_message(known_genres, raw_content),
                object_schema(CHAPTER_FIELDS, true),
            )
            .await?;
        parse_translated_chapter(&output, known_genres)
    }
}
