//! OpenAI-compatible chat completions backend.
//!
//! Responses are streamed over SSE and accumulated, with the output shape
//! pinned by a `json_schema` response format.

use super::{
    CHAPTER_FIELDS, NOVEL_DETAILS_FIELDS, TranslationProvider, chapter_user_message, object_schema,
    parse_novel_details, parse_translated_chapter,
};
use crate::config::{ApiConfig, PromptsConfig, ProviderConfig};
use crate::error::ProviderError;
use crate::models::{NovelDetails, TranslatedChapter};
use crate::utils::{check_response_status, preview};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

/// Request body for the chat completions API.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
    response_format: Value,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<Delta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
    refusal: Option<String>,
}

/// Accumulates content from `data:` lines of a chat completions stream.
#[derive(Debug, Default)]
struct SseAccumulator {
    pending: Vec<u8>,
    content: String,
    refusal: String,
    finish_reason: Option<String>,
    done: bool,
}

impl SseAccumulator {
    /// Feeds raw bytes. Lines split across chunks, including multi-byte
    /// characters, are buffered until complete.
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.handle_line(String::from_utf8_lossy(&line).trim_end());
        }
    }

    fn finish(&mut self) {
        let rest = std::mem::take(&mut self.pending);
        self.handle_line(String::from_utf8_lossy(&rest).trim_end());
    }

    fn handle_line(&mut self, line: &str) {
        if self.done {
            return;
        }
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return;
        }

        if let Ok(chunk) = serde_json::from_str::<StreamChunk>(data) {
            for choice in chunk.choices {
                if let Some(delta) = choice.delta {
                    if let Some(content) = delta.content {
                        self.content.push_str(&content);
                    }
                    if let Some(refusal) = delta.refusal {
                        self.refusal.push_str(&refusal);
                    }
                }
                if choice.finish_reason.is_some() {
                    self.finish_reason = choice.finish_reason;
                }
            }
        }
    }

    fn into_text(self) -> Result<String, ProviderError> {
        if !self.refusal.trim().is_empty() {
            return Err(ProviderError::Refused(self.refusal));
        }
        if self.finish_reason.as_deref() == Some("content_filter") {
            return Err(ProviderError::Refused("content filtered".to_string()));
        }
        Ok(self.content)
    }
}

/// Translation provider for any OpenAI-compatible chat completions API.
pub struct OpenAiProvider {
    client: Client,
    api: ApiConfig,
    settings: ProviderConfig,
    prompts: PromptsConfig,
}

impl OpenAiProvider {
    /// Creates a provider. Blank base URL or model fall back to OpenAI's
    /// defaults.
    pub fn new(
        api: ApiConfig,
        settings: ProviderConfig,
        prompts: PromptsConfig,
    ) -> Result<Self, ProviderError> {
        if !api.is_configured() {
            return Err(ProviderError::InvalidConfig("OpenAI API key is not set".to_string()));
        }

        let defaults = ApiConfig::openai_default();
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

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: String,
        schema_name: &str,
        mut schema: Value,
    ) -> Result<String, ProviderError> {
        schema["additionalProperties"] = Value::Bool(false);

        let request = ChatRequest {
            model: self.api.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_message,
                },
            ],
            stream: true,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_output_tokens,
            response_format: json!({
                "type": "json_schema",
                "json_schema": { "name": schema_name, "strict": true, "schema": schema },
            }),
        };

        let url = format!("{}/chat/completions", self.api.base_url);
        debug!(model = %self.api.model, "sending chat completions request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api.key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;
        let response = check_response_status(response).await?;

        let mut accumulator = SseAccumulator::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            accumulator.push(&chunk?);
            if accumulator.done {
                break;
            }
        }
        accumulator.finish();

        let text = accumulator.into_text()?;
        debug!(output = %preview(&text, 200), "chat completions response");
        Ok(text)
    }
}

#[async_trait]
impl TranslationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn translate_novel_details(&self, raw_content: &str) -> Result<NovelDetails, ProviderError> {
        info!(chars = raw_content.chars().count(), "translating novel details");
        let output = self
            .complete(
                &self.prompts.novel_details,
                format!("Page content:\n{}", raw_content),
                "novel_details",
                object_schema(NOVEL_DETAILS_FIELDS, false),
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
            .complete(
                &self.prompts.chapter,
                chapter_user_message(known_genres, raw_content),
                "translated_chapter",
                object_schema(CHAPTER_FIELDS, false),
            )
            .await?;
        parse_translated_chapter(&output, known_genres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::header::CONTENT_TYPE;
    use axum::routing::post;

    fn sse_body(pieces: &[&str]) -> String {
        let mut body = String::new();
        for piece in pieces {
            let chunk = json!({ "choices": [{ "index": 0, "delta": { "content": piece } }] });
            body.push_str(&format!("data: {}\n\n", chunk));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    async fn spawn_openai(body: String) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move { ([(CONTENT_TYPE, "text/event-stream")], body) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn provider(base_url: String) -> OpenAiProvider {
        OpenAiProvider::new(
            ApiConfig {
                key: "sk-test".to_string(),
                base_url,
                model: "test-model".to_string(),
            },
            ProviderConfig::default(),
            PromptsConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_accumulator_handles_split_lines() {
        let body = sse_body(&["{\"a\":", "1}"]);
        let (head, tail) = body.split_at(body.len() / 2);

        let mut acc = SseAccumulator::default();
        acc.push(head.as_bytes());
        acc.push(tail.as_bytes());
        acc.finish();
        assert!(acc.done);
        assert_eq!(acc.into_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_accumulator_multibyte_split() {
        let body = sse_body(&["第一章"]);
        let bytes = body.as_bytes();
        let cut = body.find('第').unwrap() + 1;

        let mut acc = SseAccumulator::default();
        acc.push(&bytes[..cut]);
        acc.push(&bytes[cut..]);
        acc.finish();
        assert_eq!(acc.into_text().unwrap(), "第一章");
    }

    #[test]
    fn test_accumulator_refusal() {
        let mut acc = SseAccumulator::default();
        acc.push(b"data: {\"choices\":[{\"delta\":{\"refusal\":\"I can't help\"}}]}\n");
        acc.finish();
        assert!(matches!(acc.into_text(), Err(ProviderError::Refused(_))));

        let mut acc = SseAccumulator::default();
        acc.push(b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"content_filter\"}]}\n");
        acc.finish();
        assert!(matches!(acc.into_text(), Err(ProviderError::Refused(_))));
    }

    #[tokio::test]
    async fn test_streamed_novel_details() {
        let output = json!({
            "novel_title_original": "転生したらスライムだった件",
            "novel_title_translated": "That Time I Got Reincarnated as a Slime",
            "novel_summary_translated": "<p>A slime.</p>",
            "novel_author_name_translated": "Fuse",
            "possible_novel_genres": ["Fantasy"],
            "number_of_chapters": 304,
            "status": "Completed"
        })
        .to_string();
        let mid = output.find(',').unwrap() + 1;
        let (first, second) = output.split_at(mid);
        let base = spawn_openai(sse_body(&[first, second])).await;

        let details = provider(base).translate_novel_details("page").await.unwrap();
        assert_eq!(details.title_translated, "That Time I Got Reincarnated as a Slime");
        assert_eq!(details.number_of_chapters, 304);
    }

    #[tokio::test]
    async fn test_streamed_garbage_is_malformed() {
        let base = spawn_openai(sse_body(&["Here is your translation: ", "Chapter 1"])).await;

        let err = provider(base)
            .translate_novel_chapter(&[], "chapter")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));
    }
}
