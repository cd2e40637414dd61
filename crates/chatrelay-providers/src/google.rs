//! Google adapter — Gemini `generateContent` / `streamGenerateContent`.
//!
//! Gemini is prompted with the whole conversation flattened into a single
//! "Human:/Assistant:"-prefixed text block; the system prompt (or the
//! default fence instruction) becomes the preamble.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use chatrelay_core::config::ProviderSettings;
use chatrelay_core::ChatMessage;

use crate::traits::{ChatProvider, DeltaStream, ProviderError, CODE_FENCE_INSTRUCTION};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const MAX_OUTPUT_TOKENS: u32 = 4000;
const TEMPERATURE: f64 = 0.7;

/// Adapter for the Gemini API.
pub struct GoogleProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        let api_base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        GoogleProvider {
            client: reqwest::Client::new(),
            api_base,
            api_key: settings.api_key.clone(),
        }
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/models/{}:{}", base, model, action)
    }

    async fn send(
        &self,
        url: String,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!(provider = "Google", status = %status, body = %message, "API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    async fn stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<DeltaStream, ProviderError> {
        let body = GenerateContentRequest::from_messages(messages);
        let url = format!("{}?alt=sse", self.model_url(model, "streamGenerateContent"));

        debug!(provider = "Google", model, "starting stream");
        let response = self.send(url, &body).await?;

        let events = Box::pin(response.bytes_stream().eventsource());

        let stream = futures::stream::unfold(Some(events), |state| async move {
            let mut events = state?;
            loop {
                let event = events.next().await?;

                let event = match event {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(provider = "Google", error = %e, "SSE decode error");
                        return Some((Err(ProviderError::Malformed(e.to_string())), None));
                    }
                };

                match serde_json::from_str::<GenerateContentResponse>(&event.data) {
                    Ok(chunk) => {
                        if let Some(text) = chunk.text().filter(|t| !t.is_empty()) {
                            return Some((Ok(text), Some(events)));
                        }
                    }
                    Err(e) => {
                        warn!(provider = "Google", error = %e, "skipping malformed stream chunk");
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, ProviderError> {
        let body = GenerateContentRequest::from_messages(messages);
        let url = self.model_url(model, "generateContent");

        debug!(provider = "Google", model, "completion request");
        let response = self.send(url, &body).await?;
        let parsed: GenerateContentResponse = response.json().await?;

        parsed
            .text()
            .ok_or_else(|| ProviderError::Malformed("no candidate text in response".to_string()))
    }

    fn display_name(&self) -> &'static str {
        "Google"
    }
}

// ─────────────────────────────────────────────
// Prompt flattening
// ─────────────────────────────────────────────

/// Flatten the conversation into one prompt string.
///
/// The system message (or the default fence instruction) leads, then each
/// turn is prefixed with "Human: " or "Assistant: " and joined with blank
/// lines.
fn flatten_prompt(messages: &[ChatMessage]) -> String {
    let mut preamble = None;
    let mut turns = Vec::new();

    for msg in messages {
        match msg {
            ChatMessage::System { content } => preamble = Some(content.clone()),
            ChatMessage::User { content } => turns.push(format!("Human: {content}")),
            ChatMessage::Assistant { content } => turns.push(format!("Assistant: {content}")),
        }
    }

    let preamble = preamble.unwrap_or_else(|| CODE_FENCE_INSTRUCTION.to_string());
    if turns.is_empty() {
        preamble
    } else {
        format!("{preamble}\n\n{}", turns.join("\n\n"))
    }
}

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_messages(messages: &[ChatMessage]) -> Self {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: flatten_prompt(messages),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

/// Response shape shared by streaming chunks and full completions.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let content = candidate.content?;
        if content.parts.is_empty() {
            return None;
        }
        Some(
            content
                .parts
                .into_iter()
                .map(|p| p.text)
                .collect::<String>(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
