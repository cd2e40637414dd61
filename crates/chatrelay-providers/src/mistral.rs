//! Mistral adapter.
//!
//! Mistral's chat API is OpenAI-compatible on the wire (same request body
//! and streaming chunk shape), so this adapter reuses the shared SSE
//! decoding and differs only in base URL and request defaults.

use async_trait::async_trait;
use tracing::{debug, error};

use chatrelay_core::config::ProviderSettings;
use chatrelay_core::types::{ChatCompletionRequest, ChatCompletionResponse};
use chatrelay_core::ChatMessage;

use crate::openai::sse_delta_stream;
use crate::traits::{with_system_instruction, ChatProvider, DeltaStream, ProviderError};

const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";
const MAX_TOKENS: u32 = 4000;

/// Adapter for the Mistral chat completions API.
pub struct MistralProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for MistralProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl MistralProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        let api_base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        MistralProvider {
            client: reqwest::Client::new(),
            api_base,
            api_key: settings.api_key.clone(),
        }
    }

    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn build_request(&self, messages: &[ChatMessage], model: &str, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: with_system_instruction(messages),
            stream,
            max_tokens: Some(MAX_TOKENS),
            temperature: None,
        }
    }

    async fn send(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!(provider = "Mistral", status = %status, body = %message, "API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for MistralProvider {
    async fn stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<DeltaStream, ProviderError> {
        let body = self.build_request(messages, model, true);

        debug!(provider = "Mistral", model, messages = body.messages.len(), "starting stream");
        let response = self.send(&body).await?;

        Ok(sse_delta_stream(response, "Mistral"))
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, ProviderError> {
        let body = self.build_request(messages, model, false);

        debug!(provider = "Mistral", model, "completion request");
        let response = self.send(&body).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        parsed
            .message_content()
            .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))
    }

    fn display_name(&self) -> &'static str {
        "Mistral"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
