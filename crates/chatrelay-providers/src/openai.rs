//! OpenAI adapter — streaming and non-streaming chat completions.
//!
//! Also home to the shared OpenAI-format SSE decoding used by every
//! compatible backend (Mistral speaks the same chunk shape).

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use tracing::{debug, error, warn};

use chatrelay_core::config::ProviderSettings;
use chatrelay_core::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};
use chatrelay_core::ChatMessage;

use crate::traits::{with_system_instruction, ChatProvider, DeltaStream, ProviderError};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Adapter for the OpenAI chat completions API.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        let api_base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        OpenAiProvider {
            client: reqwest::Client::new(),
            api_base,
            api_key: settings.api_key.clone(),
        }
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
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
            error!(provider = "OpenAI", status = %status, body = %message, "API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<DeltaStream, ProviderError> {
        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: with_system_instruction(messages),
            stream: true,
            max_tokens: None,
            temperature: None,
        };

        debug!(provider = "OpenAI", model, messages = body.messages.len(), "starting stream");
        let response = self.send(&body).await?;

        Ok(sse_delta_stream(response, "OpenAI"))
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: model.to_string(),
            messages: with_system_instruction(messages),
            stream: false,
            max_tokens: None,
            temperature: None,
        };

        debug!(provider = "OpenAI", model, "completion request");
        let response = self.send(&body).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        parsed
            .message_content()
            .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))
    }

    fn display_name(&self) -> &'static str {
        "OpenAI"
    }
}

// ─────────────────────────────────────────────
// OpenAI-format SSE decoding (shared with Mistral)
// ─────────────────────────────────────────────

/// Decode an OpenAI-format SSE response into a stream of text deltas.
///
/// Each `data:` line holds one chunk JSON; `data: [DONE]` ends the
/// stream. Chunks without content (role announcements, finish markers)
/// are skipped; unparsable chunks are logged and skipped; an SSE decode
/// failure yields one `Err` item and terminates the sequence.
pub(crate) fn sse_delta_stream(response: reqwest::Response, provider: &'static str) -> DeltaStream {
    let events = Box::pin(response.bytes_stream().eventsource());

    let stream = futures::stream::unfold(Some(events), move |state| async move {
        let mut events = state?;
        loop {
            let event = events.next().await?;

            let event = match event {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(provider, error = %e, "SSE decode error");
                    return Some((Err(ProviderError::Malformed(e.to_string())), None));
                }
            };

            if event.data == "[DONE]" {
                return None;
            }

            match serde_json::from_str::<ChatCompletionChunk>(&event.data) {
                Ok(chunk) => {
                    if let Some(text) = chunk.delta_content() {
                        return Some((Ok(text), Some(events)));
                    }
                }
                Err(e) => {
                    warn!(provider, error = %e, "skipping malformed stream chunk");
                }
            }
        }
    });

    Box::pin(stream)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_settings(api_key: &str, api_base: &str) -> ProviderSettings {
        ProviderSettings {
            api_key: api_key.to_string(),
            api_base: Some(api_base.to_string()),
        }
    }

    async fn collect(mut stream: DeltaStream) -> (Vec<String>, Option<ProviderError>) {
        let mut fragments = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => fragments.push(text),
                Err(e) => return (fragments, Some(e)),
            }
        }
        (fragments, None)
    }

    fn sse_body(chunks: &[&str]) -> String {
        let mut body = String::new();
        for chunk in chunks {
            body.push_str(&format!("data: {chunk}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[test]
    fn test_completions_url_trailing_slash() {
        let provider = OpenAiProvider::new(&make_settings("key", "https://api.openai.com/v1/"));
        assert_eq!(
            provider.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_default_api_base() {
        let provider = OpenAiProvider::new(&ProviderSettings {
            api_key: "key".to_string(),
            api_base: None,
        });
        assert_eq!(provider.api_base, "https://api.openai.com/v1");
    }

    #[tokio::test]
    async fn test_stream_success() {
        let mock_server = MockServer::start().await;

        let body = sse_body(&[
            r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{"content":"lo!"},"finish_reason":null}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ]);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key-123"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "stream": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(&make_settings("test-key-123", &mock_server.uri()));
        let stream = provider
            .stream(&[ChatMessage::user("Hello")], "gpt-4o")
            .await
            .unwrap();

        let (fragments, err) = collect(stream).await;
        assert!(err.is_none());
        assert_eq!(fragments, vec!["Hel", "lo!"]);
    }

    #[tokio::test]
    async fn test_stream_skips_malformed_chunk() {
        let mock_server = MockServer::start().await;

        let body = sse_body(&[
            r#"{"choices":[{"delta":{"content":"ok"},"finish_reason":null}]}"#,
            "this is not json",
            r#"{"choices":[{"delta":{"content":"!"},"finish_reason":null}]}"#,
        ]);

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(&make_settings("key", &mock_server.uri()));
        let stream = provider
            .stream(&[ChatMessage::user("hi")], "gpt-4o")
            .await
            .unwrap();

        let (fragments, err) = collect(stream).await;
        assert!(err.is_none());
        assert_eq!(fragments, vec!["ok", "!"]);
    }

    #[tokio::test]
    async fn test_stream_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded", "type": "rate_limit_error" }
            })))
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(&make_settings("key", &mock_server.uri()));
        let result = provider.stream(&[ChatMessage::user("hi")], "gpt-4o").await;

        match result {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert!(message.contains("Rate limit exceeded"));
            }
            Ok(_) => panic!("expected Api error, got Ok(stream)"),
            Err(other) => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_network_error() {
        // Point to a port that's not listening
        let provider = OpenAiProvider::new(&make_settings("key", "http://127.0.0.1:1"));
        let result = provider.stream(&[ChatMessage::user("hi")], "gpt-4o").await;

        assert!(matches!(result, Err(ProviderError::Http(_))));
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": { "content": "A short title" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(&make_settings("key", &mock_server.uri()));
        let text = provider
            .complete(&[ChatMessage::user("summarize")], "gpt-4o")
            .await
            .unwrap();

        assert_eq!(text, "A short title");
    }

    #[tokio::test]
    async fn test_complete_empty_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&mock_server)
            .await;

        let provider = OpenAiProvider::new(&make_settings("key", &mock_server.uri()));
        let result = provider.complete(&[ChatMessage::user("hi")], "gpt-4o").await;

        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }
}
