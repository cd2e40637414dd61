//! Anthropic adapter — the messages API.
//!
//! Anthropic takes the system prompt as a separate top-level parameter,
//! so in-band system messages are hoisted out of the turn list (last one
//! wins). Text arrives as `content_block_delta` events carrying a
//! `text_delta`.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use chatrelay_core::config::ProviderSettings;
use chatrelay_core::ChatMessage;

use crate::traits::{ChatProvider, DeltaStream, ProviderError, CODE_FENCE_INSTRUCTION};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4000;

/// Adapter for the Anthropic messages API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        let api_base = settings
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        AnthropicProvider {
            client: reqwest::Client::new(),
            api_base,
            api_key: settings.api_key.clone(),
        }
    }

    fn messages_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/messages", base)
    }

    async fn send(&self, body: &MessagesRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            error!(provider = "Anthropic", status = %status, body = %message, "API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<DeltaStream, ProviderError> {
        let body = build_request(messages, model, true);

        debug!(provider = "Anthropic", model, turns = body.messages.len(), "starting stream");
        let response = self.send(&body).await?;

        let events = Box::pin(response.bytes_stream().eventsource());

        let stream = futures::stream::unfold(Some(events), |state| async move {
            let mut events = state?;
            loop {
                let event = events.next().await?;

                let event = match event {
                    Ok(ev) => ev,
                    Err(e) => {
                        warn!(provider = "Anthropic", error = %e, "SSE decode error");
                        return Some((Err(ProviderError::Malformed(e.to_string())), None));
                    }
                };

                match serde_json::from_str::<StreamEvent>(&event.data) {
                    Ok(StreamEvent::ContentBlockDelta { delta }) => {
                        if delta.kind == "text_delta" {
                            if let Some(text) = delta.text.filter(|t| !t.is_empty()) {
                                return Some((Ok(text), Some(events)));
                            }
                        }
                    }
                    Ok(StreamEvent::MessageStop) => return None,
                    Ok(StreamEvent::Error { error }) => {
                        error!(
                            provider = "Anthropic",
                            kind = %error.error_type,
                            message = %error.message,
                            "stream error event"
                        );
                        let reason = format!("{}: {}", error.error_type, error.message);
                        return Some((Err(ProviderError::Malformed(reason)), None));
                    }
                    Ok(StreamEvent::Other) => {}
                    Err(e) => {
                        warn!(provider = "Anthropic", error = %e, "skipping malformed stream event");
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
        let body = build_request(messages, model, false);

        debug!(provider = "Anthropic", model, "completion request");
        let response = self.send(&body).await?;
        let parsed: MessagesResponse = response.json().await?;

        parsed
            .text()
            .ok_or_else(|| ProviderError::Malformed("no text content in response".to_string()))
    }

    fn display_name(&self) -> &'static str {
        "Anthropic"
    }
}

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

/// Request body for the messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Turn>,
    stream: bool,
}

/// A user/assistant turn (system never appears here).
#[derive(Debug, PartialEq, Serialize)]
struct Turn {
    role: &'static str,
    content: String,
}

/// Convert canonical messages into the messages-API shape, hoisting the
/// system prompt out of the turn list.
fn build_request(messages: &[ChatMessage], model: &str, stream: bool) -> MessagesRequest {
    let mut system = None;
    let mut turns = Vec::new();

    for msg in messages {
        match msg {
            ChatMessage::System { content } => system = Some(content.clone()),
            ChatMessage::User { content } => turns.push(Turn {
                role: "user",
                content: content.clone(),
            }),
            ChatMessage::Assistant { content } => turns.push(Turn {
                role: "assistant",
                content: content.clone(),
            }),
        }
    }

    MessagesRequest {
        model: model.to_string(),
        max_tokens: MAX_TOKENS,
        system: system.unwrap_or_else(|| CODE_FENCE_INSTRUCTION.to_string()),
        messages: turns,
        stream,
    }
}

/// One SSE event of a streaming response.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: ContentDelta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessagesResponse {
    /// The first text block, if any.
    fn text(self) -> Option<String> {
        self.content.into_iter().find_map(|block| {
            (block.kind == "text").then_some(block.text).flatten()
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_settings(api_key: &str, api_base: &str) -> ProviderSettings {
        ProviderSettings {
            api_key: api_key.to_string(),
            api_base: Some(api_base.to_string()),
        }
    }

    // ── Request building ──

    #[test]
    fn test_system_message_hoisted() {
        let messages = vec![
            ChatMessage::system("Talk like a pirate."),
            ChatMessage::user("Hello"),
            ChatMessage::assistant("Ahoy!"),
            ChatMessage::user("Bye"),
        ];
        let request = build_request(&messages, "claude-3-5-sonnet-20241022", true);

        assert_eq!(request.system, "Talk like a pirate.");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "user");
        assert_eq!(request.messages[1].role, "assistant");
    }

    #[test]
    fn test_last_system_message_wins() {
        let messages = vec![
            ChatMessage::system("first"),
            ChatMessage::user("hi"),
            ChatMessage::system("second"),
        ];
        let request = build_request(&messages, "claude-3-5-sonnet-20241022", false);

        assert_eq!(request.system, "second");
        assert_eq!(request.messages.len(), 1);
    }

    #[test]
    fn test_default_system_is_fence_instruction() {
        let request = build_request(&[ChatMessage::user("hi")], "claude-3-5-sonnet-20241022", true);
        assert!(request.system.contains("triple backticks"));
    }

    #[test]
    fn test_request_serialization() {
        let request = build_request(&[ChatMessage::user("hi")], "claude-3-5-sonnet-20241022", true);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(json["max_tokens"], 4000);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        // System must be top-level, never a message
        assert!(json["system"].is_string());
    }

    // ── Streaming ──

    #[tokio::test]
    async fn test_stream_success() {
        let mock_server = MockServer::start().await;

        let body = concat!(
            "event: message_start\n",
            r#"data: {"type":"message_start","message":{"id":"msg_1"}}"#,
            "\n\n",
            "event: content_block_delta\n",
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#,
            "\n\n",
            "event: content_block_delta\n",
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo!"}}"#,
            "\n\n",
            "event: message_stop\n",
            r#"data: {"type":"message_stop"}"#,
            "\n\n",
        );

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(&make_settings("sk-ant-test", &mock_server.uri()));
        let mut stream = provider
            .stream(&[ChatMessage::user("Hello")], "claude-3-5-sonnet-20241022")
            .await
            .unwrap();

        let mut fragments = Vec::new();
        while let Some(item) = stream.next().await {
            fragments.push(item.unwrap());
        }
        assert_eq!(fragments, vec!["Hel", "lo!"]);
    }

    #[tokio::test]
    async fn test_stream_error_event_terminates() {
        let mock_server = MockServer::start().await;

        let body = concat!(
            "event: content_block_delta\n",
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"par"}}"#,
            "\n\n",
            "event: error\n",
            r#"data: {"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
            "\n\n",
        );

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(&make_settings("key", &mock_server.uri()));
        let mut stream = provider
            .stream(&[ChatMessage::user("hi")], "claude-3-5-sonnet-20241022")
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "par");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
        assert!(err.to_string().contains("Overloaded"));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })))
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(&make_settings("bad-key", &mock_server.uri()));
        let result = provider
            .stream(&[ChatMessage::user("hi")], "claude-3-5-sonnet-20241022")
            .await;

        assert!(matches!(result, Err(ProviderError::Api { status: 401, .. })));
    }

    // ── Completion ──

    #[tokio::test]
    async fn test_complete_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": [{ "type": "text", "text": "Ahoy there!" }],
                "stop_reason": "end_turn"
            })))
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(&make_settings("key", &mock_server.uri()));
        let text = provider
            .complete(&[ChatMessage::user("hi")], "claude-3-5-sonnet-20241022")
            .await
            .unwrap();

        assert_eq!(text, "Ahoy there!");
    }

    #[tokio::test]
    async fn test_complete_no_text_blocks() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": []
            })))
            .mount(&mock_server)
            .await;

        let provider = AnthropicProvider::new(&make_settings("key", &mock_server.uri()));
        let result = provider
            .complete(&[ChatMessage::user("hi")], "claude-3-5-sonnet-20241022")
            .await;

        assert!(matches!(result, Err(ProviderError::Malformed(_))));
    }
}
