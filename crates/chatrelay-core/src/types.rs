//! Canonical chat types shared across the workspace.
//!
//! Every provider adapter converts from these into its native request
//! shape, so the rest of the system never sees provider-specific formats.
//! The wire structs at the bottom model the OpenAI chat-completions API,
//! which both the OpenAI and Mistral backends speak.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// A chat message in canonical `{role, content}` form.
///
/// Immutable once constructed; an ordered sequence of these is a
/// conversation, oldest first. Each variant maps to a `role` field value
/// in the OpenAI wire format.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage::System {
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage::User {
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage::Assistant {
            content: content.into(),
        }
    }

    /// The message text, regardless of role.
    pub fn content(&self) -> &str {
        match self {
            ChatMessage::System { content }
            | ChatMessage::User { content }
            | ChatMessage::Assistant { content } => content,
        }
    }

    /// Whether this is a system message.
    pub fn is_system(&self) -> bool {
        matches!(self, ChatMessage::System { .. })
    }

    /// Whether this is a user message.
    pub fn is_user(&self) -> bool {
        matches!(self, ChatMessage::User { .. })
    }
}

// ─────────────────────────────────────────────
// Stream events
// ─────────────────────────────────────────────

/// One unit of orchestrator output.
///
/// `Done` is the explicit end-of-stream signal, distinct from any
/// fragment value, and is always the final event of a session.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// An incremental text fragment, in emission order.
    Delta(String),
    /// End of stream. Exactly one per session.
    Done,
}

impl StreamEvent {
    /// The fragment text, if this is a delta.
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(text) => Some(text),
            StreamEvent::Done => None,
        }
    }
}

// ─────────────────────────────────────────────
// OpenAI-format wire types (shared by compatible providers)
// ─────────────────────────────────────────────

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// One SSE chunk of a streaming chat completion.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// The text delta carried by this chunk, if any.
    ///
    /// Role-only and finish chunks carry no content and yield `None`.
    pub fn delta_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
    }
}

/// A single choice within a streaming chunk.
#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

/// The incremental delta within a chunk choice.
#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

/// Non-streaming chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    /// The assistant text of the first choice, if present.
    pub fn message_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// A single choice in a non-streaming response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

/// The assistant message within a completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Message serialization ──

    #[test]
    fn test_system_message_serialization() {
        let msg = ChatMessage::system("You are a helpful assistant.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "You are a helpful assistant.");
    }

    #[test]
    fn test_user_message_serialization() {
        let msg = ChatMessage::user("Hello, world!");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello, world!");
    }

    #[test]
    fn test_assistant_message_serialization() {
        let msg = ChatMessage::assistant("The answer is 4.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "The answer is 4.");
    }

    #[test]
    fn test_message_round_trip() {
        let messages = vec![
            ChatMessage::system("Answer professionally."),
            ChatMessage::user("What is 2+2?"),
            ChatMessage::assistant("The answer is 4."),
        ];

        let json_str = serde_json::to_string(&messages).unwrap();
        let deserialized: Vec<ChatMessage> = serde_json::from_str(&json_str).unwrap();

        assert_eq!(messages, deserialized);
    }

    #[test]
    fn test_message_helpers() {
        let msg = ChatMessage::user("hi");
        assert!(msg.is_user());
        assert!(!msg.is_system());
        assert_eq!(msg.content(), "hi");
    }

    // ── Stream events ──

    #[test]
    fn test_stream_event_as_delta() {
        assert_eq!(
            StreamEvent::Delta("abc".to_string()).as_delta(),
            Some("abc")
        );
        assert_eq!(StreamEvent::Done.as_delta(), None);
    }

    // ── Wire types ──

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![
                ChatMessage::system("Answer professionally."),
                ChatMessage::user("Hello"),
            ],
            stream: true,
            max_tokens: Some(4000),
            temperature: None,
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["max_tokens"], 4000);
        // temperature should not appear when None
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_chunk_delta_content() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{
                "delta": { "content": "Hel" },
                "finish_reason": null
            }]
        }))
        .unwrap();

        assert_eq!(chunk.delta_content().as_deref(), Some("Hel"));
    }

    #[test]
    fn test_chunk_without_content() {
        // Role-announcement chunk — no content field
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{
                "delta": { "role": "assistant" },
                "finish_reason": null
            }]
        }))
        .unwrap();

        assert_eq!(chunk.delta_content(), None);
    }

    #[test]
    fn test_chunk_finish_reason_only() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({
            "choices": [{
                "delta": {},
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        assert_eq!(chunk.delta_content(), None);
    }

    #[test]
    fn test_chunk_empty_choices() {
        let chunk: ChatCompletionChunk = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(chunk.delta_content(), None);
    }

    #[test]
    fn test_completion_response_content() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": { "content": "Hello! How can I help?" },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        assert_eq!(
            resp.message_content().as_deref(),
            Some("Hello! How can I help?")
        );
    }

    #[test]
    fn test_completion_response_empty_choices() {
        let resp: ChatCompletionResponse =
            serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(resp.message_content(), None);
    }
}
