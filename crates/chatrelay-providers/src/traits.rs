//! The `ChatProvider` trait — the one abstraction every LLM backend
//! implements, plus the error taxonomy shared by all adapters.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use chatrelay_core::ChatMessage;

/// A lazy, finite, non-restartable sequence of text deltas.
///
/// Each item is either one incremental fragment or the error that ended
/// the stream. Fragments already yielded before an error stand — partial
/// output is never retracted.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Errors surfaced by provider adapters.
///
/// All of these are absorbed by the orchestrator's fallback logic; none
/// reach the end caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No client handle for this provider (missing credential). Expected,
    /// non-exceptional.
    #[error("provider not configured")]
    Unavailable,

    /// Transport-level failure (connection refused, TLS, body read).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider's payload could not be used: an SSE decode failure, a
    /// provider-signaled error event mid-stream, or a response with no
    /// usable content.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Trait that all LLM provider adapters implement.
///
/// Adapters convert canonical messages into their native request shape
/// and surface each fragment as soon as the provider emits it — fence
/// buffering is the orchestrator's concern, kept out of this layer.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streaming chat completion.
    ///
    /// Errors here mean the stream never started (bad credential, refused
    /// connection, non-success status). Errors after streaming has begun
    /// arrive as the final item of the returned stream instead.
    async fn stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<DeltaStream, ProviderError>;

    /// Non-streaming chat completion returning the full message text.
    ///
    /// Used for summarization and tagging.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, ProviderError>;

    /// Display name for logging.
    fn display_name(&self) -> &'static str;
}

/// Fixed system instruction directing the model to fence code correctly.
///
/// Injected by every adapter when the caller supplied no system message.
/// This shapes content only — downstream code still defends against
/// malformed fences.
pub const CODE_FENCE_INSTRUCTION: &str = "You are a helpful assistant that answers queries professionally. When providing code examples:
1. Always start with triple backticks and the language name on its own line
2. Put the code on the next line after the language specification
3. Put the closing triple backticks on a new line
4. Format your response like this:

Here's how you can do it:

```python
def example():
    pass
```

Never put code on the same line as the backticks or language specification.";

/// Prepend [`CODE_FENCE_INSTRUCTION`] as a system message unless the
/// caller already supplied one.
pub fn with_system_instruction(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    if messages.iter().any(|m| m.is_system()) {
        return messages.to_vec();
    }
    let mut out = Vec::with_capacity(messages.len() + 1);
    out.push(ChatMessage::system(CODE_FENCE_INSTRUCTION));
    out.extend_from_slice(messages);
    out
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
