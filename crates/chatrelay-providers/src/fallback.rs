//! Deterministic fallback adapter — used when no real provider can serve
//! a request. No network; the output is fixed text, streamed
//! character-by-character so the consumer exercises the same incremental
//! path as a live provider.

use async_trait::async_trait;
use tracing::debug;

use chatrelay_core::ChatMessage;

use crate::traits::{ChatProvider, DeltaStream, ProviderError};

/// Streamed when no provider is available for a chat request.
pub const APOLOGY_MESSAGE: &str = "I apologize, but the AI service is currently unavailable. \
Please check your API keys and try again later.";

/// Returned by non-streaming completions when no provider is available.
pub const UNAVAILABLE_COMPLETION: &str =
    "Error: AI service unavailable. Please check API configuration.";

/// The no-network fallback provider.
#[derive(Debug, Default)]
pub struct FallbackProvider;

#[async_trait]
impl ChatProvider for FallbackProvider {
    async fn stream(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
    ) -> Result<DeltaStream, ProviderError> {
        debug!("serving fallback apology stream");
        let chars: Vec<Result<String, ProviderError>> = APOLOGY_MESSAGE
            .chars()
            .map(|c| Ok(c.to_string()))
            .collect();
        Ok(Box::pin(futures::stream::iter(chars)))
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
    ) -> Result<String, ProviderError> {
        Ok(UNAVAILABLE_COMPLETION.to_string())
    }

    fn display_name(&self) -> &'static str {
        "Fallback"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
