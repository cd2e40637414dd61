//! Dispatch/fallback orchestrator.
//!
//! Per request: resolve the provider, open its stream, and relay deltas
//! through a fence filter. Failures never reach the caller — a missing
//! credential degrades to OpenAI or to the fixed apology text, and a
//! mid-stream failure switches the *remaining* output to OpenAI (when
//! live) or the apology. The fallback is single-level: a second failure
//! terminates the stream. Every session ends with exactly one
//! [`StreamEvent::Done`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use chatrelay_core::{ChatMessage, FenceFilter, StreamEvent};
use chatrelay_providers::registry::{resolve_native_model, resolve_provider, ProviderKind};
use chatrelay_providers::traits::{DeltaStream, ProviderError};
use chatrelay_providers::ProviderClients;

/// The orchestrator's output: fence-filtered deltas, then one `Done`.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Model used for every second-chance OpenAI call.
const SECONDARY_MODEL: &str = "gpt-4o";

/// Per-process chat dispatcher.
///
/// Holds the immutable provider handle set; all per-request state lives
/// in the stream it returns, so one router serves any number of
/// concurrent sessions.
pub struct ChatRouter {
    clients: Arc<ProviderClients>,
    default_model: String,
}

impl ChatRouter {
    pub fn new(clients: Arc<ProviderClients>, default_model: impl Into<String>) -> Self {
        ChatRouter {
            clients,
            default_model: default_model.into(),
        }
    }

    /// The model used when an operation doesn't take one (summarization,
    /// tagging).
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Shared handle set, for status reporting.
    pub fn clients(&self) -> &ProviderClients {
        &self.clients
    }

    /// Start a streaming chat session.
    ///
    /// The returned stream always produces at least the apology text and
    /// always terminates with a single [`StreamEvent::Done`] — the caller
    /// never sees an error.
    pub async fn stream_chat(&self, messages: &[ChatMessage], model: &str) -> EventStream {
        let kind = resolve_provider(model);
        let native = resolve_native_model(model);
        debug!(
            model,
            provider = kind.display_name(),
            native_model = native,
            "dispatching chat stream"
        );

        let (stream, primary_was_openai) = self.open_primary(messages, kind, native).await;

        let session = Session {
            clients: Arc::clone(&self.clients),
            messages: messages.to_vec(),
            filter: FenceFilter::new(),
            pending: VecDeque::new(),
            stage: Stage::Primary(stream),
            primary_was_openai,
        };

        Box::pin(futures::stream::unfold(session, step))
    }

    /// Open the first stream of a session.
    ///
    /// Adapter selection failures (missing credential, refused start) are
    /// treated identically: degrade to OpenAI with the secondary model,
    /// or to the apology stream when OpenAI is not live either.
    async fn open_primary(
        &self,
        messages: &[ChatMessage],
        kind: ProviderKind,
        native: &str,
    ) -> (DeltaStream, bool) {
        if let Some(adapter) = self.clients.get(kind) {
            match adapter.stream(messages, native).await {
                Ok(stream) => return (stream, kind == ProviderKind::OpenAi),
                Err(e) => {
                    warn!(provider = kind.display_name(), error = %e, "adapter failed to start; degrading");
                }
            }
        } else {
            debug!(provider = kind.display_name(), "provider not configured; degrading");
        }

        if kind != ProviderKind::OpenAi {
            if let Some(openai) = self.clients.get(ProviderKind::OpenAi) {
                match openai.stream(messages, SECONDARY_MODEL).await {
                    Ok(stream) => return (stream, true),
                    Err(e) => warn!(error = %e, "OpenAI degraded start failed"),
                }
            }
        }

        // primary_was_openai = true here so a mid-stream failure of the
        // apology path (which cannot happen) would not loop back into it.
        (apology_stream(&self.clients, messages).await, true)
    }

    /// Non-streaming completion with the same degradation policy.
    ///
    /// Never errors: the fixed unavailable-completion text is the floor.
    pub async fn complete_chat(&self, messages: &[ChatMessage], model: &str) -> String {
        match self.try_complete(messages, model).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "completion degraded to fixed text");
                self.clients
                    .fallback()
                    .complete(messages, model)
                    .await
                    .unwrap_or_else(|_| chatrelay_providers::UNAVAILABLE_COMPLETION.to_string())
            }
        }
    }

    /// Completion that surfaces failure, for callers with their own
    /// deterministic fallback (title truncation, tag vocabulary).
    pub(crate) async fn try_complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
    ) -> Result<String, ProviderError> {
        let kind = resolve_provider(model);
        let native = resolve_native_model(model);

        let attempt = match self.clients.get(kind) {
            Some(adapter) => adapter.complete(messages, native).await,
            None => Err(ProviderError::Unavailable),
        };

        match attempt {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(provider = kind.display_name(), error = %e, "completion failed");
                if kind != ProviderKind::OpenAi {
                    if let Some(openai) = self.clients.get(ProviderKind::OpenAi) {
                        return openai.complete(messages, SECONDARY_MODEL).await;
                    }
                }
                Err(e)
            }
        }
    }
}

// ─────────────────────────────────────────────
// Session state machine
// ─────────────────────────────────────────────

enum Stage {
    /// Relaying the first stream; one fallback switch still available.
    Primary(DeltaStream),
    /// Relaying the second-chance stream; the next failure terminates.
    Draining(DeltaStream),
    /// Flush the fence filter and emit `Done`.
    Finishing,
    Terminated,
}

/// All state owned by one request.
struct Session {
    clients: Arc<ProviderClients>,
    messages: Vec<ChatMessage>,
    filter: FenceFilter,
    pending: VecDeque<StreamEvent>,
    stage: Stage,
    primary_was_openai: bool,
}

/// One turn of the session state machine, driven by `stream::unfold`.
async fn step(mut session: Session) -> Option<(StreamEvent, Session)> {
    loop {
        if let Some(event) = session.pending.pop_front() {
            return Some((event, session));
        }

        match session.stage {
            Stage::Primary(ref mut stream) => match stream.next().await {
                Some(Ok(delta)) => {
                    for unit in session.filter.push(&delta) {
                        session.pending.push_back(StreamEvent::Delta(unit));
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "provider stream failed mid-response; switching to fallback");
                    let secondary = open_secondary(
                        &session.clients,
                        &session.messages,
                        session.primary_was_openai,
                    )
                    .await;
                    session.stage = Stage::Draining(secondary);
                }
                None => session.stage = Stage::Finishing,
            },
            Stage::Draining(ref mut stream) => match stream.next().await {
                Some(Ok(delta)) => {
                    for unit in session.filter.push(&delta) {
                        session.pending.push_back(StreamEvent::Delta(unit));
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "fallback stream failed; terminating");
                    session.stage = Stage::Finishing;
                }
                None => session.stage = Stage::Finishing,
            },
            Stage::Finishing => {
                if let Some(rest) = std::mem::take(&mut session.filter).finish() {
                    session.pending.push_back(StreamEvent::Delta(rest));
                }
                session.pending.push_back(StreamEvent::Done);
                session.stage = Stage::Terminated;
            }
            Stage::Terminated => return None,
        }
    }
}

/// Open the second-chance stream after a mid-stream failure.
async fn open_secondary(
    clients: &ProviderClients,
    messages: &[ChatMessage],
    primary_was_openai: bool,
) -> DeltaStream {
    if !primary_was_openai {
        if let Some(openai) = clients.get(ProviderKind::OpenAi) {
            match openai.stream(messages, SECONDARY_MODEL).await {
                Ok(stream) => {
                    debug!("resuming with OpenAI fallback stream");
                    return stream;
                }
                Err(e) => warn!(error = %e, "OpenAI fallback failed to start"),
            }
        }
    }
    apology_stream(clients, messages).await
}

async fn apology_stream(clients: &ProviderClients, messages: &[ChatMessage]) -> DeltaStream {
    clients
        .fallback()
        .stream(messages, SECONDARY_MODEL)
        .await
        .unwrap_or_else(|_| Box::pin(futures::stream::empty()))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
