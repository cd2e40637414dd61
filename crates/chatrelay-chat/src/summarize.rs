//! Conversation utilities: title summarization and tag suggestion.
//!
//! Both ride the router's non-streaming completion path and both carry a
//! deterministic, no-network fallback so the surrounding application
//! always gets usable text even with zero providers configured.

use tracing::debug;

use chatrelay_core::utils::truncate_string;
use chatrelay_core::ChatMessage;

use crate::router::ChatRouter;

/// Title length the prompt asks for. Prompt-enforced only; the
/// truncation fallback is the hard bound.
const TITLE_CHAR_LIMIT: usize = 50;

/// Characters of title kept by the no-provider fallback (plus "...").
const FALLBACK_TITLE_LEN: usize = 33;

const DEFAULT_TITLE: &str = "New Chat";

/// Fallback tag vocabulary: `(needle in user content, tag)`.
const TAG_VOCABULARY: &[(&str, &str)] = &[
    ("python", "python"),
    ("javascript", "javascript"),
    ("rust", "rust"),
    ("sql", "sql"),
    ("code", "coding"),
    ("data", "data"),
    ("web", "web"),
    ("api", "api"),
];

const DEFAULT_TAG: &str = "general";

/// Most tags returned per conversation.
const MAX_TAGS: usize = 3;

impl ChatRouter {
    /// Produce a short conversation title.
    ///
    /// Asks the default model for a title of at most 50 characters; when
    /// no provider can answer, falls back to truncating the first user
    /// message ("New Chat" when there is none).
    pub async fn summarize_title(&self, messages: &[ChatMessage]) -> String {
        let prompt = vec![
            ChatMessage::system(
                "You title conversations. Reply with the title only — no quotes, no punctuation \
                 at the end.",
            ),
            ChatMessage::user(format!(
                "Summarize this conversation in at most {TITLE_CHAR_LIMIT} characters:\n\n{}",
                transcript(messages)
            )),
        ];

        match self.try_complete(&prompt, self.default_model()).await {
            Ok(raw) => {
                let title = clean_title(&raw);
                if title.is_empty() {
                    fallback_title(messages)
                } else {
                    title
                }
            }
            Err(e) => {
                debug!(error = %e, "title summarization unavailable, using truncation");
                fallback_title(messages)
            }
        }
    }

    /// Suggest 1–3 lowercase, hyphenated keyword tags.
    ///
    /// When no provider can answer, scans user-authored content for a
    /// fixed vocabulary and returns the matches, or `["general"]`.
    pub async fn suggest_tags(&self, messages: &[ChatMessage]) -> Vec<String> {
        let prompt = vec![
            ChatMessage::system(
                "You label conversations. Reply with 1-3 short lowercase keyword tags, \
                 hyphenated instead of spaced, comma-separated. Reply with the tags only.",
            ),
            ChatMessage::user(format!(
                "Suggest tags for this conversation:\n\n{}",
                transcript(messages)
            )),
        ];

        match self.try_complete(&prompt, self.default_model()).await {
            Ok(raw) => {
                let tags = parse_tags(&raw);
                if tags.is_empty() {
                    fallback_tags(messages)
                } else {
                    tags
                }
            }
            Err(e) => {
                debug!(error = %e, "tag suggestion unavailable, using keyword scan");
                fallback_tags(messages)
            }
        }
    }
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

/// Render the conversation for a summarization prompt, capping each
/// message so a long chat doesn't blow up the request.
fn transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = match m {
                ChatMessage::System { .. } => "system",
                ChatMessage::User { .. } => "user",
                ChatMessage::Assistant { .. } => "assistant",
            };
            format!("{role}: {}", truncate_string(m.content(), 500))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim whitespace and surrounding quotes from a model-produced title.
fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Truncate the first user message, matching the surrounding app's
/// historical `content[:30] + "..."` behavior.
fn fallback_title(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .find(|m| m.is_user())
        .map(|m| truncate_string(m.content(), FALLBACK_TITLE_LEN))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Parse a comma/newline-separated completion into normalized tags.
fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for piece in raw.split(|c| c == ',' || c == '\n') {
        let tag = normalize_tag(piece);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Lowercase, strip markers, and hyphenate inner whitespace.
fn normalize_tag(piece: &str) -> String {
    piece
        .trim()
        .trim_start_matches('#')
        .trim_matches(|c| c == '"' || c == '\'' || c == '.')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Scan user-authored content for the fixed vocabulary.
fn fallback_tags(messages: &[ChatMessage]) -> Vec<String> {
    let content = messages
        .iter()
        .filter(|m| m.is_user())
        .map(|m| m.content().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut tags = Vec::new();
    for (needle, tag) in TAG_VOCABULARY {
        if content.contains(needle) && !tags.contains(&tag.to_string()) {
            tags.push(tag.to_string());
        }
        if tags.len() == MAX_TAGS {
            break;
        }
    }

    if tags.is_empty() {
        tags.push(DEFAULT_TAG.to_string());
    }
    tags
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
