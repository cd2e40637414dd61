//! Model registry — provider resolution and the native-model mapping table.
//!
//! Both functions are total and pure: any string resolves to exactly one
//! provider (OpenAI is the default), and unmapped model identifiers pass
//! through unchanged. The mapping table absorbs provider API lag — the UI
//! can list aspirational model names without touching any call site.

// ─────────────────────────────────────────────
// ProviderKind
// ─────────────────────────────────────────────

/// The four supported LLM backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    Mistral,
}

impl ProviderKind {
    /// Human-readable name for logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
            ProviderKind::Mistral => "Mistral",
        }
    }
}

// ─────────────────────────────────────────────
// Provider resolution
// ─────────────────────────────────────────────

/// Ordered substring rules: `(keywords, provider)`. First match wins.
const PROVIDER_RULES: &[(&[&str], ProviderKind)] = &[
    (&["gpt", "o3"], ProviderKind::OpenAi),
    (&["claude"], ProviderKind::Anthropic),
    (&["gemini"], ProviderKind::Google),
    (&["mistral", "pixtral", "codestral"], ProviderKind::Mistral),
];

/// Determine which provider serves a model identifier.
///
/// Unknown identifiers resolve to OpenAI — "unknown model" is a
/// degraded-but-successful path, not an error.
pub fn resolve_provider(model: &str) -> ProviderKind {
    let model_lower = model.to_lowercase();
    PROVIDER_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| model_lower.contains(kw)))
        .map(|(_, kind)| *kind)
        .unwrap_or(ProviderKind::OpenAi)
}

// ─────────────────────────────────────────────
// Native model mapping
// ─────────────────────────────────────────────

/// Static table mapping user-facing model names to currently-available
/// provider model ids. Entries mapping a name to itself pin ids that are
/// already live.
const MODEL_MAPPINGS: &[(&str, &str)] = &[
    // OpenAI models (map new models to available ones for now)
    ("gpt-5", "gpt-4o"),
    ("gpt-4.1", "gpt-4o"),
    ("o3", "gpt-4o"),
    ("o3-mini", "gpt-4o-mini"),
    ("gpt-4o", "gpt-4o"),
    ("gpt-4o-mini", "gpt-4o-mini"),
    ("gpt-realtime", "gpt-4o"),
    // Anthropic models
    ("claude-opus-4.1", "claude-3-5-sonnet-20241022"),
    ("claude-sonnet-4", "claude-3-5-sonnet-20241022"),
    ("claude-3.7-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3-5-sonnet-20241022", "claude-3-5-sonnet-20241022"),
    ("claude-3-5-haiku-20241022", "claude-3-5-haiku-20241022"),
    // Google models
    ("gemini-2.5-pro", "gemini-1.5-pro"),
    ("gemini-2.5-flash", "gemini-1.5-flash"),
    ("gemini-2.0-flash", "gemini-1.5-flash"),
    ("gemini-1.5-pro", "gemini-1.5-pro"),
    ("gemini-1.5-flash", "gemini-1.5-flash"),
    // Mistral models
    ("mistral-large-24.11", "mistral-large-latest"),
    ("pixtral-large-2411", "mistral-large-latest"),
    ("codestral-25.01", "codestral-latest"),
    ("mistral-small-3.1", "mistral-small-latest"),
];

/// Map a user-facing model identifier to the provider-native id.
///
/// Unmapped identifiers pass through unchanged.
pub fn resolve_native_model(model: &str) -> &str {
    MODEL_MAPPINGS
        .iter()
        .find(|(from, _)| *from == model)
        .map(|(_, to)| *to)
        .unwrap_or(model)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── resolve_provider ──

    #[test]
    fn test_resolve_gpt() {
        assert_eq!(resolve_provider("gpt-4o"), ProviderKind::OpenAi);
        assert_eq!(resolve_provider("gpt-4o-mini"), ProviderKind::OpenAi);
    }

    #[test]
    fn test_resolve_o3() {
        assert_eq!(resolve_provider("o3"), ProviderKind::OpenAi);
        assert_eq!(resolve_provider("o3-mini"), ProviderKind::OpenAi);
    }

    #[test]
    fn test_resolve_claude() {
        assert_eq!(resolve_provider("claude-sonnet-4"), ProviderKind::Anthropic);
        assert_eq!(
            resolve_provider("claude-3-5-haiku-20241022"),
            ProviderKind::Anthropic
        );
    }

    #[test]
    fn test_resolve_gemini() {
        assert_eq!(resolve_provider("gemini-2.5-pro"), ProviderKind::Google);
        assert_eq!(resolve_provider("gemini-1.5-flash"), ProviderKind::Google);
    }

    #[test]
    fn test_resolve_mistral_family() {
        assert_eq!(resolve_provider("mistral-large-24.11"), ProviderKind::Mistral);
        assert_eq!(resolve_provider("pixtral-large-2411"), ProviderKind::Mistral);
        assert_eq!(resolve_provider("codestral-25.01"), ProviderKind::Mistral);
    }

    #[test]
    fn test_resolve_unknown_defaults_to_openai() {
        assert_eq!(resolve_provider("unknown-xyz"), ProviderKind::OpenAi);
        assert_eq!(resolve_provider(""), ProviderKind::OpenAi);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve_provider("Claude-Sonnet-4"), ProviderKind::Anthropic);
        assert_eq!(resolve_provider("GPT-4O"), ProviderKind::OpenAi);
    }

    #[test]
    fn test_first_rule_wins() {
        // Contains both "gpt" and "claude" — OpenAI rule is first.
        assert_eq!(resolve_provider("gpt-claude-hybrid"), ProviderKind::OpenAi);
    }

    // ── resolve_native_model ──

    #[test]
    fn test_aspirational_models_map_down() {
        assert_eq!(resolve_native_model("gpt-5"), "gpt-4o");
        assert_eq!(resolve_native_model("o3-mini"), "gpt-4o-mini");
        assert_eq!(
            resolve_native_model("claude-sonnet-4"),
            "claude-3-5-sonnet-20241022"
        );
        assert_eq!(resolve_native_model("gemini-2.5-flash"), "gemini-1.5-flash");
        assert_eq!(
            resolve_native_model("pixtral-large-2411"),
            "mistral-large-latest"
        );
        assert_eq!(resolve_native_model("codestral-25.01"), "codestral-latest");
    }

    #[test]
    fn test_live_models_map_to_themselves() {
        assert_eq!(resolve_native_model("gpt-4o"), "gpt-4o");
        assert_eq!(
            resolve_native_model("claude-3-5-sonnet-20241022"),
            "claude-3-5-sonnet-20241022"
        );
    }

    #[test]
    fn test_unmapped_passes_through() {
        assert_eq!(resolve_native_model("some-future-model"), "some-future-model");
    }

    #[test]
    fn test_every_mapping_targets_its_own_provider() {
        for (from, to) in MODEL_MAPPINGS {
            assert_eq!(
                resolve_provider(from),
                resolve_provider(to),
                "mapping {from} → {to} crosses providers"
            );
        }
    }
}
