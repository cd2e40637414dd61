//! Configuration schema.
//!
//! Hierarchy: `Config` → `ProvidersConfig`, `ChatDefaults`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.chatrelay/config.json` + env vars.
///
/// Built once at process start; the provider clients constructed from it
/// are immutable afterwards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub providers: ProvidersConfig,
    pub chat: ChatDefaults,
}

// ─────────────────────────────────────────────
// Chat defaults
// ─────────────────────────────────────────────

/// Default chat settings applied to every request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatDefaults {
    /// Default model identifier when the caller supplies none.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Settings for a single LLM provider (API key, base URL).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// API key for authentication. Empty means not configured.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl ProviderSettings {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider settings — one per supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderSettings,
    #[serde(default)]
    pub anthropic: ProviderSettings,
    #[serde(default)]
    pub google: ProviderSettings,
    #[serde(default)]
    pub mistral: ProviderSettings,
}

impl ProvidersConfig {
    /// Whether any provider has a configured API key.
    pub fn any_configured(&self) -> bool {
        self.openai.is_configured()
            || self.anthropic.is_configured()
            || self.google.is_configured()
            || self.mistral.is_configured()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
