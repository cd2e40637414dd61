//! Process-wide provider client handles.
//!
//! Built once at startup from configuration and immutable afterwards:
//! concurrent streams share these by reference, and no adapter mutates
//! shared state, so no locking is needed. A provider without a configured
//! API key gets no handle at all — every call through it fails closed.

use tracing::info;

use chatrelay_core::config::Config;

use crate::anthropic::AnthropicProvider;
use crate::fallback::FallbackProvider;
use crate::google::GoogleProvider;
use crate::mistral::MistralProvider;
use crate::openai::OpenAiProvider;
use crate::registry::ProviderKind;
use crate::traits::ChatProvider;

/// One optional handle per backend, plus the always-available fallback.
pub struct ProviderClients {
    openai: Option<Box<dyn ChatProvider>>,
    anthropic: Option<Box<dyn ChatProvider>>,
    google: Option<Box<dyn ChatProvider>>,
    mistral: Option<Box<dyn ChatProvider>>,
    fallback: FallbackProvider,
}

impl std::fmt::Debug for ProviderClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClients")
            .field("openai", &self.openai.is_some())
            .field("anthropic", &self.anthropic.is_some())
            .field("google", &self.google.is_some())
            .field("mistral", &self.mistral.is_some())
            .finish()
    }
}

impl ProviderClients {
    /// Build the handle set from configuration.
    pub fn from_config(config: &Config) -> Self {
        let providers = &config.providers;

        let clients = Self::from_adapters(
            providers
                .openai
                .is_configured()
                .then(|| Box::new(OpenAiProvider::new(&providers.openai)) as Box<dyn ChatProvider>),
            providers.anthropic.is_configured().then(|| {
                Box::new(AnthropicProvider::new(&providers.anthropic)) as Box<dyn ChatProvider>
            }),
            providers
                .google
                .is_configured()
                .then(|| Box::new(GoogleProvider::new(&providers.google)) as Box<dyn ChatProvider>),
            providers.mistral.is_configured().then(|| {
                Box::new(MistralProvider::new(&providers.mistral)) as Box<dyn ChatProvider>
            }),
        );

        info!(
            openai = clients.openai.is_some(),
            anthropic = clients.anthropic.is_some(),
            google = clients.google.is_some(),
            mistral = clients.mistral.is_some(),
            "provider clients initialized"
        );

        clients
    }

    /// Assemble a handle set from arbitrary adapters.
    ///
    /// Lets callers substitute their own `ChatProvider` implementations
    /// (used by the orchestrator's tests).
    pub fn from_adapters(
        openai: Option<Box<dyn ChatProvider>>,
        anthropic: Option<Box<dyn ChatProvider>>,
        google: Option<Box<dyn ChatProvider>>,
        mistral: Option<Box<dyn ChatProvider>>,
    ) -> Self {
        ProviderClients {
            openai,
            anthropic,
            google,
            mistral,
            fallback: FallbackProvider,
        }
    }

    /// The live adapter for a provider, if its credential is configured.
    pub fn get(&self, kind: ProviderKind) -> Option<&dyn ChatProvider> {
        match kind {
            ProviderKind::OpenAi => self.openai.as_deref(),
            ProviderKind::Anthropic => self.anthropic.as_deref(),
            ProviderKind::Google => self.google.as_deref(),
            ProviderKind::Mistral => self.mistral.as_deref(),
        }
    }

    /// Whether a provider has a live handle.
    pub fn is_live(&self, kind: ProviderKind) -> bool {
        self.get(kind).is_some()
    }

    /// The always-available deterministic fallback.
    pub fn fallback(&self) -> &dyn ChatProvider {
        &self.fallback
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
