//! Provider adapter layer for Chatrelay.
//!
//! Wraps each LLM vendor's streaming chat API behind one trait, so the
//! orchestrator never sees a provider-native chunk format.
//!
//! # Architecture
//!
//! - [`traits::ChatProvider`] — trait that all adapters implement, plus
//!   the [`traits::ProviderError`] taxonomy
//! - [`registry`] — model identifier → provider resolution and the
//!   native-model mapping table
//! - [`openai`], [`anthropic`], [`google`], [`mistral`] — one adapter per
//!   backend, each normalizing its native stream into plain text deltas
//! - [`fallback`] — deterministic no-network adapter used when nothing
//!   else is available
//! - [`clients::ProviderClients`] — the process-wide handle set built
//!   once from configuration

pub mod anthropic;
pub mod clients;
pub mod fallback;
pub mod google;
pub mod mistral;
pub mod openai;
pub mod registry;
pub mod traits;

// Re-export main types for convenience
pub use clients::ProviderClients;
pub use fallback::{FallbackProvider, APOLOGY_MESSAGE, UNAVAILABLE_COMPLETION};
pub use registry::{resolve_native_model, resolve_provider, ProviderKind};
pub use traits::{ChatProvider, DeltaStream, ProviderError};
