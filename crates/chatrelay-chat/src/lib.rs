//! Chat orchestration for Chatrelay.
//!
//! Composes the model registry, the provider adapters, and the fence
//! reassembly filter into the surface the surrounding application calls:
//! one streaming chat operation plus synchronous title summarization and
//! tag suggestion.
//!
//! # Architecture
//!
//! - [`router::ChatRouter`] — per-request dispatch with graceful fallback
//! - [`summarize`] — title and tag generation over the same router

pub mod router;
pub mod summarize;

// Re-export main types for convenience
pub use router::{ChatRouter, EventStream};
