//! Core layer for Chatrelay — canonical chat types, configuration, and the
//! code-fence reassembly filter shared by every provider adapter.
//!
//! # Architecture
//!
//! - [`types`] — `ChatMessage` and the `StreamEvent` emitted to consumers,
//!   plus the OpenAI-format wire structs shared by compatible providers
//! - [`fence`] — stateful filter that re-chunks a raw delta stream so no
//!   triple-backtick fence is ever emitted split
//! - [`config`] — typed configuration (JSON file + env overrides)
//! - [`utils`] — path and string helpers

pub mod config;
pub mod fence;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use fence::FenceFilter;
pub use types::{ChatMessage, StreamEvent};
