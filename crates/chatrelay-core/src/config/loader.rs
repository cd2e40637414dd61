//! Config loader — reads `~/.chatrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.chatrelay/config.json`
//! 3. Environment variables (override JSON)
//!
//! Credential variables are the providers' standard ones
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GOOGLE_API_KEY`,
//! `MISTRAL_API_KEY`), so a deployment configured for the surrounding web
//! application works unchanged. A missing or unparsable file is never an
//! error — the process must come up even with zero providers configured.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderSettings};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    load_config_from_path(&config_path)
}

/// Load config from a specific file path.
fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            return apply_env_overrides(Config::default());
        }
    };

    apply_env_overrides(config)
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `GOOGLE_API_KEY` /
///   `MISTRAL_API_KEY` → `providers.<name>.api_key`
/// - `CHATRELAY_PROVIDERS__<NAME>__API_BASE` → `providers.<name>.api_base`
/// - `CHATRELAY_CHAT__MODEL` → `chat.model`
/// - `CHATRELAY_CHAT__MAX_TOKENS` → `chat.max_tokens`
/// - `CHATRELAY_CHAT__TEMPERATURE` → `chat.temperature`
fn apply_env_overrides(mut config: Config) -> Config {
    apply_provider_env(&mut config.providers.openai, "OPENAI");
    apply_provider_env(&mut config.providers.anthropic, "ANTHROPIC");
    apply_provider_env(&mut config.providers.google, "GOOGLE");
    apply_provider_env(&mut config.providers.mistral, "MISTRAL");

    if let Ok(val) = std::env::var("CHATRELAY_CHAT__MODEL") {
        config.chat.model = val;
    }
    if let Ok(val) = std::env::var("CHATRELAY_CHAT__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.chat.max_tokens = n;
        }
    }
    if let Ok(val) = std::env::var("CHATRELAY_CHAT__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.chat.temperature = t;
        }
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderSettings, name: &str) {
    if let Ok(val) = std::env::var(format!("{name}_API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("CHATRELAY_PROVIDERS__{name}__API_BASE")) {
        provider.api_base = Some(val);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
