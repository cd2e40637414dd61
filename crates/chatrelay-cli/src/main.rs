//! Chatrelay CLI — entry point.
//!
//! A reference consumer of the streaming core: what the surrounding web
//! application does over a server-push channel, this does on a terminal.
//!
//! # Commands
//!
//! - `chatrelay chat [-m MESSAGE] [--model MODEL]` — chat (single-shot or REPL)
//! - `chatrelay status` — show configuration and provider status

mod repl;
mod status;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use chatrelay_chat::ChatRouter;
use chatrelay_core::config::load_config;
use chatrelay_core::ChatMessage;
use chatrelay_providers::ProviderClients;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Chatrelay — one streaming interface over OpenAI, Anthropic, Google and Mistral
#[derive(Parser)]
#[command(name = "chatrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with a model (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Model identifier (defaults to the configured model)
        #[arg(long)]
        model: Option<String>,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Show configuration and provider status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            model,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, model).await
        }
        Commands::Status => status::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>, model: Option<String>) -> Result<()> {
    let config = load_config(None);
    let model = model.unwrap_or_else(|| config.chat.model.clone());

    let clients = Arc::new(ProviderClients::from_config(&config));
    let router = ChatRouter::new(clients, config.chat.model.clone());

    match message {
        Some(msg) => {
            // Single-shot mode
            info!(model = %model, "processing single message");
            let messages = vec![ChatMessage::user(msg)];
            repl::stream_response(&router, &messages, &model).await?;
            Ok(())
        }
        None => {
            // Interactive REPL mode
            repl::run(router, &model).await
        }
    }
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("chatrelay=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
