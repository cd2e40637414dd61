//! Interactive REPL — streams each response to the terminal as the
//! deltas arrive, then summarizes the session on exit.
//!
//! Uses `rustyline` for readline-style editing with persistent history.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use futures::StreamExt;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use chatrelay_chat::ChatRouter;
use chatrelay_core::{ChatMessage, StreamEvent};

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// Run the interactive REPL loop.
pub async fn run(router: ChatRouter, model: &str) -> Result<()> {
    print_banner(model);

    let mut editor = create_editor()?;
    let mut conversation: Vec<ChatMessage> = Vec::new();

    loop {
        // Read input
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl-C — exit cleanly
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                // Ctrl-D — exit cleanly
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        // Check exit commands
        if is_exit_command(trimmed) {
            break;
        }

        // Add to history
        let _ = editor.add_history_entry(&input);

        debug!(model, input = trimmed, "processing input");
        conversation.push(ChatMessage::user(trimmed));

        print!("{} ", "AI:".cyan().bold());
        let reply = stream_response(&router, &conversation, model).await?;
        conversation.push(ChatMessage::assistant(reply));
        println!();
    }

    // Summarize the session before leaving
    if !conversation.is_empty() {
        let title = router.summarize_title(&conversation).await;
        let tags = router.suggest_tags(&conversation).await;
        println!();
        println!("{} {}", "Title:".bold(), title);
        println!("{} {}", "Tags:".bold(), tags.join(", "));
    }

    println!("\nGoodbye! 👋");
    save_history(&mut editor);

    Ok(())
}

/// Relay one chat stream to stdout, returning the concatenated text.
pub async fn stream_response(
    router: &ChatRouter,
    messages: &[ChatMessage],
    model: &str,
) -> Result<String> {
    let mut stream = router.stream_chat(messages, model).await;
    let mut full = String::new();

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Delta(text) => {
                print!("{text}");
                std::io::stdout().flush().ok();
                full.push_str(&text);
            }
            StreamEvent::Done => break,
        }
    }

    println!();
    Ok(full)
}

fn print_banner(model: &str) {
    println!("{}", "Chatrelay".cyan().bold());
    println!("Model: {}  (exit with /quit)", model.bold());
    println!();
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    // Load history from ~/.chatrelay/history/cli_history
    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    chatrelay_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
