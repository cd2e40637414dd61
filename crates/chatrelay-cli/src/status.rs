//! `chatrelay status` — show which providers are configured, without
//! printing any secrets.

use anyhow::Result;
use colored::Colorize;

use chatrelay_core::config::{get_config_path, load_config};

pub fn run() -> Result<()> {
    let config = load_config(None);

    println!("{}", "Chatrelay status".bold());
    println!("Config file: {}", get_config_path().display());
    println!();

    println!("{}", "Providers".bold());
    print_provider("OpenAI", config.providers.openai.is_configured());
    print_provider("Anthropic", config.providers.anthropic.is_configured());
    print_provider("Google", config.providers.google.is_configured());
    print_provider("Mistral", config.providers.mistral.is_configured());
    println!();

    if !config.providers.any_configured() {
        println!(
            "{}",
            "No API keys configured — every request will use the fallback response.".yellow()
        );
        println!();
    }

    println!("Default model: {}", config.chat.model.bold());

    Ok(())
}

fn print_provider(name: &str, configured: bool) {
    let marker = if configured {
        "✓ configured".green()
    } else {
        "✗ no API key".red()
    };
    println!("  {name:<10} {marker}");
}
