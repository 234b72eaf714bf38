use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, GeminiConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Shikkha QA Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Service").bold().yellow());
    eprintln!("Configure the local Ollama instance used for chunk embeddings.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Generation Service").bold().yellow());
    eprintln!("Configure the Gemini endpoint used for whole-document answering.");
    eprintln!();

    configure_gemini(&mut config.gemini)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama)? {
        eprintln!("{}", style("✓ Embedding service reachable!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not reach the embedding service").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    if config.gemini.resolve_api_key().is_none() {
        eprintln!(
            "{}",
            style("⚠ No Gemini API key configured (set GEMINI_API_KEY or rerun config)").yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Service:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Generation Service:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.gemini.endpoint).cyan());
    eprintln!("  Model: {}", style(&config.gemini.model).cyan());
    let key_state = if config.gemini.resolve_api_key().is_some() {
        style("configured").green()
    } else {
        style("missing").red()
    };
    eprintln!("  API key: {}", key_state);

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!(
        "  Max chunk size: {} words",
        style(config.chunking.max_chunk_size).cyan()
    );
    eprintln!("  Overlap: {} words", style(config.chunking.overlap).cyan());

    eprintln!();
    eprintln!("{}", style("Paths:").bold().yellow());
    eprintln!("  Books: {}", style(config.books_dir_path().display()).cyan());
    eprintln!(
        "  Chunk stores: {}",
        style(config.stores_dir_path().display()).cyan()
    );
    eprintln!(
        "  Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Embedding service protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    ollama.protocol = protocols[protocol_index].to_string();

    ollama.host = Input::new()
        .with_prompt("Embedding service host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Host cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.port = Input::new()
        .with_prompt("Embedding service port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    Ok(())
}

fn configure_gemini(gemini: &mut GeminiConfig) -> Result<()> {
    gemini.model = Input::new()
        .with_prompt("Generation model")
        .default(gemini.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    gemini.api_key = Input::new()
        .with_prompt("Gemini API key (blank to use GEMINI_API_KEY)")
        .default(gemini.api_key.clone())
        .allow_empty(true)
        .interact_text()?;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
