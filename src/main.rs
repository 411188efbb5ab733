use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chatgate::llm::GeminiClient;
use chatgate::{ChatQueue, GateError};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(config: &Config) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatgate")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("chatgate.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let default_level = config.log_level.as_deref().unwrap_or("info");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_queue(config: &Config) -> Result<ChatQueue> {
    let client = GeminiClient::new(config.gemini_config()).context("Failed to create Gemini client")?;
    Ok(ChatQueue::new(
        Arc::new(client),
        config.admission_config(),
        config.drain_config(),
    ))
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Ask { question } => handle_ask_command(question, config).await,
        Commands::Batch { file } => handle_batch_command(file, cli.is_verbose(), config).await,
        Commands::Config => handle_config_command(config),
    }
}

fn print_failure(label: &str, err: &GateError) {
    match err.retry_after_secs() {
        Some(secs) => println!(
            "{} {} (retry after {}s)",
            label.yellow(),
            "Rate limit exceeded. Please try again in a few moments.".yellow(),
            secs
        ),
        None => println!("{} {}", label.red(), err.to_string().red()),
    }
}

async fn handle_ask_command(question: &str, config: &Config) -> Result<()> {
    info!("Asking: {}", question);
    let queue = build_queue(config)?;
    let handle = queue.submit(question)?;

    match handle.wait().await {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            print_failure("Failed:", &e);
            Err(e).context("Question was not answered")
        }
    }
}

async fn handle_batch_command(file: &Path, verbose: bool, config: &Config) -> Result<()> {
    let content =
        fs::read_to_string(file).context(format!("Failed to read questions from {}", file.display()))?;
    let questions: Vec<&str> = content.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    info!("Queueing {} questions from {}", questions.len(), file.display());

    let queue = build_queue(config)?;
    let handles = questions
        .iter()
        .map(|q| queue.submit(*q))
        .collect::<chatgate::Result<Vec<_>>>()?;

    let mut failures = 0;
    for (question, handle) in questions.iter().zip(handles) {
        let id = handle.id();
        println!("{} {}", "Q:".cyan(), question);
        match handle.wait().await {
            Ok(text) => {
                info!("Request {} answered", id);
                println!("{} {}\n", "A:".green(), text);
            }
            Err(e) => {
                failures += 1;
                info!("Request {} failed: {}", id, e);
                print_failure("A:", &e);
                println!();
            }
        }
    }

    if verbose {
        println!("{}", serde_json::to_string_pretty(&queue.status())?);
    }

    if failures > 0 {
        eyre::bail!("{} of {} questions failed", failures, questions.len());
    }
    Ok(())
}

fn handle_config_command(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&config).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
