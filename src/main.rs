//! Marvin IRC Bot - Main binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use marvin_core::{connect, report, Client, Config, JoinChannels, Module, ModuleSet};
use marvin_modules::{HelpModule, UrlModule};
use std::path::PathBuf;
use tracing::{error, info};

/// Marvin - A modular IRC bot
#[derive(Parser)]
#[command(name = "marvin")]
#[command(about = "A modular IRC bot with pluggable hook modules")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "marvin.toml")]
    config: PathBuf,

    /// Print every line received from the server
    #[arg(short, long)]
    verbose: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Test configuration and exit
    #[arg(long)]
    test_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "marvin.toml")]
        output: PathBuf,
    },
}

/// Modules compiled into the bot, in load order
fn builtin_modules() -> Vec<Box<dyn Module>> {
    vec![Box::new(UrlModule::new())]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level)?;

    if let Some(Commands::Config { output }) = cli.command {
        generate_config(&output)?;
        return Ok(());
    }

    // Load configuration
    let config = if cli.config.exists() {
        info!("Loading configuration from {:?}", cli.config);
        Config::from_file(&cli.config)?
    } else {
        info!("Configuration file not found, using defaults");
        Config::default()
    };

    config.validate()?;
    if cli.test_config {
        info!("Configuration is valid");
        return Ok(());
    }

    let connection = connect(&config.server).await?;
    let (reader, writer) = tokio::io::split(connection);

    let mut client = Client::new(writer);
    client.register_hook("001", JoinChannels::new(config.bot.channels.clone()));
    client
        .setup(&config.bot.nick, &config.bot.name, &config.server.host)
        .await
        .context("Failed to register with the server")?;

    let mut modules = ModuleSet::new(config.modules.clone());
    for module in builtin_modules() {
        modules.register(module)?;
    }
    modules.register(Box::new(HelpModule::new(modules.help_index())))?;
    modules.load_all(&mut client)?;

    let (errors, stream) = report::channel();
    let reporter = report::spawn_reporter(stream);

    info!("Starting Marvin as {}...", config.bot.nick);
    if let Err(e) = client.run(reader, errors, cli.verbose).await {
        error!("Connection lost: {}", e);
    }

    // the read loop owned the only sender, so the reporter finishes now
    let _ = reporter.await;
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str) -> anyhow::Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Generate default configuration file
fn generate_config(output: &PathBuf) -> anyhow::Result<()> {
    let config = Config::default();
    config.to_file(output)?;
    println!("Generated default configuration file: {:?}", output);
    Ok(())
}
