//! storydev - story catalog watcher and live-reload server
//!
//! Entry point for the storydev binary.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use clap::{Parser, Subcommand};
use storydev::catalog::{CatalogBuilder, MetaJson};
use storydev::config::DEFAULT_STORIES_GLOB;
use storydev::server::{init_metrics, init_tracing, App};
use storydev::{Config, Error, Result};

/// storydev - story catalog watcher and live-reload server
#[derive(Parser, Debug)]
#[command(name = "storydev")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Glob matching story files, relative to the root
    #[arg(short, long, global = true, env = "STORYDEV_STORIES", default_value = DEFAULT_STORIES_GLOB)]
    stories: String,

    /// Project root
    #[arg(short, long, global = true, env = "STORYDEV_ROOT", default_value = ".")]
    root: std::path::PathBuf,

    /// Host address to bind to
    #[arg(long, global = true, env = "STORYDEV_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, global = true, env = "STORYDEV_PORT", default_value = "61000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "STORYDEV_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, global = true, env = "STORYDEV_LOG_JSON")]
    log_json: bool,

    /// Debounce window for filesystem events, in milliseconds
    #[arg(long, global = true, env = "STORYDEV_DEBOUNCE_MS", default_value = "100")]
    debounce_ms: u64,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Watch the stories and serve them with live reload (default)
    Serve,
    /// Print the story catalog as meta.json and exit
    Meta,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            stories: self.stories.clone(),
            root: self.root.clone(),
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            log_json: self.log_json,
            debounce_ms: self.debounce_ms,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    let config = cli.config();
    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Meta => print_meta(&config).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!("storydev v{} starting...", env!("CARGO_PKG_VERSION"));

    init_metrics();

    let app = App::new(config)?;
    app.run().await
}

async fn print_meta(config: &Config) -> Result<()> {
    let builder = CatalogBuilder::new(&config.root, config.story_glob()?)?;
    let catalog = builder.build().await?;

    for warning in catalog.warnings() {
        tracing::warn!(%warning, "Catalog warning");
    }

    let json = serde_json::to_string_pretty(&MetaJson::from(&catalog))
        .map_err(|e| Error::internal(format!("failed to serialize meta.json: {e}")))?;
    println!("{json}");
    Ok(())
}
