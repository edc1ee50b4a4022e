//! CineStream CLI - Headless Player and Catalog Browser
//!
//! Features:
//! - Catalog browsing (list, home sections, details, search)
//! - Quality ladder inspection for catalog titles or raw stream URLs
//! - Simulated playback sessions over a headless surface

use clap::{Parser, Subcommand};
use cinestream_core::{AppConfig, MockCatalog};
use std::path::PathBuf;

mod commands;
mod output;

/// CineStream CLI - Streaming catalog and playback toolkit
#[derive(Parser)]
#[command(name = "cinestream-cli")]
#[command(version)]
#[command(about = "Browse the CineStream catalog and run headless playback sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog titles
    List {
        /// Only titles of this type (movies, shows, sports)
        #[arg(short = 't', long = "type")]
        content_type: Option<String>,
    },

    /// Show the home screen sections
    Home,

    /// Show one title with related titles
    Show {
        /// Catalog id
        id: u64,
    },

    /// Search titles and descriptions
    Search {
        /// Case-insensitive text to look for
        query: String,
    },

    /// Print the quality ladder of a stream
    Qualities {
        /// Catalog id or stream URL
        target: String,

        /// Seconds to wait for the manifest
        #[arg(long, default_value = "20")]
        timeout: u64,
    },

    /// Play a stream on a headless surface
    Play {
        /// Catalog id or stream URL
        target: String,

        /// Desired quality (auto, 1080p, 720p, ...)
        #[arg(short, long, default_value = "auto")]
        quality: String,

        /// Start muted
        #[arg(short, long)]
        muted: bool,

        /// Seconds of playback to simulate
        #[arg(short, long, default_value = "10")]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    cinestream_core::init();

    let config = match &cli.config {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::default(),
    };
    let catalog = MockCatalog::new(&config.catalog);

    let result = match cli.command {
        Commands::List { content_type } => {
            commands::list(&catalog, content_type.as_deref(), &cli.format).await
        }
        Commands::Home => commands::home(&catalog, &cli.format).await,
        Commands::Show { id } => commands::show(&catalog, id, &cli.format).await,
        Commands::Search { query } => commands::search(&catalog, &query, &cli.format).await,
        Commands::Qualities { target, timeout } => {
            commands::qualities(&catalog, &config, &target, timeout, &cli.format).await
        }
        Commands::Play { target, quality, muted, seconds } => {
            let options = commands::PlayOptions { quality, muted, seconds };
            commands::play(&catalog, &config, &target, options, &cli.format).await
        }
    };

    if let Err(err) = result {
        output::print_error(&err);
        std::process::exit(1);
    }

    Ok(())
}
