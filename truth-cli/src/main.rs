//! Truth CLI - Command-line access to the Truth Engine history core

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use truth_core::prelude::*;

#[derive(Parser)]
#[command(name = "truth")]
#[command(about = "Truth Engine local history CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question under the active model
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Long-term history commands
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Active conversation commands
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Write a backup of the history
    Export {
        /// Directory the backup file is written to
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print the backup instead of writing a file
        #[arg(long)]
        stdout: bool,
    },
    /// Merge a backup file into the history
    Import {
        /// Backup file
        file: PathBuf,
    },
    /// Show or change the theme
    Theme {
        /// New theme name
        name: Option<String>,
    },
    /// Show or change the answer model
    Model {
        /// New model identifier
        name: Option<String>,
    },
    /// Print the effective configuration
    Config,
    /// Version information
    Version,
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List entries, newest first
    List {
        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every entry
    Clear,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Show the active conversation
    Show {
        /// Print the rendered follow-up context instead
        #[arg(long)]
        context: bool,
    },
    /// Start a new chat
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("truth {}", env!("CARGO_PKG_VERSION"));
        println!("truth-core {}", truth_core::VERSION);
        return Ok(());
    }

    let mut config = TruthConfig::load()?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    tracing::debug!(data_dir = %config.storage.data_dir.display(), "Configuration loaded");

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let store = Arc::new(FileStore::open(&config.storage.data_dir).with_context(|| {
        format!(
            "Failed to open data directory {}",
            config.storage.data_dir.display()
        )
    })?);
    let provider = Arc::new(MockAnswerProvider::new(config.query.mock_latency));
    let engine = TruthEngine::initialize(config, store, provider);

    let outcome = run(&engine, cli.command).await;
    report(&engine);
    outcome
}

async fn run(engine: &TruthEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Ask { query } => {
            let answer = engine.submit_query(&query.join(" ")).await?;
            println!("{}", answer.answer);
        }
        Commands::History { command } => match command {
            HistoryCommands::List { limit, json } => {
                let entries = engine.history().await;
                let shown = &entries[..limit.unwrap_or(entries.len()).min(entries.len())];
                if json {
                    println!("{}", serde_json::to_string_pretty(shown)?);
                } else {
                    for entry in shown {
                        println!("[{}] ({}) {}", entry.id, entry.model, entry.query);
                        println!("    {}", entry.answer);
                    }
                    println!("{} of {} entries", shown.len(), entries.len());
                }
            }
            HistoryCommands::Clear => engine.clear_history().await?,
        },
        Commands::Session { command } => match command {
            SessionCommands::Show { context: true } => println!("{}", engine.context().await),
            SessionCommands::Show { context: false } => {
                for turn in engine.session().await {
                    println!("User: {}\nAI: {}\n", turn.query, turn.answer);
                }
            }
            SessionCommands::Clear => engine.new_chat().await?,
        },
        Commands::Export { dir, stdout } => {
            if stdout {
                println!("{}", engine.export_history().await.to_json()?);
            } else {
                let path = engine.save_export(&dir).await?;
                println!("{}", path.display());
            }
        }
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let summary = engine.import_history(&raw).await?;
            println!(
                "Imported {} conversations ({} total)",
                summary.imported, summary.total
            );
        }
        Commands::Theme { name } => match name {
            Some(name) => engine.set_theme(&name).await?,
            None => println!("{}", engine.preferences().await.theme),
        },
        Commands::Model { name } => match name {
            Some(name) => engine.set_model(&name).await?,
            None => println!("{}", engine.preferences().await.model),
        },
        Commands::Config | Commands::Version => {}
    }

    Ok(())
}

/// Surface the toast a front end would have shown
fn report(engine: &TruthEngine) {
    let notification = engine.notification();
    if notification.visible {
        eprintln!("{}", notification.message);
    }
}
