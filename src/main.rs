use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assistant::{cli, config, server};

#[derive(Parser)]
#[command(name = "assistant", version, about = "Personal agenda, radar and knowledge-backed chat")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Ingest JSON files from the knowledge directory
    Sync {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print today's tasks, the next days and the radar list
    Agenda {
        /// Number of days in the upcoming list
        #[arg(long, default_value_t = 14)]
        days: i64,
        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Include occurrences already marked done
        #[arg(long)]
        all: bool,
    },
    /// Keyword search over the knowledge base
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Check database health and configuration
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::AssistantConfig::load()?;

    // Log to stderr so command output on stdout stays clean.
    let filter =
        EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Sync { dry_run } => cli::sync::sync(&config, dry_run)?,
        Command::Agenda { days, date, all } => cli::agenda::agenda(&config, date, days, all)?,
        Command::Search { query, limit } => cli::search::search(&config, &query, limit)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
    }

    Ok(())
}
