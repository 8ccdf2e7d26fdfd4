//! shelfctl CLI - Book inventory over interchangeable record stores
//!
//! Every command opens the configured store, performs one request and exits:
//! - `memory` backend: scratch store, gone when the process exits
//! - `csv` backend: one file rewritten per change
//! - `sqlite` backend: `books` table through sqlx
//!
//! Store selection: config file, then SHELFCTL_* / DATABASE_URL env, then flags.
//! `shelfctl config init` writes that merged selection back to the config file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shelfctl_core::{open_store, Backend, ShelfConfig, StoreConfig};
use tracing::{debug, info};

mod commands;
mod tracing_setup;

use commands::book::{AddArgs, AvgArgs, ExistsArgs, FindArgs, IdArgs, StockArgs, UpdateArgs};
use commands::config::ConfigArgs;
use commands::import::ImportArgs;
use commands::OutputFormat;
use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "shelfctl",
    author,
    version,
    about = "Book inventory with memory, CSV and SQLite record stores"
)]
struct Cli {
    /// Config file (default: ~/.shelfctl/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Record store backend (memory, csv, sqlite)
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// CSV file for the csv backend
    #[arg(long, global = true, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// SQLite URL for the sqlite backend (e.g. sqlite://books.db)
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    /// Output JSON
    #[arg(long, global = true)]
    json: bool,

    /// Print ids only
    #[arg(long, short = 'q', global = true, conflicts_with = "json")]
    quiet: bool,

    /// Debug logging to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the config file
    Config(ConfigArgs),
    #[command(flatten)]
    Book(BookCommands),
}

#[derive(Subcommand, Debug)]
enum BookCommands {
    /// Add a book
    Add(AddArgs),
    /// Add every book in a CSV file (all or nothing)
    Import(ImportArgs),
    /// Show one book
    Get(IdArgs),
    /// List all books in storage order
    List,
    /// Change fields of a book
    Update(UpdateArgs),
    /// Mark a book in or out of stock
    Stock(StockArgs),
    /// Delete a book
    Delete(IdArgs),
    /// Check whether a title or ISBN is present
    Exists(ExistsArgs),
    /// Filter, sort and page through books
    Find(FindArgs),
    /// Number of books
    Count,
    /// Average price or page count
    Avg(AvgArgs),
    /// Cheapest book
    Cheapest,
    /// Most expensive book
    Priciest,
}

impl Cli {
    /// Config file + env, with command-line flags on top
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match self.command {
            // `config init` may be about to create the file
            Commands::Config(_) => ShelfConfig::load_or_default(self.config.as_deref())?,
            Commands::Book(_) => ShelfConfig::load(self.config.as_deref())?,
        }
        .store;

        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(csv) = &self.csv {
            config.csv_path = csv.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = url.clone();
        }

        Ok(config)
    }
}

/// Load .env from the current directory, then ~/.shelfctl/.env
///
/// dotenvy never overwrites variables that are already set, so the current
/// directory wins over the config directory and the real environment wins over both.
fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
    }

    let env_file = ShelfConfig::config_dir().join(".env");
    if env_file.exists() {
        match dotenvy::from_path(&env_file) {
            Ok(_) => debug!("Loaded .env from {}", env_file.display()),
            Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();
    load_dotenv();

    let config = cli.store_config().context("Failed to load configuration")?;
    info!(backend = %config.backend, "configuration loaded");

    let command = match cli.command {
        Commands::Config(args) => return commands::run_config(args, cli.config.as_deref(), config),
        Commands::Book(command) => command,
    };

    let store = open_store(&config)
        .await
        .context(format!("Failed to open {} store", config.backend))?;
    let store = store.as_ref();
    let format = OutputFormat::from_flags(cli.json, cli.quiet);

    match command {
        BookCommands::Add(args) => commands::run_add(store, args, format).await?,
        BookCommands::Import(args) => commands::run_import(store, args, format).await?,
        BookCommands::Get(args) => commands::run_get(store, args, format).await?,
        BookCommands::List => commands::run_list(store, format).await?,
        BookCommands::Update(args) => commands::run_update(store, args, format).await?,
        BookCommands::Stock(args) => commands::run_stock(store, args, format).await?,
        BookCommands::Delete(args) => commands::run_delete(store, args, format).await?,
        BookCommands::Exists(args) => commands::run_exists(store, args, format).await?,
        BookCommands::Find(args) => commands::run_find(store, args, format).await?,
        BookCommands::Count => commands::run_count(store, format).await?,
        BookCommands::Avg(args) => commands::run_avg(store, args, format).await?,
        BookCommands::Cheapest => commands::run_cheapest(store, format).await?,
        BookCommands::Priciest => commands::run_priciest(store, format).await?,
    }
    Ok(())
}
