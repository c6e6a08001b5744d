//! # docsearch CLI
//!
//! ## Usage
//!
//! ```bash
//! docsearch --config ./config/docsearch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docsearch init` | Create the SQLite database and schema |
//! | `docsearch upload <files>...` | Extract, chunk, embed and store documents |
//! | `docsearch list` | Show the document library |
//! | `docsearch get <id>` | Print a document and its chunks |
//! | `docsearch delete <id>` | Delete a document |
//! | `docsearch search "<query>"` | Rank documents against a query |
//! | `docsearch stats` | Database summary |
//! | `docsearch credentials ...` | Manage encrypted API keys |
//! | `docsearch logs` | Filter or summarize the daily log files |
//! | `docsearch serve` | Start the HTTP API |

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use docsearch::config::{self, Config};
use docsearch::credentials::{self, CredentialStore};
use docsearch::library::{DocumentSummary, LibraryQuery, SortOrder};
use docsearch::logs::{self, LogLevel, LogQuery};
use docsearch::progress::ProgressMode;
use docsearch::service::DocService;
use docsearch::{get, logging, migrate, search, server, stats};

/// docsearch: upload documents and search them by meaning.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docsearch.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "docsearch", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Upload one or more .txt or .pdf files.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Progress output on stderr: off, human or json.
        /// Defaults to human when stderr is a terminal.
        #[arg(long)]
        progress: Option<ProgressMode>,
    },

    /// List stored documents.
    List {
        /// Keep documents whose filename or text contains this (case-insensitive).
        #[arg(long)]
        filter: Option<String>,

        /// newest, oldest, filename-asc or filename-desc.
        #[arg(long, default_value = "newest")]
        sort: SortOrder,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Print a document by id.
    Get { id: String },

    /// Delete a document by id.
    Delete { id: String },

    /// Semantic search over stored documents.
    Search {
        query: String,

        /// Number of documents to return (1 to retrieval.max_limit).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show database statistics.
    Stats,

    /// Manage encrypted credentials.
    Credentials {
        #[command(subcommand)]
        action: CredentialAction,
    },

    /// Read the daily log files under `[logging].dir`.
    Logs {
        /// Only entries at this level: trace, debug, info, warn or error.
        #[arg(long)]
        level: Option<LogLevel>,

        /// Keep entries whose message contains this (case-insensitive).
        #[arg(long)]
        grep: Option<String>,

        /// Only entries from this day (YYYY-MM-DD).
        #[arg(long, conflicts_with_all = ["since", "until", "all"])]
        date: Option<NaiveDate>,

        /// First day to include (YYYY-MM-DD). Defaults to a week ago.
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD).
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Include every day instead of the last week.
        #[arg(long, conflicts_with = "since")]
        all: bool,

        /// Print per-level counts for each log file instead of entries.
        #[arg(long)]
        stats: bool,

        /// Print JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Store a credential. Reads the value from stdin when omitted.
    Set { key: String, value: Option<String> },
    /// Print a credential (masked unless --reveal).
    Get {
        key: String,
        #[arg(long)]
        reveal: bool,
    },
    /// Remove one credential.
    Delete { key: String },
    /// Remove every stored credential.
    Clear,
    /// List stored credential names.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Credentials work without a config file.
    let cfg = match &cli.command {
        Commands::Credentials { .. } if !cli.config.exists() => Config::minimal(),
        _ => config::load_config(&cli.config)?,
    };
    // Reading logs should not append to them.
    if !matches!(cli.command, Commands::Logs { .. }) {
        logging::init_with_config(&cfg.logging)?;
    }

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { files, progress } => {
            let service = DocService::from_config(&cfg).await?;
            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            for path in &files {
                let receipt = service
                    .upload_file(path, reporter.as_ref())
                    .await
                    .with_context(|| format!("Failed to upload {}", path.display()))?;
                println!(
                    "Uploaded {} ({} chunks) id={}",
                    receipt.filename, receipt.chunks, receipt.id
                );
            }
        }
        Commands::List { filter, sort, json } => {
            let service = DocService::from_config(&cfg).await?;
            let docs = service.list(&LibraryQuery { filter, sort }).await?;
            let summaries: Vec<DocumentSummary> = docs.iter().map(DocumentSummary::from).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print_library(&summaries);
            }
        }
        Commands::Get { id } => {
            let service = DocService::from_config(&cfg).await?;
            get::run_get(&service, &id).await?;
        }
        Commands::Delete { id } => {
            let service = DocService::from_config(&cfg).await?;
            if !service.delete(&id).await? {
                bail!("document not found: {}", id);
            }
            println!("Deleted {}", id);
        }
        Commands::Search { query, limit } => {
            let limit = limit.unwrap_or(cfg.retrieval.default_limit);
            if limit < 1 || limit > cfg.retrieval.max_limit {
                bail!("--limit must be between 1 and {}", cfg.retrieval.max_limit);
            }
            let service = DocService::from_config(&cfg).await?;
            search::run_search(&service, &query, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Credentials { action } => {
            let store = CredentialStore::open(&cfg.credentials.dir).await?;
            run_credentials(&store, action).await?;
            store.close().await;
        }
        Commands::Logs {
            level,
            grep,
            date,
            since,
            until,
            all,
            stats,
            json,
        } => {
            let (since, until) = match date {
                Some(day) => (Some(day), Some(day)),
                None if all => (None, until),
                None => {
                    let today = chrono::Local::now().date_naive();
                    let week_ago = today
                        .checked_sub_days(chrono::Days::new(logs::DEFAULT_WINDOW_DAYS))
                        .unwrap_or(today);
                    (Some(since.unwrap_or(week_ago)), until)
                }
            };
            let query = LogQuery {
                level,
                grep,
                since,
                until,
            };
            logs::run_logs(&cfg.logging, &query, stats, json)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_credentials(store: &CredentialStore, action: CredentialAction) -> Result<()> {
    match action {
        CredentialAction::Set { key, value } => {
            let value = match value {
                Some(v) => v,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line.trim_end_matches(['\r', '\n']).to_string()
                }
            };
            if value.is_empty() {
                bail!("credential value must not be empty");
            }
            store.set(&key, &value).await?;
            println!("Saved {}", key);
        }
        CredentialAction::Get { key, reveal } => match store.get(&key).await? {
            Some(value) if reveal => println!("{}", value),
            Some(value) => println!("{}: {}", key, credentials::mask(&value)),
            None => bail!("no credential stored for {}", key),
        },
        CredentialAction::Delete { key } => {
            if !store.delete(&key).await? {
                bail!("no credential stored for {}", key);
            }
            println!("Deleted {}", key);
        }
        CredentialAction::Clear => {
            let removed = store.clear_all().await?;
            println!("Cleared {} credential(s).", removed);
        }
        CredentialAction::List => {
            for key in store.keys().await? {
                println!("{}", key);
            }
        }
    }
    Ok(())
}

fn print_library(docs: &[DocumentSummary]) {
    if docs.is_empty() {
        println!("No documents found. Upload some documents to get started!");
        return;
    }
    for doc in docs {
        println!("{}", doc.filename);
        println!("    id: {}", doc.id);
        println!("    uploaded: {}", doc.uploaded);
        println!("    chunks: {} ({} embedded)", doc.chunks, doc.embedded_chunks);
        println!("    {}", doc.preview);
        println!();
    }
}
