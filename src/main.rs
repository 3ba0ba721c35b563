//! # docqa CLI
//!
//! Question answering over a local folder of PDF and TXT documents.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and the collection |
//! | `docqa index` | Index new and changed documents |
//! | `docqa ask "<question>"` | Index changes, then answer one question |
//! | `docqa chat` | Index changes, then answer questions read line by line from stdin |
//! | `docqa search "<query>"` | Show the retrieved chunks without generating |
//! | `docqa status` | List documents and whether they are indexed |
//!
//! `ask` and `chat` bring the index up to date before the first question;
//! pass `--no-index` to query the store as it is.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use docqa::config::{self, Config};
use docqa::db;
use docqa::models::IndexReport;
use docqa::progress::ProgressMode;
use docqa::service::Service;
use docqa::status::{collect_status, print_status};
use docqa::store::SqliteVectorStore;

/// docqa: answer questions from your own documents.
#[derive(Parser)]
#[command(name = "docqa", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and collection. Safe to run repeatedly.
    Init,

    /// Index new and changed documents in the documents folder.
    Index {
        /// Progress output on stderr. Defaults to `human` on a terminal, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Answer a single question.
    Ask {
        question: String,

        #[command(flatten)]
        refresh: RefreshArgs,
    },

    /// Interactive session: one question per line, `exit` or EOF to quit.
    Chat {
        #[command(flatten)]
        refresh: RefreshArgs,
    },

    /// Retrieve chunks for a query without calling the language model.
    Search {
        query: String,

        /// Number of chunks to retrieve (defaults to `retrieval.k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Show which documents are indexed.
    Status,
}

/// Index refresh run before answering questions.
#[derive(Args)]
struct RefreshArgs {
    /// Skip indexing new and changed documents before answering.
    #[arg(long)]
    no_index: bool,

    /// Progress output on stderr while indexing.
    #[arg(long, value_enum)]
    progress: Option<ProgressMode>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn load(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

async fn open_store(cfg: &Config) -> Result<SqliteVectorStore> {
    let pool = db::connect(cfg).await?;
    Ok(SqliteVectorStore::open(pool, cfg.db.collection.clone()).await?)
}

fn print_index_report(report: &IndexReport) {
    if report.is_up_to_date() && report.skipped.is_empty() {
        println!("All documents are up to date.");
        return;
    }
    for f in &report.new_files {
        println!("  new      {}", f);
    }
    for f in &report.updated_files {
        println!("  updated  {}", f);
    }
    for s in &report.skipped {
        println!("  skipped  {} ({})", s.filename, s.reason);
    }
    println!(
        "Indexed {} new, {} updated, {} skipped.",
        report.new_files.len(),
        report.updated_files.len(),
        report.skipped.len()
    );
}

/// Index changes before a question session. The summary goes to the log so
/// stdout carries only answers.
async fn refresh_index(service: &Service, args: &RefreshArgs) -> Result<()> {
    if args.no_index {
        return Ok(());
    }
    let reporter = args
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();
    let report = service.auto_index(reporter.as_ref()).await?;
    tracing::info!(
        new = report.new_files.len(),
        updated = report.updated_files.len(),
        skipped = report.skipped.len(),
        "index refreshed"
    );
    Ok(())
}

async fn run_search(service: &Service, query: &str, k: usize) -> Result<()> {
    let result = service.search(query, k).await?;
    if result.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let origin = serde_json::to_value(result.origin)?;
    for (i, ((id, text), distance)) in result
        .ids
        .iter()
        .zip(&result.documents)
        .zip(&result.distances)
        .enumerate()
    {
        let preview: String = text.chars().take(200).collect();
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            distance,
            id,
            origin.as_str().unwrap_or("semantic")
        );
        println!("    {}", preview.replace('\n', " "));
    }
    Ok(())
}

async fn run_chat(service: &Service) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin);
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            eprint!("> ");
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        println!("{}", service.chat(question).await);
        println!();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = open_store(&cfg).await?;
            store.close().await;
            println!(
                "Database initialized at {} (collection '{}').",
                cfg.db.path.display(),
                cfg.db.collection
            );
        }
        Commands::Status => {
            let store = open_store(&cfg).await?;
            let report = collect_status(&store, &cfg.documents.folder).await?;
            print_status(&report, &cfg.db.path);
            store.close().await;
        }
        Commands::Index { progress } => {
            let service = Service::open(cfg).await?;
            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            let report = service.auto_index(reporter.as_ref()).await?;
            print_index_report(&report);
        }
        Commands::Ask { question, refresh } => {
            let service = Service::open(cfg).await?;
            refresh_index(&service, &refresh).await?;
            println!("{}", service.chat(&question).await);
        }
        Commands::Chat { refresh } => {
            let service = Service::open(cfg).await?;
            refresh_index(&service, &refresh).await?;
            run_chat(&service).await?;
        }
        Commands::Search { query, k } => {
            let k = k.unwrap_or(cfg.retrieval.k);
            let service = Service::open(cfg).await?;
            run_search(&service, &query, k).await?;
        }
    }

    Ok(())
}
