//! `repo-rag` command line
//!
//! Every command takes the root of the indexed tree; its manifest and index
//! live in a store directory derived from that root. Results are printed as
//! JSON on stdout, logs go to stderr (`RUST_LOG` controls the level).

use anyhow::Result;
use clap::{Parser, Subcommand};
use repo_rag::{Config, PartitionMode, RagClient, RagError};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "repo-rag",
    about = "Incremental codebase indexing and file-coherent retrieval",
    version,
    long_version = LONG_VERSION
)]
struct Cli {
    /// Configuration file (TOML); defaults to the per-user config path
    #[arg(long, global = true, env = "REPO_RAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a source tree, re-embedding only new or modified files
    Train {
        path: PathBuf,

        /// Discard the manifest and the index first
        #[arg(long)]
        full: bool,
    },

    /// Add markdown/text documents to the knowledge partition
    Knowledge {
        /// Root of the indexed tree
        path: PathBuf,

        /// Document file or directory
        docs: PathBuf,
    },

    /// Retrieve context for a question
    Query {
        path: PathBuf,

        text: String,

        #[arg(long)]
        top_k: Option<usize>,

        /// code, knowledge or both
        #[arg(long)]
        mode: Option<PartitionMode>,
    },

    /// Show manifest and index statistics
    Stats { path: PathBuf },

    /// Remove the index and manifest of a tree
    Clear { path: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, RagError> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        None => Config::new(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Train { path, full } => {
            let client = RagClient::open(config, &path).await?;
            let response = client.train(full).await?;
            print_json(&response)?;
            client.close().await
        }
        Commands::Knowledge { path, docs } => {
            let client = RagClient::open(config, &path).await?;
            let response = client.ingest_knowledge(&docs).await?;
            print_json(&response)?;
            client.close().await
        }
        Commands::Query {
            path,
            text,
            top_k,
            mode,
        } => {
            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            let mode = mode.unwrap_or(config.retrieval.mode);
            let client = RagClient::open(config, &path).await?;
            let response = client.retrieve(&text, top_k, mode).await?;
            print_json(&response)?;
            client.close().await
        }
        Commands::Stats { path } => {
            let client = RagClient::open(config, &path).await?;
            print_json(&client.statistics().await?)?;
            client.close().await
        }
        Commands::Clear { path } => {
            let client = RagClient::open(config, &path).await?;
            client.clear().await?;
            client.close().await
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        let err = RagError::from(err);
        tracing::error!("{}", err);
        let code = if err.is_user_error() {
            2
        } else if err.is_service_unavailable() {
            3
        } else {
            1
        };
        std::process::exit(code);
    }
}
