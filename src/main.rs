//! ragdex CLI entry point

use clap::{Parser, Subcommand};
use ragdex::{
    commands::{
        cmd_ingest, cmd_init, cmd_query, cmd_status, print_ingest_stats, print_query_results,
        print_status, IngestOptions, QueryOptions,
    },
    config::Config,
    embed::create_embedder,
    error::Result,
    store::VectorStore,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragdex")]
#[command(version, about = "Local RAG ingestion and query CLI", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize ragdex configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,

        /// Base directory (defaults to ~/.ragdex)
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },

    /// Ingest a directory of documents into the index
    Ingest {
        /// Path to directory containing .txt and .pdf files
        #[arg(required_unless_present = "from_json", conflicts_with = "from_json")]
        input_dir: Option<PathBuf>,

        /// Re-embed chunk records from a previously exported JSON file
        #[arg(long)]
        from_json: Option<PathBuf>,

        /// Target collection (defaults to the configured one)
        #[arg(long)]
        collection: Option<String>,

        /// Write embedded chunks to a JSON file instead of the index
        #[arg(long)]
        export_json: Option<PathBuf>,
    },

    /// Query the index for the most similar chunks
    Query {
        /// The search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Collection to search (defaults to the configured one)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Show configured paths and collection state
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Handle init specially (doesn't need existing config)
    if let Commands::Init { force, base_dir } = &cli.command {
        return cmd_init(base_dir.clone(), *force).await;
    }

    // Load configuration
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::load_from(None)?,
    };

    let store = VectorStore::open(&config.paths.db_file).await?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Ingest {
            input_dir,
            from_json,
            collection,
            export_json,
        } => {
            let embedder = create_embedder(&config.embedding, config.api_key()?)?;

            let stats = cmd_ingest(
                &config,
                &store,
                embedder.as_ref(),
                IngestOptions {
                    input_dir,
                    from_json,
                    collection,
                    export_json,
                },
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_ingest_stats(&stats);
            }
        }

        Commands::Query {
            query,
            top_k,
            collection,
        } => {
            let embedder = create_embedder(&config.embedding, config.api_key()?)?;

            let options = QueryOptions { top_k, collection };
            let result = cmd_query(&config, &store, embedder.as_ref(), &query, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_query_results(&result);
            }
        }

        Commands::Status => {
            let report = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_status(&report);
            }
        }
    }

    Ok(())
}
