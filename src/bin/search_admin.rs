//! Search Index Administration
//!
//! Operator tooling for the paper index: lifecycle, diagnostics, ad-hoc
//! queries and loading papers from a JSON file.
//!
//! Usage:
//!     search_admin create --force
//!     search_admin stats
//!     search_admin search "graph neural networks" --category cs.LG --latest
//!     search_admin ingest papers.json

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use arxiv_search::config::Settings;
use arxiv_search::logging;
use arxiv_search::search::{self, PaperDocument, QuerySpec, SearchIndex, SortMode};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Administer the paper search index", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the index with the paper mapping
    Create {
        /// Drop an existing index first
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Delete the index (no-op when missing)
    Delete,
    /// Cluster health
    Health,
    /// Document count, size and health of the index
    Stats,
    /// Cluster information
    Info,
    /// Current index mapping
    Mapping,
    /// Current index settings
    Settings,
    /// Run a search and print the results
    Search {
        /// Query text; empty lists the newest papers
        #[arg(default_value = "")]
        text: String,
        /// Restrict to a category (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,
        #[arg(long, default_value_t = 10)]
        size: usize,
        #[arg(long, default_value_t = 0)]
        from: usize,
        /// Newest first instead of relevance
        #[arg(long, default_value_t = false)]
        latest: bool,
    },
    /// Index papers from a JSON array file
    Ingest { path: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_env().context("Failed to load settings")?;
    logging::init_tracing(args.verbose)?;

    let engine = search::connect(&settings.search)?;
    let index = SearchIndex::new(engine, settings.search.index_name.clone());

    match args.command {
        Command::Create { force } => {
            let created = index.create_index(force).await.context("Failed to create index")?;
            if created {
                println!("Created index {}", index.name());
            } else {
                println!("Index {} already exists", index.name());
            }
        }
        Command::Delete => {
            index.delete().await.context("Failed to delete index")?;
            println!("Deleted index {}", index.name());
        }
        Command::Health => {
            let health = index.cluster_health().await?;
            print_json(&health)?;
            if !health.status.is_healthy() {
                bail!("cluster is unhealthy");
            }
        }
        Command::Stats => print_json(&index.index_stats().await?)?,
        Command::Info => print_json(&index.cluster_info().await?)?,
        Command::Mapping => print_json(&index.mapping().await?)?,
        Command::Settings => print_json(&index.settings().await?)?,
        Command::Search {
            text,
            categories,
            size,
            from,
            latest,
        } => {
            let sort_mode = if latest { SortMode::Recency } else { SortMode::Relevance };
            let spec = QuerySpec::new(text)
                .with_categories(categories)
                .with_size(size)
                .with_from(from)
                .with_sort_mode(sort_mode);
            let results = index.search(&spec).await;
            print_json(&results)?;
            if let Some(error) = results.error {
                bail!("search failed: {error}");
            }
        }
        Command::Ingest { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let docs: Vec<PaperDocument> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse papers from {:?}", path))?;
            let result = index.bulk_index(&docs).await;
            print_json(&result)?;
        }
    }

    Ok(())
}
