//! Build Search Index
//!
//! Pages every paper out of PostgreSQL and upserts it into the search index.
//!
//! Usage:
//!     build_search_index
//!     build_search_index --force --batch-size 500

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use arxiv_search::config::Settings;
use arxiv_search::db::{Database, PaperRepository, PgDatabase, Repository};
use arxiv_search::logging;
use arxiv_search::search::{self, BulkIndexResult, PaperDocument, SearchIndex};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Build the paper search index from PostgreSQL",
    long_about = "Indexes all papers from the database into the configured search engine.\n\
                  Re-running is safe: papers are upserted by arXiv id."
)]
struct Args {
    /// Papers fetched per database page
    #[arg(long, default_value_t = 1000)]
    batch_size: i64,

    /// Drop and recreate the index first
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_env().context("Failed to load settings")?;
    logging::init_tracing(args.verbose)?;

    let engine = search::connect(&settings.search)?;
    let index = SearchIndex::new(engine, settings.search.index_name.clone());
    let created = index
        .create_index(args.force)
        .await
        .context("Failed to create search index")?;
    info!(index = index.name(), created, "index ready");

    let mut database = PgDatabase::new(settings.postgres.clone());
    database
        .startup()
        .await
        .context("Failed to connect to database")?;
    let repository = PaperRepository::new(&database);

    let total_count = repository.count().await.context("Failed to get paper count")?;
    info!("Total papers to index: {}", total_count);

    let mut totals = BulkIndexResult::default();
    let mut offset = 0i64;
    loop {
        let papers = repository
            .list(args.batch_size, offset)
            .await
            .context("Failed to fetch papers")?;
        if papers.is_empty() {
            break;
        }

        let batch_len = papers.len() as i64;
        let docs: Vec<PaperDocument> = papers.into_iter().map(PaperDocument::from).collect();
        let result = index.bulk_index(&docs).await;
        totals.success += result.success;
        totals.failed += result.failed;

        info!(
            "Indexed batch of {} papers (total: {}/{}, {:.1}%)",
            batch_len,
            totals.total(),
            total_count,
            (totals.total() as f64 / total_count.max(1) as f64) * 100.0
        );
        offset += batch_len;
    }

    database.teardown().await;
    info!(
        index = index.name(),
        success = totals.success,
        failed = totals.failed,
        "Indexing complete"
    );

    Ok(())
}
