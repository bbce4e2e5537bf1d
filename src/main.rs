use anyhow::{Context, Result};
use std::sync::Arc;

use arxiv_search::config::Settings;
use arxiv_search::search::{self, SearchIndex};
use arxiv_search::{create_app, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    logging::init_tracing(false)?;

    tracing::info!(
        service = %settings.service_name,
        version = %settings.app_version,
        environment = settings.environment.as_str(),
        "starting"
    );

    let engine = search::connect(&settings.search).context("Failed to create search engine client")?;
    let index = SearchIndex::new(engine, settings.search.index_name.clone());

    match index.create_index(false).await {
        Ok(true) => tracing::info!(index = index.name(), "search index created"),
        Ok(false) => tracing::info!(index = index.name(), "search index already present"),
        // Serve anyway; search reports the problem per request.
        Err(e) => tracing::warn!(index = index.name(), error = %e, "could not ensure search index"),
    }

    let bind_addr = settings.bind_addr;
    let app = create_app(index, Arc::new(settings));

    tracing::info!(%bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
