use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rag_api::config::ServeConfig;
use rag_api::{api, telemetry, AnswerService, Embedder, RetryingEmbedder, VectorStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServeConfig::parse();
    telemetry::init(cli.log_format);

    let mut store = VectorStore::load(&cli.store)
        .with_context(|| format!("failed to load store {}", cli.store.display()))?;
    if cli.normalize {
        store = store.normalized();
    }
    info!(
        path = %cli.store.display(),
        chunks = store.len(),
        dimension = store.dimension(),
        normalized = store.is_normalized(),
        "loaded vector store"
    );

    let mut embedder = cli
        .embedder
        .build(&cli.providers)
        .context("failed to configure embedding client")?;
    if cli.embed_max_retries > 0 {
        let retrying: Arc<dyn Embedder> =
            Arc::new(RetryingEmbedder::new(embedder, cli.embed_retry()));
        embedder = retrying;
    }
    let generator = cli
        .llm
        .build(&cli.providers)
        .context("failed to configure generation client")?;

    let service = AnswerService::new(Arc::new(store), embedder, generator, cli.pipeline());
    let app = api::router(service, cli.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind))?;
    info!(addr = %cli.bind, max_body_bytes = cli.max_body_bytes, "rag-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
