use anyhow::{bail, Context, Result};
use clap::Parser;
use rag_api::config::BuildConfig;
use rag_api::corpus::{embed_chunks, load_chunks};
use rag_api::{telemetry, RetryingEmbedder, StoreArtifact};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BuildConfig::parse();
    telemetry::init(cli.log_format);

    let chunks = load_chunks(&cli.inputs).context("failed to read chunk files")?;
    info!(chunks = chunks.len(), files = cli.inputs.len(), "loaded corpus");

    let embedder = cli
        .embedder
        .build(&cli.providers)
        .context("failed to configure embedding client")?;
    let embedder = RetryingEmbedder::new(embedder, cli.retry());

    let (records, report) = embed_chunks(&embedder, chunks, cli.batch_size).await;
    if report.failed > 0 {
        warn!(failed = report.failed, "some chunks were not embedded");
    }
    if records.is_empty() {
        bail!("no chunks were embedded ({} read)", report.total);
    }

    let artifact = StoreArtifact::from_records(records).context("inconsistent embeddings")?;
    artifact
        .write(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!(
        output = %cli.output.display(),
        embedded = report.embedded,
        skipped = report.skipped,
        failed = report.failed,
        dimension = artifact.dimension,
        "store written"
    );
    Ok(())
}
