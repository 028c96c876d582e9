//! Offline corpus loading and batch embedding for the store builder.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::embedder::Embedder;
use crate::embeddings::{Chunk, EmbeddedChunk};
use crate::error::StoreError;

/// Reads every chunk file (a JSON array of records) and concatenates them in
/// argument order.
pub fn load_chunks(paths: &[PathBuf]) -> Result<Vec<Chunk>, StoreError> {
    let mut chunks = Vec::new();
    for path in paths {
        let loaded = read_chunk_file(path)?;
        info!(path = %path.display(), chunks = loaded.len(), "loaded chunk file");
        chunks.extend(loaded);
    }
    Ok(chunks)
}

fn read_chunk_file(path: &Path) -> Result<Vec<Chunk>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Tally of one builder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Chunks read from the inputs.
    pub total: usize,
    /// Chunks that received an embedding.
    pub embedded: usize,
    /// Chunks dropped because their batch failed.
    pub failed: usize,
    /// Chunks dropped for having no content.
    pub skipped: usize,
}

/// Embeds `chunks` in batches of `batch_size`.
///
/// Blank chunks are skipped. A batch that still fails after the embedder's
/// own retries is logged and dropped; the rest of the corpus continues.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
    batch_size: usize,
) -> (Vec<EmbeddedChunk>, BuildReport) {
    let batch_size = batch_size.max(1);
    let mut report = BuildReport {
        total: chunks.len(),
        ..BuildReport::default()
    };
    let (usable, blank): (Vec<Chunk>, Vec<Chunk>) = chunks
        .into_iter()
        .partition(|chunk| !chunk.content.trim().is_empty());
    report.skipped = blank.len();

    let mut records = Vec::with_capacity(usable.len());
    let batches = usable.len().div_ceil(batch_size);
    for (batch_no, batch) in usable.chunks(batch_size).enumerate() {
        let inputs: Vec<String> = batch.iter().map(Chunk::embedding_text).collect();
        match embedder.embed_batch(&inputs).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                records.extend(batch.iter().cloned().zip(vectors).map(|(chunk, embedding)| {
                    EmbeddedChunk { chunk, embedding }
                }));
                report.embedded += batch.len();
                info!(batch = batch_no + 1, batches, "embedded batch");
            }
            Ok(vectors) => {
                warn!(
                    batch = batch_no + 1,
                    requested = batch.len(),
                    returned = vectors.len(),
                    "embedding count mismatch, dropping batch"
                );
                report.failed += batch.len();
            }
            Err(err) => {
                warn!(batch = batch_no + 1, error = %err, "embedding batch failed, dropping");
                report.failed += batch.len();
            }
        }
    }
    (records, report)
}
