//! Brute-force top-k retrieval over the vector store.

use std::sync::Arc;

use tracing::debug;

use crate::embedder::Embedder;
use crate::embeddings::Chunk;
use crate::error::EmbedError;
use crate::vector_store::{normalize, VectorStore};

/// Embeds questions and scans the whole store for the closest chunks.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// Builds a retriever over `store`, embedding queries with `embedder`.
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Backing store.
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Returns up to `top_k` chunks ranked by similarity to `question`.
    ///
    /// There is no relevance threshold: a non-empty store always yields
    /// `min(top_k, len)` chunks.
    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<Chunk>, EmbedError> {
        let mut query = self.embedder.embed(question).await?;
        if !self.store.is_empty() && query.len() != self.store.dimension() {
            return Err(EmbedError::DimensionMismatch {
                expected: self.store.dimension(),
                actual: query.len(),
            });
        }
        if self.store.is_normalized() {
            normalize(&mut query);
        }
        let ranked = self.store.rank(&query, top_k);
        debug!(
            top_k,
            hits = ranked.len(),
            best = ranked.first().map(|(_, score)| *score),
            "ranked store"
        );
        Ok(ranked
            .into_iter()
            .filter_map(|(idx, _)| self.store.chunk(idx).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedder, FixedEmbedder};
    use pretty_assertions::assert_eq;

    fn three_chunk_store() -> Arc<VectorStore> {
        Arc::new(
            VectorStore::from_parts(
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
                vec![
                    Chunk::new("a.md", 0, "chunk1", Some("u1".into())),
                    Chunk::new("b.md", 0, "chunk2", Some("u2".into())),
                    Chunk::new("c.md", 0, "chunk3", Some("u3".into())),
                ],
            )
            .expect("valid store"),
        )
    }

    #[tokio::test(flavor = "current_thread")]
    async fn returns_best_matches_in_order() {
        let retriever = Retriever::new(
            three_chunk_store(),
            Arc::new(FixedEmbedder::new(vec![1.0, 0.0])),
        );
        let chunks = retriever.search("question", 2).await.expect("search");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["chunk1", "chunk3"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn repeated_queries_are_deterministic() {
        let retriever = Retriever::new(
            three_chunk_store(),
            Arc::new(FixedEmbedder::new(vec![0.6, 0.8])),
        );
        let first = retriever.search("same", 3).await.expect("search");
        let second = retriever.search("same", 3).await.expect("search");
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn embedding_failure_is_reported() {
        let retriever = Retriever::new(three_chunk_store(), Arc::new(FailingEmbedder::timeout()));
        assert!(matches!(
            retriever.search("q", 3).await,
            Err(EmbedError::Timeout)
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn dimension_mismatch_is_reported() {
        let retriever = Retriever::new(
            three_chunk_store(),
            Arc::new(FixedEmbedder::new(vec![1.0, 0.0, 0.0])),
        );
        assert!(matches!(
            retriever.search("q", 3).await,
            Err(EmbedError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn normalized_store_rescales_query() {
        let store = VectorStore::from_parts(
            vec![vec![10.0, 0.0], vec![1.0, 1.0]],
            vec![
                Chunk::new("a.md", 0, "long", None),
                Chunk::new("b.md", 0, "diagonal", None),
            ],
        )
        .expect("valid store");
        let retriever = Retriever::new(
            Arc::new(store.normalized()),
            Arc::new(FixedEmbedder::new(vec![1.0, 2.0])),
        );
        let chunks = retriever.search("q", 1).await.expect("search");
        assert_eq!(chunks[0].content, "diagonal");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_store_returns_nothing() {
        let store = VectorStore::from_parts(Vec::new(), Vec::new()).expect("empty");
        let retriever = Retriever::new(Arc::new(store), Arc::new(FixedEmbedder::new(vec![1.0])));
        assert!(retriever.search("q", 5).await.expect("search").is_empty());
    }
}
