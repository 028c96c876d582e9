//! Embedding clients that turn text into dense vectors.

pub mod gemini;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EmbedError;
use crate::retry::RetryPolicy;

pub use gemini::GeminiEmbedder;
pub use openai::OpenAiEmbedder;

/// Remote embedding model.
///
/// Implementations return one vector per input, in input order. Vectors are
/// expected to be unit length; the store only rescales them when it was
/// loaded with normalization enabled.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of inputs.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embeds a single input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        let vector = vectors.pop().ok_or(EmbedError::CountMismatch {
            requested: 1,
            returned: 0,
        })?;
        if vector.is_empty() {
            return Err(EmbedError::Empty);
        }
        Ok(vector)
    }
}

/// Wraps another embedder and retries transient failures with backoff.
pub struct RetryingEmbedder {
    inner: Arc<dyn Embedder>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    /// Applies `policy` to every batch sent through `inner`.
    pub fn new(inner: Arc<dyn Embedder>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Embedder for RetryingEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.policy
            .run("embed_batch", || self.inner.embed_batch(inputs))
            .await
    }
}

pub(crate) fn ensure_count(requested: usize, returned: usize) -> Result<(), EmbedError> {
    if requested == returned {
        Ok(())
    } else {
        Err(EmbedError::CountMismatch {
            requested,
            returned,
        })
    }
}
