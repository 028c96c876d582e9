//! Wire types for the question-answering HTTP surface.

use serde::{Deserialize, Serialize};

/// Incoming question, optionally with a base64 image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    /// Natural-language question.
    #[serde(default)]
    pub question: Option<String>,
    /// Base64 (or `data:` URL) encoded image.
    #[serde(default)]
    pub image: Option<String>,
}

impl QueryRequest {
    /// Text-only question.
    pub fn question(question: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            image: None,
        }
    }

    /// Attaches an encoded image.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Synthesized answer with citation links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    /// Free-text answer.
    pub answer: String,
    /// Deduplicated source links in retrieval order.
    pub links: Vec<Link>,
}

/// Citation pointing back to a retrieved chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Source URL.
    pub url: String,
    /// Leading snippet of the chunk content.
    pub text: String,
}

/// Body returned with 400 responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub error: String,
}

/// Body returned by the health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthBody {
    /// Always `ok` when serving.
    pub status: String,
    /// Number of chunks loaded.
    pub chunks: usize,
    /// Embedding dimension of the store.
    pub dimension: usize,
}
