#![warn(missing_docs)]
//! Retrieval-augmented question answering over a prebuilt embedding store.
//!
//! `build-store` embeds chunk files into a store artifact once; `rag-api`
//! loads it at startup and answers `POST /api` questions by ranking chunks,
//! prompting a generative model, and citing the source links.

pub mod api;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod embeddings;
pub mod error;
pub mod generator;
pub mod image;
pub mod links;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod retry;
pub mod telemetry;
pub mod vector_store;

#[cfg(test)]
mod testing;

pub use embedder::{Embedder, RetryingEmbedder};
pub use embeddings::{Chunk, EmbeddedChunk};
pub use error::{EmbedError, GenerateError, RequestError, StoreError};
pub use generator::{GenerationRequest, GenerationSettings, Generator};
pub use models::{AnswerResponse, Link, QueryRequest};
pub use pipeline::{AnswerService, PipelineSettings};
pub use retry::RetryPolicy;
pub use vector_store::{StoreArtifact, VectorStore};
