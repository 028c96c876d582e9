//! Per-question orchestration: validate, describe, retrieve, generate, cite.

use std::sync::Arc;

use tracing::{instrument, warn};

use crate::embedder::Embedder;
use crate::error::RequestError;
use crate::generator::{fallback_answer, GenerationRequest, Generator};
use crate::image::{decode_image, ImageDescriber, FALLBACK_DESCRIPTION};
use crate::links::collect_links;
use crate::models::{AnswerResponse, QueryRequest};
use crate::prompt::{build_prompt, render_context};
use crate::retriever::Retriever;
use crate::vector_store::VectorStore;

/// Retrieval and citation limits applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Links returned per answer.
    pub max_links: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_links: 5,
        }
    }
}

/// Answers questions against a fixed store.
///
/// Only malformed input is surfaced as an error. Remote failures degrade:
/// a failed embedding yields an empty context, a failed image description
/// and a failed generation are replaced by fixed fallback text.
#[derive(Clone)]
pub struct AnswerService {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    describer: ImageDescriber,
    settings: PipelineSettings,
}

impl AnswerService {
    /// Wires the pipeline from its collaborators.
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            retriever: Retriever::new(store, embedder),
            describer: ImageDescriber::new(generator.clone()),
            generator,
            settings,
        }
    }

    /// Backing store.
    pub fn store(&self) -> &VectorStore {
        self.retriever.store()
    }

    /// Runs the full pipeline for one request.
    #[instrument(
        skip_all,
        fields(
            question_len = request.question.as_deref().map_or(0, str::len),
            has_image = request.image.is_some()
        )
    )]
    pub async fn answer(&self, request: QueryRequest) -> Result<AnswerResponse, RequestError> {
        let question = request
            .question
            .as_deref()
            .filter(|question| !question.trim().is_empty())
            .ok_or(RequestError::MissingQuestion)?;

        let image = match request.image.as_deref().map(str::trim) {
            Some(payload) if !payload.is_empty() => Some(decode_image(payload)?),
            _ => None,
        };

        let image_description = match &image {
            Some(image) => match self.describer.describe(image).await {
                Ok(description) => Some(description),
                Err(err) => {
                    warn!(error = %err, kind = %image.kind(), "image description failed, using fallback");
                    Some(FALLBACK_DESCRIPTION.to_string())
                }
            },
            None => None,
        };

        let chunks = match self.retriever.search(question, self.settings.top_k).await {
            Ok(chunks) => chunks,
            Err(err) => {
                warn!(error = %err, "query embedding failed, answering without context");
                Vec::new()
            }
        };

        let context = render_context(&chunks);
        let prompt = build_prompt(question, &context, image_description.as_deref());
        let answer = match self.generator.generate(&GenerationRequest::text(&prompt)).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(error = %err, "answer generation failed, using fallback");
                fallback_answer(&err).to_string()
            }
        };

        let links = collect_links(&chunks, self.settings.max_links);
        Ok(AnswerResponse { answer, links })
    }
}
