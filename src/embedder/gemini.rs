//! Google Generative Language embedding client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ensure_count, Embedder};
use crate::error::EmbedError;

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-004";
/// Default API root for Generative Language endpoints.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Task type requested for every embedding.
pub const TASK_TYPE: &str = "SEMANTIC_SIMILARITY";

/// Async client for `models/*:batchEmbedContents`.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model_path: String,
    dimensions: Option<usize>,
}

impl GeminiEmbedder {
    /// Builds a new Gemini embeddings client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = client(api_key, timeout)?;
        anyhow::ensure!(!model.trim().is_empty(), "missing Gemini model name");
        let model_path = model_path(model);
        let endpoint = format!(
            "{}/{}:batchEmbedContents",
            base_url.trim_end_matches('/'),
            model_path
        );
        Ok(Self {
            client,
            endpoint,
            model_path,
            dimensions,
        })
    }

    /// Fully-qualified model resource (`models/...`).
    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

/// HTTP client carrying the Gemini API key header.
pub(crate) fn client(api_key: &str, timeout: Duration) -> Result<Client> {
    anyhow::ensure!(!api_key.trim().is_empty(), "missing Gemini API key");
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key.trim()).context("invalid Gemini API key")?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .context("failed to build Gemini HTTP client")
}

/// Accepts both `text-embedding-004` and `models/text-embedding-004`.
pub(crate) fn model_path(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let request = BatchEmbedRequest {
            requests: inputs
                .iter()
                .map(|text| EmbedContentRequest {
                    model: &self.model_path,
                    content: Content {
                        parts: vec![TextPart { text }],
                    },
                    task_type: TASK_TYPE,
                    output_dimensionality: self.dimensions,
                })
                .collect(),
        };
        let resp = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbedError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: BatchEmbedResponse = resp.json().await?;
        parsed.into_vectors(inputs.len())
    }
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl BatchEmbedResponse {
    fn into_vectors(self, requested: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
        ensure_count(requested, self.embeddings.len())?;
        Ok(self
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}
