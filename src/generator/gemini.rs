//! Gemini `generateContent` client.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_for_status, non_empty, GenerationRequest, GenerationSettings, Generator};
use crate::embedder::gemini::{client, model_path};
use crate::error::GenerateError;

/// Default generative model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Async client for `models/*:generateContent`.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    settings: GenerationSettings,
}

impl GeminiGenerator {
    /// Builds a new Gemini generation client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        settings: GenerationSettings,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing Gemini model name");
        let client = client(api_key, settings.timeout)?;
        let endpoint = format!(
            "{}/{}:generateContent",
            base_url.trim_end_matches('/'),
            model_path(model)
        );
        Ok(Self {
            client,
            endpoint,
            settings,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError> {
        let body = GenerateContentRequest::new(request, &self.settings);
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let parsed: GenerateContentResponse = error_for_status(resp).await?.json().await?;
        non_empty(parsed.text())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(request: &GenerationRequest<'a>, settings: &GenerationSettings) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type,
                    data: image.base64(),
                },
            });
        }
        parts.push(Part::Text {
            text: request.prompt,
        });
        Self {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_tokens,
            },
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}
