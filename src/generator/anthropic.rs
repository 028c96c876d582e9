//! Anthropic messages API client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_for_status, non_empty, GenerationRequest, GenerationSettings, Generator};
use crate::error::GenerateError;

/// Default Claude model.
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Async client for `/messages`.
pub struct AnthropicGenerator {
    client: Client,
    endpoint: String,
    model: String,
    settings: GenerationSettings,
}

impl AnthropicGenerator {
    /// Builds a new Anthropic client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        settings: GenerationSettings,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Anthropic API key");
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Anthropic API key")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Anthropic HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
            model,
            settings,
        })
    }

    fn body<'a>(&'a self, request: &GenerationRequest<'a>) -> AnthropicRequest<'a> {
        let mut content = Vec::with_capacity(2);
        if let Some(image) = request.image {
            content.push(AnthropicContentBlock::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: image.mime_type,
                    data: image.base64(),
                },
            });
        }
        content.push(AnthropicContentBlock::Text {
            text: request.prompt,
        });
        AnthropicRequest {
            model: &self.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content,
            }],
        }
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError> {
        let body = self.body(request);
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let parsed: AnthropicResponse = error_for_status(resp).await?.json().await?;
        non_empty(parsed.text())
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: Vec<AnthropicContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl AnthropicResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicResponseBlock::Text { text } => Some(text),
                AnthropicResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
