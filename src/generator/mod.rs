//! Generative model clients used for answers and image descriptions.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::GenerateError;

pub use anthropic::AnthropicGenerator;
pub use gemini::GeminiGenerator;
pub use openai::OpenAiGenerator;

/// Returned instead of an answer when generation fails.
pub const FALLBACK_ANSWER: &str = "Sorry, couldn't fetch an answer due to a technical issue.";
/// Returned when the model answered without any text.
pub const EMPTY_ANSWER: &str = "Sorry, no valid answer returned.";

/// Inline image attached to a generation request.
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    /// Raw image bytes.
    pub bytes: &'a [u8],
    /// MIME type, e.g. `image/png`.
    pub mime_type: &'static str,
}

impl ImageInput<'_> {
    /// Standard base64 encoding of the image bytes.
    pub fn base64(&self) -> String {
        STANDARD.encode(self.bytes)
    }

    /// `data:` URL form used by chat-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64())
    }
}

/// Single-turn generation request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Instruction and context text.
    pub prompt: &'a str,
    /// Optional image the prompt refers to.
    pub image: Option<ImageInput<'a>>,
}

impl<'a> GenerationRequest<'a> {
    /// Text-only request.
    pub fn text(prompt: &'a str) -> Self {
        Self {
            prompt,
            image: None,
        }
    }

    /// Request carrying an image alongside the prompt.
    pub fn with_image(prompt: &'a str, image: ImageInput<'a>) -> Self {
        Self {
            prompt,
            image: Some(image),
        }
    }
}

/// Sampling and transport settings shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Remote generative model. One call per request, no retries.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produces free text for `request`.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError>;
}

/// Maps a failed generation to the user-facing fallback text.
pub fn fallback_answer(err: &GenerateError) -> &'static str {
    match err {
        GenerateError::EmptyResponse => EMPTY_ANSWER,
        _ => FALLBACK_ANSWER,
    }
}

pub(crate) async fn error_for_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, GenerateError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(GenerateError::Status {
        status: status.as_u16(),
        body,
    })
}

pub(crate) fn non_empty(text: String) -> Result<String, GenerateError> {
    if text.trim().is_empty() {
        Err(GenerateError::EmptyResponse)
    } else {
        Ok(text)
    }
}
