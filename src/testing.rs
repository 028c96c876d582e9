//! In-process stand-ins for remote models, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::embedder::Embedder;
use crate::error::{EmbedError, GenerateError};
use crate::generator::{GenerationRequest, Generator};

pub const JPEG_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00\x01";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";
pub const WEBP_BYTES: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 ";
pub const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00";

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Returns a per-text vector, falling back to a default for unknown text.
pub struct FixedEmbedder {
    default: Vec<f32>,
    by_text: HashMap<String, Vec<f32>>,
    inputs: Mutex<Vec<String>>,
}

impl FixedEmbedder {
    pub fn new(default: Vec<f32>) -> Self {
        Self {
            default,
            by_text: HashMap::new(),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.by_text.insert(text.to_string(), vector);
        self
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.inputs.lock().unwrap().extend(inputs.iter().cloned());
        Ok(inputs
            .iter()
            .map(|text| {
                self.by_text
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.default.clone())
            })
            .collect())
    }
}

/// Always fails with the configured error.
pub struct FailingEmbedder {
    error: EmbedError,
}

impl FailingEmbedder {
    pub fn new(error: EmbedError) -> Self {
        Self { error }
    }

    pub fn timeout() -> Self {
        Self::new(EmbedError::Timeout)
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(self.error.clone())
    }
}

/// Fails the first `failures` calls, then returns unit vectors.
pub struct FlakyEmbedder {
    failures: usize,
    error: EmbedError,
    calls: AtomicUsize,
}

impl FlakyEmbedder {
    pub fn new(failures: usize, error: EmbedError) -> Self {
        Self {
            failures,
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(self.error.clone());
        }
        Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Snapshot of a request seen by [`RecordingGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub prompt: String,
    pub image_mime: Option<&'static str>,
}

/// Replies with a fixed outcome and records every request.
pub struct RecordingGenerator {
    outcome: Result<String, GenerateError>,
    image_outcome: Option<Result<String, GenerateError>>,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl RecordingGenerator {
    pub fn answering(answer: &str) -> Self {
        Self {
            outcome: Ok(answer.to_string()),
            image_outcome: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerateError) -> Self {
        Self {
            outcome: Err(error),
            image_outcome: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the outcome for requests that carry an image.
    pub fn with_image_outcome(mut self, outcome: Result<String, GenerateError>) -> Self {
        self.image_outcome = Some(outcome);
        self
    }

    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerateError> {
        self.calls.lock().unwrap().push(RecordedRequest {
            prompt: request.prompt.to_string(),
            image_mime: request.image.map(|image| image.mime_type),
        });
        match (&request.image, &self.image_outcome) {
            (Some(_), Some(outcome)) => outcome.clone(),
            _ => self.outcome.clone(),
        }
    }
}
