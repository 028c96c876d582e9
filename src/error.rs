//! Error types for each pipeline layer.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorBody;

/// Failures while loading or assembling the vector store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Artifact could not be read or written.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Artifact is not valid JSON for the expected layout.
    #[error("invalid store artifact: {0}")]
    Parse(#[from] serde_json::Error),

    /// Embedding rows and metadata records disagree in count.
    #[error("store has {embeddings} embeddings but {metadata} metadata records")]
    LengthMismatch {
        /// Number of embedding rows.
        embeddings: usize,
        /// Number of metadata records.
        metadata: usize,
    },

    /// A row's length differs from the store dimension.
    #[error("embedding row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        /// Offending row index.
        row: usize,
        /// Store dimension.
        expected: usize,
        /// Row length.
        actual: usize,
    },

    /// Non-empty store declared with zero dimensions.
    #[error("store with {rows} rows must have a non-zero dimension")]
    ZeroDimension {
        /// Number of rows.
        rows: usize,
    },
}

/// Failures returned by embedding clients.
#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    /// Request exceeded the client timeout.
    #[error("embedding request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("embedding transport error: {0}")]
    Transport(String),

    /// Remote API answered with a non-success status.
    #[error("embedding API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    /// Remote API returned a different number of vectors than inputs.
    #[error("embedding API returned {returned} vectors for {requested} inputs")]
    CountMismatch {
        /// Inputs sent.
        requested: usize,
        /// Vectors received.
        returned: usize,
    },

    /// Remote API returned a zero-length vector.
    #[error("embedding API returned an empty vector")]
    Empty,

    /// Query vector length does not match the store.
    #[error("query embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch {
        /// Store dimension.
        expected: usize,
        /// Query vector length.
        actual: usize,
    },
}

impl EmbedError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbedError::Timeout | EmbedError::Transport(_) => true,
            EmbedError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for EmbedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EmbedError::Timeout
        } else if err.is_decode() {
            EmbedError::Decode(err.to_string())
        } else {
            EmbedError::Transport(err.to_string())
        }
    }
}

/// Failures returned by generative model clients.
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    /// Request exceeded the client timeout.
    #[error("generation request timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("generation transport error: {0}")]
    Transport(String),

    /// Remote API answered with a non-success status.
    #[error("generation API returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Response body did not match the expected shape.
    #[error("failed to decode generation response: {0}")]
    Decode(String),

    /// Remote API succeeded but produced no text.
    #[error("generation response contained no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerateError::Timeout
        } else if err.is_decode() {
            GenerateError::Decode(err.to_string())
        } else {
            GenerateError::Transport(err.to_string())
        }
    }
}

/// Caller-visible request rejections, rendered as HTTP 4xx.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// Question missing or blank.
    #[error("question is required.")]
    MissingQuestion,

    /// Image payload is not decodable base64.
    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    /// Image decoded but its format is not accepted.
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    /// Body was not the expected JSON document.
    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    /// Body exceeded the configured size cap.
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),
}

impl RequestError {
    /// HTTP status the rejection is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
