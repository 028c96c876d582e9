//! Command-line and environment configuration for both binaries.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, ValueEnum};
use tracing::info;

use crate::api;
use crate::embedder::{self, Embedder, GeminiEmbedder, OpenAiEmbedder};
use crate::generator::{
    self, AnthropicGenerator, GeminiGenerator, GenerationSettings, Generator, OpenAiGenerator,
};
use crate::pipeline::PipelineSettings;
use crate::retry::RetryPolicy;
use crate::telemetry::LogFormat;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Remote embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedProvider {
    /// Google Generative Language `batchEmbedContents`.
    Gemini,
    /// OpenAI-compatible `/embeddings`.
    Openai,
}

/// Remote generative backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmProvider {
    /// Google Generative Language `generateContent`.
    Gemini,
    /// OpenAI-compatible `/chat/completions`.
    Openai,
    /// Anthropic `/messages`.
    Anthropic,
}

/// API keys and endpoints for every provider.
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Google Generative Language API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Anthropic API key.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// Base URL for the Gemini API.
    #[arg(long, env = "RAG_API_GEMINI_BASE", default_value = embedder::gemini::DEFAULT_BASE_URL)]
    pub gemini_base_url: String,

    /// Base URL for OpenAI-compatible endpoints.
    #[arg(long, env = "RAG_API_OPENAI_BASE", default_value = OPENAI_BASE_URL)]
    pub openai_base_url: String,

    /// Base URL for the Anthropic API.
    #[arg(long, env = "RAG_API_ANTHROPIC_BASE", default_value = generator::anthropic::DEFAULT_BASE_URL)]
    pub anthropic_base_url: String,
}

impl ProviderArgs {
    fn key<'a>(key: &'a Option<String>, var: &str) -> Result<&'a str> {
        key.as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .with_context(|| format!("{var} is not set"))
    }
}

/// Embedding client selection.
#[derive(Args, Debug, Clone)]
pub struct EmbedderArgs {
    /// Embedding backend.
    #[arg(long, env = "RAG_API_EMBED_PROVIDER", value_enum, default_value_t = EmbedProvider::Gemini)]
    pub embed_provider: EmbedProvider,

    /// Embedding model identifier (provider default when omitted).
    #[arg(long, env = "RAG_API_EMBED_MODEL")]
    pub embed_model: Option<String>,

    /// Optional output dimension override.
    #[arg(long, env = "RAG_API_EMBED_DIMENSIONS")]
    pub embed_dimensions: Option<usize>,

    /// Seconds before embedding requests time out.
    #[arg(long, env = "RAG_API_EMBED_TIMEOUT_SECS", default_value_t = 30)]
    pub embed_timeout_secs: u64,
}

impl EmbedderArgs {
    /// Builds the configured embedding client.
    pub fn build(&self, providers: &ProviderArgs) -> Result<Arc<dyn Embedder>> {
        let timeout = Duration::from_secs(self.embed_timeout_secs);
        let embedder: Arc<dyn Embedder> = match self.embed_provider {
            EmbedProvider::Gemini => {
                let key = ProviderArgs::key(&providers.gemini_api_key, "GEMINI_API_KEY")?;
                let model = self
                    .embed_model
                    .as_deref()
                    .unwrap_or(embedder::gemini::DEFAULT_MODEL);
                let client = GeminiEmbedder::new(
                    key,
                    &providers.gemini_base_url,
                    model,
                    self.embed_dimensions,
                    timeout,
                )?;
                info!(model = client.model_path(), "using Gemini embeddings");
                Arc::new(client)
            }
            EmbedProvider::Openai => {
                let key = ProviderArgs::key(&providers.openai_api_key, "OPENAI_API_KEY")?;
                let model = self
                    .embed_model
                    .clone()
                    .unwrap_or_else(|| embedder::openai::DEFAULT_MODEL.to_string());
                let client = OpenAiEmbedder::new(
                    key,
                    &providers.openai_base_url,
                    model,
                    self.embed_dimensions,
                    timeout,
                )?;
                info!(model = client.model(), "using OpenAI embeddings");
                Arc::new(client)
            }
        };
        Ok(embedder)
    }
}

/// Generative client selection and sampling.
#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    /// Generative backend used for answers and image descriptions.
    #[arg(long, env = "RAG_API_LLM_PROVIDER", value_enum, default_value_t = LlmProvider::Gemini)]
    pub llm_provider: LlmProvider,

    /// Generative model identifier (provider default when omitted).
    #[arg(long, env = "RAG_API_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Sampling temperature.
    #[arg(long, env = "RAG_API_TEMPERATURE", default_value_t = 0.2)]
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[arg(long, env = "RAG_API_MAX_TOKENS", default_value_t = 1024)]
    pub max_tokens: usize,

    /// Seconds before generation requests time out.
    #[arg(long, env = "RAG_API_LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,
}

impl LlmArgs {
    /// Sampling and timeout settings.
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    /// Builds the configured generation client.
    pub fn build(&self, providers: &ProviderArgs) -> Result<Arc<dyn Generator>> {
        let settings = self.settings();
        let generator: Arc<dyn Generator> = match self.llm_provider {
            LlmProvider::Gemini => {
                let key = ProviderArgs::key(&providers.gemini_api_key, "GEMINI_API_KEY")?;
                let model = self
                    .llm_model
                    .as_deref()
                    .unwrap_or(generator::gemini::DEFAULT_MODEL);
                Arc::new(GeminiGenerator::new(
                    key,
                    &providers.gemini_base_url,
                    model,
                    settings,
                )?)
            }
            LlmProvider::Openai => {
                let key = ProviderArgs::key(&providers.openai_api_key, "OPENAI_API_KEY")?;
                let model = self
                    .llm_model
                    .clone()
                    .unwrap_or_else(|| generator::openai::DEFAULT_MODEL.to_string());
                Arc::new(OpenAiGenerator::new(
                    key,
                    &providers.openai_base_url,
                    model,
                    settings,
                )?)
            }
            LlmProvider::Anthropic => {
                let key = ProviderArgs::key(&providers.anthropic_api_key, "ANTHROPIC_API_KEY")?;
                let model = self
                    .llm_model
                    .clone()
                    .unwrap_or_else(|| generator::anthropic::DEFAULT_MODEL.to_string());
                Arc::new(AnthropicGenerator::new(
                    key,
                    &providers.anthropic_base_url,
                    model,
                    settings,
                )?)
            }
        };
        Ok(generator)
    }
}

/// Server configuration.
#[derive(Parser, Debug)]
#[command(
    name = "rag-api",
    about = "Question answering over a prebuilt embedding store"
)]
pub struct ServeConfig {
    /// Address to bind the HTTP server to (host:port).
    #[arg(long, env = "RAG_API_BIND", default_value = "0.0.0.0:5045")]
    pub bind: SocketAddr,

    /// Store artifact produced by `build-store`.
    #[arg(long, env = "RAG_API_STORE", default_value = "database.json")]
    pub store: PathBuf,

    /// Chunks retrieved per question.
    #[arg(long, env = "RAG_API_TOP_K", default_value_t = 5)]
    pub top_k: usize,

    /// Links returned per answer.
    #[arg(long, env = "RAG_API_MAX_LINKS", default_value_t = 5)]
    pub max_links: usize,

    /// Rescale stored rows and queries to unit length (cosine ranking).
    #[arg(long, env = "RAG_API_NORMALIZE")]
    pub normalize: bool,

    /// Largest accepted request body in bytes (base64 images included).
    #[arg(long, env = "RAG_API_MAX_BODY_BYTES", default_value_t = api::DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Retry attempts for transient query-embedding errors (0 fails fast).
    #[arg(long, env = "RAG_API_EMBED_MAX_RETRIES", default_value_t = 0)]
    pub embed_max_retries: usize,

    /// Log output format.
    #[arg(long, env = "RAG_API_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Embedding client selection.
    #[command(flatten)]
    pub embedder: EmbedderArgs,

    /// Generative client selection.
    #[command(flatten)]
    pub llm: LlmArgs,

    /// Provider keys and endpoints.
    #[command(flatten)]
    pub providers: ProviderArgs,
}

impl ServeConfig {
    /// Per-request retrieval limits.
    pub fn pipeline(&self) -> PipelineSettings {
        PipelineSettings {
            top_k: self.top_k,
            max_links: self.max_links,
        }
    }

    /// Backoff applied to query embeddings.
    pub fn embed_retry(&self) -> RetryPolicy {
        if self.embed_max_retries == 0 {
            return RetryPolicy::none();
        }
        RetryPolicy::new(
            self.embed_max_retries,
            Duration::from_millis(250),
            Duration::from_secs(2),
        )
    }
}

/// Store builder configuration.
#[derive(Parser, Debug)]
#[command(
    name = "build-store",
    about = "Embed chunk files into a store artifact for rag-api"
)]
pub struct BuildConfig {
    /// JSON chunk files (arrays of records), concatenated in order.
    #[arg(long = "input", short = 'i', required = true)]
    pub inputs: Vec<PathBuf>,

    /// Destination artifact path.
    #[arg(long, short = 'o', env = "RAG_API_STORE", default_value = "database.json")]
    pub output: PathBuf,

    /// Max inputs per embedding request.
    #[arg(long, env = "RAG_API_BATCH_SIZE", default_value_t = 32)]
    pub batch_size: usize,

    /// Retry attempts for transient embedding errors.
    #[arg(long, env = "RAG_API_MAX_RETRIES", default_value_t = 5)]
    pub max_retries: usize,

    /// First backoff delay in seconds; doubles on each retry.
    #[arg(long, default_value_t = 2)]
    pub retry_base_secs: u64,

    /// Backoff ceiling in seconds.
    #[arg(long, default_value_t = 300)]
    pub retry_max_secs: u64,

    /// Log output format.
    #[arg(long, env = "RAG_API_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Embedding client selection.
    #[command(flatten)]
    pub embedder: EmbedderArgs,

    /// Provider keys and endpoints.
    #[command(flatten)]
    pub providers: ProviderArgs,
}

impl BuildConfig {
    /// Backoff applied to every embedding batch.
    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_secs(self.retry_base_secs),
            Duration::from_secs(self.retry_max_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definitions_are_consistent() {
        ServeConfig::command().debug_assert();
        BuildConfig::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let config = ServeConfig::try_parse_from(["rag-api"]).expect("parse");
        assert_eq!(config.bind, "0.0.0.0:5045".parse::<SocketAddr>().unwrap());
        assert_eq!(config.pipeline(), PipelineSettings::default());
        assert_eq!(config.embed_retry().max_retries(), 0);
        assert_eq!(config.max_body_bytes, api::DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.llm.settings(), GenerationSettings::default());
        assert_eq!(config.embedder.embed_provider, EmbedProvider::Gemini);
    }

    #[test]
    fn build_requires_input() {
        assert!(BuildConfig::try_parse_from(["build-store"]).is_err());
        let config = BuildConfig::try_parse_from([
            "build-store",
            "--input",
            "a.json",
            "-i",
            "b.json",
            "--max-retries",
            "3",
        ])
        .expect("parse");
        assert_eq!(
            config.inputs,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(config.batch_size, 32);
        let retry = config.retry();
        assert_eq!(retry.max_retries(), 3);
        assert_eq!(retry.backoff(1), Duration::from_secs(2));
    }

    #[test]
    fn missing_key_is_an_error() {
        let providers = ProviderArgs {
            gemini_api_key: Some("  ".into()),
            ..ProviderArgs::default()
        };
        let args = EmbedderArgs {
            embed_provider: EmbedProvider::Gemini,
            embed_model: None,
            embed_dimensions: None,
            embed_timeout_secs: 5,
        };
        let err = args.build(&providers).err().expect("missing key");
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn openai_embedder_uses_default_model() {
        let providers = ProviderArgs {
            openai_api_key: Some("sk-test".into()),
            openai_base_url: OPENAI_BASE_URL.into(),
            ..ProviderArgs::default()
        };
        let args = EmbedderArgs {
            embed_provider: EmbedProvider::Openai,
            embed_model: None,
            embed_dimensions: Some(256),
            embed_timeout_secs: 5,
        };
        assert!(args.build(&providers).is_ok());
    }

    #[test]
    fn configured_key_builds_clients() {
        let providers = ProviderArgs {
            anthropic_api_key: Some("sk-test".into()),
            anthropic_base_url: generator::anthropic::DEFAULT_BASE_URL.into(),
            ..ProviderArgs::default()
        };
        let llm = LlmArgs {
            llm_provider: LlmProvider::Anthropic,
            llm_model: None,
            temperature: 0.2,
            max_tokens: 256,
            llm_timeout_secs: 5,
        };
        assert!(llm.build(&providers).is_ok());
    }
}
