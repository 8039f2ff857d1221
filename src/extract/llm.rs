//! LLM provider seam and the OpenAI-compatible HTTP client
//!
//! Throttling responses surface as `LlmError::RateLimited` so the retry
//! layer can tell them apart from every other failure.

use crate::config::LlmConfig;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Wait suggested by the provider, when it sent one
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl LlmError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Chat and embedding calls used by extraction and indexing
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends one prompt and returns the decoded JSON object of the reply
    async fn complete_json(&self, prompt: &str) -> Result<Value, LlmError>;

    /// Embeds a batch of texts, one vector per input in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Client for OpenAI-compatible chat-completions and embeddings endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiClient {
    pub fn new(
        http_client: Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
        }
    }

    /// Builds a client from configuration, reading the key from the
    /// configured environment variable
    pub fn from_config(config: &LlmConfig) -> Result<Self, crate::LeadError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| ConfigError::MissingEnv(config.api_key_env.clone()))?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::new(
            http_client,
            api_key,
            &config.api_base,
            &config.chat_model,
            &config.embedding_model,
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after_header(response.headers());
        let message = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            warn!(endpoint = endpoint, "Provider rate limit hit");
            return Err(LlmError::RateLimited {
                retry_after,
                message,
            });
        }

        warn!(endpoint = endpoint, status = %status, "Provider API error");
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let seconds: f64 = value.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn complete_json(&self, prompt: &str) -> Result<Value, LlmError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response: ChatResponse = self
            .post("chat/completions", &request)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("no message content".to_string()))?;

        debug!(
            model = %self.chat_model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion"
        );

        serde_json::from_str(content.trim()).map_err(|e| LlmError::MalformedResponse(e.to_string()))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let response: EmbeddingResponse = self
            .post("embeddings", &request)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if response.data.len() != texts.len() {
            return Err(LlmError::MalformedResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
